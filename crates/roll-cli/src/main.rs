mod lookup;
mod render;
mod shell;

use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use clap::{Args, Parser, Subcommand, ValueEnum};
use roll_core::{
    AbsenceDraft, AttendanceStatus, DEFAULT_PERIOD_MINUTES, DaySession, GroupCoordinator,
    GroupRequest, MarkIntent, Period, PeriodSequence, Person, ReportRange, Role, ScheduleOverride,
    SortKey, dashboard, list_groups, local_now, new_id, parse_date, parse_time, parse_timestamp,
    plan_single, ranges_for_person, search, sort_people, split_by_end_date, split_name,
    summary_stats, weekly_trend,
};
use roll_store::{Config, Store, resolve_data_dir};

use crate::lookup::{find_absence, find_group, find_period, find_person};

#[derive(Parser)]
#[command(name = "roll", about = "Class attendance tracking with absence ranges and minute-weighted reports")]
struct Cli {
    /// Data directory (default: $ROLL_DATA_DIR or ~/.rollcall)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Pretend the current time is YYYY-MM-DDTHH:MM
    #[arg(long, global = true, value_parser = timestamp_arg)]
    now: Option<NaiveDateTime>,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage people
    #[command(subcommand)]
    Person(PersonCmd),

    /// Manage class periods
    #[command(subcommand)]
    Period(PeriodCmd),

    /// Move a period's start time on one date
    #[command(subcommand)]
    Override(OverrideCmd),

    /// Mark a person's status for one period
    Mark {
        #[arg(value_parser = date_arg)]
        date: NaiveDate,
        person: String,
        period: String,
        /// on-time, late, excused or absent
        #[arg(value_parser = status_arg)]
        status: AttendanceStatus,
        /// Minutes late (clamped to 0..=50); defaults from the clock
        #[arg(long, allow_negative_numbers = true)]
        minutes: Option<i64>,
        /// Note, kept for excused marks only
        #[arg(long)]
        note: Option<String>,
        /// Clear the cell instead when it already has this status
        #[arg(long)]
        toggle: bool,
    },

    /// Remove a person's mark for one period
    Unmark {
        #[arg(value_parser = date_arg)]
        date: NaiveDate,
        person: String,
        period: String,
    },

    /// Remove every mark for one period on a date
    UnmarkAll {
        #[arg(value_parser = date_arg)]
        date: NaiveDate,
        period: String,
    },

    /// Show the attendance grid for a date (default: today)
    Grid {
        #[arg(value_parser = date_arg)]
        date: Option<NaiveDate>,
    },

    /// Persistent per-period notes
    #[command(subcommand)]
    Note(NoteCmd),

    /// Single-person absence ranges
    #[command(subcommand)]
    Absence(AbsenceCmd),

    /// Absence ranges shared by several people
    #[command(subcommand)]
    Group(GroupCmd),

    /// Attendance report for one person
    Report {
        person: String,
        #[command(flatten)]
        range: RangeArgs,
    },

    /// Overall percentage for everyone
    Dashboard {
        #[command(flatten)]
        range: RangeArgs,
        #[arg(long, value_parser = role_arg)]
        role: Option<Role>,
    },

    /// Interactive marking with undo/redo, commands read from stdin
    Shell {
        #[arg(value_parser = date_arg)]
        date: Option<NaiveDate>,
    },

    /// Export all data to a JSON file
    Export {
        /// Output file path
        path: PathBuf,
    },

    /// Replace all data with a JSON export
    Import {
        /// Input file path
        path: PathBuf,
    },
}

#[derive(Subcommand)]
enum PersonCmd {
    /// Add a person; the first word of NAME is the first name
    Add {
        name: String,
        #[arg(long, value_parser = role_arg, default_value = "student")]
        role: Role,
        #[arg(long, default_value = "")]
        contact: String,
    },
    Edit {
        person: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, value_parser = role_arg)]
        role: Option<Role>,
        #[arg(long)]
        contact: Option<String>,
    },
    /// Remove a person and all their marks, notes and absences
    Remove { person: String },
    List {
        #[arg(long)]
        search: Option<String>,
        #[arg(long, value_enum, default_value = "last")]
        sort: SortArg,
        /// Put people with a note for this period first
        #[arg(long)]
        noted: Option<String>,
        #[arg(long, value_parser = role_arg)]
        role: Option<Role>,
    },
}

#[derive(Subcommand)]
enum PeriodCmd {
    Add {
        name: String,
        #[arg(long, value_parser = time_arg)]
        start: NaiveTime,
        /// Length in minutes, at most one day
        #[arg(long, default_value_t = DEFAULT_PERIOD_MINUTES)]
        duration: u32,
    },
    Edit {
        period: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, value_parser = time_arg)]
        start: Option<NaiveTime>,
        #[arg(long)]
        duration: Option<u32>,
    },
    /// Remove a period and all its marks, overrides and notes
    Remove { period: String },
    List,
}

#[derive(Subcommand)]
enum OverrideCmd {
    Set {
        #[arg(value_parser = date_arg)]
        date: NaiveDate,
        period: String,
        #[arg(value_parser = time_arg)]
        time: NaiveTime,
    },
    Clear {
        #[arg(value_parser = date_arg)]
        date: NaiveDate,
        period: String,
    },
    List,
}

#[derive(Subcommand)]
enum NoteCmd {
    /// Set a note; an empty TEXT removes it
    Set {
        person: String,
        period: String,
        text: String,
    },
}

#[derive(Subcommand)]
enum AbsenceCmd {
    Add {
        person: String,
        #[command(flatten)]
        draft: DraftArgs,
    },
    Edit {
        id: String,
        #[command(flatten)]
        draft: DraftArgs,
    },
    Remove { id: String },
    List {
        #[arg(long)]
        person: Option<String>,
    },
}

#[derive(Subcommand)]
enum GroupCmd {
    Create {
        #[arg(long = "person", required = true)]
        people: Vec<String>,
        #[command(flatten)]
        draft: DraftArgs,
    },
    /// Replace a group's members and shared fields
    Edit {
        group: String,
        /// Replacement member list (default: keep current members)
        #[arg(long = "person")]
        people: Vec<String>,
        #[command(flatten)]
        draft: DraftArgs,
    },
    Delete { group: String },
    List,
}

#[derive(Args)]
struct DraftArgs {
    #[arg(long, value_parser = date_arg)]
    from: Option<NaiveDate>,
    /// Last day (default: same as --from)
    #[arg(long, value_parser = date_arg)]
    to: Option<NaiveDate>,
    /// First period on the first day (default: first period)
    #[arg(long)]
    start_period: Option<String>,
    /// Last period on the last day (default: last period)
    #[arg(long)]
    end_period: Option<String>,
    #[arg(long)]
    note: Option<String>,
}

#[derive(Args)]
struct RangeArgs {
    #[arg(long, value_parser = date_arg)]
    from: Option<NaiveDate>,
    #[arg(long, value_parser = date_arg)]
    to: Option<NaiveDate>,
    #[arg(long, value_enum, conflicts_with_all = ["from", "to"])]
    preset: Option<Preset>,
}

#[derive(Clone, Copy, ValueEnum)]
enum SortArg {
    Last,
    First,
}

#[derive(Clone, Copy, ValueEnum)]
enum Preset {
    Week,
    Month,
    All,
}

fn date_arg(s: &str) -> Result<NaiveDate, String> {
    parse_date(s).map_err(|e| e.to_string())
}

fn time_arg(s: &str) -> Result<NaiveTime, String> {
    parse_time(s).map_err(|e| e.to_string())
}

fn timestamp_arg(s: &str) -> Result<NaiveDateTime, String> {
    parse_timestamp(s).map_err(|e| e.to_string())
}

fn status_arg(s: &str) -> Result<AttendanceStatus, String> {
    s.parse().map_err(|e: roll_core::ValidationError| e.to_string())
}

fn role_arg(s: &str) -> Result<Role, String> {
    s.parse().map_err(|e: roll_core::ValidationError| e.to_string())
}

struct App {
    store: Store,
    config: Config,
    now: NaiveDateTime,
}

fn open_app(cli: &Cli) -> Result<App> {
    let data_dir = resolve_data_dir(cli.data_dir.as_deref());
    let config = Config::load(&data_dir).context("failed to load config")?;
    let store = Store::open_in_dir(&data_dir, &config.store)
        .with_context(|| format!("failed to open store in {}", data_dir.display()))?;
    tracing::debug!(dir = %data_dir.display(), "opened store");
    Ok(App {
        store,
        config,
        now: cli.now.unwrap_or_else(local_now),
    })
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let mut app = open_app(&cli)?;

    match &cli.command {
        Commands::Person(cmd) => cmd_person(&app, cmd),
        Commands::Period(cmd) => cmd_period(&app, cmd),
        Commands::Override(cmd) => cmd_override(&app, cmd),
        Commands::Mark {
            date,
            person,
            period,
            status,
            minutes,
            note,
            toggle,
        } => {
            let (status, note, minutes_late) = (*status, note.clone(), *minutes);
            let intent = if *toggle {
                MarkIntent::Toggle {
                    status,
                    note,
                    minutes_late,
                }
            } else {
                MarkIntent::Set {
                    status,
                    note,
                    minutes_late,
                }
            };
            cmd_mark(&mut app, *date, person, period, intent)
        }
        Commands::Unmark {
            date,
            person,
            period,
        } => cmd_mark(&mut app, *date, person, period, MarkIntent::Clear),
        Commands::UnmarkAll { date, period } => cmd_unmark_all(&mut app, *date, period),
        Commands::Grid { date } => cmd_grid(&app, date.unwrap_or(app.now.date())),
        Commands::Note(NoteCmd::Set {
            person,
            period,
            text,
        }) => cmd_note(&app, person, period, text),
        Commands::Absence(cmd) => cmd_absence(&app, cmd),
        Commands::Group(cmd) => cmd_group(&mut app, cmd),
        Commands::Report { person, range } => cmd_report(&app, person, range),
        Commands::Dashboard { range, role } => cmd_dashboard(&app, range, *role),
        Commands::Shell { date } => {
            let date = date.unwrap_or(app.now.date());
            cmd_shell(&mut app, date)
        }
        Commands::Export { path } => cmd_export(&app, path),
        Commands::Import { path } => cmd_import(&app, path),
    }
}

fn cmd_person(app: &App, cmd: &PersonCmd) -> Result<()> {
    let store = &app.store;
    match cmd {
        PersonCmd::Add {
            name,
            role,
            contact,
        } => {
            let person = Person::from_full_name(name, *role, contact)?;
            store.add_person(&person).context("failed to add person")?;
            println!("added {} {}", person.id, person.full_name());
        }
        PersonCmd::Edit {
            person,
            name,
            role,
            contact,
        } => {
            let people = store.list_people()?;
            let mut updated = find_person(&people, person)?.clone();
            if let Some(name) = name {
                (updated.first_name, updated.last_name) = split_name(name)?;
            }
            if let Some(role) = role {
                updated.role = *role;
            }
            if let Some(contact) = contact {
                updated.contact = contact.clone();
            }
            store.update_person(&updated).context("failed to update person")?;
            println!("updated {} {}", updated.id, updated.full_name());
        }
        PersonCmd::Remove { person } => {
            let people = store.list_people()?;
            let person = find_person(&people, person)?;
            store.remove_person(&person.id).context("failed to remove person")?;
            println!("removed {}", person.full_name());
        }
        PersonCmd::List {
            search: query,
            sort,
            noted,
            role,
        } => {
            let people = store.list_people()?;
            let notes = store.load_notes()?;
            let key = match (noted, sort) {
                (Some(period), _) => {
                    let periods = store.list_periods()?;
                    SortKey::Note(find_period(&periods, period)?.id.clone())
                }
                (None, SortArg::First) => SortKey::FirstName,
                (None, SortArg::Last) => SortKey::LastName,
            };
            let mut matched = search(&people, query.as_deref().unwrap_or(""), *role);
            sort_people(&mut matched, &key, &notes);
            let rows: Vec<Vec<String>> = matched
                .iter()
                .map(|p| {
                    vec![
                        p.id.clone(),
                        p.full_name(),
                        p.role.to_string(),
                        p.contact.clone(),
                    ]
                })
                .collect();
            print!("{}", render::table(&rows));
        }
    }
    Ok(())
}

fn cmd_period(app: &App, cmd: &PeriodCmd) -> Result<()> {
    let store = &app.store;
    match cmd {
        PeriodCmd::Add {
            name,
            start,
            duration,
        } => {
            let period = Period::new(name, *start, *duration)?;
            store.add_period(&period).context("failed to add period")?;
            println!("added {} {}", period.id, period.name);
        }
        PeriodCmd::Edit {
            period,
            name,
            start,
            duration,
        } => {
            let periods = store.list_periods()?;
            let current = find_period(&periods, period)?;
            let mut updated = Period::new(
                name.as_deref().unwrap_or(&current.name),
                start.unwrap_or(current.start_time),
                duration.unwrap_or(current.duration_minutes),
            )?;
            updated.id = current.id.clone();
            store.update_period(&updated).context("failed to update period")?;
            println!("updated {} {}", updated.id, updated.name);
        }
        PeriodCmd::Remove { period } => {
            let periods = store.list_periods()?;
            let period = find_period(&periods, period)?;
            store.remove_period(&period.id).context("failed to remove period")?;
            println!("removed {}", period.name);
        }
        PeriodCmd::List => {
            let rows: Vec<Vec<String>> = store
                .list_periods()?
                .iter()
                .map(|p| {
                    vec![
                        p.id.clone(),
                        p.name.clone(),
                        p.start_time.format("%H:%M").to_string(),
                        format!("{}m", p.duration_minutes),
                    ]
                })
                .collect();
            print!("{}", render::table(&rows));
        }
    }
    Ok(())
}

fn cmd_override(app: &App, cmd: &OverrideCmd) -> Result<()> {
    let store = &app.store;
    let periods = store.list_periods()?;
    match cmd {
        OverrideCmd::Set { date, period, time } => {
            let period = find_period(&periods, period)?;
            store
                .set_override(&ScheduleOverride {
                    date: *date,
                    period_id: period.id.clone(),
                    new_time: *time,
                })
                .context("failed to set override")?;
            println!("{} starts at {} on {date}", period.name, time.format("%H:%M"));
        }
        OverrideCmd::Clear { date, period } => {
            let period = find_period(&periods, period)?;
            if store.clear_override(*date, &period.id)? {
                println!("cleared override for {} on {date}", period.name);
            } else {
                println!("no override for {} on {date}", period.name);
            }
        }
        OverrideCmd::List => {
            let rows: Vec<Vec<String>> = store
                .list_overrides()?
                .iter()
                .map(|o| {
                    let name = periods
                        .iter()
                        .find(|p| p.id == o.period_id)
                        .map_or(o.period_id.clone(), |p| p.name.clone());
                    vec![
                        o.date.to_string(),
                        name,
                        o.new_time.format("%H:%M").to_string(),
                    ]
                })
                .collect();
            print!("{}", render::table(&rows));
        }
    }
    Ok(())
}

fn cmd_mark(
    app: &mut App,
    date: NaiveDate,
    person: &str,
    period: &str,
    intent: MarkIntent,
) -> Result<()> {
    let snapshot = app.store.load_snapshot().context("failed to load data")?;
    let sequence = snapshot.sequence();
    let resolver = snapshot.resolver(&sequence, app.now);
    let mut session = DaySession::open(date, snapshot.day(date));
    let message = shell::apply_mark(
        &mut app.store,
        &snapshot,
        &resolver,
        &mut session,
        person,
        period,
        intent,
    )?;
    println!("{message}");
    Ok(())
}

fn cmd_unmark_all(app: &mut App, date: NaiveDate, period: &str) -> Result<()> {
    let periods = app.store.list_periods()?;
    let period = find_period(&periods, period)?;
    let day = app.store.load_day(date)?;
    let mut session = DaySession::open(date, day);
    let cleared = session
        .unmark_all(&mut app.store, &period.id)
        .context("failed to clear period")?;
    println!("cleared {cleared} marks in {} on {date}", period.name);
    Ok(())
}

fn cmd_grid(app: &App, date: NaiveDate) -> Result<()> {
    let snapshot = app.store.load_snapshot().context("failed to load data")?;
    let sequence = snapshot.sequence();
    let resolver = snapshot.resolver(&sequence, app.now);
    let mut people: Vec<&Person> = snapshot.people.iter().collect();
    sort_people(&mut people, &SortKey::LastName, &snapshot.notes);
    let day = snapshot.day(date);
    print!(
        "{}",
        render::grid(&snapshot, &people, &resolver, date, &day)
    );
    Ok(())
}

fn cmd_note(app: &App, person: &str, period: &str, text: &str) -> Result<()> {
    let people = app.store.list_people()?;
    let periods = app.store.list_periods()?;
    let person = find_person(&people, person)?;
    let period = find_period(&periods, period)?;
    app.store
        .set_note(&person.id, &period.id, text)
        .context("failed to save note")?;
    if text.trim().is_empty() {
        println!("removed note for {} in {}", person.full_name(), period.name);
    } else {
        println!("noted {} in {}", person.full_name(), period.name);
    }
    Ok(())
}

impl DraftArgs {
    /// Fill unset fields from `base`, then from defaults.
    fn resolve(
        &self,
        periods: &[Period],
        sequence: &PeriodSequence,
        base: Option<&AbsenceDraft>,
    ) -> Result<AbsenceDraft> {
        let start_date = match (self.from, base) {
            (Some(date), _) => date,
            (None, Some(base)) => base.start_date,
            (None, None) => bail!("--from is required"),
        };
        let end_date = self
            .to
            .or(base.map(|b| b.end_date))
            .unwrap_or(start_date);

        let period_id = |key: &Option<String>,
                         inherited: Option<&String>,
                         fallback: Option<&Period>|
         -> Result<String> {
            if let Some(key) = key {
                return Ok(find_period(periods, key)?.id.clone());
            }
            inherited
                .cloned()
                .or_else(|| fallback.map(|p| p.id.clone()))
                .context("no periods defined")
        };
        let start_period_id = period_id(
            &self.start_period,
            base.map(|b| &b.start_period_id),
            sequence.first(),
        )?;
        let end_period_id = period_id(
            &self.end_period,
            base.map(|b| &b.end_period_id),
            sequence.last(),
        )?;

        Ok(AbsenceDraft {
            start_date,
            end_date,
            start_period_id,
            end_period_id,
            note: self
                .note
                .clone()
                .or_else(|| base.map(|b| b.note.clone()))
                .unwrap_or_default(),
        })
    }
}

fn describe_range(
    periods: &[Period],
    start_date: NaiveDate,
    end_date: NaiveDate,
    start_period_id: &str,
    end_period_id: &str,
) -> String {
    let name = |id: &str| {
        periods
            .iter()
            .find(|p| p.id == id)
            .map_or("?".to_string(), |p| p.name.clone())
    };
    if start_date == end_date {
        format!(
            "{start_date} {}-{}",
            name(start_period_id),
            name(end_period_id)
        )
    } else {
        format!(
            "{start_date} {} to {end_date} {}",
            name(start_period_id),
            name(end_period_id)
        )
    }
}

fn cmd_absence(app: &App, cmd: &AbsenceCmd) -> Result<()> {
    let store = &app.store;
    let people = store.list_people()?;
    let periods = store.list_periods()?;
    let sequence = PeriodSequence::new(periods.clone());
    match cmd {
        AbsenceCmd::Add { person, draft } => {
            let person = find_person(&people, person)?;
            let draft = draft.resolve(&periods, &sequence, None)?;
            let range = plan_single(&person.id, &draft, &sequence, new_id())?;
            store.add_absence(&range).context("failed to add absence")?;
            println!("added absence {} for {}", range.id, person.full_name());
        }
        AbsenceCmd::Edit { id, draft } => {
            let records = store.list_absences()?;
            let current = find_absence(&records, id)?;
            let base = AbsenceDraft {
                start_date: current.start_date,
                end_date: current.end_date,
                start_period_id: current.start_period_id.clone(),
                end_period_id: current.end_period_id.clone(),
                note: current.note.clone(),
            };
            let draft = draft.resolve(&periods, &sequence, Some(&base))?;
            let mut updated = plan_single(&current.person_id, &draft, &sequence, current.id.clone())?;
            updated.group_id = current.group_id.clone();
            store.update_absence(&updated).context("failed to update absence")?;
            println!("updated absence {}", updated.id);
        }
        AbsenceCmd::Remove { id } => {
            let records = store.list_absences()?;
            let current = find_absence(&records, id)?;
            store.delete_absence(&current.id).context("failed to remove absence")?;
            println!("removed absence {}", current.id);
        }
        AbsenceCmd::List { person } => {
            let records = store.list_absences()?;
            let shown: Vec<_> = match person {
                Some(key) => ranges_for_person(&records, &find_person(&people, key)?.id),
                None => records.iter().collect(),
            };
            let rows: Vec<Vec<String>> = shown
                .iter()
                .map(|r| {
                    let who = people
                        .iter()
                        .find(|p| p.id == r.person_id)
                        .map_or(r.person_id.clone(), Person::full_name);
                    vec![
                        r.id.clone(),
                        who,
                        describe_range(
                            &periods,
                            r.start_date,
                            r.end_date,
                            &r.start_period_id,
                            &r.end_period_id,
                        ),
                        r.group_id.as_ref().map_or(String::new(), |g| format!("group {g}")),
                        r.note.clone(),
                    ]
                })
                .collect();
            print!("{}", render::table(&rows));
        }
    }
    Ok(())
}

fn cmd_group(app: &mut App, cmd: &GroupCmd) -> Result<()> {
    let people = app.store.list_people()?;
    let periods = app.store.list_periods()?;
    let sequence = PeriodSequence::new(periods.clone());
    let mut ids = new_id;

    let member_ids = |keys: &[String]| -> Result<Vec<String>> {
        keys.iter()
            .map(|k| find_person(&people, k).map(|p| p.id.clone()))
            .collect()
    };

    match cmd {
        GroupCmd::Create { people: keys, draft } => {
            let request = GroupRequest {
                editing: None,
                people: member_ids(keys)?,
                draft: draft.resolve(&periods, &sequence, None)?,
            };
            let plan = GroupCoordinator::new(&mut app.store, &sequence)
                .save(&request, &mut ids)
                .context("failed to save group")?;
            println!(
                "created group {} for {} people",
                plan.group_id,
                plan.records.len()
            );
        }
        GroupCmd::Edit {
            group,
            people: keys,
            draft,
        } => {
            let groups = list_groups(&app.store.list_absences()?);
            let current = find_group(&groups, group)?;
            let base = AbsenceDraft {
                start_date: current.start_date,
                end_date: current.end_date,
                start_period_id: current.start_period_id.clone(),
                end_period_id: current.end_period_id.clone(),
                note: current.note.clone(),
            };
            let request = GroupRequest {
                editing: Some(current.group_id.clone()),
                people: if keys.is_empty() {
                    current.people.clone()
                } else {
                    member_ids(keys)?
                },
                draft: draft.resolve(&periods, &sequence, Some(&base))?,
            };
            let plan = GroupCoordinator::new(&mut app.store, &sequence)
                .save(&request, &mut ids)
                .context("failed to save group")?;
            println!(
                "updated group {} for {} people",
                plan.group_id,
                plan.records.len()
            );
        }
        GroupCmd::Delete { group } => {
            let groups = list_groups(&app.store.list_absences()?);
            let group_id = find_group(&groups, group)?.group_id.clone();
            let removed = GroupCoordinator::new(&mut app.store, &sequence)
                .delete(&group_id)
                .context("failed to delete group")?;
            println!("deleted group {group_id} ({removed} records)");
        }
        GroupCmd::List => {
            let groups = list_groups(&app.store.list_absences()?);
            let (upcoming, past) = split_by_end_date(groups, app.now.date());
            for (title, groups) in [("Upcoming", upcoming), ("Past", past)] {
                println!("{title}:");
                if groups.is_empty() {
                    println!("  (none)");
                    continue;
                }
                let rows: Vec<Vec<String>> = groups
                    .iter()
                    .map(|g| {
                        let names: Vec<String> = g
                            .people
                            .iter()
                            .map(|id| {
                                people
                                    .iter()
                                    .find(|p| &p.id == id)
                                    .map_or(id.clone(), Person::full_name)
                            })
                            .collect();
                        vec![
                            format!("  {}", g.group_id),
                            describe_range(
                                &periods,
                                g.start_date,
                                g.end_date,
                                &g.start_period_id,
                                &g.end_period_id,
                            ),
                            names.join(", "),
                            g.note.clone(),
                        ]
                    })
                    .collect();
                print!("{}", render::table(&rows));
            }
        }
    }
    Ok(())
}

impl RangeArgs {
    fn range(&self, today: NaiveDate) -> ReportRange {
        match self.preset {
            Some(Preset::Week) => ReportRange::this_week(today),
            Some(Preset::Month) => ReportRange::this_month(today),
            Some(Preset::All) => ReportRange::all(),
            None => ReportRange::new(self.from, self.to),
        }
    }
}

fn cmd_report(app: &App, person: &str, range: &RangeArgs) -> Result<()> {
    let snapshot = app.store.load_snapshot().context("failed to load data")?;
    let person = find_person(&snapshot.people, person)?;
    let range = range.range(app.now.date());
    let stats = summary_stats(&snapshot, &person.id, &range, app.now);
    let trend = weekly_trend(&snapshot, &person.id, &range, app.now);
    print!(
        "{}",
        render::report(&person.full_name(), &stats, &trend, &app.config.report.bands())
    );
    Ok(())
}

fn cmd_dashboard(app: &App, range: &RangeArgs, role: Option<Role>) -> Result<()> {
    let snapshot = app.store.load_snapshot().context("failed to load data")?;
    let mut people: Vec<&Person> = search(&snapshot.people, "", role);
    sort_people(&mut people, &SortKey::LastName, &snapshot.notes);
    let people: Vec<Person> = people.into_iter().cloned().collect();
    let rows = dashboard(&snapshot, &people, &range.range(app.now.date()), app.now);
    print!("{}", render::dashboard(&rows, &app.config.report.bands()));
    Ok(())
}

fn cmd_shell(app: &mut App, date: NaiveDate) -> Result<()> {
    let snapshot = app.store.load_snapshot().context("failed to load data")?;
    let sequence = snapshot.sequence();
    let resolver = snapshot.resolver(&sequence, app.now);
    shell::run(
        &mut app.store,
        &snapshot,
        &resolver,
        date,
        io::stdin().lock(),
        &mut io::stdout(),
    )
}

fn cmd_export(app: &App, path: &Path) -> Result<()> {
    app.store
        .export_json_file(path, app.now)
        .context("failed to export")?;
    println!("exported to {}", path.display());
    Ok(())
}

fn cmd_import(app: &App, path: &Path) -> Result<()> {
    app.store
        .import_json_file(path)
        .context("failed to import")?;
    println!("imported from {}", path.display());
    Ok(())
}
