//! Line-oriented marking session over one viewed day, with undo/redo.
//!
//! People, periods, overrides and absences are loaded once when the shell
//! starts; only the viewed day's marks change while it runs.

use std::io::{BufRead, Write};

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use roll_core::{
    AttendanceStatus, DaySession, MarkIntent, MarkOutcome, Person, Resolver, Snapshot, SortKey,
    parse_date, sort_people,
};
use roll_store::Store;

use crate::lookup::{find_period, find_person};
use crate::render;

const HELP: &str = "\
commands:
  mark PERSON PERIOD STATUS [MINUTES]   toggle a status (same status again clears)
  late PERSON PERIOD MINUTES            set lateness
  excuse PERSON PERIOD NOTE...          mark excused with a note
  clear PERSON PERIOD                   remove a mark
  unmark-all PERIOD                     remove every mark in a period
  undo | redo
  date YYYY-MM-DD                       view another day
  grid
  quit";

/// Write one cell through the session. Marks against a person covered by an
/// absence range are reported, not saved.
pub fn apply_mark(
    store: &mut Store,
    snapshot: &Snapshot,
    resolver: &Resolver<'_>,
    session: &mut DaySession,
    person_key: &str,
    period_key: &str,
    intent: MarkIntent,
) -> Result<String> {
    let person = find_person(&snapshot.people, person_key)?;
    let period = find_period(&snapshot.periods, period_key)?;
    let outcome = session
        .mark(store, resolver, &person.id, &period.id, intent)
        .context("failed to save attendance")?;
    if let MarkOutcome::Rejected { range_id } = &outcome {
        tracing::info!(
            person = %person.id,
            period = %period.id,
            range = %range_id,
            "mark rejected: person is marked out"
        );
    }
    Ok(render::outcome(&outcome, &person.full_name(), &period.name))
}

pub fn run(
    store: &mut Store,
    snapshot: &Snapshot,
    resolver: &Resolver<'_>,
    date: NaiveDate,
    input: impl BufRead,
    out: &mut impl Write,
) -> Result<()> {
    let mut people: Vec<&Person> = snapshot.people.iter().collect();
    sort_people(&mut people, &SortKey::LastName, &snapshot.notes);

    let day = store.load_day(date).context("failed to load attendance")?;
    let mut session = DaySession::open(date, day);
    writeln!(out, "viewing {date}")?;

    for line in input.lines() {
        let line = line?;
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some((&command, args)) = words.split_first() else {
            continue;
        };
        if matches!(command, "quit" | "exit") {
            break;
        }
        let shell = Shell {
            store: &mut *store,
            snapshot,
            resolver,
            people: &people,
            session: &mut session,
        };
        match shell.execute(command, args) {
            Ok(message) => writeln!(out, "{message}")?,
            Err(e) => writeln!(out, "error: {e:#}")?,
        }
    }
    Ok(())
}

struct Shell<'s, 'a> {
    store: &'s mut Store,
    snapshot: &'s Snapshot,
    resolver: &'s Resolver<'a>,
    people: &'s [&'s Person],
    session: &'s mut DaySession,
}

impl Shell<'_, '_> {
    fn mark(self, person: &str, period: &str, intent: MarkIntent) -> Result<String> {
        apply_mark(
            self.store,
            self.snapshot,
            self.resolver,
            self.session,
            person,
            period,
            intent,
        )
    }

    fn execute(self, command: &str, args: &[&str]) -> Result<String> {
        match command {
            "mark" => {
                let [person, period, status, rest @ ..] = args else {
                    bail!("usage: mark PERSON PERIOD STATUS [MINUTES]");
                };
                let status: AttendanceStatus = status.parse()?;
                let minutes_late = rest
                    .first()
                    .map(|m| m.parse::<i64>())
                    .transpose()
                    .context("minutes must be a whole number")?;
                self.mark(
                    person,
                    period,
                    MarkIntent::Toggle {
                        status,
                        note: None,
                        minutes_late,
                    },
                )
            }
            "late" => {
                let [person, period, minutes] = args else {
                    bail!("usage: late PERSON PERIOD MINUTES");
                };
                let minutes: i64 = minutes.parse().context("minutes must be a whole number")?;
                self.mark(
                    person,
                    period,
                    MarkIntent::Set {
                        status: AttendanceStatus::Late,
                        note: None,
                        minutes_late: Some(minutes),
                    },
                )
            }
            "excuse" => {
                let [person, period, note @ ..] = args else {
                    bail!("usage: excuse PERSON PERIOD NOTE...");
                };
                self.mark(
                    person,
                    period,
                    MarkIntent::Set {
                        status: AttendanceStatus::Excused,
                        note: Some(note.join(" ")),
                        minutes_late: None,
                    },
                )
            }
            "clear" => {
                let [person, period] = args else {
                    bail!("usage: clear PERSON PERIOD");
                };
                self.mark(person, period, MarkIntent::Clear)
            }
            "unmark-all" => {
                let [period] = args else {
                    bail!("usage: unmark-all PERIOD");
                };
                let period = find_period(&self.snapshot.periods, period)?;
                let cleared = self
                    .session
                    .unmark_all(self.store, &period.id)
                    .context("failed to clear period")?;
                Ok(format!("cleared {cleared} marks in {}", period.name))
            }
            "undo" => {
                let done = self.session.undo(self.store).context("undo failed")?;
                Ok(if done { "undone" } else { "nothing to undo" }.to_string())
            }
            "redo" => {
                let done = self.session.redo(self.store).context("redo failed")?;
                Ok(if done { "redone" } else { "nothing to redo" }.to_string())
            }
            "date" => {
                let [date] = args else {
                    bail!("usage: date YYYY-MM-DD");
                };
                let date = parse_date(date)?;
                let day = self.store.load_day(date).context("failed to load attendance")?;
                self.session.view(date, day);
                Ok(format!("viewing {date}"))
            }
            "grid" => {
                let grid = render::grid(
                    self.snapshot,
                    self.people,
                    self.resolver,
                    self.session.date(),
                    self.session.day(),
                );
                Ok(grid.trim_end().to_string())
            }
            "help" => Ok(HELP.to_string()),
            other => bail!("unknown command '{other}' (try help)"),
        }
    }
}
