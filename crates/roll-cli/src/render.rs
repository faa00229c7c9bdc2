//! Plain-text rendering of grids, reports and outcomes.

use chrono::NaiveDate;
use roll_core::{
    BandThresholds, DashboardRow, DayAttendance, MarkOutcome, Percentage, PercentageBand, Person,
    ResolvedStatus, Resolver, Snapshot, SummaryStats, WeeklyPoint, active_period,
    effective_periods, format_minutes,
};

/// Left-aligned columns separated by two spaces.
pub fn table(rows: &[Vec<String>]) -> String {
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    let widths: Vec<usize> = (0..columns)
        .map(|c| {
            rows.iter()
                .filter_map(|r| r.get(c))
                .map(|cell| cell.chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    for row in rows {
        let line = row
            .iter()
            .enumerate()
            .map(|(c, cell)| format!("{cell:<width$}", width = widths[c]))
            .collect::<Vec<_>>()
            .join("  ");
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

pub fn percent(p: Percentage) -> String {
    match p {
        Percentage::NotApplicable => p.to_string(),
        Percentage::Value(_) => format!("{p}%"),
    }
}

pub fn band(b: PercentageBand) -> &'static str {
    match b {
        PercentageBand::Unknown => "unknown",
        PercentageBand::Low => "low",
        PercentageBand::Fair => "fair",
        PercentageBand::Good => "good",
    }
}

pub fn cell(status: &ResolvedStatus) -> String {
    let mut text = match status {
        ResolvedStatus::NotMarked => "-".to_string(),
        ResolvedStatus::Recorded(record) if record.minutes_late > 0 => {
            format!("{} {}m", record.status, record.minutes_late)
        }
        other => other.label().to_string(),
    };
    if let Some(note) = status.note().filter(|n| !n.is_empty()) {
        text.push_str(&format!(" ({note})"));
    }
    text
}

/// One row per person, one column per effective period of `date`.
pub fn grid(
    snapshot: &Snapshot,
    people: &[&Person],
    resolver: &Resolver<'_>,
    date: NaiveDate,
    day: &DayAttendance,
) -> String {
    let periods = effective_periods(resolver.sequence, resolver.overrides, date);
    let active = active_period(&periods, resolver.now, date).map(|p| p.id.clone());
    let mut header = vec![date.format("%Y-%m-%d %a").to_string()];
    for period in &periods {
        let mut label = format!("{} {}", period.name, period.start.format("%H:%M"));
        if period.overridden {
            label.push('*');
        }
        if active.as_deref() == Some(period.id.as_str()) {
            label.push_str(" (now)");
        }
        header.push(label);
    }

    let mut rows = vec![header];
    for person in people {
        let mut row = vec![person.full_name()];
        for period in &periods {
            let mut text = cell(&resolver.resolve(&person.id, period, date, day));
            if let Some(note) = snapshot.notes.get(&person.id, &period.id) {
                text.push_str(&format!(" [{note}]"));
            }
            row.push(text);
        }
        rows.push(row);
    }
    table(&rows)
}

pub fn report(
    name: &str,
    stats: &SummaryStats,
    trend: &[WeeklyPoint],
    bands: &BandThresholds,
) -> String {
    let overall = stats.overall.percentage();
    let mut out = format!("Report for {name}\n");
    out.push_str(&format!(
        "Overall: {} ({}) [{} of {} minutes]\n",
        percent(overall),
        band(bands.classify(overall)),
        stats.overall.attended,
        stats.overall.possible
    ));
    let late = i64::try_from(stats.total_minutes_late).unwrap_or(i64::MAX);
    out.push_str(&format!("Total late: {}\n", format_minutes(late)));

    out.push_str("Per period:\n");
    let rows: Vec<Vec<String>> = stats
        .per_period
        .iter()
        .map(|p| {
            vec![
                format!("  {}", p.name),
                percent(p.tally.percentage()),
                format!("{}/{}", p.tally.attended, p.tally.possible),
            ]
        })
        .collect();
    out.push_str(&table(&rows));

    out.push_str("Weekly trend:\n");
    if trend.is_empty() {
        out.push_str("  (no data)\n");
    }
    for point in trend {
        out.push_str(&format!(
            "  {}  {:.1}%  {}/{}\n",
            point.week, point.percentage, point.attended, point.possible
        ));
    }
    out
}

pub fn dashboard(rows: &[DashboardRow], bands: &BandThresholds) -> String {
    let rows: Vec<Vec<String>> = rows
        .iter()
        .map(|r| {
            vec![
                r.name.clone(),
                percent(r.percentage),
                band(bands.classify(r.percentage)).to_string(),
            ]
        })
        .collect();
    table(&rows)
}

pub fn outcome(outcome: &MarkOutcome, person: &str, period: &str) -> String {
    match outcome {
        MarkOutcome::Saved(record) if record.minutes_late > 0 => format!(
            "marked {person} {period}: {} ({}m)",
            record.status, record.minutes_late
        ),
        MarkOutcome::Saved(record) => format!("marked {person} {period}: {}", record.status),
        MarkOutcome::Cleared => format!("cleared {person} {period}"),
        MarkOutcome::Ignored => format!("nothing to change for {person} {period}"),
        MarkOutcome::Rejected { range_id } => {
            format!("not saved: {person} is marked out by absence {range_id}")
        }
    }
}
