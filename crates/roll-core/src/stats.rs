//! Minute-weighted attendance statistics.
//!
//! Only *held* periods count: a period nobody was marked in on a date is
//! treated as not having happened. Excused cells (by range or record) are
//! left out of both totals.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::constants::{FAIR_BAND_THRESHOLD, LOW_BAND_THRESHOLD};
use crate::model::{AttendanceStatus, DayAttendance, Person, PeriodId, PersonId};
use crate::schedule::{EffectivePeriod, effective_periods};
use crate::snapshot::Snapshot;
use crate::status::{ResolvedStatus, Resolver};
use crate::time::{ReportRange, week_id};

/// Attendance expressed as a percentage, or not applicable when nothing
/// could have been attended.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Percentage {
    NotApplicable,
    Value(f64),
}

impl Percentage {
    /// Value rounded to one decimal place.
    pub fn rounded(&self) -> Option<f64> {
        match self {
            Percentage::NotApplicable => None,
            Percentage::Value(v) => Some((v * 10.0).round() / 10.0),
        }
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.rounded() {
            None => f.write_str("N/A"),
            Some(v) => write!(f, "{v:.1}"),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MinuteTally {
    pub possible: u64,
    pub attended: u64,
}

impl MinuteTally {
    pub fn percentage(&self) -> Percentage {
        if self.possible == 0 {
            Percentage::NotApplicable
        } else {
            Percentage::Value(self.attended as f64 / self.possible as f64 * 100.0)
        }
    }

    fn add(&mut self, possible: u64, attended: u64) {
        self.possible += possible;
        self.attended += attended;
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PeriodStats {
    pub period_id: PeriodId,
    pub name: String,
    pub tally: MinuteTally,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SummaryStats {
    pub overall: MinuteTally,
    /// In period-sequence order.
    pub per_period: Vec<PeriodStats>,
    pub total_minutes_late: u64,
}

/// Minutes (possible, attended) a resolved cell contributes, before any
/// gating on whether the cell counts at all.
fn weigh(status: &ResolvedStatus, duration: u64) -> Option<(u64, u64)> {
    match status.explicit_status() {
        Some(AttendanceStatus::OnTime) => Some((duration, duration)),
        Some(AttendanceStatus::Late) => {
            Some((duration, duration.saturating_sub(u64::from(status.minutes_late()))))
        }
        Some(AttendanceStatus::Absent) => Some((duration, 0)),
        Some(AttendanceStatus::Excused) => None,
        None => None,
    }
}

fn days_in<'s>(
    snapshot: &'s Snapshot,
    range: &ReportRange,
) -> impl Iterator<Item = (NaiveDate, &'s DayAttendance)> {
    let range = *range;
    snapshot
        .attendance
        .iter()
        .filter(move |(date, _)| range.contains(**date))
        .map(|(date, day)| (*date, day))
}

/// Overall and per-period totals for one person.
///
/// A period counts on a date only if it is past or running at `now` and was
/// held. An unmarked cell counts as possible-but-missed only while its period
/// is running.
pub fn summary_stats(
    snapshot: &Snapshot,
    person_id: &str,
    range: &ReportRange,
    now: NaiveDateTime,
) -> SummaryStats {
    let sequence = snapshot.sequence();
    let resolver = Resolver::new(&sequence, &snapshot.overrides, &snapshot.absences, now);

    let mut overall = MinuteTally::default();
    let mut per_period: Vec<PeriodStats> = sequence
        .periods()
        .iter()
        .map(|p| PeriodStats {
            period_id: p.id.clone(),
            name: p.name.clone(),
            tally: MinuteTally::default(),
        })
        .collect();
    let mut total_minutes_late = 0u64;

    for (date, day) in days_in(snapshot, range) {
        total_minutes_late += day
            .person_records(person_id)
            .filter(|(_, r)| r.status == AttendanceStatus::Late)
            .map(|(_, r)| u64::from(r.minutes_late))
            .sum::<u64>();

        for (index, period) in effective_periods(&sequence, &snapshot.overrides, date)
            .iter()
            .enumerate()
        {
            let active = period.is_active(date, now);
            if !(active || period.is_past(date, now)) || !day.is_held(&period.id) {
                continue;
            }
            let status = resolver.resolve(person_id, period, date, day);
            if status.is_excused() {
                continue;
            }
            let duration = u64::from(period.duration_minutes);
            let contribution = match weigh(&status, duration) {
                Some(minutes) => minutes,
                None if active => (duration, 0),
                None => continue,
            };
            overall.add(contribution.0, contribution.1);
            per_period[index].tally.add(contribution.0, contribution.1);
        }
    }

    SummaryStats {
        overall,
        per_period,
        total_minutes_late,
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeeklyPoint {
    /// ISO week identifier, `YYYY-Www`.
    pub week: String,
    pub possible: u64,
    pub attended: u64,
    pub percentage: f64,
}

fn weekly_contribution(status: &ResolvedStatus, period: &EffectivePeriod) -> Option<(u64, u64)> {
    if status.is_excused() {
        return None;
    }
    let duration = u64::from(period.duration_minutes);
    Some(weigh(status, duration).unwrap_or((duration, 0)))
}

/// Per-ISO-week totals for one person, sorted by week.
///
/// Every held, non-excused period adds to the possible minutes regardless of
/// time of day; only On Time and Late marks add attended minutes. Weeks with
/// nothing possible are omitted.
pub fn weekly_trend(
    snapshot: &Snapshot,
    person_id: &str,
    range: &ReportRange,
    now: NaiveDateTime,
) -> Vec<WeeklyPoint> {
    let sequence = snapshot.sequence();
    let resolver = Resolver::new(&sequence, &snapshot.overrides, &snapshot.absences, now);
    let mut weeks: BTreeMap<String, MinuteTally> = BTreeMap::new();

    for (date, day) in days_in(snapshot, range) {
        let tally = weeks.entry(week_id(date)).or_default();
        for period in effective_periods(&sequence, &snapshot.overrides, date) {
            if !day.is_held(&period.id) {
                continue;
            }
            let status = resolver.resolve(person_id, &period, date, day);
            if let Some((possible, attended)) = weekly_contribution(&status, &period) {
                tally.add(possible, attended);
            }
        }
    }

    weeks
        .into_iter()
        .filter(|(_, tally)| tally.possible > 0)
        .map(|(week, tally)| WeeklyPoint {
            week,
            possible: tally.possible,
            attended: tally.attended,
            percentage: tally.attended as f64 / tally.possible as f64 * 100.0,
        })
        .collect()
}

#[derive(Clone, Debug, PartialEq)]
pub struct DashboardRow {
    pub person_id: PersonId,
    pub name: String,
    pub percentage: Percentage,
}

/// Overall percentage for each of `people`, in the order given.
pub fn dashboard(
    snapshot: &Snapshot,
    people: &[Person],
    range: &ReportRange,
    now: NaiveDateTime,
) -> Vec<DashboardRow> {
    people
        .iter()
        .map(|person| DashboardRow {
            person_id: person.id.clone(),
            name: person.full_name(),
            percentage: summary_stats(snapshot, &person.id, range, now)
                .overall
                .percentage(),
        })
        .collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PercentageBand {
    Unknown,
    Low,
    Fair,
    Good,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BandThresholds {
    pub low: f64,
    pub fair: f64,
}

impl Default for BandThresholds {
    fn default() -> Self {
        Self {
            low: LOW_BAND_THRESHOLD,
            fair: FAIR_BAND_THRESHOLD,
        }
    }
}

impl BandThresholds {
    pub fn classify(&self, percentage: Percentage) -> PercentageBand {
        match percentage {
            Percentage::NotApplicable => PercentageBand::Unknown,
            Percentage::Value(v) if v < self.low => PercentageBand::Low,
            Percentage::Value(v) if v < self.fair => PercentageBand::Fair,
            Percentage::Value(_) => PercentageBand::Good,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AbsenceRange, AttendanceRecord, Period, Role};
    use crate::time::{parse_date, parse_time};

    fn d(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    fn at(date: &str, time: &str) -> NaiveDateTime {
        d(date).and_time(parse_time(time).unwrap())
    }

    fn period(id: &str, start: &str, duration: u32) -> Period {
        Period {
            id: id.to_string(),
            name: id.to_uppercase(),
            start_time: parse_time(start).unwrap(),
            duration_minutes: duration,
        }
    }

    fn mark(snapshot: &mut Snapshot, date: &str, person: &str, period: &str, status: AttendanceStatus, late: u32) {
        snapshot.attendance.entry(d(date)).or_default().set(
            person,
            period,
            AttendanceRecord {
                status,
                minutes_late: late,
                note: None,
                timestamp: at(date, "08:00"),
            },
        );
    }

    fn base() -> Snapshot {
        Snapshot {
            periods: vec![period("p1", "09:00", 60), period("p2", "10:00", 60)],
            ..Snapshot::default()
        }
    }

    #[test]
    fn test_summary_on_time_late_absent() {
        let mut snap = base();
        mark(&mut snap, "2025-03-03", "alice", "p1", AttendanceStatus::OnTime, 0);
        mark(&mut snap, "2025-03-04", "alice", "p1", AttendanceStatus::Late, 10);
        mark(&mut snap, "2025-03-05", "alice", "p1", AttendanceStatus::Absent, 0);

        let stats = summary_stats(&snap, "alice", &ReportRange::all(), at("2025-03-10", "08:00"));
        assert_eq!(stats.overall, MinuteTally { possible: 180, attended: 110 });
        assert_eq!(stats.overall.percentage().to_string(), "61.1");
        assert_eq!(stats.total_minutes_late, 10);
        assert_eq!(stats.per_period[0].tally.possible, 180);
        assert_eq!(stats.per_period[1].tally.percentage(), Percentage::NotApplicable);
    }

    #[test]
    fn test_summary_two_of_three_is_66_7() {
        let mut snap = base();
        for date in ["2025-03-03", "2025-03-04"] {
            mark(&mut snap, date, "alice", "p1", AttendanceStatus::OnTime, 0);
        }
        mark(&mut snap, "2025-03-05", "alice", "p1", AttendanceStatus::Absent, 0);
        let stats = summary_stats(&snap, "alice", &ReportRange::all(), at("2025-03-10", "08:00"));
        assert_eq!(stats.overall.percentage().to_string(), "66.7");
    }

    #[test]
    fn test_summary_no_data_is_na() {
        let snap = base();
        let stats = summary_stats(&snap, "alice", &ReportRange::all(), at("2025-03-10", "08:00"));
        assert_eq!(stats.overall.percentage().to_string(), "N/A");
        assert_eq!(stats.total_minutes_late, 0);
    }

    #[test]
    fn test_summary_single_late_period() {
        let mut snap = base();
        mark(&mut snap, "2025-03-03", "alice", "p1", AttendanceStatus::Late, 20);
        let stats = summary_stats(&snap, "alice", &ReportRange::all(), at("2025-03-10", "08:00"));
        assert_eq!(stats.overall, MinuteTally { possible: 60, attended: 40 });
        assert_eq!(stats.overall.percentage().to_string(), "66.7");
        assert_eq!(stats.total_minutes_late, 20);
    }

    #[test]
    fn test_summary_tolerates_stored_overlong_period() {
        let mut snap = Snapshot {
            periods: vec![period("p1", "09:00", u32::MAX)],
            ..Snapshot::default()
        };
        mark(&mut snap, "2025-03-04", "alice", "p1", AttendanceStatus::OnTime, 0);
        let stats = summary_stats(&snap, "alice", &ReportRange::all(), at("2025-03-04", "10:00"));
        assert_eq!(stats.overall.possible, u64::from(u32::MAX));
        assert_eq!(stats.overall.attended, u64::from(u32::MAX));
    }

    #[test]
    fn test_unheld_and_excused_are_skipped() {
        let mut snap = base();
        mark(&mut snap, "2025-03-03", "alice", "p1", AttendanceStatus::Excused, 0);
        mark(&mut snap, "2025-03-03", "alice", "p2", AttendanceStatus::OnTime, 0);
        snap.absences.push(AbsenceRange {
            id: "r".to_string(),
            person_id: "alice".to_string(),
            group_id: None,
            start_date: d("2025-03-04"),
            end_date: d("2025-03-04"),
            start_period_id: "p1".to_string(),
            end_period_id: "p2".to_string(),
            note: String::new(),
        });
        mark(&mut snap, "2025-03-04", "alice", "p1", AttendanceStatus::Absent, 0);

        let stats = summary_stats(&snap, "alice", &ReportRange::all(), at("2025-03-10", "08:00"));
        assert_eq!(stats.overall, MinuteTally { possible: 60, attended: 60 });
    }

    #[test]
    fn test_past_unmarked_does_not_count_but_active_does() {
        let mut snap = base();
        // bob makes both periods held today
        mark(&mut snap, "2025-03-04", "bob", "p1", AttendanceStatus::OnTime, 0);
        mark(&mut snap, "2025-03-04", "bob", "p2", AttendanceStatus::OnTime, 0);

        // p1 past, p2 active
        let stats = summary_stats(&snap, "alice", &ReportRange::all(), at("2025-03-04", "10:15"));
        assert_eq!(stats.overall, MinuteTally { possible: 60, attended: 0 });
        assert_eq!(stats.per_period[1].tally.possible, 60);
        assert_eq!(stats.per_period[0].tally.possible, 0);
    }

    #[test]
    fn test_future_periods_excluded() {
        let mut snap = base();
        mark(&mut snap, "2025-03-04", "alice", "p2", AttendanceStatus::OnTime, 0);
        let stats = summary_stats(&snap, "alice", &ReportRange::all(), at("2025-03-04", "09:30"));
        assert_eq!(stats.overall.possible, 0);
    }

    #[test]
    fn test_range_filters_dates() {
        let mut snap = base();
        mark(&mut snap, "2025-02-28", "alice", "p1", AttendanceStatus::Absent, 0);
        mark(&mut snap, "2025-03-03", "alice", "p1", AttendanceStatus::OnTime, 0);
        let range = ReportRange::this_month(d("2025-03-10"));
        let stats = summary_stats(&snap, "alice", &range, at("2025-03-10", "08:00"));
        assert_eq!(stats.overall.percentage().to_string(), "100.0");
    }

    #[test]
    fn test_weekly_trend_buckets_and_sorts() {
        let mut snap = base();
        // 2025-W10 and 2025-W11
        mark(&mut snap, "2025-03-10", "alice", "p1", AttendanceStatus::Absent, 0);
        mark(&mut snap, "2025-03-03", "alice", "p1", AttendanceStatus::OnTime, 0);
        mark(&mut snap, "2025-03-04", "alice", "p1", AttendanceStatus::Late, 30);
        // held by bob, alice unmarked: possible only
        mark(&mut snap, "2025-03-04", "bob", "p2", AttendanceStatus::OnTime, 0);
        // a week where alice is only excused is dropped
        mark(&mut snap, "2025-03-17", "alice", "p1", AttendanceStatus::Excused, 0);

        let trend = weekly_trend(&snap, "alice", &ReportRange::all(), at("2025-03-20", "08:00"));
        assert_eq!(trend.len(), 2);
        assert_eq!(trend[0].week, "2025-W10");
        assert_eq!(trend[0].possible, 180);
        assert_eq!(trend[0].attended, 90);
        assert!((trend[0].percentage - 50.0).abs() < 1e-9);
        assert_eq!(trend[1].week, "2025-W11");
        assert_eq!(trend[1].attended, 0);
    }

    #[test]
    fn test_weekly_trend_ignores_time_of_day() {
        let mut snap = base();
        mark(&mut snap, "2025-03-04", "alice", "p2", AttendanceStatus::OnTime, 0);
        let trend = weekly_trend(&snap, "alice", &ReportRange::all(), at("2025-03-04", "08:00"));
        assert_eq!(trend.len(), 1);
        assert_eq!(trend[0].attended, 60);
    }

    #[test]
    fn test_dashboard_and_bands() {
        let mut snap = base();
        let alice = Person::from_full_name("Alice Smith", Role::Student, "").unwrap();
        let bob = Person::from_full_name("Bob Jones", Role::Student, "").unwrap();
        mark(&mut snap, "2025-03-03", &alice.id, "p1", AttendanceStatus::OnTime, 0);

        let rows = dashboard(&snap, &[alice.clone(), bob.clone()], &ReportRange::all(), at("2025-03-10", "08:00"));
        assert_eq!(rows[0].name, "Alice Smith");
        assert_eq!(rows[0].percentage, Percentage::Value(100.0));
        assert_eq!(rows[1].percentage, Percentage::NotApplicable);

        let bands = BandThresholds::default();
        assert_eq!(bands.classify(rows[0].percentage), PercentageBand::Good);
        assert_eq!(bands.classify(rows[1].percentage), PercentageBand::Unknown);
        assert_eq!(bands.classify(Percentage::Value(59.9)), PercentageBand::Low);
        assert_eq!(bands.classify(Percentage::Value(60.0)), PercentageBand::Fair);
        assert_eq!(bands.classify(Percentage::Value(80.0)), PercentageBand::Good);
    }
}
