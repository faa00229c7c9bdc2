//! Period ordering, date-scoped start-time overrides, and past/active checks.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::model::{Period, PeriodId, ScheduleOverride};
use crate::time::minutes_since_midnight;

/// Periods ordered by nominal start time.
///
/// The position of a period in this sequence is its *period index*, used by
/// absence ranges. Overrides never move a period within the sequence.
#[derive(Clone, Debug, Default)]
pub struct PeriodSequence {
    periods: Vec<Period>,
}

impl PeriodSequence {
    pub fn new(periods: impl IntoIterator<Item = Period>) -> Self {
        let mut periods: Vec<Period> = periods.into_iter().collect();
        // stable: equal start times keep their input order
        periods.sort_by_key(|p| p.start_time);
        Self { periods }
    }

    pub fn periods(&self) -> &[Period] {
        &self.periods
    }

    pub fn len(&self) -> usize {
        self.periods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    pub fn index_of(&self, period_id: &str) -> Option<usize> {
        self.periods.iter().position(|p| p.id == period_id)
    }

    pub fn get(&self, period_id: &str) -> Option<&Period> {
        self.periods.iter().find(|p| p.id == period_id)
    }

    pub fn first(&self) -> Option<&Period> {
        self.periods.first()
    }

    pub fn last(&self) -> Option<&Period> {
        self.periods.last()
    }
}

/// A period as it runs on one particular date.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EffectivePeriod {
    pub id: PeriodId,
    pub name: String,
    pub start: NaiveTime,
    pub duration_minutes: u32,
    pub overridden: bool,
}

impl EffectivePeriod {
    pub fn start_minutes(&self) -> u32 {
        minutes_since_midnight(self.start)
    }

    /// Saturates: stored or imported periods are not bounded like new ones.
    pub fn end_minutes(&self) -> u32 {
        self.start_minutes().saturating_add(self.duration_minutes)
    }

    pub fn start_on(&self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(self.start)
    }

    /// True for any period on an earlier date, or one that has ended today.
    pub fn is_past(&self, date: NaiveDate, now: NaiveDateTime) -> bool {
        let today = now.date();
        date < today || (date == today && minutes_since_midnight(now.time()) >= self.end_minutes())
    }

    /// True while the period is running today.
    pub fn is_active(&self, date: NaiveDate, now: NaiveDateTime) -> bool {
        if date != now.date() {
            return false;
        }
        let current = minutes_since_midnight(now.time());
        self.start_minutes() <= current && current < self.end_minutes()
    }
}

fn override_for<'a>(
    overrides: &'a [ScheduleOverride],
    date: NaiveDate,
    period_id: &str,
) -> Option<&'a ScheduleOverride> {
    overrides
        .iter()
        .find(|o| o.date == date && o.period_id == period_id)
}

fn effective(period: &Period, overrides: &[ScheduleOverride], date: NaiveDate) -> EffectivePeriod {
    let replacement = override_for(overrides, date, &period.id);
    EffectivePeriod {
        id: period.id.clone(),
        name: period.name.clone(),
        start: replacement.map_or(period.start_time, |o| o.new_time),
        duration_minutes: period.duration_minutes,
        overridden: replacement.is_some(),
    }
}

/// The day's periods in sequence order with overrides applied.
pub fn effective_periods(
    sequence: &PeriodSequence,
    overrides: &[ScheduleOverride],
    date: NaiveDate,
) -> Vec<EffectivePeriod> {
    sequence
        .periods()
        .iter()
        .map(|p| effective(p, overrides, date))
        .collect()
}

pub fn effective_period(
    sequence: &PeriodSequence,
    overrides: &[ScheduleOverride],
    date: NaiveDate,
    period_id: &str,
) -> Option<EffectivePeriod> {
    sequence.get(period_id).map(|p| effective(p, overrides, date))
}

/// The period currently running on `date`, if `date` is today.
///
/// Scans `periods` in the order given and keeps the last one whose effective
/// start is not after the current minute. An override that moves a period
/// out of chronological order is resolved by list position, not by time.
pub fn active_period(
    periods: &[EffectivePeriod],
    now: NaiveDateTime,
    date: NaiveDate,
) -> Option<&EffectivePeriod> {
    if date != now.date() {
        return None;
    }
    let current = minutes_since_midnight(now.time());
    let mut active = None;
    for period in periods {
        if current >= period.start_minutes() {
            active = Some(period);
        }
    }
    active
}
