//! Authoritative status of one (person, date, period) cell, and planning of
//! status writes.
//!
//! Resolution order:
//! 1. an absence range covering the cell excuses it,
//! 2. an explicit record is returned as stored,
//! 3. a past period with no record is unmarked (and flagged "excused by
//!    default" when somebody else was marked in it),
//! 4. anything else is not marked yet.

use chrono::{NaiveDate, NaiveDateTime};

use crate::absence::covering_range;
use crate::constants::{DEFAULT_EXCUSED_NOTE, LATE_DEFAULT_DIVISOR, MAX_MINUTES_LATE};
use crate::model::{
    AbsenceRange, AttendanceRecord, AttendanceStatus, DayAttendance, PersonId, RecordId,
    ScheduleOverride,
};
use crate::schedule::{EffectivePeriod, PeriodSequence, effective_period};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolvedStatus {
    /// Covered by an absence range. The note belongs to the range.
    RangeExcused { range_id: RecordId, note: String },
    Recorded(AttendanceRecord),
    /// A past period with no record for this person.
    Unmarked { default_excused: bool },
    NotMarked,
}

impl ResolvedStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ResolvedStatus::RangeExcused { .. } => AttendanceStatus::Excused.label(),
            ResolvedStatus::Recorded(record) => record.status.label(),
            ResolvedStatus::Unmarked { .. } => "Unmarked",
            ResolvedStatus::NotMarked => "Not Marked",
        }
    }

    /// Note shown for the cell. The default-excused sentinel is display-only.
    pub fn note(&self) -> Option<&str> {
        match self {
            ResolvedStatus::RangeExcused { note, .. } => Some(note.as_str()),
            ResolvedStatus::Recorded(record) => record.note.as_deref(),
            ResolvedStatus::Unmarked {
                default_excused: true,
            } => Some(DEFAULT_EXCUSED_NOTE),
            _ => None,
        }
    }

    pub fn minutes_late(&self) -> u32 {
        match self {
            ResolvedStatus::Recorded(record) => record.minutes_late,
            _ => 0,
        }
    }

    /// The stored status, if the cell has an explicit record.
    pub fn explicit_status(&self) -> Option<AttendanceStatus> {
        match self {
            ResolvedStatus::Recorded(record) => Some(record.status),
            _ => None,
        }
    }

    /// Excused by a range or by an explicit Excused record.
    pub fn is_excused(&self) -> bool {
        matches!(self, ResolvedStatus::RangeExcused { .. })
            || self.explicit_status() == Some(AttendanceStatus::Excused)
    }

    pub fn is_range_excused(&self) -> bool {
        matches!(self, ResolvedStatus::RangeExcused { .. })
    }
}

/// Everything needed to classify cells, borrowed from a snapshot.
#[derive(Clone, Copy, Debug)]
pub struct Resolver<'a> {
    pub sequence: &'a PeriodSequence,
    pub overrides: &'a [ScheduleOverride],
    pub absences: &'a [AbsenceRange],
    pub now: NaiveDateTime,
}

impl<'a> Resolver<'a> {
    pub fn new(
        sequence: &'a PeriodSequence,
        overrides: &'a [ScheduleOverride],
        absences: &'a [AbsenceRange],
        now: NaiveDateTime,
    ) -> Self {
        Self {
            sequence,
            overrides,
            absences,
            now,
        }
    }

    pub fn effective(&self, period_id: &str, date: NaiveDate) -> Option<EffectivePeriod> {
        effective_period(self.sequence, self.overrides, date, period_id)
    }

    pub fn covering(&self, person_id: &str, date: NaiveDate, period_id: &str) -> Option<&'a AbsenceRange> {
        covering_range(person_id, date, period_id, self.sequence, self.absences)
    }

    pub fn is_marked_out(&self, person_id: &str, date: NaiveDate, period_id: &str) -> bool {
        self.covering(person_id, date, period_id).is_some()
    }

    pub fn resolve(
        &self,
        person_id: &str,
        period: &EffectivePeriod,
        date: NaiveDate,
        day: &DayAttendance,
    ) -> ResolvedStatus {
        if let Some(range) = self.covering(person_id, date, &period.id) {
            return ResolvedStatus::RangeExcused {
                range_id: range.id.clone(),
                note: range.note.clone(),
            };
        }
        if let Some(record) = day.get(person_id, &period.id) {
            return ResolvedStatus::Recorded(record.clone());
        }
        if period.is_past(date, self.now) {
            return ResolvedStatus::Unmarked {
                default_excused: day.is_held(&period.id),
            };
        }
        ResolvedStatus::NotMarked
    }

    /// Like [`Resolver::resolve`], but an unknown period id is Not Marked.
    pub fn resolve_by_id(
        &self,
        person_id: &str,
        period_id: &str,
        date: NaiveDate,
        day: &DayAttendance,
    ) -> ResolvedStatus {
        match self.effective(period_id, date) {
            Some(period) => self.resolve(person_id, &period, date, day),
            None => ResolvedStatus::NotMarked,
        }
    }
}

/// A requested change to one cell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MarkIntent {
    /// Status button: choosing the status already stored clears the cell.
    Toggle {
        status: AttendanceStatus,
        note: Option<String>,
        minutes_late: Option<i64>,
    },
    /// Direct edit (lateness or note): always writes.
    Set {
        status: AttendanceStatus,
        note: Option<String>,
        minutes_late: Option<i64>,
    },
    Clear,
}

impl MarkIntent {
    pub fn toggle(status: AttendanceStatus) -> Self {
        MarkIntent::Toggle {
            status,
            note: None,
            minutes_late: None,
        }
    }

    pub fn set(status: AttendanceStatus) -> Self {
        MarkIntent::Set {
            status,
            note: None,
            minutes_late: None,
        }
    }
}

/// What a write should do to storage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MarkPlan {
    /// The person is covered by an absence range; nothing is written.
    Rejected { range_id: RecordId },
    /// The period is not in the sequence; nothing is written.
    Ignored,
    Clear,
    Save(AttendanceRecord),
}

/// Lateness assumed for a Late mark without explicit minutes, before clamping.
///
/// Today it is the time elapsed since the effective start; any other day it
/// is a quarter of the period.
pub fn default_minutes_late(period: &EffectivePeriod, date: NaiveDate, now: NaiveDateTime) -> i64 {
    if date == now.date() {
        (now - period.start_on(date)).num_minutes().max(0)
    } else {
        i64::from(period.duration_minutes / LATE_DEFAULT_DIVISOR)
    }
}

pub fn clamp_minutes_late(minutes: i64) -> u32 {
    minutes.clamp(0, i64::from(MAX_MINUTES_LATE)) as u32
}

pub fn plan_mark(
    resolver: &Resolver<'_>,
    date: NaiveDate,
    day: &DayAttendance,
    person_id: &str,
    period_id: &str,
    intent: MarkIntent,
) -> MarkPlan {
    if let Some(range) = resolver.covering(person_id, date, period_id) {
        return MarkPlan::Rejected {
            range_id: range.id.clone(),
        };
    }
    let Some(period) = resolver.effective(period_id, date) else {
        return MarkPlan::Ignored;
    };

    let (status, note, minutes_late) = match intent {
        MarkIntent::Clear => return MarkPlan::Clear,
        MarkIntent::Toggle {
            status,
            note,
            minutes_late,
        } => {
            if day.get(person_id, period_id).map(|r| r.status) == Some(status) {
                return MarkPlan::Clear;
            }
            (status, note, minutes_late)
        }
        MarkIntent::Set {
            status,
            note,
            minutes_late,
        } => (status, note, minutes_late),
    };

    let minutes_late = match status {
        AttendanceStatus::Late => clamp_minutes_late(
            minutes_late.unwrap_or_else(|| default_minutes_late(&period, date, resolver.now)),
        ),
        _ => 0,
    };
    let note = match status {
        AttendanceStatus::Excused => note.filter(|n| !n.trim().is_empty()),
        _ => None,
    };

    MarkPlan::Save(AttendanceRecord {
        status,
        minutes_late,
        note,
        timestamp: resolver.now,
    })
}

/// The day with every explicit record for `period_id` removed, plus the
/// people whose cells were dropped.
pub fn plan_unmark_all(day: &DayAttendance, period_id: &str) -> (DayAttendance, Vec<PersonId>) {
    let people = day.marked_people(period_id);
    let mut next = day.clone();
    for person in &people {
        next.remove(person, period_id);
    }
    (next, people)
}
