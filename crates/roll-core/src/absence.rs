//! Absence range matching and bounds validation.

use chrono::NaiveDate;

use crate::error::ValidationError;
use crate::model::AbsenceRange;
use crate::schedule::PeriodSequence;

impl AbsenceRange {
    /// Whether this range excuses the period at `period_index` on `date`.
    ///
    /// Days strictly inside a multi-day range are fully covered. On the first
    /// day coverage runs from the start period onward, on the last day up
    /// through the end period, and a single-day range covers
    /// `[start, end]`. A period (or bound) missing from `sequence` never
    /// matches on a boundary day, whichever bound is missing; a lost start
    /// bound must not widen coverage to the whole first day.
    pub fn covers(
        &self,
        date: NaiveDate,
        period_index: Option<usize>,
        sequence: &PeriodSequence,
    ) -> bool {
        if date < self.start_date || date > self.end_date {
            return false;
        }
        let on_start = date == self.start_date;
        let on_end = date == self.end_date;
        if !on_start && !on_end {
            return true;
        }

        let Some(index) = period_index else {
            return false;
        };
        let start_index = sequence.index_of(&self.start_period_id);
        let end_index = sequence.index_of(&self.end_period_id);

        if self.is_single_day() {
            matches!((start_index, end_index), (Some(s), Some(e)) if s <= index && index <= e)
        } else if on_start {
            start_index.is_some_and(|s| index >= s)
        } else {
            end_index.is_some_and(|e| index <= e)
        }
    }
}

/// The first of `person_id`'s ranges that covers the cell, if any.
pub fn covering_range<'a>(
    person_id: &str,
    date: NaiveDate,
    period_id: &str,
    sequence: &PeriodSequence,
    records: &'a [AbsenceRange],
) -> Option<&'a AbsenceRange> {
    let index = sequence.index_of(period_id);
    records
        .iter()
        .filter(|r| r.person_id == person_id)
        .find(|r| r.covers(date, index, sequence))
}

pub fn is_person_marked_out(
    person_id: &str,
    date: NaiveDate,
    period_id: &str,
    sequence: &PeriodSequence,
    records: &[AbsenceRange],
) -> bool {
    covering_range(person_id, date, period_id, sequence, records).is_some()
}

/// Check that a range is well formed before it is written.
pub fn validate_bounds(
    start_date: NaiveDate,
    end_date: NaiveDate,
    start_period_id: &str,
    end_period_id: &str,
    sequence: &PeriodSequence,
) -> Result<(), ValidationError> {
    if end_date < start_date {
        return Err(ValidationError::EndBeforeStart {
            start: start_date,
            end: end_date,
        });
    }
    let start_index = sequence
        .index_of(start_period_id)
        .ok_or_else(|| ValidationError::UnknownPeriod(start_period_id.to_string()))?;
    let end_index = sequence
        .index_of(end_period_id)
        .ok_or_else(|| ValidationError::UnknownPeriod(end_period_id.to_string()))?;
    if start_date == end_date && end_index < start_index {
        return Err(ValidationError::EndPeriodBeforeStart);
    }
    Ok(())
}

/// A person's ranges, most recent start first.
pub fn ranges_for_person<'a>(records: &'a [AbsenceRange], person_id: &str) -> Vec<&'a AbsenceRange> {
    let mut ranges: Vec<&AbsenceRange> = records.iter().filter(|r| r.person_id == person_id).collect();
    ranges.sort_by(|a, b| b.start_date.cmp(&a.start_date));
    ranges
}
