use chrono::NaiveDate;
use thiserror::Error;

use crate::model::PeriodId;

/// Input rejected before anything is written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("End date cannot be before start date.")]
    EndBeforeStart { start: NaiveDate, end: NaiveDate },

    #[error("End class cannot be before start class on a single-day absence.")]
    EndPeriodBeforeStart,

    #[error("Please select at least one person.")]
    NoPeopleSelected,

    #[error("unknown class period: {0}")]
    UnknownPeriod(PeriodId),

    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("invalid time '{0}', expected HH:MM")]
    InvalidTime(String),

    #[error("invalid timestamp '{0}', expected YYYY-MM-DDTHH:MM")]
    InvalidTimestamp(String),

    #[error("unknown attendance status '{0}'")]
    UnknownStatus(String),

    #[error("unknown role '{0}', expected student or staff")]
    UnknownRole(String),

    #[error("period duration must be at least one minute")]
    ZeroDuration,

    #[error("period duration of {0} minutes is longer than a day")]
    DurationTooLong(u32),

    #[error("name must not be empty")]
    EmptyName,
}
