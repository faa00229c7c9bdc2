//! Attendance resolution and statistics engine.
//!
//! Decides what a person's attendance status *is* for any (person, date,
//! class period) cell, including cells nobody marked, and folds those
//! decisions into minute-weighted percentages and weekly trends. Also owns
//! the undo/redo model for a viewed day and the expansion of group absences
//! into per-person records.
//!
//! Zero I/O. Storage sits behind [`AttendanceSink`] and
//! [`AbsenceRepository`]; the current time is always passed in.

pub mod absence;
pub mod constants;
pub mod error;
pub mod group;
pub mod history;
pub mod model;
pub mod roster;
pub mod schedule;
pub mod session;
pub mod snapshot;
pub mod stats;
pub mod status;
pub mod time;

pub use absence::{covering_range, is_person_marked_out, ranges_for_person, validate_bounds};
pub use constants::{
    DEFAULT_EXCUSED_NOTE, DEFAULT_PERIOD_MINUTES, FAIR_BAND_THRESHOLD, LATE_DEFAULT_DIVISOR,
    LOW_BAND_THRESHOLD, MAX_MINUTES_LATE, MAX_PERIOD_MINUTES,
};
pub use error::ValidationError;
pub use group::{
    AbsenceDraft, AbsenceRepository, GroupCoordinator, GroupError, GroupPlan, GroupRequest,
    GroupSummary, MemoryAbsences, list_groups, plan_group, plan_single, split_by_end_date,
};
pub use history::AttendanceHistory;
pub use model::{
    AbsenceRange, AttendanceBook, AttendanceRecord, AttendanceStatus, DayAttendance, GroupId,
    Period, PeriodId, PersistentNotes, Person, PersonId, RecordId, Role, ScheduleOverride, new_id,
    split_name,
};
pub use roster::{SortKey, search, sort_people};
pub use schedule::{EffectivePeriod, PeriodSequence, active_period, effective_period, effective_periods};
pub use session::{AttendanceSink, DaySession, MarkOutcome};
pub use snapshot::{SNAPSHOT_VERSION, Snapshot, SnapshotExport, export_json, import_json};
pub use stats::{
    BandThresholds, DashboardRow, MinuteTally, Percentage, PercentageBand, PeriodStats,
    SummaryStats, WeeklyPoint, dashboard, summary_stats, weekly_trend,
};
pub use status::{MarkIntent, MarkPlan, ResolvedStatus, Resolver, plan_mark, plan_unmark_all};
pub use time::{ReportRange, format_minutes, local_now, parse_date, parse_time, parse_timestamp, week_id};
