/// Upper bound for recorded lateness, in minutes.
pub const MAX_MINUTES_LATE: u32 = 50;

/// Late marks on a day other than today default to `duration / LATE_DEFAULT_DIVISOR`.
pub const LATE_DEFAULT_DIVISOR: u32 = 4;

/// Duration used when a period is created without one.
pub const DEFAULT_PERIOD_MINUTES: u32 = 60;

/// Longest period accepted at creation: one whole day.
pub const MAX_PERIOD_MINUTES: u32 = 24 * 60;

/// Display note for a past, held period the person was never marked in.
/// Never persisted and ignored by the aggregator.
pub const DEFAULT_EXCUSED_NOTE: &str = "Excused by default";

/// Percentages below this are reported as low.
pub const LOW_BAND_THRESHOLD: f64 = 60.0;

/// Percentages below this (and at or above the low threshold) are reported as fair.
pub const FAIR_BAND_THRESHOLD: f64 = 80.0;
