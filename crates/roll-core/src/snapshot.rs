//! The full input bundle the core works from, and its JSON export format.
//!
//! The export wraps the snapshot in a small envelope:
//! `{ "version": "1", "exportedAt": "...", "snapshot": { ... } }`.
//! Field names are camelCase, dates `YYYY-MM-DD`, times `HH:MM`.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::model::{
    AbsenceRange, AttendanceBook, DayAttendance, PersistentNotes, Period, Person, ScheduleOverride,
};
use crate::schedule::PeriodSequence;
use crate::status::Resolver;

pub const SNAPSHOT_VERSION: &str = "1";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub people: Vec<Person>,
    #[serde(default)]
    pub periods: Vec<Period>,
    #[serde(default)]
    pub overrides: Vec<ScheduleOverride>,
    #[serde(default)]
    pub attendance: AttendanceBook,
    #[serde(default)]
    pub absences: Vec<AbsenceRange>,
    #[serde(default)]
    pub notes: PersistentNotes,
}

impl Snapshot {
    pub fn sequence(&self) -> PeriodSequence {
        PeriodSequence::new(self.periods.iter().cloned())
    }

    /// Attendance for `date`; empty when nothing was recorded.
    pub fn day(&self, date: NaiveDate) -> DayAttendance {
        self.attendance.get(&date).cloned().unwrap_or_default()
    }

    pub fn person(&self, person_id: &str) -> Option<&Person> {
        self.people.iter().find(|p| p.id == person_id)
    }

    pub fn resolver<'a>(&'a self, sequence: &'a PeriodSequence, now: NaiveDateTime) -> Resolver<'a> {
        Resolver::new(sequence, &self.overrides, &self.absences, now)
    }
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotExport {
    pub version: String,
    pub exported_at: NaiveDateTime,
    pub snapshot: Snapshot,
}

pub fn export_json(snapshot: &Snapshot, exported_at: NaiveDateTime) -> Result<String, serde_json::Error> {
    let export = SnapshotExport {
        version: SNAPSHOT_VERSION.to_string(),
        exported_at,
        snapshot: snapshot.clone(),
    };
    serde_json::to_string_pretty(&export)
}

pub fn import_json(json: &str) -> Result<Snapshot, serde_json::Error> {
    let export: SnapshotExport = serde_json::from_str(json)?;
    Ok(export.snapshot)
}
