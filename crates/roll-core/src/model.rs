use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::MAX_PERIOD_MINUTES;
use crate::error::ValidationError;

pub type PersonId = String;
pub type PeriodId = String;
pub type RecordId = String;
pub type GroupId = String;

/// Fresh identifier for people, periods, absence records and groups.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Staff,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Staff => "staff",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "student" => Ok(Role::Student),
            "staff" => Ok(Role::Staff),
            _ => Err(ValidationError::UnknownRole(s.to_string())),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: PersonId,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    #[serde(default)]
    pub contact: String,
}

impl Person {
    /// Build a person from a single "First Last Name" string.
    /// The first word becomes the first name; the rest is the last name.
    pub fn from_full_name(
        full_name: &str,
        role: Role,
        contact: &str,
    ) -> Result<Self, ValidationError> {
        let (first_name, last_name) = split_name(full_name)?;
        Ok(Self {
            id: new_id(),
            first_name,
            last_name,
            role,
            contact: contact.to_string(),
        })
    }

    pub fn full_name(&self) -> String {
        if self.last_name.is_empty() {
            self.first_name.clone()
        } else {
            format!("{} {}", self.first_name, self.last_name)
        }
    }
}

pub fn split_name(full_name: &str) -> Result<(String, String), ValidationError> {
    let mut words = full_name.split_whitespace();
    let first = words.next().ok_or(ValidationError::EmptyName)?;
    Ok((first.to_string(), words.collect::<Vec<_>>().join(" ")))
}

/// A class slot with a nominal daily start time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Period {
    pub id: PeriodId,
    pub name: String,
    #[serde(with = "crate::time::hhmm")]
    pub start_time: NaiveTime,
    pub duration_minutes: u32,
}

impl Period {
    pub fn new(name: &str, start_time: NaiveTime, duration_minutes: u32) -> Result<Self, ValidationError> {
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if duration_minutes == 0 {
            return Err(ValidationError::ZeroDuration);
        }
        if duration_minutes > MAX_PERIOD_MINUTES {
            return Err(ValidationError::DurationTooLong(duration_minutes));
        }
        Ok(Self {
            id: new_id(),
            name: name.trim().to_string(),
            start_time,
            duration_minutes,
        })
    }
}

/// Replacement start time for one period on one date.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleOverride {
    pub date: NaiveDate,
    pub period_id: PeriodId,
    #[serde(with = "crate::time::hhmm")]
    pub new_time: NaiveTime,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttendanceStatus {
    #[serde(rename = "On Time")]
    OnTime,
    Late,
    Excused,
    Absent,
}

impl AttendanceStatus {
    pub fn label(&self) -> &'static str {
        match self {
            AttendanceStatus::OnTime => "On Time",
            AttendanceStatus::Late => "Late",
            AttendanceStatus::Excused => "Excused",
            AttendanceStatus::Absent => "Absent",
        }
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AttendanceStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "ontime" | "present" => Ok(AttendanceStatus::OnTime),
            "late" => Ok(AttendanceStatus::Late),
            "excused" => Ok(AttendanceStatus::Excused),
            "absent" => Ok(AttendanceStatus::Absent),
            _ => Err(ValidationError::UnknownStatus(s.to_string())),
        }
    }
}

/// An explicit mark for one (date, person, period) cell.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub status: AttendanceStatus,
    #[serde(default)]
    pub minutes_late: u32,
    #[serde(default)]
    pub note: Option<String>,
    pub timestamp: NaiveDateTime,
}

/// One day's explicit marks, person → period → record.
///
/// A missing cell means "not yet marked", which is not the same as Absent.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DayAttendance {
    cells: BTreeMap<PersonId, BTreeMap<PeriodId, AttendanceRecord>>,
}

impl DayAttendance {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, person_id: &str, period_id: &str) -> Option<&AttendanceRecord> {
        self.cells.get(person_id)?.get(period_id)
    }

    pub fn set(
        &mut self,
        person_id: &str,
        period_id: &str,
        record: AttendanceRecord,
    ) -> Option<AttendanceRecord> {
        self.cells
            .entry(person_id.to_string())
            .or_default()
            .insert(period_id.to_string(), record)
    }

    pub fn remove(&mut self, person_id: &str, period_id: &str) -> Option<AttendanceRecord> {
        let row = self.cells.get_mut(person_id)?;
        let removed = row.remove(period_id);
        if row.is_empty() {
            self.cells.remove(person_id);
        }
        removed
    }

    /// A period was held on this day if anyone has an explicit record for it.
    pub fn is_held(&self, period_id: &str) -> bool {
        self.cells.values().any(|row| row.contains_key(period_id))
    }

    /// People with an explicit record for `period_id`.
    pub fn marked_people(&self, period_id: &str) -> Vec<PersonId> {
        self.cells
            .iter()
            .filter(|(_, row)| row.contains_key(period_id))
            .map(|(person, _)| person.clone())
            .collect()
    }

    pub fn person_records(&self, person_id: &str) -> impl Iterator<Item = (&PeriodId, &AttendanceRecord)> {
        self.cells.get(person_id).into_iter().flat_map(|row| row.iter())
    }

    /// Every explicit cell as (person, period, record).
    pub fn cells(&self) -> impl Iterator<Item = (&PersonId, &PeriodId, &AttendanceRecord)> {
        self.cells
            .iter()
            .flat_map(|(person, row)| row.iter().map(move |(period, rec)| (person, period, rec)))
    }

    pub fn len(&self) -> usize {
        self.cells.values().map(|row| row.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// All attendance, keyed by date.
pub type AttendanceBook = BTreeMap<NaiveDate, DayAttendance>;

/// Excuses one person across a contiguous span of days and, on the boundary
/// days, a contiguous span of periods.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbsenceRange {
    pub id: RecordId,
    pub person_id: PersonId,
    #[serde(default)]
    pub group_id: Option<GroupId>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub start_period_id: PeriodId,
    pub end_period_id: PeriodId,
    #[serde(default)]
    pub note: String,
}

impl AbsenceRange {
    pub fn is_single_day(&self) -> bool {
        self.start_date == self.end_date
    }
}

/// Sticky per-(person, period) annotations, independent of date.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersistentNotes {
    notes: BTreeMap<PersonId, BTreeMap<PeriodId, String>>,
}

impl PersistentNotes {
    pub fn get(&self, person_id: &str, period_id: &str) -> Option<&str> {
        self.notes
            .get(person_id)?
            .get(period_id)
            .map(String::as_str)
    }

    /// Upsert a note. An empty (or blank) note removes the entry.
    pub fn set(&mut self, person_id: &str, period_id: &str, note: &str) {
        if note.trim().is_empty() {
            if let Some(row) = self.notes.get_mut(person_id) {
                row.remove(period_id);
                if row.is_empty() {
                    self.notes.remove(person_id);
                }
            }
            return;
        }
        self.notes
            .entry(person_id.to_string())
            .or_default()
            .insert(period_id.to_string(), note.to_string());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PersonId, &PeriodId, &String)> {
        self.notes
            .iter()
            .flat_map(|(person, row)| row.iter().map(move |(period, note)| (person, period, note)))
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}
