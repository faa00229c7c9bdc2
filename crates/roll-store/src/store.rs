use std::fs;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{Connection, OptionalExtension, params};

use roll_core::time::{format_date, format_time, parse_date, parse_time, parse_timestamp};
use roll_core::{
    AbsenceRange, AbsenceRepository, AttendanceBook, AttendanceRecord, AttendanceSink,
    AttendanceStatus, DayAttendance, GroupPlan, Period, PersistentNotes, Person, Role,
    ScheduleOverride, Snapshot, ValidationError,
};

use crate::config::{DB_FILE, StoreConfig};
use crate::error::{Result, StoreError};
use crate::schema;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

pub struct Store {
    conn: Connection,
}

fn invalid(e: ValidationError) -> StoreError {
    StoreError::InvalidData(e.to_string())
}

fn date_col(s: &str) -> Result<NaiveDate> {
    parse_date(s).map_err(invalid)
}

fn format_timestamp(ts: NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

type AttendanceRow = (String, String, String, String, u32, Option<String>, String);

fn attendance_record(status: &str, minutes_late: u32, note: Option<String>, timestamp: &str) -> Result<AttendanceRecord> {
    Ok(AttendanceRecord {
        status: status.parse::<AttendanceStatus>().map_err(invalid)?,
        minutes_late,
        note,
        timestamp: parse_timestamp(timestamp).map_err(invalid)?,
    })
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with(path, &StoreConfig::default())
    }

    /// Open `path`, creating parent directories as needed.
    pub fn open_with(path: &Path, config: &StoreConfig) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let conn = Connection::open(path)?;
        schema::initialize(&conn)?;
        conn.pragma_update(None, "busy_timeout", config.busy_timeout_ms)?;
        Ok(Self { conn })
    }

    /// Open `<data_dir>/rollcall.db`.
    pub fn open_in_dir(data_dir: &Path, config: &StoreConfig) -> Result<Self> {
        Self::open_with(&data_dir.join(DB_FILE), config)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    // --- Metadata ---

    pub fn get_metadata(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM metadata WHERE key = ?1", [key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    pub fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    // --- People ---

    pub fn add_person(&self, person: &Person) -> Result<()> {
        insert_person(&self.conn, person)
    }

    /// Returns false when no person has this id.
    pub fn update_person(&self, person: &Person) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE people SET first_name = ?2, last_name = ?3, role = ?4, contact = ?5 WHERE id = ?1",
            params![
                person.id,
                person.first_name,
                person.last_name,
                person.role.as_str(),
                person.contact,
            ],
        )?;
        Ok(changed > 0)
    }

    /// Removes the person together with their attendance, absences and notes.
    pub fn remove_person(&self, id: &str) -> Result<bool> {
        let changed = self.conn.execute("DELETE FROM people WHERE id = ?1", [id])?;
        Ok(changed > 0)
    }

    pub fn get_person(&self, id: &str) -> Result<Option<Person>> {
        Ok(self.list_people()?.into_iter().find(|p| p.id == id))
    }

    pub fn list_people(&self) -> Result<Vec<Person>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, first_name, last_name, role, contact FROM people
             ORDER BY last_name COLLATE NOCASE, first_name COLLATE NOCASE",
        )?;
        let rows: Vec<(String, String, String, String, String)> = stmt
            .query_map([], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
            })?
            .collect::<std::result::Result<_, _>>()?;

        rows.into_iter()
            .map(|(id, first_name, last_name, role, contact)| {
                Ok(Person {
                    id,
                    first_name,
                    last_name,
                    role: role.parse::<Role>().map_err(invalid)?,
                    contact,
                })
            })
            .collect()
    }

    // --- Periods ---

    pub fn add_period(&self, period: &Period) -> Result<()> {
        insert_period(&self.conn, period)
    }

    pub fn update_period(&self, period: &Period) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE periods SET name = ?2, start_time = ?3, duration_minutes = ?4 WHERE id = ?1",
            params![
                period.id,
                period.name,
                format_time(period.start_time),
                period.duration_minutes,
            ],
        )?;
        Ok(changed > 0)
    }

    /// Removes the period with its overrides, attendance and notes.
    pub fn remove_period(&self, id: &str) -> Result<bool> {
        let changed = self.conn.execute("DELETE FROM periods WHERE id = ?1", [id])?;
        Ok(changed > 0)
    }

    pub fn get_period(&self, id: &str) -> Result<Option<Period>> {
        Ok(self.list_periods()?.into_iter().find(|p| p.id == id))
    }

    /// Periods ordered by nominal start time.
    pub fn list_periods(&self) -> Result<Vec<Period>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, start_time, duration_minutes FROM periods ORDER BY start_time, rowid",
        )?;
        let rows: Vec<(String, String, String, u32)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)))?
            .collect::<std::result::Result<_, _>>()?;

        rows.into_iter()
            .map(|(id, name, start, duration_minutes)| {
                Ok(Period {
                    id,
                    name,
                    start_time: parse_time(&start).map_err(invalid)?,
                    duration_minutes,
                })
            })
            .collect()
    }

    // --- Schedule overrides ---

    /// Upsert; the last write for a (date, period) wins.
    pub fn set_override(&self, o: &ScheduleOverride) -> Result<()> {
        insert_override(&self.conn, o)
    }

    pub fn clear_override(&self, date: NaiveDate, period_id: &str) -> Result<bool> {
        let changed = self.conn.execute(
            "DELETE FROM schedule_overrides WHERE date = ?1 AND period_id = ?2",
            params![format_date(date), period_id],
        )?;
        Ok(changed > 0)
    }

    pub fn list_overrides(&self) -> Result<Vec<ScheduleOverride>> {
        let mut stmt = self
            .conn
            .prepare("SELECT date, period_id, new_time FROM schedule_overrides ORDER BY date, period_id")?;
        let rows: Vec<(String, String, String)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
            .collect::<std::result::Result<_, _>>()?;

        rows.into_iter()
            .map(|(date, period_id, new_time)| {
                Ok(ScheduleOverride {
                    date: date_col(&date)?,
                    period_id,
                    new_time: parse_time(&new_time).map_err(invalid)?,
                })
            })
            .collect()
    }

    // --- Attendance ---

    pub fn load_day(&self, date: NaiveDate) -> Result<DayAttendance> {
        let mut stmt = self.conn.prepare(
            "SELECT date, person_id, period_id, status, minutes_late, note, timestamp
             FROM attendance WHERE date = ?1",
        )?;
        let rows: Vec<AttendanceRow> = stmt
            .query_map([format_date(date)], read_attendance_row)?
            .collect::<std::result::Result<_, _>>()?;

        let mut day = DayAttendance::new();
        for (_, person_id, period_id, status, minutes_late, note, timestamp) in rows {
            day.set(
                &person_id,
                &period_id,
                attendance_record(&status, minutes_late, note, &timestamp)?,
            );
        }
        Ok(day)
    }

    pub fn load_attendance(&self) -> Result<AttendanceBook> {
        let mut stmt = self.conn.prepare(
            "SELECT date, person_id, period_id, status, minutes_late, note, timestamp FROM attendance",
        )?;
        let rows: Vec<AttendanceRow> = stmt
            .query_map([], read_attendance_row)?
            .collect::<std::result::Result<_, _>>()?;

        let mut book = AttendanceBook::new();
        for (date, person_id, period_id, status, minutes_late, note, timestamp) in rows {
            book.entry(date_col(&date)?).or_default().set(
                &person_id,
                &period_id,
                attendance_record(&status, minutes_late, note, &timestamp)?,
            );
        }
        Ok(book)
    }

    fn write_day(&self, date: NaiveDate, day: &DayAttendance) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM attendance WHERE date = ?1", [format_date(date)])?;
        for (person_id, period_id, record) in day.cells() {
            insert_attendance(&tx, date, person_id, period_id, record)?;
        }
        tx.commit()?;
        tracing::debug!(date = %date, cells = day.len(), "day overwritten");
        Ok(())
    }

    // --- Absences ---

    pub fn add_absence(&self, range: &AbsenceRange) -> Result<()> {
        insert_absence(&self.conn, range)
    }

    /// Replace a single absence record in place. Returns false if it is gone.
    pub fn update_absence(&self, range: &AbsenceRange) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE absence_ranges
             SET person_id = ?2, group_id = ?3, start_date = ?4, end_date = ?5,
                 start_period_id = ?6, end_period_id = ?7, note = ?8
             WHERE id = ?1",
            params![
                range.id,
                range.person_id,
                range.group_id,
                format_date(range.start_date),
                format_date(range.end_date),
                range.start_period_id,
                range.end_period_id,
                range.note,
            ],
        )?;
        Ok(changed > 0)
    }

    pub fn delete_absence(&self, id: &str) -> Result<bool> {
        let changed = self.conn.execute("DELETE FROM absence_ranges WHERE id = ?1", [id])?;
        Ok(changed > 0)
    }

    pub fn get_absence(&self, id: &str) -> Result<Option<AbsenceRange>> {
        Ok(self.list_absences()?.into_iter().find(|r| r.id == id))
    }

    /// All absence records in insertion order.
    pub fn list_absences(&self) -> Result<Vec<AbsenceRange>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, person_id, group_id, start_date, end_date, start_period_id, end_period_id, note
             FROM absence_ranges ORDER BY rowid",
        )?;
        #[allow(clippy::type_complexity)]
        let rows: Vec<(String, String, Option<String>, String, String, String, String, String)> = stmt
            .query_map([], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                    row.get(6)?,
                    row.get(7)?,
                ))
            })?
            .collect::<std::result::Result<_, _>>()?;

        rows.into_iter()
            .map(
                |(id, person_id, group_id, start, end, start_period_id, end_period_id, note)| {
                    Ok(AbsenceRange {
                        id,
                        person_id,
                        group_id,
                        start_date: date_col(&start)?,
                        end_date: date_col(&end)?,
                        start_period_id,
                        end_period_id,
                        note,
                    })
                },
            )
            .collect()
    }

    // --- Persistent notes ---

    /// Upsert a note; an empty note deletes it.
    pub fn set_note(&self, person_id: &str, period_id: &str, note: &str) -> Result<()> {
        if note.trim().is_empty() {
            self.conn.execute(
                "DELETE FROM persistent_notes WHERE person_id = ?1 AND period_id = ?2",
                params![person_id, period_id],
            )?;
        } else {
            self.conn.execute(
                "INSERT OR REPLACE INTO persistent_notes (person_id, period_id, note) VALUES (?1, ?2, ?3)",
                params![person_id, period_id, note],
            )?;
        }
        Ok(())
    }

    pub fn load_notes(&self) -> Result<PersistentNotes> {
        let mut stmt = self
            .conn
            .prepare("SELECT person_id, period_id, note FROM persistent_notes")?;
        let rows: Vec<(String, String, String)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
            .collect::<std::result::Result<_, _>>()?;

        let mut notes = PersistentNotes::default();
        for (person_id, period_id, note) in rows {
            notes.set(&person_id, &period_id, &note);
        }
        Ok(notes)
    }

    // --- Snapshots ---

    pub fn load_snapshot(&self) -> Result<Snapshot> {
        Ok(Snapshot {
            people: self.list_people()?,
            periods: self.list_periods()?,
            overrides: self.list_overrides()?,
            attendance: self.load_attendance()?,
            absences: self.list_absences()?,
            notes: self.load_notes()?,
        })
    }

    /// Replace the entire contents of the store with `snapshot`.
    pub fn save_snapshot(&self, snapshot: &Snapshot) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;

        tx.execute_batch(
            "DELETE FROM attendance; DELETE FROM absence_ranges; DELETE FROM persistent_notes;
             DELETE FROM schedule_overrides; DELETE FROM periods; DELETE FROM people;",
        )?;

        for person in &snapshot.people {
            insert_person(&tx, person)?;
        }
        for period in &snapshot.periods {
            insert_period(&tx, period)?;
        }
        for o in &snapshot.overrides {
            insert_override(&tx, o)?;
        }
        for (date, day) in &snapshot.attendance {
            for (person_id, period_id, record) in day.cells() {
                insert_attendance(&tx, *date, person_id, period_id, record)?;
            }
        }
        for range in &snapshot.absences {
            insert_absence(&tx, range)?;
        }
        for (person_id, period_id, note) in snapshot.notes.iter() {
            tx.execute(
                "INSERT INTO persistent_notes (person_id, period_id, note) VALUES (?1, ?2, ?3)",
                params![person_id, period_id, note],
            )?;
        }

        tx.commit()?;
        tracing::info!(
            people = snapshot.people.len(),
            periods = snapshot.periods.len(),
            days = snapshot.attendance.len(),
            "snapshot saved"
        );
        Ok(())
    }
}

fn read_attendance_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AttendanceRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn insert_person(conn: &Connection, person: &Person) -> Result<()> {
    conn.execute(
        "INSERT INTO people (id, first_name, last_name, role, contact) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            person.id,
            person.first_name,
            person.last_name,
            person.role.as_str(),
            person.contact,
        ],
    )?;
    Ok(())
}

fn insert_period(conn: &Connection, period: &Period) -> Result<()> {
    conn.execute(
        "INSERT INTO periods (id, name, start_time, duration_minutes) VALUES (?1, ?2, ?3, ?4)",
        params![
            period.id,
            period.name,
            format_time(period.start_time),
            period.duration_minutes,
        ],
    )?;
    Ok(())
}

fn insert_override(conn: &Connection, o: &ScheduleOverride) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schedule_overrides (date, period_id, new_time) VALUES (?1, ?2, ?3)",
        params![format_date(o.date), o.period_id, format_time(o.new_time)],
    )?;
    Ok(())
}

fn insert_attendance(
    conn: &Connection,
    date: NaiveDate,
    person_id: &str,
    period_id: &str,
    record: &AttendanceRecord,
) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO attendance (date, person_id, period_id, status, minutes_late, note, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            format_date(date),
            person_id,
            period_id,
            record.status.label(),
            record.minutes_late,
            record.note,
            format_timestamp(record.timestamp),
        ],
    )?;
    Ok(())
}

fn insert_absence(conn: &Connection, range: &AbsenceRange) -> Result<()> {
    conn.execute(
        "INSERT INTO absence_ranges
         (id, person_id, group_id, start_date, end_date, start_period_id, end_period_id, note)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            range.id,
            range.person_id,
            range.group_id,
            format_date(range.start_date),
            format_date(range.end_date),
            range.start_period_id,
            range.end_period_id,
            range.note,
        ],
    )?;
    Ok(())
}

impl AttendanceSink for Store {
    type Error = StoreError;

    fn upsert_cell(
        &mut self,
        date: NaiveDate,
        person_id: &str,
        period_id: &str,
        record: &AttendanceRecord,
    ) -> Result<()> {
        insert_attendance(&self.conn, date, person_id, period_id, record)
    }

    fn delete_cell(&mut self, date: NaiveDate, person_id: &str, period_id: &str) -> Result<()> {
        self.conn.execute(
            "DELETE FROM attendance WHERE date = ?1 AND person_id = ?2 AND period_id = ?3",
            params![format_date(date), person_id, period_id],
        )?;
        Ok(())
    }

    fn overwrite_day(&mut self, date: NaiveDate, day: &DayAttendance) -> Result<()> {
        self.write_day(date, day)
    }
}

impl AbsenceRepository for Store {
    type Error = StoreError;

    fn replace_group(&mut self, plan: &GroupPlan) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        let mut removed = 0;
        if let Some(group_id) = &plan.replaces {
            removed = tx.execute("DELETE FROM absence_ranges WHERE group_id = ?1", [group_id])?;
        }
        for range in &plan.records {
            insert_absence(&tx, range)?;
        }
        tx.commit()?;
        tracing::debug!(
            group = %plan.group_id,
            removed,
            inserted = plan.records.len(),
            "group absence replaced"
        );
        Ok(())
    }

    fn delete_group(&mut self, group_id: &str) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let removed = tx.execute("DELETE FROM absence_ranges WHERE group_id = ?1", [group_id])?;
        tx.commit()?;
        tracing::debug!(group = %group_id, removed, "group absence deleted");
        Ok(removed)
    }
}
