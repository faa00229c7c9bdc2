use rusqlite::Connection;

use crate::error::Result;

pub const SCHEMA_VERSION: i64 = 1;

pub const DEFAULT_BUSY_TIMEOUT_MS: u32 = 5000;

pub fn initialize(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA journal_mode = WAL;")?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.pragma_update(None, "busy_timeout", DEFAULT_BUSY_TIMEOUT_MS)?;

    // Dates are YYYY-MM-DD, times HH:MM, timestamps YYYY-MM-DDTHH:MM:SS.
    // Absence period bounds are not foreign keys: a range whose boundary
    // period was removed stays readable and simply stops matching.
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS metadata (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS people (
            id         TEXT PRIMARY KEY,
            first_name TEXT NOT NULL,
            last_name  TEXT NOT NULL DEFAULT '',
            role       TEXT NOT NULL DEFAULT 'student',
            contact    TEXT NOT NULL DEFAULT ''
        );

        CREATE TABLE IF NOT EXISTS periods (
            id               TEXT PRIMARY KEY,
            name             TEXT NOT NULL,
            start_time       TEXT NOT NULL,
            duration_minutes INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS schedule_overrides (
            date      TEXT NOT NULL,
            period_id TEXT NOT NULL REFERENCES periods(id) ON DELETE CASCADE,
            new_time  TEXT NOT NULL,
            PRIMARY KEY (date, period_id)
        );

        CREATE TABLE IF NOT EXISTS attendance (
            date         TEXT NOT NULL,
            person_id    TEXT NOT NULL REFERENCES people(id) ON DELETE CASCADE,
            period_id    TEXT NOT NULL REFERENCES periods(id) ON DELETE CASCADE,
            status       TEXT NOT NULL,
            minutes_late INTEGER NOT NULL DEFAULT 0,
            note         TEXT,
            timestamp    TEXT NOT NULL,
            PRIMARY KEY (date, person_id, period_id)
        );

        CREATE TABLE IF NOT EXISTS absence_ranges (
            id              TEXT PRIMARY KEY,
            person_id       TEXT NOT NULL REFERENCES people(id) ON DELETE CASCADE,
            group_id        TEXT,
            start_date      TEXT NOT NULL,
            end_date        TEXT NOT NULL,
            start_period_id TEXT NOT NULL,
            end_period_id   TEXT NOT NULL,
            note            TEXT NOT NULL DEFAULT ''
        );

        CREATE TABLE IF NOT EXISTS persistent_notes (
            person_id TEXT NOT NULL REFERENCES people(id) ON DELETE CASCADE,
            period_id TEXT NOT NULL REFERENCES periods(id) ON DELETE CASCADE,
            note      TEXT NOT NULL,
            PRIMARY KEY (person_id, period_id)
        );

        CREATE INDEX IF NOT EXISTS idx_absence_group ON absence_ranges(group_id);
        CREATE INDEX IF NOT EXISTS idx_absence_person ON absence_ranges(person_id);
        CREATE INDEX IF NOT EXISTS idx_attendance_person ON attendance(person_id);
        ",
    )?;

    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES ('schema_version', ?1)",
        [SCHEMA_VERSION.to_string()],
    )?;

    tracing::info!(version = SCHEMA_VERSION, "schema initialized");
    Ok(())
}

pub fn get_schema_version(conn: &Connection) -> Result<Option<i64>> {
    let mut stmt = conn.prepare("SELECT value FROM metadata WHERE key = 'schema_version'")?;
    let version = stmt
        .query_row([], |row| {
            let v: String = row.get(0)?;
            Ok(v.parse::<i64>().unwrap_or(0))
        })
        .ok();
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize_creates_tables() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        for table in &[
            "metadata",
            "people",
            "periods",
            "schedule_overrides",
            "attendance",
            "absence_ranges",
            "persistent_notes",
        ] {
            let count: i64 = conn
                .query_row(&format!("SELECT count(*) FROM {table}"), [], |row| {
                    row.get(0)
                })
                .unwrap();
            assert_eq!(count, 0, "table {table} should exist and be empty");
        }
    }

    #[test]
    fn test_schema_version_set() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), Some(SCHEMA_VERSION));
    }

    #[test]
    fn test_idempotent_initialize() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        initialize(&conn).unwrap();
    }

    #[test]
    fn test_busy_timeout_and_foreign_keys() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        let timeout: i64 = conn
            .query_row("PRAGMA busy_timeout", [], |row| row.get(0))
            .unwrap();
        assert_eq!(timeout, 5000);

        let fk: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 1);
    }
}
