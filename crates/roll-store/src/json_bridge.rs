use std::fs;
use std::path::Path;

use chrono::NaiveDateTime;
use roll_core::{export_json, import_json};

use crate::error::{Result, StoreError};
use crate::store::Store;

impl Store {
    /// Replace the store contents with a JSON export file.
    pub fn import_json_file(&self, path: &Path) -> Result<()> {
        let json = fs::read_to_string(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.import_json_str(&json)
    }

    pub fn import_json_str(&self, json: &str) -> Result<()> {
        let snapshot =
            import_json(json).map_err(|e| StoreError::InvalidData(format!("invalid JSON: {e}")))?;
        self.save_snapshot(&snapshot)
    }

    pub fn export_json_file(&self, path: &Path, exported_at: NaiveDateTime) -> Result<()> {
        let json = self.export_json_string(exported_at)?;
        fs::write(path, json).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn export_json_string(&self, exported_at: NaiveDateTime) -> Result<String> {
        let snapshot = self.load_snapshot()?;
        export_json(&snapshot, exported_at)
            .map_err(|e| StoreError::InvalidData(format!("JSON export failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roll_core::{AbsenceRange, Period, Person, Role, parse_date, parse_time};

    fn exported_at() -> NaiveDateTime {
        parse_date("2025-03-04")
            .unwrap()
            .and_time(parse_time("12:00").unwrap())
    }

    fn populated() -> Store {
        let store = Store::open_in_memory().unwrap();
        let person = Person::from_full_name("Grace Hopper", Role::Staff, "grace@example.org").unwrap();
        let period = Period::new("Compilers", parse_time("13:00").unwrap(), 90).unwrap();
        store.add_person(&person).unwrap();
        store.add_period(&period).unwrap();
        store
            .add_absence(&AbsenceRange {
                id: "a1".to_string(),
                person_id: person.id.clone(),
                group_id: None,
                start_date: parse_date("2025-03-10").unwrap(),
                end_date: parse_date("2025-03-12").unwrap(),
                start_period_id: period.id.clone(),
                end_period_id: period.id.clone(),
                note: "conference".to_string(),
            })
            .unwrap();
        store
    }

    #[test]
    fn test_import_export_roundtrip() {
        let store = populated();
        let json = store.export_json_string(exported_at()).unwrap();

        let other = Store::open_in_memory().unwrap();
        other.import_json_str(&json).unwrap();
        assert_eq!(other.load_snapshot().unwrap(), store.load_snapshot().unwrap());
    }

    #[test]
    fn test_export_file_has_envelope() {
        let store = populated();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.json");
        store.export_json_file(&path, exported_at()).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["version"], "1");
        assert_eq!(value["exportedAt"], "2025-03-04T12:00:00");
        assert_eq!(value["snapshot"]["absences"][0]["note"], "conference");

        let other = Store::open_in_memory().unwrap();
        other.import_json_file(&path).unwrap();
        assert_eq!(other.list_absences().unwrap().len(), 1);
    }

    #[test]
    fn test_invalid_json_leaves_store_untouched() {
        let store = populated();
        let err = store.import_json_str("{\"version\": 1").unwrap_err();
        assert!(matches!(err, StoreError::InvalidData(_)));
        assert_eq!(store.list_people().unwrap().len(), 1);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let store = Store::open_in_memory().unwrap();
        let err = store.import_json_file(Path::new("/nonexistent/roll.json")).unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
    }
}
