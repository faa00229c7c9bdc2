//! Searching, filtering and ordering people for display.

use std::cmp::Ordering;

use crate::model::{PeriodId, PersistentNotes, Person, Role};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SortKey {
    FirstName,
    LastName,
    /// People with a persistent note for this period first, then by last name.
    Note(PeriodId),
}

/// Case-insensitive substring match on first or last name. An empty query
/// matches everyone.
pub fn matches_query(person: &Person, query: &str) -> bool {
    let query = query.trim().to_lowercase();
    query.is_empty()
        || person.first_name.to_lowercase().contains(&query)
        || person.last_name.to_lowercase().contains(&query)
}

pub fn search<'a>(people: &'a [Person], query: &str, role: Option<Role>) -> Vec<&'a Person> {
    people
        .iter()
        .filter(|p| role.is_none_or(|r| p.role == r))
        .filter(|p| matches_query(p, query))
        .collect()
}

fn by_name(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b))
}

fn by_last_then_first(a: &Person, b: &Person) -> Ordering {
    by_name(&a.last_name, &b.last_name).then_with(|| by_name(&a.first_name, &b.first_name))
}

pub fn sort_people(people: &mut [&Person], key: &SortKey, notes: &PersistentNotes) {
    match key {
        SortKey::FirstName => people.sort_by(|a, b| {
            by_name(&a.first_name, &b.first_name).then_with(|| by_name(&a.last_name, &b.last_name))
        }),
        SortKey::LastName => people.sort_by(|a, b| by_last_then_first(a, b)),
        SortKey::Note(period_id) => people.sort_by(|a, b| {
            let a_noted = notes.get(&a.id, period_id).is_some();
            let b_noted = notes.get(&b.id, period_id).is_some();
            b_noted.cmp(&a_noted).then_with(|| by_last_then_first(a, b))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person(id: &str, first: &str, last: &str, role: Role) -> Person {
        Person {
            id: id.to_string(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            role,
            contact: String::new(),
        }
    }

    fn roster() -> Vec<Person> {
        vec![
            person("1", "Dana", "Zimmer", Role::Student),
            person("2", "avi", "Levi", Role::Student),
            person("3", "Ben", "Adler", Role::Staff),
        ]
    }

    #[test]
    fn test_search_is_case_insensitive_on_either_name() {
        let people = roster();
        let ids = |found: Vec<&Person>| found.iter().map(|p| p.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(search(&people, "AVI", None)), vec!["2"]);
        assert_eq!(ids(search(&people, "ler", None)), vec!["3"]);
        assert_eq!(search(&people, "", None).len(), 3);
        assert_eq!(ids(search(&people, "", Some(Role::Staff))), vec!["3"]);
    }

    #[test]
    fn test_sort_by_names() {
        let people = roster();
        let mut refs: Vec<&Person> = people.iter().collect();
        let notes = PersistentNotes::default();

        sort_people(&mut refs, &SortKey::LastName, &notes);
        assert_eq!(refs.iter().map(|p| p.id.as_str()).collect::<Vec<_>>(), vec!["3", "2", "1"]);

        sort_people(&mut refs, &SortKey::FirstName, &notes);
        assert_eq!(refs.iter().map(|p| p.id.as_str()).collect::<Vec<_>>(), vec!["2", "3", "1"]);
    }

    #[test]
    fn test_sort_by_note_puts_noted_first() {
        let people = roster();
        let mut refs: Vec<&Person> = people.iter().collect();
        let mut notes = PersistentNotes::default();
        notes.set("1", "p1", "front row");

        sort_people(&mut refs, &SortKey::Note("p1".to_string()), &notes);
        assert_eq!(refs.iter().map(|p| p.id.as_str()).collect::<Vec<_>>(), vec!["1", "3", "2"]);
    }
}
