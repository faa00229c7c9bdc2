//! Resolve the PERSON / PERIOD arguments users type into stored records.
//!
//! A key matches by exact id, then by exact name (case-insensitive), then by
//! a unique name search or id prefix. Ambiguous keys are errors.

use anyhow::{Result, bail};
use roll_core::{AbsenceRange, GroupSummary, Period, Person, search};

pub fn find_person<'a>(people: &'a [Person], key: &str) -> Result<&'a Person> {
    if let Some(person) = people.iter().find(|p| p.id == key) {
        return Ok(person);
    }
    let wanted = key.trim().to_lowercase();
    if let Some(person) = people
        .iter()
        .find(|p| p.full_name().to_lowercase() == wanted)
    {
        return Ok(person);
    }
    let mut candidates = search(people, key, None);
    if candidates.is_empty() {
        candidates = people.iter().filter(|p| p.id.starts_with(key)).collect();
    }
    match candidates.as_slice() {
        [] => bail!("no person matches '{key}'"),
        [person] => Ok(person),
        many => bail!(
            "'{key}' matches {} people: {}",
            many.len(),
            many.iter()
                .map(|p| p.full_name())
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

pub fn find_period<'a>(periods: &'a [Period], key: &str) -> Result<&'a Period> {
    if let Some(period) = periods.iter().find(|p| p.id == key) {
        return Ok(period);
    }
    let wanted = key.trim().to_lowercase();
    let by_name: Vec<&Period> = periods
        .iter()
        .filter(|p| p.name.to_lowercase() == wanted)
        .collect();
    let candidates = if by_name.is_empty() {
        periods.iter().filter(|p| p.id.starts_with(key)).collect()
    } else {
        by_name
    };
    match candidates.as_slice() {
        [] => bail!("no period matches '{key}'"),
        [period] => Ok(period),
        many => bail!("'{key}' matches {} periods", many.len()),
    }
}

/// Absence records and groups match by id or unique id prefix.
pub fn find_absence<'a>(records: &'a [AbsenceRange], key: &str) -> Result<&'a AbsenceRange> {
    by_id_prefix(records, key, |r| &r.id, "absence")
}

pub fn find_group<'a>(groups: &'a [GroupSummary], key: &str) -> Result<&'a GroupSummary> {
    by_id_prefix(groups, key, |g| &g.group_id, "group")
}

fn by_id_prefix<'a, T>(
    items: &'a [T],
    key: &str,
    id: impl Fn(&T) -> &String,
    kind: &str,
) -> Result<&'a T> {
    if let Some(item) = items.iter().find(|&i| id(i) == key) {
        return Ok(item);
    }
    let candidates: Vec<&T> = items.iter().filter(|&i| id(i).starts_with(key)).collect();
    match candidates.as_slice() {
        [] => bail!("no {kind} matches '{key}'"),
        [item] => Ok(item),
        many => bail!("'{key}' matches {} {kind} records", many.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roll_core::{Role, parse_time};

    fn people() -> Vec<Person> {
        vec![
            Person::from_full_name("Alice Baker", Role::Student, "").unwrap(),
            Person::from_full_name("Alan Turing", Role::Staff, "").unwrap(),
            Person::from_full_name("Bob Cohen", Role::Student, "").unwrap(),
        ]
    }

    #[test]
    fn test_person_by_full_name_and_search() {
        let people = people();
        assert_eq!(find_person(&people, "alice baker").unwrap().first_name, "Alice");
        assert_eq!(find_person(&people, "Bob").unwrap().last_name, "Cohen");
        assert_eq!(find_person(&people, &people[1].id).unwrap().last_name, "Turing");
    }

    #[test]
    fn test_person_ambiguous_or_missing() {
        let people = people();
        let err = find_person(&people, "Al").unwrap_err();
        assert!(err.to_string().contains("matches 2 people"));
        assert!(find_person(&people, "Zed").is_err());
    }

    #[test]
    fn test_period_by_name_or_id_prefix() {
        let math = Period::new("Math", parse_time("09:00").unwrap(), 60).unwrap();
        let art = Period::new("Art", parse_time("10:00").unwrap(), 60).unwrap();
        let periods = vec![math.clone(), art];
        assert_eq!(find_period(&periods, "math").unwrap().id, math.id);
        assert_eq!(find_period(&periods, &math.id[..8]).unwrap().id, math.id);
        assert!(find_period(&periods, "History").is_err());
    }
}
