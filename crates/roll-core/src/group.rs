//! Group absences: one logical absence fanned out to one record per person,
//! all sharing a group id.

use std::collections::HashSet;
use std::convert::Infallible;

use chrono::NaiveDate;
use thiserror::Error;

use crate::absence::validate_bounds;
use crate::error::ValidationError;
use crate::model::{AbsenceRange, GroupId, PeriodId, PersonId, RecordId};
use crate::schedule::PeriodSequence;

/// The shared part of an absence: dates, boundary periods and note.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AbsenceDraft {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub start_period_id: PeriodId,
    pub end_period_id: PeriodId,
    pub note: String,
}

impl AbsenceDraft {
    pub fn validate(&self, sequence: &PeriodSequence) -> Result<(), ValidationError> {
        validate_bounds(
            self.start_date,
            self.end_date,
            &self.start_period_id,
            &self.end_period_id,
            sequence,
        )
    }

    fn to_record(&self, id: RecordId, person_id: &str, group_id: Option<GroupId>) -> AbsenceRange {
        AbsenceRange {
            id,
            person_id: person_id.to_string(),
            group_id,
            start_date: self.start_date,
            end_date: self.end_date,
            start_period_id: self.start_period_id.clone(),
            end_period_id: self.end_period_id.clone(),
            note: self.note.trim().to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupRequest {
    /// Group being edited; `None` creates a new group.
    pub editing: Option<GroupId>,
    pub people: Vec<PersonId>,
    pub draft: AbsenceDraft,
}

/// Records to write for one group save.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupPlan {
    pub group_id: GroupId,
    /// Every existing record with this group id is deleted first.
    pub replaces: Option<GroupId>,
    pub records: Vec<AbsenceRange>,
}

/// Validate a group request and expand it into per-person records.
///
/// Duplicate people are collapsed. Editing keeps the existing group id.
pub fn plan_group(
    request: &GroupRequest,
    sequence: &PeriodSequence,
    next_id: &mut impl FnMut() -> String,
) -> Result<GroupPlan, ValidationError> {
    let mut seen = HashSet::new();
    let people: Vec<&PersonId> = request
        .people
        .iter()
        .filter(|p| seen.insert(p.as_str()))
        .collect();
    if people.is_empty() {
        return Err(ValidationError::NoPeopleSelected);
    }
    request.draft.validate(sequence)?;

    let group_id = match &request.editing {
        Some(id) => id.clone(),
        None => next_id(),
    };
    let records = people
        .into_iter()
        .map(|person| request.draft.to_record(next_id(), person, Some(group_id.clone())))
        .collect();

    Ok(GroupPlan {
        group_id,
        replaces: request.editing.clone(),
        records,
    })
}

/// A standalone absence for one person, with no group id.
pub fn plan_single(
    person_id: &str,
    draft: &AbsenceDraft,
    sequence: &PeriodSequence,
    id: RecordId,
) -> Result<AbsenceRange, ValidationError> {
    draft.validate(sequence)?;
    Ok(draft.to_record(id, person_id, None))
}

/// Storage for grouped absence records. Both operations must be atomic.
pub trait AbsenceRepository {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Delete every record of `plan.replaces` (if any) and insert `plan.records`.
    fn replace_group(&mut self, plan: &GroupPlan) -> Result<(), Self::Error>;

    /// Delete every record with `group_id`. Returns how many were removed.
    fn delete_group(&mut self, group_id: &str) -> Result<usize, Self::Error>;
}

#[derive(Debug, Error)]
pub enum GroupError<E: std::error::Error + 'static> {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("absence store failed: {0}")]
    Store(#[source] E),
}

/// Runs group writes against a repository.
pub struct GroupCoordinator<'r, R: AbsenceRepository> {
    repo: &'r mut R,
    sequence: &'r PeriodSequence,
}

impl<'r, R: AbsenceRepository> GroupCoordinator<'r, R> {
    pub fn new(repo: &'r mut R, sequence: &'r PeriodSequence) -> Self {
        Self { repo, sequence }
    }

    /// Create or replace a group. Returns the plan that was written.
    pub fn save(
        &mut self,
        request: &GroupRequest,
        next_id: &mut impl FnMut() -> String,
    ) -> Result<GroupPlan, GroupError<R::Error>> {
        let plan = plan_group(request, self.sequence, next_id)?;
        self.repo.replace_group(&plan).map_err(GroupError::Store)?;
        Ok(plan)
    }

    /// Delete every member of a group. Unknown ids remove nothing.
    pub fn delete(&mut self, group_id: &str) -> Result<usize, GroupError<R::Error>> {
        self.repo.delete_group(group_id).map_err(GroupError::Store)
    }
}

/// In-memory repository. Writes swap the whole record list at once.
#[derive(Clone, Debug, Default)]
pub struct MemoryAbsences {
    pub records: Vec<AbsenceRange>,
}

impl AbsenceRepository for MemoryAbsences {
    type Error = Infallible;

    fn replace_group(&mut self, plan: &GroupPlan) -> Result<(), Infallible> {
        let mut next: Vec<AbsenceRange> = self
            .records
            .iter()
            .filter(|r| plan.replaces.is_none() || r.group_id != plan.replaces)
            .cloned()
            .collect();
        next.extend(plan.records.iter().cloned());
        self.records = next;
        Ok(())
    }

    fn delete_group(&mut self, group_id: &str) -> Result<usize, Infallible> {
        let before = self.records.len();
        self.records
            .retain(|r| r.group_id.as_deref() != Some(group_id));
        Ok(before - self.records.len())
    }
}

/// One logical group absence, as listed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupSummary {
    pub group_id: GroupId,
    pub people: Vec<PersonId>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub start_period_id: PeriodId,
    pub end_period_id: PeriodId,
    pub note: String,
}

/// Collapse grouped records by group id, in first-seen order. Standalone
/// records are left out. Shared fields come from the first member.
pub fn list_groups(records: &[AbsenceRange]) -> Vec<GroupSummary> {
    let mut groups: Vec<GroupSummary> = Vec::new();
    for record in records {
        let Some(group_id) = &record.group_id else {
            continue;
        };
        match groups.iter_mut().find(|g| &g.group_id == group_id) {
            Some(group) => group.people.push(record.person_id.clone()),
            None => groups.push(GroupSummary {
                group_id: group_id.clone(),
                people: vec![record.person_id.clone()],
                start_date: record.start_date,
                end_date: record.end_date,
                start_period_id: record.start_period_id.clone(),
                end_period_id: record.end_period_id.clone(),
                note: record.note.clone(),
            }),
        }
    }
    groups
}

/// (upcoming, past): upcoming groups end today or later.
pub fn split_by_end_date(groups: Vec<GroupSummary>, today: NaiveDate) -> (Vec<GroupSummary>, Vec<GroupSummary>) {
    groups.into_iter().partition(|g| g.end_date >= today)
}
