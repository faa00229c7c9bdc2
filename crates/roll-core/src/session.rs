//! The viewed day: its attendance snapshot, undo/redo history, and the write
//! paths that go through the storage collaborator.

use chrono::NaiveDate;

use crate::history::AttendanceHistory;
use crate::model::{AttendanceRecord, DayAttendance, RecordId};
use crate::status::{MarkIntent, MarkPlan, Resolver, plan_mark, plan_unmark_all};

/// Write side of attendance storage.
pub trait AttendanceSink {
    type Error;

    fn upsert_cell(
        &mut self,
        date: NaiveDate,
        person_id: &str,
        period_id: &str,
        record: &AttendanceRecord,
    ) -> Result<(), Self::Error>;

    fn delete_cell(&mut self, date: NaiveDate, person_id: &str, period_id: &str) -> Result<(), Self::Error>;

    /// Replace everything stored for `date` with `day`.
    fn overwrite_day(&mut self, date: NaiveDate, day: &DayAttendance) -> Result<(), Self::Error>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MarkOutcome {
    /// Covered by an absence range; nothing written.
    Rejected { range_id: RecordId },
    /// Unknown period or nothing to clear; nothing written.
    Ignored,
    Cleared,
    Saved(AttendanceRecord),
}

#[derive(Clone, Debug)]
pub struct DaySession {
    date: NaiveDate,
    day: DayAttendance,
    history: AttendanceHistory,
}

impl DaySession {
    pub fn open(date: NaiveDate, day: DayAttendance) -> Self {
        let mut history = AttendanceHistory::new();
        history.view(date);
        Self { date, day, history }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn day(&self) -> &DayAttendance {
        &self.day
    }

    pub fn history(&self) -> &AttendanceHistory {
        &self.history
    }

    /// Move to another date with its freshly loaded attendance.
    pub fn view(&mut self, date: NaiveDate, day: DayAttendance) {
        self.history.view(date);
        self.date = date;
        self.day = day;
    }

    /// Replace the snapshot after an external change. History is kept.
    pub fn refresh(&mut self, day: DayAttendance) {
        self.day = day;
    }

    pub fn mark<S: AttendanceSink>(
        &mut self,
        sink: &mut S,
        resolver: &Resolver<'_>,
        person_id: &str,
        period_id: &str,
        intent: MarkIntent,
    ) -> Result<MarkOutcome, S::Error> {
        match plan_mark(resolver, self.date, &self.day, person_id, period_id, intent) {
            MarkPlan::Rejected { range_id } => Ok(MarkOutcome::Rejected { range_id }),
            MarkPlan::Ignored => Ok(MarkOutcome::Ignored),
            MarkPlan::Clear => {
                if self.day.get(person_id, period_id).is_none() {
                    return Ok(MarkOutcome::Ignored);
                }
                let redo = self.history.record(&self.day);
                if let Err(e) = sink.delete_cell(self.date, person_id, period_id) {
                    self.history.revert(redo);
                    return Err(e);
                }
                self.day.remove(person_id, period_id);
                Ok(MarkOutcome::Cleared)
            }
            MarkPlan::Save(record) => {
                let redo = self.history.record(&self.day);
                if let Err(e) = sink.upsert_cell(self.date, person_id, period_id, &record) {
                    self.history.revert(redo);
                    return Err(e);
                }
                self.day.set(person_id, period_id, record.clone());
                Ok(MarkOutcome::Saved(record))
            }
        }
    }

    /// Remove every explicit mark for `period_id` on the viewed date.
    /// Returns how many cells were cleared.
    pub fn unmark_all<S: AttendanceSink>(&mut self, sink: &mut S, period_id: &str) -> Result<usize, S::Error> {
        let (next, people) = plan_unmark_all(&self.day, period_id);
        if people.is_empty() {
            return Ok(0);
        }
        let redo = self.history.record(&self.day);
        if let Err(e) = sink.overwrite_day(self.date, &next) {
            self.history.revert(redo);
            return Err(e);
        }
        self.day = next;
        Ok(people.len())
    }

    /// Returns false when there is nothing to undo.
    pub fn undo<S: AttendanceSink>(&mut self, sink: &mut S) -> Result<bool, S::Error> {
        let Some(previous) = self.history.peek_undo().cloned() else {
            return Ok(false);
        };
        sink.overwrite_day(self.date, &previous)?;
        self.history.undo(&self.day);
        self.day = previous;
        Ok(true)
    }

    pub fn redo<S: AttendanceSink>(&mut self, sink: &mut S) -> Result<bool, S::Error> {
        let Some(next) = self.history.peek_redo().cloned() else {
            return Ok(false);
        };
        sink.overwrite_day(self.date, &next)?;
        self.history.redo(&self.day);
        self.day = next;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::NaiveDateTime;

    use super::*;
    use crate::model::{AbsenceRange, AttendanceStatus, Period};
    use crate::schedule::PeriodSequence;
    use crate::time::{parse_date, parse_time};

    #[derive(Default)]
    struct MemorySink {
        days: BTreeMap<NaiveDate, DayAttendance>,
        fail: bool,
        writes: usize,
    }

    impl AttendanceSink for MemorySink {
        type Error = String;

        fn upsert_cell(
            &mut self,
            date: NaiveDate,
            person_id: &str,
            period_id: &str,
            record: &AttendanceRecord,
        ) -> Result<(), String> {
            if self.fail {
                return Err("offline".to_string());
            }
            self.writes += 1;
            self.days
                .entry(date)
                .or_default()
                .set(person_id, period_id, record.clone());
            Ok(())
        }

        fn delete_cell(&mut self, date: NaiveDate, person_id: &str, period_id: &str) -> Result<(), String> {
            if self.fail {
                return Err("offline".to_string());
            }
            self.writes += 1;
            if let Some(day) = self.days.get_mut(&date) {
                day.remove(person_id, period_id);
            }
            Ok(())
        }

        fn overwrite_day(&mut self, date: NaiveDate, day: &DayAttendance) -> Result<(), String> {
            if self.fail {
                return Err("offline".to_string());
            }
            self.writes += 1;
            self.days.insert(date, day.clone());
            Ok(())
        }
    }

    fn date() -> NaiveDate {
        parse_date("2025-03-04").unwrap()
    }

    fn now() -> NaiveDateTime {
        date().and_time(parse_time("09:20").unwrap())
    }

    fn sequence() -> PeriodSequence {
        PeriodSequence::new(vec![Period {
            id: "p1".to_string(),
            name: "Math".to_string(),
            start_time: parse_time("09:00").unwrap(),
            duration_minutes: 50,
        }])
    }

    #[test]
    fn test_mark_undo_redo_through_sink() {
        let seq = sequence();
        let resolver = Resolver::new(&seq, &[], &[], now());
        let mut sink = MemorySink::default();
        let mut session = DaySession::open(date(), DayAttendance::new());

        let outcome = session
            .mark(&mut sink, &resolver, "alice", "p1", MarkIntent::toggle(AttendanceStatus::OnTime))
            .unwrap();
        assert!(matches!(outcome, MarkOutcome::Saved(_)));
        assert_eq!(sink.days[&date()].len(), 1);

        assert!(session.undo(&mut sink).unwrap());
        assert!(session.day().is_empty());
        assert!(sink.days[&date()].is_empty());

        assert!(session.redo(&mut sink).unwrap());
        assert_eq!(
            session.day().get("alice", "p1").map(|r| r.status),
            Some(AttendanceStatus::OnTime)
        );
        assert!(!session.redo(&mut sink).unwrap());
    }

    #[test]
    fn test_toggle_twice_clears() {
        let seq = sequence();
        let resolver = Resolver::new(&seq, &[], &[], now());
        let mut sink = MemorySink::default();
        let mut session = DaySession::open(date(), DayAttendance::new());

        let late = MarkIntent::toggle(AttendanceStatus::Late);
        session.mark(&mut sink, &resolver, "alice", "p1", late.clone()).unwrap();
        let outcome = session.mark(&mut sink, &resolver, "alice", "p1", late).unwrap();
        assert_eq!(outcome, MarkOutcome::Cleared);
        assert!(session.day().get("alice", "p1").is_none());
        assert_eq!(session.history().undo_depth(), 2);
    }

    #[test]
    fn test_rejected_mark_writes_nothing() {
        let seq = sequence();
        let ranges = vec![AbsenceRange {
            id: "r1".to_string(),
            person_id: "alice".to_string(),
            group_id: None,
            start_date: date(),
            end_date: date(),
            start_period_id: "p1".to_string(),
            end_period_id: "p1".to_string(),
            note: String::new(),
        }];
        let resolver = Resolver::new(&seq, &[], &ranges, now());
        let mut sink = MemorySink::default();
        let mut session = DaySession::open(date(), DayAttendance::new());

        let outcome = session
            .mark(&mut sink, &resolver, "alice", "p1", MarkIntent::toggle(AttendanceStatus::Absent))
            .unwrap();
        assert_eq!(outcome, MarkOutcome::Rejected { range_id: "r1".to_string() });
        assert_eq!(sink.writes, 0);
        assert!(!session.history().can_undo());
    }

    #[test]
    fn test_failed_write_leaves_state_untouched() {
        let seq = sequence();
        let resolver = Resolver::new(&seq, &[], &[], now());
        let mut sink = MemorySink {
            fail: true,
            ..MemorySink::default()
        };
        let mut session = DaySession::open(date(), DayAttendance::new());

        let result = session.mark(&mut sink, &resolver, "alice", "p1", MarkIntent::toggle(AttendanceStatus::OnTime));
        assert_eq!(result, Err("offline".to_string()));
        assert!(session.day().is_empty());
        assert!(!session.history().can_undo());
    }

    #[test]
    fn test_unmark_all_is_undoable() {
        let seq = sequence();
        let resolver = Resolver::new(&seq, &[], &[], now());
        let mut sink = MemorySink::default();
        let mut session = DaySession::open(date(), DayAttendance::new());

        for person in ["alice", "bob"] {
            session
                .mark(&mut sink, &resolver, person, "p1", MarkIntent::toggle(AttendanceStatus::OnTime))
                .unwrap();
        }
        assert_eq!(session.unmark_all(&mut sink, "p1").unwrap(), 2);
        assert!(session.day().is_empty());
        assert_eq!(session.unmark_all(&mut sink, "p1").unwrap(), 0);

        session.undo(&mut sink).unwrap();
        assert_eq!(session.day().len(), 2);
        assert_eq!(sink.days[&date()].len(), 2);
    }

    #[test]
    fn test_view_other_date_resets_history() {
        let seq = sequence();
        let resolver = Resolver::new(&seq, &[], &[], now());
        let mut sink = MemorySink::default();
        let mut session = DaySession::open(date(), DayAttendance::new());
        session
            .mark(&mut sink, &resolver, "alice", "p1", MarkIntent::toggle(AttendanceStatus::OnTime))
            .unwrap();

        session.view(parse_date("2025-03-05").unwrap(), DayAttendance::new());
        assert!(!session.undo(&mut sink).unwrap());
    }
}
