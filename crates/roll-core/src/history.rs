//! Undo/redo of whole-day attendance snapshots.
//!
//! Each entry is the full day as it was before a write, so undo and redo are
//! plain overwrites of the day. History only ever covers the viewed date.

use chrono::NaiveDate;

use crate::model::DayAttendance;

#[derive(Clone, Debug, Default)]
pub struct AttendanceHistory {
    date: Option<NaiveDate>,
    undo: Vec<DayAttendance>,
    redo: Vec<DayAttendance>,
}

impl AttendanceHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    /// Switch to `date`. Moving to a different date drops both stacks.
    pub fn view(&mut self, date: NaiveDate) {
        if self.date != Some(date) {
            self.undo.clear();
            self.redo.clear();
            self.date = Some(date);
        }
    }

    /// Snapshot `current` before a mutation. Returns the discarded redo stack
    /// so a failed write can put it back with [`AttendanceHistory::revert`].
    pub fn record(&mut self, current: &DayAttendance) -> Vec<DayAttendance> {
        self.undo.push(current.clone());
        std::mem::take(&mut self.redo)
    }

    /// Undo the last [`AttendanceHistory::record`].
    pub fn revert(&mut self, redo: Vec<DayAttendance>) {
        self.undo.pop();
        self.redo = redo;
    }

    pub fn peek_undo(&self) -> Option<&DayAttendance> {
        self.undo.last()
    }

    pub fn peek_redo(&self) -> Option<&DayAttendance> {
        self.redo.last()
    }

    /// Pop the previous state, pushing `current` onto the redo stack.
    pub fn undo(&mut self, current: &DayAttendance) -> Option<DayAttendance> {
        let previous = self.undo.pop()?;
        self.redo.push(current.clone());
        Some(previous)
    }

    pub fn redo(&mut self, current: &DayAttendance) -> Option<DayAttendance> {
        let next = self.redo.pop()?;
        self.undo.push(current.clone());
        Some(next)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo.len()
    }
}
