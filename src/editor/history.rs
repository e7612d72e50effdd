//! Linear undo/redo log of committed editor states.

use std::num::NonZeroUsize;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    #[error("history log has not been started")]
    NotStarted,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HistoryAction {
    Undo,
    Redo,
}

impl HistoryAction {
    pub const fn applied_message(self) -> &'static str {
        match self {
            Self::Undo => "undo applied",
            Self::Redo => "redo applied",
        }
    }

    pub const fn empty_message(self) -> &'static str {
        match self {
            Self::Undo => "undo stack empty",
            Self::Redo => "redo stack empty",
        }
    }
}

/// Entries plus a cursor. An empty entry list means the log is not started yet;
/// once started it always holds at least the seed state.
#[derive(Debug, Clone)]
pub struct HistoryLog<T> {
    entries: Vec<T>,
    cursor: usize,
    max_depth: Option<NonZeroUsize>,
}

impl<T> Default for HistoryLog<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> HistoryLog<T> {
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
            cursor: 0,
            max_depth: None,
        }
    }

    /// Keeps at most `max_depth` entries, dropping the oldest first.
    pub fn with_max_depth(max_depth: Option<NonZeroUsize>) -> Self {
        Self {
            max_depth,
            ..Self::new()
        }
    }

    pub fn is_active(&self) -> bool {
        !self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn entries(&self) -> &[T] {
        &self.entries
    }

    pub fn current(&self) -> Option<&T> {
        self.entries.get(self.cursor)
    }

    pub fn can_undo(&self) -> bool {
        self.is_active() && self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.is_active() && self.cursor + 1 < self.entries.len()
    }

    pub fn start(&mut self, initial: T) {
        self.entries.clear();
        self.entries.push(initial);
        self.cursor = 0;
    }

    /// Discards every entry and reseeds the log, as after a destructive crop.
    pub fn reset_to(&mut self, initial: T) {
        self.start(initial);
    }

    /// Drops the redo branch, appends `state` and moves the cursor onto it.
    pub fn commit(&mut self, state: T) -> Result<usize, HistoryError> {
        if !self.is_active() {
            return Err(HistoryError::NotStarted);
        }
        self.entries.truncate(self.cursor + 1);
        self.entries.push(state);
        self.cursor = self.entries.len() - 1;
        self.enforce_max_depth();
        Ok(self.cursor)
    }

    pub fn undo(&mut self) -> Option<&T> {
        if !self.can_undo() {
            return None;
        }
        self.cursor -= 1;
        self.entries.get(self.cursor)
    }

    pub fn redo(&mut self) -> Option<&T> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        self.entries.get(self.cursor)
    }

    pub fn step(&mut self, action: HistoryAction) -> Option<&T> {
        match action {
            HistoryAction::Undo => self.undo(),
            HistoryAction::Redo => self.redo(),
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = 0;
    }

    fn enforce_max_depth(&mut self) {
        let Some(max_depth) = self.max_depth else {
            return;
        };
        let overflow = self.entries.len().saturating_sub(max_depth.get());
        if overflow > 0 {
            self.entries.drain(..overflow);
            self.cursor = self.cursor.saturating_sub(overflow);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn active_log(states: &[&'static str]) -> HistoryLog<&'static str> {
        let mut log = HistoryLog::new();
        let (first, rest) = states.split_first().expect("at least one state");
        log.start(*first);
        for state in rest {
            log.commit(*state).expect("log is active");
        }
        log
    }

    #[test]
    fn commit_before_start_is_rejected() {
        let mut log = HistoryLog::new();
        assert_eq!(log.commit("s1"), Err(HistoryError::NotStarted));
        assert!(!log.is_active());
        assert!(log.undo().is_none());
    }

    #[test]
    fn start_seeds_single_entry_at_cursor_zero() {
        let log = active_log(&["s0"]);
        assert_eq!(log.len(), 1);
        assert_eq!(log.cursor(), 0);
        assert_eq!(log.current(), Some(&"s0"));
        assert!(!log.can_undo());
        assert!(!log.can_redo());
    }

    #[test]
    fn undo_then_redo_round_trips_to_same_entry() {
        let mut log = active_log(&["s0", "s1", "s2"]);
        let before = *log.current().expect("current entry");
        assert_eq!(log.undo(), Some(&"s1"));
        assert_eq!(log.redo(), Some(&before));
        assert_eq!(log.cursor(), 2);
    }

    #[test]
    fn commit_after_undo_truncates_redo_branch() {
        let mut log = active_log(&["s0", "s1", "s2"]);
        assert_eq!(log.undo(), Some(&"s1"));
        assert_eq!(log.cursor(), 1);

        log.commit("s3").expect("log is active");
        assert_eq!(log.entries(), &["s0", "s1", "s3"]);
        assert_eq!(log.cursor(), 2);
        assert!(log.redo().is_none());
        assert_eq!(log.entries(), &["s0", "s1", "s3"]);
    }

    #[test]
    fn boundary_undo_and_redo_do_not_move_cursor_or_entries() {
        let mut log = active_log(&["s0", "s1"]);
        assert!(log.redo().is_none());
        assert_eq!(log.cursor(), 1);

        assert_eq!(log.undo(), Some(&"s0"));
        assert!(log.undo().is_none());
        assert_eq!(log.cursor(), 0);
        assert_eq!(log.entries(), &["s0", "s1"]);
    }

    #[test]
    fn reset_to_discards_everything_and_reseeds() {
        let mut log = active_log(&["s0", "s1", "s2"]);
        log.undo();
        log.reset_to("fresh");
        assert_eq!(log.entries(), &["fresh"]);
        assert_eq!(log.cursor(), 0);
    }

    #[test]
    fn max_depth_drops_oldest_entries_and_shifts_cursor() {
        let mut log = HistoryLog::with_max_depth(NonZeroUsize::new(3));
        log.start("s0");
        for state in ["s1", "s2", "s3", "s4"] {
            log.commit(state).expect("log is active");
        }
        assert_eq!(log.entries(), &["s2", "s3", "s4"]);
        assert_eq!(log.cursor(), 2);
        assert_eq!(log.undo(), Some(&"s3"));
    }

    #[test]
    fn step_dispatches_and_messages_describe_outcome() {
        let mut log = active_log(&["s0", "s1"]);
        assert_eq!(log.step(HistoryAction::Undo), Some(&"s0"));
        assert_eq!(log.step(HistoryAction::Redo), Some(&"s1"));
        assert_eq!(HistoryAction::Undo.applied_message(), "undo applied");
        assert_eq!(HistoryAction::Redo.empty_message(), "redo stack empty");
    }
}
