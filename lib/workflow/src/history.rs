//! Full-snapshot undo/redo history.
//!
//! Every discrete mutation records the snapshot taken *before* it. Undo swaps
//! the current snapshot for the most recent recorded one and parks the
//! current one on the redo stack. Any new recording clears the redo stack.

use serde::Deserialize;
use std::collections::VecDeque;

/// History settings for the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct HistoryConfig {
    /// Maximum number of undo steps kept; `0` keeps every step.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

fn default_history_limit() -> usize {
    100
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            history_limit: default_history_limit(),
        }
    }
}

/// Undo and redo stacks of whole snapshots.
#[derive(Debug, Clone)]
pub struct History<T> {
    undo: VecDeque<T>,
    redo: Vec<T>,
    limit: Option<usize>,
}

impl<T> History<T> {
    /// Creates an unbounded history.
    #[must_use]
    pub fn unbounded() -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            limit: None,
        }
    }

    /// Creates a history that keeps at most `limit` undo steps.
    #[must_use]
    pub fn bounded(limit: usize) -> Self {
        Self {
            limit: Some(limit.max(1)),
            ..Self::unbounded()
        }
    }

    /// Creates a history from config.
    #[must_use]
    pub fn from_config(config: HistoryConfig) -> Self {
        match config.history_limit {
            0 => Self::unbounded(),
            limit => Self::bounded(limit),
        }
    }

    /// Records the state prior to a mutation.
    pub fn record(&mut self, prior: T) {
        self.undo.push_back(prior);
        self.redo.clear();
        if let Some(limit) = self.limit {
            while self.undo.len() > limit {
                self.undo.pop_front();
            }
        }
    }

    /// Steps back, returning the state to restore.
    ///
    /// `current` is kept for a later redo. Returns `None` and drops nothing
    /// when there is nothing to undo.
    pub fn undo(&mut self, current: T) -> Option<T> {
        let previous = self.undo.pop_back()?;
        self.redo.push(current);
        Some(previous)
    }

    /// Steps forward again after an undo.
    pub fn redo(&mut self, current: T) -> Option<T> {
        let next = self.redo.pop()?;
        self.undo.push_back(current);
        Some(next)
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Number of available undo steps.
    #[must_use]
    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }
}

impl<T> Default for History<T> {
    fn default() -> Self {
        Self::from_config(HistoryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undo_then_redo() {
        let mut history = History::unbounded();
        history.record(1);

        assert_eq!(history.undo(2), Some(1));
        assert!(history.can_redo());
        assert_eq!(history.redo(1), Some(2));
        assert!(!history.can_redo());
    }

    #[test]
    fn empty_stacks_return_none() {
        let mut history: History<u8> = History::unbounded();
        assert_eq!(history.undo(0), None);
        assert_eq!(history.redo(0), None);
        assert!(!history.can_redo());
    }

    #[test]
    fn recording_clears_redo() {
        let mut history = History::unbounded();
        history.record("a");
        history.undo("b");
        assert!(history.can_redo());

        history.record("a");
        assert!(!history.can_redo());
    }

    #[test]
    fn bounded_drops_oldest() {
        let mut history = History::bounded(2);
        history.record(1);
        history.record(2);
        history.record(3);

        assert_eq!(history.undo_depth(), 2);
        assert_eq!(history.undo(4), Some(3));
        assert_eq!(history.undo(3), Some(2));
        assert_eq!(history.undo(2), None);
    }

    #[test]
    fn zero_limit_means_unbounded() {
        let mut history = History::from_config(HistoryConfig { history_limit: 0 });
        for step in 0..500 {
            history.record(step);
        }
        assert_eq!(history.undo_depth(), 500);
    }
}
