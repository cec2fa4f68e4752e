//! Undo/redo history for synchronization cycles.
//!
//! Every committed cycle pushes one [`UndoEntry`]: plain-data before/after
//! snapshots of each document it rewrote plus the group timeline it changed.
//! Undo and redo replay snapshots in strict stack order; entries are data,
//! not closures, so the engine owns all re-application logic.

use std::collections::VecDeque;
use std::path::PathBuf;

use cue_core::{EnclosingStatement, Statement, Timeline};

use crate::core::errors::{EditorError, Result};
use crate::groups::GroupId;

/// The typed statement set of one synchronizer at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementSnapshot {
    Lines(Vec<Statement>),
    Blocks(Vec<EnclosingStatement>),
}

/// One document's full restorable state.
#[derive(Debug, Clone)]
pub struct DocState {
    pub text: String,
    pub statements: StatementSnapshot,
}

/// Before/after states of one document touched by a cycle.
#[derive(Debug, Clone)]
pub struct DocRollback {
    pub path: PathBuf,
    pub before: DocState,
    pub after: DocState,
}

/// Before/after states of the group timeline touched by a cycle.
#[derive(Debug, Clone)]
pub struct TimelineRollback {
    pub group: GroupId,
    pub before: Timeline,
    pub after: Timeline,
}

/// One undoable synchronization cycle.
#[derive(Debug, Clone, Default)]
pub struct UndoEntry {
    pub docs: Vec<DocRollback>,
    pub timeline: Option<TimelineRollback>,
}

impl UndoEntry {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty() && self.timeline.is_none()
    }
}

/// History configuration.
#[derive(Debug, Clone, Copy)]
pub struct UndoStackConfig {
    /// Oldest entries are dropped beyond this count.
    pub max_entries: usize,
}

impl Default for UndoStackConfig {
    fn default() -> Self {
        Self { max_entries: 100 }
    }
}

/// LIFO undo stack with a bounded redo companion.
#[derive(Debug, Default)]
pub struct UndoStack {
    undo: VecDeque<UndoEntry>,
    redo: Vec<UndoEntry>,
    config: UndoStackConfig,
}

impl UndoStack {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(config: UndoStackConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Record a freshly committed cycle. Clears the redo stack: redo is only
    /// valid immediately after undo.
    pub fn push(&mut self, entry: UndoEntry) {
        self.redo.clear();
        self.undo.push_back(entry);
        while self.undo.len() > self.config.max_entries {
            self.undo.pop_front();
        }
    }

    /// Take the most recent entry for undoing. The caller applies the
    /// `before` states and then hands the entry to [`Self::stash_redo`].
    pub fn pop_undo(&mut self) -> Result<UndoEntry> {
        self.undo.pop_back().ok_or(EditorError::NothingToUndo)
    }

    /// Take the most recent undone entry for redoing. The caller applies the
    /// `after` states and then hands the entry to [`Self::stash_undo`].
    pub fn pop_redo(&mut self) -> Result<UndoEntry> {
        self.redo.pop().ok_or(EditorError::NothingToRedo)
    }

    /// Park an applied undo on the redo stack.
    pub fn stash_redo(&mut self, entry: UndoEntry) {
        self.redo.push(entry);
    }

    /// Return an applied redo to the undo stack without clearing redo.
    pub fn stash_undo(&mut self, entry: UndoEntry) {
        self.undo.push_back(entry);
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(tag: &str) -> UndoEntry {
        UndoEntry {
            docs: vec![DocRollback {
                path: PathBuf::from(tag),
                before: DocState {
                    text: String::new(),
                    statements: StatementSnapshot::Lines(Vec::new()),
                },
                after: DocState {
                    text: tag.to_string(),
                    statements: StatementSnapshot::Lines(Vec::new()),
                },
            }],
            timeline: None,
        }
    }

    #[test]
    fn undo_is_lifo() {
        let mut stack = UndoStack::new();
        stack.push(entry("a"));
        stack.push(entry("b"));
        let top = stack.pop_undo().unwrap();
        assert_eq!(top.docs[0].path, PathBuf::from("b"));
        stack.stash_redo(top);
        assert!(stack.can_undo());
        assert!(stack.can_redo());
    }

    #[test]
    fn redo_round_trip_preserves_order() {
        let mut stack = UndoStack::new();
        stack.push(entry("a"));
        let undone = stack.pop_undo().unwrap();
        stack.stash_redo(undone);
        let redone = stack.pop_redo().unwrap();
        assert_eq!(redone.docs[0].path, PathBuf::from("a"));
        stack.stash_undo(redone);
        assert!(stack.can_undo());
        assert!(!stack.can_redo());
    }

    #[test]
    fn pushing_clears_redo() {
        let mut stack = UndoStack::new();
        stack.push(entry("a"));
        let undone = stack.pop_undo().unwrap();
        stack.stash_redo(undone);
        stack.push(entry("b"));
        assert!(matches!(stack.pop_redo(), Err(EditorError::NothingToRedo)));
    }

    #[test]
    fn capacity_drops_oldest_entries() {
        let mut stack = UndoStack::with_config(UndoStackConfig { max_entries: 2 });
        stack.push(entry("a"));
        stack.push(entry("b"));
        stack.push(entry("c"));
        assert_eq!(stack.pop_undo().unwrap().docs[0].path, PathBuf::from("c"));
        assert_eq!(stack.pop_undo().unwrap().docs[0].path, PathBuf::from("b"));
        assert!(matches!(stack.pop_undo(), Err(EditorError::NothingToUndo)));
    }
}
