//! Time-stamped statement records.
//!
//! Statements are the unit the synchronizers reason about: a word of text
//! anchored to a [`TimeRange`] and carrying a numeric id. Ids are minted once
//! when a file is first read and are never reused; identity is the id, not
//! the text. Flat transcripts use [`Statement`]; nested cue scripts use
//! [`EnclosingStatement`], which adds a nesting depth and a block flag.

use crate::time::TimeRange;

/// Accessors shared by flat and nested statements, so order validation and
/// the synchronizer walks can be written once.
pub trait TimedStatement {
    fn id(&self) -> i32;
    fn range(&self) -> TimeRange;
    fn word(&self) -> &str;
    fn set_word(&mut self, word: String);
}

/// A flat transcript statement: one word, one time span.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Statement {
    pub word: String,
    pub range: TimeRange,
    pub id: i32,
}

impl Statement {
    #[must_use]
    pub fn new(word: impl Into<String>, range: TimeRange, id: i32) -> Self {
        Self {
            word: word.into(),
            range,
            id,
        }
    }
}

impl TimedStatement for Statement {
    fn id(&self) -> i32 {
        self.id
    }

    fn range(&self) -> TimeRange {
        self.range
    }

    fn word(&self) -> &str {
        &self.word
    }

    fn set_word(&mut self, word: String) {
        self.word = word;
    }
}

/// A nested cue-script statement.
///
/// `depth` is the nesting level, root statements at 0. `is_block` marks
/// statements with paired start/end timestamps that may contain children;
/// leaf statements carry a single timestamp and never contain anything.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EnclosingStatement {
    pub word: String,
    pub range: TimeRange,
    pub id: i32,
    pub depth: i32,
    pub is_block: bool,
}

impl EnclosingStatement {
    #[must_use]
    pub fn new(
        word: impl Into<String>,
        range: TimeRange,
        id: i32,
        depth: i32,
        is_block: bool,
    ) -> Self {
        Self {
            word: word.into(),
            range,
            id,
            depth,
            is_block,
        }
    }
}

impl TimedStatement for EnclosingStatement {
    fn id(&self) -> i32 {
        self.id
    }

    fn range(&self) -> TimeRange {
        self.range
    }

    fn word(&self) -> &str {
        &self.word
    }

    fn set_word(&mut self, word: String) {
        self.word = word;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statement_accessors_round_trip() {
        let mut statement = Statement::new("hello", TimeRange::new(0, 100), 1);
        assert_eq!(statement.id(), 1);
        assert_eq!(statement.range(), TimeRange::new(0, 100));
        assert_eq!(statement.word(), "hello");
        statement.set_word("goodbye".into());
        assert_eq!(statement.word(), "goodbye");
    }

    #[test]
    fn enclosing_statement_carries_depth_and_block_flag() {
        let block = EnclosingStatement::new("scene", TimeRange::new(0, 500), 1, 0, true);
        let leaf = EnclosingStatement::new("pause", TimeRange::new(40, 40), 2, 1, false);
        assert!(block.is_block);
        assert!(!leaf.is_block);
        assert_eq!(leaf.depth, block.depth + 1);
        assert!(block.range().contains(&leaf.range()));
    }
}
