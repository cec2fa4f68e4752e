//! Error types for the core model.

use thiserror::Error;

/// Result alias used throughout `cue-core`.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors produced by the core model and the reference grammars.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoreError {
    /// The text does not match the grammar. The artifact is unreadable until
    /// the user fixes it; synchronization skips it in the meantime.
    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// Statements parsed but violate ordering or nesting invariants.
    #[error("statement order invariant violated")]
    OrderViolation,

    /// A statement id that was never minted for this artifact.
    #[error("unknown statement id {id}")]
    UnknownStatement { id: i32 },
}

impl CoreError {
    /// Parse-error constructor with a 1-based line number.
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }

    /// Whether retrying after the next text change can succeed without any
    /// other intervention.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Parse { .. } | Self::OrderViolation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_errors_carry_line_numbers() {
        let err = CoreError::parse(3, "expected time range");
        assert_eq!(err.to_string(), "parse error at line 3: expected time range");
        assert!(err.is_recoverable());
    }

    #[test]
    fn unknown_statement_is_not_recoverable() {
        assert!(!CoreError::UnknownStatement { id: 7 }.is_recoverable());
    }
}
