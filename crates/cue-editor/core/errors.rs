//! Error types for the editing layer.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout `cue-editor`.
pub type Result<T> = std::result::Result<T, EditorError>;

/// Errors produced by documents, groups and the engine.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EditorError {
    /// A core model failure (grammar, ordering).
    #[error("core error: {0}")]
    Core(#[from] cue_core::CoreError),

    /// File I/O failure, flattened to a message so the error stays `Clone`.
    #[error("io error on {path}: {message}")]
    Io { path: PathBuf, message: String },

    /// No artifact is open under this path.
    #[error("no open document at {path}")]
    DocumentNotFound { path: PathBuf },

    /// A byte span outside the document's current content.
    #[error("span {start}..{end} out of bounds for document of {len} bytes")]
    SpanOutOfBounds { start: usize, end: usize, len: usize },

    /// Mapping file syntax error, 1-based line number.
    #[error("mapping error at line {line}: {message}")]
    MappingSyntax { line: usize, message: String },

    /// Linking artifacts would give one group two scripts or two
    /// transcripts. Nothing was mutated.
    #[error("invalid mapping: {message}")]
    InvalidMapping { message: String },

    #[error("nothing to undo")]
    NothingToUndo,

    #[error("nothing to redo")]
    NothingToRedo,
}

impl EditorError {
    pub fn io(path: impl Into<PathBuf>, err: &std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }

    pub fn mapping_syntax(line: usize, message: impl Into<String>) -> Self {
        Self::MappingSyntax {
            line,
            message: message.into(),
        }
    }

    pub fn invalid_mapping(message: impl Into<String>) -> Self {
        Self::InvalidMapping {
            message: message.into(),
        }
    }

    /// Whether the condition clears without user intervention beyond further
    /// editing.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        match self {
            Self::Core(err) => err.is_recoverable(),
            Self::NothingToUndo | Self::NothingToRedo => true,
            Self::Io { .. }
            | Self::DocumentNotFound { .. }
            | Self::SpanOutOfBounds { .. }
            | Self::MappingSyntax { .. }
            | Self::InvalidMapping { .. } => false,
        }
    }
}
