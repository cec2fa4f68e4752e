//! Documents, history and error types.

pub mod document;
pub mod errors;
pub mod history;

pub use document::SyncDocument;
pub use errors::{EditorError, Result};
pub use history::{
    DocRollback, DocState, StatementSnapshot, TimelineRollback, UndoEntry, UndoStack,
    UndoStackConfig,
};
