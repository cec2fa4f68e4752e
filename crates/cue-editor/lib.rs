//! # cue-editor
//!
//! Editing layer over [`cue_core`]: rope-backed documents with modification
//! stamps, the transcript/script synchronizer strategies, groups binding
//! sibling artifacts to one timeline, undo/redo history, and the engine that
//! owns it all behind a single lock.
//!
//! ## Example
//!
//! ```
//! use cue_editor::engine::SyncEngine;
//! use cue_editor::sync::SyncKind;
//! use std::path::Path;
//!
//! let mut engine = SyncEngine::new();
//! engine
//!     .open_with_content(
//!         "/takes/one.transcript",
//!         SyncKind::Transcript,
//!         "hello [0, 100] [1]\nworld [150, 300] [2]\n",
//!     )
//!     .unwrap();
//!
//! // The user deletes the first line; the next cycle folds it into the
//! // group timeline and patches the surviving offsets.
//! let path = Path::new("/takes/one.transcript");
//! engine.document_mut(path).unwrap().delete(0..19).unwrap();
//! engine.run_cycle();
//! assert_eq!(engine.document(path).unwrap().text(), "world [49, 199] [2]\n");
//! ```

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod core;
pub mod engine;
pub mod groups;
pub mod sync;

pub use crate::core::document::SyncDocument;
pub use crate::core::errors::{EditorError, Result};
pub use crate::core::history::{UndoStack, UndoStackConfig};
pub use crate::engine::{DirtyPoller, SharedEngine, SyncEngine};
pub use crate::groups::{GroupManager, ListenerRole, MediaListener, SyncGroup, TimelineListener};
pub use crate::sync::{FileSynchronizer, ScriptSync, SyncKind, SyncStrategy, TranscriptSync, UpdateResult};
