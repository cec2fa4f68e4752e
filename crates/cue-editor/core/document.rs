//! Rope-backed document with a monotonic modification stamp.
//!
//! [`SyncDocument`] is the single text buffer abstraction the synchronizers
//! see. Every mutation bumps the stamp; a synchronizer remembers the stamp it
//! last reconciled against and compares on each poll tick, so dirtiness is a
//! plain integer comparison with no content diffing.
//!
//! The public API is byte-offset based to match the parser spans; conversion
//! to rope char indices happens at this boundary only.

use std::ops::Range;
use std::path::{Path, PathBuf};

use cue_core::EditSink;
use ropey::Rope;

use crate::core::errors::{EditorError, Result};

/// A text artifact open for synchronization.
#[derive(Debug, Clone)]
pub struct SyncDocument {
    rope: Rope,
    stamp: u64,
    path: Option<PathBuf>,
}

impl Default for SyncDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncDocument {
    #[must_use]
    pub fn new() -> Self {
        Self {
            rope: Rope::new(),
            stamp: 0,
            path: None,
        }
    }

    #[must_use]
    pub fn from_content(content: &str) -> Self {
        Self {
            rope: Rope::from_str(content),
            stamp: 0,
            path: None,
        }
    }

    /// Read a document from disk, remembering the path for [`Self::save`].
    pub fn from_file(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|err| EditorError::io(path, &err))?;
        let mut doc = Self::from_content(&content);
        doc.path = Some(path.to_path_buf());
        Ok(doc)
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn set_path(&mut self, path: impl Into<PathBuf>) {
        self.path = Some(path.into());
    }

    /// Monotonic modification stamp; bumped by every mutation.
    #[must_use]
    pub const fn stamp(&self) -> u64 {
        self.stamp
    }

    #[must_use]
    pub fn len_bytes(&self) -> usize {
        self.rope.len_bytes()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rope.len_bytes() == 0
    }

    /// The full text. The synchronizers parse from this snapshot and edit
    /// against the spans it yielded.
    #[must_use]
    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    pub fn insert(&mut self, at: usize, text: &str) -> Result<()> {
        let at = self.checked_char(at)?;
        self.rope.insert(at, text);
        self.stamp += 1;
        Ok(())
    }

    pub fn delete(&mut self, span: Range<usize>) -> Result<()> {
        let span = self.checked_span(span)?;
        self.rope.remove(span);
        self.stamp += 1;
        Ok(())
    }

    pub fn replace(&mut self, span: Range<usize>, text: &str) -> Result<()> {
        let span = self.checked_span(span)?;
        let start = span.start;
        self.rope.remove(span);
        self.rope.insert(start, text);
        self.stamp += 1;
        Ok(())
    }

    /// Replace the whole content (undo/redo restore).
    pub fn set_text(&mut self, text: &str) {
        self.rope = Rope::from_str(text);
        self.stamp += 1;
    }

    pub fn save(&self) -> Result<()> {
        match &self.path {
            Some(path) => self.save_to(&path.clone()),
            None => Err(EditorError::DocumentNotFound {
                path: PathBuf::new(),
            }),
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.text()).map_err(|err| EditorError::io(path, &err))
    }

    fn checked_char(&self, byte: usize) -> Result<usize> {
        self.rope
            .try_byte_to_char(byte)
            .map_err(|_| EditorError::SpanOutOfBounds {
                start: byte,
                end: byte,
                len: self.rope.len_bytes(),
            })
    }

    fn checked_span(&self, span: Range<usize>) -> Result<Range<usize>> {
        if span.end < span.start {
            return Err(EditorError::SpanOutOfBounds {
                start: span.start,
                end: span.end,
                len: self.rope.len_bytes(),
            });
        }
        let start = self.checked_char(span.start)?;
        let end = self.checked_char(span.end)?;
        Ok(start..end)
    }
}

/// Edit-script executor. Spans come from parsing this same document, so a
/// failed conversion means the script was built against stale text; the edit
/// is dropped and logged rather than applied somewhere wrong.
impl EditSink for SyncDocument {
    fn insert_text(&mut self, at: usize, text: &str) {
        if let Err(err) = self.insert(at, text) {
            log::error!("dropping stale insert at {at}: {err}");
        }
    }

    fn delete_span(&mut self, span: Range<usize>) {
        if let Err(err) = self.delete(span.clone()) {
            log::error!("dropping stale delete of {span:?}: {err}");
        }
    }

    fn replace_span(&mut self, span: Range<usize>, text: &str) {
        if let Err(err) = self.replace(span.clone(), text) {
            log::error!("dropping stale replace of {span:?}: {err}");
        }
    }
}
