//! Batched text edits with positional bookkeeping.
//!
//! The synchronizer walks compute every change against the text they parsed,
//! then apply the whole batch at once. [`EditScript::apply`] sorts the edits
//! by position and replays them left to right, carrying a signed offset
//! accumulator so each scheduled span lands where the earlier edits moved it.
//! All positions are byte offsets into the text the script was built against.

use core::ops::Range;

/// One scheduled text change, positioned against the original text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit {
    /// Insert `text` before the byte at `at`.
    Insert { at: usize, text: String },
    /// Remove the bytes in `span`.
    Delete { span: Range<usize> },
    /// Replace the bytes in `span` with `text`.
    Replace { span: Range<usize>, text: String },
}

impl Edit {
    /// The position the edit takes effect at, used for ordering.
    #[must_use]
    pub fn position(&self) -> usize {
        match self {
            Self::Insert { at, .. } => *at,
            Self::Delete { span } | Self::Replace { span, .. } => span.start,
        }
    }
}

/// Executor contract for [`EditScript::apply`]. Spans are byte offsets into
/// the sink's current content and must lie within it.
pub trait EditSink {
    fn insert_text(&mut self, at: usize, text: &str);
    fn delete_span(&mut self, span: Range<usize>);
    fn replace_span(&mut self, span: Range<usize>, text: &str);
}

impl EditSink for String {
    fn insert_text(&mut self, at: usize, text: &str) {
        self.insert_str(at, text);
    }

    fn delete_span(&mut self, span: Range<usize>) {
        self.replace_range(span, "");
    }

    fn replace_span(&mut self, span: Range<usize>, text: &str) {
        self.replace_range(span, text);
    }
}

/// An ordered batch of edits against one snapshot of a text.
#[derive(Debug, Default)]
pub struct EditScript {
    edits: Vec<Edit>,
}

impl EditScript {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn insert(&mut self, at: usize, text: impl Into<String>) {
        self.edits.push(Edit::Insert {
            at,
            text: text.into(),
        });
    }

    pub fn delete(&mut self, span: Range<usize>) {
        self.edits.push(Edit::Delete { span });
    }

    pub fn replace(&mut self, span: Range<usize>, text: impl Into<String>) {
        self.edits.push(Edit::Replace {
            span,
            text: text.into(),
        });
    }

    /// Apply every edit to `sink` in one left-to-right pass.
    ///
    /// Edits are stably sorted by position, so edits scheduled at the same
    /// offset keep their scheduling order. A deletion overlapping the span
    /// already removed by earlier deletions in this pass is dropped rather
    /// than applied twice.
    pub fn apply<S: EditSink>(mut self, sink: &mut S) {
        self.edits.sort_by_key(Edit::position);
        let mut accum = 0isize;
        let mut removed: Option<Range<usize>> = None;
        for edit in self.edits {
            match edit {
                Edit::Insert { at, text } => {
                    sink.insert_text(shifted(at, accum), &text);
                    accum += text.len() as isize;
                }
                Edit::Delete { span } => {
                    if let Some(prior) = &removed {
                        if prior.start < span.end && span.start < prior.end {
                            continue;
                        }
                    }
                    let len = span.len();
                    removed = Some(match removed {
                        Some(prior) => prior.start.min(span.start)..prior.end.max(span.end),
                        None => span.clone(),
                    });
                    sink.delete_span(shifted(span.start, accum)..shifted(span.end, accum));
                    accum -= len as isize;
                }
                Edit::Replace { span, text } => {
                    let old_len = span.len();
                    sink.replace_span(
                        shifted(span.start, accum)..shifted(span.end, accum),
                        &text,
                    );
                    accum += text.len() as isize - old_len as isize;
                }
            }
        }
    }
}

fn shifted(pos: usize, accum: isize) -> usize {
    let moved = pos as isize + accum;
    if moved > 0 {
        moved as usize
    } else {
        0
    }
}
