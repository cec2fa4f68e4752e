//! The synchronizer protocol.
//!
//! One synchronizer per open artifact keeps three things consistent: the
//! text the user sees, the statement model parsed from it, and the group's
//! shared [`Timeline`]. Two entry points, mirroring the two directions
//! changes flow:
//!
//! - [`FileSynchronizer::obtain_changes`] — this artifact's own text changed
//!   (the poller saw a stamp change). Deleted statements become timeline
//!   deletions; any other structural change is unsupported and fails the
//!   cycle without committing anything.
//! - [`FileSynchronizer::on_timeline_changed`] — another group member
//!   changed the timeline. The artifact's text is rewritten so every
//!   displayed offset matches `timeline.impose` of its original range:
//!   statements projecting to an invalid range are cut, stale offsets are
//!   patched in place, statements whose time has come back are re-inserted.
//!
//! `original` is the immutable baseline the projections apply to (only the
//! word text may drift, see `obtain_changes`); `current` is the latest
//! materialized view and is replaced wholesale each committed cycle.

use ahash::AHashMap;
use cue_core::{TimedStatement, Timeline};

use crate::core::document::SyncDocument;
use crate::core::history::{DocState, StatementSnapshot};
use crate::groups::ListenerRole;

pub mod script;
pub mod transcript;

pub use script::ScriptSync;
pub use transcript::TranscriptSync;

/// Which grammar an artifact uses. Closed set; there is no third format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncKind {
    Transcript,
    Script,
}

impl SyncKind {
    #[must_use]
    pub const fn role(self) -> ListenerRole {
        match self {
            Self::Transcript => ListenerRole::Transcript,
            Self::Script => ListenerRole::Script,
        }
    }
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateResult {
    /// The timeline or the text changed; the group must be notified.
    Updated,
    /// Nothing to do.
    NotUpdated,
    /// The text change cannot be expressed as span deletions; nothing was
    /// committed.
    Failed,
}

/// Protocol shared by the two strategies.
pub trait FileSynchronizer {
    fn kind(&self) -> SyncKind;
    fn is_initialized(&self) -> bool;
    fn is_killed(&self) -> bool;
    /// Terminal; every later entry point is a no-op.
    fn shutdown(&mut self);
    /// Stamp comparison only, no content inspection.
    fn needs_update(&self, doc: &SyncDocument) -> bool;
    /// Take the baseline snapshot. Returns whether the artifact was
    /// readable; an unreadable artifact stays uninitialized and is retried
    /// after the next text change.
    fn initial_read(&mut self, doc: &SyncDocument) -> bool;
    /// Rewrite the text to match the timeline. Returns the before/after
    /// document states when the text changed.
    fn on_timeline_changed(
        &mut self,
        doc: &mut SyncDocument,
        timeline: &mut Timeline,
    ) -> Option<(DocState, DocState)>;
    /// Fold this artifact's own text changes into the timeline.
    fn obtain_changes(
        &mut self,
        doc: &mut SyncDocument,
        timeline: &mut Timeline,
    ) -> (UpdateResult, Option<(DocState, DocState)>);
    fn snapshot(&self) -> StatementSnapshot;
    /// Undo/redo restore of the `current` statement set.
    fn restore(&mut self, snapshot: &StatementSnapshot);
    /// Mark the document's present stamp as reconciled.
    fn mark_clean(&mut self, doc: &SyncDocument);
}

/// The strategy for one artifact, selected by [`SyncKind`].
#[derive(Debug)]
pub enum SyncStrategy {
    Transcript(TranscriptSync),
    Script(ScriptSync),
}

impl SyncStrategy {
    #[must_use]
    pub fn new(kind: SyncKind) -> Self {
        match kind {
            SyncKind::Transcript => Self::Transcript(TranscriptSync::new()),
            SyncKind::Script => Self::Script(ScriptSync::new()),
        }
    }

    fn inner(&self) -> &dyn FileSynchronizer {
        match self {
            Self::Transcript(sync) => sync,
            Self::Script(sync) => sync,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn FileSynchronizer {
        match self {
            Self::Transcript(sync) => sync,
            Self::Script(sync) => sync,
        }
    }
}

impl FileSynchronizer for SyncStrategy {
    fn kind(&self) -> SyncKind {
        self.inner().kind()
    }

    fn is_initialized(&self) -> bool {
        self.inner().is_initialized()
    }

    fn is_killed(&self) -> bool {
        self.inner().is_killed()
    }

    fn shutdown(&mut self) {
        self.inner_mut().shutdown();
    }

    fn needs_update(&self, doc: &SyncDocument) -> bool {
        self.inner().needs_update(doc)
    }

    fn initial_read(&mut self, doc: &SyncDocument) -> bool {
        self.inner_mut().initial_read(doc)
    }

    fn on_timeline_changed(
        &mut self,
        doc: &mut SyncDocument,
        timeline: &mut Timeline,
    ) -> Option<(DocState, DocState)> {
        self.inner_mut().on_timeline_changed(doc, timeline)
    }

    fn obtain_changes(
        &mut self,
        doc: &mut SyncDocument,
        timeline: &mut Timeline,
    ) -> (UpdateResult, Option<(DocState, DocState)>) {
        self.inner_mut().obtain_changes(doc, timeline)
    }

    fn snapshot(&self) -> StatementSnapshot {
        self.inner().snapshot()
    }

    fn restore(&mut self, snapshot: &StatementSnapshot) {
        self.inner_mut().restore(snapshot);
    }

    fn mark_clean(&mut self, doc: &SyncDocument) {
        self.inner_mut().mark_clean(doc);
    }
}

/// Baseline/current bookkeeping shared by both strategies.
#[derive(Debug)]
pub(crate) struct SyncState<S> {
    pub original: AHashMap<i32, S>,
    pub current: AHashMap<i32, S>,
    /// Originals in id order, the canonical replay order. Ids increase with
    /// time, so iterating this also walks the recording front to back.
    pub sorted_original: Vec<S>,
    pub last_stamp: u64,
    pub initialized: bool,
    pub killed: bool,
}

impl<S: TimedStatement + Clone> SyncState<S> {
    pub fn new() -> Self {
        Self {
            original: AHashMap::new(),
            current: AHashMap::new(),
            sorted_original: Vec::new(),
            last_stamp: 0,
            initialized: false,
            killed: false,
        }
    }

    /// Store the baseline after a successful first read.
    pub fn initialize(&mut self, statements: Vec<S>, stamp: u64) {
        self.original = statements.iter().map(|s| (s.id(), s.clone())).collect();
        self.current = self.original.clone();
        let mut sorted = statements;
        sorted.sort_by_key(TimedStatement::id);
        self.sorted_original = sorted;
        self.last_stamp = stamp;
        self.initialized = true;
    }

    /// Text edits can remove statements, never invent them: every fresh id
    /// must exist in the baseline and the count cannot grow.
    pub fn ids_within_original(&self, fresh: &[S]) -> bool {
        fresh.len() <= self.original.len()
            && fresh.iter().all(|s| self.original.contains_key(&s.id()))
    }

    pub fn set_current(&mut self, statements: &[S]) {
        self.current = statements.iter().map(|s| (s.id(), s.clone())).collect();
    }

    /// Copy drifted words into the baseline, both the id map and the sorted
    /// replay copy, so later rewrites and resurrections reproduce them.
    pub fn fold_words(&mut self, fresh: &[S]) {
        for statement in fresh {
            let id = statement.id();
            if let Some(original) = self.original.get_mut(&id) {
                original.set_word(statement.word().to_string());
            }
            if let Ok(index) = self
                .sorted_original
                .binary_search_by_key(&id, TimedStatement::id)
            {
                self.sorted_original[index].set_word(statement.word().to_string());
            }
        }
    }

    /// `current` in id order.
    pub fn sorted_current(&self) -> Vec<S> {
        let mut sorted: Vec<S> = self.current.values().cloned().collect();
        sorted.sort_by_key(TimedStatement::id);
        sorted
    }
}
