//! Flat transcript synchronizer.

use cue_core::parser::transcript::{self, LineNode};
use cue_core::{EditScript, Statement, TimedStatement, Timeline};

use crate::core::document::SyncDocument;
use crate::core::history::{DocState, StatementSnapshot};
use crate::sync::{FileSynchronizer, SyncKind, SyncState, UpdateResult};

/// Synchronizer for `word [start, end] [id]` transcripts.
#[derive(Debug)]
pub struct TranscriptSync {
    state: SyncState<Statement>,
}

impl Default for TranscriptSync {
    fn default() -> Self {
        Self::new()
    }
}

impl TranscriptSync {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: SyncState::new(),
        }
    }

    /// The current statement set in id order (test and inspection hook).
    #[must_use]
    pub fn current_statements(&self) -> Vec<Statement> {
        self.state.sorted_current()
    }

    fn collect(&self, doc: &SyncDocument) -> Option<(String, Vec<LineNode>)> {
        let text = doc.text();
        match transcript::collect(&text) {
            Ok(nodes) => Some((text, nodes)),
            Err(err) => {
                log::warn!("transcript unreadable, skipping: {err}");
                None
            }
        }
    }

    /// Walk originals in replay order against the live lines and schedule
    /// whatever the timeline says the text should look like.
    fn update_file_walk(
        &mut self,
        nodes: &[LineNode],
        timeline: &mut Timeline,
    ) -> (EditScript, Vec<Statement>) {
        let mut edits = EditScript::new();
        let mut new_current = Vec::new();
        let mut i = 0usize;
        let mut last_insert = 0usize;
        for original in &self.state.sorted_original {
            let should_be = timeline.impose(original.range());
            if i < nodes.len() && nodes[i].statement.id == original.id() {
                let node = &nodes[i];
                if !should_be.is_valid() {
                    edits.delete(node.span.clone());
                } else if should_be == node.statement.range {
                    new_current.push(node.statement.clone());
                } else {
                    edits.replace(node.time_span.clone(), transcript::format_time(should_be));
                    new_current.push(Statement::new(
                        node.statement.word.clone(),
                        should_be,
                        original.id(),
                    ));
                }
                last_insert = node.span.end;
                i += 1;
            } else if should_be.is_valid() {
                let revived = Statement::new(original.word().to_string(), should_be, original.id());
                edits.insert(last_insert, transcript::format_line(&revived));
                new_current.push(revived);
            }
        }
        (edits, new_current)
    }
}

impl FileSynchronizer for TranscriptSync {
    fn kind(&self) -> SyncKind {
        SyncKind::Transcript
    }

    fn is_initialized(&self) -> bool {
        self.state.initialized
    }

    fn is_killed(&self) -> bool {
        self.state.killed
    }

    fn shutdown(&mut self) {
        self.state.killed = true;
    }

    fn needs_update(&self, doc: &SyncDocument) -> bool {
        !self.state.killed && self.state.last_stamp != doc.stamp()
    }

    fn initial_read(&mut self, doc: &SyncDocument) -> bool {
        if self.state.killed {
            return false;
        }
        // Either way this stamp is dealt with; a broken file is retried
        // only after the next change.
        self.state.last_stamp = doc.stamp();
        let Some((_, nodes)) = self.collect(doc) else {
            return false;
        };
        let statements: Vec<Statement> = nodes.into_iter().map(|n| n.statement).collect();
        self.state.initialize(statements, doc.stamp());
        true
    }

    fn on_timeline_changed(
        &mut self,
        doc: &mut SyncDocument,
        timeline: &mut Timeline,
    ) -> Option<(DocState, DocState)> {
        if self.state.killed || !self.state.initialized {
            return None;
        }
        let (text, nodes) = self.collect(doc)?;
        let fresh: Vec<Statement> = nodes.iter().map(|n| n.statement.clone()).collect();
        if !self.state.ids_within_original(&fresh) {
            log::warn!("live transcript statements do not match the baseline, skipping");
            return None;
        }
        let before = DocState {
            text,
            statements: self.snapshot(),
        };
        let (edits, new_current) = self.update_file_walk(&nodes, timeline);
        let changed = !edits.is_empty();
        if changed {
            edits.apply(doc);
        }
        self.state.set_current(&new_current);
        self.state.last_stamp = doc.stamp();
        changed.then(|| {
            let after = DocState {
                text: doc.text(),
                statements: self.snapshot(),
            };
            (before, after)
        })
    }

    fn obtain_changes(
        &mut self,
        doc: &mut SyncDocument,
        timeline: &mut Timeline,
    ) -> (UpdateResult, Option<(DocState, DocState)>) {
        if self.state.killed || !self.state.initialized {
            return (UpdateResult::NotUpdated, None);
        }
        self.state.last_stamp = doc.stamp();
        let Some((text, nodes)) = self.collect(doc) else {
            return (UpdateResult::NotUpdated, None);
        };
        let fresh: Vec<Statement> = nodes.iter().map(|n| n.statement.clone()).collect();
        if !self.state.ids_within_original(&fresh) {
            log::warn!("live transcript statements do not match the baseline, skipping");
            return (UpdateResult::NotUpdated, None);
        }
        // Only whole-statement deletions are a supported text edit: every
        // surviving statement must still display exactly its projected range.
        for statement in &fresh {
            let Some(original) = self.state.original.get(&statement.id) else {
                return (UpdateResult::Failed, None);
            };
            let should_be = timeline.impose(original.range());
            if !self.state.current.contains_key(&statement.id) || should_be != statement.range {
                log::warn!(
                    "unsupported edit of statement [{}]: {} displayed, {} expected",
                    statement.id,
                    statement.range,
                    should_be
                );
                return (UpdateResult::Failed, None);
            }
        }
        let before = DocState {
            text,
            statements: self.snapshot(),
        };
        // Statements gone from the text become timeline deletions.
        let sorted_current = self.state.sorted_current();
        let mut changed = false;
        let mut i = 0usize;
        for current in &sorted_current {
            if i < fresh.len() && current.id == fresh[i].id {
                i += 1;
            } else if let Some(original) = self.state.original.get(&current.id) {
                timeline.delete(original.range());
                changed = true;
            }
        }
        // The deletions moved later statements; patch their displayed times.
        let mut edits = EditScript::new();
        let mut updated = fresh;
        let mut i = 0usize;
        for current in &sorted_current {
            let Some(original) = self.state.original.get(&current.id) else {
                continue;
            };
            let should_be = timeline.impose(original.range());
            if !should_be.is_valid() {
                continue;
            }
            if i < updated.len() && current.id == updated[i].id {
                if should_be != updated[i].range {
                    edits.replace(nodes[i].time_span.clone(), transcript::format_time(should_be));
                    updated[i].range = should_be;
                }
                i += 1;
            }
        }
        if !edits.is_empty() {
            edits.apply(doc);
            changed = true;
        }
        // Word drift is tolerated: fold the live wording back into the
        // baseline so later rewrites reproduce it.
        self.state.fold_words(&updated);
        self.state.set_current(&updated);
        self.state.last_stamp = doc.stamp();
        if changed {
            let after = DocState {
                text: doc.text(),
                statements: self.snapshot(),
            };
            (UpdateResult::Updated, Some((before, after)))
        } else {
            (UpdateResult::NotUpdated, None)
        }
    }

    fn snapshot(&self) -> StatementSnapshot {
        StatementSnapshot::Lines(self.state.sorted_current())
    }

    fn restore(&mut self, snapshot: &StatementSnapshot) {
        match snapshot {
            StatementSnapshot::Lines(statements) => self.state.set_current(statements),
            StatementSnapshot::Blocks(_) => {
                log::error!("script snapshot handed to a transcript synchronizer");
            }
        }
    }

    fn mark_clean(&mut self, doc: &SyncDocument) {
        self.state.last_stamp = doc.stamp();
    }
}
