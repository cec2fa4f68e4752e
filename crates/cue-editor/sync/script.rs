//! Nested cue-script synchronizer.
//!
//! Same protocol as the transcript side, with two twists: block statements
//! carry two time tokens (open and close line), and insertions must land at
//! the right nesting position. The walk tracks one insertion anchor per
//! depth: after a block's open line for its children, after the whole
//! construct for its siblings. Resurrected statements accumulate into a
//! batch rendered as one nested insertion; the batch flushes when the next
//! revived statement is no longer contained in the batch head's range.

use ahash::AHashMap;
use cue_core::parser::script::{self, BlockNode};
use cue_core::{EditScript, EnclosingStatement, TimedStatement, Timeline};

use crate::core::document::SyncDocument;
use crate::core::history::{DocState, StatementSnapshot};
use crate::sync::{FileSynchronizer, SyncKind, SyncState, UpdateResult};

/// Synchronizer for nested cue scripts.
#[derive(Debug)]
pub struct ScriptSync {
    state: SyncState<EnclosingStatement>,
}

impl Default for ScriptSync {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptSync {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: SyncState::new(),
        }
    }

    /// The current statement set in id order (test and inspection hook).
    #[must_use]
    pub fn current_statements(&self) -> Vec<EnclosingStatement> {
        self.state.sorted_current()
    }

    fn collect(&self, doc: &SyncDocument) -> Option<(String, Vec<BlockNode>)> {
        let text = doc.text();
        match script::collect(&text) {
            Ok(nodes) => Some((text, nodes)),
            Err(err) => {
                log::warn!("script unreadable, skipping: {err}");
                None
            }
        }
    }

    /// Ids within the baseline, and no statement moved to another nesting
    /// level or changed shape.
    fn matches_baseline(&self, fresh: &[EnclosingStatement]) -> bool {
        self.state.ids_within_original(fresh)
            && fresh.iter().all(|statement| {
                self.state
                    .original
                    .get(&statement.id)
                    .is_some_and(|o| o.depth == statement.depth && o.is_block == statement.is_block)
            })
    }

    fn update_file_walk(
        &mut self,
        nodes: &[BlockNode],
        timeline: &mut Timeline,
    ) -> (EditScript, Vec<EnclosingStatement>) {
        let mut edits = EditScript::new();
        let mut new_current = Vec::new();
        let mut depth_pos: AHashMap<i32, usize> = AHashMap::new();
        depth_pos.insert(0, 0);
        let mut batch: Vec<EnclosingStatement> = Vec::new();
        let mut batch_pos = 0usize;
        let mut i = 0usize;
        for original in &self.state.sorted_original {
            let should_be = timeline.impose(original.range());
            if i < nodes.len() && nodes[i].statement.id == original.id() {
                let node = &nodes[i];
                if should_be.is_valid() {
                    if should_be == node.statement.range {
                        new_current.push(node.statement.clone());
                    } else {
                        edits.replace(
                            node.start_time_span.clone(),
                            script::format_offset(should_be.start()),
                        );
                        if let Some(end_span) = &node.end_time_span {
                            edits.replace(end_span.clone(), script::format_offset(should_be.end()));
                        }
                        new_current.push(EnclosingStatement {
                            range: should_be,
                            ..node.statement.clone()
                        });
                    }
                    // Anchors only move past surviving text.
                    depth_pos.insert(node.statement.depth, node.tail_end);
                    if node.statement.is_block {
                        depth_pos.insert(node.statement.depth + 1, node.head_end);
                    }
                } else {
                    edits.delete(node.span.clone());
                }
                i += 1;
            } else if should_be.is_valid() {
                let revived = EnclosingStatement::new(
                    original.word().to_string(),
                    should_be,
                    original.id(),
                    original.depth,
                    original.is_block,
                );
                if !batch.is_empty() && !batch[0].range.contains(&revived.range) {
                    edits.insert(batch_pos, script::render_chain(&batch));
                    batch.clear();
                }
                if batch.is_empty() {
                    batch_pos = depth_pos.get(&revived.depth).copied().unwrap_or(0);
                }
                batch.push(revived.clone());
                new_current.push(revived);
            }
        }
        if !batch.is_empty() {
            edits.insert(batch_pos, script::render_chain(&batch));
        }
        (edits, new_current)
    }
}

impl FileSynchronizer for ScriptSync {
    fn kind(&self) -> SyncKind {
        SyncKind::Script
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
        self.state.last_stamp = doc.stamp();
        let Some((_, nodes)) = self.collect(doc) else {
            return false;
        };
        let statements: Vec<EnclosingStatement> =
            nodes.into_iter().map(|n| n.statement).collect();
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
        let fresh: Vec<EnclosingStatement> = nodes.iter().map(|n| n.statement.clone()).collect();
        if !self.matches_baseline(&fresh) {
            log::warn!("live script statements do not match the baseline, skipping");
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
        let fresh: Vec<EnclosingStatement> = nodes.iter().map(|n| n.statement.clone()).collect();
        if !self.matches_baseline(&fresh) {
            log::warn!("live script statements do not match the baseline, skipping");
            return (UpdateResult::NotUpdated, None);
        }
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
                    edits.replace(
                        nodes[i].start_time_span.clone(),
                        script::format_offset(should_be.start()),
                    );
                    if let Some(end_span) = &nodes[i].end_time_span {
                        edits.replace(end_span.clone(), script::format_offset(should_be.end()));
                    }
                    updated[i].range = should_be;
                }
                i += 1;
            }
        }
        if !edits.is_empty() {
            edits.apply(doc);
            changed = true;
        }
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
        StatementSnapshot::Blocks(self.state.sorted_current())
    }

    fn restore(&mut self, snapshot: &StatementSnapshot) {
        match snapshot {
            StatementSnapshot::Blocks(statements) => self.state.set_current(statements),
            StatementSnapshot::Lines(_) => {
                log::error!("transcript snapshot handed to a script synchronizer");
            }
        }
    }

    fn mark_clean(&mut self, doc: &SyncDocument) {
        self.state.last_stamp = doc.stamp();
    }
}
