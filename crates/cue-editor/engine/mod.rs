//! The engine owns everything: documents, synchronizers, groups, history.
//!
//! All mutation runs on whichever thread holds the [`SharedEngine`] lock, so
//! the core types need no locking of their own. The [`DirtyPoller`] ticks in
//! the background, takes the lock, and runs one cycle: every dirty artifact
//! folds its text changes into its group's timeline, and every committed
//! change fans out to the group's other member and passive listeners before
//! the undo entry is pushed.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use ahash::{AHashMap, AHashSet};
use cue_core::Timeline;
use parking_lot::Mutex;

use crate::core::document::SyncDocument;
use crate::core::errors::{EditorError, Result};
use crate::core::history::{DocRollback, TimelineRollback, UndoEntry, UndoStack, UndoStackConfig};
use crate::groups::{mapping, GroupId, GroupManager, MediaListener, SyncGroup};
use crate::sync::{FileSynchronizer, SyncKind, SyncStrategy, UpdateResult};

struct OpenArtifact {
    doc: SyncDocument,
    sync: SyncStrategy,
    group: GroupId,
}

/// Process-wide synchronization registry.
#[derive(Default)]
pub struct SyncEngine {
    docs: AHashMap<PathBuf, OpenArtifact>,
    groups: GroupManager,
    history: UndoStack,
    loaded_mappings: AHashSet<PathBuf>,
}

impl SyncEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_history_config(config: UndoStackConfig) -> Self {
        Self {
            history: UndoStack::with_config(config),
            ..Self::default()
        }
    }

    /// Open an artifact from disk.
    pub fn open(&mut self, path: impl Into<PathBuf>, kind: SyncKind) -> Result<()> {
        let path = path.into();
        let doc = SyncDocument::from_file(&path)?;
        self.install(path, kind, doc)
    }

    /// Open an artifact from in-memory content (tests, unsaved buffers).
    pub fn open_with_content(
        &mut self,
        path: impl Into<PathBuf>,
        kind: SyncKind,
        content: &str,
    ) -> Result<()> {
        let path = path.into();
        let mut doc = SyncDocument::from_content(content);
        doc.set_path(&path);
        self.install(path, kind, doc)
    }

    fn install(&mut self, path: PathBuf, kind: SyncKind, doc: SyncDocument) -> Result<()> {
        if self.docs.contains_key(&path) {
            log::debug!("{} is already open", path.display());
            return Ok(());
        }
        let group_id = self.wire_mapping(&path)?;
        let group = self
            .groups
            .get_mut(group_id)
            .ok_or_else(|| EditorError::invalid_mapping("group vanished during open"))?;
        group.claim_role(kind.role(), &path)?;
        let mut sync = SyncStrategy::new(kind);
        if !sync.initial_read(&doc) {
            log::warn!(
                "{} opened unreadable; will retry after the next change",
                path.display()
            );
        }
        self.docs.insert(
            path,
            OpenArtifact {
                doc,
                sync,
                group: group_id,
            },
        );
        Ok(())
    }

    /// Load the sibling `<stem>.mapping` file, if present and not yet seen,
    /// and return the group the artifact belongs to afterwards.
    fn wire_mapping(&mut self, path: &Path) -> Result<GroupId> {
        let mapping_path = mapping::sibling_mapping_path(path);
        if mapping_path.exists() && !self.loaded_mappings.contains(&mapping_path) {
            let entries = mapping::load(&mapping_path)?;
            let mut linked: Vec<PathBuf> = entries.iter().map(|e| e.path.clone()).collect();
            linked.push(path.to_path_buf());
            let id = self.groups.link(&linked)?;
            if let Some(group) = self.groups.get_mut(id) {
                for entry in &entries {
                    if entry.role.is_passive() {
                        group.add_passive(Box::new(MediaListener::new(&entry.path, entry.role)));
                    }
                }
            }
            self.loaded_mappings.insert(mapping_path);
            return Ok(id);
        }
        Ok(self.groups.group_for(path))
    }

    /// Close an artifact, synchronizing it one last time if dirty.
    pub fn close(&mut self, path: &Path) -> Result<()> {
        if self.docs.contains_key(path) {
            self.poll_artifact(path);
        }
        let mut artifact = self
            .docs
            .remove(path)
            .ok_or_else(|| EditorError::DocumentNotFound {
                path: path.to_path_buf(),
            })?;
        artifact.sync.shutdown();
        if let Some(group) = self.groups.get_mut(artifact.group) {
            group.release(path);
        }
        self.groups.prune();
        Ok(())
    }

    #[must_use]
    pub fn is_open(&self, path: &Path) -> bool {
        self.docs.contains_key(path)
    }

    pub fn document(&self, path: &Path) -> Result<&SyncDocument> {
        self.docs
            .get(path)
            .map(|artifact| &artifact.doc)
            .ok_or_else(|| EditorError::DocumentNotFound {
                path: path.to_path_buf(),
            })
    }

    /// Mutable access for user edits; any mutation marks the artifact dirty
    /// for the next cycle.
    pub fn document_mut(&mut self, path: &Path) -> Result<&mut SyncDocument> {
        self.docs
            .get_mut(path)
            .map(|artifact| &mut artifact.doc)
            .ok_or_else(|| EditorError::DocumentNotFound {
                path: path.to_path_buf(),
            })
    }

    /// The timeline of the group `path` belongs to.
    #[must_use]
    pub fn timeline(&self, path: &Path) -> Option<&Timeline> {
        let artifact = self.docs.get(path)?;
        Some(self.groups.get(artifact.group)?.timeline())
    }

    #[must_use]
    pub fn group(&self, path: &Path) -> Option<&SyncGroup> {
        let artifact = self.docs.get(path)?;
        self.groups.get(artifact.group)
    }

    /// Run one synchronization pass over every open artifact. Returns how
    /// many artifacts committed changes.
    pub fn run_cycle(&mut self) -> usize {
        let paths: Vec<PathBuf> = self.docs.keys().cloned().collect();
        let mut updated = 0;
        for path in paths {
            if self.poll_artifact(&path) {
                updated += 1;
            }
        }
        updated
    }

    /// Reconcile one artifact if dirty. Returns whether a cycle committed.
    fn poll_artifact(&mut self, path: &Path) -> bool {
        let Some(artifact) = self.docs.get_mut(path) else {
            return false;
        };
        if artifact.sync.is_killed() {
            return false;
        }
        if !artifact.sync.is_initialized() {
            if artifact.sync.needs_update(&artifact.doc) {
                artifact.sync.initial_read(&artifact.doc);
            }
            return false;
        }
        if !artifact.sync.needs_update(&artifact.doc) {
            return false;
        }
        let group_id = artifact.group;
        let Some(timeline_before) = self
            .groups
            .get(group_id)
            .map(|group| group.timeline().clone())
        else {
            return false;
        };
        let Some(artifact) = self.docs.get_mut(path) else {
            return false;
        };
        let Some(group) = self.groups.get_mut(group_id) else {
            return false;
        };
        let (result, rollback) = artifact
            .sync
            .obtain_changes(&mut artifact.doc, group.timeline_mut());
        match result {
            UpdateResult::Failed => {
                log::warn!("{} has unsupported edits", path.display());
                false
            }
            UpdateResult::NotUpdated => false,
            UpdateResult::Updated => {
                let mut entry = UndoEntry::default();
                if let Some((before, after)) = rollback {
                    entry.docs.push(DocRollback {
                        path: path.to_path_buf(),
                        before,
                        after,
                    });
                }
                entry.timeline = Some(TimelineRollback {
                    group: group_id,
                    before: timeline_before,
                    after: group.timeline().clone(),
                });
                let counterpart = group.counterpart(path).map(Path::to_path_buf);
                group.notify_passive();
                if let Some(other_path) = counterpart {
                    self.broadcast(&other_path, group_id, &mut entry);
                }
                self.history.push(entry);
                true
            }
        }
    }

    /// Rewrite the counterpart artifact against the changed timeline.
    fn broadcast(&mut self, path: &Path, group_id: GroupId, entry: &mut UndoEntry) {
        let Some(artifact) = self.docs.get_mut(path) else {
            return;
        };
        let Some(group) = self.groups.get_mut(group_id) else {
            return;
        };
        if let Some((before, after)) = artifact
            .sync
            .on_timeline_changed(&mut artifact.doc, group.timeline_mut())
        {
            entry.docs.push(DocRollback {
                path: path.to_path_buf(),
                before,
                after,
            });
        }
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Roll the most recent committed cycle back.
    pub fn undo(&mut self) -> Result<()> {
        let entry = self.history.pop_undo()?;
        self.apply_rollback(&entry, true);
        self.history.stash_redo(entry);
        Ok(())
    }

    /// Re-apply the most recently undone cycle.
    pub fn redo(&mut self) -> Result<()> {
        let entry = self.history.pop_redo()?;
        self.apply_rollback(&entry, false);
        self.history.stash_undo(entry);
        Ok(())
    }

    fn apply_rollback(&mut self, entry: &UndoEntry, before: bool) {
        for rollback in &entry.docs {
            if let Some(artifact) = self.docs.get_mut(&rollback.path) {
                let state = if before {
                    &rollback.before
                } else {
                    &rollback.after
                };
                artifact.doc.set_text(&state.text);
                artifact.sync.restore(&state.statements);
                // A restore is not a user edit; keep the artifact clean.
                artifact.sync.mark_clean(&artifact.doc);
            }
        }
        if let Some(rollback) = &entry.timeline {
            if let Some(group) = self.groups.get_mut(rollback.group) {
                let source = if before {
                    &rollback.before
                } else {
                    &rollback.after
                };
                group.timeline_mut().load(source);
                group.notify_passive();
            }
        }
    }
}

/// The engine behind a lock, cloneable across threads. Whoever holds the
/// lock is the edit thread.
#[derive(Clone, Default)]
pub struct SharedEngine {
    inner: Arc<Mutex<SyncEngine>>,
}

impl SharedEngine {
    #[must_use]
    pub fn new(engine: SyncEngine) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    pub fn lock(&self) -> parking_lot::MutexGuard<'_, SyncEngine> {
        self.inner.lock()
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut SyncEngine) -> R) -> R {
        f(&mut self.inner.lock())
    }
}

/// Background thread polling for dirty artifacts.
///
/// Detection is concurrent; mutation happens under the engine lock. A tick
/// whose cycle finds failed or unreadable artifacts just retries on the next
/// tick, no backoff.
pub struct DirtyPoller {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl DirtyPoller {
    #[must_use]
    pub fn spawn(engine: SharedEngine, interval: Duration) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let handle = std::thread::spawn(move || {
            while !flag.load(Ordering::Relaxed) {
                let updated = engine.with(SyncEngine::run_cycle);
                if updated > 0 {
                    log::debug!("poll tick committed {updated} artifact(s)");
                }
                std::thread::park_timeout(interval);
            }
        });
        Self {
            stop,
            handle: Some(handle),
        }
    }

    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            handle.thread().unpark();
            if handle.join().is_err() {
                log::error!("poller thread panicked");
            }
        }
    }
}

impl Drop for DirtyPoller {
    fn drop(&mut self) {
        self.stop();
    }
}
