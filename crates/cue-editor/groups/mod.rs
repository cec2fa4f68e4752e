//! Groups tie sibling artifacts to one shared timeline.
//!
//! Every open artifact belongs to exactly one [`SyncGroup`]. A group owns
//! the [`Timeline`] its members project through, at most one script slot, at
//! most one transcript slot, and any number of passive listeners (audio and
//! video consumers that only observe deletions). Groups are keyed by the
//! file path with its extension stripped, so `take1.transcript` and
//! `take1.script` land together without any mapping file; a mapping merges
//! groups that do not share a stem.

use std::path::{Path, PathBuf};

use ahash::AHashMap;
use cue_core::{TimeRange, Timeline};

use crate::core::errors::{EditorError, Result};

pub mod mapping;

/// What a group member does with the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerRole {
    Audio,
    Video,
    Transcript,
    Script,
}

impl ListenerRole {
    /// Passive roles observe deletions but never produce them.
    #[must_use]
    pub const fn is_passive(self) -> bool {
        matches!(self, Self::Audio | Self::Video)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Audio => "AUDIO",
            Self::Video => "VIDEO",
            Self::Transcript => "TRANSCRIPT",
            Self::Script => "SCRIPT",
        }
    }

    /// Mapping-file key lookup, case-insensitive.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        match key.to_ascii_uppercase().as_str() {
            "AUDIO" => Some(Self::Audio),
            "VIDEO" => Some(Self::Video),
            "TRANSCRIPT" => Some(Self::Transcript),
            "SCRIPT" => Some(Self::Script),
            _ => None,
        }
    }
}

/// Passive observer of a group's timeline.
pub trait TimelineListener: Send {
    fn role(&self) -> ListenerRole;
    fn timeline_changed(&mut self, timeline: &Timeline);
}

/// Records the latest cut list for a media file so an audio/video trimmer
/// can pick it up after synchronization.
#[derive(Debug)]
pub struct MediaListener {
    path: PathBuf,
    role: ListenerRole,
    cut_list: Vec<TimeRange>,
}

impl MediaListener {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, role: ListenerRole) -> Self {
        Self {
            path: path.into(),
            role,
            cut_list: Vec::new(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The deleted ranges observed at the last timeline change.
    #[must_use]
    pub fn cut_list(&self) -> &[TimeRange] {
        &self.cut_list
    }
}

impl TimelineListener for MediaListener {
    fn role(&self) -> ListenerRole {
        self.role
    }

    fn timeline_changed(&mut self, timeline: &Timeline) {
        self.cut_list.clear();
        self.cut_list.extend_from_slice(timeline.deleted_ranges());
        log::debug!(
            "{} cut list for {}: {} range(s)",
            self.role.as_str(),
            self.path.display(),
            self.cut_list.len()
        );
    }
}

/// Opaque group handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupId(usize);

/// One timeline and the artifacts anchored to it.
pub struct SyncGroup {
    key: String,
    timeline: Timeline,
    script: Option<PathBuf>,
    transcript: Option<PathBuf>,
    passive: Vec<Box<dyn TimelineListener>>,
}

impl std::fmt::Debug for SyncGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncGroup")
            .field("key", &self.key)
            .field("timeline", &self.timeline)
            .field("script", &self.script)
            .field("transcript", &self.transcript)
            .field("passive", &self.passive.len())
            .finish()
    }
}

impl SyncGroup {
    fn new(key: String) -> Self {
        Self {
            key,
            timeline: Timeline::new(),
            script: None,
            transcript: None,
            passive: Vec::new(),
        }
    }

    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[must_use]
    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn timeline_mut(&mut self) -> &mut Timeline {
        &mut self.timeline
    }

    #[must_use]
    pub fn script(&self) -> Option<&Path> {
        self.script.as_deref()
    }

    #[must_use]
    pub fn transcript(&self) -> Option<&Path> {
        self.transcript.as_deref()
    }

    /// Claim the script or transcript slot for `path`. Re-claiming the same
    /// path is a no-op; a second distinct path is a mapping conflict.
    pub fn claim_role(&mut self, role: ListenerRole, path: &Path) -> Result<()> {
        let slot = match role {
            ListenerRole::Script => &mut self.script,
            ListenerRole::Transcript => &mut self.transcript,
            ListenerRole::Audio | ListenerRole::Video => {
                return Err(EditorError::invalid_mapping(format!(
                    "{} is a passive role",
                    role.as_str()
                )))
            }
        };
        match slot {
            Some(existing) if existing.as_path() != path => {
                Err(EditorError::invalid_mapping(format!(
                    "group '{}' already has a {} ({})",
                    self.key,
                    role.as_str(),
                    existing.display()
                )))
            }
            _ => {
                *slot = Some(path.to_path_buf());
                Ok(())
            }
        }
    }

    /// Drop `path` from whatever active slot it occupies.
    pub fn release(&mut self, path: &Path) {
        if self.script.as_deref() == Some(path) {
            self.script = None;
        }
        if self.transcript.as_deref() == Some(path) {
            self.transcript = None;
        }
    }

    /// Whether the group still anchors anything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.script.is_none() && self.transcript.is_none() && self.passive.is_empty()
    }

    pub fn add_passive(&mut self, listener: Box<dyn TimelineListener>) {
        self.passive.push(listener);
    }

    /// Push the current timeline to every passive listener.
    pub fn notify_passive(&mut self) {
        let timeline = &self.timeline;
        for listener in &mut self.passive {
            listener.timeline_changed(timeline);
        }
    }

    /// The path of the other active member, given one member's path.
    #[must_use]
    pub fn counterpart(&self, path: &Path) -> Option<&Path> {
        if self.script.as_deref() == Some(path) {
            self.transcript.as_deref()
        } else if self.transcript.as_deref() == Some(path) {
            self.script.as_deref()
        } else {
            None
        }
    }
}

/// Registry of groups, keyed by the extension-stripped path.
#[derive(Debug, Default)]
pub struct GroupManager {
    groups: AHashMap<usize, SyncGroup>,
    by_key: AHashMap<String, usize>,
    next: usize,
}

impl GroupManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The group `path` belongs to, created lazily on first reference.
    pub fn group_for(&mut self, path: &Path) -> GroupId {
        let key = canonical_key(path);
        if let Some(&id) = self.by_key.get(&key) {
            return GroupId(id);
        }
        let id = self.next;
        self.next += 1;
        self.groups.insert(id, SyncGroup::new(key.clone()));
        self.by_key.insert(key, id);
        GroupId(id)
    }

    #[must_use]
    pub fn get(&self, id: GroupId) -> Option<&SyncGroup> {
        self.groups.get(&id.0)
    }

    pub fn get_mut(&mut self, id: GroupId) -> Option<&mut SyncGroup> {
        self.groups.get_mut(&id.0)
    }

    /// Merge `from` into `into`.
    ///
    /// Fails with `InvalidMapping`, touching nothing, when both groups carry
    /// a script or both carry a transcript. On success the surviving group
    /// keeps its key, takes over the other's slots and passive listeners,
    /// and replays the other's deletions onto its timeline.
    pub fn merge(&mut self, into: GroupId, from: GroupId) -> Result<()> {
        if into == from {
            return Ok(());
        }
        {
            let target = self.groups.get(&into.0).ok_or_else(stale_group)?;
            let source = self.groups.get(&from.0).ok_or_else(stale_group)?;
            if target.script.is_some() && source.script.is_some() {
                return Err(EditorError::invalid_mapping(format!(
                    "groups '{}' and '{}' both have a script",
                    target.key, source.key
                )));
            }
            if target.transcript.is_some() && source.transcript.is_some() {
                return Err(EditorError::invalid_mapping(format!(
                    "groups '{}' and '{}' both have a transcript",
                    target.key, source.key
                )));
            }
        }
        // Checks passed; the rest cannot fail.
        let Some(source) = self.groups.remove(&from.0) else {
            return Err(stale_group());
        };
        let Some(target) = self.groups.get_mut(&into.0) else {
            self.groups.insert(from.0, source);
            return Err(stale_group());
        };
        if target.script.is_none() {
            target.script = source.script;
        }
        if target.transcript.is_none() {
            target.transcript = source.transcript;
        }
        target.passive.extend(source.passive);
        for range in source.timeline.deleted_ranges() {
            target.timeline.delete(*range);
        }
        self.by_key.insert(source.key, into.0);
        for id in self.by_key.values_mut() {
            if *id == from.0 {
                *id = into.0;
            }
        }
        log::info!("merged group into '{}'", self.groups[&into.0].key);
        Ok(())
    }

    /// Link every path referenced by one mapping into a single group.
    /// Transactional: a slot conflict aborts before any merge.
    pub fn link(&mut self, paths: &[PathBuf]) -> Result<GroupId> {
        let mut ids: Vec<GroupId> = Vec::new();
        for path in paths {
            let id = self.group_for(path);
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        let Some((&first, rest)) = ids.split_first() else {
            return Err(EditorError::invalid_mapping("mapping references no files"));
        };
        let mut scripts = 0usize;
        let mut transcripts = 0usize;
        for id in &ids {
            let group = self.groups.get(&id.0).ok_or_else(stale_group)?;
            scripts += usize::from(group.script.is_some());
            transcripts += usize::from(group.transcript.is_some());
        }
        if scripts > 1 || transcripts > 1 {
            return Err(EditorError::invalid_mapping(
                "mapping would give one group multiple scripts or transcripts",
            ));
        }
        for id in rest {
            self.merge(first, *id)?;
        }
        Ok(first)
    }

    /// Drop groups that no longer anchor anything.
    pub fn prune(&mut self) {
        let dead: Vec<usize> = self
            .groups
            .iter()
            .filter(|(_, group)| group.is_empty() && group.timeline.deleted_ranges().is_empty())
            .map(|(&id, _)| id)
            .collect();
        for id in dead {
            self.groups.remove(&id);
            self.by_key.retain(|_, mapped| *mapped != id);
        }
    }
}

fn stale_group() -> EditorError {
    EditorError::invalid_mapping("group no longer exists")
}

/// Extension-stripped path, the canonical group key.
#[must_use]
pub fn canonical_key(path: &Path) -> String {
    path.with_extension("").to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sibling_extensions_share_a_group() {
        let mut groups = GroupManager::new();
        let a = groups.group_for(Path::new("/takes/one.transcript"));
        let b = groups.group_for(Path::new("/takes/one.script"));
        let c = groups.group_for(Path::new("/takes/two.transcript"));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn claiming_an_occupied_slot_fails() {
        let mut groups = GroupManager::new();
        let id = groups.group_for(Path::new("one.script"));
        let group = groups.get_mut(id).unwrap();
        group
            .claim_role(ListenerRole::Script, Path::new("one.script"))
            .unwrap();
        // Same path again is fine.
        group
            .claim_role(ListenerRole::Script, Path::new("one.script"))
            .unwrap();
        let err = group
            .claim_role(ListenerRole::Script, Path::new("other.script"))
            .unwrap_err();
        assert!(matches!(err, EditorError::InvalidMapping { .. }));
    }

    #[test]
    fn merge_replays_deletions_and_keeps_slots() {
        let mut groups = GroupManager::new();
        let a = groups.group_for(Path::new("a.transcript"));
        let b = groups.group_for(Path::new("b.script"));
        groups
            .get_mut(a)
            .unwrap()
            .claim_role(ListenerRole::Transcript, Path::new("a.transcript"))
            .unwrap();
        groups.get_mut(a).unwrap().timeline_mut().delete(TimeRange::new(0, 9));
        groups
            .get_mut(b)
            .unwrap()
            .claim_role(ListenerRole::Script, Path::new("b.script"))
            .unwrap();
        groups.get_mut(b).unwrap().timeline_mut().delete(TimeRange::new(5, 20));
        groups.merge(a, b).unwrap();
        let merged = groups.get(a).unwrap();
        assert_eq!(merged.transcript(), Some(Path::new("a.transcript")));
        assert_eq!(merged.script(), Some(Path::new("b.script")));
        assert_eq!(merged.timeline().deleted_ranges(), &[TimeRange::new(0, 20)]);
        // Both keys now resolve to the surviving group.
        assert_eq!(groups.group_for(Path::new("b.script")), a);
    }

    #[test]
    fn merge_with_two_scripts_fails_without_mutation() {
        let mut groups = GroupManager::new();
        let a = groups.group_for(Path::new("a.script"));
        let b = groups.group_for(Path::new("b.script"));
        for (id, path) in [(a, "a.script"), (b, "b.script")] {
            groups
                .get_mut(id)
                .unwrap()
                .claim_role(ListenerRole::Script, Path::new(path))
                .unwrap();
        }
        groups.get_mut(b).unwrap().timeline_mut().delete(TimeRange::new(0, 9));
        let err = groups.merge(a, b).unwrap_err();
        assert!(matches!(err, EditorError::InvalidMapping { .. }));
        // The source group survived untouched.
        assert_eq!(
            groups.get(b).unwrap().timeline().deleted_ranges(),
            &[TimeRange::new(0, 9)]
        );
        assert!(groups.get(a).unwrap().timeline().deleted_ranges().is_empty());
    }

    #[test]
    fn link_is_transactional_across_many_groups() {
        let mut groups = GroupManager::new();
        for path in ["a.script", "b.script", "c.transcript"] {
            let id = groups.group_for(Path::new(path));
            let role = if path.ends_with(".script") {
                ListenerRole::Script
            } else {
                ListenerRole::Transcript
            };
            groups
                .get_mut(id)
                .unwrap()
                .claim_role(role, Path::new(path))
                .unwrap();
        }
        let err = groups
            .link(&[
                PathBuf::from("a.script"),
                PathBuf::from("b.script"),
                PathBuf::from("c.transcript"),
            ])
            .unwrap_err();
        assert!(matches!(err, EditorError::InvalidMapping { .. }));
        // No merge happened at all.
        assert_ne!(
            groups.group_for(Path::new("a.script")),
            groups.group_for(Path::new("c.transcript"))
        );
    }

    #[test]
    fn media_listener_records_the_cut_list() {
        let mut listener = MediaListener::new("take.wav", ListenerRole::Audio);
        let mut timeline = Timeline::new();
        timeline.delete(TimeRange::new(10, 20));
        listener.timeline_changed(&timeline);
        assert_eq!(listener.cut_list(), &[TimeRange::new(10, 20)]);
    }
}
