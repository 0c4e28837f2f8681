//! Change detection against the previous manifest.
//!
//! A file is changed when:
//! 1. the previous manifest has no entry for its path, or
//! 2. its content id differs, or
//! 3. it is archived and the previous archive metadata is missing or empty.
//!
//! Components are joined on their id and compared by content id only.

use std::collections::HashMap;

use serde::Serialize;

use verwriter_core::{ComponentEntry, ComponentId, FileEntry, GenerationConfig};

use crate::enumerate::Snapshot;
use crate::manifest::Manifest;

/// Files and components that must be copied and rewritten this run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    pub files: Vec<FileEntry>,
    pub components: Vec<ComponentEntry>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.components.is_empty()
    }
}

/// Diff `snapshot` against `previous`. With no previous manifest everything
/// is changed.
pub fn compute(
    snapshot: &Snapshot,
    previous: Option<&Manifest>,
    config: &GenerationConfig,
) -> ChangeSet {
    let Some(previous) = previous else {
        return ChangeSet {
            files: snapshot.files.clone(),
            components: snapshot.components.clone(),
        };
    };

    ChangeSet {
        files: changed_files(&snapshot.files, &previous.file_entries(config)),
        components: changed_components(&snapshot.components, &previous.component_entries(config)),
    }
}

/// Entries of `current` that differ from `previous`, in `current` order.
pub fn changed_files(current: &[FileEntry], previous: &[FileEntry]) -> Vec<FileEntry> {
    let old: HashMap<&str, &FileEntry> = previous.iter().map(|f| (f.path.as_str(), f)).collect();
    current
        .iter()
        .filter(|new| match old.get(new.path.as_str()) {
            None => true,
            Some(old) => is_file_changed(new, old),
        })
        .cloned()
        .collect()
}

fn is_file_changed(new: &FileEntry, old: &FileEntry) -> bool {
    if new.content_id != old.content_id {
        tracing::debug!("content changed: {}", new.path);
        return true;
    }
    if old.archived && !old.has_archive_metadata() {
        tracing::debug!("archive metadata missing: {}", new.path);
        return true;
    }
    tracing::debug!("unchanged: {}", new.path);
    false
}

/// Components of `current` that are new or whose content id differs.
pub fn changed_components(
    current: &[ComponentEntry],
    previous: &[ComponentEntry],
) -> Vec<ComponentEntry> {
    let old: HashMap<&ComponentId, &str> = previous
        .iter()
        .map(|c| (&c.id, c.file.content_id.as_str()))
        .collect();
    current
        .iter()
        .filter(|c| old.get(&c.id) != Some(&c.file.content_id.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use verwriter_core::{ArchiveInfo, IniStore};

    use super::*;

    fn entry(path: &str, id: &str, size_kb: u64) -> FileEntry {
        FileEntry {
            path: path.into(),
            content_id: id.into(),
            size_kb,
            archived: false,
            archive: None,
        }
    }

    fn component(id: &str, content: &str, size_kb: u64) -> ComponentEntry {
        ComponentEntry {
            id: ComponentId::from(id),
            file: entry("", content, size_kb),
        }
    }

    fn paths(entries: &[FileEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.path.as_str()).collect()
    }

    #[test]
    fn identical_content_is_unchanged() {
        let current = vec![entry("a.txt", "aa", 1), entry("b.txt", "bb", 1)];
        let previous = current.clone();
        assert!(changed_files(&current, &previous).is_empty());
    }

    #[test]
    fn new_and_modified_files_are_changed() {
        let current = vec![
            entry("a.txt", "aa", 1),
            entry("b.txt", "b2", 1),
            entry("c.txt", "cc", 1),
        ];
        let previous = vec![entry("a.txt", "aa", 1), entry("b.txt", "b1", 1)];
        assert_eq!(paths(&changed_files(&current, &previous)), vec!["b.txt", "c.txt"]);
    }

    #[test]
    fn size_alone_does_not_count_for_files() {
        let current = vec![entry("a.txt", "aa", 1)];
        let previous = vec![entry("a.txt", "aa", 9)];
        assert!(changed_files(&current, &previous).is_empty());
    }

    #[test]
    fn archived_file_without_metadata_is_changed_even_if_identical() {
        let mut old = entry("big.mix", "mm", 4);
        old.archived = true;
        let current = vec![entry("big.mix", "mm", 4)];

        assert_eq!(changed_files(&current, &[old.clone()]).len(), 1);

        old.archive = Some(ArchiveInfo {
            id: "zz".into(),
            size_kb: 0,
        });
        assert_eq!(changed_files(&current, &[old.clone()]).len(), 1);

        old.archive = Some(ArchiveInfo {
            id: "zz".into(),
            size_kb: 2,
        });
        assert!(changed_files(&current, &[old]).is_empty());
    }

    #[test]
    fn components_compare_content_id_only() {
        let current = vec![component("RA1", "r1", 3), component("TS", "t2", 1), component("FS", "f1", 1)];
        let previous = vec![component("RA1", "r1", 999), component("TS", "t1", 1)];
        let ids: Vec<_> = changed_components(&current, &previous)
            .into_iter()
            .map(|c| c.id.0)
            .collect();
        assert_eq!(ids, vec!["TS", "FS"]);
    }

    #[test]
    fn no_previous_manifest_changes_everything() {
        let cfg = GenerationConfig::from_store(&IniStore::parse("[Version]\n1\n[Include]\na.txt\n")).unwrap();
        let snapshot = Snapshot {
            files: vec![entry("a.txt", "aa", 1)],
            components: vec![component("RA1", "r1", 1)],
        };
        let changes = compute(&snapshot, None, &cfg);
        assert_eq!(changes.files.len(), 1);
        assert_eq!(changes.components.len(), 1);
        assert!(!changes.is_empty());
    }
}
