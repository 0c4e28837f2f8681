//! Copy lifecycle for changed files.
//!
//! 1. If the destination directory exists, confirm the overwrite and remove it
//!    under a [`RetryPolicy`].
//! 2. Copy each changed file; archived entries are compressed to
//!    `<dest>/<path>.lzma` and stamped with the artifact's fingerprint.
//! 3. After the manifest is written, mirror it into the destination.
//!
//! The first failing copy aborts the step. Files already copied stay put.

use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;

use verwriter_core::{ArchiveInfo, FileEntry};

use crate::archiver;
use crate::diff::ChangeSet;
use crate::error::{file_op_err, GenerateError};
use crate::fingerprint::fingerprint_file;
use crate::retry::RetryPolicy;

/// Default destination subdirectory under the base directory.
pub const DEFAULT_COPY_DIR: &str = "VersionWriterCopiedFiles";

/// Answers the interactive questions a run may ask.
pub trait Prompter {
    /// The destination directory exists and is about to be deleted.
    fn confirm_overwrite(&self, dir: &Path) -> bool;

    /// Removing `dir` failed on `attempt`; return `false` to give up.
    fn confirm_retry(&self, _dir: &Path, _attempt: u32, _err: &io::Error) -> bool {
        true
    }
}

/// Says yes to everything. Used when prompts are suppressed.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoConfirm;

impl Prompter for AutoConfirm {
    fn confirm_overwrite(&self, _dir: &Path) -> bool {
        true
    }
}

/// Outcome of copying one changed entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CopyResult {
    /// The original file was copied.
    Copied { path: PathBuf },
    /// A compressed side-artifact was written.
    Archived { path: PathBuf, archive: ArchiveInfo },
}

impl CopyResult {
    pub fn path(&self) -> &Path {
        match self {
            CopyResult::Copied { path } | CopyResult::Archived { path, .. } => path,
        }
    }
}

/// Remove an existing destination directory so the run starts clean.
pub fn prepare_destination(
    dest: &Path,
    prompter: &dyn Prompter,
    retry: &RetryPolicy,
) -> Result<(), GenerateError> {
    if !dest.exists() {
        return Ok(());
    }
    if !prompter.confirm_overwrite(dest) {
        return Err(GenerateError::Aborted {
            path: dest.to_path_buf(),
        });
    }

    retry
        .run(
            |_| std::fs::remove_dir_all(dest),
            |attempt, err| {
                tracing::warn!("could not remove {} (attempt {attempt}): {err}", dest.display());
                prompter.confirm_retry(dest, attempt, err)
            },
        )
        .map_err(|exhausted| GenerateError::CleanupFailed {
            path: dest.to_path_buf(),
            attempts: exhausted.attempts,
            source: exhausted.last,
        })?;
    tracing::debug!("removed previous copy directory {}", dest.display());
    Ok(())
}

/// Copy every changed file and component from `base_dir` into `dest`.
///
/// Fresh archive metadata is written back onto the entries in `changes`.
pub fn copy_changes(
    base_dir: &Path,
    dest: &Path,
    changes: &mut ChangeSet,
    copy_archived_originals: bool,
) -> Result<Vec<CopyResult>, GenerateError> {
    let mut results = Vec::new();
    let entries = changes
        .files
        .iter_mut()
        .chain(changes.components.iter_mut().map(|c| &mut c.file));
    for entry in entries {
        copy_entry(base_dir, dest, entry, copy_archived_originals, &mut results)?;
    }
    Ok(results)
}

fn copy_entry(
    base_dir: &Path,
    dest: &Path,
    entry: &mut FileEntry,
    copy_archived_originals: bool,
    results: &mut Vec<CopyResult>,
) -> Result<(), GenerateError> {
    let src = base_dir.join(&entry.path);
    let dst = dest.join(&entry.path);

    if entry.archived {
        let artifact = archiver::archive_path(&dst);
        archiver::compress_file(&src, &artifact).map_err(|e| file_op_err(&src, e))?;
        let fp = fingerprint_file(&artifact).map_err(|e| file_op_err(&artifact, e))?;
        let info = ArchiveInfo {
            id: fp.content_id.clone(),
            size_kb: fp.size_kb(),
        };
        tracing::info!("archived: {}", artifact.display());
        entry.archive = Some(info.clone());
        results.push(CopyResult::Archived {
            path: artifact,
            archive: info,
        });
        if !copy_archived_originals {
            return Ok(());
        }
    }

    copy_file(&src, &dst)?;
    tracing::info!("copied: {}", dst.display());
    results.push(CopyResult::Copied { path: dst });
    Ok(())
}

fn copy_file(src: &Path, dst: &Path) -> Result<(), GenerateError> {
    if let Some(parent) = dst.parent() {
        std::fs::create_dir_all(parent).map_err(|e| file_op_err(parent, e))?;
    }
    std::fs::copy(src, dst).map_err(|e| file_op_err(src, e))?;
    Ok(())
}

/// Copy the freshly written manifest into the destination directory.
pub fn mirror_manifest(manifest: &Path, dest: &Path) -> Result<PathBuf, GenerateError> {
    let Some(name) = manifest.file_name() else {
        return Err(file_op_err(
            manifest,
            io::Error::other("manifest path has no file name"),
        ));
    };
    let target = dest.join(name);
    copy_file(manifest, &target)?;
    Ok(target)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::fs;
    use std::time::Duration;

    use tempfile::TempDir;

    use super::*;

    struct Decline;

    impl Prompter for Decline {
        fn confirm_overwrite(&self, _dir: &Path) -> bool {
            false
        }
    }

    struct CountingPrompter {
        asked: Cell<u32>,
    }

    impl Prompter for CountingPrompter {
        fn confirm_overwrite(&self, _dir: &Path) -> bool {
            self.asked.set(self.asked.get() + 1);
            true
        }
    }

    fn entry(path: &str, archived: bool) -> FileEntry {
        FileEntry {
            path: path.into(),
            content_id: "x".into(),
            size_kb: 0,
            archived,
            archive: None,
        }
    }

    fn noise(len: usize) -> Vec<u8> {
        let mut state: u32 = 0x1234_5678;
        (0..len)
            .map(|_| {
                state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                (state >> 24) as u8
            })
            .collect()
    }

    #[test]
    fn missing_destination_needs_no_prompt() {
        let tmp = TempDir::new().unwrap();
        let prompter = CountingPrompter { asked: Cell::new(0) };
        prepare_destination(&tmp.path().join("out"), &prompter, &RetryPolicy::default()).unwrap();
        assert_eq!(prompter.asked.get(), 0);
    }

    #[test]
    fn existing_destination_is_removed_after_confirmation() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("out");
        fs::create_dir_all(dest.join("old")).unwrap();
        fs::write(dest.join("old").join("stale.txt"), "x").unwrap();

        let prompter = CountingPrompter { asked: Cell::new(0) };
        prepare_destination(&dest, &prompter, &RetryPolicy::default()).unwrap();
        assert_eq!(prompter.asked.get(), 1);
        assert!(!dest.exists());
    }

    #[test]
    fn declined_overwrite_aborts_and_keeps_directory() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("out");
        fs::create_dir_all(&dest).unwrap();
        let err = prepare_destination(&dest, &Decline, &RetryPolicy::default()).unwrap_err();
        assert!(matches!(err, GenerateError::Aborted { .. }), "got: {err}");
        assert!(dest.exists());
    }

    #[test]
    fn removal_failure_exhausts_retry_budget() {
        let tmp = TempDir::new().unwrap();
        // A plain file where a directory is expected makes remove_dir_all fail.
        let dest = tmp.path().join("out");
        fs::write(&dest, "not a dir").unwrap();
        let retry = RetryPolicy {
            attempts: 2,
            delay: Duration::from_millis(1),
        };
        let err = prepare_destination(&dest, &AutoConfirm, &retry).unwrap_err();
        assert!(
            matches!(err, GenerateError::CleanupFailed { attempts: 2, .. }),
            "got: {err}"
        );
    }

    #[test]
    fn plain_files_are_copied_with_parents() {
        let tmp = TempDir::new().unwrap();
        let base = tmp.path().join("base");
        fs::create_dir_all(base.join("Res")).unwrap();
        fs::write(base.join("Res/a.txt"), "alpha").unwrap();
        let dest = base.join(DEFAULT_COPY_DIR);

        let mut changes = ChangeSet {
            files: vec![entry("Res/a.txt", false)],
            components: vec![],
        };
        let results = copy_changes(&base, &dest, &mut changes, false).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(fs::read_to_string(dest.join("Res/a.txt")).unwrap(), "alpha");
    }

    #[test]
    fn archived_files_get_artifact_and_metadata() {
        let tmp = TempDir::new().unwrap();
        let base = tmp.path();
        fs::write(base.join("big.mix"), noise(8192)).unwrap();
        let dest = base.join(DEFAULT_COPY_DIR);

        let mut changes = ChangeSet {
            files: vec![entry("big.mix", true)],
            components: vec![],
        };
        let results = copy_changes(base, &dest, &mut changes, false).unwrap();

        assert!(dest.join("big.mix.lzma").is_file());
        assert!(!dest.join("big.mix").exists(), "original suppressed by default");
        assert_eq!(results.len(), 1);
        let info = changes.files[0].archive.clone().expect("fresh archive metadata");
        assert!(info.is_complete());
        assert_eq!(
            info.id,
            fingerprint_file(&dest.join("big.mix.lzma")).unwrap().content_id
        );
    }

    #[test]
    fn archived_originals_copied_when_requested() {
        let tmp = TempDir::new().unwrap();
        let base = tmp.path();
        fs::write(base.join("big.mix"), noise(2048)).unwrap();
        let dest = base.join(DEFAULT_COPY_DIR);

        let mut changes = ChangeSet {
            files: vec![entry("big.mix", true)],
            components: vec![],
        };
        let results = copy_changes(base, &dest, &mut changes, true).unwrap();
        assert_eq!(results.len(), 2);
        assert!(dest.join("big.mix").is_file());
        assert!(dest.join("big.mix.lzma").is_file());
    }

    #[test]
    fn copy_failure_is_a_file_operation_error() {
        let tmp = TempDir::new().unwrap();
        let mut changes = ChangeSet {
            files: vec![entry("vanished.txt", false)],
            components: vec![],
        };
        let err = copy_changes(tmp.path(), &tmp.path().join("out"), &mut changes, false).unwrap_err();
        assert!(matches!(err, GenerateError::FileOperation { .. }), "got: {err}");
    }

    #[test]
    fn manifest_mirror_lands_in_destination() {
        let tmp = TempDir::new().unwrap();
        let manifest = tmp.path().join("version");
        fs::write(&manifest, "[DTA]\nVersion=1\n").unwrap();
        let dest = tmp.path().join("out");
        let mirrored = mirror_manifest(&manifest, &dest).unwrap();
        assert_eq!(mirrored, dest.join("version"));
        assert_eq!(fs::read_to_string(mirrored).unwrap(), "[DTA]\nVersion=1\n");
    }
}
