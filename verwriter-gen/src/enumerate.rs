//! File enumeration: resolve `[Include]` entries against the base directory,
//! apply exclusions, and fingerprint every surviving file.
//!
//! Directory walks are sorted by file name so a given filesystem state
//! always enumerates in the same order. An unreadable entry fails the walk.
//! An empty include path names the base directory itself.

use std::collections::HashSet;
use std::io;
use std::path::Path;

use walkdir::WalkDir;

use verwriter_core::{ComponentEntry, FileEntry, GenerationConfig};

use crate::error::{io_err, GenerateError};
use crate::fingerprint::fingerprint_file;

/// Fresh disk state for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub files: Vec<FileEntry>,
    pub components: Vec<ComponentEntry>,
}

/// Enumerate files and components for `config` under `base_dir`.
pub fn snapshot(base_dir: &Path, config: &GenerationConfig) -> Result<Snapshot, GenerateError> {
    let files = enumerate_files(base_dir, config)?;
    let components = enumerate_components(base_dir, config)?;
    tracing::debug!(
        "enumerated {} file(s) and {} component(s) under {}",
        files.len(),
        components.len(),
        base_dir.display()
    );
    Ok(Snapshot { files, components })
}

/// Resolve every include entry to fingerprinted [`FileEntry`] values.
///
/// Fails with [`GenerateError::MissingInclude`] before hashing anything if an
/// include names neither a file nor a directory.
pub fn enumerate_files(
    base_dir: &Path,
    config: &GenerationConfig,
) -> Result<Vec<FileEntry>, GenerateError> {
    for include in &config.includes {
        let full = base_dir.join(include);
        if !full.is_file() && !full.is_dir() {
            return Err(GenerateError::MissingInclude {
                path: include.clone(),
            });
        }
    }

    let mut candidates = Vec::new();
    for include in &config.includes {
        let full = base_dir.join(include);
        if full.is_dir() {
            collect_dir(
                &full,
                include,
                config.options.recursive_directory_search,
                &mut candidates,
            )?;
        } else {
            candidates.push(include.clone());
        }
    }

    let mut seen = HashSet::new();
    let mut entries = Vec::with_capacity(candidates.len());
    for rel in candidates {
        if !seen.insert(rel.clone()) {
            tracing::debug!("duplicate include resolved again, keeping first: {rel}");
            continue;
        }
        if let Some(reason) = exclusion_reason(base_dir, &rel, config) {
            tracing::warn!("skipping {rel}: {reason}");
            continue;
        }

        let full = base_dir.join(&rel);
        let fp = fingerprint_file(&full).map_err(|e| io_err(&full, e))?;
        entries.push(FileEntry {
            archived: config.is_archived(&rel),
            path: rel,
            content_id: fp.content_id.clone(),
            size_kb: fp.size_kb(),
            archive: None,
        });
    }
    Ok(entries)
}

/// Fingerprint every `[AddOns]` component.
pub fn enumerate_components(
    base_dir: &Path,
    config: &GenerationConfig,
) -> Result<Vec<ComponentEntry>, GenerateError> {
    let mut out = Vec::with_capacity(config.components.len());
    for spec in &config.components {
        let full = base_dir.join(&spec.path);
        if !full.is_file() {
            return Err(GenerateError::MissingComponent {
                id: spec.id.0.clone(),
                path: spec.path.clone(),
            });
        }
        let fp = fingerprint_file(&full).map_err(|e| io_err(&full, e))?;
        out.push(ComponentEntry {
            id: spec.id.clone(),
            file: FileEntry {
                path: spec.path.clone(),
                content_id: fp.content_id.clone(),
                size_kb: fp.size_kb(),
                archived: config.is_archived(&spec.path),
                archive: None,
            },
        });
    }
    Ok(out)
}

fn collect_dir(
    dir: &Path,
    rel_dir: &str,
    recursive: bool,
    out: &mut Vec<String>,
) -> Result<(), GenerateError> {
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(if recursive { usize::MAX } else { 1 })
        .sort_by_file_name();

    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().map_or_else(|| dir.to_path_buf(), Path::to_path_buf);
            io_err(path, e.into())
        })?;
        if !entry.path().is_file() {
            continue;
        }
        let sub = entry
            .path()
            .strip_prefix(dir)
            .map_err(|e| io_err(entry.path(), io::Error::other(e)))?;
        out.push(join_rel(rel_dir, sub));
    }
    Ok(())
}

/// `rel_dir/sub` with `/` separators. An empty `rel_dir` is the base directory.
fn join_rel(rel_dir: &str, sub: &Path) -> String {
    let sub = sub
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    if rel_dir.is_empty() {
        sub
    } else {
        format!("{rel_dir}/{sub}")
    }
}

fn exclusion_reason(base_dir: &Path, rel: &str, config: &GenerationConfig) -> Option<String> {
    if config.exclude_files.contains(rel) {
        return Some("listed in [ExcludeFiles]".to_owned());
    }
    if let Some(prefix) = config
        .exclude_directories
        .iter()
        .find(|prefix| rel.starts_with(prefix.as_str()))
    {
        return Some(format!("under excluded directory '{prefix}'"));
    }
    if config.options.exclude_hidden_and_system_files {
        let full = base_dir.join(rel);
        if is_hidden_or_system(&full) {
            return Some("hidden or system file".to_owned());
        }
        // Only directories inside the base directory count.
        if rel.contains('/') {
            if let Some(parent) = full.parent() {
                if is_hidden_or_system(parent) {
                    return Some("inside a hidden or system directory".to_owned());
                }
            }
        }
    }
    None
}

#[cfg(windows)]
fn is_hidden_or_system(path: &Path) -> bool {
    use std::os::windows::fs::MetadataExt;

    const FILE_ATTRIBUTE_HIDDEN: u32 = 0x2;
    const FILE_ATTRIBUTE_SYSTEM: u32 = 0x4;

    std::fs::metadata(path)
        .map(|m| m.file_attributes() & (FILE_ATTRIBUTE_HIDDEN | FILE_ATTRIBUTE_SYSTEM) != 0)
        .unwrap_or(false)
}

#[cfg(not(windows))]
fn is_hidden_or_system(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;
    use verwriter_core::IniStore;

    use super::*;

    fn config(body: &str) -> GenerationConfig {
        GenerationConfig::from_store(&IniStore::parse(&format!("[Version]\n1\n{body}")))
            .expect("config")
    }

    fn touch(base: &Path, rel: &str, bytes: &[u8]) {
        let path = base.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, bytes).unwrap();
    }

    fn paths(entries: &[FileEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.path.as_str()).collect()
    }

    #[test]
    fn directory_include_is_top_level_only_by_default() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "Res/b.txt", b"b");
        touch(tmp.path(), "Res/a.txt", b"a");
        touch(tmp.path(), "Res/sub/c.txt", b"c");

        let files = enumerate_files(tmp.path(), &config("[Include]\nRes\n")).unwrap();
        assert_eq!(paths(&files), vec!["Res/a.txt", "Res/b.txt"]);
    }

    #[test]
    fn recursive_search_descends() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "Res/a.txt", b"a");
        touch(tmp.path(), "Res/sub/c.txt", b"c");

        let cfg = config("[Include]\nRes\n[Options]\nRecursiveDirectorySearch=true\n");
        let files = enumerate_files(tmp.path(), &cfg).unwrap();
        assert_eq!(paths(&files), vec!["Res/a.txt", "Res/sub/c.txt"]);
    }

    #[test]
    fn missing_include_fails_enumeration() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "a.txt", b"a");
        let err = enumerate_files(tmp.path(), &config("[Include]\na.txt\nghost.txt\n")).unwrap_err();
        assert!(
            matches!(err, GenerateError::MissingInclude { ref path } if path == "ghost.txt"),
            "got: {err}"
        );
    }

    #[test]
    fn exclusions_skip_files() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "Res/keep.txt", b"k");
        touch(tmp.path(), "Res/drop.txt", b"d");
        touch(tmp.path(), "Res/Debug/log.txt", b"l");

        let cfg = config(
            "[Include]\nRes\n[ExcludeFiles]\nRes/drop.txt\n[ExcludeDirectories]\nRes/Debug\n[Options]\nRecursiveDirectorySearch=true\n",
        );
        let files = enumerate_files(tmp.path(), &cfg).unwrap();
        assert_eq!(paths(&files), vec!["Res/keep.txt"]);
    }

    #[cfg(unix)]
    #[test]
    fn hidden_files_and_directories_are_skipped_when_enabled() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "Res/.hidden", b"h");
        touch(tmp.path(), "Res/shown.txt", b"s");
        touch(tmp.path(), ".cache/x.txt", b"x");

        let files = enumerate_files(tmp.path(), &config("[Include]\nRes\n.cache\n")).unwrap();
        assert_eq!(paths(&files), vec!["Res/shown.txt"]);

        let cfg = config("[Include]\nRes\n.cache\n[Options]\nExcludeHiddenAndSystemFiles=false\n");
        let files = enumerate_files(tmp.path(), &cfg).unwrap();
        assert_eq!(paths(&files), vec!["Res/.hidden", "Res/shown.txt", ".cache/x.txt"]);
    }

    #[test]
    fn base_directory_include_yields_plain_relative_paths() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "VersionConfig.ini", b"cfg");
        touch(tmp.path(), "version", b"[DTA]");
        touch(tmp.path(), "a.txt", b"a");
        touch(tmp.path(), "Res/b.txt", b"b");

        let cfg = config("[Include]\n.\n[ExcludeFiles]\nVersionConfig.ini\nversion\n");
        let files = enumerate_files(tmp.path(), &cfg).unwrap();
        assert_eq!(paths(&files), vec!["a.txt"]);

        let cfg = config(
            "[Include]\n.\n[ExcludeFiles]\nVersionConfig.ini\nversion\n[Options]\nRecursiveDirectorySearch=true\n",
        );
        let files = enumerate_files(tmp.path(), &cfg).unwrap();
        assert_eq!(paths(&files), vec!["Res/b.txt", "a.txt"]);
    }

    #[test]
    fn duplicates_keep_first_occurrence() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "Res/a.txt", b"a");
        touch(tmp.path(), "Res/b.txt", b"b");

        let files = enumerate_files(tmp.path(), &config("[Include]\nRes/b.txt\nRes\n")).unwrap();
        assert_eq!(paths(&files), vec!["Res/b.txt", "Res/a.txt"]);
    }

    #[test]
    fn entries_carry_fingerprint_and_truncated_size() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "k1023", &[1u8; 1023]);
        touch(tmp.path(), "k1024", &[1u8; 1024]);
        touch(tmp.path(), "k2047", &[1u8; 2047]);

        let files = enumerate_files(tmp.path(), &config("[Include]\nk1023\nk1024\nk2047\n")).unwrap();
        let sizes: Vec<u64> = files.iter().map(|f| f.size_kb).collect();
        assert_eq!(sizes, vec![0, 1, 1]);
        assert!(files.iter().all(|f| f.content_id.len() == 64));
        assert!(files.iter().all(|f| f.archive.is_none()));
    }

    #[test]
    fn archive_flag_follows_config() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "big.mix", b"m");
        let cfg = config(
            "[Include]\nbig.mix\n[ArchiveFiles]\nbig.mix\n[Options]\nEnableExtendedUpdaterFeatures=true\n",
        );
        let files = enumerate_files(tmp.path(), &cfg).unwrap();
        assert!(files[0].archived);
    }

    #[test]
    fn components_require_existing_files() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "a.txt", b"a");
        touch(tmp.path(), "INI/ra1.ini", b"ra1");

        let cfg = config("[Include]\na.txt\n[AddOns]\nRA1=INI/ra1.ini\n");
        let comps = enumerate_components(tmp.path(), &cfg).unwrap();
        assert_eq!(comps.len(), 1);
        assert_eq!(comps[0].id.0, "RA1");
        assert_eq!(comps[0].file.path, "INI/ra1.ini");

        let cfg = config("[Include]\na.txt\n[AddOns]\nTS=INI/ts.ini\n");
        let err = enumerate_components(tmp.path(), &cfg).unwrap_err();
        assert!(matches!(err, GenerateError::MissingComponent { .. }), "got: {err}");
    }
}
