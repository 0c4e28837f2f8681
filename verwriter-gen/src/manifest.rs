//! Version manifest — the file consumed by the updater client.
//!
//! ```text
//! [DTA]
//! Version=1.0.0
//! UpdaterVersion=5               (extended features only)
//! ManualDownloadURL=https://...  (extended features only)
//!
//! [FileVersions]
//! Resources/a.mix=<contentId>,<sizeKb>
//!
//! [ArchivedFiles]                (extended features + copy mode only)
//! Resources/a.mix=<archiveId>,<archiveSizeKb>   or   0
//!
//! [AddOns]
//! RA1=<contentId>,<sizeKb>
//! ```
//!
//! [`ManifestWriter`] loads the manifest it is about to overwrite and uses it
//! as the prior state for archive-metadata fallback.

use std::collections::{HashMap, HashSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::format::{Item, StrftimeItems};
use chrono::Local;

use verwriter_core::{
    ArchiveInfo, ArchiveRecord, ComponentEntry, ComponentId, FileEntry, FileStamp,
    GenerationConfig, IniStore,
};

use crate::diff::ChangeSet;
use crate::enumerate::Snapshot;
use crate::error::GenerateError;

/// Primary manifest, in the base directory.
pub const MANIFEST_FILE_NAME: &str = "version";
/// Full baseline manifest written in only-changed-files mode.
pub const BASELINE_FILE_NAME: &str = "version_base";

const DTA: &str = "DTA";
const FILE_VERSIONS: &str = "FileVersions";
const ARCHIVED_FILES: &str = "ArchivedFiles";
const ADD_ONS: &str = "AddOns";

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// In-memory manifest. Tables keep insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    pub version: String,
    pub updater_version: Option<String>,
    pub manual_download_url: Option<String>,
    pub files: Vec<(String, FileStamp)>,
    pub archives: Vec<(String, ArchiveRecord)>,
    pub components: Vec<(ComponentId, FileStamp)>,
}

impl Manifest {
    /// `<base_dir>/version` — pure, no I/O.
    pub fn primary_path(base_dir: &Path) -> PathBuf {
        base_dir.join(MANIFEST_FILE_NAME)
    }

    /// `<base_dir>/version_base` — pure, no I/O.
    pub fn baseline_path(base_dir: &Path) -> PathBuf {
        base_dir.join(BASELINE_FILE_NAME)
    }

    /// Load the manifest at `path`.
    ///
    /// Returns `None` when the file does not exist or cannot be read as a
    /// manifest; the latter is logged and treated as "no prior state".
    pub fn load(path: &Path) -> Option<Self> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => return None,
            Err(err) => {
                tracing::warn!("ignoring unreadable manifest {}: {err}", path.display());
                return None;
            }
        };
        let manifest = Self::from_store(&IniStore::parse(&text));
        if manifest.is_none() {
            tracing::warn!(
                "ignoring manifest {} without [{DTA}] Version",
                path.display()
            );
        }
        manifest
    }

    /// Map a parsed store onto a manifest. Requires `[DTA] Version`.
    pub fn from_store(store: &IniStore) -> Option<Self> {
        let version = store.get(DTA, "Version")?.to_owned();
        let non_empty = |key: &str| {
            store
                .get(DTA, key)
                .filter(|v| !v.is_empty())
                .map(str::to_owned)
        };

        let mut manifest = Self {
            version,
            updater_version: non_empty("UpdaterVersion"),
            manual_download_url: non_empty("ManualDownloadURL"),
            ..Self::default()
        };

        if let Some(section) = store.section(FILE_VERSIONS) {
            for (path, value) in section.entries() {
                match FileStamp::parse(value) {
                    Some(stamp) => manifest.files.push((path.to_owned(), stamp)),
                    None => tracing::warn!("skipping malformed [{FILE_VERSIONS}] entry: {path}"),
                }
            }
        }
        if let Some(section) = store.section(ARCHIVED_FILES) {
            for (path, value) in section.entries() {
                manifest
                    .archives
                    .push((path.to_owned(), ArchiveRecord::parse(value)));
            }
        }
        if let Some(section) = store.section(ADD_ONS) {
            for (id, value) in section.entries() {
                match FileStamp::parse(value) {
                    Some(stamp) => manifest.components.push((ComponentId::from(id), stamp)),
                    None => tracing::warn!("skipping malformed [{ADD_ONS}] entry: {id}"),
                }
            }
        }
        Some(manifest)
    }

    pub fn to_store(&self) -> IniStore {
        let mut store = IniStore::new();
        store.set(DTA, "Version", &self.version);
        if let Some(v) = &self.updater_version {
            store.set(DTA, "UpdaterVersion", v);
        }
        if let Some(v) = &self.manual_download_url {
            store.set(DTA, "ManualDownloadURL", v);
        }

        store.add_section(FILE_VERSIONS);
        for (path, stamp) in &self.files {
            store.set(FILE_VERSIONS, path, stamp.to_string());
        }
        for (path, record) in &self.archives {
            store.set(ARCHIVED_FILES, path, record.to_string());
        }
        store.add_section(ADD_ONS);
        for (id, stamp) in &self.components {
            store.set(ADD_ONS, &id.0, stamp.to_string());
        }
        store
    }

    pub fn render(&self) -> String {
        self.to_store().to_string()
    }

    /// Replace the file at `path` with this manifest.
    pub fn save(&self, path: &Path) -> Result<(), GenerateError> {
        let write_err = |source| GenerateError::ManifestWrite {
            path: path.to_path_buf(),
            source,
        };
        match std::fs::remove_file(path) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(write_err(err)),
        }
        std::fs::write(path, self.render()).map_err(write_err)?;
        tracing::info!("wrote manifest: {}", path.display());
        Ok(())
    }

    pub fn file(&self, path: &str) -> Option<&FileStamp> {
        self.files.iter().find(|(p, _)| p == path).map(|(_, s)| s)
    }

    pub fn archive(&self, path: &str) -> Option<&ArchiveRecord> {
        self.archives.iter().find(|(p, _)| p == path).map(|(_, r)| r)
    }

    pub fn component(&self, id: &ComponentId) -> Option<&FileStamp> {
        self.components.iter().find(|(c, _)| c == id).map(|(_, s)| s)
    }

    fn archive_index(&self) -> HashMap<&str, &ArchiveRecord> {
        self.archives.iter().map(|(p, r)| (p.as_str(), r)).collect()
    }

    /// File table as entries, for diffing. The archive flag comes from the
    /// current config; archive metadata from `[ArchivedFiles]`.
    pub fn file_entries(&self, config: &GenerationConfig) -> Vec<FileEntry> {
        let archives = self.archive_index();
        self.files
            .iter()
            .map(|(path, stamp)| FileEntry {
                path: path.clone(),
                content_id: stamp.content_id.clone(),
                size_kb: stamp.size_kb,
                archived: config.is_archived(path),
                archive: archives
                    .get(path.as_str())
                    .and_then(|r| r.info())
                    .cloned(),
            })
            .collect()
    }

    /// Component table as entries. The manifest does not record component
    /// paths, so `file.path` is empty and the archive lookup keyed by it finds
    /// nothing.
    pub fn component_entries(&self, config: &GenerationConfig) -> Vec<ComponentEntry> {
        let archives = self.archive_index();
        self.components
            .iter()
            .map(|(id, stamp)| {
                let path = String::new();
                let archive = archives.get(path.as_str()).and_then(|r| r.info()).cloned();
                ComponentEntry {
                    id: id.clone(),
                    file: FileEntry {
                        archived: config.is_archived(&path),
                        path,
                        content_id: stamp.content_id.clone(),
                        size_kb: stamp.size_kb,
                        archive,
                    },
                }
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

/// Prefer fresh archive metadata, then the overwritten manifest's, then the
/// `"0"` sentinel.
pub fn reconcile_archive(fresh: Option<&ArchiveInfo>, prior: Option<&ArchiveInfo>) -> ArchiveRecord {
    match (fresh, prior) {
        (Some(info), _) if info.is_complete() => ArchiveRecord::Known(info.clone()),
        (_, Some(info)) if info.is_complete() => ArchiveRecord::Known(info.clone()),
        _ => ArchiveRecord::Absent,
    }
}

/// Builds and saves manifests for one run.
#[derive(Debug)]
pub struct ManifestWriter<'a> {
    config: &'a GenerationConfig,
    version: String,
}

impl<'a> ManifestWriter<'a> {
    /// Resolves the version string once, so the primary and baseline
    /// manifests of a run agree.
    pub fn new(config: &'a GenerationConfig) -> Result<Self, GenerateError> {
        let version = resolve_version(config)?;
        Ok(Self { config, version })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Build a manifest for `files` and `components`, with `prior` as the
    /// fallback source for archive metadata.
    pub fn build(
        &self,
        files: &[FileEntry],
        components: &[ComponentEntry],
        prior: Option<&Manifest>,
    ) -> Manifest {
        let opts = &self.config.options;
        let mut manifest = Manifest {
            version: self.version.clone(),
            ..Manifest::default()
        };

        if opts.extended_updater_features {
            manifest.updater_version = self.config.updater_version.clone().filter(|v| !v.is_empty());
            manifest.manual_download_url = self
                .config
                .manual_download_url
                .clone()
                .filter(|v| !v.is_empty());
        }

        manifest.files = files.iter().map(|f| (f.path.clone(), f.stamp())).collect();
        manifest.components = components
            .iter()
            .map(|c| (c.id.clone(), c.file.stamp()))
            .collect();

        if opts.archive_enabled() {
            for file in files.iter().filter(|f| f.archived) {
                let prior_info = prior
                    .and_then(|m| m.archive(&file.path))
                    .and_then(ArchiveRecord::info);
                manifest.archives.push((
                    file.path.clone(),
                    reconcile_archive(file.archive.as_ref(), prior_info),
                ));
            }

            let prior_components = prior
                .map(|m| m.component_entries(self.config))
                .unwrap_or_default();
            for component in components.iter().filter(|c| c.file.archived) {
                let prior_info = prior_components
                    .iter()
                    .find(|p| p.id == component.id)
                    .and_then(|p| p.file.archive.as_ref());
                manifest.archives.push((
                    component.file.path.clone(),
                    reconcile_archive(component.file.archive.as_ref(), prior_info),
                ));
            }
        }

        manifest
    }

    /// Load the manifest at `path` as prior state, build, and overwrite it.
    pub fn write(
        &self,
        path: &Path,
        files: &[FileEntry],
        components: &[ComponentEntry],
    ) -> Result<Manifest, GenerateError> {
        let prior = Manifest::load(path);
        let manifest = self.build(files, components, prior.as_ref());
        manifest.save(path)?;
        Ok(manifest)
    }

    /// Write the primary manifest (and the baseline in only-changed mode).
    ///
    /// Entries in `changes` carry fresh archive metadata and take precedence
    /// over the same paths in `snapshot`.
    pub fn write_all(
        &self,
        base_dir: &Path,
        snapshot: &Snapshot,
        changes: &ChangeSet,
    ) -> Result<Vec<PathBuf>, GenerateError> {
        let files = overlay_files(&snapshot.files, &changes.files);
        let components = overlay_components(&snapshot.components, &changes.components);
        let primary = Manifest::primary_path(base_dir);

        if !self.config.options.include_only_changed_files {
            self.write(&primary, &files, &components)?;
            return Ok(vec![primary]);
        }

        let prior = Manifest::load(&primary);
        let changed: HashSet<&str> = changes.files.iter().map(|f| f.path.as_str()).collect();
        let selected: Vec<FileEntry> = files
            .iter()
            .filter(|f| {
                changed.contains(f.path.as_str())
                    || prior.as_ref().is_some_and(|m| m.file(&f.path).is_some())
            })
            .cloned()
            .collect();
        let manifest = self.build(&selected, &components, prior.as_ref());
        manifest.save(&primary)?;

        let baseline = Manifest::baseline_path(base_dir);
        self.write(&baseline, &files, &components)?;
        Ok(vec![primary, baseline])
    }
}

fn overlay_files(all: &[FileEntry], changed: &[FileEntry]) -> Vec<FileEntry> {
    let by_path: HashMap<&str, &FileEntry> =
        changed.iter().map(|f| (f.path.as_str(), f)).collect();
    all.iter()
        .map(|f| (*by_path.get(f.path.as_str()).unwrap_or(&f)).clone())
        .collect()
}

fn overlay_components(all: &[ComponentEntry], changed: &[ComponentEntry]) -> Vec<ComponentEntry> {
    let by_id: HashMap<&ComponentId, &ComponentEntry> =
        changed.iter().map(|c| (&c.id, c)).collect();
    all.iter()
        .map(|c| (*by_id.get(&c.id).unwrap_or(&c)).clone())
        .collect()
}

/// The literal version, or the version used as a `strftime` pattern against
/// the local time when `ApplyTimestampOnVersion` is set.
pub fn resolve_version(config: &GenerationConfig) -> Result<String, GenerateError> {
    if !config.options.apply_timestamp_on_version {
        return Ok(config.version.clone());
    }
    let items: Vec<Item<'_>> = StrftimeItems::new(&config.version).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return Err(GenerateError::InvalidTimestampPattern(config.version.clone()));
    }
    Ok(Local::now().format_with_items(items.into_iter()).to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
