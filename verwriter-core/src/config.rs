//! Typed view of `VersionConfig.ini`.
//!
//! # Sections
//!
//! ```text
//! [Version]              first key name is the version string
//! [Options]              boolean flags, see [`Options`]
//! [Include]              key names are files or directories
//! [ExcludeFiles]         key names are exact relative paths
//! [ExcludeDirectories]   key names are path prefixes
//! [ArchiveFiles]         key names are paths to compress
//! [UpdaterVersion]       first key name (extended features only)
//! [ManualDownloadURL]    first key name (extended features only)
//! [AddOns]               component id = relative file path
//! ```

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::ConfigError;
use crate::ini::IniStore;
use crate::types::{normalize_path, ComponentId};

/// File name of the generation config inside the base directory.
pub const CONFIG_FILE_NAME: &str = "VersionConfig.ini";

const OPTIONS: &str = "Options";

/// `[Options]` flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Options {
    pub extended_updater_features: bool,
    pub recursive_directory_search: bool,
    pub include_only_changed_files: bool,
    pub exclude_hidden_and_system_files: bool,
    pub no_copy_mode: bool,
    pub apply_timestamp_on_version: bool,
    /// Only ever true when copying is on and extended features are enabled.
    pub copy_archived_original_files: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            extended_updater_features: false,
            recursive_directory_search: false,
            include_only_changed_files: false,
            exclude_hidden_and_system_files: true,
            no_copy_mode: false,
            apply_timestamp_on_version: false,
            copy_archived_original_files: false,
        }
    }
}

impl Options {
    fn from_store(store: &IniStore) -> Self {
        let d = Self::default();
        let mut opts = Self {
            extended_updater_features: store.get_bool(
                OPTIONS,
                "EnableExtendedUpdaterFeatures",
                d.extended_updater_features,
            ),
            recursive_directory_search: store.get_bool(
                OPTIONS,
                "RecursiveDirectorySearch",
                d.recursive_directory_search,
            ),
            include_only_changed_files: store.get_bool(
                OPTIONS,
                "IncludeOnlyChangedFiles",
                d.include_only_changed_files,
            ),
            exclude_hidden_and_system_files: store.get_bool(
                OPTIONS,
                "ExcludeHiddenAndSystemFiles",
                d.exclude_hidden_and_system_files,
            ),
            no_copy_mode: store.get_bool(OPTIONS, "NoCopyMode", d.no_copy_mode),
            apply_timestamp_on_version: store.get_bool(
                OPTIONS,
                "ApplyTimestampOnVersion",
                d.apply_timestamp_on_version,
            ),
            copy_archived_original_files: false,
        };
        if opts.archive_enabled() {
            opts.copy_archived_original_files =
                store.get_bool(OPTIONS, "CopyArchivedOriginalFiles", false);
        }
        opts
    }

    /// Archive side-artifacts are produced and tracked only when extended
    /// features are on and files are actually copied.
    pub fn archive_enabled(&self) -> bool {
        self.extended_updater_features && !self.no_copy_mode
    }
}

/// An `[AddOns]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentSpec {
    pub id: ComponentId,
    pub path: String,
}

/// The generation request, read from `VersionConfig.ini`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationConfig {
    pub version: String,
    pub options: Options,
    pub includes: Vec<String>,
    pub exclude_files: BTreeSet<String>,
    pub exclude_directories: Vec<String>,
    pub archive_files: BTreeSet<String>,
    pub components: Vec<ComponentSpec>,
    pub updater_version: Option<String>,
    pub manual_download_url: Option<String>,
}

impl GenerationConfig {
    /// `<base_dir>/VersionConfig.ini` — pure, no I/O.
    pub fn path_in(base_dir: &Path) -> PathBuf {
        base_dir.join(CONFIG_FILE_NAME)
    }

    /// Load and validate the config in `base_dir`.
    ///
    /// Returns [`ConfigError::ConfigNotFound`] if the file is absent.
    pub fn load(base_dir: &Path) -> Result<Self, ConfigError> {
        let path = Self::path_in(base_dir);
        if !path.is_file() {
            return Err(ConfigError::ConfigNotFound { path });
        }
        let store = IniStore::load(&path)?;
        Self::from_store(&store)
    }

    /// Map a parsed store onto the typed config.
    pub fn from_store(store: &IniStore) -> Result<Self, ConfigError> {
        let version = store
            .first_key("Version")
            .map(str::to_owned)
            .ok_or(ConfigError::MissingVersion)?;

        let includes = include_list(store);
        if includes.is_empty() {
            return Err(ConfigError::MissingIncludes);
        }

        let options = Options::from_store(store);

        let (updater_version, manual_download_url) = if options.extended_updater_features {
            (
                extended_value(store, "UpdaterVersion"),
                extended_value(store, "ManualDownloadURL"),
            )
        } else {
            (None, None)
        };

        let components = store
            .section("AddOns")
            .map(|s| {
                s.entries()
                    .map(|(id, path)| ComponentSpec {
                        id: ComponentId::from(id),
                        path: normalize_path(path),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            version,
            options,
            includes,
            exclude_files: path_list(store, "ExcludeFiles").into_iter().collect(),
            exclude_directories: path_list(store, "ExcludeDirectories"),
            archive_files: path_list(store, "ArchiveFiles").into_iter().collect(),
            components,
            updater_version,
            manual_download_url,
        })
    }

    /// Whether `path` is flagged for compression in this run.
    pub fn is_archived(&self, path: &str) -> bool {
        self.options.archive_enabled() && self.archive_files.contains(path)
    }
}

fn path_list(store: &IniStore, section: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for key in store.keys(section) {
        let path = normalize_path(key);
        if !path.is_empty() && !out.contains(&path) {
            out.push(path);
        }
    }
    out
}

/// Like [`path_list`], but keeps `""` for an entry naming the base directory.
fn include_list(store: &IniStore) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for key in store.keys("Include") {
        let path = normalize_path(key);
        if !out.contains(&path) {
            out.push(path);
        }
    }
    out
}

fn extended_value(store: &IniStore, section: &str) -> Option<String> {
    let value = store.first_key(section).map(str::to_owned);
    if value.is_none() {
        tracing::warn!("extended updater features enabled but [{section}] is not set");
    }
    value
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
