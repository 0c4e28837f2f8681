//! verwriter core library — domain types, the INI config store, and the
//! typed generation config.
//!
//! Public API surface:
//! - [`types`] — file/component entries and manifest table values
//! - [`ini`] — ordered key/value store used for both config and manifest files
//! - [`config`] — [`GenerationConfig`], read from `VersionConfig.ini`
//! - [`error`] — [`ConfigError`]

pub mod config;
pub mod error;
pub mod ini;
pub mod types;

pub use config::{ComponentSpec, GenerationConfig, Options, CONFIG_FILE_NAME};
pub use error::ConfigError;
pub use ini::IniStore;
pub use types::{
    normalize_path, ArchiveInfo, ArchiveRecord, ComponentEntry, ComponentId, FileEntry, FileStamp,
};
