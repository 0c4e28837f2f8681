//! Error types for verwriter-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while reading the config store or the
/// generation config built on top of it.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure, with the file that was being accessed.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// `VersionConfig.ini` did not exist at the expected path.
    #[error("config file not found at {path}")]
    ConfigNotFound { path: PathBuf },

    /// The `[Version]` section is missing or has no keys.
    #[error("config declares no version; add a key to the [Version] section")]
    MissingVersion,

    /// The `[Include]` section is missing or has no keys.
    #[error("config declares no include entries; add paths to the [Include] section")]
    MissingIncludes,
}

/// Convenience constructor for [`ConfigError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}
