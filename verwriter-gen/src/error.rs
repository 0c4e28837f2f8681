//! Error types for verwriter-gen.

use std::path::PathBuf;

use thiserror::Error;

use verwriter_core::ConfigError;

use crate::pipeline::GenerationState;

/// All errors that can arise from a generation run.
///
/// Validation failures (`Config`, `MissingInclude`, `MissingComponent`,
/// `InvalidTimestampPattern`) happen before any file is touched. The rest are
/// operational and may leave already-copied files behind.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// `VersionConfig.ini` is missing or incomplete.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// An `[Include]` entry names neither a file nor a directory.
    #[error("include entry '{path}' does not exist")]
    MissingInclude { path: String },

    /// An `[AddOns]` entry points at a file that does not exist.
    #[error("add-on '{id}' points to missing file '{path}'")]
    MissingComponent { id: String, path: String },

    /// `ApplyTimestampOnVersion` is set but the version is not a valid pattern.
    #[error("invalid timestamp pattern in version '{0}'")]
    InvalidTimestampPattern(String),

    /// An I/O error while reading source files, with annotated path.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Copying or compressing a changed file failed.
    #[error("file operation failed on {path}: {source}")]
    FileOperation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The destination directory could not be removed within the retry budget.
    #[error("could not remove {path} after {attempts} attempt(s): {source}")]
    CleanupFailed {
        path: PathBuf,
        attempts: u32,
        #[source]
        source: std::io::Error,
    },

    /// Overwriting the destination directory was declined.
    #[error("overwrite of {path} was declined")]
    Aborted { path: PathBuf },

    /// Saving a manifest failed.
    #[error("failed to save manifest {path}: {source}")]
    ManifestWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A step was requested after the run already finished.
    #[error("generation already finished ({0})")]
    Finished(GenerationState),
}

/// Convenience constructor for [`GenerateError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> GenerateError {
    GenerateError::Io {
        path: path.into(),
        source,
    }
}

/// Convenience constructor for [`GenerateError::FileOperation`].
pub(crate) fn file_op_err(path: impl Into<PathBuf>, source: std::io::Error) -> GenerateError {
    GenerateError::FileOperation {
        path: path.into(),
        source,
    }
}
