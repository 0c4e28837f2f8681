//! # verwriter-gen
//!
//! Fingerprinting, change detection and manifest generation.
//!
//! Call [`run`] to generate for a base directory in one step, or drive a
//! [`Generator`] through its states when a command needs to stop early (the
//! `status` command only goes as far as [`Generator::plan`]).

pub mod archiver;
pub mod copy;
pub mod diff;
pub mod enumerate;
pub mod error;
pub mod fingerprint;
pub mod manifest;
pub mod pipeline;
pub mod retry;

pub use copy::{AutoConfirm, CopyResult, Prompter, DEFAULT_COPY_DIR};
pub use diff::ChangeSet;
pub use enumerate::Snapshot;
pub use error::GenerateError;
pub use manifest::{Manifest, ManifestWriter, BASELINE_FILE_NAME, MANIFEST_FILE_NAME};
pub use pipeline::{
    diff_reference, run, GenerateReport, GenerateRequest, GenerationState, Generator, Outcome,
};
pub use retry::RetryPolicy;
