//! Generation orchestrator shared by every CLI command.
//!
//! ```text
//! Unconfigured --configure--> Configured --prepare--> Ready --generate--> Generated
//!        \                        \                      \
//!         `-----------------------`----------------------`--> Failed
//! ```
//!
//! The no-change path still ends in `Generated`, but copies and writes
//! nothing. Any error moves the generator to `Failed` for good.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use verwriter_core::GenerationConfig;

use crate::copy::{self, CopyResult, Prompter, DEFAULT_COPY_DIR};
use crate::diff::{self, ChangeSet};
use crate::enumerate::{self, Snapshot};
use crate::error::GenerateError;
use crate::manifest::{Manifest, ManifestWriter};
use crate::retry::RetryPolicy;

/// Where a [`Generator`] is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GenerationState {
    Unconfigured,
    Configured,
    Ready,
    Generated,
    Failed,
}

impl fmt::Display for GenerationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GenerationState::Unconfigured => "unconfigured",
            GenerationState::Configured => "configured",
            GenerationState::Ready => "ready",
            GenerationState::Generated => "generated",
            GenerationState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Inputs from the process boundary.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub base_dir: PathBuf,
    /// Destination subdirectory under `base_dir`.
    pub copy_dir: String,
    pub retry: RetryPolicy,
}

impl GenerateRequest {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            copy_dir: DEFAULT_COPY_DIR.to_owned(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn dest_dir(&self) -> PathBuf {
        self.base_dir.join(&self.copy_dir)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Nothing changed; no files were copied or written.
    NoChanges,
    Generated,
}

/// Summary of a finished run.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateReport {
    pub version: String,
    pub outcome: Outcome,
    pub changed_files: Vec<String>,
    pub changed_components: Vec<String>,
    pub copied: Vec<CopyResult>,
    pub manifests_written: Vec<PathBuf>,
    pub generated_at: DateTime<Utc>,
}

impl GenerateReport {
    fn new(version: String, changes: &ChangeSet) -> Self {
        Self {
            version,
            outcome: Outcome::NoChanges,
            changed_files: changes.files.iter().map(|f| f.path.clone()).collect(),
            changed_components: changes.components.iter().map(|c| c.id.0.clone()).collect(),
            copied: Vec::new(),
            manifests_written: Vec::new(),
            generated_at: Utc::now(),
        }
    }
}

/// Drives one generation run through its states.
#[derive(Debug)]
pub struct Generator {
    request: GenerateRequest,
    state: GenerationState,
    config: Option<GenerationConfig>,
    snapshot: Option<Snapshot>,
}

impl Generator {
    pub fn new(request: GenerateRequest) -> Self {
        Self {
            request,
            state: GenerationState::Unconfigured,
            config: None,
            snapshot: None,
        }
    }

    pub fn state(&self) -> GenerationState {
        self.state
    }

    pub fn config(&self) -> Option<&GenerationConfig> {
        self.config.as_ref()
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    /// `Unconfigured -> Configured`: load and validate `VersionConfig.ini`.
    pub fn configure(&mut self) -> Result<(), GenerateError> {
        self.ensure_running()?;
        if self.config.is_some() {
            return Ok(());
        }
        let config = GenerationConfig::load(&self.request.base_dir);
        let config = self.track(config.map_err(GenerateError::from))?;
        tracing::debug!("loaded config for version {}", config.version);
        self.config = Some(config);
        self.state = GenerationState::Configured;
        Ok(())
    }

    /// `Configured -> Ready`: enumerate and fingerprint files and components.
    pub fn prepare(&mut self) -> Result<(), GenerateError> {
        self.configure()?;
        if self.snapshot.is_some() {
            return Ok(());
        }
        let Some(config) = self.config.as_ref() else {
            return Ok(());
        };
        let snapshot = enumerate::snapshot(&self.request.base_dir, config);
        let snapshot = self.track(snapshot)?;
        self.snapshot = Some(snapshot);
        self.state = GenerationState::Ready;
        Ok(())
    }

    /// Diff against the previous manifest without touching the filesystem.
    pub fn plan(&mut self) -> Result<ChangeSet, GenerateError> {
        self.prepare()?;
        let (Some(config), Some(snapshot)) = (self.config.as_ref(), self.snapshot.as_ref()) else {
            return Ok(ChangeSet::default());
        };
        let reference = diff_reference(&self.request.base_dir, config);
        let previous = Manifest::load(&reference);
        if previous.is_none() {
            tracing::warn!(
                "no previous manifest at {}; every file counts as changed",
                reference.display()
            );
        }
        Ok(diff::compute(snapshot, previous.as_ref(), config))
    }

    /// `Ready -> Generated`: diff, copy/archive, write manifests.
    pub fn generate(&mut self, prompter: &dyn Prompter) -> Result<GenerateReport, GenerateError> {
        let changes = self.plan()?;
        let result = self.execute(changes, prompter);
        let report = self.track(result)?;
        self.state = GenerationState::Generated;
        Ok(report)
    }

    /// Run every step in order.
    pub fn run(mut self, prompter: &dyn Prompter) -> Result<GenerateReport, GenerateError> {
        self.generate(prompter)
    }

    fn execute(
        &self,
        mut changes: ChangeSet,
        prompter: &dyn Prompter,
    ) -> Result<GenerateReport, GenerateError> {
        let (Some(config), Some(snapshot)) = (self.config.as_ref(), self.snapshot.as_ref()) else {
            return Err(GenerateError::Finished(self.state));
        };
        let base_dir = &self.request.base_dir;

        // Validates the timestamp pattern before anything is copied.
        let writer = ManifestWriter::new(config)?;

        if changes.is_empty() {
            tracing::info!("no updates: every file and add-on matches the previous manifest");
            return Ok(GenerateReport::new(writer.version().to_owned(), &changes));
        }
        let copy_mode = !config.options.no_copy_mode;
        let dest = self.request.dest_dir();

        let mut copied = Vec::new();
        if copy_mode {
            copy::prepare_destination(&dest, prompter, &self.request.retry)?;
            copied = copy::copy_changes(
                base_dir,
                &dest,
                &mut changes,
                config.options.copy_archived_original_files,
            )?;
        }

        let manifests_written = writer.write_all(base_dir, snapshot, &changes)?;
        if copy_mode {
            copy::mirror_manifest(&Manifest::primary_path(base_dir), &dest)?;
        }

        let mut report = GenerateReport::new(writer.version().to_owned(), &changes);
        report.outcome = Outcome::Generated;
        report.copied = copied;
        report.manifests_written = manifests_written;
        tracing::info!(
            "generated version {}: {} file(s), {} add-on(s) changed",
            report.version,
            report.changed_files.len(),
            report.changed_components.len()
        );
        Ok(report)
    }

    fn ensure_running(&self) -> Result<(), GenerateError> {
        match self.state {
            GenerationState::Generated | GenerationState::Failed => {
                Err(GenerateError::Finished(self.state))
            }
            _ => Ok(()),
        }
    }

    fn track<T>(&mut self, result: Result<T, GenerateError>) -> Result<T, GenerateError> {
        if result.is_err() {
            self.state = GenerationState::Failed;
        }
        result
    }
}

/// The manifest the diff runs against: the baseline in only-changed mode when
/// it exists, the primary manifest otherwise.
pub fn diff_reference(base_dir: &Path, config: &GenerationConfig) -> PathBuf {
    let baseline = Manifest::baseline_path(base_dir);
    if config.options.include_only_changed_files && baseline.is_file() {
        baseline
    } else {
        Manifest::primary_path(base_dir)
    }
}

/// Load, enumerate and generate for `base_dir` in one call.
pub fn run(base_dir: &Path, prompter: &dyn Prompter) -> Result<GenerateReport, GenerateError> {
    Generator::new(GenerateRequest::new(base_dir)).run(prompter)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use crate::copy::AutoConfirm;

    use super::*;

    fn base_with(config: &str, files: &[(&str, &str)]) -> TempDir {
        let base = TempDir::new().expect("base");
        fs::write(base.path().join("VersionConfig.ini"), config).expect("config");
        for (rel, body) in files {
            let path = base.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, body).unwrap();
        }
        base
    }

    #[test]
    fn missing_config_fails_from_unconfigured() {
        let base = TempDir::new().expect("base");
        let mut generator = Generator::new(GenerateRequest::new(base.path()));
        assert_eq!(generator.state(), GenerationState::Unconfigured);
        let err = generator.configure().unwrap_err();
        assert!(matches!(err, GenerateError::Config(_)), "got: {err}");
        assert_eq!(generator.state(), GenerationState::Failed);
        assert!(matches!(generator.prepare(), Err(GenerateError::Finished(GenerationState::Failed))));
    }

    #[test]
    fn states_advance_through_a_run() {
        let base = base_with("[Version]\n1.0.0\n[Include]\na.txt\n", &[("a.txt", "a")]);
        let mut generator = Generator::new(GenerateRequest::new(base.path()));
        generator.configure().unwrap();
        assert_eq!(generator.state(), GenerationState::Configured);
        generator.prepare().unwrap();
        assert_eq!(generator.state(), GenerationState::Ready);
        assert_eq!(generator.snapshot().unwrap().files.len(), 1);
        let report = generator.generate(&AutoConfirm).unwrap();
        assert_eq!(generator.state(), GenerationState::Generated);
        assert_eq!(report.outcome, Outcome::Generated);
        assert!(generator.generate(&AutoConfirm).is_err());
    }

    #[test]
    fn missing_include_fails_before_any_side_effect() {
        let base = base_with("[Version]\n1.0.0\n[Include]\na.txt\nghost\n", &[("a.txt", "a")]);
        let mut generator = Generator::new(GenerateRequest::new(base.path()));
        let err = generator.generate(&AutoConfirm).unwrap_err();
        assert!(matches!(err, GenerateError::MissingInclude { .. }), "got: {err}");
        assert_eq!(generator.state(), GenerationState::Failed);
        assert!(!Manifest::primary_path(base.path()).exists());
        assert!(!base.path().join(DEFAULT_COPY_DIR).exists());
    }

    #[test]
    fn invalid_timestamp_pattern_fails_before_copy() {
        let base = base_with(
            "[Version]\nv%\n[Include]\na.txt\n[Options]\nApplyTimestampOnVersion=true\n",
            &[("a.txt", "a")],
        );
        let err = run(base.path(), &AutoConfirm).unwrap_err();
        assert!(matches!(err, GenerateError::InvalidTimestampPattern(_)), "got: {err}");
        assert!(!base.path().join(DEFAULT_COPY_DIR).exists());
    }

    #[test]
    fn no_copy_mode_writes_manifest_only() {
        let base = base_with(
            "[Version]\n1.0.0\n[Include]\na.txt\n[Options]\nNoCopyMode=true\n",
            &[("a.txt", "a")],
        );
        let report = run(base.path(), &AutoConfirm).unwrap();
        assert!(report.copied.is_empty());
        assert!(Manifest::primary_path(base.path()).is_file());
        assert!(!base.path().join(DEFAULT_COPY_DIR).exists());
    }

    #[test]
    fn no_change_report_carries_rendered_version() {
        let base = base_with(
            "[Version]\nbuild-%Y\n[Include]\na.txt\n[Options]\nApplyTimestampOnVersion=true\nNoCopyMode=true\n",
            &[("a.txt", "a")],
        );
        let first = run(base.path(), &AutoConfirm).unwrap();
        let second = run(base.path(), &AutoConfirm).unwrap();
        assert_eq!(second.outcome, Outcome::NoChanges);
        assert_ne!(second.version, "build-%Y");
        assert!(second.version.starts_with("build-"));
        assert!(second.version["build-".len()..].chars().all(|c| c.is_ascii_digit()));
        assert_eq!(first.version.len(), second.version.len());
    }

    #[test]
    fn manifest_write_failure_fails_the_run() {
        let base = base_with("[Version]\n1.0.0\n[Include]\na.txt\n", &[("a.txt", "a")]);
        // A directory where the manifest file belongs cannot be replaced.
        fs::create_dir_all(Manifest::primary_path(base.path()).join("blocker")).unwrap();

        let mut generator = Generator::new(GenerateRequest::new(base.path()));
        let err = generator.generate(&AutoConfirm).unwrap_err();
        assert!(matches!(err, GenerateError::ManifestWrite { .. }), "got: {err}");
        assert_eq!(generator.state(), GenerationState::Failed);
        assert!(Manifest::primary_path(base.path()).is_dir());
    }

    #[test]
    fn diff_reference_prefers_existing_baseline_in_only_changed_mode() {
        let base = base_with(
            "[Version]\n1\n[Include]\na.txt\n[Options]\nIncludeOnlyChangedFiles=true\n",
            &[("a.txt", "a")],
        );
        let cfg = GenerationConfig::load(base.path()).unwrap();
        assert_eq!(diff_reference(base.path(), &cfg), Manifest::primary_path(base.path()));
        fs::write(Manifest::baseline_path(base.path()), "[DTA]\nVersion=1\n").unwrap();
        assert_eq!(diff_reference(base.path(), &cfg), Manifest::baseline_path(base.path()));
    }
}
