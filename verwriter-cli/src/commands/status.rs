//! `verwriter status` — what the next `generate` would pick up.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use verwriter_gen::{diff_reference, ChangeSet, GenerateRequest, Generator};

/// Arguments for `verwriter status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Directory holding VersionConfig.ini (defaults to the current directory).
    #[arg(default_value = ".")]
    pub base_dir: PathBuf,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let mut generator = Generator::new(GenerateRequest::new(&self.base_dir));
        let changes = generator
            .plan()
            .with_context(|| format!("status failed in '{}'", self.base_dir.display()))?;
        let config = generator
            .config()
            .context("configuration was not loaded")?;
        let tracked = generator.snapshot().map(|s| s.files.len()).unwrap_or(0);
        let reference = diff_reference(&self.base_dir, config);

        let report = StatusReport {
            version: config.version.clone(),
            reference: reference.clone(),
            reference_modified: modified_at(&reference),
            tracked_files: tracked,
            changes,
        };

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize status JSON")?
            );
            return Ok(());
        }
        print_table(&report);
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct StatusReport {
    version: String,
    reference: PathBuf,
    reference_modified: Option<DateTime<Local>>,
    tracked_files: usize,
    changes: ChangeSet,
}

#[derive(Tabled)]
struct ChangeRow {
    #[tabled(rename = "kind")]
    kind: &'static str,
    #[tabled(rename = "path")]
    path: String,
    #[tabled(rename = "size (KB)")]
    size_kb: u64,
    #[tabled(rename = "archived")]
    archived: &'static str,
}

fn modified_at(path: &Path) -> Option<DateTime<Local>> {
    let modified = std::fs::metadata(path).and_then(|m| m.modified()).ok()?;
    Some(DateTime::<Local>::from(modified))
}

fn print_table(report: &StatusReport) {
    println!(
        "verwriter v{} | version {} | {} tracked file(s)",
        env!("CARGO_PKG_VERSION"),
        report.version,
        report.tracked_files,
    );
    match report.reference_modified {
        Some(at) => println!(
            "Compared against {} ({})",
            report.reference.display(),
            at.format("%Y-%m-%d %H:%M:%S")
        ),
        None => println!(
            "{} no previous manifest at {}; everything counts as changed",
            "!".yellow().bold(),
            report.reference.display()
        ),
    }

    if report.changes.is_empty() {
        println!("{} up to date", "■".green().bold());
        return;
    }

    let yes_no = |b: bool| if b { "yes" } else { "" };
    let rows: Vec<ChangeRow> = report
        .changes
        .files
        .iter()
        .map(|f| ChangeRow {
            kind: "file",
            path: f.path.clone(),
            size_kb: f.size_kb,
            archived: yes_no(f.archived),
        })
        .chain(report.changes.components.iter().map(|c| ChangeRow {
            kind: "add-on",
            path: format!("{} ({})", c.id, c.file.path),
            size_kb: c.file.size_kb,
            archived: yes_no(c.file.archived),
        }))
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    println!("Run 'verwriter generate' to copy these and write a new manifest.");
}
