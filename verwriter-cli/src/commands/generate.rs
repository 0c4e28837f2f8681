//! `verwriter generate` — diff, copy changed files, write manifests.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use verwriter_gen::{
    AutoConfirm, CopyResult, GenerateReport, GenerateRequest, Generator, Outcome, Prompter,
    DEFAULT_COPY_DIR,
};

/// Arguments for `verwriter generate`.
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Directory holding VersionConfig.ini (defaults to the current directory).
    #[arg(default_value = ".")]
    pub base_dir: PathBuf,

    /// Answer yes to every prompt.
    #[arg(long, short = 'y')]
    pub yes: bool,

    /// Emit the run report as JSON.
    #[arg(long)]
    pub json: bool,

    /// Destination subdirectory for copied files.
    #[arg(long, value_name = "NAME", default_value = DEFAULT_COPY_DIR)]
    pub copy_dir: String,
}

impl GenerateArgs {
    pub fn run(self) -> Result<()> {
        let mut request = GenerateRequest::new(&self.base_dir);
        request.copy_dir = self.copy_dir.clone();

        let prompter: Box<dyn Prompter> = if self.yes {
            Box::new(AutoConfirm)
        } else {
            Box::new(ConsolePrompter)
        };

        let report = Generator::new(request)
            .run(prompter.as_ref())
            .with_context(|| format!("generation failed in '{}'", self.base_dir.display()))?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize report JSON")?
            );
            return Ok(());
        }
        print_report(&report, &self.base_dir);
        Ok(())
    }
}

fn print_report(report: &GenerateReport, base_dir: &Path) {
    if report.outcome == Outcome::NoChanges {
        println!("{} no updates since the last manifest", "✓".green().bold());
        return;
    }

    println!(
        "{} version {} generated ({} file(s), {} add-on(s) changed)",
        "✓".green().bold(),
        report.version.bold(),
        report.changed_files.len(),
        report.changed_components.len()
    );
    for result in &report.copied {
        let shown = result
            .path()
            .strip_prefix(base_dir)
            .unwrap_or(result.path())
            .display()
            .to_string();
        match result {
            CopyResult::Copied { .. } => println!("  ✎  {shown}"),
            CopyResult::Archived { archive, .. } => {
                println!("  ▣  {shown} {}", format!("({} KB)", archive.size_kb).bright_black())
            }
        }
    }
    for path in &report.manifests_written {
        println!("  ·  {}", path.display());
    }
}

// ---------------------------------------------------------------------------
// Interactive prompts
// ---------------------------------------------------------------------------

/// Asks on stderr, reads the answer from stdin. End of input means "no".
struct ConsolePrompter;

impl ConsolePrompter {
    fn ask(question: &str, default_yes: bool) -> bool {
        let hint = if default_yes { "[Y/n]" } else { "[y/N]" };
        eprint!("{question} {hint} ");
        let _ = io::stderr().flush();

        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => false,
            Ok(_) => match line.trim().to_ascii_lowercase().as_str() {
                "" => default_yes,
                "y" | "yes" => true,
                _ => false,
            },
        }
    }
}

impl Prompter for ConsolePrompter {
    fn confirm_overwrite(&self, dir: &Path) -> bool {
        Self::ask(
            &format!("{} exists and will be deleted. Continue?", dir.display()),
            false,
        )
    }

    fn confirm_retry(&self, dir: &Path, attempt: u32, err: &io::Error) -> bool {
        Self::ask(
            &format!(
                "Deleting {} failed (attempt {attempt}): {err}. Retry?",
                dir.display()
            ),
            true,
        )
    }
}
