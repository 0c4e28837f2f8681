//! verwriter — version manifest generator for game/mod update distribution.
//!
//! # Usage
//!
//! ```text
//! verwriter generate [BASE_DIR] [--yes] [--json] [--copy-dir NAME]
//! verwriter status [BASE_DIR] [--json]
//! verwriter init [BASE_DIR] [--force]
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{generate::GenerateArgs, init::InitArgs, status::StatusArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "verwriter",
    version,
    about = "Generate version manifests and updater payloads from VersionConfig.ini",
    long_about = None,
)]
struct Cli {
    /// Log at debug level (RUST_LOG still wins when set).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Diff against the previous manifest, copy changed files and write a new manifest.
    Generate(GenerateArgs),

    /// Show what the next `generate` would pick up, without writing anything.
    Status(StatusArgs),

    /// Write a starter VersionConfig.ini.
    Init(InitArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Commands::Generate(args) => args.run(),
        Commands::Status(args) => args.run(),
        Commands::Init(args) => args.run(),
    }
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
