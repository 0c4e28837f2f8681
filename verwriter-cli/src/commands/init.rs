//! `verwriter init [BASE_DIR]`

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

use verwriter_core::{GenerationConfig, CONFIG_FILE_NAME};

const TEMPLATE: &str = "\
; Generation settings for verwriter.
; List sections take one relative path per line.

[Version]
1.0.0

[Include]
; Files or directories to track, relative to this file.
Resources

[ExcludeFiles]

[ExcludeDirectories]

[ArchiveFiles]
; Files shipped as .lzma archives (needs EnableExtendedUpdaterFeatures).

[Options]
EnableExtendedUpdaterFeatures=false
RecursiveDirectorySearch=true
IncludeOnlyChangedFiles=false
NoCopyMode=false
ApplyTimestampOnVersion=false
CopyArchivedOriginalFiles=false
ExcludeHiddenAndSystemFiles=true

[UpdaterVersion]

[ManualDownloadURL]

[AddOns]
; ComponentId=relative/path.ini
";

/// Write a starter config into a base directory.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Directory to initialize (defaults to the current directory).
    #[arg(default_value = ".")]
    pub base_dir: PathBuf,

    /// Replace an existing VersionConfig.ini.
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    pub fn run(self) -> Result<()> {
        let path = GenerationConfig::path_in(&self.base_dir);
        if path.exists() && !self.force {
            bail!(
                "{} already exists; pass --force to replace it",
                path.display()
            );
        }

        std::fs::create_dir_all(&self.base_dir)
            .with_context(|| format!("cannot create '{}'", self.base_dir.display()))?;
        std::fs::write(&path, TEMPLATE)
            .with_context(|| format!("failed to write '{}'", path.display()))?;
        tracing::debug!("wrote template {}", path.display());

        println!("{} wrote {}", "✓".green().bold(), path.display());
        println!("  Edit [Include] in {CONFIG_FILE_NAME}, then run 'verwriter status'.");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use verwriter_core::IniStore;

    use super::*;

    #[test]
    fn template_is_a_valid_config() {
        let cfg = GenerationConfig::from_store(&IniStore::parse(TEMPLATE)).expect("template parses");
        assert_eq!(cfg.version, "1.0.0");
        assert_eq!(cfg.includes, vec!["Resources"]);
        assert!(cfg.options.recursive_directory_search);
        assert!(cfg.options.exclude_hidden_and_system_files);
        assert!(cfg.components.is_empty());
    }
}
