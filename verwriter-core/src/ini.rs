//! Ordered INI key/value store.
//!
//! Used for both `VersionConfig.ini` and the emitted manifests. Sections and
//! keys keep their file order.
//!
//! # List-as-keys
//!
//! List sections (`[Include]`, `[ExcludeFiles]`, ...) carry their items as key
//! *names*; a bare line such as `Resources/Maps` is a key with an empty value.
//! [`IniStore::keys`] returns those names in order.
//!
//! ```text
//! [Version]
//! 1.0.0
//!
//! [AddOns]
//! RA1=INI/ra1.ini
//! ```

use std::fmt;
use std::path::Path;

use crate::error::{io_err, ConfigError};

// ---------------------------------------------------------------------------
// 1. Model
// ---------------------------------------------------------------------------

/// A single `[Section]` with its ordered `(key, value)` pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Section {
    pub name: String,
    entries: Vec<(String, String)>,
}

impl Section {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            entries: Vec::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Key names in file order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// `(key, value)` pairs in file order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First occurrence of a key wins; later duplicates are dropped.
    fn push_unique(&mut self, key: &str, value: &str) {
        if self.get(key).is_none() {
            self.entries.push((key.to_owned(), value.to_owned()));
        }
    }

    fn set(&mut self, key: &str, value: &str) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value.to_owned(),
            None => self.entries.push((key.to_owned(), value.to_owned())),
        }
    }
}

/// Ordered collection of INI sections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IniStore {
    sections: Vec<Section>,
}

// ---------------------------------------------------------------------------
// 2. Parse / load
// ---------------------------------------------------------------------------

impl IniStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse INI text. Parsing never fails: unrecognised lines are treated as
    /// bare keys, and keys before the first header are ignored.
    pub fn parse(text: &str) -> Self {
        let mut store = Self::new();
        let mut current: Option<usize> = None;

        for raw in text.lines() {
            let line = raw.trim().trim_start_matches('\u{feff}');
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }

            if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                current = Some(store.section_index_or_insert(name.trim()));
                continue;
            }

            let Some(idx) = current else {
                tracing::debug!("ignoring key outside of any section: {line}");
                continue;
            };

            let (key, value) = match line.split_once('=') {
                Some((k, v)) => (k.trim(), v.trim()),
                None => (line, ""),
            };
            if key.is_empty() {
                continue;
            }
            store.sections[idx].push_unique(key, value);
        }

        store
    }

    /// Read and parse the file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
        Ok(Self::parse(&contents))
    }

    /// Write the store to `path`, replacing any existing file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_string()).map_err(|e| io_err(path, e))
    }

    // -----------------------------------------------------------------------
    // 3. Queries
    // -----------------------------------------------------------------------

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    pub fn sections(&self) -> impl Iterator<Item = &Section> {
        self.sections.iter()
    }

    /// Key names of `section` in order; empty if the section is absent.
    pub fn keys(&self, section: &str) -> Vec<&str> {
        self.section(section)
            .map(|s| s.keys().collect())
            .unwrap_or_default()
    }

    /// The first key name of `section`, for single-value list sections such
    /// as `[Version]`.
    pub fn first_key(&self, section: &str) -> Option<&str> {
        self.section(section).and_then(|s| s.keys().next())
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.section(section).and_then(|s| s.get(key))
    }

    /// Read a boolean; absent or unrecognised values yield `default`.
    pub fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        match self.get(section, key).map(str::to_ascii_lowercase).as_deref() {
            Some("true" | "yes" | "on" | "1") => true,
            Some("false" | "no" | "off" | "0") => false,
            Some(other) => {
                tracing::debug!("[{section}] {key}: unrecognised boolean '{other}', using {default}");
                default
            }
            None => default,
        }
    }

    // -----------------------------------------------------------------------
    // 4. Mutation
    // -----------------------------------------------------------------------

    /// Set `key` in `section`, creating either when absent.
    pub fn set(&mut self, section: &str, key: &str, value: impl AsRef<str>) {
        let idx = self.section_index_or_insert(section);
        self.sections[idx].set(key, value.as_ref());
    }

    /// Ensure `section` exists, even if it stays empty.
    pub fn add_section(&mut self, section: &str) {
        self.section_index_or_insert(section);
    }

    fn section_index_or_insert(&mut self, name: &str) -> usize {
        match self.sections.iter().position(|s| s.name == name) {
            Some(idx) => idx,
            None => {
                self.sections.push(Section::new(name));
                self.sections.len() - 1
            }
        }
    }
}

impl fmt::Display for IniStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, section) in self.sections.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            writeln!(f, "[{}]", section.name)?;
            for (key, value) in section.entries() {
                writeln!(f, "{key}={value}")?;
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
