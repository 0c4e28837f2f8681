//! Domain types for manifest generation.
//!
//! Paths inside entries are always relative to the base directory and use
//! `/` as the separator, whatever the host platform. See [`normalize_path`].

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed logical name for an add-on component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentId(pub String);

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ComponentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ComponentId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Manifest table values
// ---------------------------------------------------------------------------

/// `(contentId, sizeKb)` as stored in the `[FileVersions]` and `[AddOns]`
/// manifest tables. Serialized as `"<contentId>,<sizeKb>"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStamp {
    pub content_id: String,
    pub size_kb: u64,
}

impl FileStamp {
    /// Parse a `"<contentId>,<sizeKb>"` table value.
    ///
    /// Returns `None` when there is no content id. A missing or non-numeric
    /// size reads as 0; the diff never looks at sizes.
    pub fn parse(value: &str) -> Option<Self> {
        let (id, size) = match value.split_once(',') {
            Some((id, size)) => (id.trim(), size.trim()),
            None => (value.trim(), ""),
        };
        if id.is_empty() {
            return None;
        }
        Some(Self {
            content_id: id.to_owned(),
            size_kb: size.parse().unwrap_or(0),
        })
    }
}

impl fmt::Display for FileStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.content_id, self.size_kb)
    }
}

/// Fingerprint and size of a compressed side-artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveInfo {
    pub id: String,
    pub size_kb: u64,
}

impl ArchiveInfo {
    /// Usable metadata has a fingerprint and a non-zero size.
    pub fn is_complete(&self) -> bool {
        !self.id.is_empty() && self.size_kb > 0
    }
}

/// Value of an `[ArchivedFiles]` entry: real metadata or the `"0"` sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArchiveRecord {
    Known(ArchiveInfo),
    Absent,
}

impl ArchiveRecord {
    pub const SENTINEL: &'static str = "0";

    /// Parse an `[ArchivedFiles]` value. Anything that is not a usable
    /// `"<archiveId>,<archiveSizeKb>"` pair is [`ArchiveRecord::Absent`].
    pub fn parse(value: &str) -> Self {
        if value.trim() == Self::SENTINEL {
            return Self::Absent;
        }
        match FileStamp::parse(value) {
            Some(stamp) => Self::Known(ArchiveInfo {
                id: stamp.content_id,
                size_kb: stamp.size_kb,
            }),
            None => Self::Absent,
        }
    }

    pub fn info(&self) -> Option<&ArchiveInfo> {
        match self {
            Self::Known(info) => Some(info),
            Self::Absent => None,
        }
    }
}

impl fmt::Display for ArchiveRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(info) => write!(f, "{},{}", info.id, info.size_kb),
            Self::Absent => f.write_str(Self::SENTINEL),
        }
    }
}

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

/// One distributable file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Relative to the base directory, `/`-separated.
    pub path: String,
    pub content_id: String,
    /// `floor(byte_len / 1024)`.
    pub size_kb: u64,
    /// Also distributed as a compressed side-artifact.
    pub archived: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive: Option<ArchiveInfo>,
}

impl FileEntry {
    pub fn stamp(&self) -> FileStamp {
        FileStamp {
            content_id: self.content_id.clone(),
            size_kb: self.size_kb,
        }
    }

    /// True when archive metadata exists and is usable.
    pub fn has_archive_metadata(&self) -> bool {
        self.archive.as_ref().is_some_and(ArchiveInfo::is_complete)
    }
}

/// A named add-on: a [`FileEntry`] plus a stable logical id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentEntry {
    pub id: ComponentId,
    #[serde(flatten)]
    pub file: FileEntry,
}

/// Normalise a relative path written in a config or manifest: backslashes
/// become `/`, and leading `./` plus leading/trailing separators are dropped.
/// The base directory itself (`.`) normalises to the empty string.
pub fn normalize_path(raw: &str) -> String {
    let mut path = raw.trim().replace('\\', "/");
    while let Some(rest) = path.strip_prefix("./") {
        path = rest.to_owned();
    }
    let path = path.trim_matches('/');
    if path == "." {
        return String::new();
    }
    path.to_owned()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
