//! Content fingerprints: streaming SHA-256 of a file's bytes plus its length.

use std::fs::File;
use std::io;
use std::path::Path;

use sha2::{Digest, Sha256};

/// Fingerprint of a single file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    /// Lowercase hex SHA-256.
    pub content_id: String,
    pub byte_len: u64,
}

impl Fingerprint {
    pub fn size_kb(&self) -> u64 {
        size_kb(self.byte_len)
    }
}

/// Whole kilobytes, truncated: 1023 bytes is 0 KB, 2047 bytes is 1 KB.
pub fn size_kb(byte_len: u64) -> u64 {
    byte_len / 1024
}

/// Hash the file at `path` without loading it into memory.
pub fn fingerprint_file(path: &Path) -> io::Result<Fingerprint> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let byte_len = io::copy(&mut file, &mut hasher)?;
    Ok(Fingerprint {
        content_id: hex::encode(hasher.finalize()),
        byte_len,
    })
}
