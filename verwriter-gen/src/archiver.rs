//! LZMA side-artifacts.
//!
//! Archives use the legacy `.lzma` container ("lzma_alone") so updater
//! clients without xz support can unpack them.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use xz2::read::XzDecoder;
use xz2::stream::{LzmaOptions, Stream};
use xz2::write::XzEncoder;

/// Suffix appended to the original file name.
pub const ARCHIVE_SUFFIX: &str = ".lzma";

const LZMA_PRESET: u32 = 6;

/// `<path>.lzma` — pure, no I/O.
pub fn archive_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(ARCHIVE_SUFFIX);
    PathBuf::from(name)
}

/// Compress `src` into `dst`, creating parent directories.
///
/// Returns the number of compressed bytes written.
pub fn compress_file(src: &Path, dst: &Path) -> io::Result<u64> {
    if let Some(parent) = dst.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let options = LzmaOptions::new_preset(LZMA_PRESET)?;
    let stream = Stream::new_lzma_encoder(&options)?;

    let mut reader = BufReader::new(File::open(src)?);
    let mut encoder = XzEncoder::new_stream(BufWriter::new(File::create(dst)?), stream);
    io::copy(&mut reader, &mut encoder)?;
    let mut writer = encoder.finish()?;
    writer.flush()?;

    Ok(std::fs::metadata(dst)?.len())
}

/// Decompress an `.lzma` artifact at `src` into `dst`.
pub fn decompress_file(src: &Path, dst: &Path) -> io::Result<u64> {
    if let Some(parent) = dst.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let stream = Stream::new_lzma_decoder(u64::MAX)?;
    let mut decoder = XzDecoder::new_stream(BufReader::new(File::open(src)?), stream);
    let mut writer = BufWriter::new(File::create(dst)?);
    let written = io::copy(&mut decoder, &mut writer)?;
    writer.flush()?;
    Ok(written)
}
