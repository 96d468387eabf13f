//! Zip extraction.

use std::fs::File;
use std::path::Path;

use crate::error::{Error, Result};

/// Extract every entry of `archive` under `dest`, creating subdirectories as needed.
///
/// Entries whose names would escape `dest` are rejected by the zip reader.
pub fn extract_zip(archive: &Path, dest: &Path) -> Result<usize> {
    let fail = |e: String| {
        Error::extract_failed(archive.display().to_string(), dest.display().to_string(), e)
    };

    let file = File::open(archive).map_err(|e| fail(e.to_string()))?;
    let mut zip = zip::ZipArchive::new(file).map_err(|e| fail(e.to_string()))?;
    let entries = zip.len();
    zip.extract(dest).map_err(|e| fail(e.to_string()))?;

    Ok(entries)
}
