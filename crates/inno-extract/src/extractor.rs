//! Writing matched streams to disk
//!
//! Each record with a matched stream and a non-empty install path is
//! written under the output root. Install paths use `\` separators and are
//! converted to `/` first. Paths that would leave the output root (absolute
//! paths, drive prefixes, `..` components) are skipped.

use crate::error::{InnoError, Result};
use crate::manifest::ManifestRecord;
use crate::verify::{self, HashCheck};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Extraction settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Compare each written file against the record's SHA-256
    pub verify_hashes: bool,
}

/// A written file whose content does not match the manifest hash
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashMismatch {
    /// Path the file was written to
    pub path: PathBuf,
    /// Hash recorded in the manifest
    pub expected: String,
    /// Hash of the written content
    pub actual: String,
}

/// Summary of one extraction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractReport {
    /// Files written to disk
    pub files_written: usize,
    /// Records without a stream or without an install path
    pub skipped: usize,
    /// Install paths refused because they escape the output root
    pub skipped_unsafe: Vec<String>,
    /// Hash mismatches found when verification is enabled
    pub hash_mismatches: Vec<HashMismatch>,
}

/// Write every matched stream under `output_root` and return the file count
pub fn extract(
    output_root: &Path,
    records: &[ManifestRecord],
    streams: &[Option<&[u8]>],
) -> Result<usize> {
    extract_with(output_root, records, streams, &ExtractOptions::default())
        .map(|report| report.files_written)
}

/// Write every matched stream under `output_root`
///
/// `streams` is aligned with `records` as produced by
/// [`match_streams`](crate::matcher::match_streams). Existing files are
/// overwritten.
pub fn extract_with(
    output_root: &Path,
    records: &[ManifestRecord],
    streams: &[Option<&[u8]>],
    options: &ExtractOptions,
) -> Result<ExtractReport> {
    std::fs::create_dir_all(output_root).map_err(|e| InnoError::io(output_root, e))?;

    let mut report = ExtractReport::default();

    for (record, stream) in records.iter().zip(streams) {
        let (Some(data), Some(install_path)) = (*stream, record.normalized_path()) else {
            report.skipped += 1;
            continue;
        };

        let Some(relative) = safe_relative_path(&install_path) else {
            warn!("Skipping unsafe install path: {}", install_path);
            report.skipped_unsafe.push(install_path);
            continue;
        };

        let target = output_root.join(relative);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| InnoError::io(parent, e))?;
        }
        std::fs::write(&target, data).map_err(|e| InnoError::io(&target, e))?;
        debug!("Wrote {} ({} bytes)", target.display(), data.len());
        report.files_written += 1;

        if options.verify_hashes
            && let HashCheck::Mismatch { expected, actual } =
                verify::check(record.file_hash.as_deref(), data)
        {
            warn!(
                "Hash mismatch for {}: expected {}, got {}",
                target.display(),
                expected,
                actual
            );
            report.hash_mismatches.push(HashMismatch {
                path: target,
                expected,
                actual,
            });
        }
    }

    info!(
        "Extracted {} files to {} ({} skipped)",
        report.files_written,
        output_root.display(),
        report.skipped + report.skipped_unsafe.len()
    );

    Ok(report)
}

/// Turn a `/`-separated install path into a relative path that stays
/// inside the output root
fn safe_relative_path(path: &str) -> Option<PathBuf> {
    if path.starts_with('/') {
        return None;
    }

    let mut relative = PathBuf::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => return None,
            part if part.contains(':') => return None,
            part => relative.push(part),
        }
    }

    (!relative.as_os_str().is_empty()).then_some(relative)
}
