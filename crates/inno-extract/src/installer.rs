//! Per-run installer state
//!
//! [`Installer`] owns the container bytes and derives everything else on
//! demand. Each stage is computed at most once and memoised in a
//! [`OnceLock`], including failures, so repeated calls return the same
//! result without rescanning. `OnceLock` also serialises concurrent first
//! access, which makes a shared `&Installer` safe to use across threads.
//!
//! Stage order:
//!
//! 1. validation (eager, in the constructor): `MZ` magic and signature text
//! 2. version detection and payload location
//! 3. format classification: embedded PE (scannable) or LZMA (unsupported)
//! 4. stream scanning, manifest parsing, stream matching
//! 5. extraction
//!
//! Once the payload is classified as LZMA, manifest and extraction requests
//! fail with [`InnoError::UnsupportedVersion`].

use crate::error::{InnoError, Result};
use crate::extractor::{self, ExtractOptions, ExtractReport};
use crate::locator::{self, PAYLOAD_MARKER, PayloadRegion};
use crate::manifest::{MANIFEST_MARKER, Manifest};
use crate::matcher;
use crate::scanner::{self, CandidateSegment, ScanOptions};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info};

/// Installer version the extraction logic was developed against
///
/// Reported for information only; detected versions are never compared
/// against it.
pub const SUPPORTED_VERSION: &str = "6.3.0";

/// Scan settings for the two passes over the payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstallerOptions {
    /// Coarse pass used to discover file content
    pub streams: ScanOptions,
    /// Strict pass used to find the manifest
    pub manifest: ScanOptions,
}

impl Default for InstallerOptions {
    fn default() -> Self {
        Self {
            streams: ScanOptions::default(),
            manifest: ScanOptions::manifest(),
        }
    }
}

/// An Inno Setup installer loaded into memory
pub struct Installer {
    path: Option<PathBuf>,
    data: Vec<u8>,
    options: InstallerOptions,
    version: OnceLock<Result<String>>,
    payload_offset: OnceLock<Result<usize>>,
    streams: OnceLock<Result<Vec<CandidateSegment>>>,
    manifest_streams: OnceLock<Result<Vec<CandidateSegment>>>,
    manifest: OnceLock<Result<Manifest>>,
    // Indices into `streams`, so matching never copies decompressed data
    file_pool: OnceLock<Result<Vec<usize>>>,
    file_streams: OnceLock<Result<Vec<Option<usize>>>>,
}

impl Installer {
    /// Read and validate the installer at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_options(path, InstallerOptions::default())
    }

    /// Read and validate the installer at `path` with custom scan settings
    pub fn open_with_options(path: impl AsRef<Path>, options: InstallerOptions) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(InnoError::invalid(format!(
                "File not found: {}",
                path.display()
            )));
        }

        let data = std::fs::read(path).map_err(|e| InnoError::io(path, e))?;
        let mut installer = Self::with_options(data, options)?;
        installer.path = Some(path.to_path_buf());

        info!(
            "Opened installer {} ({} bytes)",
            path.display(),
            installer.data.len()
        );
        Ok(installer)
    }

    /// Validate an installer already held in memory
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        Self::with_options(data, InstallerOptions::default())
    }

    /// Validate an in-memory installer with custom scan settings
    pub fn with_options(data: Vec<u8>, options: InstallerOptions) -> Result<Self> {
        locator::validate(&data)?;

        Ok(Self {
            path: None,
            data,
            options,
            version: OnceLock::new(),
            payload_offset: OnceLock::new(),
            streams: OnceLock::new(),
            manifest_streams: OnceLock::new(),
            manifest: OnceLock::new(),
            file_pool: OnceLock::new(),
            file_streams: OnceLock::new(),
        })
    }

    /// Path the installer was read from, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Raw container bytes
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Scan settings in use
    pub const fn options(&self) -> &InstallerOptions {
        &self.options
    }

    /// Packager version from the `Inno Setup Setup Data (x.y.z)` text
    pub fn version(&self) -> Result<&str> {
        cached(&self.version, || locator::detect_version(&self.data)).map(String::as_str)
    }

    /// Offset of the `zlb\x1A` payload marker
    pub fn payload_offset(&self) -> Result<usize> {
        cached(&self.payload_offset, || {
            locator::find_payload_offset(&self.data)
        })
        .copied()
    }

    /// The four bytes at the payload offset
    pub fn payload_header(&self) -> Result<[u8; 4]> {
        let offset = self.payload_offset()?;
        let mut header = [0u8; PAYLOAD_MARKER.len()];
        header.copy_from_slice(&self.data[offset..offset + PAYLOAD_MARKER.len()]);
        Ok(header)
    }

    /// Payload bytes after the marker
    pub fn payload(&self) -> Result<PayloadRegion<'_>> {
        PayloadRegion::new(&self.data, self.payload_offset()?)
    }

    /// Whether the payload carries directly scannable zlib streams
    pub fn is_embedded_pe(&self) -> Result<bool> {
        Ok(self.payload()?.is_embedded_pe())
    }

    /// All streams found by the coarse pass, manifest included
    pub fn streams(&self) -> Result<&[CandidateSegment]> {
        cached(&self.streams, || {
            let payload = self.payload()?;
            Ok(scanner::scan(payload.as_bytes(), &self.options.streams))
        })
        .map(Vec::as_slice)
    }

    /// Streams found by the strict manifest pass
    pub fn manifest_streams(&self) -> Result<&[CandidateSegment]> {
        cached(&self.manifest_streams, || {
            let payload = self.payload()?;
            Ok(scanner::scan(payload.as_bytes(), &self.options.manifest))
        })
        .map(Vec::as_slice)
    }

    /// The parsed setup manifest
    pub fn manifest(&self) -> Result<&Manifest> {
        cached(&self.manifest, || {
            self.require_scannable()?;

            let segment = self
                .manifest_streams()?
                .iter()
                .find(|segment| segment.contains(MANIFEST_MARKER.as_bytes()))
                .ok_or_else(|| {
                    InnoError::unsupported(format!(
                        "no zlib manifest found (no stream over {} bytes carries a {} table)",
                        self.options.manifest.min_size, MANIFEST_MARKER
                    ))
                })?;

            debug!(
                "Manifest stream at payload offset {:#x} ({} bytes)",
                segment.offset,
                segment.size()
            );
            let manifest = Manifest::parse(&segment.data);
            info!("Parsed manifest with {} file records", manifest.len());
            Ok(manifest)
        })
    }

    /// Coarse-pass streams with the manifest removed
    pub fn file_pool(&self) -> Result<Vec<&CandidateSegment>> {
        let streams = self.streams()?;
        Ok(self.file_pool_indices()?.iter().map(|&i| &streams[i]).collect())
    }

    /// Stream content per manifest record, aligned with `manifest().records`
    ///
    /// The returned slices borrow from [`Installer::streams`].
    pub fn file_streams(&self) -> Result<Vec<Option<&[u8]>>> {
        let streams = self.streams()?;
        let slots = cached(&self.file_streams, || {
            self.require_scannable()?;
            let records = &self.manifest()?.records;
            let pool = self.file_pool_indices()?;
            let sizes = pool.iter().map(|&i| streams[i].size());
            Ok(matcher::assign(records, sizes)
                .into_iter()
                .map(|slot| slot.map(|p| pool[p]))
                .collect())
        })?;

        Ok(slots
            .iter()
            .map(|slot| slot.map(|i| streams[i].data.as_slice()))
            .collect())
    }

    /// Extract every matched file below `output_dir`
    pub fn extract_to(&self, output_dir: impl AsRef<Path>) -> Result<usize> {
        self.extract_to_with(output_dir, &ExtractOptions::default())
            .map(|report| report.files_written)
    }

    /// Extract every matched file below `output_dir` with options
    pub fn extract_to_with(
        &self,
        output_dir: impl AsRef<Path>,
        options: &ExtractOptions,
    ) -> Result<ExtractReport> {
        self.require_scannable()?;

        let records = &self.manifest()?.records;
        let streams = self.file_streams()?;
        extractor::extract_with(output_dir.as_ref(), records, &streams, options)
    }

    fn file_pool_indices(&self) -> Result<&[usize]> {
        cached(&self.file_pool, || {
            Ok(matcher::manifest_free(self.streams()?))
        })
        .map(Vec::as_slice)
    }

    fn require_scannable(&self) -> Result<()> {
        if self.is_embedded_pe()? {
            Ok(())
        } else {
            Err(InnoError::unsupported("LZMA format not yet supported"))
        }
    }
}

impl fmt::Debug for Installer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Installer")
            .field("path", &self.path)
            .field("size", &self.data.len())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Return the memoised value of `cell`, computing it on first access
fn cached<T>(cell: &OnceLock<Result<T>>, init: impl FnOnce() -> Result<T>) -> Result<&T> {
    match cell.get_or_init(init) {
        Ok(value) => Ok(value),
        Err(e) => Err(e.clone()),
    }
}
