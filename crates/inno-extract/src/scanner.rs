//! Heuristic zlib stream discovery
//!
//! The payload region has no reliable framing, so every byte position that
//! starts with one of the four standard zlib headers is treated as a
//! candidate and validated by decompressing it. A candidate is accepted
//! only when the decompressor reaches the end of the stream (which includes
//! the Adler-32 check) and the output is larger than the size threshold.
//!
//! Rejected positions are expected and plentiful. They are reported as a
//! [`Rejection`] value from [`try_decompress`] and never leave [`scan`].

use flate2::{Decompress, FlushDecompress, Status};
use memchr::memmem;
use std::fmt;
use tracing::{debug, trace};

/// zlib headers (CMF, FLG) for the four compression levels
pub const ZLIB_HEADERS: [[u8; 2]; 4] = [
    [0x78, 0x01], // No compression
    [0x78, 0x5E], // Fast compression
    [0x78, 0x9C], // Default compression
    [0x78, 0xDA], // Best compression
];

/// Threshold for general file-content discovery
pub const DEFAULT_MIN_SIZE: usize = 100;

/// Threshold used to surface the manifest stream
pub const MANIFEST_MIN_SIZE: usize = 1000;

/// Maximum number of input bytes handed to one decompression attempt (30 MiB)
pub const DEFAULT_MAX_WINDOW: usize = 30 * 1024 * 1024;

/// Maximum decompressed size accepted for one candidate (1 GiB)
///
/// Bounds memory use when a corrupt or hostile candidate inflates far
/// beyond its compressed size.
pub const DEFAULT_MAX_OUTPUT: usize = 1024 * 1024 * 1024;

const OUTPUT_CHUNK: usize = 64 * 1024;

/// Scan thresholds and limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    /// Accept only streams whose decompressed length exceeds this
    pub min_size: usize,
    /// Cap on the input window for a single attempt
    pub max_window: usize,
    /// Cap on the decompressed output of a single attempt
    pub max_output: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            min_size: DEFAULT_MIN_SIZE,
            max_window: DEFAULT_MAX_WINDOW,
            max_output: DEFAULT_MAX_OUTPUT,
        }
    }
}

impl ScanOptions {
    /// Strict pass used to find the manifest stream
    pub fn manifest() -> Self {
        Self {
            min_size: MANIFEST_MIN_SIZE,
            ..Self::default()
        }
    }

    /// Same limits with a different size threshold
    pub const fn with_min_size(mut self, min_size: usize) -> Self {
        self.min_size = min_size;
        self
    }
}

/// A position in the payload that decompressed successfully
#[derive(Clone, PartialEq, Eq)]
pub struct CandidateSegment {
    /// Offset of the zlib header within the scanned buffer
    pub offset: usize,
    /// Decompressed bytes
    pub data: Vec<u8>,
}

impl CandidateSegment {
    /// Decompressed length in bytes
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Whether the decompressed bytes contain `needle`
    pub fn contains(&self, needle: &[u8]) -> bool {
        memmem::find(&self.data, needle).is_some()
    }
}

impl fmt::Debug for CandidateSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CandidateSegment")
            .field("offset", &self.offset)
            .field("size", &self.data.len())
            .finish()
    }
}

/// Why a candidate position was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The decompressor reported corrupt data or a checksum failure
    Corrupt(String),
    /// The window ended before the stream did
    Truncated,
    /// Output grew beyond [`ScanOptions::max_output`]
    OutputLimit,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Corrupt(reason) => write!(f, "corrupt stream: {reason}"),
            Self::Truncated => write!(f, "truncated stream"),
            Self::OutputLimit => write!(f, "output limit exceeded"),
        }
    }
}

/// Whether `pair` is one of the recognised zlib headers
pub fn is_zlib_header(first: u8, second: u8) -> bool {
    ZLIB_HEADERS.contains(&[first, second])
}

/// Decompress one zlib stream starting at the beginning of `window`
///
/// Bytes after the end of the stream are ignored. The attempt succeeds only
/// if the stream terminates inside `window` with a valid checksum.
pub fn try_decompress(window: &[u8], max_output: usize) -> Result<Vec<u8>, Rejection> {
    let mut inflater = Decompress::new(true);
    let mut output = Vec::with_capacity(OUTPUT_CHUNK);

    loop {
        if output.len() > max_output {
            return Err(Rejection::OutputLimit);
        }
        if output.len() == output.capacity() {
            output.reserve(OUTPUT_CHUNK);
        }

        let consumed = inflater.total_in() as usize;
        let produced = inflater.total_out();
        let input = window.get(consumed..).unwrap_or_default();

        let status = inflater
            .decompress_vec(input, &mut output, FlushDecompress::None)
            .map_err(|e| Rejection::Corrupt(e.to_string()))?;

        match status {
            Status::StreamEnd if output.len() > max_output => {
                return Err(Rejection::OutputLimit);
            }
            Status::StreamEnd => return Ok(output),
            Status::Ok | Status::BufError => {
                let progressed =
                    inflater.total_in() as usize != consumed || inflater.total_out() != produced;
                if !progressed && output.len() < output.capacity() {
                    // Room to write and nothing left to read
                    return Err(Rejection::Truncated);
                }
            }
        }
    }
}

/// Scan `buffer` for zlib streams that decompress to more than
/// `options.min_size` bytes
///
/// Every position from 0 to `len - 2` is considered. Results are ordered by
/// offset. The scan is exhaustive, so candidates may overlap in the source
/// buffer.
pub fn scan(buffer: &[u8], options: &ScanOptions) -> Vec<CandidateSegment> {
    let mut segments = Vec::new();
    let mut attempts = 0usize;
    let mut rejected = 0usize;

    for pos in 0..buffer.len().saturating_sub(2) {
        if !is_zlib_header(buffer[pos], buffer[pos + 1]) {
            continue;
        }

        attempts += 1;
        let end = buffer.len().min(pos.saturating_add(options.max_window));

        match try_decompress(&buffer[pos..end], options.max_output) {
            Ok(data) if data.len() > options.min_size => {
                trace!("Accepted stream at {:#x} ({} bytes)", pos, data.len());
                segments.push(CandidateSegment { offset: pos, data });
            }
            Ok(data) => {
                trace!(
                    "Stream at {:#x} below threshold ({} <= {})",
                    pos,
                    data.len(),
                    options.min_size
                );
            }
            Err(rejection) => {
                rejected += 1;
                trace!("Rejected candidate at {:#x}: {}", pos, rejection);
            }
        }
    }

    debug!(
        "Scanned {} bytes: {} candidates, {} rejected, {} accepted (min size {})",
        buffer.len(),
        attempts,
        rejected,
        segments.len(),
        options.min_size
    );

    segments
}
