//! Extraction of files embedded in Inno Setup installers.
//!
//! Newer installers built with the "embedded PE" layout store every file as
//! an independent zlib stream inside the payload that follows the `zlb\x1A`
//! marker. The stream boundaries are not indexed anywhere, so this crate
//! recovers them heuristically:
//!
//! - `locator`: container validation, version detection, payload location
//! - `scanner`: brute-force zlib stream discovery over the payload
//! - `manifest`: parsing of the `;;` metadata and CSV file table
//! - `matcher`: assignment of streams to manifest records by exact size
//! - `extractor`: writing matched streams below an output directory
//! - `verify`: SHA-256 comparison against manifest hashes
//! - `installer`: per-run state tying the stages together
//! - `config`: command-line configuration for the `inno-extract` binary
//!
//! Payloads using the older LZMA layout are recognised and reported as
//! unsupported.
//!
//! # Example
//!
//! ```no_run
//! use inno_extract::Installer;
//!
//! fn main() -> inno_extract::Result<()> {
//!     let installer = Installer::open("setup.exe")?;
//!     println!("Inno Setup {}", installer.version()?);
//!
//!     let manifest = installer.manifest()?;
//!     for record in &manifest.records {
//!         println!("{:?} ({:?} bytes)", record.install_path, record.file_size);
//!     }
//!
//!     let written = installer.extract_to("out")?;
//!     println!("{written} files extracted");
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod config;
pub mod error;
pub mod extractor;
pub mod installer;
pub mod locator;
pub mod manifest;
pub mod matcher;
pub mod scanner;
pub mod verify;

pub use config::{CliConfig, Command, LogFormat};
pub use error::{ConfigError, InnoError, Result};
pub use extractor::{ExtractOptions, ExtractReport, HashMismatch, extract, extract_with};
pub use installer::{Installer, InstallerOptions, SUPPORTED_VERSION};
pub use locator::{Container, PayloadRegion, locate};
pub use manifest::{Manifest, ManifestRecord};
pub use matcher::{exclude_manifest, match_streams};
pub use scanner::{CandidateSegment, Rejection, ScanOptions, scan};
pub use verify::HashCheck;
