//! Setup manifest parsing
//!
//! The manifest is the one decompressed stream that describes the packaged
//! files. It is plain UTF-8 text:
//!
//! ```text
//! ;; Product = TestApp
//! ;; Version = "2.4.1"
//! FileKey,EncodedSize,Encoding,FileIntent,Options,InstallPath,FileHash,FileSize
//! k1,2048,zlib,copy,,bin\app.exe,<sha256 hex>,8192
//! ```
//!
//! Lines starting with `;;` carry `key = value` metadata. Keys are stored
//! lower-cased with `.` and `-` replaced by `_`, and surrounding quotes are
//! stripped from values. All other non-blank lines form one CSV table whose
//! first row is the header.
//!
//! Parsing never fails. Rows that are not valid CSV or that have fewer
//! fields than the header are dropped. Row order is preserved and is the
//! order files are extracted in.
//!
//! # Example
//!
//! ```
//! use inno_extract::manifest::Manifest;
//!
//! let text = ";; Product = TestApp\n\
//!             FileKey,EncodedSize,Encoding,FileIntent,Options,InstallPath,FileHash,FileSize\n\
//!             k1,10,zlib,copy,,docs\\readme.txt,00ff,1234\n";
//! let manifest = Manifest::parse(text.as_bytes());
//!
//! assert_eq!(manifest.product(), Some("TestApp"));
//! assert_eq!(manifest.records.len(), 1);
//! assert_eq!(manifest.records[0].install_path.as_deref(), Some("docs\\readme.txt"));
//! assert_eq!(manifest.records[0].file_size, Some(1234));
//! ```

mod parser;
mod record;

pub use parser::COMMENT_MARKER;
pub use record::{COLUMNS, MANIFEST_MARKER, ManifestRecord};

use std::collections::BTreeMap;

/// Parsed manifest: free-form metadata and ordered file records
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    /// Metadata from `;;` comment lines, keyed by normalised name
    pub metadata: BTreeMap<String, String>,
    /// File records in manifest order
    pub records: Vec<ManifestRecord>,
}

impl Manifest {
    /// Parse decompressed manifest bytes
    ///
    /// Invalid UTF-8 sequences are replaced rather than rejected.
    pub fn parse(data: &[u8]) -> Self {
        Self::parse_str(&String::from_utf8_lossy(data))
    }

    /// Parse manifest text
    pub fn parse_str(text: &str) -> Self {
        parser::parse_text(text)
    }

    /// Metadata value by normalised key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// Product name annotation
    pub fn product(&self) -> Option<&str> {
        self.get("product")
    }

    /// Component annotation
    pub fn component(&self) -> Option<&str> {
        self.get("component")
    }

    /// Product version annotation
    pub fn version(&self) -> Option<&str> {
        self.get("version")
    }

    /// Sum of all parsed file sizes
    pub fn total_size(&self) -> u64 {
        self.records.iter().filter_map(|r| r.file_size).sum()
    }

    /// Number of file records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the manifest has no file records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
