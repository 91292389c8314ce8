//! Content hash verification
//!
//! Manifest records carry the SHA-256 of each file as lowercase hex.

use sha2::{Digest, Sha256};

/// Outcome of comparing content against a record's expected hash
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HashCheck {
    /// Content hashes to the expected value
    Match,
    /// Content hashes to something else
    Mismatch {
        /// Hash recorded in the manifest
        expected: String,
        /// Hash of the extracted content
        actual: String,
    },
    /// The record has no hash to compare against
    Unavailable,
}

impl HashCheck {
    /// Whether the content is known to be wrong
    pub const fn is_mismatch(&self) -> bool {
        matches!(self, Self::Mismatch { .. })
    }
}

/// SHA-256 of `data` as lowercase hex
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Compare `data` against an optional expected hash (case-insensitive)
pub fn check(expected: Option<&str>, data: &[u8]) -> HashCheck {
    let Some(expected) = expected.map(str::trim).filter(|h| !h.is_empty()) else {
        return HashCheck::Unavailable;
    };

    let actual = sha256_hex(data);
    if actual.eq_ignore_ascii_case(expected) {
        HashCheck::Match
    } else {
        HashCheck::Mismatch {
            expected: expected.to_string(),
            actual,
        }
    }
}
