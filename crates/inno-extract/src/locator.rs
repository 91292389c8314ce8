//! Container validation and payload location
//!
//! An Inno Setup installer is a PE executable with the setup data appended.
//! The setup loader's data block starts with a `zlb\x1A` marker; everything
//! after the marker is the payload region scanned for compressed streams.
//!
//! The layout has no trustworthy length-prefixed directory for the installers
//! handled here, so location is purely signature based:
//!
//! - the buffer must start with the `MZ` executable magic
//! - the `Inno Setup Setup Data (x.y.z)` text carries the packager version
//! - the first `zlb\x1A` occurrence marks the payload

use crate::error::{InnoError, Result};
use memchr::memmem;
use regex::bytes::Regex;
use std::sync::LazyLock;
use tracing::debug;

/// Executable container magic
pub const CONTAINER_MAGIC: [u8; 2] = *b"MZ";

/// Text embedded by the packaging tool in every installer
pub const SETUP_DATA_SIGNATURE: &[u8] = b"Inno Setup Setup Data";

/// Marker preceding the payload region
pub const PAYLOAD_MARKER: [u8; 4] = *b"zlb\x1A";

#[allow(clippy::expect_used)]
static VERSION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Inno Setup Setup Data \((\d+\.\d+\.\d+)\)").expect("version pattern is valid")
});

/// Facts derived from a validated container buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
    /// Packager version triplet, e.g. `6.3.0`
    pub version: String,
    /// Offset of the payload marker within the container
    pub payload_offset: usize,
    /// The four bytes found at `payload_offset`
    pub payload_header: [u8; 4],
}

/// Borrowed view of the payload region (the bytes after the marker)
#[derive(Debug, Clone, Copy)]
pub struct PayloadRegion<'a> {
    marker_offset: usize,
    bytes: &'a [u8],
}

impl<'a> PayloadRegion<'a> {
    /// Slice the payload region out of `buffer` given the marker offset
    pub fn new(buffer: &'a [u8], marker_offset: usize) -> Result<Self> {
        let start = marker_offset
            .checked_add(PAYLOAD_MARKER.len())
            .filter(|&start| start <= buffer.len())
            .ok_or_else(|| {
                InnoError::invalid(format!(
                    "payload offset {marker_offset} out of bounds for {} byte container",
                    buffer.len()
                ))
            })?;

        Ok(Self {
            marker_offset,
            bytes: &buffer[start..],
        })
    }

    /// Payload bytes, marker excluded
    pub const fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Offset of the marker within the container
    pub const fn marker_offset(&self) -> usize {
        self.marker_offset
    }

    /// Length of the payload region in bytes
    pub const fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the payload region is empty
    pub const fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Whether the payload embeds a second PE image
    ///
    /// Installers of this shape carry zlib streams that can be scanned
    /// directly. Any other payload uses the LZMA scheme.
    pub fn is_embedded_pe(&self) -> bool {
        self.bytes.starts_with(&CONTAINER_MAGIC)
    }
}

/// Validate the container magic and the packaging-tool signature text
pub fn validate(buffer: &[u8]) -> Result<()> {
    if !buffer.starts_with(&CONTAINER_MAGIC) {
        return Err(InnoError::invalid("Not a valid PE executable"));
    }

    if memmem::find(buffer, SETUP_DATA_SIGNATURE).is_none() {
        return Err(InnoError::invalid("Not an Inno Setup installer"));
    }

    Ok(())
}

/// Extract the packager version from the signature text
pub fn detect_version(buffer: &[u8]) -> Result<String> {
    let captures = VERSION_PATTERN
        .captures(buffer)
        .ok_or_else(|| InnoError::unsupported("Could not detect Inno Setup version"))?;

    // The pattern only admits ASCII digits and dots
    let version = String::from_utf8_lossy(&captures[1]).into_owned();
    debug!("Detected Inno Setup version {}", version);
    Ok(version)
}

/// Offset of the first payload marker in the buffer
pub fn find_payload_offset(buffer: &[u8]) -> Result<usize> {
    let offset = memmem::find(buffer, &PAYLOAD_MARKER)
        .ok_or_else(|| InnoError::invalid("Could not find zlb payload"))?;
    debug!("Found payload marker at offset {:#x}", offset);
    Ok(offset)
}

/// Validate `buffer` and derive every container-level fact at once
pub fn locate(buffer: &[u8]) -> Result<Container> {
    validate(buffer)?;
    let version = detect_version(buffer)?;
    let payload_offset = find_payload_offset(buffer)?;

    let mut payload_header = [0u8; 4];
    payload_header.copy_from_slice(&buffer[payload_offset..payload_offset + PAYLOAD_MARKER.len()]);

    Ok(Container {
        version,
        payload_offset,
        payload_header,
    })
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn container(tail: &[u8]) -> Vec<u8> {
        let mut data = b"MZ\x90\x00stub".to_vec();
        data.extend_from_slice(b"....Inno Setup Setup Data (6.3.3)....");
        data.extend_from_slice(tail);
        data
    }

    #[test]
    fn test_locate_valid_container() {
        let data = container(b"padzlb\x1AMZpayload");
        let located = locate(&data).expect("Test operation should succeed");

        assert_eq!(located.version, "6.3.3");
        assert_eq!(&data[located.payload_offset..][..4], b"zlb\x1A");
        assert_eq!(located.payload_header, PAYLOAD_MARKER);
        assert_eq!(hex::encode(located.payload_header), "7a6c621a");
    }

    #[test]
    fn test_rejects_missing_magic() {
        let mut data = container(b"zlb\x1A");
        data[0] = b'X';
        let err = locate(&data).unwrap_err();
        assert!(err.is_invalid_installer());
    }

    #[test]
    fn test_rejects_missing_signature() {
        let data = b"MZ only a plain executable zlb\x1A".to_vec();
        let err = validate(&data).unwrap_err();
        assert!(err.is_invalid_installer());
        assert!(err.to_string().contains("Not an Inno Setup installer"));
    }

    #[test]
    fn test_unparseable_version_is_unsupported() {
        let data = b"MZ Inno Setup Setup Data (six) zlb\x1A".to_vec();
        assert!(validate(&data).is_ok());
        let err = detect_version(&data).unwrap_err();
        assert!(err.is_unsupported_version());
    }

    #[test]
    fn test_missing_payload_marker() {
        let data = container(b"no marker here");
        let err = find_payload_offset(&data).unwrap_err();
        assert!(err.is_invalid_installer());
        assert!(locate(&data).unwrap_err().is_invalid_installer());
    }

    #[test]
    fn test_signature_and_marker_at_buffer_end() {
        let mut data = b"MZ".to_vec();
        data.extend_from_slice(&[0u8; 17]);
        data.extend_from_slice(SETUP_DATA_SIGNATURE);
        assert!(validate(&data).is_ok());
        assert!(find_payload_offset(&data).unwrap_err().is_invalid_installer());

        data.extend_from_slice(&PAYLOAD_MARKER);
        assert_eq!(find_payload_offset(&data).unwrap(), data.len() - 4);
    }

    #[test]
    fn test_first_marker_wins() {
        let data = container(b"zlb\x1Aaaaazlb\x1Abbbb");
        let first = memmem::find(&data, b"zlb\x1A").unwrap();
        assert_eq!(find_payload_offset(&data).unwrap(), first);
    }

    #[test]
    fn test_payload_region_skips_marker() {
        let data = container(b"zlb\x1AMZrest");
        let offset = find_payload_offset(&data).unwrap();
        let region = PayloadRegion::new(&data, offset).unwrap();

        assert_eq!(region.as_bytes(), b"MZrest");
        assert_eq!(region.marker_offset(), offset);
        assert!(region.is_embedded_pe());
    }

    #[test]
    fn test_payload_region_lzma_classification() {
        let data = container(b"zlb\x1A]\x00\x00\x80\x00");
        let offset = find_payload_offset(&data).unwrap();
        let region = PayloadRegion::new(&data, offset).unwrap();
        assert!(!region.is_embedded_pe());
    }

    #[test]
    fn test_payload_region_at_end_is_empty() {
        let data = container(b"zlb\x1A");
        let offset = find_payload_offset(&data).unwrap();
        let region = PayloadRegion::new(&data, offset).unwrap();
        assert!(region.is_empty());
        assert!(!region.is_embedded_pe());

        assert!(PayloadRegion::new(&data, data.len()).is_err());
    }
}
