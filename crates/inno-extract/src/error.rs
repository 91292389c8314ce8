//! Error types for installer extraction.
//!
//! Only structural failures surface here. Heuristic noise (a candidate
//! position that does not decompress, a malformed manifest row) is absorbed
//! where it happens and never becomes an [`InnoError`].

use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while reading, classifying or extracting an installer.
///
/// The type is `Clone` so a failed stage can be cached by
/// [`Installer`](crate::Installer) and reported again on later access.
#[derive(Debug, Clone, Error)]
pub enum InnoError {
    /// The input is not an installer this crate understands
    #[error("Invalid installer: {0}")]
    InvalidInstaller(String),

    /// The installer version could not be detected, or its payload uses the
    /// LZMA scheme that cannot be scanned directly
    #[error("Unsupported version: {0}")]
    UnsupportedVersion(String),

    /// Reading the container or writing an extracted file failed
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path being read or written
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: Arc<std::io::Error>,
    },
}

impl InnoError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidInstaller(reason.into())
    }

    pub(crate) fn unsupported(reason: impl Into<String>) -> Self {
        Self::UnsupportedVersion(reason.into())
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source: Arc::new(source),
        }
    }

    /// Whether this is the [`InnoError::InvalidInstaller`] kind
    pub const fn is_invalid_installer(&self) -> bool {
        matches!(self, Self::InvalidInstaller(_))
    }

    /// Whether this is the [`InnoError::UnsupportedVersion`] kind
    pub const fn is_unsupported_version(&self) -> bool {
        matches!(self, Self::UnsupportedVersion(_))
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, InnoError>;

/// Command-line configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A setting has a value that cannot work
    #[error("Invalid value for {name}: {reason}")]
    InvalidValue {
        /// Setting name as given on the command line
        name: &'static str,
        /// Why the value was rejected
        reason: String,
    },
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = InnoError::invalid("Not a valid PE executable");
        assert_eq!(err.to_string(), "Invalid installer: Not a valid PE executable");
        assert!(err.is_invalid_installer());
        assert!(!err.is_unsupported_version());

        let err = InnoError::unsupported("LZMA format not yet supported");
        assert_eq!(
            err.to_string(),
            "Unsupported version: LZMA format not yet supported"
        );
        assert!(err.is_unsupported_version());
    }

    #[test]
    fn test_io_error_clones_source() {
        let err = InnoError::io(
            "out/file.bin",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let cloned = err.clone();
        assert_eq!(err.to_string(), cloned.to_string());
        assert!(std::error::Error::source(&cloned).is_some());
    }
}
