//! Command-line configuration
//!
//! Settings come from CLI arguments, `INNO_EXTRACT_*` environment variables
//! or defaults, in that order of precedence.
//!
//! # Example
//!
//! ```no_run
//! use inno_extract::CliConfig;
//!
//! let config = CliConfig::from_args();
//! config.validate().expect("Invalid configuration");
//!
//! let options = config.installer_options();
//! println!("Manifest threshold: {} bytes", options.manifest.min_size);
//! ```

use crate::error::ConfigError;
use crate::installer::InstallerOptions;
use crate::scanner::{DEFAULT_MAX_WINDOW, DEFAULT_MIN_SIZE, MANIFEST_MIN_SIZE, ScanOptions};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Configuration loaded from CLI args and environment variables.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "inno-extract",
    about = "Extract files from Inno Setup installers with embedded zlib payloads",
    version
)]
pub struct CliConfig {
    /// Log output format
    #[arg(
        long,
        global = true,
        value_enum,
        env = "INNO_EXTRACT_LOG_FORMAT",
        default_value_t = LogFormat::Text
    )]
    pub log_format: LogFormat,

    /// Minimum decompressed size for file streams (exclusive)
    #[arg(
        long,
        global = true,
        env = "INNO_EXTRACT_MIN_STREAM_SIZE",
        default_value_t = DEFAULT_MIN_SIZE
    )]
    pub min_stream_size: usize,

    /// Minimum decompressed size for the manifest stream (exclusive)
    #[arg(
        long,
        global = true,
        env = "INNO_EXTRACT_MANIFEST_MIN_SIZE",
        default_value_t = MANIFEST_MIN_SIZE
    )]
    pub manifest_min_size: usize,

    /// Maximum compressed bytes handed to one decompression attempt
    #[arg(
        long,
        global = true,
        env = "INNO_EXTRACT_MAX_WINDOW",
        default_value_t = DEFAULT_MAX_WINDOW
    )]
    pub max_window: usize,

    /// Operation to run
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Show version, payload location and format of an installer
    Info {
        /// Installer executable
        installer: PathBuf,
    },
    /// List manifest metadata and file records
    List {
        /// Installer executable
        installer: PathBuf,
    },
    /// Extract files into a directory
    Extract {
        /// Installer executable
        installer: PathBuf,
        /// Output directory (created if missing)
        output: PathBuf,
        /// Check extracted files against the manifest SHA-256 hashes
        #[arg(long, env = "INNO_EXTRACT_VERIFY")]
        verify: bool,
    },
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    Text,
    /// One JSON object per event
    Json,
}

impl CliConfig {
    /// Parse configuration from command-line arguments.
    #[must_use]
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Installer path of the selected subcommand
    pub fn installer(&self) -> &PathBuf {
        match &self.command {
            Command::Info { installer }
            | Command::List { installer }
            | Command::Extract { installer, .. } => installer,
        }
    }

    /// Scan settings for both passes
    pub fn installer_options(&self) -> InstallerOptions {
        let streams = ScanOptions {
            min_size: self.min_stream_size,
            max_window: self.max_window,
            ..ScanOptions::default()
        };

        InstallerOptions {
            streams,
            manifest: streams.with_min_size(self.manifest_min_size),
        }
    }

    /// Validate configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - the scan window is zero
    /// - the manifest threshold is below the file stream threshold
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_window == 0 {
            return Err(ConfigError::InvalidValue {
                name: "--max-window",
                reason: "must be greater than zero".to_string(),
            });
        }

        if self.manifest_min_size < self.min_stream_size {
            return Err(ConfigError::InvalidValue {
                name: "--manifest-min-size",
                reason: format!(
                    "{} is below --min-stream-size {}",
                    self.manifest_min_size, self.min_stream_size
                ),
            });
        }

        Ok(())
    }
}
