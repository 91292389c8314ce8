//! inno-extract binary entry point.
//!
//! Thin wrapper around the inno-extract library that:
//! 1. Parses command-line arguments
//! 2. Initializes logging
//! 3. Opens the installer
//! 4. Runs the selected subcommand
//!
//! For library usage, see the inno-extract crate documentation.

use anyhow::{Context, Result, bail};
use inno_extract::{CliConfig, Command, ExtractOptions, Installer, LogFormat, SUPPORTED_VERSION};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let config = CliConfig::from_args();
    init_logging(config.log_format);

    config.validate()?;

    let installer = Installer::open_with_options(config.installer(), config.installer_options())
        .with_context(|| format!("Failed to open {}", config.installer().display()))?;

    match &config.command {
        Command::Info { .. } => info(&installer),
        Command::List { .. } => list(&installer),
        Command::Extract { output, verify, .. } => {
            let options = ExtractOptions {
                verify_hashes: *verify,
            };
            let report = installer.extract_to_with(output, &options)?;

            println!(
                "Extracted {} files to {}",
                report.files_written,
                output.display()
            );
            if !report.skipped_unsafe.is_empty() {
                println!(
                    "Skipped {} files with unsafe paths",
                    report.skipped_unsafe.len()
                );
            }
            if !report.hash_mismatches.is_empty() {
                for mismatch in &report.hash_mismatches {
                    eprintln!("Hash mismatch: {}", mismatch.path.display());
                }
                bail!(
                    "{} extracted files failed hash verification",
                    report.hash_mismatches.len()
                );
            }
            Ok(())
        }
    }
}

fn init_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn info(installer: &Installer) -> Result<()> {
    let offset = installer.payload_offset()?;
    let header = installer.payload_header()?;
    let format = if installer.is_embedded_pe()? {
        "embedded PE (zlib streams)"
    } else {
        "LZMA (unsupported)"
    };

    println!("Version:        {}", installer.version()?);
    println!("Developed for:  {SUPPORTED_VERSION}");
    println!("Payload offset: {offset:#x}");
    println!("Payload header: {}", hex::encode(header));
    println!("Payload format: {format}");

    if installer.is_embedded_pe()? {
        println!("Zlib streams:   {}", installer.streams()?.len());
    }
    Ok(())
}

fn list(installer: &Installer) -> Result<()> {
    let manifest = installer.manifest()?;

    for (key, value) in &manifest.metadata {
        println!(";; {key} = {value}");
    }

    let streams = installer.file_streams()?;
    for (record, stream) in manifest.records.iter().zip(streams) {
        let size = record
            .file_size
            .map_or_else(|| "-".to_string(), |size| size.to_string());
        let status = if stream.is_some() { "matched" } else { "missing" };
        println!(
            "{size:>12}  {status:<8} {:<64}  {}",
            record.file_hash.as_deref().unwrap_or("-"),
            record.normalized_path().unwrap_or_default()
        );
    }

    println!(
        "{} files, {} bytes total",
        manifest.len(),
        manifest.total_size()
    );
    Ok(())
}
