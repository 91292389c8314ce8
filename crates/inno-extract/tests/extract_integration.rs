#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
//! End-to-end extraction tests against synthetic installers
//!
//! Each installer is assembled in memory: an `MZ` stub, the setup data
//! signature, the `zlb\x1A` marker, and an embedded-PE payload holding the
//! zlib-compressed manifest followed by one zlib stream per file.

use flate2::Compression;
use flate2::write::ZlibEncoder;
use inno_extract::verify::sha256_hex;
use inno_extract::{ExtractOptions, Installer};
use pretty_assertions::assert_eq;
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;
use walkdir::WalkDir;

struct TestFile {
    path: &'static str,
    content: Vec<u8>,
}

impl TestFile {
    fn new(path: &'static str, seed: &str, repeat: usize) -> Self {
        Self {
            path,
            content: format!("{seed} ").repeat(repeat).into_bytes(),
        }
    }
}

fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

fn manifest_for(files: &[TestFile]) -> String {
    let mut text = String::new();
    text.push_str(";; Product = \"Synthetic App\"\n");
    text.push_str(";; Component = core\n");
    text.push_str(";; Version = 2.4.1\n");
    for i in 0..20 {
        text.push_str(&format!(
            ";; Padding.{i} = keeps the manifest above the strict threshold\n"
        ));
    }
    text.push_str(
        "FileKey,EncodedSize,Encoding,FileIntent,Options,InstallPath,FileHash,FileSize\n",
    );
    for (i, file) in files.iter().enumerate() {
        text.push_str(&format!(
            "key{i},{},zlib,copy,,{},{},{}\n",
            zlib(&file.content).len(),
            file.path,
            sha256_hex(&file.content),
            file.content.len()
        ));
    }
    text
}

fn build_installer(files: &[TestFile]) -> Vec<u8> {
    build_installer_with(files, files)
}

/// Installer whose manifest lists `listed` while only `stored` have streams
fn build_installer_with(listed: &[TestFile], stored: &[TestFile]) -> Vec<u8> {
    let mut data = b"MZ\x90\x00\x03\x00\x00\x00".to_vec();
    data.extend_from_slice(&[0u8; 120]);
    data.extend_from_slice(b"Inno Setup Setup Data (6.3.0)");
    data.extend_from_slice(&[0u8; 40]);
    data.extend_from_slice(b"zlb\x1A");

    data.extend_from_slice(b"MZ");
    data.extend_from_slice(&[0u8; 64]);
    data.extend_from_slice(&zlib(manifest_for(listed).as_bytes()));
    for file in stored {
        data.extend_from_slice(&[0u8; 16]);
        data.extend_from_slice(&zlib(&file.content));
    }
    data.extend_from_slice(&[0u8; 16]);
    data
}

fn sample_files() -> Vec<TestFile> {
    vec![
        TestFile::new("app\\bin\\synthetic.exe", "binary payload", 40),
        TestFile::new("app\\readme.txt", "read me first", 25),
        TestFile::new("app\\data\\levels.dat", "level data block", 60),
    ]
}

fn files_under(root: &Path) -> usize {
    WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .count()
}

#[test]
fn extract_distinct_sizes_writes_every_file() {
    let files = sample_files();
    let installer = Installer::from_bytes(build_installer(&files)).unwrap();
    let temp = TempDir::new().expect("Failed to create temp dir");

    let written = installer.extract_to(temp.path()).unwrap();

    assert_eq!(written, files.len());
    assert_eq!(files_under(temp.path()), files.len());
    for file in &files {
        let target = temp.path().join(file.path.replace('\\', "/"));
        let content = std::fs::read(&target)
            .unwrap_or_else(|e| panic!("Missing {}: {}", target.display(), e));
        assert_eq!(content, file.content);
    }
}

#[test]
fn extract_creates_nested_output_directory() {
    let files = sample_files();
    let installer = Installer::from_bytes(build_installer(&files)).unwrap();
    let temp = TempDir::new().expect("Failed to create temp dir");
    let output = temp.path().join("not").join("there").join("yet");

    installer.extract_to(&output).unwrap();

    assert!(output.join("app/readme.txt").is_file());
}

#[test]
fn extract_with_verification_reports_no_mismatches() {
    let files = sample_files();
    let installer = Installer::from_bytes(build_installer(&files)).unwrap();
    let temp = TempDir::new().expect("Failed to create temp dir");

    let report = installer
        .extract_to_with(
            temp.path(),
            &ExtractOptions {
                verify_hashes: true,
            },
        )
        .unwrap();

    assert_eq!(report.files_written, 3);
    assert_eq!(report.skipped, 0);
    assert!(report.hash_mismatches.is_empty());
}

#[test]
fn manifest_metadata_and_records() {
    let files = sample_files();
    let installer = Installer::from_bytes(build_installer(&files)).unwrap();

    assert_eq!(installer.version().unwrap(), "6.3.0");
    assert!(installer.is_embedded_pe().unwrap());

    let manifest = installer.manifest().unwrap();
    assert_eq!(manifest.product(), Some("Synthetic App"));
    assert_eq!(manifest.component(), Some("core"));
    assert_eq!(manifest.version(), Some("2.4.1"));
    assert_eq!(
        manifest.get("padding_0"),
        Some("keeps the manifest above the strict threshold")
    );
    assert_eq!(manifest.len(), 3);

    let paths: Vec<_> = manifest
        .records
        .iter()
        .map(|r| r.normalized_path().unwrap())
        .collect();
    assert_eq!(
        paths,
        vec!["app/bin/synthetic.exe", "app/readme.txt", "app/data/levels.dat"]
    );

    let expected_total: usize = files.iter().map(|f| f.content.len()).sum();
    assert_eq!(manifest.total_size(), expected_total as u64);
}

#[test]
fn shared_sizes_are_assigned_in_stream_order() {
    let files = vec![
        TestFile::new("first.txt", "aaaa", 50),
        TestFile::new("second.txt", "bbbb", 50),
    ];
    assert_eq!(files[0].content.len(), files[1].content.len());

    let installer = Installer::from_bytes(build_installer(&files)).unwrap();
    let streams = installer.file_streams().unwrap();

    assert_eq!(streams.len(), 2);
    assert_eq!(streams[0], Some(files[0].content.as_slice()));
    assert_eq!(streams[1], Some(files[1].content.as_slice()));
}

#[test]
fn record_without_stream_is_not_written() {
    let files = sample_files();
    let data = build_installer_with(&files, &files[..2]);

    let installer = Installer::from_bytes(data).unwrap();
    let temp = TempDir::new().expect("Failed to create temp dir");
    let report = installer
        .extract_to_with(temp.path(), &ExtractOptions::default())
        .unwrap();

    assert_eq!(report.files_written, 2);
    assert_eq!(report.skipped, 1);
    assert!(!temp.path().join("app/data/levels.dat").exists());
}

#[test]
fn open_from_disk() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let setup = temp.path().join("setup.exe");
    std::fs::write(&setup, build_installer(&sample_files())).unwrap();

    let installer = Installer::open(&setup).unwrap();
    assert_eq!(installer.path(), Some(setup.as_path()));
    assert_eq!(installer.manifest().unwrap().len(), 3);
}

#[test]
fn lzma_payload_is_rejected_before_writing() {
    let mut data = b"MZ".to_vec();
    data.extend_from_slice(&[0u8; 30]);
    data.extend_from_slice(b"Inno Setup Setup Data (5.5.9)");
    data.extend_from_slice(b"zlb\x1A");
    data.extend_from_slice(&[0x5D, 0x00, 0x00, 0x80, 0x00]);
    data.extend_from_slice(&[0xAB; 256]);

    let installer = Installer::from_bytes(data).unwrap();
    assert_eq!(installer.version().unwrap(), "5.5.9");
    assert!(!installer.is_embedded_pe().unwrap());

    let temp = TempDir::new().expect("Failed to create temp dir");
    let output = temp.path().join("out");
    let err = installer.extract_to(&output).unwrap_err();
    assert!(err.is_unsupported_version());
    assert!(!output.exists());
}

#[test]
fn non_installers_are_rejected() {
    let err = Installer::from_bytes(b"\x7fELF not a pe file".to_vec()).unwrap_err();
    assert_eq!(err.to_string(), "Invalid installer: Not a valid PE executable");

    let err = Installer::from_bytes(b"MZ ordinary program".to_vec()).unwrap_err();
    assert_eq!(err.to_string(), "Invalid installer: Not an Inno Setup installer");
}
