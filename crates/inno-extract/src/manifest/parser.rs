//! Line-oriented manifest parsing

use super::Manifest;
use super::record::ColumnMap;
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, trace};

/// Prefix of metadata comment lines
pub const COMMENT_MARKER: &str = ";;";

#[allow(clippy::expect_used)]
static METADATA_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^;;\s*(\S+)\s*=\s*(.+)$").expect("metadata pattern is valid")
});

pub(super) fn parse_text(text: &str) -> Manifest {
    let mut manifest = Manifest::default();
    let mut table = Vec::new();

    for line in text.lines() {
        if line.starts_with(COMMENT_MARKER) {
            if let Some((key, value)) = parse_metadata_line(line) {
                manifest.metadata.insert(key, value);
            }
        } else if !line.trim().is_empty() {
            table.push(line);
        }
    }

    let Some((header_line, rows)) = table.split_first() else {
        return manifest;
    };
    let Some(header) = parse_row(header_line) else {
        debug!("Manifest header row is not valid CSV");
        return manifest;
    };

    let columns = ColumnMap::from_header(header.as_slice());
    let mut dropped = 0usize;

    for line in rows {
        match parse_row(line) {
            Some(values) if values.len() >= header.len() => {
                manifest.records.push(columns.project(values.as_slice()));
            }
            _ => {
                dropped += 1;
                trace!("Dropped manifest row: {}", line);
            }
        }
    }

    debug!(
        "Parsed manifest: {} metadata entries, {} records, {} rows dropped",
        manifest.metadata.len(),
        manifest.records.len(),
        dropped
    );

    manifest
}

/// Parse a `;; key = value` line into a normalised key and unquoted value
pub(super) fn parse_metadata_line(line: &str) -> Option<(String, String)> {
    let captures = METADATA_PATTERN.captures(line)?;
    let key = normalize_key(&captures[1]);
    let value = captures[2].trim();
    let value = value.strip_prefix('"').unwrap_or(value);
    let value = value.strip_suffix('"').unwrap_or(value);
    Some((key, value.to_string()))
}

fn normalize_key(key: &str) -> String {
    key.chars()
        .map(|c| match c {
            '.' | '-' => '_',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}

/// Parse one line as a single CSV record
///
/// Rows with a quote inside an unquoted field, an unterminated quoted
/// field, or text after a closing quote are rejected.
fn parse_row(line: &str) -> Option<Vec<String>> {
    if !is_well_quoted(line) {
        return None;
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes());
    let mut record = csv::StringRecord::new();

    match reader.read_record(&mut record) {
        Ok(true) => Some(record.iter().map(str::to_string).collect()),
        Ok(false) | Err(_) => None,
    }
}

/// Check RFC 4180 quoting for one line
fn is_well_quoted(line: &str) -> bool {
    let mut chars = line.chars().peekable();

    loop {
        if chars.peek() == Some(&'"') {
            chars.next();
            loop {
                match chars.next() {
                    None => return false,
                    Some('"') if chars.peek() == Some(&'"') => {
                        chars.next();
                    }
                    Some('"') => break,
                    Some(_) => {}
                }
            }
            match chars.next() {
                None => return true,
                Some(',') => continue,
                Some('\r') if chars.peek().is_none() => return true,
                Some(_) => return false,
            }
        }

        loop {
            match chars.next() {
                None => return true,
                Some(',') => break,
                Some('"') => return false,
                Some(_) => {}
            }
        }
    }
}
