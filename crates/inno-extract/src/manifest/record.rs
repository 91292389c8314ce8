//! Manifest file records and header column lookup

/// Column header that identifies the manifest table
pub const MANIFEST_MARKER: &str = "FileKey";

/// Canonical manifest columns, in table order
pub const COLUMNS: [&str; 8] = [
    "FileKey",
    "EncodedSize",
    "Encoding",
    "FileIntent",
    "Options",
    "InstallPath",
    "FileHash",
    "FileSize",
];

/// One file entry of the manifest
///
/// Every field is optional: a column missing from the header, an empty cell
/// and an integer column that does not parse all leave the field unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestRecord {
    /// Opaque file identifier
    pub file_key: Option<String>,
    /// Size of the stored (compressed) data
    pub encoded_size: Option<u64>,
    /// Encoding label of the stored data
    pub encoding: Option<String>,
    /// Installer intent for the file
    pub file_intent: Option<String>,
    /// Free-form option flags
    pub options: Option<String>,
    /// Destination path relative to the install root, `\` separated
    pub install_path: Option<String>,
    /// SHA-256 of the file contents, hex encoded
    pub file_hash: Option<String>,
    /// Size of the file contents; the only key used to pair streams
    pub file_size: Option<u64>,
}

impl ManifestRecord {
    /// Install path with `/` separators, if present and non-empty
    pub fn normalized_path(&self) -> Option<String> {
        self.install_path
            .as_deref()
            .filter(|path| !path.is_empty())
            .map(|path| path.replace('\\', "/"))
    }
}

/// Position of each canonical column within a parsed header row
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ColumnMap {
    file_key: Option<usize>,
    encoded_size: Option<usize>,
    encoding: Option<usize>,
    file_intent: Option<usize>,
    options: Option<usize>,
    install_path: Option<usize>,
    file_hash: Option<usize>,
    file_size: Option<usize>,
}

impl ColumnMap {
    /// Resolve column positions from header names
    ///
    /// A name repeated in the header resolves to its last occurrence.
    pub(crate) fn from_header<S: AsRef<str>>(header: &[S]) -> Self {
        let position = |name: &str| {
            header
                .iter()
                .rposition(|column| AsRef::<str>::as_ref(column) == name)
        };

        Self {
            file_key: position("FileKey"),
            encoded_size: position("EncodedSize"),
            encoding: position("Encoding"),
            file_intent: position("FileIntent"),
            options: position("Options"),
            install_path: position("InstallPath"),
            file_hash: position("FileHash"),
            file_size: position("FileSize"),
        }
    }

    /// Project a data row onto a record
    pub(crate) fn project<S: AsRef<str>>(&self, row: &[S]) -> ManifestRecord {
        let text = |index: Option<usize>| {
            index
                .and_then(|i| row.get(i))
                .map(|value| AsRef::<str>::as_ref(value))
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };
        let integer = |index: Option<usize>| text(index).and_then(|v| v.trim().parse::<u64>().ok());

        ManifestRecord {
            file_key: text(self.file_key),
            encoded_size: integer(self.encoded_size),
            encoding: text(self.encoding),
            file_intent: text(self.file_intent),
            options: text(self.options),
            install_path: text(self.install_path),
            file_hash: text(self.file_hash),
            file_size: integer(self.file_size),
        }
    }
}
