use serde::{Deserialize, Serialize};

/// A source file as read from a directory listing.
///
/// Immutable once read. `name` is the path relative to the source root, with
/// `/` separators, and doubles as the file's key in a deployed index.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub name: String,
    pub raw_content: String,
}

impl FileRecord {
    /// Create a new file record.
    pub fn new(name: impl Into<String>, raw_content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            raw_content: raw_content.into(),
        }
    }

    /// Length of the raw text in bytes.
    pub fn raw_len(&self) -> u64 {
        self.raw_content.len() as u64
    }
}
