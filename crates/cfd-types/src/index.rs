use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::address::ContentAddress;

/// One file's entry in a [`DeployedFileIndex`].
///
/// `addresses` holds one address per chunk, in the order the chunks were cut
/// from the compressed stream. Reconstruction concatenates chunk bytes in
/// exactly this order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployedFile {
    pub name: String,
    pub addresses: Vec<ContentAddress>,
    /// Sum of all chunk lengths (the compressed stream length).
    pub compressed_len: u64,
    /// Length of the original text in bytes.
    pub raw_len: u64,
    /// Hex BLAKE3 content digest of the original text.
    pub raw_digest: String,
}

impl DeployedFile {
    /// Number of chunks the file was split into.
    pub fn chunk_count(&self) -> usize {
        self.addresses.len()
    }

    /// Returns `true` if every address is resolved (non-sentinel).
    pub fn is_fully_resolved(&self) -> bool {
        self.addresses.iter().all(|a| !a.is_null())
    }
}

/// Mapping from file name to its ordered chunk addresses.
///
/// Built once, by address resolution, at the end of a deployment run. Entries
/// iterate in file-name order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeployedFileIndex {
    files: BTreeMap<String, DeployedFile>,
}

impl DeployedFileIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a file by name.
    pub fn get(&self, name: &str) -> Option<&DeployedFile> {
        self.files.get(name)
    }

    /// The ordered address list for a file.
    pub fn addresses(&self, name: &str) -> Option<&[ContentAddress]> {
        self.files.get(name).map(|f| f.addresses.as_slice())
    }

    /// Returns `true` if the index has an entry for `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.files.contains_key(name)
    }

    /// Iterate entries in file-name order.
    pub fn iter(&self) -> impl Iterator<Item = &DeployedFile> {
        self.files.values()
    }

    /// File names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    /// Number of files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns `true` if the index has no files.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Total chunk addresses across all files.
    pub fn total_chunks(&self) -> usize {
        self.files.values().map(DeployedFile::chunk_count).sum()
    }

    /// Total addresses that are not the sentinel.
    pub fn resolved_chunks(&self) -> usize {
        self.files
            .values()
            .flat_map(|f| f.addresses.iter())
            .filter(|a| !a.is_null())
            .count()
    }
}

impl FromIterator<DeployedFile> for DeployedFileIndex {
    fn from_iter<I: IntoIterator<Item = DeployedFile>>(iter: I) -> Self {
        Self {
            files: iter.into_iter().map(|f| (f.name.clone(), f)).collect(),
        }
    }
}

impl<'a> IntoIterator for &'a DeployedFileIndex {
    type Item = &'a DeployedFile;
    type IntoIter = std::collections::btree_map::Values<'a, String, DeployedFile>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.values()
    }
}
