use cfd_codec::EncodedFile;
use cfd_store::BackingStore;
use cfd_types::{ContentAddress, DeployedFile, DeployedFileIndex};
use tracing::{info, warn};

use crate::error::{DeployError, DeployResult};
use crate::lookup::lookup_addresses;

/// Builds the deployed file index once every write has been confirmed.
#[derive(Clone, Debug)]
pub struct AddressResolver {
    parallelism: usize,
}

impl AddressResolver {
    pub fn new(parallelism: usize) -> Self {
        Self {
            parallelism: parallelism.max(1),
        }
    }

    /// Re-query the address of every chunk of every file.
    ///
    /// Chunks skipped by dedup are looked up too. Each address lands in its
    /// file's slot at the chunk's sequence index, so the index does not depend
    /// on lookup order. Files that produced no chunks get an empty entry.
    ///
    /// Fails with [`DeployError::AddressIntegrity`] if any chunk still
    /// resolves to the sentinel.
    pub fn resolve<S>(&self, store: &S, files: &[EncodedFile]) -> DeployResult<DeployedFileIndex>
    where
        S: BackingStore + ?Sized,
    {
        let blobs: Vec<&[u8]> = files
            .iter()
            .flat_map(|f| f.chunks.iter().map(|c| c.bytes.as_slice()))
            .collect();
        let addresses = lookup_addresses(store, &blobs, self.parallelism)?;

        let expected = blobs.len();
        let mut resolved = 0usize;
        let mut missing = Vec::new();
        let mut lookups = addresses.into_iter();
        let mut entries = Vec::with_capacity(files.len());

        for file in files {
            let mut slots = vec![ContentAddress::null(); file.chunks.len()];
            for chunk in &file.chunks {
                let Some(address) = lookups.next() else {
                    break;
                };
                match slots.get_mut(chunk.sequence_index) {
                    Some(slot) if slot.is_null() && !address.is_null() => {
                        *slot = address;
                        resolved += 1;
                    }
                    _ => missing.push(format!("{}#{}", file.name, chunk.sequence_index)),
                }
            }
            entries.push(DeployedFile {
                name: file.name.clone(),
                addresses: slots,
                compressed_len: file.compressed_len,
                raw_len: file.raw_len,
                raw_digest: file.raw_digest.clone(),
            });
        }

        if resolved != expected {
            warn!(resolved, expected, missing = ?missing, "chunks left unresolved");
            return Err(DeployError::AddressIntegrity {
                resolved,
                expected,
                missing,
            });
        }

        let index: DeployedFileIndex = entries.into_iter().collect();
        info!(files = index.len(), chunks = expected, "address resolution complete");
        Ok(index)
    }
}

impl Default for AddressResolver {
    fn default() -> Self {
        Self::new(1)
    }
}
