use std::collections::HashSet;

use cfd_store::BackingStore;
use cfd_types::Chunk;
use tracing::{debug, info};

use crate::error::DeployResult;
use crate::lookup::lookup_addresses;

/// Result of filtering a run's chunks against the store.
#[derive(Debug)]
pub struct DedupOutcome<'a> {
    /// Chunks that still need writing, in their original relative order.
    pub pending: Vec<&'a Chunk>,
    /// Chunks whose content the store already held.
    pub already_stored: usize,
    /// Chunks dropped because an earlier pending chunk in this run carries
    /// the same bytes.
    pub repeated: usize,
}

impl DedupOutcome<'_> {
    /// Chunks that will not be written.
    pub fn skipped(&self) -> usize {
        self.already_stored + self.repeated
    }
}

/// Drops chunks whose content is already in the store.
///
/// Read-only: nothing here writes to the store.
#[derive(Clone, Debug)]
pub struct Deduplicator {
    parallelism: usize,
}

impl Deduplicator {
    pub fn new(parallelism: usize) -> Self {
        Self {
            parallelism: parallelism.max(1),
        }
    }

    /// Split `chunks` into those that need writing and those that do not.
    ///
    /// A chunk is pending when its address lookup returns the sentinel and no
    /// earlier pending chunk has identical bytes.
    pub fn filter<'a, S>(&self, store: &S, chunks: &[&'a Chunk]) -> DeployResult<DedupOutcome<'a>>
    where
        S: BackingStore + ?Sized,
    {
        let blobs: Vec<&[u8]> = chunks.iter().map(|c| c.bytes.as_slice()).collect();
        let addresses = lookup_addresses(store, &blobs, self.parallelism)?;

        let mut seen: HashSet<&[u8]> = HashSet::new();
        let mut pending = Vec::new();
        let mut already_stored = 0;
        let mut repeated = 0;

        for (&chunk, address) in chunks.iter().zip(&addresses) {
            if !address.is_null() {
                debug!(file = %chunk.file_name, seq = chunk.sequence_index, %address, "chunk already stored");
                already_stored += 1;
            } else if !seen.insert(chunk.bytes.as_slice()) {
                debug!(file = %chunk.file_name, seq = chunk.sequence_index, "chunk repeats earlier content");
                repeated += 1;
            } else {
                pending.push(chunk);
            }
        }

        info!(
            total = chunks.len(),
            pending = pending.len(),
            already_stored,
            repeated,
            "dedup complete"
        );
        Ok(DedupOutcome {
            pending,
            already_stored,
            repeated,
        })
    }
}

impl Default for Deduplicator {
    fn default() -> Self {
        Self::new(1)
    }
}
