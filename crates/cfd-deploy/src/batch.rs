use cfd_types::Chunk;
use serde::Serialize;
use tracing::debug;

use crate::error::{DeployError, DeployResult};

/// Chunks submitted together in one write.
#[derive(Clone, Debug)]
pub struct Batch<'a> {
    /// 0-based position among the run's batches.
    pub index: usize,
    pub chunks: Vec<&'a Chunk>,
}

impl Batch<'_> {
    /// Owning file name for each chunk, index-aligned with [`Self::contents`].
    pub fn names(&self) -> Vec<&str> {
        self.chunks.iter().map(|c| c.file_name.as_str()).collect()
    }

    pub fn contents(&self) -> Vec<&[u8]> {
        self.chunks.iter().map(|c| c.bytes.as_slice()).collect()
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Sum of chunk payload lengths.
    pub fn payload_bytes(&self) -> u64 {
        self.chunks.iter().map(|c| c.len() as u64).sum()
    }
}

/// Partitions pending chunks into consecutive groups of bounded size.
#[derive(Clone, Debug)]
pub struct Batcher {
    max_chunks_per_tx: usize,
}

impl Batcher {
    pub fn new(max_chunks_per_tx: usize) -> DeployResult<Self> {
        if max_chunks_per_tx == 0 {
            return Err(DeployError::InvalidConfig(
                "max_chunks_per_tx must be at least 1".into(),
            ));
        }
        Ok(Self { max_chunks_per_tx })
    }

    pub fn max_chunks_per_tx(&self) -> usize {
        self.max_chunks_per_tx
    }

    /// Cut `pending` into batches without reordering.
    ///
    /// Every batch holds exactly `max_chunks_per_tx` chunks except possibly
    /// the last.
    pub fn plan<'a>(&self, pending: &[&'a Chunk]) -> Vec<Batch<'a>> {
        let batches: Vec<Batch<'a>> = pending
            .chunks(self.max_chunks_per_tx)
            .enumerate()
            .map(|(index, group)| Batch {
                index,
                chunks: group.to_vec(),
            })
            .collect();
        debug!(
            chunks = pending.len(),
            batches = batches.len(),
            max_chunks_per_tx = self.max_chunks_per_tx,
            "planned batches"
        );
        batches
    }
}

/// Summary of the writes a run would issue, computed without writing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TxPlan {
    pub files: usize,
    /// Chunks produced by encoding, before dedup.
    pub chunks: usize,
    /// Chunks that would be written.
    pub pending_chunks: usize,
    pub already_stored: usize,
    pub repeated: usize,
    /// Number of writes that would be issued.
    pub batches: usize,
    /// Chunks per planned write, in submission order.
    pub batch_sizes: Vec<usize>,
    pub payload_bytes: u64,
}

impl TxPlan {
    /// Returns `true` if nothing would be written.
    pub fn is_noop(&self) -> bool {
        self.batches == 0
    }
}
