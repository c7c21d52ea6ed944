use cfd_types::ContentAddress;
use serde::{Deserialize, Serialize};

/// Emitted once per blob carried by a write.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteEvent {
    /// Name the blob was tagged with.
    pub name: String,
    /// Address the store assigned to the blob.
    pub address: ContentAddress,
    /// Blob length in bytes.
    pub size: u64,
    /// `false` if the content was already present and nothing new was stored.
    pub newly_stored: bool,
}

/// Confirmation of one committed write operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteReceipt {
    /// 1-based position of this write among all writes the store has accepted.
    pub sequence: u64,
    /// One event per blob, in the order the blobs were submitted.
    pub events: Vec<WriteEvent>,
}

impl WriteReceipt {
    /// Number of events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns `true` if the receipt carries no events.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events whose content was not previously stored.
    pub fn newly_stored(&self) -> usize {
        self.events.iter().filter(|e| e.newly_stored).count()
    }

    /// Bytes of newly stored content.
    pub fn bytes_stored(&self) -> u64 {
        self.events
            .iter()
            .filter(|e| e.newly_stored)
            .map(|e| e.size)
            .sum()
    }
}
