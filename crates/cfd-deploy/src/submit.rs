use std::collections::VecDeque;

use cfd_store::{BackingStore, WriteReceipt};
use tracing::{debug, error, info};

use crate::batch::Batch;
use crate::error::{DeployError, DeployResult};

/// Sequential write queue with exactly one write in flight.
///
/// Each batch is written and its receipt checked before the next batch is
/// taken off the queue. The first batch that fails to confirm aborts the
/// run; batches behind it are never issued and nothing already written is
/// rolled back.
#[derive(Debug, Default)]
pub struct SubmissionQueue<'a> {
    queue: VecDeque<Batch<'a>>,
}

impl<'a> SubmissionQueue<'a> {
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }

    /// Queue one batch behind those already queued.
    pub fn enqueue(&mut self, batch: Batch<'a>) {
        self.queue.push_back(batch);
    }

    /// Number of batches not yet submitted.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Drain the queue, writing each batch in order.
    ///
    /// Returns one receipt per batch.
    pub fn run<S>(mut self, store: &S) -> DeployResult<Vec<WriteReceipt>>
    where
        S: BackingStore + ?Sized,
    {
        let total = self.queue.len();
        let mut receipts = Vec::with_capacity(total);

        while let Some(batch) = self.queue.pop_front() {
            let names = batch.names();
            let contents = batch.contents();

            let receipt = store.write(&names, &contents).map_err(|e| {
                error!(batch = batch.index, error = %e, "write failed");
                DeployError::WriteNotConfirmed {
                    batch: batch.index,
                    reason: e.to_string(),
                }
            })?;
            confirm(&batch, &receipt)?;

            debug!(
                batch = batch.index,
                sequence = receipt.sequence,
                chunks = batch.len(),
                newly_stored = receipt.newly_stored(),
                "write confirmed"
            );
            receipts.push(receipt);
        }

        info!(writes = receipts.len(), "all batches confirmed");
        debug_assert_eq!(receipts.len(), total);
        Ok(receipts)
    }
}

impl<'a> Extend<Batch<'a>> for SubmissionQueue<'a> {
    fn extend<I: IntoIterator<Item = Batch<'a>>>(&mut self, iter: I) {
        self.queue.extend(iter);
    }
}

impl<'a> FromIterator<Batch<'a>> for SubmissionQueue<'a> {
    fn from_iter<I: IntoIterator<Item = Batch<'a>>>(iter: I) -> Self {
        Self {
            queue: iter.into_iter().collect(),
        }
    }
}

/// A receipt confirms a batch when it carries one event per chunk, in batch
/// order, with matching names and sizes and a real address.
fn confirm(batch: &Batch<'_>, receipt: &WriteReceipt) -> DeployResult<()> {
    let reject = |reason: String| -> DeployResult<()> {
        error!(batch = batch.index, %reason, "receipt does not confirm batch");
        Err(DeployError::WriteNotConfirmed {
            batch: batch.index,
            reason,
        })
    };

    if receipt.len() != batch.len() {
        return reject(format!(
            "receipt has {} events for {} chunks",
            receipt.len(),
            batch.len()
        ));
    }
    for (i, (chunk, event)) in batch.chunks.iter().zip(&receipt.events).enumerate() {
        if event.name != chunk.file_name {
            return reject(format!(
                "event {i} is tagged {:?}, expected {:?}",
                event.name, chunk.file_name
            ));
        }
        if event.size != chunk.len() as u64 {
            return reject(format!(
                "event {i} reports {} bytes, expected {}",
                event.size,
                chunk.len()
            ));
        }
        if event.address.is_null() {
            return reject(format!("event {i} carries no address"));
        }
    }
    Ok(())
}
