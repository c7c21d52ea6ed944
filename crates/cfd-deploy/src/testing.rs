//! Fault-injecting store for exercising the pipeline's failure paths.

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};

use cfd_store::{BackingStore, InMemoryBackingStore, StoreError, StoreResult, WriteReceipt};
use cfd_types::ContentAddress;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Fault {
    /// The nth write (1-based) fails outright.
    FailWrite(u64),
    /// Writes return a well-formed receipt but store nothing.
    SkipCommit,
    /// Receipts are missing their last event.
    DropEvent,
    /// Receipts report the sentinel as the first blob's address.
    NullAddress,
    /// `addresses_of` returns one address fewer than asked for.
    ShortLookup,
    /// Every lookup fails.
    FailLookups,
}

/// Wraps an [`InMemoryBackingStore`] and misbehaves in one chosen way.
pub(crate) struct FaultyStore {
    inner: InMemoryBackingStore,
    fault: Fault,
    attempts: AtomicU64,
}

impl FaultyStore {
    pub(crate) fn new(fault: Fault) -> Self {
        Self {
            inner: InMemoryBackingStore::new(),
            fault,
            attempts: AtomicU64::new(0),
        }
    }

    pub(crate) fn inner(&self) -> &InMemoryBackingStore {
        &self.inner
    }
}

fn injected(what: &str) -> StoreError {
    StoreError::Io(io::Error::new(io::ErrorKind::Other, format!("injected fault: {what}")))
}

impl BackingStore for FaultyStore {
    fn write(&self, names: &[&str], contents: &[&[u8]]) -> StoreResult<WriteReceipt> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        match self.fault {
            Fault::FailWrite(n) if attempt == n => Err(injected("write failed")),
            Fault::SkipCommit => {
                // Build the receipt a real write would have produced, then
                // throw the content away.
                let scratch = InMemoryBackingStore::new();
                let mut receipt = scratch.write(names, contents)?;
                receipt.sequence = attempt;
                Ok(receipt)
            }
            Fault::DropEvent => {
                let mut receipt = self.inner.write(names, contents)?;
                receipt.events.pop();
                Ok(receipt)
            }
            Fault::NullAddress => {
                let mut receipt = self.inner.write(names, contents)?;
                if let Some(event) = receipt.events.first_mut() {
                    event.address = ContentAddress::null();
                }
                Ok(receipt)
            }
            _ => self.inner.write(names, contents),
        }
    }

    fn address_of(&self, blob: &[u8]) -> StoreResult<ContentAddress> {
        match self.fault {
            Fault::FailLookups => Err(injected("lookup failed")),
            _ => self.inner.address_of(blob),
        }
    }

    fn addresses_of(&self, blobs: &[&[u8]]) -> StoreResult<Vec<ContentAddress>> {
        match self.fault {
            Fault::FailLookups => Err(injected("lookup failed")),
            Fault::ShortLookup => {
                let mut addresses = self.inner.addresses_of(blobs)?;
                addresses.pop();
                Ok(addresses)
            }
            _ => self.inner.addresses_of(blobs),
        }
    }

    fn read(&self, address: &ContentAddress) -> StoreResult<Option<Vec<u8>>> {
        self.inner.read(address)
    }

    fn write_count(&self) -> u64 {
        self.inner.write_count()
    }
}
