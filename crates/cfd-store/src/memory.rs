use std::collections::HashMap;
use std::sync::RwLock;

use cfd_crypto::ContentHasher;
use cfd_types::ContentAddress;
use tracing::debug;

use crate::error::StoreResult;
use crate::receipt::{WriteEvent, WriteReceipt};
use crate::traits::{validate_write, BackingStore};

#[derive(Clone, Debug)]
struct StoredBlob {
    tag: String,
    data: Vec<u8>,
}

#[derive(Default)]
struct Inner {
    blobs: HashMap<ContentAddress, StoredBlob>,
    writes: u64,
}

/// In-memory, HashMap-based backing store.
///
/// Intended for tests and embedding. All blobs are held in memory behind a
/// `RwLock` for safe concurrent access. A blob keeps the tag of the first
/// write that stored it.
pub struct InMemoryBackingStore {
    inner: RwLock<Inner>,
}

impl InMemoryBackingStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Number of blobs currently stored.
    pub fn len(&self) -> usize {
        self.inner.read().expect("lock poisoned").blobs.len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.read().expect("lock poisoned").blobs.is_empty()
    }

    /// Total bytes across all stored blobs.
    pub fn total_bytes(&self) -> u64 {
        self.inner
            .read()
            .expect("lock poisoned")
            .blobs
            .values()
            .map(|b| b.data.len() as u64)
            .sum()
    }

    /// The name a blob was first stored under.
    pub fn tag_of(&self, address: &ContentAddress) -> Option<String> {
        let inner = self.inner.read().expect("lock poisoned");
        inner.blobs.get(address).map(|b| b.tag.clone())
    }

    /// Return a sorted list of all stored addresses.
    pub fn all_addresses(&self) -> Vec<ContentAddress> {
        let inner = self.inner.read().expect("lock poisoned");
        let mut addresses: Vec<ContentAddress> = inner.blobs.keys().copied().collect();
        addresses.sort();
        addresses
    }

    /// Drop a stored blob. Returns `true` if it existed.
    ///
    /// Only meant for exercising read-back failure paths.
    pub fn evict(&self, address: &ContentAddress) -> bool {
        let mut inner = self.inner.write().expect("lock poisoned");
        inner.blobs.remove(address).is_some()
    }
}

impl Default for InMemoryBackingStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BackingStore for InMemoryBackingStore {
    fn write(&self, names: &[&str], contents: &[&[u8]]) -> StoreResult<WriteReceipt> {
        validate_write(names, contents)?;

        let mut inner = self.inner.write().expect("lock poisoned");
        let mut events = Vec::with_capacity(contents.len());
        for (name, data) in names.iter().zip(contents) {
            let address = ContentHasher::CHUNK.hash(data);
            let newly_stored = !inner.blobs.contains_key(&address);
            if newly_stored {
                inner.blobs.insert(
                    address,
                    StoredBlob {
                        tag: (*name).to_string(),
                        data: data.to_vec(),
                    },
                );
            }
            events.push(WriteEvent {
                name: (*name).to_string(),
                address,
                size: data.len() as u64,
                newly_stored,
            });
        }
        inner.writes += 1;

        debug!(sequence = inner.writes, blobs = events.len(), "in-memory write committed");
        Ok(WriteReceipt {
            sequence: inner.writes,
            events,
        })
    }

    fn address_of(&self, blob: &[u8]) -> StoreResult<ContentAddress> {
        let address = ContentHasher::CHUNK.hash(blob);
        let inner = self.inner.read().expect("lock poisoned");
        if inner.blobs.contains_key(&address) {
            Ok(address)
        } else {
            Ok(ContentAddress::null())
        }
    }

    fn addresses_of(&self, blobs: &[&[u8]]) -> StoreResult<Vec<ContentAddress>> {
        let inner = self.inner.read().expect("lock poisoned");
        Ok(blobs
            .iter()
            .map(|blob| {
                let address = ContentHasher::CHUNK.hash(blob);
                if inner.blobs.contains_key(&address) {
                    address
                } else {
                    ContentAddress::null()
                }
            })
            .collect())
    }

    fn read(&self, address: &ContentAddress) -> StoreResult<Option<Vec<u8>>> {
        let inner = self.inner.read().expect("lock poisoned");
        Ok(inner.blobs.get(address).map(|b| b.data.clone()))
    }

    fn write_count(&self) -> u64 {
        self.inner.read().expect("lock poisoned").writes
    }
}

impl std::fmt::Debug for InMemoryBackingStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read().expect("lock poisoned");
        f.debug_struct("InMemoryBackingStore")
            .field("blob_count", &inner.blobs.len())
            .field("write_count", &inner.writes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    #[test]
    fn write_emits_one_event_per_blob() {
        let store = InMemoryBackingStore::new();
        let receipt = store
            .write(&["index.html", "index.js"], &[b"Hello World".as_slice(), b"console.log".as_slice()])
            .unwrap();
        assert_eq!(receipt.sequence, 1);
        assert_eq!(receipt.len(), 2);
        assert_eq!(receipt.events[0].name, "index.html");
        assert_eq!(receipt.events[1].name, "index.js");
        assert!(receipt.events.iter().all(|e| e.newly_stored && !e.address.is_null()));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn written_content_resolves_to_emitted_address() {
        let store = InMemoryBackingStore::new();
        let receipt = store
            .write(&["index.html", "index.js"], &[b"Hello World".as_slice(), b"console.log".as_slice()])
            .unwrap();
        let addresses = store
            .addresses_of(&[b"Hello World".as_slice(), b"console.log".as_slice()])
            .unwrap();
        assert_eq!(addresses[0], receipt.events[0].address);
        assert_eq!(addresses[1], receipt.events[1].address);
    }

    #[test]
    fn unseen_content_resolves_to_sentinel() {
        let store = InMemoryBackingStore::new();
        store.write(&["a"], &[b"seen".as_slice()]).unwrap();
        let addresses = store
            .addresses_of(&[b"Unseen content 1".as_slice(), b"Unseen content 2".as_slice()])
            .unwrap();
        assert!(addresses.iter().all(ContentAddress::is_null));
    }

    #[test]
    fn rewrite_is_idempotent_but_charged() {
        let store = InMemoryBackingStore::new();
        let first = store.write(&["a.txt"], &[b"same".as_slice()]).unwrap();
        let second = store.write(&["b.txt"], &[b"same".as_slice()]).unwrap();
        assert_eq!(first.events[0].address, second.events[0].address);
        assert!(!second.events[0].newly_stored);
        assert_eq!(store.len(), 1);
        assert_eq!(store.write_count(), 2);
        // First writer's tag wins.
        assert_eq!(store.tag_of(&first.events[0].address).as_deref(), Some("a.txt"));
    }

    #[test]
    fn duplicate_blobs_within_one_write() {
        let store = InMemoryBackingStore::new();
        let receipt = store.write(&["a", "b"], &[b"dup".as_slice(), b"dup".as_slice()]).unwrap();
        assert!(receipt.events[0].newly_stored);
        assert!(!receipt.events[1].newly_stored);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn mismatched_write_is_rejected() {
        let store = InMemoryBackingStore::new();
        let err = store.write(&["a", "b"], &[b"only one".as_slice()]).unwrap_err();
        assert!(matches!(err, StoreError::LengthMismatch { names: 2, contents: 1 }));
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn empty_write_is_rejected() {
        let store = InMemoryBackingStore::new();
        let err = store.write(&[], &[]).unwrap_err();
        assert!(matches!(err, StoreError::EmptyWrite));
    }

    // -----------------------------------------------------------------------
    // Lookups and reads
    // -----------------------------------------------------------------------

    #[test]
    fn address_of_is_stable() {
        let store = InMemoryBackingStore::new();
        store.write(&["a"], &[b"stable".as_slice()]).unwrap();
        let a1 = store.address_of(b"stable").unwrap();
        let a2 = store.address_of(b"stable").unwrap();
        assert_eq!(a1, a2);
        assert!(!a1.is_null());
    }

    #[test]
    fn read_back_written_blob() {
        let store = InMemoryBackingStore::new();
        let receipt = store.write(&["a"], &[b"payload".as_slice()]).unwrap();
        let data = store.read(&receipt.events[0].address).unwrap();
        assert_eq!(data.as_deref(), Some(b"payload".as_slice()));
    }

    #[test]
    fn read_missing_returns_none() {
        let store = InMemoryBackingStore::new();
        assert!(store.read(&ContentAddress::from_hash([9; 32])).unwrap().is_none());
    }

    #[test]
    fn evict_makes_blob_absent() {
        let store = InMemoryBackingStore::new();
        let receipt = store.write(&["a"], &[b"gone".as_slice()]).unwrap();
        let address = receipt.events[0].address;
        assert!(store.evict(&address));
        assert!(store.address_of(b"gone").unwrap().is_null());
        assert!(!store.evict(&address));
    }

    // -----------------------------------------------------------------------
    // Utility methods
    // -----------------------------------------------------------------------

    #[test]
    fn len_total_bytes_and_sorted_addresses() {
        let store = InMemoryBackingStore::default();
        assert!(store.is_empty());
        store.write(&["a", "b"], &[b"12345".as_slice(), b"123456789".as_slice()]).unwrap();
        assert_eq!(store.total_bytes(), 14);
        let addresses = store.all_addresses();
        assert_eq!(addresses.len(), 2);
        assert!(addresses[0] <= addresses[1]);
    }

    #[test]
    fn concurrent_lookups_are_safe() {
        use std::sync::Arc;
        use std::thread;

        let store = Arc::new(InMemoryBackingStore::new());
        let expected = store.write(&["shared"], &[b"shared data".as_slice()]).unwrap().events[0].address;

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    assert_eq!(store.address_of(b"shared data").unwrap(), expected);
                })
            })
            .collect();

        for h in handles {
            h.join().expect("thread should not panic");
        }
    }

    #[test]
    fn debug_format() {
        let store = InMemoryBackingStore::new();
        store.write(&["x"], &[b"x".as_slice()]).unwrap();
        let debug = format!("{store:?}");
        assert!(debug.contains("InMemoryBackingStore"));
        assert!(debug.contains("blob_count: 1"));
        assert!(debug.contains("write_count: 1"));
    }
}
