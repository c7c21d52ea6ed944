use cfd_types::ContentAddress;

use crate::error::StoreResult;
use crate::receipt::WriteReceipt;

/// Content-addressed backing store that charges per write.
///
/// All implementations must satisfy these invariants:
/// - The address of a blob is a pure function of its bytes, and never the
///   sentinel.
/// - Lookups for content that was never written return
///   [`ContentAddress::null`].
/// - A successful `write` means every blob it carried is committed and
///   visible to subsequent lookups.
/// - Concurrent reads are always safe (blobs are immutable).
pub trait BackingStore: Send + Sync {
    /// Store each blob tagged with its name and return one event per blob.
    ///
    /// `names` and `contents` are index-aligned. Blobs that already exist are
    /// not stored again but still produce an event. Each successful call
    /// counts as one charged write. A call that fails part way is not charged
    /// and is not rolled back.
    fn write(&self, names: &[&str], contents: &[&[u8]]) -> StoreResult<WriteReceipt>;

    /// The address of `blob`, or the sentinel if it has never been written.
    fn address_of(&self, blob: &[u8]) -> StoreResult<ContentAddress>;

    /// Batched form of [`Self::address_of`], with index-aligned results.
    ///
    /// Default implementation calls `address_of()` for each blob. Backends may
    /// override for better performance (e.g., fewer round-trips).
    fn addresses_of(&self, blobs: &[&[u8]]) -> StoreResult<Vec<ContentAddress>> {
        blobs.iter().map(|blob| self.address_of(blob)).collect()
    }

    /// Read a blob by address. Returns `Ok(None)` if it does not exist.
    fn read(&self, address: &ContentAddress) -> StoreResult<Option<Vec<u8>>>;

    /// Number of write operations charged so far.
    fn write_count(&self) -> u64;
}

/// Reject writes whose names and blobs do not line up.
pub(crate) fn validate_write(names: &[&str], contents: &[&[u8]]) -> StoreResult<()> {
    if names.len() != contents.len() {
        return Err(crate::error::StoreError::LengthMismatch {
            names: names.len(),
            contents: contents.len(),
        });
    }
    if contents.is_empty() {
        return Err(crate::error::StoreError::EmptyWrite);
    }
    Ok(())
}
