//! Read-back path: rebuild a deployed file's text from the store.

use cfd_codec::ChunkDecoder;
use cfd_crypto::ContentHasher;
use cfd_store::BackingStore;
use cfd_types::DeployedFile;
use tracing::{debug, error};

use crate::error::{DeployError, DeployResult};

fn decompression(file: &DeployedFile, reason: impl Into<String>) -> DeployError {
    let reason = reason.into();
    error!(file = %file.name, %reason, "read-back failed");
    DeployError::Decompression {
        file: file.name.clone(),
        reason,
    }
}

/// Fetch every chunk of `file` in index order and decode the text.
///
/// The result is checked against the entry's `raw_len` and `raw_digest`. A
/// chunk the store does not have, a stream that does not inflate, or text
/// that does not match the recorded digest are all reported as
/// [`DeployError::Decompression`].
pub fn fetch_file<S>(store: &S, file: &DeployedFile) -> DeployResult<String>
where
    S: BackingStore + ?Sized,
{
    let mut payloads = Vec::with_capacity(file.addresses.len());
    for (i, address) in file.addresses.iter().enumerate() {
        if address.is_null() {
            return Err(decompression(file, format!("chunk {i} has no address")));
        }
        match store.read(address)? {
            Some(bytes) => payloads.push(bytes),
            None => {
                return Err(decompression(
                    file,
                    format!("chunk {i} ({address}) is missing from the store"),
                ))
            }
        }
    }

    // The recorded length comes from a manifest; check it against what the
    // store returned before sizing a buffer from it.
    let fetched: usize = payloads.iter().map(Vec::len).sum();
    let compressed_len = usize::try_from(file.compressed_len)
        .ok()
        .filter(|&len| len == fetched)
        .ok_or_else(|| {
            decompression(
                file,
                format!(
                    "chunks hold {fetched} bytes, index records {}",
                    file.compressed_len
                ),
            )
        })?;

    let text = ChunkDecoder::decode(payloads.iter().map(Vec::as_slice), compressed_len)
        .map_err(|e| decompression(file, e.to_string()))?;

    if text.len() as u64 != file.raw_len {
        return Err(decompression(
            file,
            format!("decoded {} bytes, expected {}", text.len(), file.raw_len),
        ));
    }
    if !ContentHasher::FILE.verify_hex(text.as_bytes(), &file.raw_digest) {
        return Err(decompression(file, "decoded text does not match its digest"));
    }

    debug!(file = %file.name, chunks = file.chunk_count(), bytes = text.len(), "read back file");
    Ok(text)
}

/// Read `file` back and require it to equal `expected` exactly.
pub fn verify_against<S>(store: &S, file: &DeployedFile, expected: &str) -> DeployResult<()>
where
    S: BackingStore + ?Sized,
{
    let text = fetch_file(store, file)?;
    if text != expected {
        return Err(decompression(file, "read-back differs from source text"));
    }
    Ok(())
}
