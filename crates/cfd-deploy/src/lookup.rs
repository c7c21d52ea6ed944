//! Concurrent address lookups over disjoint windows.

use cfd_store::BackingStore;
use cfd_types::ContentAddress;
use rayon::prelude::*;
use tracing::debug;

use crate::error::{DeployError, DeployResult};

/// Look up the address of every blob, index-aligned with `blobs`.
///
/// The blobs are split into at most `parallelism` contiguous windows, each
/// queried with one `addresses_of` call on the rayon pool. Every window has
/// finished before this returns, so the call is a barrier. A failing window
/// fails the whole lookup.
pub fn lookup_addresses<S>(
    store: &S,
    blobs: &[&[u8]],
    parallelism: usize,
) -> DeployResult<Vec<ContentAddress>>
where
    S: BackingStore + ?Sized,
{
    if blobs.is_empty() {
        return Ok(Vec::new());
    }

    let workers = parallelism.clamp(1, blobs.len());
    let window = blobs.len().div_ceil(workers);

    let addresses: Vec<ContentAddress> = if workers == 1 {
        store.addresses_of(blobs)?
    } else {
        blobs
            .par_chunks(window)
            .map(|part| store.addresses_of(part))
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .flatten()
            .collect()
    };

    if addresses.len() != blobs.len() {
        return Err(DeployError::LookupMisaligned {
            expected: blobs.len(),
            actual: addresses.len(),
        });
    }
    debug!(blobs = blobs.len(), workers, "address lookup complete");
    Ok(addresses)
}
