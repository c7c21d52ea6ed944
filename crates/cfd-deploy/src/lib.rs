//! Deployment pipeline for the content-addressed file deployer.
//!
//! A run moves through five stages, strictly in order, each finishing before
//! the next begins:
//!
//! ```text
//! files -> encode -> dedup -> batch -> submit -> resolve -> (verify)
//! ```
//!
//! - **encode**: deflate each file and cut the stream into numbered chunks
//! - **dedup**: drop chunks whose content the store already holds
//! - **batch**: group the remaining chunks into transaction-sized writes
//! - **submit**: issue the writes one at a time, confirming each receipt
//! - **resolve**: look up every chunk's address and build the file index
//!
//! [`Deployer`] is the entry point; the stage types are public so callers can
//! drive or inspect individual stages.

pub mod batch;
pub mod config;
pub mod dedup;
pub mod deployer;
pub mod error;
pub mod lookup;
pub mod manifest;
pub mod readback;
pub mod resolve;
pub mod source;
pub mod submit;

#[cfg(test)]
pub(crate) mod testing;

pub use batch::{Batch, Batcher, TxPlan};
pub use config::DeployConfig;
pub use dedup::{DedupOutcome, Deduplicator};
pub use deployer::{DeployReport, Deployer, Stage, StageTiming};
pub use error::{DeployError, DeployResult};
pub use lookup::lookup_addresses;
pub use manifest::{DeployManifest, MANIFEST_VERSION};
pub use readback::{fetch_file, verify_against};
pub use resolve::AddressResolver;
pub use source::{read_source_dir, write_output_dir};
pub use submit::SubmissionQueue;

// Re-export key types
pub use cfd_codec::{ChunkDecoder, ChunkEncoder, EncodedFile};
pub use cfd_store::{BackingStore, FileBackingStore, InMemoryBackingStore, WriteReceipt};
pub use cfd_types::{Chunk, ContentAddress, DeployedFile, DeployedFileIndex, FileRecord};
