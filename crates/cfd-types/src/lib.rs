//! Foundation types for the content-addressed file deployer (CFD).
//!
//! Every other CFD crate depends on `cfd-types`.
//!
//! # Key Types
//!
//! - [`ContentAddress`] -- Identifier the backing store derives from a blob; all zeros means "absent"
//! - [`FileRecord`] -- A source file read from disk: name plus UTF-8 text
//! - [`Chunk`] -- Bounded slice of a file's compressed stream, tagged with its sequence index
//! - [`DeployedFileIndex`] -- Per-file ordered address lists produced by a deployment run

pub mod address;
pub mod chunk;
pub mod error;
pub mod file;
pub mod index;

pub use address::ContentAddress;
pub use chunk::Chunk;
pub use error::TypeError;
pub use file::FileRecord;
pub use index::{DeployedFile, DeployedFileIndex};
