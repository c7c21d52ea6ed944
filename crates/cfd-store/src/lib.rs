//! Backing store interface for the content-addressed file deployer.
//!
//! A backing store keeps immutable byte blobs keyed by a content address it
//! derives from the bytes. Writes are charged per operation, so callers check
//! [`BackingStore::addresses_of`] before writing and only submit what is
//! missing.
//!
//! # Storage Backends
//!
//! All backends implement the [`BackingStore`] trait:
//!
//! - [`InMemoryBackingStore`] -- `HashMap`-based store for tests and embedding
//! - [`FileBackingStore`] -- one file per blob under a fan-out directory, so
//!   separate processes see each other's writes
//!
//! # Store Rules
//!
//! 1. Blobs are immutable once written; rewriting existing content is a no-op.
//! 2. Lookups of never-written content return the sentinel address.
//! 3. A write that returns a receipt has stored every blob it carries, with
//!    one event per blob. A failed write returns no receipt and is not
//!    charged, but blobs stored before the failure stay in place. They are
//!    ordinary immutable content and the next write of them is a no-op.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod file;
pub mod memory;
pub mod receipt;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use file::FileBackingStore;
pub use memory::InMemoryBackingStore;
pub use receipt::{WriteEvent, WriteReceipt};
pub use traits::BackingStore;
