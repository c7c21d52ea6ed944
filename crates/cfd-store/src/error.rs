use cfd_types::ContentAddress;

/// Errors from backing store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A write carried a different number of names and blobs.
    #[error("write carries {names} names but {contents} blobs")]
    LengthMismatch { names: usize, contents: usize },

    /// A write carried no blobs at all.
    #[error("write carries no blobs")]
    EmptyWrite,

    /// Stored bytes no longer hash to their address (data corruption).
    #[error("content mismatch for {address}: stored bytes hash to {computed}")]
    HashMismatch {
        address: ContentAddress,
        computed: ContentAddress,
    },

    /// The store's write journal could not be parsed.
    #[error("corrupt journal at line {line}: {reason}")]
    CorruptJournal { line: usize, reason: String },

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
