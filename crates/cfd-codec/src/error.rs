use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("chunk size must be at least one byte")]
    InvalidChunkSize,

    #[error("compression level {0} is out of range 0..=9")]
    InvalidLevel(u32),

    #[error("compression failed: {0}")]
    CompressionFailed(String),

    #[error("decompression failed: {0}")]
    DecompressionFailed(String),

    #[error("compressed stream length mismatch: expected {expected} bytes, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("{trailing} unread bytes after end of compressed stream")]
    TrailingBytes { trailing: usize },

    #[error("decompressed content is not valid UTF-8: {0}")]
    InvalidUtf8(String),
}

pub type CodecResult<T> = Result<T, CodecError>;
