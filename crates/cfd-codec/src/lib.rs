//! Chunk codec for the content-addressed file deployer.
//!
//! # Architecture
//!
//! - **ChunkEncoder**: zlib-deflates file text and slices the compressed
//!   stream into windows of at most `max_chunk_bytes`, numbering each window
//! - **ChunkDecoder**: copies ordered chunk payloads into one preallocated
//!   buffer and inflates it back to the original text
//!
//! The encoder's output for a given text, level, and window size is fully
//! deterministic, which is what lets a store recognise previously deployed
//! chunks by content.

pub mod decoder;
pub mod encoder;
pub mod error;

pub use decoder::ChunkDecoder;
pub use encoder::{ChunkEncoder, EncodedFile, DEFAULT_COMPRESSION_LEVEL};
pub use error::{CodecError, CodecResult};
