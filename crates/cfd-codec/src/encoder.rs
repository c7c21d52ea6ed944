use std::io::Write;

use cfd_crypto::ContentHasher;
use cfd_types::{Chunk, FileRecord};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use tracing::debug;

use crate::error::{CodecError, CodecResult};

/// zlib's own default level.
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

/// A file after compression and chunking.
#[derive(Clone, Debug)]
pub struct EncodedFile {
    pub name: String,
    /// Chunks in stream order; `chunks[i].sequence_index == i`.
    pub chunks: Vec<Chunk>,
    /// Total compressed stream length (sum of chunk lengths).
    pub compressed_len: u64,
    /// Length of the original text in bytes.
    pub raw_len: u64,
    /// Hex content digest of the original text.
    pub raw_digest: String,
}

/// Compresses file text and slices the compressed stream into fixed windows.
#[derive(Clone, Debug)]
pub struct ChunkEncoder {
    max_chunk_bytes: usize,
    level: u32,
}

impl ChunkEncoder {
    /// Create an encoder producing chunks of at most `max_chunk_bytes`.
    pub fn new(max_chunk_bytes: usize) -> CodecResult<Self> {
        if max_chunk_bytes == 0 {
            return Err(CodecError::InvalidChunkSize);
        }
        Ok(Self {
            max_chunk_bytes,
            level: DEFAULT_COMPRESSION_LEVEL,
        })
    }

    /// Use a specific zlib compression level (0..=9).
    pub fn with_level(mut self, level: u32) -> CodecResult<Self> {
        if level > 9 {
            return Err(CodecError::InvalidLevel(level));
        }
        self.level = level;
        Ok(self)
    }

    /// Maximum chunk payload size.
    pub fn max_chunk_bytes(&self) -> usize {
        self.max_chunk_bytes
    }

    /// Compression level in use.
    pub fn level(&self) -> u32 {
        self.level
    }

    /// Deflate `text` into a zlib stream.
    pub fn compress(&self, text: &str) -> CodecResult<Vec<u8>> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(self.level));
        encoder
            .write_all(text.as_bytes())
            .map_err(|e| CodecError::CompressionFailed(e.to_string()))?;
        encoder
            .finish()
            .map_err(|e| CodecError::CompressionFailed(e.to_string()))
    }

    /// Slice a compressed stream into numbered windows.
    ///
    /// Every window is `max_chunk_bytes` long except possibly the last, which
    /// is shorter but never empty. An empty stream yields no chunks.
    pub fn split(&self, file_name: &str, compressed: &[u8]) -> Vec<Chunk> {
        compressed
            .chunks(self.max_chunk_bytes)
            .enumerate()
            .map(|(i, window)| Chunk::new(file_name, i, window.to_vec()))
            .collect()
    }

    /// Compress and chunk one file.
    pub fn encode(&self, file: &FileRecord) -> CodecResult<EncodedFile> {
        let compressed = self.compress(&file.raw_content)?;
        let chunks = self.split(&file.name, &compressed);
        debug!(
            file = %file.name,
            raw_len = file.raw_len(),
            compressed_len = compressed.len(),
            chunks = chunks.len(),
            "encoded file"
        );
        Ok(EncodedFile {
            name: file.name.clone(),
            chunks,
            compressed_len: compressed.len() as u64,
            raw_len: file.raw_len(),
            raw_digest: ContentHasher::FILE.hex_digest(file.raw_content.as_bytes()),
        })
    }
}
