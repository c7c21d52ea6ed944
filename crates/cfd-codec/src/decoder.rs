use std::io::Read;

use flate2::read::ZlibDecoder;
use tracing::debug;

use crate::error::{CodecError, CodecResult};

/// Reassembles ordered chunk payloads and inflates them back to text.
pub struct ChunkDecoder;

impl ChunkDecoder {
    /// Copy chunk payloads, in iteration order, into one buffer of exactly
    /// `total_len` bytes.
    ///
    /// The buffer is allocated once up front. Payloads that overflow it, or
    /// that leave part of it unfilled, are reported as a length mismatch.
    pub fn assemble<'a, I>(chunks: I, total_len: usize) -> CodecResult<Vec<u8>>
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        let mut buf = vec![0u8; total_len];
        let mut offset = 0usize;
        for chunk in chunks {
            let end = match offset.checked_add(chunk.len()) {
                Some(end) if end <= total_len => end,
                other => {
                    return Err(CodecError::LengthMismatch {
                        expected: total_len,
                        actual: other.unwrap_or(usize::MAX),
                    })
                }
            };
            buf[offset..end].copy_from_slice(chunk);
            offset = end;
        }
        if offset != total_len {
            return Err(CodecError::LengthMismatch {
                expected: total_len,
                actual: offset,
            });
        }
        Ok(buf)
    }

    /// Inflate a complete zlib stream into UTF-8 text.
    ///
    /// The stream must be consumed exactly; bytes after the end of the zlib
    /// stream mean the chunks were not the ones that were encoded. An empty
    /// input decodes to the empty string.
    pub fn inflate(compressed: &[u8]) -> CodecResult<String> {
        if compressed.is_empty() {
            return Ok(String::new());
        }
        let mut decoder = ZlibDecoder::new(compressed);
        let mut raw = Vec::new();
        decoder
            .read_to_end(&mut raw)
            .map_err(|e| CodecError::DecompressionFailed(e.to_string()))?;

        let consumed = decoder.total_in() as usize;
        if consumed != compressed.len() {
            return Err(CodecError::TrailingBytes {
                trailing: compressed.len() - consumed,
            });
        }

        String::from_utf8(raw).map_err(|e| CodecError::InvalidUtf8(e.to_string()))
    }

    /// [`Self::assemble`] followed by [`Self::inflate`].
    pub fn decode<'a, I>(chunks: I, total_len: usize) -> CodecResult<String>
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        let compressed = Self::assemble(chunks, total_len)?;
        let text = Self::inflate(&compressed)?;
        debug!(compressed_len = total_len, raw_len = text.len(), "decoded chunk stream");
        Ok(text)
    }
}
