use std::fmt;

/// A bounded slice of one file's compressed byte stream.
///
/// `sequence_index` is the chunk's position within its file's stream. It is
/// assigned once, when the stream is sliced, and is the only source of truth
/// for reconstruction order downstream.
#[derive(Clone, PartialEq, Eq)]
pub struct Chunk {
    pub file_name: String,
    pub sequence_index: usize,
    pub bytes: Vec<u8>,
}

impl Chunk {
    pub fn new(file_name: impl Into<String>, sequence_index: usize, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            sequence_index,
            bytes,
        }
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chunk")
            .field("file_name", &self.file_name)
            .field("sequence_index", &self.sequence_index)
            .field("len", &self.bytes.len())
            .finish()
    }
}
