use cfd_types::ContentAddress;

/// Domain-separated BLAKE3 content hasher.
///
/// Each hasher carries a domain tag (e.g., `"cfd-chunk-v1"`) that is prepended
/// to every hash computation, so a chunk address and a file digest over the
/// same bytes never collide.
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    /// Hasher for stored chunk blobs.
    pub const CHUNK: Self = Self {
        domain: "cfd-chunk-v1",
    };
    /// Hasher for original (uncompressed) file text.
    pub const FILE: Self = Self {
        domain: "cfd-file-v1",
    };

    /// Create a hasher with a custom domain tag.
    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }

    /// Hash raw bytes with domain separation.
    ///
    /// A digest that happens to be all zeros would be indistinguishable from
    /// the sentinel, so the low bit is forced on in that (astronomically
    /// unlikely) case.
    pub fn hash(&self, data: &[u8]) -> ContentAddress {
        let mut bytes = self.digest(data);
        if bytes == [0u8; 32] {
            bytes[31] = 1;
        }
        ContentAddress::from_hash(bytes)
    }

    /// Hex-encoded digest, as recorded in deployed file metadata.
    pub fn hex_digest(&self, data: &[u8]) -> String {
        hex::encode(self.digest(data))
    }

    /// Verify that data hashes to the expected address.
    pub fn verify(&self, data: &[u8], expected: &ContentAddress) -> bool {
        self.hash(data) == *expected
    }

    /// Verify that data matches a hex digest produced by [`Self::hex_digest`].
    pub fn verify_hex(&self, data: &[u8], expected: &str) -> bool {
        self.hex_digest(data).eq_ignore_ascii_case(expected)
    }

    /// The domain tag used by this hasher.
    pub fn domain(&self) -> &str {
        self.domain
    }

    fn digest(&self, data: &[u8]) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher.update(data);
        *hasher.finalize().as_bytes()
    }
}
