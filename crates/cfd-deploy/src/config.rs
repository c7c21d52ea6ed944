use std::path::Path;

use cfd_codec::{ChunkEncoder, DEFAULT_COMPRESSION_LEVEL};
use serde::{Deserialize, Serialize};

use crate::error::{DeployError, DeployResult};

/// Knobs for a deployment run. Fixed when the run starts.
///
/// Loadable from TOML; keys left out of the file keep their defaults:
///
/// ```toml
/// max_chunk_bytes = 20000
/// max_chunks_per_tx = 4
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    /// Upper bound on a chunk's payload size.
    pub max_chunk_bytes: usize,
    /// Upper bound on chunks carried by one write.
    pub max_chunks_per_tx: usize,
    /// zlib level, 0..=9.
    pub compression_level: u32,
    /// Concurrent lookup workers used by dedup and resolution.
    pub lookup_parallelism: usize,
    /// Read every file back from the store after the run and compare it
    /// against its source text.
    pub verify_after_deploy: bool,
    /// Descend into subdirectories when reading a source directory.
    pub recursive: bool,
}

impl DeployConfig {
    pub const DEFAULT_MAX_CHUNK_BYTES: usize = 20_000;
    pub const DEFAULT_MAX_CHUNKS_PER_TX: usize = 4;

    /// Parse from TOML text and validate.
    pub fn from_toml_str(text: &str) -> DeployResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| DeployError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file and validate.
    pub fn load(path: &Path) -> DeployResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            DeployError::InvalidConfig(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    /// Reject settings no run could complete with.
    pub fn validate(&self) -> DeployResult<()> {
        if self.max_chunk_bytes == 0 {
            return Err(DeployError::InvalidConfig(
                "max_chunk_bytes must be at least 1".into(),
            ));
        }
        if self.max_chunks_per_tx == 0 {
            return Err(DeployError::InvalidConfig(
                "max_chunks_per_tx must be at least 1".into(),
            ));
        }
        if self.compression_level > 9 {
            return Err(DeployError::InvalidConfig(format!(
                "compression_level {} is out of range 0..=9",
                self.compression_level
            )));
        }
        if self.lookup_parallelism == 0 {
            return Err(DeployError::InvalidConfig(
                "lookup_parallelism must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// The chunk encoder these settings describe.
    pub fn encoder(&self) -> DeployResult<ChunkEncoder> {
        Ok(ChunkEncoder::new(self.max_chunk_bytes)?.with_level(self.compression_level)?)
    }
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            max_chunk_bytes: Self::DEFAULT_MAX_CHUNK_BYTES,
            max_chunks_per_tx: Self::DEFAULT_MAX_CHUNKS_PER_TX,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            lookup_parallelism: 4,
            verify_after_deploy: true,
            recursive: false,
        }
    }
}
