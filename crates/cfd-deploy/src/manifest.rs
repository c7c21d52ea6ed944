use std::path::Path;

use cfd_types::DeployedFileIndex;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::DeployConfig;
use crate::error::{DeployError, DeployResult};

/// Manifest format version written by this crate.
pub const MANIFEST_VERSION: u32 = 1;

/// Persisted record of a deployment: which files exist and where their
/// chunks live. Input to restore and verify.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeployManifest {
    pub version: u32,
    pub created_at: DateTime<Utc>,
    /// Settings the run used. Restoring does not depend on them.
    pub config: DeployConfig,
    pub files: DeployedFileIndex,
}

impl DeployManifest {
    pub fn new(config: DeployConfig, files: DeployedFileIndex) -> Self {
        Self {
            version: MANIFEST_VERSION,
            created_at: Utc::now(),
            config,
            files,
        }
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> DeployResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| DeployError::Manifest(e.to_string()))
    }

    pub fn from_json(text: &str) -> DeployResult<Self> {
        let manifest: Self =
            serde_json::from_str(text).map_err(|e| DeployError::Manifest(e.to_string()))?;
        if manifest.version != MANIFEST_VERSION {
            return Err(DeployError::Manifest(format!(
                "unsupported manifest version {}",
                manifest.version
            )));
        }
        Ok(manifest)
    }

    pub fn save(&self, path: &Path) -> DeployResult<()> {
        let json = self.to_json()?;
        std::fs::write(path, json)
            .map_err(|e| DeployError::Manifest(format!("cannot write {}: {e}", path.display())))?;
        info!(path = %path.display(), files = self.files.len(), "manifest saved");
        Ok(())
    }

    pub fn load(path: &Path) -> DeployResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| DeployError::Manifest(format!("cannot read {}: {e}", path.display())))?;
        Self::from_json(&text)
    }
}
