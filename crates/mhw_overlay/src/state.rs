//! Deployment manifest persistence.
//!
//! Every [`deploy`](crate::DeploymentEngine::deploy) writes a
//! [`DeploymentManifest`] listing each file it placed in the game directory,
//! which mod owns it and how it was materialized. Undeploy and verify read the
//! manifest back, so they keep working after a restart and can tell a file the
//! engine placed from one that was already there or has since been replaced.
//!
//! # JSON format
//!
//! ```json
//! {
//!   "version": 1,
//!   "profileId": "0f6b1f7e-...",
//!   "deployedAt": "2024-03-01T12:00:00Z",
//!   "mode": "symlink",
//!   "deployedMods": ["7d9f8c1e-..."],
//!   "entries": [
//!     {
//!       "target": "nativePC/pl/f_equip/pl001/mod/f_body.mod3",
//!       "modId": "7d9f8c1e-...",
//!       "source": "/data/staging/7d9f8c1e-.../nativePC/pl/f_equip/pl001/mod/f_body.mod3",
//!       "mode": "symlink"
//!     }
//!   ]
//! }
//! ```

use crate::error::Result;
use crate::utils::{content_hash, write_atomic};
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use mhw_mod_core::{DeploymentMode, DeploymentState};
use serde::{Deserialize, Serialize};
use std::fs;
use uuid::Uuid;

pub const MANIFEST_VERSION: u32 = 1;

/// One file placed in the game directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    /// Path relative to the game root, `/`-separated.
    pub target: String,
    pub mod_id: Uuid,
    /// The staging file the target was produced from.
    pub source: Utf8PathBuf,
    /// The mode actually used, which may be `copy` after a symlink fallback.
    pub mode: DeploymentMode,
    /// xxHash3 of the deployed bytes. Only recorded for copies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<u64>,
}

impl ManifestEntry {
    /// Whether the file at `game_root/target` is still the one deployed.
    ///
    /// A symlink must still point at `source`. A copy must still be a regular
    /// file with the recorded content hash.
    pub fn is_intact(&self, game_root: &Utf8Path) -> bool {
        let target = game_root.join(&self.target);
        let Ok(metadata) = fs::symlink_metadata(&target) else {
            return false;
        };

        match self.mode {
            DeploymentMode::Symlink => {
                metadata.file_type().is_symlink()
                    && fs::read_link(&target).is_ok_and(|link| link == self.source.as_std_path())
            }
            DeploymentMode::Copy => {
                metadata.is_file()
                    && self.content_hash.is_some()
                    && content_hash(&target).ok() == self.content_hash
            }
        }
    }
}

/// Record of the files placed by the last deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentManifest {
    pub version: u32,
    pub profile_id: Uuid,
    pub deployed_at: DateTime<Utc>,
    /// The mode requested for the deployment.
    pub mode: DeploymentMode,
    /// Every mod that took part in the deployment, in load order, including
    /// mods whose files were all overridden.
    #[serde(default)]
    pub deployed_mods: Vec<Uuid>,
    #[serde(default)]
    pub entries: Vec<ManifestEntry>,
}

impl DeploymentManifest {
    pub fn new(profile_id: Uuid, mode: DeploymentMode, mut entries: Vec<ManifestEntry>) -> Self {
        entries.sort_by(|a, b| a.target.cmp(&b.target));
        Self {
            version: MANIFEST_VERSION,
            profile_id,
            deployed_at: Utc::now(),
            mode,
            deployed_mods: Vec::new(),
            entries,
        }
    }

    /// The [`DeploymentState`] this manifest records.
    pub fn state(&self) -> DeploymentState {
        DeploymentState {
            profile_id: self.profile_id,
            deployed_at: self.deployed_at,
            deployed_mods: self.deployed_mods.clone(),
            mode: self.mode,
        }
    }

    /// Load a manifest.
    ///
    /// Returns `Ok(None)` if the file doesn't exist and `Err` if it exists but
    /// cannot be parsed.
    pub fn load(path: &Utf8Path) -> Result<Option<Self>> {
        if !path.as_std_path().exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(path)?;
        let manifest: Self = serde_json::from_str(&contents)?;
        Ok(Some(manifest))
    }

    /// Save the manifest atomically, creating parent directories if needed.
    pub fn save(&self, path: &Utf8Path) -> Result<()> {
        let contents = serde_json::to_vec_pretty(self)?;
        write_atomic(path, &contents)?;
        Ok(())
    }

    /// Delete a manifest file. Missing files are fine.
    pub fn remove(path: &Utf8Path) -> Result<()> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn entry(&self, target: &str) -> Option<&ManifestEntry> {
        self.entries.iter().find(|e| e.target == target)
    }
}
