//! Overlay deployment onto the game directory.
//!
//! The [`DeploymentEngine`] projects the winning file of every relative path
//! onto the game root and can reverse that projection.
//!
//! # Deploy Algorithm
//!
//! 1. Validate that the game root exists. This is the only fatal precondition.
//! 2. Build a [`Resolution`] of the profile: enabled mods in load order, each
//!    with its staging files. Missing mods are skipped with a warning.
//! 3. Compute the winner of every path (last writer in load order wins). This
//!    pass is sequential and completes before any file is touched. Winning
//!    paths never nest, so the parallel step below cannot race on a shared
//!    directory.
//! 4. Remove targets recorded in the previous manifest that are no longer
//!    part of the winner set, so re-deploying is not additive.
//! 5. Materialize each winner in parallel: create parent directories, remove
//!    whatever occupies the target, then symlink (falling back to a copy) or
//!    copy. A failing file is recorded and skipped.
//! 6. Persist a new [`DeploymentManifest`] atomically.
//!
//! Undeploy and verify work from the persisted manifest only. Entries whose
//! removal fails stay in the manifest so a later undeploy can retry them.

use crate::error::{Error, Result};
use crate::resolution::{Resolution, SkippedMod};
use crate::state::{DeploymentManifest, ManifestEntry};
use crate::utils::{content_hash, copy_file_preserving, remove_existing, symlink_file};
use camino::{Utf8Path, Utf8PathBuf};
use mhw_mod_core::{DeploymentMode, DeploymentState, Mod, Profile};
use rayon::prelude::*;
use std::fmt;
use std::fs;
use std::io;
use uuid::Uuid;

/// A single file that could not be deployed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployFailure {
    pub target: String,
    pub mod_id: Uuid,
    pub message: String,
}

/// Summary returned after a deployment.
#[derive(Debug, Clone)]
pub struct DeploymentOutcome {
    pub state: DeploymentState,
    pub files_deployed: usize,
    /// Files that were copied because symlink creation failed.
    pub symlink_fallbacks: usize,
    /// Targets from the previous deployment removed because nothing claims them anymore.
    pub stale_removed: usize,
    pub failures: Vec<DeployFailure>,
    pub skipped: Vec<SkippedMod>,
}

/// Summary returned after an undeploy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UndeployOutcome {
    pub removed: Vec<String>,
    /// Targets left in place because they no longer match what was deployed.
    pub kept: Vec<String>,
    /// Targets that were already gone.
    pub missing: Vec<String>,
}

/// Detailed result of [`DeploymentEngine::verify_detailed`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyReport {
    pub game_root_present: bool,
    pub manifest_present: bool,
    pub profile_matches: bool,
    /// Manifest targets that were removed or replaced since deployment.
    pub broken: Vec<String>,
}

impl VerifyReport {
    pub fn is_valid(&self) -> bool {
        self.game_root_present && self.manifest_present && self.profile_matches && self.broken.is_empty()
    }
}

enum Removal {
    Removed,
    Missing,
    Kept,
    Failed,
}

type LinkFn = fn(&Utf8Path, &Utf8Path) -> io::Result<()>;
type RemoveFn = fn(&Utf8Path) -> io::Result<()>;

fn remove_file(path: &Utf8Path) -> io::Result<()> {
    fs::remove_file(path)
}

/// Deploys profiles onto a game root and tracks what it placed there.
///
/// Callers must not run two mutating operations against the same game root at
/// once; see `ModLibrary` for the lock that enforces this.
#[derive(Clone)]
pub struct DeploymentEngine {
    game_root: Utf8PathBuf,
    manifest_path: Utf8PathBuf,
    default_mode: DeploymentMode,
    link: LinkFn,
    remove: RemoveFn,
}

impl fmt::Debug for DeploymentEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeploymentEngine")
            .field("game_root", &self.game_root)
            .field("manifest_path", &self.manifest_path)
            .field("default_mode", &self.default_mode)
            .finish_non_exhaustive()
    }
}

impl DeploymentEngine {
    /// Create an engine.
    ///
    /// # Arguments
    ///
    /// * `game_root` - Directory the overlay is projected onto. Must exist when deploying.
    /// * `manifest_path` - Where the deployment manifest is persisted.
    /// * `default_mode` - Mode used when `deploy` is not given one.
    pub fn new(
        game_root: Utf8PathBuf,
        manifest_path: Utf8PathBuf,
        default_mode: DeploymentMode,
    ) -> Self {
        Self {
            game_root,
            manifest_path,
            default_mode,
            link: symlink_file,
            remove: remove_file,
        }
    }

    #[cfg(test)]
    fn with_fs_ops(mut self, link: LinkFn, remove: RemoveFn) -> Self {
        self.link = link;
        self.remove = remove;
        self
    }

    pub fn game_root(&self) -> &Utf8Path {
        &self.game_root
    }

    pub fn manifest_path(&self) -> &Utf8Path {
        &self.manifest_path
    }

    /// The manifest of the current deployment, if any.
    pub fn manifest(&self) -> Result<Option<DeploymentManifest>> {
        DeploymentManifest::load(&self.manifest_path)
    }

    /// Whether a deployment is currently recorded.
    pub fn is_deployed(&self) -> bool {
        matches!(self.manifest(), Ok(Some(_)))
    }

    /// Deploy the winning files of `profile` onto the game root.
    ///
    /// Re-deploying replaces the previous deployment rather than adding to it.
    pub fn deploy(
        &self,
        mods: &[Mod],
        profile: &Profile,
        mode: Option<DeploymentMode>,
    ) -> Result<DeploymentOutcome> {
        let mode = mode.unwrap_or(self.default_mode);
        if !self.game_root.is_dir() {
            return Err(Error::GameRootMissing(self.game_root.clone()));
        }

        tracing::info!("Deploying profile '{}' ({})", profile.name, profile.id);
        tracing::info!("Game root: {}", self.game_root);
        tracing::info!("Mode: {}", mode);

        let resolution = Resolution::new(mods, profile);
        let winners: Vec<(&str, &Mod)> = resolution.winners().into_iter().collect();
        tracing::info!(
            "Resolved {} files from {} mods",
            winners.len(),
            resolution.mods.len()
        );

        let stale_removed = match self.manifest() {
            Ok(Some(previous)) => self.remove_stale(&previous, &winners),
            Ok(None) => 0,
            Err(e) => {
                tracing::warn!("Ignoring unreadable deployment manifest: {}", e);
                0
            }
        };

        let results: Vec<std::result::Result<ManifestEntry, DeployFailure>> = winners
            .par_iter()
            .map(|(target, owner)| self.materialize(target, owner, mode))
            .collect();

        let mut entries = Vec::with_capacity(results.len());
        let mut failures = Vec::new();
        for result in results {
            match result {
                Ok(entry) => entries.push(entry),
                Err(failure) => {
                    tracing::warn!(
                        "Failed to deploy {} from mod {}: {}",
                        failure.target,
                        failure.mod_id,
                        failure.message
                    );
                    failures.push(failure);
                }
            }
        }

        let symlink_fallbacks = if mode == DeploymentMode::Symlink {
            entries
                .iter()
                .filter(|e| e.mode == DeploymentMode::Copy)
                .count()
        } else {
            0
        };
        let files_deployed = entries.len();

        let mut manifest = DeploymentManifest::new(profile.id, mode, entries);
        manifest.deployed_mods = resolution.mod_ids();
        manifest.save(&self.manifest_path)?;

        tracing::info!(
            "Deployed {} files ({} failed, {} stale removed, {} copy fallbacks)",
            files_deployed,
            failures.len(),
            stale_removed,
            symlink_fallbacks
        );

        Ok(DeploymentOutcome {
            state: manifest.state(),
            files_deployed,
            symlink_fallbacks,
            stale_removed,
            failures,
            skipped: resolution.skipped,
        })
    }

    /// Remove every file recorded in the manifest, then forget the manifest.
    ///
    /// Symlinks are always removed. Copies are removed only while their
    /// content still matches what was deployed. Directories are left in place.
    /// Files that could not be removed are reported as kept and remain in the
    /// manifest.
    pub fn undeploy(&self) -> Result<UndeployOutcome> {
        let Some(manifest) = self.manifest()? else {
            tracing::info!("Nothing deployed, skipping undeploy");
            return Ok(UndeployOutcome::default());
        };

        tracing::info!(
            "Undeploying {} files of profile {}",
            manifest.entries.len(),
            manifest.profile_id
        );

        let mut outcome = UndeployOutcome::default();
        let mut remaining = Vec::new();
        for entry in &manifest.entries {
            match self.remove_owned(entry) {
                Removal::Removed => outcome.removed.push(entry.target.clone()),
                Removal::Missing => outcome.missing.push(entry.target.clone()),
                Removal::Kept => outcome.kept.push(entry.target.clone()),
                Removal::Failed => {
                    outcome.kept.push(entry.target.clone());
                    remaining.push(entry.clone());
                }
            }
        }

        if remaining.is_empty() {
            DeploymentManifest::remove(&self.manifest_path)?;
        } else {
            tracing::warn!(
                "{} files could not be removed and stay recorded",
                remaining.len()
            );
            let retained = DeploymentManifest {
                entries: remaining,
                ..manifest
            };
            retained.save(&self.manifest_path)?;
        }

        tracing::info!(
            "Undeploy complete: {} removed, {} kept, {} already missing",
            outcome.removed.len(),
            outcome.kept.len(),
            outcome.missing.len()
        );
        Ok(outcome)
    }

    /// Whether the deployment described by `state` is still in place.
    pub fn verify(&self, state: &DeploymentState) -> bool {
        self.verify_detailed(state).is_valid()
    }

    /// Check the game root, the manifest's profile and every deployed file.
    pub fn verify_detailed(&self, state: &DeploymentState) -> VerifyReport {
        let mut report = VerifyReport {
            game_root_present: self.game_root.is_dir(),
            ..VerifyReport::default()
        };

        let manifest = match self.manifest() {
            Ok(Some(manifest)) => manifest,
            Ok(None) => return report,
            Err(e) => {
                tracing::warn!("Deployment manifest unreadable: {}", e);
                return report;
            }
        };

        report.manifest_present = true;
        report.profile_matches = manifest.profile_id == state.profile_id;
        report.broken = manifest
            .entries
            .iter()
            .filter(|entry| !entry.is_intact(&self.game_root))
            .map(|entry| entry.target.clone())
            .collect();

        if !report.broken.is_empty() {
            tracing::warn!("{} deployed files are missing or modified", report.broken.len());
        }
        report
    }

    fn remove_stale(&self, previous: &DeploymentManifest, winners: &[(&str, &Mod)]) -> usize {
        let mut removed = 0;
        for entry in &previous.entries {
            let still_claimed = winners
                .binary_search_by(|(target, _)| (*target).cmp(entry.target.as_str()))
                .is_ok();
            if still_claimed {
                continue;
            }
            if let Removal::Removed = self.remove_owned(entry) {
                removed += 1;
            }
        }
        removed
    }

    fn remove_owned(&self, entry: &ManifestEntry) -> Removal {
        let target = self.game_root.join(&entry.target);
        let metadata = match fs::symlink_metadata(&target) {
            Ok(m) => m,
            Err(_) => return Removal::Missing,
        };

        let owned = if metadata.file_type().is_symlink() {
            true
        } else {
            entry.mode == DeploymentMode::Copy && entry.is_intact(&self.game_root)
        };

        if !owned {
            tracing::warn!("Leaving {} in place: it changed since deployment", target);
            return Removal::Kept;
        }

        match (self.remove)(&target) {
            Ok(()) => Removal::Removed,
            Err(e) => {
                tracing::warn!("Failed to remove {}: {}", target, e);
                Removal::Failed
            }
        }
    }

    fn materialize(
        &self,
        target: &str,
        owner: &Mod,
        mode: DeploymentMode,
    ) -> std::result::Result<ManifestEntry, DeployFailure> {
        let source = absolute(&owner.staging_path.join(target));
        let dest = self.game_root.join(target);

        let place = || -> io::Result<(DeploymentMode, Option<u64>)> {
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            remove_existing(&dest)?;

            if mode == DeploymentMode::Symlink {
                match (self.link)(&source, &dest) {
                    Ok(()) => return Ok((DeploymentMode::Symlink, None)),
                    Err(e) => {
                        tracing::warn!("Symlink failed for {}, copying instead: {}", target, e)
                    }
                }
            }

            copy_file_preserving(&source, &dest)?;
            Ok((DeploymentMode::Copy, Some(content_hash(&dest)?)))
        };

        match place() {
            Ok((used, hash)) => Ok(ManifestEntry {
                target: target.to_string(),
                mod_id: owner.id,
                source,
                mode: used,
                content_hash: hash,
            }),
            Err(e) => Err(DeployFailure {
                target: target.to_string(),
                mod_id: owner.id,
                message: e.to_string(),
            }),
        }
    }
}

/// Symlinks are resolved relative to the link's directory, so sources are
/// made absolute first.
fn absolute(path: &Utf8Path) -> Utf8PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::path::absolute(path)
        .ok()
        .and_then(|p| Utf8PathBuf::from_path_buf(p).ok())
        .unwrap_or_else(|| path.to_path_buf())
}
