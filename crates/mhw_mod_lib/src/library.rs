use crate::config::LibraryConfig;
use crate::error::{Error, Result};
use crate::installer::{ArchiveInstaller, InstallOptions, InstallSource};
use crate::profiles::ProfileStore;
use crate::repository::ModRepository;
use camino::Utf8PathBuf;
use fs2::FileExt;
use mhw_mod_core::{DeploymentMode, DeploymentState, Mod, Profile};
use mhw_overlay::{
    ConflictAnalysis, ConflictAnalyzer, DeploymentEngine, DeploymentOutcome, UndeployOutcome,
    VerifyReport,
};
use std::fs::{self, File, OpenOptions};
use uuid::Uuid;

/// Exclusive hold on the library's lock file, released on drop.
struct MutationLock {
    file: File,
    path: Utf8PathBuf,
}

impl MutationLock {
    fn acquire(path: Utf8PathBuf) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)?;
        if file.try_lock_exclusive().is_err() {
            return Err(Error::Busy(path));
        }
        tracing::debug!("Acquired lock {}", path);
        Ok(Self { file, path })
    }
}

impl Drop for MutationLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!("Failed to release lock {}: {}", self.path, e);
        }
    }
}

/// The installed mods, their profiles and the deployment of one game root.
///
/// Operations are synchronous and blocking; run them off any interactive
/// thread. Deploy and undeploy take an exclusive lock on the data directory
/// so two processes cannot mutate the same game root at once.
#[derive(Debug)]
pub struct ModLibrary {
    config: LibraryConfig,
    mods: ModRepository,
    profiles: ProfileStore,
    installer: ArchiveInstaller,
    engine: DeploymentEngine,
}

impl ModLibrary {
    /// Open the library described by `config`, creating its data directory.
    pub fn open(config: LibraryConfig) -> Result<Self> {
        fs::create_dir_all(&config.data_dir)?;

        let mods = ModRepository::new(config.mods_path());
        let profiles = ProfileStore::new(config.profiles_path());
        let installer = ArchiveInstaller::new(
            config.staging_root.clone(),
            config.downloads_root.clone(),
            config.keep_archives,
        );
        let engine = DeploymentEngine::new(
            config.game_root.clone(),
            config.manifest_path(),
            config.deployment_mode,
        );

        tracing::debug!("Opened mod library in {}", config.data_dir);
        Ok(Self {
            config,
            mods,
            profiles,
            installer,
            engine,
        })
    }

    pub fn config(&self) -> &LibraryConfig {
        &self.config
    }

    pub fn mods(&mut self) -> &mut ModRepository {
        &mut self.mods
    }

    pub fn profiles(&mut self) -> &mut ProfileStore {
        &mut self.profiles
    }

    pub fn engine(&self) -> &DeploymentEngine {
        &self.engine
    }

    /// Install a mod and record it. The staging tree is removed again if the
    /// record cannot be stored.
    pub fn install(&mut self, source: &InstallSource, options: &InstallOptions) -> Result<Mod> {
        let record = self.installer.install(source, options)?;
        if let Err(e) = self.mods.add(record.clone()) {
            if let Err(cleanup) = self.installer.uninstall(&record, false) {
                tracing::warn!("Failed to clean up {}: {}", record.staging_path, cleanup);
            }
            return Err(e);
        }
        Ok(record)
    }

    /// Delete a mod's files, drop it from every profile and forget it.
    ///
    /// File cleanup failures are logged; the record is removed regardless.
    pub fn uninstall(&mut self, mod_id: Uuid, remove_archive: bool) -> Result<Mod> {
        let record = self
            .mods
            .get(mod_id)
            .cloned()
            .ok_or_else(|| Error::ModNotFound(mod_id.to_string()))?;

        if let Err(e) = self.installer.uninstall(&record, remove_archive) {
            tracing::warn!("Failed to delete files of {}: {}", record.name, e);
        }
        match self.profiles.remove_mod_everywhere(mod_id) {
            Ok(changed) if changed > 0 => tracing::debug!("Removed {} from {} profiles", record.name, changed),
            Ok(_) => {}
            Err(e) => tracing::warn!("Failed to update profiles after removing {}: {}", record.name, e),
        }
        self.mods.remove(mod_id)
    }

    fn profile(&mut self, profile_id: Uuid) -> Result<Profile> {
        self.profiles
            .get(profile_id)
            .cloned()
            .ok_or_else(|| Error::ProfileNotFound(profile_id.to_string()))
    }

    /// Enable or disable an installed mod in a profile.
    pub fn set_mod_enabled(&mut self, profile_id: Uuid, mod_id: Uuid, enabled: bool) -> Result<()> {
        if self.mods.get(mod_id).is_none() {
            return Err(Error::ModNotFound(mod_id.to_string()));
        }
        self.profiles
            .modify(profile_id, |profile| profile.set_mod_enabled(mod_id, enabled))
    }

    /// Conflicts between the enabled mods of a profile.
    pub fn analyze_conflicts(&mut self, profile_id: Uuid) -> Result<ConflictAnalysis> {
        let profile = self.profile(profile_id)?;
        let analysis = ConflictAnalyzer::new().analyze_detailed(self.mods.get_all(), &profile);
        Ok(analysis)
    }

    /// Deploy a profile onto the game root, replacing any previous deployment.
    pub fn deploy(&mut self, profile_id: Uuid, mode: Option<DeploymentMode>) -> Result<DeploymentOutcome> {
        let _lock = MutationLock::acquire(self.config.lock_path())?;
        let profile = self.profile(profile_id)?;
        let outcome = self.engine.deploy(self.mods.get_all(), &profile, mode)?;
        Ok(outcome)
    }

    /// Remove the current deployment from the game root.
    pub fn undeploy(&mut self) -> Result<UndeployOutcome> {
        let _lock = MutationLock::acquire(self.config.lock_path())?;
        Ok(self.engine.undeploy()?)
    }

    /// The deployment recorded on disk, if any.
    pub fn deployment_state(&self) -> Result<Option<DeploymentState>> {
        Ok(self.engine.manifest()?.map(|manifest| manifest.state()))
    }

    pub fn verify(&self, state: &DeploymentState) -> VerifyReport {
        self.engine.verify_detailed(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn library_in(dir: &TempDir) -> ModLibrary {
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        fs::create_dir_all(root.join("game")).unwrap();
        ModLibrary::open(LibraryConfig::new(root.join("game"), root.join("data"))).unwrap()
    }

    #[test]
    fn test_lock_is_exclusive_and_released() {
        let dir = TempDir::new().unwrap();
        let library = library_in(&dir);
        let lock_path = library.config().lock_path();

        let held = MutationLock::acquire(lock_path.clone()).unwrap();
        assert!(matches!(MutationLock::acquire(lock_path.clone()), Err(Error::Busy(_))));
        drop(held);
        assert!(MutationLock::acquire(lock_path).is_ok());
    }

    #[test]
    fn test_deploy_while_locked_is_busy() {
        let dir = TempDir::new().unwrap();
        let mut library = library_in(&dir);
        let profile_id = library.profiles().default_profile().unwrap().id;

        let _held = MutationLock::acquire(library.config().lock_path()).unwrap();
        assert!(matches!(library.deploy(profile_id, None), Err(Error::Busy(_))));
        assert!(matches!(library.undeploy(), Err(Error::Busy(_))));
    }

    #[test]
    fn test_unknown_ids_are_reported() {
        let dir = TempDir::new().unwrap();
        let mut library = library_in(&dir);
        let profile_id = library.profiles().default_profile().unwrap().id;

        assert!(matches!(library.uninstall(Uuid::new_v4(), false), Err(Error::ModNotFound(_))));
        assert!(matches!(
            library.set_mod_enabled(profile_id, Uuid::new_v4(), true),
            Err(Error::ModNotFound(_))
        ));
        assert!(matches!(
            library.analyze_conflicts(Uuid::new_v4()),
            Err(Error::ProfileNotFound(_))
        ));
        assert!(library.deployment_state().unwrap().is_none());
    }
}
