use camino::{Utf8Path, Utf8PathBuf};
use mhw_mod_core::DeploymentMode;

/// Paths and policies the library operates with.
///
/// Built by the application (usually from its config file) and handed to
/// [`ModLibrary::open`](crate::ModLibrary::open). The library never modifies it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryConfig {
    /// Game installation root that deployments target.
    pub game_root: Utf8PathBuf,
    /// Parent of the per-mod staging directories.
    pub staging_root: Utf8PathBuf,
    /// Where archive copies are retained when `keep_archives` is set.
    pub downloads_root: Utf8PathBuf,
    /// Holds `mods.json`, `profiles.json`, the deployment manifest and the lock file.
    pub data_dir: Utf8PathBuf,
    pub deployment_mode: DeploymentMode,
    pub keep_archives: bool,
}

impl LibraryConfig {
    /// A config with staging and downloads placed under `data_dir`.
    pub fn new(game_root: impl Into<Utf8PathBuf>, data_dir: impl Into<Utf8PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            game_root: game_root.into(),
            staging_root: data_dir.join("staging"),
            downloads_root: data_dir.join("downloads"),
            data_dir,
            deployment_mode: DeploymentMode::default(),
            keep_archives: true,
        }
    }

    pub fn with_staging_root(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.staging_root = path.into();
        self
    }

    pub fn with_downloads_root(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.downloads_root = path.into();
        self
    }

    pub fn with_deployment_mode(mut self, mode: DeploymentMode) -> Self {
        self.deployment_mode = mode;
        self
    }

    pub fn with_keep_archives(mut self, keep: bool) -> Self {
        self.keep_archives = keep;
        self
    }

    pub fn mods_path(&self) -> Utf8PathBuf {
        self.data_dir.join("mods.json")
    }

    pub fn profiles_path(&self) -> Utf8PathBuf {
        self.data_dir.join("profiles.json")
    }

    pub fn manifest_path(&self) -> Utf8PathBuf {
        self.data_dir.join("deployment.json")
    }

    pub fn lock_path(&self) -> Utf8PathBuf {
        self.data_dir.join(".lock")
    }

    pub fn data_dir(&self) -> &Utf8Path {
        &self.data_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_live_under_data_dir() {
        let config = LibraryConfig::new("/games/mhw", "/data");
        assert_eq!(config.staging_root, Utf8PathBuf::from("/data/staging"));
        assert_eq!(config.downloads_root, Utf8PathBuf::from("/data/downloads"));
        assert_eq!(config.mods_path(), Utf8PathBuf::from("/data/mods.json"));
        assert_eq!(config.deployment_mode, DeploymentMode::Symlink);
        assert!(config.keep_archives);
    }

    #[test]
    fn test_builders_override_paths() {
        let config = LibraryConfig::new("/g", "/d")
            .with_staging_root("/fast/staging")
            .with_deployment_mode(DeploymentMode::Copy)
            .with_keep_archives(false);
        assert_eq!(config.staging_root, Utf8PathBuf::from("/fast/staging"));
        assert_eq!(config.downloads_root, Utf8PathBuf::from("/d/downloads"));
        assert_eq!(config.deployment_mode, DeploymentMode::Copy);
        assert!(!config.keep_archives);
    }
}
