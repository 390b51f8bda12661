//! Application configuration management utilities.

use camino::Utf8PathBuf;
use directories_next::ProjectDirs;
use mhw_mod_core::DeploymentMode;
use mhw_mod_lib::LibraryConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use uuid::Uuid;

/// Application-wide configuration stored in config.toml.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub game_path: Option<Utf8PathBuf>,
    pub staging_dir: Option<Utf8PathBuf>,
    pub downloads_dir: Option<Utf8PathBuf>,
    pub data_dir: Option<Utf8PathBuf>,
    pub deployment_mode: DeploymentMode,
    pub keep_archives: bool,
    pub active_profile_id: Option<Uuid>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            game_path: None,
            staging_dir: None,
            downloads_dir: None,
            data_dir: None,
            deployment_mode: DeploymentMode::default(),
            keep_archives: true,
            active_profile_id: None,
        }
    }
}

impl AppConfig {
    /// The configured data directory, or the platform default.
    pub fn resolved_data_dir(&self) -> Option<Utf8PathBuf> {
        self.data_dir.clone().or_else(default_data_dir)
    }

    /// Build the library configuration for a given game root.
    pub fn library_config(&self, game_root: Utf8PathBuf, data_dir: Utf8PathBuf) -> LibraryConfig {
        let mut config = LibraryConfig::new(game_root, data_dir)
            .with_deployment_mode(self.deployment_mode)
            .with_keep_archives(self.keep_archives);
        if let Some(staging) = &self.staging_dir {
            config = config.with_staging_root(staging.clone());
        }
        if let Some(downloads) = &self.downloads_dir {
            config = config.with_downloads_root(downloads.clone());
        }
        config
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "mhw-mod")
}

/// Returns the default configuration file path (config.toml).
pub fn default_config_path() -> Option<Utf8PathBuf> {
    let dirs = project_dirs()?;
    Utf8PathBuf::from_path_buf(dirs.config_dir().join("config.toml")).ok()
}

/// Returns the platform data directory used when none is configured.
pub fn default_data_dir() -> Option<Utf8PathBuf> {
    let dirs = project_dirs()?;
    Utf8PathBuf::from_path_buf(dirs.data_dir().to_path_buf()).ok()
}

/// Parses a configuration file body. Unknown or invalid content yields `None`.
pub fn parse_config(content: &str) -> Option<AppConfig> {
    match toml::from_str(content) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            tracing::warn!("Ignoring invalid config file: {}", e);
            None
        }
    }
}

/// Loads the application configuration from config.toml.
/// Returns default configuration if file doesn't exist or cannot be parsed.
pub fn load_config() -> AppConfig {
    default_config_path()
        .and_then(|path| fs::read_to_string(path).ok())
        .and_then(|content| parse_config(&content))
        .unwrap_or_default()
}

/// Saves the application configuration to config.toml.
pub fn save_config(cfg: &AppConfig) -> io::Result<Utf8PathBuf> {
    let path = default_config_path().ok_or_else(|| {
        io::Error::new(io::ErrorKind::NotFound, "Could not determine config path")
    })?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(cfg).map_err(io::Error::other)?;
    fs::write(&path, content)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let cfg = parse_config("").unwrap();
        assert_eq!(cfg, AppConfig::default());
        assert!(cfg.keep_archives);
        assert_eq!(cfg.deployment_mode, DeploymentMode::Symlink);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let cfg = parse_config(
            r#"
            game_path = "/games/Monster Hunter World"
            deployment_mode = "copy"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.game_path, Some(Utf8PathBuf::from("/games/Monster Hunter World")));
        assert_eq!(cfg.deployment_mode, DeploymentMode::Copy);
        assert!(cfg.keep_archives);
        assert_eq!(cfg.active_profile_id, None);
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        assert!(parse_config("deployment_mode = \"hardlink\"").is_none());
        assert!(parse_config("[[[").is_none());
    }

    #[test]
    fn test_round_trip() {
        let cfg = AppConfig {
            game_path: Some(Utf8PathBuf::from("/g")),
            keep_archives: false,
            active_profile_id: Some(Uuid::new_v4()),
            ..AppConfig::default()
        };
        let content = toml::to_string_pretty(&cfg).unwrap();
        assert_eq!(parse_config(&content), Some(cfg));
    }

    #[test]
    fn test_library_config_overrides() {
        let cfg = AppConfig {
            staging_dir: Some(Utf8PathBuf::from("/fast/staging")),
            deployment_mode: DeploymentMode::Copy,
            ..AppConfig::default()
        };
        let library = cfg.library_config(Utf8PathBuf::from("/g"), Utf8PathBuf::from("/d"));
        assert_eq!(library.staging_root, Utf8PathBuf::from("/fast/staging"));
        assert_eq!(library.downloads_root, Utf8PathBuf::from("/d/downloads"));
        assert_eq!(library.deployment_mode, DeploymentMode::Copy);
    }
}
