use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    #[error("Game path is not configured")]
    #[diagnostic(
        code(config::game_path_missing),
        help("Run 'mhw-mod config auto-detect' or 'mhw-mod config set-game-path <path>'")
    )]
    GamePathNotSet,

    #[error("Not a Monster Hunter: World installation: {path}")]
    #[diagnostic(
        code(config::invalid_game_path),
        help("The path must be the game folder that contains 'nativePC' (e.g. ...\\steamapps\\common\\Monster Hunter World)")
    )]
    InvalidGamePath { path: Utf8PathBuf },

    #[error("No installed mod matches '{reference}'")]
    #[diagnostic(
        code(mods::not_found),
        help("Use 'mhw-mod list' to see installed mods. Mods can be referenced by id, id prefix or name")
    )]
    ModNotFound { reference: String },

    #[error("No profile matches '{reference}'")]
    #[diagnostic(
        code(profile::not_found),
        help("Use 'mhw-mod profile list' to see available profiles")
    )]
    ProfileNotFound { reference: String },

    #[error("Nothing is deployed")]
    #[diagnostic(code(deploy::not_deployed), help("Run 'mhw-mod deploy' first"))]
    NotDeployed,

    #[error("Failed to save configuration to {path}")]
    #[diagnostic(
        code(config::save_failed),
        help("Check file permissions of the configuration directory")
    )]
    ConfigSaveFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    #[diagnostic(code(library::error))]
    Library(#[from] mhw_mod_lib::Error),

    #[error("IO operation failed")]
    #[diagnostic(code(io::operation_failed))]
    IoError {
        #[from]
        source: std::io::Error,
    },
}

impl CliError {
    pub fn mod_not_found(reference: impl Into<String>) -> Self {
        Self::ModNotFound {
            reference: reference.into(),
        }
    }

    pub fn profile_not_found(reference: impl Into<String>) -> Self {
        Self::ProfileNotFound {
            reference: reference.into(),
        }
    }

    pub fn invalid_game_path(path: Utf8PathBuf) -> Self {
        Self::InvalidGamePath { path }
    }

    pub fn config_save_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::ConfigSaveFailed {
            path: path.into(),
            source,
        }
    }
}
