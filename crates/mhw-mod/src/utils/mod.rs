use crate::errors::CliError;
use config::AppConfig;
use mhw_mod_core::{is_valid_game_dir, Mod, Profile};
use mhw_mod_lib::ModLibrary;
use miette::Result;
use regex::Regex;
use std::sync::LazyLock;
use uuid::Uuid;

pub mod config;
pub mod logging;

#[macro_export]
macro_rules! println_pad {
    ($($arg:tt)*) => {{
        let __s = format!($($arg)*);
        for __line in __s.lines() {
            println!("    {}", __line);
        }
    }};
}

static ANSI_ESCAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("\x1b\\[[0-9;]*m").expect("ansi pattern must compile"));

/// Open the library for the configured game path.
pub fn open_library(cfg: &AppConfig) -> Result<ModLibrary> {
    let game_path = cfg.game_path.clone().ok_or(CliError::GamePathNotSet)?;
    if !is_valid_game_dir(&game_path) {
        return Err(CliError::invalid_game_path(game_path).into());
    }
    let data_dir = cfg.resolved_data_dir().ok_or_else(|| {
        miette::miette!("Could not determine a data directory, set 'data_dir' in the config file")
    })?;

    let library = ModLibrary::open(cfg.library_config(game_path, data_dir)).map_err(CliError::from)?;
    Ok(library)
}

/// Look up an installed mod by id, id prefix or name.
pub fn resolve_mod(library: &mut ModLibrary, reference: &str) -> Result<Mod> {
    library
        .mods()
        .find(reference)
        .cloned()
        .ok_or_else(|| CliError::mod_not_found(reference).into())
}

/// Look up a profile by reference, falling back to the active profile and
/// then to "Default".
pub fn resolve_profile(library: &mut ModLibrary, cfg: &AppConfig, reference: Option<&str>) -> Result<Profile> {
    if let Some(reference) = reference {
        return library
            .profiles()
            .find(reference)
            .cloned()
            .ok_or_else(|| CliError::profile_not_found(reference).into());
    }

    if let Some(active) = cfg.active_profile_id {
        if let Some(profile) = library.profiles().get(active) {
            return Ok(profile.clone());
        }
        tracing::warn!("Active profile {} no longer exists, using default", active);
    }

    let profile = library.profiles().default_profile().map_err(CliError::from)?;
    Ok(profile.clone())
}

/// First block of a UUID, enough to reference it on the command line.
pub fn short_id(id: Uuid) -> String {
    id.to_string()[..8].to_string()
}

/// Prints the provided lines inside an ASCII box
pub fn print_ansi_boxed_lines(lines: &[String]) {
    let visible_len = |s: &str| ANSI_ESCAPE.replace_all(s, "").chars().count();

    let width = lines
        .iter()
        .map(|s| visible_len(s.as_str()))
        .max()
        .unwrap_or(0);

    let border = "-".repeat(width + 4);
    println_pad!("{}", border);
    for line in lines {
        let pad = width - visible_len(line.as_str());
        println_pad!("| {}{} |", line, " ".repeat(pad));
    }
    println_pad!("{}", border);
}
