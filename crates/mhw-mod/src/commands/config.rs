use crate::errors::CliError;
use crate::utils::config::{self, AppConfig};
use camino::Utf8PathBuf;
use colored::Colorize;
use mhw_mod_core::{auto_detect_game_path, is_valid_game_dir, DeploymentMode};
use miette::Result;

fn save(cfg: &AppConfig) -> Result<Utf8PathBuf> {
    let path = config::default_config_path()
        .map(|p| p.to_string())
        .unwrap_or_else(|| "config.toml".to_string());
    config::save_config(cfg).map_err(|e| CliError::config_save_failed(path, e).into())
}

/// Print a config path entry with status indicator
fn print_path_config(name: &str, path: Option<&Utf8PathBuf>, validator: impl Fn(&Utf8PathBuf) -> bool) {
    match path {
        Some(p) => {
            let status = if validator(p) {
                "✓".bright_green()
            } else {
                "✗".bright_red()
            };
            println!("  {} {} {}", format!("{}:", name).bright_white(), p, status);
        }
        None => {
            println!(
                "  {} {}",
                format!("{}:", name).bright_white(),
                "(not set)".bright_yellow()
            );
        }
    }
}

fn print_value(name: &str, value: impl std::fmt::Display) {
    println!("  {} {}", format!("{}:", name).bright_white(), value);
}

pub fn show_config(cfg: &AppConfig) -> Result<()> {
    let config_path = config::default_config_path()
        .map(|p| p.to_string())
        .unwrap_or_else(|| "Unknown".to_string());

    println!();
    println!("  {} {}", "config_file:".bright_white(), config_path);

    print_path_config("game_path", cfg.game_path.as_ref(), |p| is_valid_game_dir(p));
    let data_dir = cfg.resolved_data_dir();
    print_path_config("data_dir", data_dir.as_ref(), |p| p.exists());
    print_path_config("staging_dir", cfg.staging_dir.as_ref(), |p| p.exists());
    print_path_config("downloads_dir", cfg.downloads_dir.as_ref(), |p| p.exists());
    print_value("deployment_mode", cfg.deployment_mode);
    print_value("keep_archives", cfg.keep_archives);
    print_value(
        "active_profile_id",
        cfg.active_profile_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "(default)".to_string()),
    );

    println!();
    Ok(())
}

pub fn set_game_path(cfg: &AppConfig, path: Utf8PathBuf) -> Result<()> {
    if !is_valid_game_dir(&path) {
        eprintln!(
            "  {}",
            "The path must be the Monster Hunter: World game folder.".bright_yellow()
        );
        eprintln!(
            "  {}",
            "Example: C:\\Program Files (x86)\\Steam\\steamapps\\common\\Monster Hunter World"
                .bright_yellow()
        );
        eprintln!();
        eprintln!("  {} The folder does not exist", "•".bright_red());
        eprintln!("  {} The folder has no 'nativePC' directory", "•".bright_red());

        return Err(CliError::invalid_game_path(path).into());
    }

    let mut updated = cfg.clone();
    updated.game_path = Some(path.clone());
    save(&updated)?;

    println!("{}", "✓ Game path set successfully!".bright_green().bold());
    println!();
    println!("  {} {}", "Path:".bright_white().bold(), path.as_str().bright_green());

    Ok(())
}

pub fn auto_detect(cfg: &AppConfig) -> Result<()> {
    println!(
        "{}",
        "Searching for Monster Hunter: World installation...".bright_cyan()
    );
    println!();

    match auto_detect_game_path() {
        Some(detected_path) => {
            println!("{}", "✓ Found Monster Hunter: World!".bright_green().bold());
            println!();
            println!(
                "  {} {}",
                "Path:".bright_white().bold(),
                detected_path.as_str().bright_green()
            );
            println!();

            let mut updated = cfg.clone();
            updated.game_path = Some(detected_path);
            save(&updated)?;

            println!(
                "{}",
                "✓ Configuration updated successfully!".bright_green().bold()
            );
        }
        None => {
            println!(
                "{}",
                "✗ Could not automatically detect Monster Hunter: World installation"
                    .bright_red()
                    .bold()
            );
            println!();
            println!(
                "  {} Use 'mhw-mod config set-game-path <path>' to set the path manually",
                "•".bright_cyan()
            );
            println!(
                "  {} The path should contain the game's 'nativePC' folder",
                "•".bright_cyan()
            );
        }
    }

    Ok(())
}

pub fn set_mode(cfg: &AppConfig, mode: DeploymentMode) -> Result<()> {
    let mut updated = cfg.clone();
    updated.deployment_mode = mode;
    save(&updated)?;
    println!("{} {}", "✓ Deployment mode:".bright_green().bold(), mode);
    Ok(())
}

pub fn set_keep_archives(cfg: &AppConfig, keep: bool) -> Result<()> {
    let mut updated = cfg.clone();
    updated.keep_archives = keep;
    save(&updated)?;
    println!("{} {}", "✓ Keep archives:".bright_green().bold(), keep);
    Ok(())
}

/// Try to fill in the game path on first use.
pub fn ensure_game_path(cfg: &mut AppConfig) {
    if cfg.game_path.is_some() {
        return;
    }
    if let Some(detected_path) = auto_detect_game_path() {
        tracing::info!("Detected game installation at {}", detected_path);
        cfg.game_path = Some(detected_path);
        if let Err(e) = config::save_config(cfg) {
            tracing::warn!("Failed to save detected game path: {}", e);
        }
    }
}
