use crate::errors::CliError;
use crate::println_pad;
use crate::utils::config::{self, AppConfig};
use crate::utils::{open_library, resolve_mod, resolve_profile, short_id};
use colored::Colorize;
use miette::Result;

/// How `profile order` moves a mod.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderChange {
    Up,
    Down,
    Set(i64),
}

pub fn list_profiles(cfg: &AppConfig) -> Result<()> {
    let mut library = open_library(cfg)?;
    let active = resolve_profile(&mut library, cfg, None)?.id;

    let mut profiles = library.profiles().get_all().to_vec();
    profiles.sort_by(|a, b| a.created_at.cmp(&b.created_at));

    println!("{}", "Profiles".bright_blue().bold());
    for profile in &profiles {
        let marker = if profile.id == active {
            "*".bright_green().bold()
        } else {
            " ".normal()
        };
        let enabled = profile.mods.iter().filter(|e| e.enabled).count();
        println_pad!(
            "{} {} {} {}",
            marker,
            short_id(profile.id).dimmed(),
            profile.name.bright_cyan().bold(),
            format!("({} of {} mods enabled)", enabled, profile.mods.len()).dimmed()
        );
        if let Some(description) = &profile.description {
            println_pad!("    {}", description);
        }
    }
    Ok(())
}

pub fn show_profile(cfg: &AppConfig, reference: Option<&str>) -> Result<()> {
    let mut library = open_library(cfg)?;
    let profile = resolve_profile(&mut library, cfg, reference)?;

    println!("{} {}", "Profile".bright_blue().bold(), profile.name.bright_cyan().bold());
    if profile.mods.is_empty() {
        println_pad!("{}", "No mods in this profile".bright_yellow());
        return Ok(());
    }
    for entry in profile.ordered_entries() {
        let name = library
            .mods()
            .get(entry.mod_id)
            .map(|m| m.name.clone())
            .unwrap_or_else(|| format!("<missing {}>", short_id(entry.mod_id)));
        let state = if entry.enabled {
            "on ".bright_green()
        } else {
            "off".bright_yellow()
        };
        println_pad!("{:>4} {} {}", entry.load_order, state, name);
    }
    Ok(())
}

pub fn create_profile(cfg: &AppConfig, name: &str, description: Option<String>) -> Result<()> {
    let mut library = open_library(cfg)?;
    let profile = library
        .profiles()
        .create(name, description)
        .map_err(CliError::from)?;

    println!(
        "{} {} {}",
        "✓ Created profile".bright_green().bold(),
        profile.name.bright_cyan(),
        format!("({})", short_id(profile.id)).dimmed()
    );
    Ok(())
}

pub fn rename_profile(cfg: &AppConfig, reference: &str, new_name: &str) -> Result<()> {
    let mut library = open_library(cfg)?;
    let profile = resolve_profile(&mut library, cfg, Some(reference))?;
    library
        .profiles()
        .rename(profile.id, new_name)
        .map_err(CliError::from)?;

    println!(
        "{} {} → {}",
        "✓ Renamed".bright_green().bold(),
        profile.name,
        new_name.trim().bright_cyan()
    );
    Ok(())
}

pub fn delete_profile(cfg: &AppConfig, reference: &str) -> Result<()> {
    let mut library = open_library(cfg)?;
    let profile = resolve_profile(&mut library, cfg, Some(reference))?;
    library.profiles().delete(profile.id).map_err(CliError::from)?;

    if cfg.active_profile_id == Some(profile.id) {
        let mut updated = cfg.clone();
        updated.active_profile_id = None;
        save(&updated)?;
    }

    println!("{} {}", "✓ Deleted profile".bright_green().bold(), profile.name);
    Ok(())
}

pub fn use_profile(cfg: &AppConfig, reference: &str) -> Result<()> {
    let mut library = open_library(cfg)?;
    let profile = resolve_profile(&mut library, cfg, Some(reference))?;

    let mut updated = cfg.clone();
    updated.active_profile_id = Some(profile.id);
    save(&updated)?;

    println!(
        "{} {}",
        "✓ Active profile:".bright_green().bold(),
        profile.name.bright_cyan()
    );
    Ok(())
}

pub fn set_enabled(cfg: &AppConfig, mod_reference: &str, profile: Option<&str>, enabled: bool) -> Result<()> {
    let mut library = open_library(cfg)?;
    let profile = resolve_profile(&mut library, cfg, profile)?;
    let record = resolve_mod(&mut library, mod_reference)?;

    library
        .set_mod_enabled(profile.id, record.id, enabled)
        .map_err(CliError::from)?;

    let verb = if enabled { "Enabled" } else { "Disabled" };
    println!(
        "{} {} in {}",
        format!("✓ {}", verb).bright_green().bold(),
        record.name.bright_cyan(),
        profile.name
    );
    Ok(())
}

pub fn reorder(cfg: &AppConfig, mod_reference: &str, profile: Option<&str>, change: OrderChange) -> Result<()> {
    let mut library = open_library(cfg)?;
    let profile = resolve_profile(&mut library, cfg, profile)?;
    let record = resolve_mod(&mut library, mod_reference)?;

    let moved = library
        .profiles()
        .modify(profile.id, |p| match change {
            OrderChange::Up => p.move_up(record.id),
            OrderChange::Down => p.move_down(record.id),
            OrderChange::Set(order) => p.set_mod_load_order(record.id, order),
        })
        .map_err(CliError::from)?;

    if moved {
        println!("{} {}", "✓ Reordered".bright_green().bold(), record.name.bright_cyan());
    } else {
        println!(
            "{} {} {}",
            "✗ Could not move".bright_yellow().bold(),
            record.name.bright_cyan(),
            "(not in profile, or already at the edge)".dimmed()
        );
    }
    Ok(())
}

fn save(cfg: &AppConfig) -> Result<()> {
    config::save_config(cfg)
        .map(|_| ())
        .map_err(|e| CliError::config_save_failed("config.toml", e).into())
}
