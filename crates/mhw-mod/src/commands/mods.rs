use crate::errors::CliError;
use crate::println_pad;
use crate::utils::config::AppConfig;
use crate::utils::{open_library, resolve_mod, resolve_profile, short_id};
use camino::Utf8PathBuf;
use colored::Colorize;
use mhw_mod_core::version::format_version_display;
use mhw_mod_core::{Mod, Profile};
use mhw_mod_lib::{InstallOptions, InstallSource};
use miette::Result;

pub struct InstallModArgs {
    pub path: Utf8PathBuf,
    pub name: Option<String>,
    pub root_folder: Option<String>,
    pub version: Option<String>,
    pub enable: bool,
    pub profile: Option<String>,
}

pub fn install_mod(cfg: &AppConfig, args: InstallModArgs) -> Result<()> {
    let mut library = open_library(cfg)?;
    let source = InstallSource::detect(args.path);
    let options = InstallOptions {
        name: args.name,
        root_folder: args.root_folder,
        version: args.version,
    };

    println!("{} {}", "Installing".bright_cyan(), source.path().as_str().bright_white());
    let record = library.install(&source, &options).map_err(CliError::from)?;

    println!(
        "{} {} {}",
        "✓ Installed".bright_green().bold(),
        record.name.bright_cyan().bold(),
        format!("({})", short_id(record.id)).dimmed()
    );
    println_pad!("{} {}", "Files:".bright_white(), record.deployed_files.len());
    if let Some(version) = &record.version {
        println_pad!("{} {}", "Version:".bright_white(), format_version_display(version));
    }

    if args.enable {
        let profile = resolve_profile(&mut library, cfg, args.profile.as_deref())?;
        library
            .set_mod_enabled(profile.id, record.id, true)
            .map_err(CliError::from)?;
        println_pad!("{} {}", "Enabled in profile:".bright_white(), profile.name.bright_cyan());
    }

    Ok(())
}

pub fn uninstall_mod(cfg: &AppConfig, reference: &str, remove_archive: bool) -> Result<()> {
    let mut library = open_library(cfg)?;
    let record = resolve_mod(&mut library, reference)?;

    library
        .uninstall(record.id, remove_archive)
        .map_err(CliError::from)?;

    println!("{} {}", "✓ Uninstalled".bright_green().bold(), record.name.bright_cyan());
    Ok(())
}

fn print_mod_line(record: &Mod, profile: Option<&Profile>) {
    let status = match profile.and_then(|p| p.entry(record.id)) {
        Some(entry) if entry.enabled => format!("[{:>3}]", entry.load_order).bright_green(),
        Some(_) => "[off]".bright_yellow(),
        None => "[ - ]".dimmed(),
    };
    let version = record
        .version
        .as_deref()
        .map(format_version_display)
        .unwrap_or_default();

    println_pad!(
        "{} {} {} {}",
        status,
        short_id(record.id).dimmed(),
        record.name.bright_cyan().bold(),
        version.bright_white()
    );
}

pub fn list_mods(cfg: &AppConfig, profile: Option<&str>) -> Result<()> {
    let mut library = open_library(cfg)?;
    let profile = resolve_profile(&mut library, cfg, profile)?;

    let mut mods = library.mods().get_all().to_vec();
    if mods.is_empty() {
        println!("{}", "No mods installed".bright_yellow());
        return Ok(());
    }
    mods.sort_by_key(|m| m.name.to_lowercase());

    println!(
        "{} {} {}",
        "Installed mods".bright_blue().bold(),
        format!("({})", mods.len()).dimmed(),
        format!("profile: {}", profile.name).dimmed()
    );
    for record in &mods {
        print_mod_line(record, Some(&profile));
    }
    Ok(())
}

pub fn search_mods(cfg: &AppConfig, query: &str) -> Result<()> {
    let mut library = open_library(cfg)?;
    let matches: Vec<Mod> = library.mods().search(query).into_iter().cloned().collect();

    if matches.is_empty() {
        println!("{} '{}'", "No mods match".bright_yellow(), query);
        return Ok(());
    }
    for record in &matches {
        print_mod_line(record, None);
    }
    Ok(())
}

pub fn mod_info(cfg: &AppConfig, reference: &str) -> Result<()> {
    let mut library = open_library(cfg)?;
    let record = resolve_mod(&mut library, reference)?;

    let field = |name: &str, value: Option<String>| {
        println_pad!(
            "{} {}",
            format!("{}:", name).bright_white(),
            value.unwrap_or_else(|| "-".to_string())
        );
    };

    println!("{} {}", "📦".bright_blue(), record.name.bright_cyan().bold());
    field("Id", Some(record.id.to_string()));
    field("Version", record.version.as_deref().map(format_version_display));
    field("Author", record.author.clone());
    field("Description", record.description.clone());
    field("Source", record.source.clone());
    field("Installed", Some(record.installed_at.to_rfc3339()));
    field("Staging", Some(record.staging_path.to_string()));
    field("Archive", record.archive_path.as_ref().map(|p| p.to_string()));
    field("Checksum", record.archive_checksum.clone());
    if !record.tags.is_empty() {
        field("Tags", Some(record.tags.iter().cloned().collect::<Vec<_>>().join(", ")));
    }
    if let Some(remote) = record.remote_mod_id {
        let file = record
            .remote_file_id
            .map(|f| format!(" file {}", f))
            .unwrap_or_default();
        field("Remote", Some(format!("mod {}{}", remote, file)));
    }
    field("Files", Some(record.deployed_files.len().to_string()));
    for file in &record.deployed_files {
        println_pad!("  {} {}", "•".bright_cyan(), file);
    }
    Ok(())
}
