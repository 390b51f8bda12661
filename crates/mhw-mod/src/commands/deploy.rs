use crate::errors::CliError;
use crate::println_pad;
use crate::utils::config::AppConfig;
use crate::utils::{open_library, print_ansi_boxed_lines, resolve_profile, short_id};
use colored::Colorize;
use mhw_mod_core::DeploymentMode;
use mhw_mod_lib::{ModLibrary, SkippedMod};
use miette::Result;
use uuid::Uuid;

fn mod_name(library: &mut ModLibrary, id: Uuid) -> String {
    library
        .mods()
        .get(id)
        .map(|m| m.name.clone())
        .unwrap_or_else(|| short_id(id))
}

fn print_skipped(library: &mut ModLibrary, skipped: &[SkippedMod]) {
    for skip in skipped {
        let name = mod_name(library, skip.mod_id);
        println_pad!("{} {} {}", "⚠".bright_yellow(), name.bright_cyan(), format!("skipped: {}", skip.reason).dimmed());
    }
}

pub fn show_conflicts(cfg: &AppConfig, profile: Option<&str>) -> Result<()> {
    let mut library = open_library(cfg)?;
    let profile = resolve_profile(&mut library, cfg, profile)?;
    let analysis = library.analyze_conflicts(profile.id).map_err(CliError::from)?;

    print_skipped(&mut library, &analysis.skipped);
    let report = analysis.report;
    if !report.has_conflicts() {
        println!(
            "{} {}",
            "✓ No conflicts in profile".bright_green().bold(),
            profile.name.bright_cyan()
        );
        return Ok(());
    }

    println!(
        "{} {} {}",
        "Conflicts in profile".bright_blue().bold(),
        profile.name.bright_cyan().bold(),
        format!("({})", report.conflicts.len()).dimmed()
    );
    for conflict in &report.conflicts {
        let contributors: Vec<String> = conflict
            .contributing_mods
            .iter()
            .map(|id| mod_name(&mut library, *id))
            .collect();
        println_pad!("{}", conflict.target_path.bright_white());
        println_pad!(
            "  {} {} {}",
            "winner:".bright_green(),
            mod_name(&mut library, conflict.winner).bright_cyan().bold(),
            format!("(over {})", contributors[..contributors.len() - 1].join(", ")).dimmed()
        );
    }
    Ok(())
}

pub fn deploy_profile(cfg: &AppConfig, profile: Option<&str>, mode: Option<DeploymentMode>) -> Result<()> {
    let mut library = open_library(cfg)?;
    let profile = resolve_profile(&mut library, cfg, profile)?;

    println!(
        "{} {} {}",
        "Deploying profile".bright_cyan(),
        profile.name.bright_cyan().bold(),
        format!("({})", mode.unwrap_or(cfg.deployment_mode)).dimmed()
    );
    let outcome = library.deploy(profile.id, mode).map_err(CliError::from)?;

    print_skipped(&mut library, &outcome.skipped);
    for failure in &outcome.failures {
        println_pad!("{} {} {}", "✗".bright_red(), failure.target, failure.message.dimmed());
    }

    let mut lines = vec![
        format!("{} {}", "Mods deployed:".bright_white(), outcome.state.deployed_mods.len()),
        format!("{} {}", "Files deployed:".bright_white(), outcome.files_deployed),
    ];
    if outcome.symlink_fallbacks > 0 {
        lines.push(format!(
            "{} {}",
            "Copied (symlink failed):".bright_yellow(),
            outcome.symlink_fallbacks
        ));
    }
    if outcome.stale_removed > 0 {
        lines.push(format!("{} {}", "Stale files removed:".bright_white(), outcome.stale_removed));
    }
    if !outcome.failures.is_empty() {
        lines.push(format!("{} {}", "Failed:".bright_red(), outcome.failures.len()));
    }
    print_ansi_boxed_lines(&lines);

    if outcome.failures.is_empty() {
        println!("{}", "✓ Deployment complete".bright_green().bold());
    } else {
        println!("{}", "✓ Deployment complete with errors".bright_yellow().bold());
    }
    Ok(())
}

pub fn undeploy(cfg: &AppConfig) -> Result<()> {
    let mut library = open_library(cfg)?;
    let outcome = library.undeploy().map_err(CliError::from)?;

    for kept in &outcome.kept {
        println_pad!("{} {} {}", "⚠".bright_yellow(), kept, "(modified since deployment, left in place)".dimmed());
    }
    println!(
        "{} {} {}",
        "✓ Removed".bright_green().bold(),
        outcome.removed.len(),
        "deployed files".bright_green()
    );
    if !outcome.missing.is_empty() {
        println_pad!("{} {}", "Already missing:".dimmed(), outcome.missing.len());
    }
    Ok(())
}

pub fn verify(cfg: &AppConfig) -> Result<()> {
    let library = open_library(cfg)?;
    let state = library
        .deployment_state()
        .map_err(CliError::from)?
        .ok_or(CliError::NotDeployed)?;
    let report = library.verify(&state);

    let check = |ok: bool| if ok { "✓".bright_green() } else { "✗".bright_red() };
    println_pad!("{} Game directory present", check(report.game_root_present));
    println_pad!("{} Deployment recorded", check(report.manifest_present));
    println_pad!("{} Deployed files intact", check(report.broken.is_empty()));
    for broken in &report.broken {
        println_pad!("    {} {}", "•".bright_red(), broken);
    }

    if report.is_valid() {
        println!("{}", "✓ Deployment is intact".bright_green().bold());
        Ok(())
    } else {
        Err(miette::miette!(
            help = "Run 'mhw-mod deploy' to restore the deployment",
            "Deployment is no longer intact"
        ))
    }
}
