use colored::Colorize;
use mhw_mod_core::version::{compare_versions, format_version_display, parse};
use miette::Result;
use std::cmp::Ordering;

pub fn compare(a: &str, b: &str) -> Result<()> {
    let symbol = match compare_versions(a, b) {
        Ordering::Less => "<".bright_yellow(),
        Ordering::Equal => "=".bright_green(),
        Ordering::Greater => ">".bright_cyan(),
    };
    println!(
        "{} {} {}",
        format_version_display(a).bright_white(),
        symbol.bold(),
        format_version_display(b).bright_white()
    );
    Ok(())
}

pub fn parse_version(input: &str) -> Result<()> {
    let parsed = parse(input);
    let field = |name: &str, value: String| println!("  {} {}", format!("{}:", name).bright_white(), value);

    field("original", format!("{:?}", parsed.original));
    if !parsed.is_parsed {
        println!("  {}", "not a recognized version, compared as text".bright_yellow());
        return Ok(());
    }
    field("major", parsed.major.to_string());
    field("minor", parsed.minor.to_string());
    field("patch", parsed.patch.to_string());
    field("prerelease", parsed.prerelease.clone().unwrap_or_else(|| "-".to_string()));
    field("build", parsed.build.clone().unwrap_or_else(|| "-".to_string()));
    field("display", format_version_display(input));
    Ok(())
}
