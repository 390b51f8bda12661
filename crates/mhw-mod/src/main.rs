use camino::Utf8PathBuf;
use clap::builder::{styling::AnsiColor, Styles};
use clap::{ArgAction, ColorChoice};
use clap::{Args as ClapArgs, CommandFactory, FromArgMatches, Parser, Subcommand};
use commands::{config, deploy, mods, profile, version, InstallModArgs, OrderChange};
use mhw_mod_core::DeploymentMode;
use miette::Result;

mod commands;
mod errors;
mod utils;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Install a mod from an archive or a folder
    Install {
        /// Path to a .zip archive or a mod folder
        path: Utf8PathBuf,

        /// Name to show instead of the file or folder name
        #[arg(short, long)]
        name: Option<String>,

        /// Archive folder to use as the mod root instead of detecting it
        #[arg(long)]
        root_folder: Option<String>,

        /// Version to record instead of reading it from the file name
        #[arg(long = "mod-version")]
        mod_version: Option<String>,

        /// Enable the mod in the profile right away
        #[arg(short, long)]
        enable: bool,

        /// Profile to enable the mod in (defaults to the active profile)
        #[arg(short, long)]
        profile: Option<String>,
    },
    /// Remove an installed mod
    Uninstall {
        /// Mod id, id prefix or name
        #[arg(value_name = "MOD")]
        mod_ref: String,

        /// Also delete the archive kept in the downloads folder
        #[arg(long)]
        remove_archive: bool,
    },
    /// List installed mods
    List {
        #[arg(short, long)]
        profile: Option<String>,
    },
    /// Search installed mods by name, author or tag
    Search { query: String },
    /// Show details about an installed mod
    Info {
        #[arg(value_name = "MOD")]
        mod_ref: String,
    },
    /// Manage profiles
    #[command(subcommand)]
    Profile(ProfileCommands),
    /// Show files claimed by more than one enabled mod
    Conflicts {
        #[arg(short, long)]
        profile: Option<String>,
    },
    /// Deploy a profile into the game folder
    Deploy {
        #[arg(short, long)]
        profile: Option<String>,

        /// symlink or copy (defaults to the configured mode)
        #[arg(short, long)]
        mode: Option<DeploymentMode>,
    },
    /// Remove deployed files from the game folder
    Undeploy,
    /// Check that the current deployment is still in place
    Verify,
    /// Parse and compare mod version strings
    #[command(subcommand)]
    Version(VersionCommands),
    /// Show or change configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand, Debug)]
pub enum ProfileCommands {
    /// List profiles
    List,
    /// Show the mods of a profile in load order
    Show { profile: Option<String> },
    /// Create an empty profile
    Create {
        name: String,
        #[arg(short, long)]
        description: Option<String>,
    },
    /// Rename a profile
    Rename { profile: String, new_name: String },
    /// Delete a profile
    Delete { profile: String },
    /// Make a profile the default for other commands
    Use { profile: String },
    /// Enable a mod in a profile
    Enable {
        #[arg(value_name = "MOD")]
        mod_ref: String,
        #[arg(short, long)]
        profile: Option<String>,
    },
    /// Disable a mod in a profile
    Disable {
        #[arg(value_name = "MOD")]
        mod_ref: String,
        #[arg(short, long)]
        profile: Option<String>,
    },
    /// Change a mod's position in the load order
    Order {
        #[arg(value_name = "MOD")]
        mod_ref: String,
        #[arg(short, long)]
        profile: Option<String>,
        #[command(flatten)]
        change: OrderArgs,
    },
}

#[derive(ClapArgs, Debug)]
#[group(required = true, multiple = false)]
pub struct OrderArgs {
    /// Load the mod one step earlier
    #[arg(long)]
    up: bool,
    /// Load the mod one step later
    #[arg(long)]
    down: bool,
    /// Set an explicit load order value
    #[arg(long, value_name = "N", allow_negative_numbers = true)]
    set: Option<i64>,
}

impl OrderArgs {
    fn change(&self) -> OrderChange {
        match (self.up, self.down, self.set) {
            (_, _, Some(order)) => OrderChange::Set(order),
            (true, _, None) => OrderChange::Up,
            _ => OrderChange::Down,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum VersionCommands {
    /// Compare two version strings
    Compare { a: String, b: String },
    /// Show how a version string is interpreted
    Parse { input: String },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the current configuration
    Show,
    /// Set the game folder
    SetGamePath { path: Utf8PathBuf },
    /// Search for the game folder and save it
    AutoDetect,
    /// Set the default deployment mode (symlink or copy)
    SetMode { mode: DeploymentMode },
    /// Keep a copy of installed archives in the downloads folder
    SetKeepArchives {
        #[arg(action = ArgAction::Set)]
        keep: bool,
    },
}

fn parse_args() -> Args {
    // Configure colored/styled help output
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default().bold())
        .usage(AnsiColor::Green.on_default().bold())
        .literal(AnsiColor::Cyan.on_default())
        .placeholder(AnsiColor::Blue.on_default());

    let matches = Args::command()
        .styles(styles)
        .color(ColorChoice::Auto)
        .get_matches();

    Args::from_arg_matches(&matches).unwrap_or_else(|e| e.exit())
}

fn main() -> Result<()> {
    let args = parse_args();
    let mut cfg = utils::config::load_config();

    let log_dir = cfg.resolved_data_dir().map(|dir| dir.join("logs"));
    let _log_guard = utils::logging::init_logging(log_dir.as_deref(), args.verbose);

    if !matches!(args.command, Commands::Config(_) | Commands::Version(_)) {
        config::ensure_game_path(&mut cfg);
    }

    match args.command {
        Commands::Install {
            path,
            name,
            root_folder,
            mod_version,
            enable,
            profile,
        } => mods::install_mod(
            &cfg,
            InstallModArgs {
                path,
                name,
                root_folder,
                version: mod_version,
                enable,
                profile,
            },
        ),
        Commands::Uninstall {
            mod_ref,
            remove_archive,
        } => mods::uninstall_mod(&cfg, &mod_ref, remove_archive),
        Commands::List { profile } => mods::list_mods(&cfg, profile.as_deref()),
        Commands::Search { query } => mods::search_mods(&cfg, &query),
        Commands::Info { mod_ref } => mods::mod_info(&cfg, &mod_ref),
        Commands::Profile(command) => match command {
            ProfileCommands::List => profile::list_profiles(&cfg),
            ProfileCommands::Show { profile } => profile::show_profile(&cfg, profile.as_deref()),
            ProfileCommands::Create { name, description } => {
                profile::create_profile(&cfg, &name, description)
            }
            ProfileCommands::Rename { profile, new_name } => {
                profile::rename_profile(&cfg, &profile, &new_name)
            }
            ProfileCommands::Delete { profile } => profile::delete_profile(&cfg, &profile),
            ProfileCommands::Use { profile } => profile::use_profile(&cfg, &profile),
            ProfileCommands::Enable { mod_ref, profile } => {
                profile::set_enabled(&cfg, &mod_ref, profile.as_deref(), true)
            }
            ProfileCommands::Disable { mod_ref, profile } => {
                profile::set_enabled(&cfg, &mod_ref, profile.as_deref(), false)
            }
            ProfileCommands::Order {
                mod_ref,
                profile,
                change,
            } => profile::reorder(&cfg, &mod_ref, profile.as_deref(), change.change()),
        },
        Commands::Conflicts { profile } => deploy::show_conflicts(&cfg, profile.as_deref()),
        Commands::Deploy { profile, mode } => deploy::deploy_profile(&cfg, profile.as_deref(), mode),
        Commands::Undeploy => deploy::undeploy(&cfg),
        Commands::Verify => deploy::verify(&cfg),
        Commands::Version(command) => match command {
            VersionCommands::Compare { a, b } => version::compare(&a, &b),
            VersionCommands::Parse { input } => version::parse_version(&input),
        },
        Commands::Config(command) => match command {
            ConfigCommands::Show => config::show_config(&cfg),
            ConfigCommands::SetGamePath { path } => config::set_game_path(&cfg, path),
            ConfigCommands::AutoDetect => config::auto_detect(&cfg),
            ConfigCommands::SetMode { mode } => config::set_mode(&cfg, mode),
            ConfigCommands::SetKeepArchives { keep } => config::set_keep_archives(&cfg, keep),
        },
    }
}
