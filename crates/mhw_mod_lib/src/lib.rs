//! Mod library management for Monster Hunter: World.
//!
//! [`ModLibrary`] ties together the pieces a mod manager needs:
//!
//! - [`ArchiveInstaller`] unpacks archives or copies folders into isolated
//!   staging directories, stripping wrapper folders around `nativePC`.
//! - [`ModRepository`] and [`ProfileStore`] persist installed mods and the
//!   profiles that enable and order them.
//! - Conflict analysis and deployment are delegated to [`mhw_overlay`].
//!
//! ```no_run
//! use mhw_mod_lib::{InstallOptions, InstallSource, LibraryConfig, ModLibrary};
//!
//! # fn main() -> mhw_mod_lib::Result<()> {
//! let config = LibraryConfig::new("/games/Monster Hunter World", "/data/mhw-mod");
//! let mut library = ModLibrary::open(config)?;
//!
//! let record = library.install(
//!     &InstallSource::Archive("/downloads/Cool Armor-1.2.zip".into()),
//!     &InstallOptions::default(),
//! )?;
//! let profile_id = library.profiles().default_profile()?.id;
//! library.set_mod_enabled(profile_id, record.id, true)?;
//! library.deploy(profile_id, None)?;
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod installer;
mod library;
mod profiles;
mod repository;
mod store;

pub use config::LibraryConfig;
pub use error::{Error, Result};
pub use installer::{detect_root_prefix, file_checksum, ArchiveInstaller, InstallOptions, InstallSource};
pub use library::ModLibrary;
pub use profiles::{ProfileStore, DEFAULT_PROFILE_NAME};
pub use repository::ModRepository;

pub use mhw_overlay::{ConflictAnalysis, DeploymentOutcome, SkipReason, SkippedMod, UndeployOutcome, VerifyReport};
