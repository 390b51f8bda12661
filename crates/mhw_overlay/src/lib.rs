//! Load-order conflict analysis and overlay deployment for Monster Hunter: World mods.
//!
//! Given the installed mods and a profile, this crate answers two questions with
//! the same resolution pass:
//!
//! - **Which paths conflict?** [`ConflictAnalyzer`] reports every relative path
//!   claimed by more than one enabled mod and which mod wins it.
//! - **What ends up in the game directory?** [`DeploymentEngine`] materializes
//!   the winner of every path as a symlink or copy, records what it placed in a
//!   persisted manifest, and can reverse the deployment later.
//!
//! The last enabled mod in load order wins every path it provides.
//!
//! # Example
//!
//! ```no_run
//! use mhw_overlay::{ConflictAnalyzer, DeploymentEngine};
//! use mhw_mod_core::{DeploymentMode, Mod, Profile};
//! use camino::Utf8PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # let mods: Vec<Mod> = Vec::new();
//! # let profile = Profile::new("Default");
//! let report = ConflictAnalyzer::new().analyze(&mods, &profile);
//! for conflict in &report.conflicts {
//!     println!("{} is won by {}", conflict.target_path, conflict.winner);
//! }
//!
//! let engine = DeploymentEngine::new(
//!     Utf8PathBuf::from("/games/Monster Hunter World"),
//!     Utf8PathBuf::from("/data/deployment.json"),
//!     DeploymentMode::Symlink,
//! );
//! let outcome = engine.deploy(&mods, &profile, None)?;
//! println!("Deployed {} files", outcome.files_deployed);
//! # Ok(())
//! # }
//! ```

pub mod conflicts;
pub mod deploy;
pub mod error;
pub mod resolution;
pub mod state;
pub mod utils;

// Re-export main types
pub use conflicts::{ConflictAnalysis, ConflictAnalyzer};
pub use deploy::{DeployFailure, DeploymentEngine, DeploymentOutcome, UndeployOutcome, VerifyReport};
pub use error::{Error, Result};
pub use resolution::{Resolution, SkipReason, SkippedMod};
pub use state::{DeploymentManifest, ManifestEntry};
