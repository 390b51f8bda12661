//! Core shared types and logic for Monster Hunter: World mod management.
//!
//! This crate holds the plain data model shared by the overlay engine, the mod
//! library and the `mhw-mod` CLI, together with the pure version comparison
//! logic and game installation detection. It performs no writes.

pub mod game_path;
mod models;
mod profile;
pub mod version;

pub use game_path::{auto_detect_game_path, is_valid_game_dir, native_pc_dir};
pub use models::{
    ConflictReport, DeploymentMode, DeploymentState, FileConflict, Mod, ParseModeError,
};
pub use profile::{Profile, ProfileModEntry};
pub use version::{compare_versions, parse as parse_version, ParsedVersion};
