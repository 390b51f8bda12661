pub mod config;
pub mod deploy;
pub mod mods;
pub mod profile;
pub mod version;

pub use mods::InstallModArgs;
pub use profile::OrderChange;
