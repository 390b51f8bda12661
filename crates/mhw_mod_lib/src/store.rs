//! Whole-file JSON persistence shared by the mod and profile stores.

use crate::error::Result;
use camino::Utf8Path;
use mhw_overlay::utils::write_atomic;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io;

pub(crate) enum Loaded<T> {
    Missing,
    Unreadable,
    Found(T),
}

/// Read a JSON document. Failures are logged and reported as `Unreadable`.
pub(crate) fn read_document<T: DeserializeOwned>(path: &Utf8Path) -> Loaded<T> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Loaded::Missing,
        Err(e) => {
            tracing::error!("Failed to read {}: {}", path, e);
            return Loaded::Unreadable;
        }
    };

    match serde_json::from_str(&contents) {
        Ok(value) => Loaded::Found(value),
        Err(e) => {
            tracing::error!("Failed to parse {}: {}", path, e);
            Loaded::Unreadable
        }
    }
}

/// Write a JSON document atomically.
pub(crate) fn write_document<T: Serialize>(path: &Utf8Path, value: &T) -> Result<()> {
    let contents = serde_json::to_vec_pretty(value)?;
    if let Err(e) = write_atomic(path, &contents) {
        tracing::error!("Failed to write {}: {}", path, e);
        return Err(e.into());
    }
    Ok(())
}
