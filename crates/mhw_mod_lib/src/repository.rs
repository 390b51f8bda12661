//! Durable store of installed [`Mod`] records (`mods.json`).

use crate::error::{Error, Result};
use crate::store::{read_document, write_document, Loaded};
use camino::{Utf8Path, Utf8PathBuf};
use mhw_mod_core::Mod;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Default, Serialize, Deserialize)]
struct ModsDocument {
    #[serde(default)]
    mods: Vec<Mod>,
}

/// Keyed store of installed mods.
///
/// Loaded lazily on first access, mutated in memory and persisted as a whole
/// after every change. An unreadable file loads as an empty store.
#[derive(Debug)]
pub struct ModRepository {
    path: Utf8PathBuf,
    mods: Vec<Mod>,
    loaded: bool,
}

impl ModRepository {
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            path: path.into(),
            mods: Vec::new(),
            loaded: false,
        }
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Load the store from disk. Calling it again is a no-op.
    pub fn load(&mut self) {
        if self.loaded {
            return;
        }

        self.mods = match read_document::<ModsDocument>(&self.path) {
            Loaded::Found(document) => document.mods,
            Loaded::Missing => Vec::new(),
            Loaded::Unreadable => {
                tracing::warn!("Mod database {} is unreadable, starting empty", self.path);
                Vec::new()
            }
        };
        self.loaded = true;
        tracing::debug!("Loaded {} mods from {}", self.mods.len(), self.path);
    }

    pub fn save(&self) -> Result<()> {
        write_document(
            &self.path,
            &ModsDocument {
                mods: self.mods.clone(),
            },
        )
    }

    /// Add a new mod. Ids and staging paths must be unique.
    pub fn add(&mut self, record: Mod) -> Result<()> {
        self.load();
        if self.mods.iter().any(|m| m.id == record.id) {
            return Err(Error::ValidationFailed(format!(
                "Mod {} is already installed",
                record.id
            )));
        }
        if let Some(other) = self
            .mods
            .iter()
            .find(|m| m.staging_path == record.staging_path)
        {
            return Err(Error::ValidationFailed(format!(
                "Staging path {} is already used by '{}'",
                record.staging_path, other.name
            )));
        }

        tracing::info!("Added mod: {} (id={})", record.name, record.id);
        self.mods.push(record);
        self.save()
    }

    pub fn get(&mut self, id: Uuid) -> Option<&Mod> {
        self.load();
        self.mods.iter().find(|m| m.id == id)
    }

    pub fn get_all(&mut self) -> &[Mod] {
        self.load();
        &self.mods
    }

    /// Replace the stored record with the same id.
    pub fn update(&mut self, record: Mod) -> Result<()> {
        self.load();
        let slot = self
            .mods
            .iter_mut()
            .find(|m| m.id == record.id)
            .ok_or_else(|| Error::ModNotFound(record.id.to_string()))?;
        *slot = record;
        self.save()
    }

    pub fn remove(&mut self, id: Uuid) -> Result<Mod> {
        self.load();
        let index = self
            .mods
            .iter()
            .position(|m| m.id == id)
            .ok_or_else(|| Error::ModNotFound(id.to_string()))?;
        let removed = self.mods.remove(index);
        self.save()?;
        tracing::info!("Removed mod: {} (id={})", removed.name, removed.id);
        Ok(removed)
    }

    /// Case-insensitive substring search over name, author and tags.
    pub fn search(&mut self, query: &str) -> Vec<&Mod> {
        self.load();
        self.mods.iter().filter(|m| m.matches_query(query)).collect()
    }

    /// Case-insensitive exact name lookup.
    pub fn get_by_name(&mut self, name: &str) -> Option<&Mod> {
        self.load();
        let name = name.trim();
        self.mods.iter().find(|m| m.name.eq_ignore_ascii_case(name))
    }

    /// Resolve a user supplied reference: a full id, a unique id prefix, or a name.
    pub fn find(&mut self, reference: &str) -> Option<&Mod> {
        self.load();
        let reference = reference.trim();
        if let Ok(id) = Uuid::parse_str(reference) {
            return self.mods.iter().find(|m| m.id == id);
        }

        let lowered = reference.to_ascii_lowercase();
        let mut by_prefix = self
            .mods
            .iter()
            .filter(|m| !lowered.is_empty() && m.id.to_string().starts_with(&lowered));
        if let (Some(only), None) = (by_prefix.next(), by_prefix.next()) {
            return Some(only);
        }

        self.mods
            .iter()
            .find(|m| m.name.eq_ignore_ascii_case(reference))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::fs;
    use tempfile::TempDir;

    fn repo_in(dir: &TempDir) -> ModRepository {
        ModRepository::new(Utf8PathBuf::from_path_buf(dir.path().join("mods.json")).unwrap())
    }

    fn sample(name: &str) -> Mod {
        let id = Uuid::new_v4();
        Mod::new(id, name, Utf8PathBuf::from("/staging").join(id.to_string()))
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let mut repo = repo_in(&dir);
        assert!(repo.get_all().is_empty());
    }

    #[test]
    fn test_corrupt_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("mods.json"), b"{ not json").unwrap();
        let mut repo = repo_in(&dir);
        assert!(repo.get_all().is_empty());
    }

    #[test]
    fn test_round_trip_preserves_all_fields() {
        let dir = TempDir::new().unwrap();
        let mut full = sample("Full");
        full.version = Some("1.0".to_string());
        full.author = Some("Hunter".to_string());
        full.archive_checksum = Some("ab".repeat(32));
        full.remote_mod_id = Some(123);
        full.remote_file_id = Some(456);
        full.remote_uploaded_at = Some(Utc::now());
        let bare = sample("Bare");

        let mut repo = repo_in(&dir);
        repo.add(full.clone()).unwrap();
        repo.add(bare.clone()).unwrap();

        let mut reloaded = repo_in(&dir);
        assert_eq!(reloaded.get(full.id), Some(&full));
        assert_eq!(reloaded.get(bare.id), Some(&bare));
        assert_eq!(reloaded.get(bare.id).and_then(|m| m.remote_mod_id), None);
    }

    #[test]
    fn test_file_layout() {
        let dir = TempDir::new().unwrap();
        let mut repo = repo_in(&dir);
        repo.add(sample("A")).unwrap();

        let raw = fs::read_to_string(dir.path().join("mods.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["mods"].as_array().map(Vec::len), Some(1));
        assert!(value["mods"][0]["stagingPath"].is_string());
    }

    #[test]
    fn test_rejects_duplicate_staging_path() {
        let dir = TempDir::new().unwrap();
        let mut repo = repo_in(&dir);
        let a = sample("A");
        let mut b = sample("B");
        b.staging_path = a.staging_path.clone();

        repo.add(a.clone()).unwrap();
        assert!(matches!(repo.add(b), Err(Error::ValidationFailed(_))));
        assert!(matches!(repo.add(a), Err(Error::ValidationFailed(_))));
    }

    #[test]
    fn test_update_and_remove() {
        let dir = TempDir::new().unwrap();
        let mut repo = repo_in(&dir);
        let mut m = sample("A");
        repo.add(m.clone()).unwrap();

        m.remote_mod_id = Some(9);
        repo.update(m.clone()).unwrap();
        assert_eq!(repo_in(&dir).get(m.id).and_then(|m| m.remote_mod_id), Some(9));

        let removed = repo.remove(m.id).unwrap();
        assert_eq!(removed.id, m.id);
        assert!(matches!(repo.remove(m.id), Err(Error::ModNotFound(_))));
        assert!(matches!(repo.update(m), Err(Error::ModNotFound(_))));
        assert!(repo_in(&dir).get_all().is_empty());
    }

    #[test]
    fn test_search_and_lookup() {
        let dir = TempDir::new().unwrap();
        let mut repo = repo_in(&dir);
        let mut a = sample("Palico Armor");
        a.tags.insert("cosmetic".to_string());
        let b = sample("Weapon Rebalance");
        repo.add(a.clone()).unwrap();
        repo.add(b.clone()).unwrap();

        assert_eq!(repo.search("COSMETIC").len(), 1);
        assert_eq!(repo.search("a").len(), 2);
        assert_eq!(repo.get_by_name("weapon rebalance").map(|m| m.id), Some(b.id));
        assert_eq!(repo.find(&a.id.to_string()).map(|m| m.id), Some(a.id));
        assert_eq!(repo.find(&a.id.to_string()[..8]).map(|m| m.id), Some(a.id));
        assert_eq!(repo.find("Palico Armor").map(|m| m.id), Some(a.id));
        assert!(repo.find("nothing").is_none());
    }

    #[test]
    fn test_load_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let mut repo = repo_in(&dir);
        repo.add(sample("A")).unwrap();

        fs::write(dir.path().join("mods.json"), b"{\"mods\": []}").unwrap();
        repo.load();
        assert_eq!(repo.get_all().len(), 1);
    }
}
