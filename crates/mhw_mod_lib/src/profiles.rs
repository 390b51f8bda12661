//! Durable store of [`Profile`]s (`profiles.json`).

use crate::error::{Error, Result};
use crate::store::{read_document, write_document, Loaded};
use camino::{Utf8Path, Utf8PathBuf};
use mhw_mod_core::Profile;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_PROFILE_NAME: &str = "Default";

#[derive(Debug, Default, Serialize, Deserialize)]
struct ProfilesDocument {
    #[serde(default)]
    profiles: Vec<Profile>,
}

/// Keyed store of profiles. Always holds at least one profile once loaded.
#[derive(Debug)]
pub struct ProfileStore {
    path: Utf8PathBuf,
    profiles: Vec<Profile>,
    loaded: bool,
}

impl ProfileStore {
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            path: path.into(),
            profiles: Vec::new(),
            loaded: false,
        }
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Load the store from disk. Calling it again is a no-op.
    ///
    /// A missing, empty or unreadable file yields a single "Default" profile.
    pub fn load(&mut self) {
        if self.loaded {
            return;
        }

        let (profiles, persist) = match read_document::<ProfilesDocument>(&self.path) {
            Loaded::Found(document) => (document.profiles, false),
            Loaded::Missing => (Vec::new(), true),
            Loaded::Unreadable => {
                tracing::warn!("Profile store {} is unreadable, using defaults", self.path);
                (Vec::new(), false)
            }
        };
        self.profiles = profiles;
        self.loaded = true;

        for profile in &mut self.profiles {
            let dropped = profile.dedup_entries();
            if dropped > 0 {
                tracing::warn!(
                    "Profile '{}' listed {} mods more than once, keeping the first entries",
                    profile.name,
                    dropped
                );
            }
        }

        if self.profiles.is_empty() {
            self.profiles.push(Profile::new(DEFAULT_PROFILE_NAME));
            tracing::info!("Created default profile");
            if persist {
                if let Err(e) = self.save() {
                    tracing::warn!("Failed to persist default profile: {}", e);
                }
            }
        }
    }

    pub fn save(&self) -> Result<()> {
        write_document(
            &self.path,
            &ProfilesDocument {
                profiles: self.profiles.clone(),
            },
        )
    }

    fn validate_name(&self, name: &str, except: Option<Uuid>) -> Result<String> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(Error::ValidationFailed(
                "Profile name cannot be empty".to_string(),
            ));
        }
        if self
            .profiles
            .iter()
            .any(|p| p.name == name && Some(p.id) != except)
        {
            return Err(Error::ValidationFailed(format!(
                "Profile '{}' already exists",
                name
            )));
        }
        Ok(name)
    }

    /// Create a new, empty profile.
    pub fn create(&mut self, name: &str, description: Option<String>) -> Result<Profile> {
        self.load();
        let name = self.validate_name(name, None)?;

        let mut profile = Profile::new(name);
        profile.description = description;
        self.profiles.push(profile.clone());
        self.save()?;

        tracing::info!("Created profile: {} (id={})", profile.name, profile.id);
        Ok(profile)
    }

    pub fn get(&mut self, id: Uuid) -> Option<&Profile> {
        self.load();
        self.profiles.iter().find(|p| p.id == id)
    }

    pub fn get_by_name(&mut self, name: &str) -> Option<&Profile> {
        self.load();
        let name = name.trim();
        self.profiles.iter().find(|p| p.name == name)
    }

    /// Resolve a full id, a unique id prefix or a name.
    pub fn find(&mut self, reference: &str) -> Option<&Profile> {
        self.load();
        let reference = reference.trim();
        if let Ok(id) = Uuid::parse_str(reference) {
            return self.profiles.iter().find(|p| p.id == id);
        }

        let lowered = reference.to_ascii_lowercase();
        let mut by_prefix = self
            .profiles
            .iter()
            .filter(|p| !lowered.is_empty() && p.id.to_string().starts_with(&lowered));
        if let (Some(only), None) = (by_prefix.next(), by_prefix.next()) {
            return Some(only);
        }

        self.profiles.iter().find(|p| p.name == reference)
    }

    pub fn get_all(&mut self) -> &[Profile] {
        self.load();
        &self.profiles
    }

    /// Replace the stored profile with the same id, bumping `modified_at`.
    pub fn update(&mut self, mut profile: Profile) -> Result<()> {
        self.load();
        let slot = self
            .profiles
            .iter_mut()
            .find(|p| p.id == profile.id)
            .ok_or_else(|| Error::ProfileNotFound(profile.id.to_string()))?;
        profile.touch();
        *slot = profile;
        self.save()
    }

    /// Apply `change` to a profile and persist the result.
    pub fn modify<R>(&mut self, id: Uuid, change: impl FnOnce(&mut Profile) -> R) -> Result<R> {
        self.load();
        let profile = self
            .profiles
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| Error::ProfileNotFound(id.to_string()))?;
        let result = change(profile);
        profile.touch();
        self.save()?;
        Ok(result)
    }

    pub fn rename(&mut self, id: Uuid, name: &str) -> Result<()> {
        self.load();
        let name = self.validate_name(name, Some(id))?;
        let old = self.modify(id, |profile| std::mem::replace(&mut profile.name, name.clone()))?;
        tracing::info!("Renamed profile '{}' to '{}' (id={})", old, name, id);
        Ok(())
    }

    /// Delete a profile. If it was the last one, a fresh "Default" replaces it.
    pub fn delete(&mut self, id: Uuid) -> Result<Profile> {
        self.load();
        let index = self
            .profiles
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| Error::ProfileNotFound(id.to_string()))?;
        let removed = self.profiles.remove(index);

        if self.profiles.is_empty() {
            self.profiles.push(Profile::new(DEFAULT_PROFILE_NAME));
            tracing::info!("Deleted the last profile, recreated default profile");
        }
        self.save()?;

        tracing::info!("Deleted profile: {} (id={})", removed.name, removed.id);
        Ok(removed)
    }

    /// The profile named "Default", created if it does not exist.
    pub fn default_profile(&mut self) -> Result<&Profile> {
        self.load();
        let index = match self
            .profiles
            .iter()
            .position(|p| p.name == DEFAULT_PROFILE_NAME)
        {
            Some(index) => index,
            None => {
                self.profiles.push(Profile::new(DEFAULT_PROFILE_NAME));
                self.save()?;
                self.profiles.len() - 1
            }
        };
        Ok(&self.profiles[index])
    }

    /// Remove a mod from every profile. Returns how many profiles changed.
    pub fn remove_mod_everywhere(&mut self, mod_id: Uuid) -> Result<usize> {
        self.load();
        let changed = self
            .profiles
            .iter_mut()
            .map(|p| p.remove_mod(mod_id))
            .filter(|removed| *removed)
            .count();
        if changed > 0 {
            self.save()?;
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> ProfileStore {
        ProfileStore::new(Utf8PathBuf::from_path_buf(dir.path().join("profiles.json")).unwrap())
    }

    #[test]
    fn test_first_load_creates_and_persists_default() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        let profiles = store.get_all();
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].name, DEFAULT_PROFILE_NAME);
        let id = profiles[0].id;

        let mut reloaded = store_in(&dir);
        assert_eq!(reloaded.get_all()[0].id, id);
    }

    #[test]
    fn test_duplicate_mod_entries_are_dropped_on_load() {
        let dir = TempDir::new().unwrap();
        let json = r#"{
            "profiles": [{
                "id": "0f6b1f7e-2222-4c5d-9e8f-112233445566",
                "name": "Hunt",
                "createdAt": "2024-03-01T12:00:00Z",
                "modifiedAt": "2024-03-01T12:00:00Z",
                "mods": [
                    { "modId": "7d9f8c1e-3b2a-4c5d-9e8f-112233445566", "loadOrder": 0 },
                    { "modId": "8e0a9d2f-3b2a-4c5d-9e8f-112233445566", "loadOrder": 1 },
                    { "modId": "7d9f8c1e-3b2a-4c5d-9e8f-112233445566", "enabled": false, "loadOrder": 2 }
                ]
            }]
        }"#;
        fs::write(dir.path().join("profiles.json"), json).unwrap();

        let mut store = store_in(&dir);
        let profile = &store.get_all()[0];
        assert_eq!(profile.mods.len(), 2);
        assert!(profile.mods[0].enabled);
        assert_eq!(profile.mods[0].load_order, 0);
    }

    #[test]
    fn test_corrupt_store_falls_back_to_default() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("profiles.json"), b"[[[").unwrap();
        let mut store = store_in(&dir);
        assert_eq!(store.get_all().len(), 1);
        assert_eq!(fs::read(dir.path().join("profiles.json")).unwrap(), b"[[[");
    }

    #[test]
    fn test_create_validates_names() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);

        let raid = store.create("  Raid  ", Some("for raids".to_string())).unwrap();
        assert_eq!(raid.name, "Raid");
        assert!(matches!(store.create("Raid", None), Err(Error::ValidationFailed(_))));
        assert!(matches!(store.create("   ", None), Err(Error::ValidationFailed(_))));

        let mut reloaded = store_in(&dir);
        assert_eq!(
            reloaded.get(raid.id).and_then(|p| p.description.clone()),
            Some("for raids".to_string())
        );
    }

    #[test]
    fn test_rename() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        let a = store.create("A", None).unwrap();
        store.create("B", None).unwrap();

        store.rename(a.id, "A").unwrap();
        assert!(matches!(store.rename(a.id, "B"), Err(Error::ValidationFailed(_))));
        store.rename(a.id, "Solo").unwrap();
        assert_eq!(store_in(&dir).get(a.id).map(|p| p.name.clone()), Some("Solo".to_string()));
        assert!(matches!(
            store.rename(Uuid::new_v4(), "X"),
            Err(Error::ProfileNotFound(_))
        ));
    }

    #[test]
    fn test_deleting_last_profile_recreates_default() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        let only = store.get_all()[0].id;

        store.delete(only).unwrap();

        let profiles = store.get_all();
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].name, DEFAULT_PROFILE_NAME);
        assert_ne!(profiles[0].id, only);
        assert_eq!(store_in(&dir).get_all().len(), 1);
    }

    #[test]
    fn test_default_profile_recreated_when_renamed_away() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        let original = store.get_all()[0].id;
        store.rename(original, "Main").unwrap();

        let default_id = store.default_profile().unwrap().id;
        assert_ne!(default_id, original);
        assert_eq!(store.get_all().len(), 2);
        assert_eq!(store.default_profile().unwrap().id, default_id);
    }

    #[test]
    fn test_modify_and_remove_mod_everywhere() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        let a = store.create("A", None).unwrap();
        let b = store.create("B", None).unwrap();
        let mod_id = Uuid::new_v4();

        store.modify(a.id, |p| p.set_mod_enabled(mod_id, true)).unwrap();
        store.modify(b.id, |p| p.set_mod_enabled(mod_id, false)).unwrap();
        assert_eq!(
            store_in(&dir).get(a.id).map(|p| p.enabled_mods_ordered()),
            Some(vec![mod_id])
        );

        assert_eq!(store.remove_mod_everywhere(mod_id).unwrap(), 2);
        assert_eq!(store.remove_mod_everywhere(mod_id).unwrap(), 0);
        assert!(store_in(&dir).get(b.id).map(|p| p.mods.is_empty()).unwrap());
    }
}
