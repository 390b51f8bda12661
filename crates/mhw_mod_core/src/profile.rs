use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

fn default_enabled() -> bool {
    true
}

/// A mod's slot in a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileModEntry {
    pub mod_id: Uuid,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub load_order: i64,
}

/// A named, ordered enable/disable configuration over the installed mods.
///
/// Entries are kept in insertion order; `load_order` need not be contiguous
/// and ties are broken by list position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    #[serde(default)]
    pub mods: Vec<ProfileModEntry>,
}

impl Profile {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            created_at: now,
            modified_at: now,
            mods: Vec::new(),
        }
    }

    pub fn touch(&mut self) {
        self.modified_at = Utc::now();
    }

    pub fn entry(&self, mod_id: Uuid) -> Option<&ProfileModEntry> {
        self.mods.iter().find(|e| e.mod_id == mod_id)
    }

    fn entry_mut(&mut self, mod_id: Uuid) -> Option<&mut ProfileModEntry> {
        self.mods.iter_mut().find(|e| e.mod_id == mod_id)
    }

    /// One past the highest load order in use, so new entries land last.
    ///
    /// Saturates at `i64::MAX`; a tie there still sorts the new entry last
    /// because ties keep list position.
    pub fn next_load_order(&self) -> i64 {
        self.mods
            .iter()
            .map(|e| e.load_order)
            .max()
            .map_or(0, |max| max.saturating_add(1))
    }

    /// Drops repeated entries for the same mod, keeping the first. Returns the
    /// number of entries removed.
    pub fn dedup_entries(&mut self) -> usize {
        let before = self.mods.len();
        let mut seen = HashSet::new();
        self.mods.retain(|e| seen.insert(e.mod_id));
        before - self.mods.len()
    }

    /// Enables or disables a mod, appending a new entry if the mod is not in
    /// the profile yet.
    pub fn set_mod_enabled(&mut self, mod_id: Uuid, enabled: bool) {
        match self.entry_mut(mod_id) {
            Some(entry) => entry.enabled = enabled,
            None => {
                let load_order = self.next_load_order();
                self.mods.push(ProfileModEntry {
                    mod_id,
                    enabled,
                    load_order,
                });
            }
        }
        self.touch();
    }

    /// Returns false if the mod is not part of this profile.
    pub fn set_mod_load_order(&mut self, mod_id: Uuid, load_order: i64) -> bool {
        let Some(entry) = self.entry_mut(mod_id) else {
            return false;
        };
        entry.load_order = load_order;
        self.touch();
        true
    }

    pub fn remove_mod(&mut self, mod_id: Uuid) -> bool {
        let before = self.mods.len();
        self.mods.retain(|e| e.mod_id != mod_id);
        let removed = self.mods.len() != before;
        if removed {
            self.touch();
        }
        removed
    }

    /// All entries sorted by load order, stable on ties.
    pub fn ordered_entries(&self) -> Vec<&ProfileModEntry> {
        let mut entries: Vec<&ProfileModEntry> = self.mods.iter().collect();
        entries.sort_by_key(|e| e.load_order);
        entries
    }

    /// Enabled mod ids, lowest precedence first. The last id wins conflicts.
    pub fn enabled_mods_ordered(&self) -> Vec<Uuid> {
        self.ordered_entries()
            .into_iter()
            .filter(|e| e.enabled)
            .map(|e| e.mod_id)
            .collect()
    }

    /// Moves a mod one step earlier in the effective order.
    pub fn move_up(&mut self, mod_id: Uuid) -> bool {
        self.shift(mod_id, -1)
    }

    /// Moves a mod one step later in the effective order.
    pub fn move_down(&mut self, mod_id: Uuid) -> bool {
        self.shift(mod_id, 1)
    }

    // Renumbers every entry 0..n after the swap so tied load orders cannot
    // make the move a no-op.
    fn shift(&mut self, mod_id: Uuid, delta: isize) -> bool {
        let mut order: Vec<Uuid> = self.ordered_entries().iter().map(|e| e.mod_id).collect();
        let Some(index) = order.iter().position(|id| *id == mod_id) else {
            return false;
        };
        let Some(target) = index.checked_add_signed(delta).filter(|t| *t < order.len()) else {
            return false;
        };
        order.swap(index, target);

        for (position, id) in order.into_iter().enumerate() {
            if let Some(entry) = self.entry_mut(id) {
                entry.load_order = position as i64;
            }
        }
        self.touch();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(mod_id: Uuid, enabled: bool, load_order: i64) -> ProfileModEntry {
        ProfileModEntry {
            mod_id,
            enabled,
            load_order,
        }
    }

    #[test]
    fn enabled_mods_sorted_stably_by_load_order() {
        let ids: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
        let mut profile = Profile::new("Test");
        profile.mods = vec![
            entry(ids[0], true, 5),
            entry(ids[1], true, 1),
            entry(ids[2], false, 0),
            entry(ids[3], true, 1),
        ];

        assert_eq!(profile.enabled_mods_ordered(), vec![ids[1], ids[3], ids[0]]);
    }

    #[test]
    fn set_enabled_appends_at_end() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut profile = Profile::new("Test");
        profile.set_mod_enabled(a, true);
        profile.set_mod_enabled(b, true);
        profile.set_mod_enabled(a, false);

        assert_eq!(profile.mods.len(), 2);
        assert_eq!(profile.entry(a).map(|e| e.enabled), Some(false));
        assert_eq!(profile.entry(b).map(|e| e.load_order), Some(1));
        assert_eq!(profile.enabled_mods_ordered(), vec![b]);
    }

    #[test]
    fn load_order_changes_precedence() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut profile = Profile::new("Test");
        profile.set_mod_enabled(a, true);
        profile.set_mod_enabled(b, true);

        assert!(profile.set_mod_load_order(a, 10));
        assert_eq!(profile.enabled_mods_ordered(), vec![b, a]);
        assert!(!profile.set_mod_load_order(Uuid::new_v4(), 3));
    }

    #[test]
    fn move_up_and_down_swap_neighbours() {
        let ids: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        let mut profile = Profile::new("Test");
        profile.mods = vec![
            entry(ids[0], true, 0),
            entry(ids[1], true, 0),
            entry(ids[2], true, 0),
        ];

        assert!(profile.move_up(ids[2]));
        assert_eq!(profile.enabled_mods_ordered(), vec![ids[0], ids[2], ids[1]]);
        assert!(profile.move_down(ids[0]));
        assert_eq!(profile.enabled_mods_ordered(), vec![ids[2], ids[0], ids[1]]);
        assert!(!profile.move_up(ids[2]));
        assert!(!profile.move_down(ids[1]));
    }

    #[test]
    fn append_after_max_load_order_stays_last() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut profile = Profile::new("Test");
        profile.set_mod_enabled(a, true);
        assert!(profile.set_mod_load_order(a, i64::MAX));

        profile.set_mod_enabled(b, true);

        assert_eq!(profile.entry(b).map(|e| e.load_order), Some(i64::MAX));
        assert_eq!(profile.enabled_mods_ordered(), vec![a, b]);
    }

    #[test]
    fn dedup_keeps_first_entry() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut profile = Profile::new("Test");
        profile.mods = vec![entry(a, true, 0), entry(b, true, 1), entry(a, false, 2)];

        assert_eq!(profile.dedup_entries(), 1);
        assert_eq!(profile.mods, vec![entry(a, true, 0), entry(b, true, 1)]);
        assert_eq!(profile.dedup_entries(), 0);
    }

    #[test]
    fn remove_mod_drops_entry() {
        let a = Uuid::new_v4();
        let mut profile = Profile::new("Test");
        profile.set_mod_enabled(a, true);
        assert!(profile.remove_mod(a));
        assert!(!profile.remove_mod(a));
        assert!(profile.mods.is_empty());
    }

    #[test]
    fn missing_entry_fields_use_defaults() {
        let json = r#"{
            "id": "0f6b1f7e-2222-4c5d-9e8f-112233445566",
            "name": "Default",
            "createdAt": "2024-03-01T12:00:00Z",
            "modifiedAt": "2024-03-01T12:00:00Z",
            "mods": [{ "modId": "7d9f8c1e-3b2a-4c5d-9e8f-112233445566" }]
        }"#;
        let profile: Profile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.description, None);
        assert!(profile.mods[0].enabled);
        assert_eq!(profile.mods[0].load_order, 0);
    }
}
