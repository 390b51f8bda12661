//! Load-order resolution shared by the conflict analyzer and the deployer.
//!
//! Both consumers walk the same [`Resolution`], so they always agree on which
//! mod wins a given path.

use crate::utils::list_files;
use camino::Utf8PathBuf;
use mhw_mod_core::{Mod, Profile};
use std::collections::BTreeMap;
use std::ops::Bound;
use std::fmt;
use uuid::Uuid;

/// An enabled mod whose staging tree was readable, with its files.
#[derive(Debug)]
pub struct ResolvedMod<'a> {
    pub record: &'a Mod,
    pub files: Vec<String>,
}

/// Why an enabled mod took no part in resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The profile references a mod that is not installed.
    NotInstalled,
    /// The mod's staging directory is gone.
    StagingMissing(Utf8PathBuf),
    /// The staging directory could not be walked.
    Unreadable(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NotInstalled => f.write_str("mod is not installed"),
            SkipReason::StagingMissing(path) => {
                write!(f, "staging directory {} does not exist", path)
            }
            SkipReason::Unreadable(message) => write!(f, "staging unreadable: {}", message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedMod {
    pub mod_id: Uuid,
    pub reason: SkipReason,
}

/// The enabled mods of a profile in load order, lowest precedence first.
#[derive(Debug, Default)]
pub struct Resolution<'a> {
    pub mods: Vec<ResolvedMod<'a>>,
    pub skipped: Vec<SkippedMod>,
}

impl<'a> Resolution<'a> {
    /// Resolve `profile` against the installed `mods`.
    ///
    /// Never fails: mods that cannot be used are recorded in `skipped` and
    /// logged.
    pub fn new(mods: &'a [Mod], profile: &Profile) -> Self {
        let mut resolution = Resolution::default();

        for mod_id in profile.enabled_mods_ordered() {
            let Some(record) = mods.iter().find(|m| m.id == mod_id) else {
                tracing::warn!("Profile '{}' references unknown mod {}", profile.name, mod_id);
                resolution.skip(mod_id, SkipReason::NotInstalled);
                continue;
            };

            if !record.staging_path.is_dir() {
                tracing::warn!(
                    "Mod '{}' ({}) has no staging directory at {}, skipping",
                    record.name,
                    record.id,
                    record.staging_path
                );
                resolution.skip(mod_id, SkipReason::StagingMissing(record.staging_path.clone()));
                continue;
            }

            match list_files(&record.staging_path) {
                Ok(files) => {
                    tracing::debug!("Mod '{}' provides {} files", record.name, files.len());
                    resolution.mods.push(ResolvedMod { record, files });
                }
                Err(e) => {
                    tracing::warn!("Mod '{}' ({}) skipped: {}", record.name, record.id, e);
                    resolution.skip(mod_id, SkipReason::Unreadable(e.to_string()));
                }
            }
        }

        resolution
    }

    fn skip(&mut self, mod_id: Uuid, reason: SkipReason) {
        self.skipped.push(SkippedMod { mod_id, reason });
    }

    /// Ids of the mods that took part, in load order.
    pub fn mod_ids(&self) -> Vec<Uuid> {
        self.mods.iter().map(|m| m.record.id).collect()
    }

    /// Every contributor per relative path, in load order.
    ///
    /// A file in one mod and a directory of the same name in another collide
    /// on that path, so mods providing files beneath a claimed file path count
    /// as its contributors too.
    pub fn contributors(&self) -> BTreeMap<&str, Vec<Uuid>> {
        let mut claims: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (index, resolved) in self.mods.iter().enumerate() {
            for file in &resolved.files {
                claims.entry(file.as_str()).or_default().push(index);
            }
        }

        claims
            .iter()
            .map(|(path, direct)| {
                let mut indices = direct.clone();
                for nested in nested_under(&claims, path) {
                    indices.extend_from_slice(&claims[nested]);
                }
                indices.sort_unstable();
                indices.dedup();
                let ids = indices.into_iter().map(|i| self.mods[i].record.id).collect();
                (*path, ids)
            })
            .collect()
    }

    /// The winning mod per relative path: the last writer in load order.
    ///
    /// A later file replaces an earlier directory of the same name and the
    /// other way round, so no winning path lies beneath another one.
    pub fn winners(&self) -> BTreeMap<&str, &'a Mod> {
        let mut winners: BTreeMap<&str, &'a Mod> = BTreeMap::new();
        for resolved in &self.mods {
            for file in &resolved.files {
                let file = file.as_str();
                for (index, _) in file.match_indices('/') {
                    winners.remove(&file[..index]);
                }
                for nested in nested_under(&winners, file) {
                    winners.remove(nested);
                }
                winners.insert(file, resolved.record);
            }
        }
        winners
    }
}

/// Keys of `map` that lie strictly beneath `path`.
fn nested_under<'k, V>(map: &BTreeMap<&'k str, V>, path: &str) -> Vec<&'k str> {
    let prefix = format!("{}/", path);
    map.range::<str, _>((Bound::Included(prefix.as_str()), Bound::Unbounded))
        .take_while(|(key, _)| key.starts_with(prefix.as_str()))
        .map(|(key, _)| *key)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn staged_mod(root: &Utf8PathBuf, name: &str, files: &[&str]) -> Mod {
        let staging = root.join(name);
        for file in files {
            let path = staging.join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, name.as_bytes()).unwrap();
        }
        fs::create_dir_all(&staging).unwrap();
        Mod::new(Uuid::new_v4(), name, staging)
    }

    #[test]
    fn test_last_writer_wins() {
        let dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let a = staged_mod(&root, "a", &["nativePC/x", "nativePC/only_a"]);
        let b = staged_mod(&root, "b", &["nativePC/x"]);

        let mut profile = Profile::new("p");
        profile.set_mod_enabled(a.id, true);
        profile.set_mod_enabled(b.id, true);
        let mods = vec![b.clone(), a.clone()];

        let resolution = Resolution::new(&mods, &profile);
        assert_eq!(resolution.mod_ids(), vec![a.id, b.id]);

        let winners = resolution.winners();
        assert_eq!(winners["nativePC/x"].id, b.id);
        assert_eq!(winners["nativePC/only_a"].id, a.id);
        assert_eq!(resolution.contributors()["nativePC/x"], vec![a.id, b.id]);
    }

    #[test]
    fn test_file_and_directory_of_same_name_resolve_by_load_order() {
        let dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let file_mod = staged_mod(&root, "file", &["nativePC/x", "nativePC/x.txt"]);
        let dir_mod = staged_mod(&root, "dir", &["nativePC/x/y.txt", "nativePC/x/z.txt"]);
        let mods = vec![file_mod.clone(), dir_mod.clone()];

        let mut profile = Profile::new("p");
        profile.set_mod_enabled(file_mod.id, true);
        profile.set_mod_enabled(dir_mod.id, true);

        let resolution = Resolution::new(&mods, &profile);
        let winners: Vec<&str> = resolution.winners().into_keys().collect();
        assert_eq!(winners, vec!["nativePC/x.txt", "nativePC/x/y.txt", "nativePC/x/z.txt"]);
        assert_eq!(resolution.contributors()["nativePC/x"], vec![file_mod.id, dir_mod.id]);
        assert_eq!(resolution.contributors()["nativePC/x.txt"], vec![file_mod.id]);

        profile.set_mod_load_order(file_mod.id, 10);
        let resolution = Resolution::new(&mods, &profile);
        let winners = resolution.winners();
        assert_eq!(winners.keys().copied().collect::<Vec<_>>(), vec!["nativePC/x", "nativePC/x.txt"]);
        assert_eq!(winners["nativePC/x"].id, file_mod.id);
        assert_eq!(resolution.contributors()["nativePC/x"], vec![dir_mod.id, file_mod.id]);
    }

    #[test]
    fn test_skips_missing_and_uninstalled() {
        let dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let present = staged_mod(&root, "present", &["f"]);
        let gone = Mod::new(Uuid::new_v4(), "gone", root.join("nowhere"));
        let unknown = Uuid::new_v4();

        let mut profile = Profile::new("p");
        profile.set_mod_enabled(gone.id, true);
        profile.set_mod_enabled(unknown, true);
        profile.set_mod_enabled(present.id, true);
        let mods = vec![present.clone(), gone.clone()];

        let resolution = Resolution::new(&mods, &profile);
        assert_eq!(resolution.mod_ids(), vec![present.id]);
        assert_eq!(resolution.skipped.len(), 2);
        assert_eq!(resolution.skipped[0].mod_id, gone.id);
        assert!(matches!(resolution.skipped[0].reason, SkipReason::StagingMissing(_)));
        assert_eq!(resolution.skipped[1].reason, SkipReason::NotInstalled);
    }

    #[test]
    fn test_disabled_mods_ignored() {
        let dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let a = staged_mod(&root, "a", &["f"]);

        let mut profile = Profile::new("p");
        profile.set_mod_enabled(a.id, false);
        let mods = vec![a];

        let resolution = Resolution::new(&mods, &profile);
        assert!(resolution.mods.is_empty());
        assert!(resolution.skipped.is_empty());
    }
}
