//! File-level conflict detection between the enabled mods of a profile.

use crate::resolution::{Resolution, SkippedMod};
use chrono::Utc;
use mhw_mod_core::{ConflictReport, FileConflict, Mod, Profile};

/// A [`ConflictReport`] plus the mods that could not be inspected.
#[derive(Debug, Clone)]
pub struct ConflictAnalysis {
    pub report: ConflictReport,
    pub skipped: Vec<SkippedMod>,
}

/// Computes which relative paths are claimed by more than one enabled mod.
///
/// Read-only: safe to run concurrently with other analyses, but not with a
/// deployment of the same mods.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConflictAnalyzer;

impl ConflictAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Analyze `profile` against the installed `mods`.
    ///
    /// Any path with two or more contributors is a conflict, even when the
    /// files are byte-identical. A file that another mod also provides as a
    /// directory conflicts on that path. Conflicts are sorted by path.
    pub fn analyze(&self, mods: &[Mod], profile: &Profile) -> ConflictReport {
        self.analyze_detailed(mods, profile).report
    }

    /// Like [`analyze`](Self::analyze) but also returns the skipped mods.
    pub fn analyze_detailed(&self, mods: &[Mod], profile: &Profile) -> ConflictAnalysis {
        let resolution = Resolution::new(mods, profile);

        let conflicts: Vec<FileConflict> = resolution
            .contributors()
            .into_iter()
            .filter(|(_, contributors)| contributors.len() > 1)
            .filter_map(|(path, contributors)| {
                let winner = *contributors.last()?;
                Some(FileConflict {
                    target_path: path.to_string(),
                    contributing_mods: contributors,
                    winner,
                })
            })
            .collect();

        tracing::info!(
            "Profile '{}': {} conflicting paths across {} mods ({} skipped)",
            profile.name,
            conflicts.len(),
            resolution.mods.len(),
            resolution.skipped.len()
        );

        ConflictAnalysis {
            report: ConflictReport {
                profile_id: profile.id,
                conflicts,
                generated_at: Utc::now(),
            },
            skipped: resolution.skipped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use std::fs;
    use tempfile::TempDir;
    use uuid::Uuid;

    struct Fixture {
        _dir: TempDir,
        root: Utf8PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
            Self { _dir: dir, root }
        }

        fn add_mod(&self, name: &str, files: &[(&str, &str)]) -> Mod {
            let staging = self.root.join(name);
            fs::create_dir_all(&staging).unwrap();
            for (rel, contents) in files {
                let path = staging.join(rel);
                fs::create_dir_all(path.parent().unwrap()).unwrap();
                fs::write(path, contents).unwrap();
            }
            Mod::new(Uuid::new_v4(), name, staging)
        }
    }

    fn profile_with(mods: &[&Mod]) -> Profile {
        let mut profile = Profile::new("Test");
        for m in mods {
            profile.set_mod_enabled(m.id, true);
        }
        profile
    }

    #[test]
    fn test_shared_path_reports_later_mod_as_winner() {
        let fx = Fixture::new();
        let a = fx.add_mod("a", &[("nativePC/x", "A")]);
        let b = fx.add_mod("b", &[("nativePC/x", "B")]);
        let profile = profile_with(&[&a, &b]);

        let report = ConflictAnalyzer::new().analyze(&[a.clone(), b.clone()], &profile);

        assert_eq!(report.profile_id, profile.id);
        assert_eq!(report.conflicts.len(), 1);
        let conflict = &report.conflicts[0];
        assert_eq!(conflict.target_path, "nativePC/x");
        assert_eq!(conflict.contributing_mods, vec![a.id, b.id]);
        assert_eq!(conflict.winner, b.id);
    }

    #[test]
    fn test_file_shadowing_a_directory_is_a_conflict() {
        let fx = Fixture::new();
        let a = fx.add_mod("a", &[("nativePC/x", "A")]);
        let b = fx.add_mod("b", &[("nativePC/x/y.txt", "B")]);
        let profile = profile_with(&[&a, &b]);

        let report = ConflictAnalyzer::new().analyze(&[a.clone(), b.clone()], &profile);

        assert_eq!(report.conflicts.len(), 1);
        let conflict = &report.conflicts[0];
        assert_eq!(conflict.target_path, "nativePC/x");
        assert_eq!(conflict.contributing_mods, vec![a.id, b.id]);
        assert_eq!(conflict.winner, b.id);
    }

    #[test]
    fn test_disjoint_mods_have_no_conflicts() {
        let fx = Fixture::new();
        let a = fx.add_mod("a", &[("nativePC/a", "A")]);
        let b = fx.add_mod("b", &[("nativePC/b", "B")]);
        let profile = profile_with(&[&a, &b]);

        let report = ConflictAnalyzer::new().analyze(&[a, b], &profile);
        assert!(!report.has_conflicts());
    }

    #[test]
    fn test_identical_content_still_conflicts() {
        let fx = Fixture::new();
        let a = fx.add_mod("a", &[("nativePC/same", "same")]);
        let b = fx.add_mod("b", &[("nativePC/same", "same")]);
        let profile = profile_with(&[&a, &b]);

        let report = ConflictAnalyzer::new().analyze(&[a, b], &profile);
        assert_eq!(report.conflicts.len(), 1);
    }

    #[test]
    fn test_load_order_decides_winner() {
        let fx = Fixture::new();
        let a = fx.add_mod("a", &[("nativePC/x", "A")]);
        let b = fx.add_mod("b", &[("nativePC/x", "B")]);
        let c = fx.add_mod("c", &[("nativePC/x", "C")]);
        let mut profile = profile_with(&[&a, &b, &c]);
        profile.set_mod_load_order(a.id, 99);

        let report = ConflictAnalyzer::new().analyze(&[a.clone(), b.clone(), c.clone()], &profile);
        let conflict = &report.conflicts[0];
        assert_eq!(conflict.contributing_mods, vec![b.id, c.id, a.id]);
        assert_eq!(conflict.winner, a.id);
    }

    #[test]
    fn test_missing_staging_is_skipped_not_fatal() {
        let fx = Fixture::new();
        let a = fx.add_mod("a", &[("nativePC/x", "A")]);
        let b = fx.add_mod("b", &[("nativePC/x", "B")]);
        fs::remove_dir_all(&b.staging_path).unwrap();
        let profile = profile_with(&[&a, &b]);

        let analysis = ConflictAnalyzer::new().analyze_detailed(&[a, b.clone()], &profile);
        assert!(!analysis.report.has_conflicts());
        assert_eq!(analysis.skipped.len(), 1);
        assert_eq!(analysis.skipped[0].mod_id, b.id);
    }

    #[test]
    fn test_conflicts_sorted_by_path() {
        let fx = Fixture::new();
        let files = [("nativePC/z", "1"), ("nativePC/a", "1"), ("nativePC/m", "1")];
        let a = fx.add_mod("a", &files);
        let b = fx.add_mod("b", &files);
        let profile = profile_with(&[&a, &b]);

        let report = ConflictAnalyzer::new().analyze(&[a, b], &profile);
        let paths: Vec<&str> = report.conflicts.iter().map(|c| c.target_path.as_str()).collect();
        assert_eq!(paths, vec!["nativePC/a", "nativePC/m", "nativePC/z"]);
    }
}
