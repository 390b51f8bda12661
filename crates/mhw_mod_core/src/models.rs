use camino::Utf8PathBuf;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// An installed mod and its isolated staging tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mod {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Where the mod came from: a source directory, a download URL, ...
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    pub installed_at: DateTime<Utc>,
    pub staging_path: Utf8PathBuf,
    /// Relative paths (forward slashes) written to staging at install time.
    /// Advisory only; the staging tree on disk is authoritative.
    #[serde(default)]
    pub deployed_files: Vec<String>,
    #[serde(default)]
    pub archive_path: Option<Utf8PathBuf>,
    /// Hex SHA-256 of the archive the mod was installed from.
    #[serde(default)]
    pub archive_checksum: Option<String>,
    #[serde(default)]
    pub remote_mod_id: Option<u64>,
    #[serde(default)]
    pub remote_file_id: Option<u64>,
    #[serde(default)]
    pub remote_uploaded_at: Option<DateTime<Utc>>,
}

impl Mod {
    pub fn new(id: Uuid, name: impl Into<String>, staging_path: Utf8PathBuf) -> Self {
        Self {
            id,
            name: name.into(),
            version: None,
            author: None,
            description: None,
            source: None,
            tags: BTreeSet::new(),
            installed_at: Utc::now(),
            staging_path,
            deployed_files: Vec::new(),
            archive_path: None,
            archive_checksum: None,
            remote_mod_id: None,
            remote_file_id: None,
            remote_uploaded_at: None,
        }
    }

    /// Case-insensitive match against name, author and tags.
    pub fn matches_query(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.name.to_lowercase().contains(&query)
            || self
                .author
                .as_deref()
                .is_some_and(|a| a.to_lowercase().contains(&query))
            || self.tags.iter().any(|t| t.to_lowercase().contains(&query))
    }
}

/// How winning files are materialized into the game directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentMode {
    #[default]
    Symlink,
    Copy,
}

impl DeploymentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentMode::Symlink => "symlink",
            DeploymentMode::Copy => "copy",
        }
    }
}

impl fmt::Display for DeploymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown deployment mode '{0}', expected 'symlink' or 'copy'")]
pub struct ParseModeError(pub String);

impl FromStr for DeploymentMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "symlink" => Ok(DeploymentMode::Symlink),
            "copy" => Ok(DeploymentMode::Copy),
            other => Err(ParseModeError(other.to_string())),
        }
    }
}

/// Outcome of the last deployment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentState {
    pub profile_id: Uuid,
    pub deployed_at: DateTime<Utc>,
    /// Mods that were found and had a staging directory, in load order.
    pub deployed_mods: Vec<Uuid>,
    pub mode: DeploymentMode,
}

/// A relative path claimed by more than one enabled mod.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileConflict {
    pub target_path: String,
    /// Contributors in load order. The last one wins.
    pub contributing_mods: Vec<Uuid>,
    pub winner: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictReport {
    pub profile_id: Uuid,
    pub conflicts: Vec<FileConflict>,
    pub generated_at: DateTime<Utc>,
}

impl ConflictReport {
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }

    pub fn conflicts_for_mod(&self, mod_id: Uuid) -> Vec<&FileConflict> {
        self.conflicts
            .iter()
            .filter(|c| c.contributing_mods.contains(&mod_id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mod_without_optional_fields_deserializes() {
        let json = r#"{
            "id": "7d9f8c1e-3b2a-4c5d-9e8f-112233445566",
            "name": "Better Weapons",
            "installedAt": "2024-03-01T12:00:00Z",
            "stagingPath": "/data/staging/7d9f8c1e"
        }"#;
        let m: Mod = serde_json::from_str(json).unwrap();
        assert_eq!(m.name, "Better Weapons");
        assert_eq!(m.version, None);
        assert!(m.tags.is_empty());
        assert!(m.deployed_files.is_empty());
        assert_eq!(m.remote_mod_id, None);
        assert_eq!(m.remote_uploaded_at, None);
    }

    #[test]
    fn mod_round_trips_through_json() {
        let mut m = Mod::new(Uuid::new_v4(), "Armor Pack", "/staging/a".into());
        m.version = Some("1.2".to_string());
        m.tags.insert("armor".to_string());
        m.remote_mod_id = Some(42);
        m.remote_uploaded_at = Some(Utc::now());
        m.deployed_files.push("nativePC/pl/f_equip/a.mod3".to_string());

        let json = serde_json::to_string(&m).unwrap();
        assert!(json.contains("\"stagingPath\""));
        let back: Mod = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn search_matches_name_author_and_tags() {
        let mut m = Mod::new(Uuid::new_v4(), "Lighting Overhaul", "/s".into());
        m.author = Some("Kiranico".to_string());
        m.tags.insert("Visual".to_string());

        assert!(m.matches_query("lighting"));
        assert!(m.matches_query("KIRAN"));
        assert!(m.matches_query("visual"));
        assert!(!m.matches_query("weapon"));
    }

    #[test]
    fn deployment_mode_parsing() {
        assert_eq!("symlink".parse::<DeploymentMode>(), Ok(DeploymentMode::Symlink));
        assert_eq!(" COPY ".parse::<DeploymentMode>(), Ok(DeploymentMode::Copy));
        assert!("hardlink".parse::<DeploymentMode>().is_err());
        assert_eq!(
            serde_json::to_string(&DeploymentMode::Copy).unwrap(),
            "\"copy\""
        );
    }

    #[test]
    fn conflicts_for_mod_filters_by_contributor() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let report = ConflictReport {
            profile_id: Uuid::new_v4(),
            conflicts: vec![
                FileConflict {
                    target_path: "nativePC/x".to_string(),
                    contributing_mods: vec![a, b],
                    winner: b,
                },
                FileConflict {
                    target_path: "nativePC/y".to_string(),
                    contributing_mods: vec![b, c],
                    winner: c,
                },
            ],
            generated_at: Utc::now(),
        };
        assert!(report.has_conflicts());
        assert_eq!(report.conflicts_for_mod(a).len(), 1);
        assert_eq!(report.conflicts_for_mod(b).len(), 2);
        assert!(report.conflicts_for_mod(Uuid::new_v4()).is_empty());
    }
}
