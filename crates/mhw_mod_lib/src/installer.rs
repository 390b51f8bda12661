//! Ingests archives and directories into isolated per-mod staging trees.

use crate::error::{Error, Result};
use camino::{Utf8Path, Utf8PathBuf};
use mhw_mod_core::version::extract_version_from_filename;
use mhw_mod_core::Mod;
use mhw_overlay::utils::{copy_tree, is_contained, normalize_rel_path};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{self, BufReader};
use uuid::Uuid;
use zip::ZipArchive;

/// Folder every mod payload for the game is authored against.
const PAYLOAD_ANCHOR: &str = "nativePC";

/// What to install from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallSource {
    Archive(Utf8PathBuf),
    Directory(Utf8PathBuf),
}

impl InstallSource {
    /// Pick the variant from what exists on disk.
    pub fn detect(path: impl Into<Utf8PathBuf>) -> Self {
        let path = path.into();
        if path.is_dir() {
            InstallSource::Directory(path)
        } else {
            InstallSource::Archive(path)
        }
    }

    pub fn path(&self) -> &Utf8Path {
        match self {
            InstallSource::Archive(path) | InstallSource::Directory(path) => path,
        }
    }
}

/// Overrides for an install. Unset fields are derived from the source.
#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    pub name: Option<String>,
    /// Archive folder to treat as the mod root instead of detecting one.
    pub root_folder: Option<String>,
    pub version: Option<String>,
}

/// Removes a staging directory on drop unless the install completed.
struct StagingGuard {
    path: Utf8PathBuf,
    armed: bool,
}

impl StagingGuard {
    fn new(path: Utf8PathBuf) -> Self {
        Self { path, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for StagingGuard {
    fn drop(&mut self) {
        if self.armed {
            tracing::debug!("Removing partial staging directory {}", self.path);
            let _ = fs::remove_dir_all(&self.path);
        }
    }
}

/// Find the wrapper prefix to strip from a set of normalized file entries.
///
/// The first entry containing a `nativePC` segment anchors the payload: the
/// segments before it are the wrapper. Without an anchor, a single first
/// segment shared by every entry is treated as an incidental wrapper.
pub fn detect_root_prefix<S: AsRef<str>>(entries: &[S]) -> Option<String> {
    for entry in entries {
        let segments: Vec<&str> = entry.as_ref().split('/').collect();
        if let Some(index) = segments.iter().position(|s| *s == PAYLOAD_ANCHOR) {
            if index == 0 {
                return None;
            }
            return Some(segments[..index].join("/"));
        }
    }

    let mut first_segments = entries.iter().map(|entry| entry.as_ref().split_once('/'));
    let (common, _) = first_segments.next()??;
    for split in first_segments {
        match split {
            Some((segment, _)) if segment == common => {}
            _ => return None,
        }
    }
    Some(common.to_string())
}

fn strip_root<'a>(path: &'a str, prefix: Option<&str>) -> Option<&'a str> {
    match prefix {
        None => Some(path),
        Some(prefix) => path
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|rest| !rest.is_empty()),
    }
}

/// Hex SHA-256 of a file's bytes.
pub fn file_checksum(path: &Utf8Path) -> io::Result<String> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut hasher = Sha256::new();
    io::copy(&mut reader, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

/// Installs mods into `staging_root/<mod id>`.
#[derive(Debug, Clone)]
pub struct ArchiveInstaller {
    staging_root: Utf8PathBuf,
    downloads_root: Utf8PathBuf,
    keep_archives: bool,
}

impl ArchiveInstaller {
    pub fn new(
        staging_root: impl Into<Utf8PathBuf>,
        downloads_root: impl Into<Utf8PathBuf>,
        keep_archives: bool,
    ) -> Self {
        Self {
            staging_root: staging_root.into(),
            downloads_root: downloads_root.into(),
            keep_archives,
        }
    }

    pub fn staging_root(&self) -> &Utf8Path {
        &self.staging_root
    }

    pub fn install(&self, source: &InstallSource, options: &InstallOptions) -> Result<Mod> {
        match source {
            InstallSource::Archive(path) => self.install_from_archive(path, options),
            InstallSource::Directory(path) => self.install_from_directory(path, options),
        }
    }

    fn new_staging_dir(&self) -> Result<(Uuid, Utf8PathBuf)> {
        let id = Uuid::new_v4();
        let staging_path = self.staging_root.join(id.to_string());
        fs::create_dir_all(&staging_path)?;
        Ok((id, staging_path))
    }

    /// Extract a ZIP archive into a fresh staging directory.
    pub fn install_from_archive(&self, archive_path: &Utf8Path, options: &InstallOptions) -> Result<Mod> {
        if !archive_path.is_file() {
            return Err(Error::ArchiveNotFound(archive_path.to_path_buf()));
        }
        let file = File::open(archive_path)?;
        let mut archive = ZipArchive::new(BufReader::new(file)).map_err(|e| {
            tracing::debug!("Rejected {}: {}", archive_path, e);
            Error::NotAnArchive(archive_path.to_path_buf())
        })?;

        let mut entries = Vec::new();
        for i in 0..archive.len() {
            let entry = archive.by_index(i)?;
            if entry.is_dir() {
                continue;
            }
            let name = normalize_rel_path(entry.name());
            if !name.is_empty() {
                entries.push(name);
            }
        }

        let prefix = match &options.root_folder {
            Some(folder) => Some(normalize_rel_path(folder)).filter(|p| !p.is_empty()),
            None => detect_root_prefix(&entries),
        };
        match &prefix {
            Some(prefix) => tracing::debug!("Stripping root folder '{}' from {}", prefix, archive_path),
            None => tracing::debug!("Extracting {} at archive root", archive_path),
        }

        let (id, staging_path) = self.new_staging_dir()?;
        let mut guard = StagingGuard::new(staging_path.clone());

        let mut files = Vec::new();
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            if entry.is_dir() {
                continue;
            }
            let raw_name = entry.name().to_string();
            if !is_contained(&raw_name) {
                tracing::warn!("Skipping entry outside the archive root: {}", raw_name);
                continue;
            }
            let name = normalize_rel_path(&raw_name);
            let Some(rel) = strip_root(&name, prefix.as_deref()) else {
                continue;
            };
            if rel.is_empty() {
                continue;
            }

            let target = staging_path.join(rel);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut out = File::create(&target)?;
            io::copy(&mut entry, &mut out)?;
            files.push(rel.to_string());
        }

        if files.is_empty() {
            return Err(Error::EmptyInstall {
                path: archive_path.to_path_buf(),
                root: prefix.unwrap_or_default(),
            });
        }
        files.sort();

        let file_name = archive_path.file_name().unwrap_or(archive_path.as_str());
        let name = options
            .name
            .clone()
            .or_else(|| archive_path.file_stem().map(str::to_string))
            .unwrap_or_else(|| id.to_string());

        let mut record = Mod::new(id, name, staging_path);
        record.version = options
            .version
            .clone()
            .or_else(|| extract_version_from_filename(file_name));
        record.source = Some(archive_path.to_string());
        record.deployed_files = files;
        record.archive_checksum = Some(file_checksum(archive_path)?);
        record.archive_path = self.retain_archive(archive_path);

        guard.disarm();
        tracing::info!(
            "Installed {} ({} files) from {}",
            record.name,
            record.deployed_files.len(),
            archive_path
        );
        Ok(record)
    }

    /// Keep a copy of the archive in the downloads folder. Failures are not fatal.
    fn retain_archive(&self, archive_path: &Utf8Path) -> Option<Utf8PathBuf> {
        if !self.keep_archives {
            return None;
        }
        let file_name = archive_path.file_name()?;
        let kept = self.downloads_root.join(file_name);
        if kept.exists() {
            return Some(kept);
        }

        let copied = fs::create_dir_all(&self.downloads_root).and_then(|_| fs::copy(archive_path, &kept));
        match copied {
            Ok(_) => Some(kept),
            Err(e) => {
                tracing::warn!("Failed to keep a copy of {} in {}: {}", archive_path, self.downloads_root, e);
                None
            }
        }
    }

    /// Copy a directory tree into a fresh staging directory.
    pub fn install_from_directory(&self, source: &Utf8Path, options: &InstallOptions) -> Result<Mod> {
        if !source.exists() {
            return Err(Error::SourceNotFound(source.to_path_buf()));
        }
        if !source.is_dir() {
            return Err(Error::NotADirectory(source.to_path_buf()));
        }

        let (id, staging_path) = self.new_staging_dir()?;
        let mut guard = StagingGuard::new(staging_path.clone());

        let files = copy_tree(source, &staging_path)?;
        if files.is_empty() {
            return Err(Error::EmptyInstall {
                path: source.to_path_buf(),
                root: String::new(),
            });
        }

        let dir_name = source.file_name().map(str::to_string);
        let name = options
            .name
            .clone()
            .or_else(|| dir_name.clone())
            .unwrap_or_else(|| id.to_string());

        let mut record = Mod::new(id, name, staging_path);
        record.version = options
            .version
            .clone()
            .or_else(|| dir_name.as_deref().and_then(extract_version_from_filename));
        record.source = Some(source.to_string());
        record.deployed_files = files;

        guard.disarm();
        tracing::info!(
            "Installed {} ({} files) from directory {}",
            record.name,
            record.deployed_files.len(),
            source
        );
        Ok(record)
    }

    /// Delete a mod's staging tree and, optionally, its retained archive.
    ///
    /// Only archives inside the downloads folder are ever deleted.
    pub fn uninstall(&self, record: &Mod, remove_archive: bool) -> Result<()> {
        match fs::remove_dir_all(&record.staging_path) {
            Ok(()) => tracing::debug!("Removed staging directory {}", record.staging_path),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::warn!("Staging directory already gone: {}", record.staging_path)
            }
            Err(e) => return Err(e.into()),
        }

        if remove_archive {
            if let Some(archive) = &record.archive_path {
                if !archive.starts_with(&self.downloads_root) {
                    tracing::warn!("Not removing archive outside downloads folder: {}", archive);
                } else if let Err(e) = fs::remove_file(archive) {
                    if e.kind() != io::ErrorKind::NotFound {
                        tracing::warn!("Failed to remove archive {}: {}", archive, e);
                    }
                }
            }
        }

        tracing::info!("Uninstalled {} (id={})", record.name, record.id);
        Ok(())
    }
}
