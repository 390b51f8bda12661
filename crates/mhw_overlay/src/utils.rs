//! Path normalization and filesystem helpers shared by analysis and deployment.
//!
//! Relative paths are always carried as `/`-separated strings so the same file
//! provided by two mods maps to the same key on every platform.

use crate::error::{Error, Result};
use camino::{Utf8Path, Utf8PathBuf};
use filetime::{set_file_times, FileTime};
use std::fs;
use std::io::{self, Write};
use walkdir::WalkDir;
use xxhash_rust::xxh3::xxh3_64;

/// Normalize a relative path: `\` becomes `/`, empty and `.` segments are
/// dropped.
pub fn normalize_rel_path(path: &str) -> String {
    path.replace('\\', "/")
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Whether a raw entry path stays inside the directory it is joined onto.
///
/// Rejects absolute paths, drive prefixes and any `..` segment.
pub fn is_contained(path: &str) -> bool {
    let normalized = path.replace('\\', "/");
    if normalized.starts_with('/') {
        return false;
    }
    let mut segments = normalized.split('/');
    if segments
        .clone()
        .next()
        .is_some_and(|first| first.len() >= 2 && first.ends_with(':'))
    {
        return false;
    }
    !segments.any(|segment| segment == "..")
}

/// List every file under `root` as sorted, normalized relative paths.
///
/// Directories are not listed. Symlinks are followed so a staging tree
/// containing links still contributes the linked files.
pub fn list_files(root: &Utf8Path) -> Result<Vec<String>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root).follow_links(true) {
        let entry = entry.map_err(|e| Error::StagingUnreadable {
            path: root.to_path_buf(),
            message: e.to_string(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let rel = entry
            .path()
            .strip_prefix(root.as_std_path())
            .map_err(|_| format!("{} is not under {}", entry.path().display(), root))?;
        let Some(rel) = rel.to_str() else {
            tracing::warn!("Skipping non UTF-8 path under {}: {}", root, rel.display());
            continue;
        };
        files.push(normalize_rel_path(rel));
    }

    files.sort();
    Ok(files)
}

/// xxHash3 of a file's contents.
pub fn content_hash(path: &Utf8Path) -> io::Result<u64> {
    let bytes = fs::read(path)?;
    Ok(xxh3_64(&bytes))
}

/// Byte-for-byte copy that keeps permissions and access/modification times.
pub fn copy_file_preserving(src: &Utf8Path, dst: &Utf8Path) -> io::Result<()> {
    fs::copy(src, dst)?;

    let metadata = fs::metadata(src)?;
    let atime = FileTime::from_last_access_time(&metadata);
    let mtime = FileTime::from_last_modification_time(&metadata);
    set_file_times(dst, atime, mtime)
}

/// Recursively copy a directory tree, returning the copied relative paths.
pub fn copy_tree(src: &Utf8Path, dst: &Utf8Path) -> Result<Vec<String>> {
    let files = list_files(src)?;
    fs::create_dir_all(dst)?;

    for rel in &files {
        let target = dst.join(rel);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        copy_file_preserving(&src.join(rel), &target)?;
    }

    Ok(files)
}

/// Remove whatever occupies `path`: a file, a symlink (never followed) or a
/// directory tree. Missing paths are not an error.
pub fn remove_existing(path: &Utf8Path) -> io::Result<()> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };

    if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

/// Create a symbolic link at `link` pointing to the file `target`.
#[cfg(unix)]
pub fn symlink_file(target: &Utf8Path, link: &Utf8Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
pub fn symlink_file(target: &Utf8Path, link: &Utf8Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(target, link)
}

#[cfg(not(any(unix, windows)))]
pub fn symlink_file(_target: &Utf8Path, _link: &Utf8Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "symlinks are not supported on this platform",
    ))
}

/// Write a file by writing and syncing a sibling temp file, then renaming it
/// into place.
pub fn write_atomic(path: &Utf8Path, contents: &[u8]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent.to_path_buf(),
        _ => Utf8PathBuf::from("."),
    };
    fs::create_dir_all(&parent)?;

    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
    let temp_path = parent.join(format!(".{}.{}.tmp", file_name, std::process::id()));

    let written = fs::File::create(&temp_path).and_then(|mut file| {
        file.write_all(contents)?;
        file.sync_all()
    });
    if let Err(e) = written {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }
    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }
    Ok(())
}
