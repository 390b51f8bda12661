//! Monster Hunter: World installation detection and validation utilities.

use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;
use std::fs;
use std::sync::LazyLock;
use sysinfo::{Disks, System};

pub const GAME_FOLDER: &str = "Monster Hunter World";
pub const GAME_EXECUTABLE: &str = "MonsterHunterWorld.exe";
pub const NATIVE_PC: &str = "nativePC";

static VDF_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""path"\s+"([^"]+)""#).expect("libraryfolders path pattern must compile")
});

/// Validates that a path is a game installation root.
///
/// The root must contain a `nativePC` directory. The executable is not
/// required since Proton prefixes may keep it elsewhere.
pub fn is_valid_game_dir(path: &Utf8Path) -> bool {
    path.is_dir() && path.join(NATIVE_PC).is_dir()
}

/// The directory mods overlay onto.
pub fn native_pc_dir(game_root: &Utf8Path) -> Utf8PathBuf {
    game_root.join(NATIVE_PC)
}

fn home_dir() -> Option<Utf8PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .ok()?;
    Some(Utf8PathBuf::from(home))
}

/// Steam root directories for the current platform.
fn steam_roots() -> Vec<Utf8PathBuf> {
    let mut roots = Vec::new();

    if cfg!(target_os = "windows") {
        roots.push(Utf8PathBuf::from("C:\\Program Files (x86)\\Steam"));
        roots.push(Utf8PathBuf::from("C:\\Program Files\\Steam"));
    } else if let Some(home) = home_dir() {
        roots.push(home.join(".local/share/Steam"));
        roots.push(home.join(".steam/steam"));
        roots.push(home.join(".var/app/com.valvesoftware.Steam/.local/share/Steam"));
    }

    roots
}

fn game_dir_in_library(library: &Utf8Path) -> Utf8PathBuf {
    library.join("steamapps").join("common").join(GAME_FOLDER)
}

/// Check the default Steam library of every known Steam root.
fn detect_from_steam_roots() -> Option<Utf8PathBuf> {
    steam_roots()
        .iter()
        .map(|root| game_dir_in_library(root))
        .find(|path| is_valid_game_dir(path))
}

/// Extract library folder paths from a `libraryfolders.vdf` document.
pub fn parse_library_folders(contents: &str) -> Vec<Utf8PathBuf> {
    VDF_PATH
        .captures_iter(contents)
        .filter_map(|captures| captures.get(1))
        .map(|m| Utf8PathBuf::from(m.as_str().replace("\\\\", "\\")))
        .collect()
}

/// Check every additional Steam library listed in `libraryfolders.vdf`.
fn detect_from_library_folders() -> Option<Utf8PathBuf> {
    for root in steam_roots() {
        let vdf = root.join("steamapps").join("libraryfolders.vdf");
        let Ok(contents) = fs::read_to_string(&vdf) else {
            continue;
        };

        if let Some(found) = parse_library_folders(&contents)
            .iter()
            .map(|library| game_dir_in_library(library))
            .find(|path| is_valid_game_dir(path))
        {
            return Some(found);
        }
    }

    None
}

/// Check `SteamLibrary` folders on all mounted disks using sysinfo.
fn detect_from_disks() -> Option<Utf8PathBuf> {
    let disks = Disks::new_with_refreshed_list();

    disks
        .iter()
        .filter_map(|disk| disk.mount_point().to_str().map(Utf8PathBuf::from))
        .flat_map(|mount| {
            [
                game_dir_in_library(&mount.join("SteamLibrary")),
                game_dir_in_library(&mount.join("Steam")),
            ]
        })
        .find(|path| is_valid_game_dir(path))
}

/// Detect the installation from a running game process using sysinfo.
fn detect_from_running_process() -> Option<Utf8PathBuf> {
    let system = System::new_all();

    for process in system.processes_by_name(GAME_EXECUTABLE.as_ref()) {
        let Some(root) = process
            .exe()
            .and_then(|p| Utf8PathBuf::from_path_buf(p.to_path_buf()).ok())
            .and_then(|exe| exe.parent().map(Utf8Path::to_path_buf))
        else {
            continue;
        };

        if is_valid_game_dir(&root) {
            return Some(root);
        }
    }

    None
}

/// Auto-detect the game installation root.
///
/// Detection methods (in order):
/// 1. Default Steam library of each Steam root (native, legacy, Flatpak)
/// 2. Extra libraries from `libraryfolders.vdf`
/// 3. `SteamLibrary` folders on mounted disks
/// 4. Running game process
pub fn auto_detect_game_path() -> Option<Utf8PathBuf> {
    let detected = detect_from_steam_roots()
        .or_else(detect_from_library_folders)
        .or_else(detect_from_disks)
        .or_else(detect_from_running_process);

    match &detected {
        Some(path) => tracing::info!("Detected game installation at {}", path),
        None => tracing::debug!("No game installation detected"),
    }
    detected
}
