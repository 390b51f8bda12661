use camino::Utf8Path;
use std::time::{Duration, SystemTime};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_FILE_PREFIX: &str = "mhw-mod";
const DEFAULT_FILTER: &str = "mhw_mod=info,mhw_mod_lib=info,mhw_overlay=info";
const VERBOSE_FILTER: &str = "mhw_mod=debug,mhw_mod_lib=debug,mhw_overlay=debug";

/// Install the global subscriber: stderr plus a daily file under `log_dir`.
///
/// The returned guard flushes the file writer on drop and must be held until exit.
pub fn init_logging(log_dir: Option<&Utf8Path>, verbose: bool) -> Option<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| {
            let directives = if verbose { VERBOSE_FILTER } else { DEFAULT_FILTER };
            directives.into()
        });

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let (file_guard, file_layer) = match log_dir {
        Some(log_dir) => {
            let appender = std::fs::create_dir_all(log_dir).map_err(|e| e.to_string()).and_then(|_| {
                rolling::RollingFileAppender::builder()
                    .rotation(rolling::Rotation::DAILY)
                    .filename_prefix(LOG_FILE_PREFIX)
                    .filename_suffix("log")
                    .build(log_dir)
                    .map_err(|e| e.to_string())
            });
            match appender {
                Ok(appender) => {
                    let (non_blocking, guard) = tracing_appender::non_blocking(appender);
                    let layer = tracing_subscriber::fmt::layer()
                        .with_writer(non_blocking)
                        .with_ansi(false);
                    (Some(guard), Some(layer))
                }
                Err(e) => {
                    eprintln!("Failed to open log directory {}: {}", log_dir, e);
                    (None, None)
                }
            }
        }
        None => (None, None),
    };

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer);
    if let Some(layer) = file_layer {
        registry.with(layer).init();
    } else {
        registry.init();
    }

    if let Some(log_dir) = log_dir.filter(|_| file_guard.is_some()) {
        tracing::debug!("Log directory: {}", log_dir);
        cleanup_old_logs(log_dir, 7);
    }

    file_guard
}

/// Delete log files older than `max_age_days` from the log directory.
pub fn cleanup_old_logs(log_dir: &Utf8Path, max_age_days: u64) -> usize {
    let max_age = Duration::from_secs(max_age_days * 24 * 60 * 60);

    let entries = match std::fs::read_dir(log_dir) {
        Ok(e) => e,
        Err(e) => {
            tracing::warn!("Failed to read log directory for cleanup: {}", e);
            return 0;
        }
    };

    let mut removed = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };

        // Dated log files only, e.g. "mhw-mod.2026-02-17.log"
        if !file_name.starts_with(&format!("{}.", LOG_FILE_PREFIX)) || !file_name.ends_with(".log") {
            continue;
        }

        let Ok(modified) = entry.metadata().and_then(|m| m.modified()) else {
            continue;
        };
        let Ok(age) = SystemTime::now().duration_since(modified) else {
            continue;
        };

        if age > max_age {
            match std::fs::remove_file(&path) {
                Ok(()) => {
                    tracing::debug!("Deleted old log file: {}", path.display());
                    removed += 1;
                }
                Err(e) => tracing::warn!("Failed to delete old log file {}: {}", path.display(), e),
            }
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_cleanup_keeps_recent_and_foreign_files() {
        let dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        fs::write(root.join("mhw-mod.2026-01-01.log"), "recent").unwrap();
        fs::write(root.join("notes.log"), "foreign").unwrap();

        assert_eq!(cleanup_old_logs(&root, 7), 0);
        assert!(root.join("mhw-mod.2026-01-01.log").exists());

        assert_eq!(cleanup_old_logs(&root.join("missing"), 7), 0);
    }
}
