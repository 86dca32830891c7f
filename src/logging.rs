use std::{
    path::{Path, PathBuf},
    sync::Mutex,
};

use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::{app_types::lock_or_recover, DEFAULT_LOG_FILTER, DESKTOP_LOG_FILE};

/// Keeps the non-blocking file writer alive; dropping it flushes.
#[derive(Default)]
pub(crate) struct LoggingGuard {
    file: Mutex<Option<WorkerGuard>>,
}

impl LoggingGuard {
    /// Flushes pending file output. Later events only reach stderr.
    pub(crate) fn flush_and_close(&self) {
        drop(lock_or_recover(&self.file, "log writer").take());
    }
}

pub(crate) fn resolve_log_dir(override_dir: Option<&Path>, data_root: Option<&Path>) -> PathBuf {
    if let Some(dir) = override_dir {
        return dir.to_path_buf();
    }
    match data_root {
        Some(root) => root.join("logs"),
        None => std::env::temp_dir().join("openbazaar-desktop").join("logs"),
    }
}

fn log_file_parts() -> (&'static str, &'static str) {
    DESKTOP_LOG_FILE
        .rsplit_once('.')
        .unwrap_or((DESKTOP_LOG_FILE, "log"))
}

/// Installs the global subscriber: stderr plus a daily rolling `desktop.log`.
///
/// `RUST_LOG` overrides the default filter. A log directory that cannot be
/// created only disables the file layer.
pub(crate) fn init(log_dir: &Path) -> LoggingGuard {
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_filter(env_filter());

    let (prefix, suffix) = log_file_parts();
    let file_setup = std::fs::create_dir_all(log_dir)
        .map_err(|error| error.to_string())
        .and_then(|()| {
            RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix(prefix)
                .filename_suffix(suffix)
                .build(log_dir)
                .map_err(|error| error.to_string())
        });

    let (file_layer, file_guard, file_error) = match file_setup {
        Ok(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(env_filter());
            (Some(layer), Some(guard), None)
        }
        Err(error) => (None, None, Some(error)),
    };

    if let Err(error) = tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
    {
        eprintln!("openbazaar-desktop: logging already initialized: {error}");
    }

    if let Some(error) = file_error {
        tracing::warn!(log_dir = %log_dir.display(), "file logging disabled: {error}");
    }

    LoggingGuard {
        file: Mutex::new(file_guard),
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn override_wins_over_data_root() {
        let resolved = resolve_log_dir(
            Some(Path::new("/var/log/ob")),
            Some(Path::new("/home/me/.openbazaar-desktop")),
        );
        assert_eq!(resolved, PathBuf::from("/var/log/ob"));
    }

    #[test]
    fn data_root_gets_logs_subdir() {
        let resolved = resolve_log_dir(None, Some(Path::new("/home/me/.openbazaar-desktop")));
        assert_eq!(resolved, PathBuf::from("/home/me/.openbazaar-desktop/logs"));
    }

    #[test]
    fn log_file_name_splits_into_prefix_and_suffix() {
        assert_eq!(log_file_parts(), ("desktop", "log"));
    }
}
