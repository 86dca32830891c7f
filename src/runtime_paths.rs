use std::path::{Path, PathBuf};

use tauri::{AppHandle, Manager};

use crate::{launch_plan, service_config::ServiceConfig, DESKTOP_DATA_DIR};

/// Per-user directory for shell state and logs.
pub(crate) fn default_data_root_dir() -> Option<PathBuf> {
    home::home_dir().map(|home| home.join(DESKTOP_DATA_DIR))
}

fn current_exe_dir() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
}

/// Picks the directory the bundled service is looked up in.
///
/// An explicit override always wins. Otherwise the first candidate that
/// actually contains the service bundle is used, falling back to the first
/// candidate at all.
pub(crate) fn select_install_dir(
    override_dir: Option<&Path>,
    candidates: &[PathBuf],
    service_dir_name: &str,
) -> Option<PathBuf> {
    if let Some(dir) = override_dir {
        return Some(dir.to_path_buf());
    }
    candidates
        .iter()
        .find(|candidate| launch_plan::detect_bundled_service(candidate, service_dir_name))
        .or_else(|| candidates.first())
        .cloned()
}

pub(crate) fn resolve_install_dir(app_handle: &AppHandle, config: &ServiceConfig) -> PathBuf {
    let mut candidates = Vec::new();
    match app_handle.path().resource_dir() {
        Ok(dir) => candidates.push(dir),
        Err(error) => tracing::debug!("resource dir unavailable: {error}"),
    }
    if let Some(dir) = current_exe_dir() {
        if !candidates.contains(&dir) {
            candidates.push(dir);
        }
    }

    select_install_dir(
        config.install_dir_override.as_deref(),
        &candidates,
        &config.service_dir_name,
    )
    .unwrap_or_else(|| PathBuf::from("."))
}
