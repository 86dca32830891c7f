use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::service_config::ServiceConfig;

/// Whether this run owns a locally bundled service or relies on an external one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) enum LaunchMode {
    Installer,
    Standalone,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LaunchPlan {
    pub(crate) program: PathBuf,
    pub(crate) args: Vec<String>,
    pub(crate) cwd: PathBuf,
}

impl LaunchPlan {
    pub(crate) fn for_install_dir(install_dir: &Path, config: &ServiceConfig) -> Self {
        let cwd = bundled_service_dir(install_dir, &config.service_dir_name);
        Self {
            program: cwd.join(&config.executable_name),
            args: config.args.clone(),
            cwd,
        }
    }

    pub(crate) fn debug_command(&self) -> Vec<String> {
        let mut parts = vec![self.program.to_string_lossy().to_string()];
        parts.extend(self.args.iter().cloned());
        parts
    }
}

pub(crate) fn bundled_service_dir(install_dir: &Path, service_dir_name: &str) -> PathBuf {
    install_dir.join(service_dir_name)
}

pub(crate) fn detect_bundled_service(install_dir: &Path, service_dir_name: &str) -> bool {
    bundled_service_dir(install_dir, service_dir_name).is_dir()
}

pub(crate) fn resolve_launch_mode(install_dir: &Path, service_dir_name: &str) -> LaunchMode {
    if detect_bundled_service(install_dir, service_dir_name) {
        LaunchMode::Installer
    } else {
        LaunchMode::Standalone
    }
}
