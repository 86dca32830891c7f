use std::{
    path::Path,
    process::{Command, Stdio},
};
use tauri::{AppHandle, Manager};

use crate::{
    startup_task,
    supervisor::{ShutdownOutcome, ShutdownTrigger, StartOutcome, StartTrigger, Supervisor},
    update_feed::UpdateCheck,
    AppUpdateCheckResult, BridgeResult, SupervisorStatus,
};

fn spawn_opener(program: &str, args: &[&std::ffi::OsStr]) -> Result<(), String> {
    Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map(|_| ())
        .map_err(|error| format!("Failed to run '{program}': {error}"))
}

#[cfg(target_os = "macos")]
pub(crate) fn open_path_with_system_opener(path: &Path) -> Result<(), String> {
    spawn_opener("open", &[path.as_os_str()])
}

#[cfg(target_os = "windows")]
pub(crate) fn open_path_with_system_opener(path: &Path) -> Result<(), String> {
    spawn_opener("explorer", &[path.as_os_str()])
}

#[cfg(all(unix, not(target_os = "macos")))]
pub(crate) fn open_path_with_system_opener(path: &Path) -> Result<(), String> {
    spawn_opener("xdg-open", &[path.as_os_str()])
}

#[cfg(not(any(target_os = "macos", target_os = "windows", unix)))]
pub(crate) fn open_path_with_system_opener(_path: &Path) -> Result<(), String> {
    Err("Opening paths is not supported on this platform.".to_string())
}

fn start_outcome_result(outcome: StartOutcome) -> BridgeResult {
    match outcome {
        StartOutcome::Started { .. } => BridgeResult::ok(),
        StartOutcome::AlreadyRunning { pid } => {
            BridgeResult::ok_with(format!("Local server already running (pid {pid})."))
        }
        StartOutcome::AlreadyStarting => BridgeResult::ok_with("Local server is already starting."),
    }
}

fn shutdown_outcome_result(outcome: ShutdownOutcome) -> BridgeResult {
    match outcome {
        ShutdownOutcome::Acknowledged => BridgeResult::ok(),
        ShutdownOutcome::NotRunning => BridgeResult::ok_with("No local server appears to be running."),
        ShutdownOutcome::Skipped => BridgeResult::ok_with("Shutdown skipped."),
    }
}

#[tauri::command]
pub(crate) fn desktop_bridge_is_desktop_runtime() -> bool {
    true
}

#[tauri::command]
pub(crate) fn desktop_bridge_get_service_state(
    app_handle: AppHandle,
) -> Result<SupervisorStatus, String> {
    app_handle
        .try_state::<Supervisor>()
        .map(|supervisor| supervisor.status())
        .ok_or_else(|| "Supervisor is not initialized yet.".to_string())
}

#[tauri::command]
pub(crate) async fn desktop_bridge_start_local_server(app_handle: AppHandle) -> BridgeResult {
    let joined = tauri::async_runtime::spawn_blocking(move || {
        let supervisor = app_handle
            .try_state::<Supervisor>()
            .ok_or_else(|| "Supervisor is not initialized yet.".to_string())?;
        supervisor
            .start_service(StartTrigger::Bridge)
            .map_err(|error| error.to_string())
    })
    .await;

    match joined {
        Ok(Ok(outcome)) => start_outcome_result(outcome),
        Ok(Err(reason)) => BridgeResult::failed(reason),
        Err(error) => BridgeResult::failed(format!("Start task failed: {error}")),
    }
}

#[tauri::command]
pub(crate) async fn desktop_bridge_shutdown_local_server(app_handle: AppHandle) -> BridgeResult {
    let Some(supervisor) = app_handle.try_state::<Supervisor>() else {
        return BridgeResult::failed("Supervisor is not initialized yet.");
    };
    shutdown_outcome_result(supervisor.request_shutdown(ShutdownTrigger::Bridge).await)
}

#[tauri::command]
pub(crate) async fn desktop_bridge_check_app_update(app_handle: AppHandle) -> AppUpdateCheckResult {
    let current_version = app_handle.package_info().version.to_string();
    let mut result = AppUpdateCheckResult {
        ok: true,
        reason: None,
        current_version: current_version.clone(),
        has_update: false,
        release_name: None,
        release_notes: None,
        release_date: None,
        download_url: None,
    };

    match startup_task::check_app_update(&app_handle, &current_version).await {
        Ok(UpdateCheck::UpToDate) => {}
        Ok(UpdateCheck::Available(release)) => {
            result.has_update = true;
            result.release_name = release.name;
            result.release_notes = release.notes;
            result.release_date = release.pub_date.map(|date| date.to_rfc3339());
            result.download_url = Some(release.download_url);
        }
        Err(error) => {
            tracing::warn!("bridge update check failed: {error}");
            result.ok = false;
            result.reason = Some(error.to_string());
        }
    }
    result
}
