use tauri::{AppHandle, Manager};

use crate::{
    app_types::ShellState,
    desktop_bridge_commands,
    supervisor::{ShutdownTrigger, StartOutcome, StartTrigger, Supervisor},
    tray_actions,
};

fn start_from_tray(app_handle: &AppHandle) {
    let app_handle = app_handle.clone();
    tauri::async_runtime::spawn_blocking(move || {
        let Some(supervisor) = app_handle.try_state::<Supervisor>() else {
            tracing::warn!("tray start ignored: supervisor not initialized");
            return;
        };
        match supervisor.start_service(StartTrigger::TrayMenu) {
            Ok(StartOutcome::Started { pid }) => {
                tracing::info!(pid, "local service started from tray menu")
            }
            Ok(outcome) => tracing::info!("tray start had nothing to do: {outcome:?}"),
            Err(error) => tracing::error!("tray start failed: {error}"),
        }
    });
}

fn shutdown_from_tray(app_handle: &AppHandle) {
    let app_handle = app_handle.clone();
    tauri::async_runtime::spawn(async move {
        let Some(supervisor) = app_handle.try_state::<Supervisor>() else {
            tracing::warn!("tray shutdown ignored: supervisor not initialized");
            return;
        };
        let outcome = supervisor.request_shutdown(ShutdownTrigger::TrayMenu).await;
        tracing::info!("tray shutdown finished: {outcome:?}");
    });
}

fn view_debug_log(app_handle: &AppHandle) {
    let log_dir = app_handle.state::<ShellState>().log_dir.clone();
    if let Err(error) = desktop_bridge_commands::open_path_with_system_opener(&log_dir) {
        tracing::warn!(log_dir = %log_dir.display(), "failed to open debug log: {error}");
    }
}

pub fn handle_tray_menu_event(app_handle: &AppHandle, menu_id: &str) {
    match tray_actions::action_from_menu_id(menu_id) {
        Some(tray_actions::TrayMenuAction::StartServer) => start_from_tray(app_handle),
        Some(tray_actions::TrayMenuAction::ShutdownServer) => shutdown_from_tray(app_handle),
        Some(tray_actions::TrayMenuAction::ViewDebugLog) => view_debug_log(app_handle),
        Some(tray_actions::TrayMenuAction::Quit) => {
            app_handle.state::<ShellState>().mark_quitting();
            tracing::info!("tray quit requested, exiting desktop process");
            app_handle.exit(0);
        }
        None => {}
    }
}
