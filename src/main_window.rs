use tauri::{AppHandle, Manager, WebviewUrl, WebviewWindow, WebviewWindowBuilder};

use crate::{url_scheme, MAIN_WINDOW_ENTRY, MAIN_WINDOW_LABEL, MAIN_WINDOW_TITLE};

/// Creates the main window, or focuses it when it already exists.
pub(crate) fn create_main_window(app_handle: &AppHandle) -> Result<WebviewWindow, String> {
    if let Some(window) = app_handle.get_webview_window(MAIN_WINDOW_LABEL) {
        show_window(&window);
        return Ok(window);
    }

    let window = WebviewWindowBuilder::new(
        app_handle,
        MAIN_WINDOW_LABEL,
        WebviewUrl::App(MAIN_WINDOW_ENTRY.into()),
    )
    .title(MAIN_WINDOW_TITLE)
    .inner_size(1200.0, 720.0)
    .min_inner_size(1024.0, 700.0)
    .center()
    .decorations(false)
    .build()
    .map_err(|error| format!("Failed to create main window: {error}"))?;

    #[cfg(debug_assertions)]
    window.open_devtools();

    Ok(window)
}

fn show_window(window: &WebviewWindow) {
    if let Err(error) = window.unminimize() {
        tracing::debug!("failed to unminimize main window: {error}");
    }
    if let Err(error) = window.show() {
        tracing::warn!("failed to show main window: {error}");
    }
    if let Err(error) = window.set_focus() {
        tracing::debug!("failed to focus main window: {error}");
    }
}

pub(crate) fn show_main_window(app_handle: &AppHandle) {
    match app_handle.get_webview_window(MAIN_WINDOW_LABEL) {
        Some(window) => show_window(&window),
        None => {
            if let Err(error) = create_main_window(app_handle) {
                tracing::error!("{error}");
            }
        }
    }
}

pub(crate) fn reload_main_window(app_handle: &AppHandle) {
    let Some(window) = app_handle.get_webview_window(MAIN_WINDOW_LABEL) else {
        tracing::debug!("reload skipped: main window not found");
        return;
    };
    if let Err(error) = window.eval("window.location.reload();") {
        tracing::warn!("failed to reload main window: {error}");
    }
}

pub(crate) fn toggle_devtools(app_handle: &AppHandle) {
    let Some(window) = app_handle.get_webview_window(MAIN_WINDOW_LABEL) else {
        tracing::debug!("devtools toggle skipped: main window not found");
        return;
    };
    if window.is_devtools_open() {
        window.close_devtools();
    } else {
        window.open_devtools();
    }
}

pub(crate) fn navigate_to_route(app_handle: &AppHandle, route: &str) {
    let Some(window) = app_handle.get_webview_window(MAIN_WINDOW_LABEL) else {
        tracing::debug!(route, "route dropped: main window not found");
        return;
    };
    tracing::info!(route, "navigating main window");
    if let Err(error) = window.eval(&url_scheme::navigate_script(route)) {
        tracing::warn!(route, "failed to navigate main window: {error}");
    }
}

pub(crate) fn console_log_script(message: &str) -> String {
    let encoded = serde_json::to_string(message).unwrap_or_else(|_| "\"\"".to_string());
    format!("console.log({encoded});")
}

/// Echoes a shell message into the UI's developer console.
pub(crate) fn log_to_console(app_handle: &AppHandle, message: &str) {
    if let Some(window) = app_handle.get_webview_window(MAIN_WINDOW_LABEL) {
        if let Err(error) = window.eval(&console_log_script(message)) {
            tracing::debug!("failed to echo message to ui console: {error}");
        }
    }
}
