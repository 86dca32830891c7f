use tauri::{
    menu::{IsMenuItem, Menu, MenuItem, PredefinedMenuItem},
    tray::{MouseButton, MouseButtonState, TrayIconBuilder, TrayIconEvent},
    AppHandle, Wry,
};

use crate::{main_window, tray_actions, tray_menu_handler, MAIN_WINDOW_TITLE, TRAY_ID};

fn action_item(app_handle: &AppHandle, id: &str, label: &str) -> Result<MenuItem<Wry>, String> {
    MenuItem::with_id(app_handle, id, label, true, None::<&str>)
        .map_err(|error| format!("Failed to create tray item {id}: {error}"))
}

fn separator(app_handle: &AppHandle) -> Result<PredefinedMenuItem<Wry>, String> {
    PredefinedMenuItem::separator(app_handle)
        .map_err(|error| format!("Failed to create tray separator: {error}"))
}

fn build_tray_menu(app_handle: &AppHandle) -> Result<Menu<Wry>, String> {
    let start = action_item(app_handle, tray_actions::TRAY_MENU_START_SERVER, "Start Local Server")?;
    let shutdown = action_item(
        app_handle,
        tray_actions::TRAY_MENU_SHUTDOWN_SERVER,
        "Shutdown Local Server",
    )?;
    let debug_log = action_item(app_handle, tray_actions::TRAY_MENU_VIEW_DEBUG_LOG, "View Debug Log")?;
    let quit = action_item(app_handle, tray_actions::TRAY_MENU_QUIT, "Quit")?;
    let after_server = separator(app_handle)?;
    let before_quit = separator(app_handle)?;

    let entries: [&dyn IsMenuItem<Wry>; 6] =
        [&start, &shutdown, &after_server, &debug_log, &before_quit, &quit];
    Menu::with_items(app_handle, &entries).map_err(|error| format!("Failed to build tray menu: {error}"))
}

/// Installs the tray icon with the local server controls.
pub fn setup_tray(app_handle: &AppHandle) -> Result<(), String> {
    let menu = build_tray_menu(app_handle)?;

    let builder = TrayIconBuilder::with_id(TRAY_ID)
        .menu(&menu)
        .tooltip(MAIN_WINDOW_TITLE)
        .icon(tauri::include_image!("./icons/tray.png"))
        .show_menu_on_left_click(false)
        .on_menu_event(|app, event| {
            tray_menu_handler::handle_tray_menu_event(app, event.id().as_ref())
        })
        .on_tray_icon_event(|tray, event| {
            // Left click restores the window; right click opens the menu.
            if matches!(
                event,
                TrayIconEvent::Click {
                    button: MouseButton::Left,
                    button_state: MouseButtonState::Up,
                    ..
                }
            ) {
                main_window::show_main_window(tray.app_handle());
            }
        });

    #[cfg(target_os = "macos")]
    let builder = builder.icon_as_template(true);

    builder
        .build(app_handle)
        .map(|_| ())
        .map_err(|error| format!("Failed to create tray icon: {error}"))
}
