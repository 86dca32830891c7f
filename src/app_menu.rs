use tauri::{
    menu::{Menu, MenuEvent, MenuItem, PredefinedMenuItem, Submenu},
    AppHandle, Manager, Runtime,
};

use crate::{app_types::ShellState, main_window};

pub const APP_MENU_QUIT: &str = "app_menu_quit";
pub const APP_MENU_RELOAD: &str = "app_menu_reload";
pub const APP_MENU_TOGGLE_DEVTOOLS: &str = "app_menu_toggle_devtools";

#[cfg(target_os = "macos")]
const DEVTOOLS_ACCELERATOR: &str = "Alt+Command+I";
#[cfg(not(target_os = "macos"))]
const DEVTOOLS_ACCELERATOR: &str = "Ctrl+Shift+I";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMenuAction {
    Quit,
    Reload,
    ToggleDevtools,
}

pub fn action_from_menu_id(menu_id: &str) -> Option<AppMenuAction> {
    match menu_id {
        APP_MENU_QUIT => Some(AppMenuAction::Quit),
        APP_MENU_RELOAD => Some(AppMenuAction::Reload),
        APP_MENU_TOGGLE_DEVTOOLS => Some(AppMenuAction::ToggleDevtools),
        _ => None,
    }
}

pub(crate) fn build_app_menu<R: Runtime>(handle: &AppHandle<R>) -> tauri::Result<Menu<R>> {
    let quit_item = MenuItem::with_id(
        handle,
        APP_MENU_QUIT,
        "Quit OpenBazaar",
        true,
        Some("CmdOrCtrl+Q"),
    )?;
    let app_submenu = Submenu::with_items(handle, "OpenBazaar", true, &[&quit_item])?;

    let edit_submenu = {
        let undo = PredefinedMenuItem::undo(handle, None)?;
        let redo = PredefinedMenuItem::redo(handle, None)?;
        let separator = PredefinedMenuItem::separator(handle)?;
        let cut = PredefinedMenuItem::cut(handle, None)?;
        let copy = PredefinedMenuItem::copy(handle, None)?;
        let paste = PredefinedMenuItem::paste(handle, None)?;
        let select_all = PredefinedMenuItem::select_all(handle, None)?;
        Submenu::with_items(
            handle,
            "Edit",
            true,
            &[&undo, &redo, &separator, &cut, &copy, &paste, &select_all],
        )?
    };

    let reload_item = MenuItem::with_id(handle, APP_MENU_RELOAD, "Reload", true, Some("CmdOrCtrl+R"))?;
    let devtools_item = MenuItem::with_id(
        handle,
        APP_MENU_TOGGLE_DEVTOOLS,
        "Toggle Developer Tools",
        true,
        Some(DEVTOOLS_ACCELERATOR),
    )?;
    let view_submenu = Submenu::with_items(handle, "View", true, &[&reload_item, &devtools_item])?;

    Menu::with_items(handle, &[&app_submenu, &edit_submenu, &view_submenu])
}

pub(crate) fn handle_app_menu_event(app_handle: &AppHandle, event: MenuEvent) {
    match action_from_menu_id(event.id().as_ref()) {
        Some(AppMenuAction::Quit) => {
            app_handle.state::<ShellState>().mark_quitting();
            tracing::info!("quit requested from application menu");
            app_handle.exit(0);
        }
        Some(AppMenuAction::Reload) => main_window::reload_main_window(app_handle),
        Some(AppMenuAction::ToggleDevtools) => main_window::toggle_devtools(app_handle),
        None => {}
    }
}
