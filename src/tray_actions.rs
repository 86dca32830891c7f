pub const TRAY_MENU_START_SERVER: &str = "tray_start_server";
pub const TRAY_MENU_SHUTDOWN_SERVER: &str = "tray_shutdown_server";
pub const TRAY_MENU_VIEW_DEBUG_LOG: &str = "tray_view_debug_log";
pub const TRAY_MENU_QUIT: &str = "tray_quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrayMenuAction {
    StartServer,
    ShutdownServer,
    ViewDebugLog,
    Quit,
}

pub fn action_from_menu_id(menu_id: &str) -> Option<TrayMenuAction> {
    match menu_id {
        TRAY_MENU_START_SERVER => Some(TrayMenuAction::StartServer),
        TRAY_MENU_SHUTDOWN_SERVER => Some(TrayMenuAction::ShutdownServer),
        TRAY_MENU_VIEW_DEBUG_LOG => Some(TrayMenuAction::ViewDebugLog),
        TRAY_MENU_QUIT => Some(TrayMenuAction::Quit),
        _ => None,
    }
}
