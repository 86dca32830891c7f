#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod app_constants;
mod app_menu;
mod app_runtime;
mod app_types;
mod desktop_bridge_commands;
mod diagnostic_buffer;
mod error;
mod exit_events;
mod exit_state;
mod launch_plan;
mod lifecycle_state;
mod logging;
mod main_window;
mod platform_tag;
mod process_control;
mod runtime_paths;
mod service_config;
mod service_handle;
mod service_readiness;
mod shutdown_http;
mod startup_task;
mod supervisor;
#[cfg(test)]
mod test_support;
mod tray_actions;
mod tray_menu_handler;
mod tray_setup;
mod update_feed;
mod url_scheme;

pub(crate) use app_constants::*;
pub(crate) use app_types::{
    AppUpdateCheckResult, BridgeResult, PendingRoute, ShellState, SupervisorStatus,
};

fn main() {
    app_runtime::run();
}
