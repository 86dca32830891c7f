use tauri::{webview::PageLoadEvent, AppHandle, Manager, RunEvent, WindowEvent};

use crate::{
    app_menu, exit_events, logging, main_window,
    service_config::ServiceConfig,
    startup_task,
    supervisor::{self, Supervisor},
    tray_setup, url_scheme, PendingRoute, ShellState, MAIN_WINDOW_LABEL,
};

/// Hands a route to the loaded UI, or parks it until the UI finishes loading.
fn deliver_route(app_handle: &AppHandle, route: String) {
    let pending = app_handle.state::<PendingRoute>();
    match pending.offer(route) {
        Some(route) => main_window::navigate_to_route(app_handle, &route),
        None => tracing::debug!("route parked until the ui finishes loading"),
    }
}

#[cfg(any(target_os = "macos", target_os = "ios"))]
fn handle_incoming_uri(app_handle: &AppHandle, uri: &str) {
    match url_scheme::parse_route(uri) {
        Some(route) => {
            main_window::show_main_window(app_handle);
            deliver_route(app_handle, route);
        }
        None => tracing::debug!(uri, "ignoring link without a known route"),
    }
}

fn handle_second_instance(app_handle: &AppHandle, argv: Vec<String>) {
    tracing::info!("second instance started, focusing main window");
    main_window::show_main_window(app_handle);
    if let Some(route) = url_scheme::route_from_args(argv) {
        deliver_route(app_handle, route);
    }
}

fn handle_main_window_destroyed(app_handle: &AppHandle) {
    app_handle.state::<PendingRoute>().mark_ui_loading();

    let app_handle = app_handle.clone();
    tauri::async_runtime::spawn(async move {
        if let Some(service) = app_handle.try_state::<Supervisor>() {
            supervisor::close_main_window_cleanup(&service).await;
        }
    });
}

pub(crate) fn run() {
    let config = ServiceConfig::from_env();
    let log_dir = config.log_dir.clone();
    let logging_guard = logging::init(&log_dir);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        log_dir = %log_dir.display(),
        "desktop process starting"
    );

    let pending_route = PendingRoute::default();
    if let Some(route) = url_scheme::route_from_args(std::env::args()) {
        tracing::info!(%route, "launched with a link");
        pending_route.offer(route);
    }
    let shell_state = ShellState::new(
        log_dir,
        config.auto_update_check,
        config.update_feed_base_url.clone(),
    );

    tauri::Builder::default()
        .plugin(tauri_plugin_single_instance::init(|app, argv, _cwd| {
            handle_second_instance(app, argv);
        }))
        .menu(app_menu::build_app_menu)
        .on_menu_event(app_menu::handle_app_menu_event)
        .manage(logging_guard)
        .manage(shell_state)
        .manage(pending_route)
        .invoke_handler(tauri::generate_handler![
            crate::desktop_bridge_commands::desktop_bridge_is_desktop_runtime,
            crate::desktop_bridge_commands::desktop_bridge_get_service_state,
            crate::desktop_bridge_commands::desktop_bridge_start_local_server,
            crate::desktop_bridge_commands::desktop_bridge_shutdown_local_server,
            crate::desktop_bridge_commands::desktop_bridge_check_app_update,
        ])
        .on_window_event(|window, event| {
            if window.label() != MAIN_WINDOW_LABEL {
                return;
            }
            if let WindowEvent::Destroyed = event {
                handle_main_window_destroyed(window.app_handle());
            }
        })
        .on_page_load(|webview, payload| {
            if webview.label() != MAIN_WINDOW_LABEL {
                return;
            }
            let pending = webview.app_handle().state::<PendingRoute>();
            match payload.event() {
                PageLoadEvent::Started => {
                    tracing::debug!(url = %payload.url(), "page-load started");
                    pending.mark_ui_loading();
                }
                PageLoadEvent::Finished => {
                    tracing::debug!(url = %payload.url(), "page-load finished");
                    if let Some(route) = pending.mark_ui_loaded() {
                        main_window::navigate_to_route(webview.app_handle(), &route);
                    }
                }
            }
        })
        .setup(move |app| {
            let app_handle = app.handle().clone();
            if let Err(error) = tray_setup::setup_tray(&app_handle) {
                tracing::error!("failed to initialize tray: {error}");
            }

            startup_task::run_startup(&app_handle, config);
            Ok(())
        })
        .build(tauri::generate_context!())
        .expect("error while building tauri application")
        .run(|app_handle, event| match event {
            RunEvent::ExitRequested { code, api, .. } => {
                exit_events::handle_exit_requested(app_handle, &api, code);
            }
            RunEvent::Exit => {
                exit_events::handle_exit_event(app_handle);
            }
            #[cfg(target_os = "macos")]
            RunEvent::Reopen {
                has_visible_windows,
                ..
            } => {
                if !has_visible_windows {
                    main_window::show_main_window(app_handle);
                }
            }
            #[cfg(any(target_os = "macos", target_os = "ios"))]
            RunEvent::Opened { urls } => {
                for url in urls {
                    handle_incoming_uri(app_handle, url.as_str());
                }
            }
            _ => {}
        });
}
