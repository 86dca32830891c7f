use std::time::Instant;

use tauri::{AppHandle, Manager};

use crate::{
    app_types::ShellState,
    main_window, platform_tag, runtime_paths,
    service_config::ServiceConfig,
    supervisor::{StartOutcome, Supervisor},
    update_feed::{self, UpdateCheck, UpdateFeedError},
    UPDATE_FEED_TIMEOUT,
};

/// Boot sequence: supervisor, bundled service, main window, update check.
pub(crate) fn run_startup(app_handle: &AppHandle, config: ServiceConfig) {
    let install_dir = runtime_paths::resolve_install_dir(app_handle, &config);
    let supervisor = Supervisor::new(install_dir, config);
    tracing::info!(
        install_dir = %supervisor.install_dir().display(),
        launch_mode = ?supervisor.launch_mode(),
        "supervisor ready"
    );

    match supervisor.start_if_bundled() {
        Some(Ok(StartOutcome::Started { pid })) => tracing::info!(pid, "bundled service started"),
        Some(Ok(outcome)) => tracing::info!("bundled service start had nothing to do: {outcome:?}"),
        Some(Err(error)) => tracing::error!("bundled service failed to start: {error}"),
        None => {}
    }

    if !app_handle.manage(supervisor) {
        tracing::warn!("supervisor already managed, keeping the existing one");
    }

    if let Err(error) = main_window::create_main_window(app_handle) {
        tracing::error!("{error}");
    }

    spawn_update_check(app_handle.clone());
}

pub(crate) async fn check_app_update(
    app_handle: &AppHandle,
    current_version: &str,
) -> Result<UpdateCheck, UpdateFeedError> {
    let base_url = app_handle.state::<ShellState>().update_feed_base_url.clone();
    let url = update_feed::feed_url(
        &base_url,
        &platform_tag::current_platform_tag(),
        current_version,
    )?;
    let client = update_feed::build_client(UPDATE_FEED_TIMEOUT)?;
    tracing::debug!(%url, "checking update feed");
    update_feed::check_for_update(&client, &url, current_version).await
}

fn spawn_update_check(app_handle: AppHandle) {
    if !app_handle.state::<ShellState>().auto_update_check {
        tracing::info!("automatic update check disabled");
        return;
    }

    tauri::async_runtime::spawn(async move {
        let current_version = app_handle.package_info().version.to_string();
        let started = Instant::now();
        let outcome = check_app_update(&app_handle, &current_version).await;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match outcome {
            Ok(UpdateCheck::UpToDate) => {
                tracing::info!(%current_version, elapsed_ms, "no update available");
            }
            Ok(UpdateCheck::Available(release)) => {
                tracing::info!(
                    %current_version,
                    elapsed_ms,
                    release = release.name.as_deref().unwrap_or("unnamed"),
                    download_url = %release.download_url,
                    "update available"
                );
                main_window::log_to_console(
                    &app_handle,
                    &format!("Update available! {}", release.download_url),
                );
            }
            Err(error) => {
                tracing::warn!(%current_version, elapsed_ms, "update check failed: {error}");
                main_window::log_to_console(&app_handle, &format!("Error with Update: {error}"));
            }
        }
    });
}
