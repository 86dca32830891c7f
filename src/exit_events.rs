use tauri::{AppHandle, ExitRequestApi, Manager};

use crate::{
    app_types::ShellState,
    logging::LoggingGuard,
    supervisor::{self, ShutdownOutcome, Supervisor},
    EXIT_CLEANUP_GRACE,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExitDecision {
    Allow,
    KeepRunningWithoutWindows,
    CleanupFirst,
}

fn decide_exit(
    exit_allowed: bool,
    code: Option<i32>,
    quitting: bool,
    keep_running_without_windows: bool,
) -> ExitDecision {
    if exit_allowed {
        return ExitDecision::Allow;
    }
    // A code-less request means the last window went away.
    if keep_running_without_windows && code.is_none() && !quitting {
        return ExitDecision::KeepRunningWithoutWindows;
    }
    ExitDecision::CleanupFirst
}

/// Runs the bounded shutdown, then lets the next exit request through and re-requests exit.
async fn finish_quit<F>(service: Option<&Supervisor>, shell: &ShellState, exit: F) -> Option<ShutdownOutcome>
where
    F: FnOnce(),
{
    let outcome = match service {
        Some(service) => {
            let bound = service.config().shutdown_timeout + EXIT_CLEANUP_GRACE;
            supervisor::quit_cleanup(service, bound).await
        }
        None => None,
    };
    shell.allow_next_exit_request();
    exit();
    outcome
}

pub(crate) fn handle_exit_requested(app_handle: &AppHandle, api: &ExitRequestApi, code: Option<i32>) {
    let state = app_handle.state::<ShellState>();
    let decision = decide_exit(
        state.take_exit_request_allowance(),
        code,
        state.is_quitting(),
        cfg!(target_os = "macos"),
    );

    match decision {
        ExitDecision::Allow => {
            tracing::info!("exit request allowed after cleanup");
        }
        ExitDecision::KeepRunningWithoutWindows => {
            api.prevent_exit();
            tracing::debug!("last window closed, staying alive until explicit quit");
        }
        ExitDecision::CleanupFirst => {
            api.prevent_exit();
            if !state.try_begin_exit_cleanup() {
                tracing::debug!("exit cleanup already running, ignoring exit request");
                return;
            }

            tracing::info!("exit requested, shutting down local service first");
            let exit_code = code.unwrap_or(0);
            let app_handle = app_handle.clone();
            tauri::async_runtime::spawn(async move {
                let service = app_handle.try_state::<Supervisor>();
                let shell = app_handle.state::<ShellState>();
                finish_quit(service.as_deref(), &shell, || app_handle.exit(exit_code)).await;
            });
        }
    }
}

pub(crate) fn handle_exit_event(app_handle: &AppHandle) {
    tracing::info!("desktop process exiting");
    if let Some(guard) = app_handle.try_state::<LoggingGuard>() {
        guard.flush_and_close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowance_lets_the_request_through() {
        assert_eq!(decide_exit(true, Some(0), true, true), ExitDecision::Allow);
        assert_eq!(decide_exit(true, None, false, false), ExitDecision::Allow);
    }

    #[test]
    fn last_window_close_keeps_mac_apps_alive() {
        assert_eq!(
            decide_exit(false, None, false, true),
            ExitDecision::KeepRunningWithoutWindows
        );
        assert_eq!(decide_exit(false, None, false, false), ExitDecision::CleanupFirst);
    }

    #[test]
    fn explicit_quit_always_cleans_up_first() {
        assert_eq!(decide_exit(false, Some(0), false, true), ExitDecision::CleanupFirst);
        assert_eq!(decide_exit(false, None, true, true), ExitDecision::CleanupFirst);
    }

    #[cfg(unix)]
    mod quit_sequence {
        use std::{
            cell::Cell,
            fs,
            path::PathBuf,
        };

        use super::*;
        use crate::{
            lifecycle_state::ServiceLifecycle,
            supervisor::StartTrigger,
            test_support::{
                spawn_stub_server, supervisor_config, wait_for_lifecycle, write_service_script,
                StubResponse, WAIT_FOR_STOP_FILE,
            },
        };

        fn shell() -> ShellState {
            ShellState::new(PathBuf::from("logs"), false, String::new())
        }

        #[tokio::test]
        async fn quit_stops_the_service_then_exits_with_an_allowance() {
            let dir = tempfile::tempdir().expect("tempdir");
            let bundle = write_service_script(dir.path(), WAIT_FOR_STOP_FILE);
            let stop_file = bundle.join("stop");
            let server = spawn_stub_server(move |_| {
                let _ = fs::write(&stop_file, b"");
                StubResponse::new("200 OK", "")
            });
            let service = Supervisor::new(
                dir.path().to_path_buf(),
                supervisor_config(&dir.path().join("logs"), &server.url("/api/v1/shutdown"), 0),
            );
            service.start_service(StartTrigger::Boot).expect("start");

            let shell = shell();
            assert!(shell.try_begin_exit_cleanup());
            let exited = Cell::new(false);
            let outcome = finish_quit(Some(&service), &shell, || exited.set(true)).await;

            assert_eq!(outcome, Some(ShutdownOutcome::Acknowledged));
            assert!(exited.get());
            assert_eq!(
                decide_exit(shell.take_exit_request_allowance(), Some(0), true, true),
                ExitDecision::Allow
            );
            wait_for_lifecycle(&service, ServiceLifecycle::Stopped);
        }

        #[tokio::test]
        async fn quit_without_a_supervisor_still_exits() {
            let shell = shell();
            let exited = Cell::new(false);
            let outcome = finish_quit(None, &shell, || exited.set(true)).await;

            assert_eq!(outcome, None);
            assert!(exited.get());
            assert!(shell.take_exit_request_allowance());
        }
    }
}
