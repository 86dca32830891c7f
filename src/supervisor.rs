use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Mutex,
    },
    thread,
    time::Duration,
};

use crate::{
    app_types::{lock_or_recover, AtomicFlagGuard, SupervisorStatus},
    error::{SupervisorError, SupervisorResult},
    launch_plan::{self, LaunchMode, LaunchPlan},
    lifecycle_state::{LifecycleEvent, LifecycleStateMachine, ServiceLifecycle},
    process_control::{self, OutputFiles},
    service_config::ServiceConfig,
    service_handle::ServiceHandle,
    service_readiness::{self, ReadinessOutcome},
    shutdown_http::{self, ShutdownResponse},
    OUTPUT_TAIL_INTERVAL,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StartTrigger {
    Boot,
    TrayMenu,
    Bridge,
}

impl StartTrigger {
    fn as_str(self) -> &'static str {
        match self {
            Self::Boot => "boot",
            Self::TrayMenu => "tray-menu",
            Self::Bridge => "bridge",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ShutdownTrigger {
    AppQuit,
    WindowClosed,
    TrayMenu,
    Bridge,
}

impl ShutdownTrigger {
    fn as_str(self) -> &'static str {
        match self {
            Self::AppQuit => "app-quit",
            Self::WindowClosed => "window-closed",
            Self::TrayMenu => "tray-menu",
            Self::Bridge => "bridge",
        }
    }

    /// Lifecycle triggers only fire for a service this instance is responsible for.
    fn is_lifecycle(self) -> bool {
        matches!(self, Self::AppQuit | Self::WindowClosed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StartOutcome {
    Started { pid: u32 },
    AlreadyRunning { pid: u32 },
    AlreadyStarting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ShutdownOutcome {
    Acknowledged,
    NotRunning,
    Skipped,
}

struct Shared {
    config: ServiceConfig,
    install_dir: PathBuf,
    launch_mode: LaunchMode,
    handle: Mutex<Option<ServiceHandle>>,
    lifecycle: Mutex<LifecycleStateMachine>,
    is_spawning: AtomicBool,
    responsible: AtomicBool,
    next_generation: AtomicU64,
}

impl Shared {
    fn apply(&self, event: LifecycleEvent) -> Option<ServiceLifecycle> {
        let mut machine = lock_or_recover(&self.lifecycle, "service lifecycle");
        let from = machine.current();
        match machine.apply(event) {
            Ok(next) => {
                if next != from {
                    tracing::info!(
                        from = from.as_str(),
                        to = next.as_str(),
                        "service lifecycle: {event:?}"
                    );
                }
                Some(next)
            }
            Err(rejected) => {
                tracing::debug!(
                    from = rejected.from.as_str(),
                    "service lifecycle ignored {:?}",
                    rejected.event
                );
                None
            }
        }
    }

    fn is_generation_live(&self, generation: u64) -> bool {
        lock_or_recover(&self.handle, "service handle")
            .as_ref()
            .is_some_and(|handle| handle.generation == generation)
    }
}

/// Owns the bundled service for the lifetime of the shell.
///
/// All process and lifecycle state sits behind this type; tray, menu, window
/// and bridge code only call its operations.
pub(crate) struct Supervisor {
    shared: Arc<Shared>,
    http: reqwest::Client,
    shutdown_gate: tokio::sync::Mutex<()>,
}

impl Supervisor {
    pub(crate) fn new(install_dir: PathBuf, config: ServiceConfig) -> Self {
        let launch_mode = launch_plan::resolve_launch_mode(&install_dir, &config.service_dir_name);
        let http = reqwest::Client::builder()
            .no_proxy()
            .build()
            .unwrap_or_else(|error| {
                tracing::warn!("failed to build loopback http client, using defaults: {error}");
                reqwest::Client::new()
            });

        Self {
            shared: Arc::new(Shared {
                config,
                install_dir,
                launch_mode,
                handle: Mutex::new(None),
                lifecycle: Mutex::new(LifecycleStateMachine::default()),
                is_spawning: AtomicBool::new(false),
                responsible: AtomicBool::new(launch_mode == LaunchMode::Installer),
                next_generation: AtomicU64::new(0),
            }),
            http,
            shutdown_gate: tokio::sync::Mutex::new(()),
        }
    }

    pub(crate) fn launch_mode(&self) -> LaunchMode {
        self.shared.launch_mode
    }

    pub(crate) fn config(&self) -> &ServiceConfig {
        &self.shared.config
    }

    pub(crate) fn install_dir(&self) -> &Path {
        &self.shared.install_dir
    }

    pub(crate) fn lifecycle(&self) -> ServiceLifecycle {
        lock_or_recover(&self.shared.lifecycle, "service lifecycle").current()
    }

    pub(crate) fn lifecycle_history(&self) -> Vec<ServiceLifecycle> {
        lock_or_recover(&self.shared.lifecycle, "service lifecycle")
            .history()
            .to_vec()
    }

    pub(crate) fn is_responsible(&self) -> bool {
        self.shared.responsible.load(Ordering::Acquire)
    }

    pub(crate) fn live_pid(&self) -> Option<u32> {
        lock_or_recover(&self.shared.handle, "service handle")
            .as_ref()
            .map(|handle| handle.pid)
    }

    pub(crate) fn status(&self) -> SupervisorStatus {
        SupervisorStatus {
            lifecycle: self.lifecycle(),
            launch_mode: self.launch_mode(),
            pid: self.live_pid(),
            responsible: self.is_responsible(),
            spawning: self.shared.is_spawning.load(Ordering::Acquire),
            history: self.lifecycle_history(),
        }
    }

    /// Boot-time entry point: starts the service only when it is bundled.
    pub(crate) fn start_if_bundled(&self) -> Option<SupervisorResult<StartOutcome>> {
        if self.launch_mode() != LaunchMode::Installer {
            tracing::info!(
                install_dir = %self.install_dir().display(),
                "no bundled service found, assuming an externally managed server"
            );
            return None;
        }
        Some(self.start_service(StartTrigger::Boot))
    }

    /// Spawns the service unless one is already live or being spawned.
    ///
    /// Returns as soon as the process exists; readiness is confirmed later by
    /// a background probe.
    pub(crate) fn start_service(&self, trigger: StartTrigger) -> SupervisorResult<StartOutcome> {
        let Some(_spawning) = AtomicFlagGuard::try_set(&self.shared.is_spawning) else {
            tracing::info!(
                trigger = trigger.as_str(),
                "start ignored: service spawn already in progress"
            );
            return Ok(StartOutcome::AlreadyStarting);
        };

        let mut slot = lock_or_recover(&self.shared.handle, "service handle");
        if let Some(handle) = slot.as_mut() {
            match handle.try_exit_status() {
                Ok(None) => {
                    tracing::info!(
                        trigger = trigger.as_str(),
                        pid = handle.pid,
                        "start ignored: service already running"
                    );
                    return Ok(StartOutcome::AlreadyRunning { pid: handle.pid });
                }
                Ok(Some(status)) => {
                    tracing::info!(pid = handle.pid, "releasing exited service handle ({status})");
                    *slot = None;
                    self.shared.apply(LifecycleEvent::ProcessExited);
                }
                Err(error) => {
                    tracing::warn!(
                        pid = handle.pid,
                        "cannot poll existing service, refusing to spawn another: {error}"
                    );
                    return Ok(StartOutcome::AlreadyRunning { pid: handle.pid });
                }
            }
        }

        self.shared.apply(LifecycleEvent::StartRequested);

        let generation = self.shared.next_generation.fetch_add(1, Ordering::AcqRel) + 1;
        let plan = LaunchPlan::for_install_dir(&self.shared.install_dir, &self.shared.config);
        let output = OutputFiles::for_run(&self.shared.config.log_dir, generation);
        tracing::info!(
            trigger = trigger.as_str(),
            cwd = %plan.cwd.display(),
            stdout = %output.stdout.display(),
            "starting local service: {:?}",
            plan.debug_command()
        );

        let child = match process_control::spawn_detached(&plan, &output) {
            Ok(child) => child,
            Err(source) => {
                tracing::error!(
                    cwd = %plan.cwd.display(),
                    "failed to start local service {:?}: {source}",
                    plan.debug_command()
                );
                self.shared.apply(LifecycleEvent::SpawnFailed);
                return Err(SupervisorError::Spawn {
                    command: plan.debug_command(),
                    cwd: plan.cwd,
                    source,
                });
            }
        };

        let handle = ServiceHandle::adopt(
            child,
            generation,
            output,
            self.shared.config.diagnostic_buffer_bytes,
            OUTPUT_TAIL_INTERVAL,
        );
        let pid = handle.pid;
        tracing::info!(pid, detached = handle.detached, "local service spawned");
        *slot = Some(handle);
        drop(slot);

        self.shared.responsible.store(true, Ordering::Release);
        spawn_exit_watcher(Arc::clone(&self.shared), generation);
        if self.shared.config.ready_probe.attempts == 0 {
            self.shared.apply(LifecycleEvent::ReadinessConfirmed);
        } else {
            spawn_readiness_probe(Arc::clone(&self.shared), generation);
        }

        Ok(StartOutcome::Started { pid })
    }

    /// Asks the service to stop over the loopback control channel.
    pub(crate) async fn request_shutdown(&self, trigger: ShutdownTrigger) -> ShutdownOutcome {
        let _gate = self.shutdown_gate.lock().await;

        if trigger.is_lifecycle() {
            if !self.is_responsible() {
                tracing::debug!(
                    trigger = trigger.as_str(),
                    "shutdown skipped: no locally launched service"
                );
                return ShutdownOutcome::Skipped;
            }
            if self.lifecycle() == ServiceLifecycle::ShuttingDown {
                tracing::debug!(
                    trigger = trigger.as_str(),
                    "shutdown skipped: already shutting down"
                );
                return ShutdownOutcome::Skipped;
            }
        }

        tracing::info!(trigger = trigger.as_str(), "shutting down local service");
        self.shared.apply(LifecycleEvent::ShutdownRequested);

        let response = shutdown_http::send_shutdown_request(
            &self.http,
            &self.shared.config.shutdown_url,
            self.shared.config.shutdown_timeout,
        )
        .await;

        let outcome = match response {
            ShutdownResponse::Acknowledged => {
                tracing::info!("local service acknowledged shutdown");
                ShutdownOutcome::Acknowledged
            }
            ShutdownResponse::NotRunning { detail } => {
                tracing::info!(%detail, "no local service appears to be running");
                ShutdownOutcome::NotRunning
            }
        };

        if self.live_pid().is_none() {
            self.shared.apply(LifecycleEvent::NothingToSupervise);
        }
        outcome
    }

    /// Sends a hangup to a still-live service process. Does not wait.
    pub(crate) fn terminate_handle(&self) -> bool {
        let pid = {
            let mut slot = lock_or_recover(&self.shared.handle, "service handle");
            let Some(handle) = slot.as_mut() else {
                return false;
            };
            match handle.try_exit_status() {
                Ok(None) => handle.pid,
                Ok(Some(_)) => return false,
                Err(error) => {
                    tracing::warn!(pid = handle.pid, "cannot poll service before hangup: {error}");
                    handle.pid
                }
            }
        };

        match process_control::send_hangup(pid) {
            Ok(()) => tracing::info!(pid, "sent hangup to local service"),
            Err(error) => tracing::warn!(pid, "failed to signal local service: {error}"),
        }
        self.shared.apply(LifecycleEvent::ShutdownRequested);
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct WindowCloseCleanup {
    pub(crate) shutdown: ShutdownOutcome,
    pub(crate) hung_up: bool,
}

/// Main window gone: ask the service to stop, then hang up whatever is still live.
pub(crate) async fn close_main_window_cleanup(supervisor: &Supervisor) -> WindowCloseCleanup {
    let shutdown = supervisor.request_shutdown(ShutdownTrigger::WindowClosed).await;
    let hung_up = supervisor.terminate_handle();
    tracing::info!(hung_up, "main window closed, shutdown request: {shutdown:?}");
    WindowCloseCleanup { shutdown, hung_up }
}

/// Quit path: the shutdown request under an outer bound. `None` when the bound expired first.
pub(crate) async fn quit_cleanup(supervisor: &Supervisor, bound: Duration) -> Option<ShutdownOutcome> {
    match tokio::time::timeout(bound, supervisor.request_shutdown(ShutdownTrigger::AppQuit)).await {
        Ok(outcome) => {
            tracing::info!("exit cleanup finished: {outcome:?}");
            Some(outcome)
        }
        Err(_) => {
            tracing::warn!(
                bound_ms = u64::try_from(bound.as_millis()).unwrap_or(u64::MAX),
                "exit cleanup timed out, exiting anyway"
            );
            None
        }
    }
}

fn spawn_exit_watcher(shared: Arc<Shared>, generation: u64) {
    let spawned = thread::Builder::new()
        .name("openbazaard-exit".to_string())
        .spawn(move || watch_for_exit(&shared, generation));
    if let Err(error) = spawned {
        tracing::warn!("failed to start service exit watcher: {error}");
    }
}

fn watch_for_exit(shared: &Shared, generation: u64) {
    loop {
        thread::sleep(shared.config.exit_watch_interval);

        let mut slot = lock_or_recover(&shared.handle, "service handle");
        let Some(handle) = slot.as_mut() else {
            return;
        };
        if handle.generation != generation {
            return;
        }

        let exit = match handle.try_exit_status() {
            Ok(None) => continue,
            Ok(Some(status)) => Ok(status),
            Err(error) => Err(error),
        };
        let Some(mut handle) = slot.take() else {
            return;
        };
        handle.finish_capture();
        match exit {
            Ok(status) => tracing::info!(
                pid = handle.pid,
                exit_code = ?status.code(),
                "local service exited ({status})"
            ),
            Err(error) => tracing::warn!(
                pid = handle.pid,
                "lost track of local service, releasing handle: {error}"
            ),
        }
        let (captured_bytes, dropped_lines) = handle.capture_stats();
        tracing::info!(
            pid = handle.pid,
            captured_bytes,
            dropped_lines,
            stdout = %handle.output.stdout.display(),
            stderr = %handle.output.stderr.display(),
            "captured service output"
        );
        tracing::info!(pid = handle.pid, "service stdout:\n{}", handle.stdout_snapshot());
        tracing::info!(pid = handle.pid, "service stderr:\n{}", handle.stderr_snapshot());
        shared.apply(LifecycleEvent::ProcessExited);
        return;
    }
}

fn spawn_readiness_probe(shared: Arc<Shared>, generation: u64) {
    let spawned = thread::Builder::new()
        .name("openbazaard-ready".to_string())
        .spawn(move || {
            let outcome = service_readiness::wait_until_ready(
                &shared.config.shutdown_url,
                &shared.config.ready_probe,
                || shared.is_generation_live(generation),
            );
            match outcome {
                ReadinessOutcome::Ready { attempts } => {
                    tracing::info!(attempts, "local service is accepting connections");
                    if shared.is_generation_live(generation) {
                        shared.apply(LifecycleEvent::ReadinessConfirmed);
                    }
                }
                ReadinessOutcome::Abandoned => {
                    tracing::debug!("readiness probe abandoned: service handle released");
                }
                ReadinessOutcome::Exhausted { attempts } => {
                    tracing::warn!(
                        attempts,
                        "local service did not accept connections; leaving it in starting state"
                    );
                }
            }
        });
    if let Err(error) = spawned {
        tracing::warn!("failed to start service readiness probe: {error}");
    }
}
