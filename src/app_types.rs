use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex, MutexGuard,
    },
};

use serde::Serialize;

use crate::{exit_state::ExitStateMachine, launch_plan::LaunchMode, lifecycle_state::ServiceLifecycle};

/// Shell-wide state that exists before the supervisor does.
#[derive(Debug)]
pub(crate) struct ShellState {
    pub(crate) log_dir: PathBuf,
    pub(crate) auto_update_check: bool,
    pub(crate) update_feed_base_url: String,
    exit_state: Mutex<ExitStateMachine>,
}

impl ShellState {
    pub(crate) fn new(log_dir: PathBuf, auto_update_check: bool, update_feed_base_url: String) -> Self {
        Self {
            log_dir,
            auto_update_check,
            update_feed_base_url,
            exit_state: Mutex::new(ExitStateMachine::default()),
        }
    }

    pub(crate) fn mark_quitting(&self) {
        lock_or_recover(&self.exit_state, "exit state").mark_quitting();
    }

    pub(crate) fn is_quitting(&self) -> bool {
        lock_or_recover(&self.exit_state, "exit state").is_quitting()
    }

    pub(crate) fn try_begin_exit_cleanup(&self) -> bool {
        lock_or_recover(&self.exit_state, "exit state").try_begin_cleanup()
    }

    pub(crate) fn allow_next_exit_request(&self) {
        lock_or_recover(&self.exit_state, "exit state").allow_next_exit_request();
    }

    pub(crate) fn take_exit_request_allowance(&self) -> bool {
        lock_or_recover(&self.exit_state, "exit state").take_exit_request_allowance()
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct BridgeResult {
    pub(crate) ok: bool,
    pub(crate) reason: Option<String>,
}

impl BridgeResult {
    pub(crate) fn ok() -> Self {
        Self {
            ok: true,
            reason: None,
        }
    }

    pub(crate) fn ok_with(reason: impl Into<String>) -> Self {
        Self {
            ok: true,
            reason: Some(reason.into()),
        }
    }

    pub(crate) fn failed(reason: impl Into<String>) -> Self {
        Self {
            ok: false,
            reason: Some(reason.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SupervisorStatus {
    pub(crate) lifecycle: ServiceLifecycle,
    pub(crate) launch_mode: LaunchMode,
    pub(crate) pid: Option<u32>,
    pub(crate) responsible: bool,
    pub(crate) spawning: bool,
    pub(crate) history: Vec<ServiceLifecycle>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AppUpdateCheckResult {
    pub(crate) ok: bool,
    pub(crate) reason: Option<String>,
    pub(crate) current_version: String,
    pub(crate) has_update: bool,
    pub(crate) release_name: Option<String>,
    pub(crate) release_notes: Option<String>,
    pub(crate) release_date: Option<String>,
    pub(crate) download_url: Option<String>,
}

#[derive(Debug, Default)]
struct RouteSlot {
    route: Option<String>,
    ui_loaded: bool,
}

/// Route from an `ob:` link that has not reached a loaded UI yet.
#[derive(Debug, Default)]
pub(crate) struct PendingRoute {
    slot: Mutex<RouteSlot>,
}

impl PendingRoute {
    /// Returns the route back when the UI can take it now; otherwise keeps
    /// it, replacing any older pending route.
    pub(crate) fn offer(&self, route: String) -> Option<String> {
        let mut slot = lock_or_recover(&self.slot, "pending route");
        if slot.ui_loaded {
            return Some(route);
        }
        slot.route = Some(route);
        None
    }

    pub(crate) fn mark_ui_loading(&self) {
        lock_or_recover(&self.slot, "pending route").ui_loaded = false;
    }

    /// Marks the UI loaded and hands out the route waiting for it, if any.
    pub(crate) fn mark_ui_loaded(&self) -> Option<String> {
        let mut slot = lock_or_recover(&self.slot, "pending route");
        slot.ui_loaded = true;
        slot.route.take()
    }
}

pub(crate) struct AtomicFlagGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> AtomicFlagGuard<'a> {
    pub(crate) fn try_set(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        Some(Self { flag })
    }
}

impl Drop for AtomicFlagGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

pub(crate) fn lock_or_recover<'a, T>(mutex: &'a Mutex<T>, name: &str) -> MutexGuard<'a, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(error) => {
            tracing::warn!("{name} lock poisoned, recovering");
            error.into_inner()
        }
    }
}
