use serde::Serialize;

/// Lifecycle of the supervised service for one application run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) enum ServiceLifecycle {
    NoService,
    Starting,
    Running,
    ShuttingDown,
    Stopped,
}

impl ServiceLifecycle {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::NoService => "no-service",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::ShuttingDown => "shutting-down",
            Self::Stopped => "stopped",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LifecycleEvent {
    StartRequested,
    ReadinessConfirmed,
    SpawnFailed,
    ShutdownRequested,
    ProcessExited,
    NothingToSupervise,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RejectedTransition {
    pub(crate) from: ServiceLifecycle,
    pub(crate) event: LifecycleEvent,
}

#[derive(Debug)]
pub(crate) struct LifecycleStateMachine {
    current: ServiceLifecycle,
    history: Vec<ServiceLifecycle>,
}

impl Default for LifecycleStateMachine {
    fn default() -> Self {
        Self {
            current: ServiceLifecycle::NoService,
            history: vec![ServiceLifecycle::NoService],
        }
    }
}

impl LifecycleStateMachine {
    pub(crate) fn current(&self) -> ServiceLifecycle {
        self.current
    }

    pub(crate) fn history(&self) -> &[ServiceLifecycle] {
        &self.history
    }

    pub(crate) fn apply(
        &mut self,
        event: LifecycleEvent,
    ) -> Result<ServiceLifecycle, RejectedTransition> {
        use LifecycleEvent as E;
        use ServiceLifecycle as S;

        let next = match (self.current, event) {
            (S::NoService | S::Stopped, E::StartRequested) => S::Starting,
            (S::Starting, E::ReadinessConfirmed) => S::Running,
            (S::Starting, E::SpawnFailed) => S::Stopped,
            (S::Starting | S::Running, E::ShutdownRequested) => S::ShuttingDown,
            (S::Starting | S::Running | S::ShuttingDown, E::ProcessExited) => S::Stopped,
            (S::ShuttingDown, E::NothingToSupervise) => S::Stopped,
            (from, event) => return Err(RejectedTransition { from, event }),
        };

        if next != self.current {
            self.current = next;
            self.history.push(next);
        }
        Ok(next)
    }
}
