use std::{fmt::Display, path::PathBuf};

use thiserror::Error;

pub(crate) type SupervisorResult<T> = Result<T, SupervisorError>;

#[derive(Debug, Error)]
pub(crate) enum SupervisorError {
    #[error("failed to spawn {command:?} in {cwd}: {source}")]
    Spawn {
        command: Vec<String>,
        cwd: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to signal process {pid}: {reason}")]
    Signal { pid: u32, reason: String },
}

impl SupervisorError {
    pub(crate) fn signal<E: Display>(pid: u32, error: E) -> Self {
        Self::Signal {
            pid,
            reason: error.to_string(),
        }
    }
}
