// ABOUTME: Errors raised while executing lifecycle actions against the runtime.
// ABOUTME: Wraps runtime and hook failures and adds start-confirmation failures.

use crate::hooks::HookError;
use crate::runtime::{ContainerError, ImageError, LogError};

#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error(transparent)]
    Container(#[from] ContainerError),

    #[error(transparent)]
    Image(#[from] ImageError),

    #[error(transparent)]
    Log(#[from] LogError),

    #[error(transparent)]
    Hook(#[from] HookError),

    #[error("container {name} failed to start")]
    FailedToStart { name: String },

    #[error("container {name} exited with code {code} right after starting")]
    ExitedEarly { name: String, code: i64 },

    #[error("container {name} is not running")]
    NotRunning { name: String },
}
