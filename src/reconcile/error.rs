// ABOUTME: Error types for reconciliation runs.
// ABOUTME: Covers execution failures, aborted blue-green swaps, and state collection.

use crate::execute::ExecError;
use crate::runtime::ContainerError;
use crate::state::StateError;

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Exec(#[from] ExecError),

    /// The replacement never reached Running. It was torn down and the old
    /// container left in place.
    #[error("blue-green replacement {new} for {old} failed: {source}")]
    SwapAborted {
        old: String,
        new: String,
        #[source]
        source: ExecError,
    },

    #[error(transparent)]
    State(#[from] StateError),
}

impl From<ContainerError> for ReconcileError {
    fn from(err: ContainerError) -> Self {
        ReconcileError::Exec(err.into())
    }
}
