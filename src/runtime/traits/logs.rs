// ABOUTME: Attached-output operations for container runtimes.
// ABOUTME: Foreground runs, attach, and followed logs streamed to a log sink.

use super::sealed::Sealed;
use super::shared_types::{AttachedProcess, InstanceOutput};
use async_trait::async_trait;

/// Operations whose output is streamed line by line to a log sink.
///
/// Each returns as soon as the process is spawned; the returned
/// [`AttachedProcess`] resolves when it exits.
#[async_trait]
pub trait LogOps: Sealed + Send + Sync {
    /// Run a container in the foreground with stdout and stderr attached.
    /// Signals are not proxied to the container.
    async fn run_attached(
        &self,
        args: &[String],
        output: InstanceOutput,
    ) -> Result<AttachedProcess, LogError>;

    /// Attach to a running container's output.
    async fn attach(&self, name: &str, output: InstanceOutput)
    -> Result<AttachedProcess, LogError>;

    /// Follow a container's logs, starting from the last `tail` lines.
    async fn follow_logs(
        &self,
        name: &str,
        tail: u64,
        output: InstanceOutput,
    ) -> Result<AttachedProcess, LogError>;
}

/// Which standard stream a line of output came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStream {
    Stdout,
    Stderr,
}

/// Errors from log operations.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("container not found: {0}")]
    ContainerNotFound(String),

    #[error("failed to spawn `{command}`: {reason}")]
    Spawn { command: String, reason: String },

    #[error("stream error: {0}")]
    StreamError(String),
}
