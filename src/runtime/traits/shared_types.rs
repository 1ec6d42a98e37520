// ABOUTME: Shared types used across runtime trait definitions.
// ABOUTME: Inspection results, listing rows, build specs, failures, and attached processes.

use crate::sink::LogSink;
use crate::types::{ContainerId, ImageId};
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use super::logs::LogError;

/// Result of inspecting a single container.
#[derive(Debug, Clone)]
pub struct ContainerDetails {
    pub id: ContainerId,
    pub name: String,
    pub image_id: ImageId,
    pub running: bool,
    /// `None` when the container was created but never started.
    pub started_at: Option<DateTime<Utc>>,
    pub exit_code: i64,
    pub labels: HashMap<String, String>,
    pub ip_addresses: Vec<String>,
}

/// One row of a project-wide container listing.
#[derive(Debug, Clone)]
pub struct ContainerRow {
    pub id: ContainerId,
    pub name: String,
    pub labels: HashMap<String, String>,
    pub running: bool,
}

impl ContainerRow {
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}

/// Image build inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSpec {
    pub context: PathBuf,
    pub args: BTreeMap<String, String>,
}

/// A runtime CLI invocation that could not be spawned or exited non-zero.
#[derive(Debug, Clone)]
pub struct CommandFailure {
    pub command: String,
    /// `None` when the process never ran or was killed by a signal.
    pub exit_code: Option<i32>,
    /// Combined stdout and stderr.
    pub output: String,
}

impl CommandFailure {
    /// Case-insensitive search in the captured output.
    pub fn mentions(&self, needle: &str) -> bool {
        self.output
            .to_ascii_lowercase()
            .contains(&needle.to_ascii_lowercase())
    }
}

impl fmt::Display for CommandFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.exit_code {
            Some(code) => write!(f, "`{}` exited with {}", self.command, code)?,
            None => write!(f, "`{}` did not run to completion", self.command)?,
        }
        let output = self.output.trim();
        if !output.is_empty() {
            write!(f, ": {output}")?;
        }
        Ok(())
    }
}

impl std::error::Error for CommandFailure {}

/// Where an attached process sends its output.
#[derive(Clone)]
pub struct InstanceOutput {
    pub instance: String,
    pub sink: Arc<dyn LogSink>,
}

impl InstanceOutput {
    pub fn new(instance: impl Into<String>, sink: Arc<dyn LogSink>) -> Self {
        Self {
            instance: instance.into(),
            sink,
        }
    }
}

/// A launched process whose output is being streamed to a log sink.
///
/// Awaiting [`AttachedProcess::wait`] resolves once the process exits and its
/// output has been drained.
#[must_use = "attached processes should be awaited or handed to the execution context"]
pub struct AttachedProcess {
    instance: String,
    exit: BoxFuture<'static, Result<Option<i32>, LogError>>,
}

impl AttachedProcess {
    pub fn new<F>(instance: impl Into<String>, exit: F) -> Self
    where
        F: Future<Output = Result<Option<i32>, LogError>> + Send + 'static,
    {
        Self {
            instance: instance.into(),
            exit: Box::pin(exit),
        }
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    /// Wait for the process to exit, returning its exit code if it has one.
    pub async fn wait(self) -> Result<Option<i32>, LogError> {
        self.exit.await
    }
}

impl fmt::Debug for AttachedProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttachedProcess")
            .field("instance", &self.instance)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_labels_read_as_missing() {
        let mut labels = HashMap::new();
        labels.insert("convoy.color".to_string(), String::new());
        let row = ContainerRow {
            id: ContainerId::new("abc"),
            name: "x".to_string(),
            labels,
            running: true,
        };
        assert_eq!(row.label("convoy.color"), None);
    }

    #[test]
    fn failure_display_includes_output() {
        let failure = CommandFailure {
            command: "docker stop app_web_1".to_string(),
            exit_code: Some(1),
            output: "Error: No such container: app_web_1\n".to_string(),
        };
        let text = failure.to_string();
        assert!(text.contains("exited with 1"));
        assert!(text.contains("No such container"));
        assert!(failure.mentions("no such container"));
    }
}
