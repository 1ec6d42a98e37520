// ABOUTME: Container operations trait for container runtimes.
// ABOUTME: Run, create, start, stop, kill, remove, restart, inspect, and list containers.

use super::sealed::Sealed;
use super::shared_types::{CommandFailure, ContainerDetails, ContainerRow};
use crate::types::{ContainerId, ImageId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Container lifecycle operations.
///
/// Lifecycle calls take the container name plus pass-through arguments
/// (`-t 5`, `-f`, `--signal KILL`) that are handed to the runtime verbatim.
#[async_trait]
pub trait ContainerOps: Sealed + Send + Sync {
    /// Inspect a container by name. `Ok(None)` when it does not exist.
    async fn inspect_container(
        &self,
        name: &str,
    ) -> Result<Option<ContainerDetails>, ContainerError>;

    /// Every container, running or not, labelled with the project.
    async fn list_project_containers(
        &self,
        project: &str,
    ) -> Result<Vec<ContainerRow>, ContainerError>;

    /// Launch a detached container from a full run-argument vector.
    async fn run_container(&self, args: &[String]) -> Result<ContainerId, ContainerError>;

    /// Create a container without starting it.
    async fn create_container(&self, args: &[String]) -> Result<ContainerId, ContainerError>;

    async fn start_container(&self, name: &str) -> Result<(), ContainerError>;

    async fn stop_container(&self, name: &str, args: &[String]) -> Result<(), ContainerError>;

    async fn kill_container(&self, name: &str, args: &[String]) -> Result<(), ContainerError>;

    async fn remove_container(&self, name: &str, args: &[String])
    -> Result<(), ContainerError>;

    async fn restart_container(
        &self,
        name: &str,
        args: &[String],
    ) -> Result<(), ContainerError>;

    /// Raw `ps` listing of the project, formatted by the runtime.
    async fn ps(&self, project: &str, args: &[String]) -> Result<String, ContainerError>;

    /// Stream resource usage for the named containers to the terminal until
    /// interrupted.
    async fn stats(&self, names: &[String]) -> Result<(), ContainerError>;

    async fn exists(&self, name: &str) -> Result<bool, ContainerError> {
        Ok(self.inspect_container(name).await?.is_some())
    }

    async fn is_running(&self, name: &str) -> Result<bool, ContainerError> {
        Ok(self
            .inspect_container(name)
            .await?
            .is_some_and(|details| details.running))
    }

    async fn container_image_id(&self, name: &str) -> Result<ImageId, ContainerError> {
        Ok(self.require(name).await?.image_id)
    }

    async fn exit_code(&self, name: &str) -> Result<i64, ContainerError> {
        Ok(self.require(name).await?.exit_code)
    }

    async fn label_value(&self, name: &str, key: &str) -> Result<Option<String>, ContainerError> {
        Ok(self
            .require(name)
            .await?
            .labels
            .get(key)
            .filter(|value| !value.is_empty())
            .cloned())
    }

    /// Whether the container's recorded start time is strictly after `instant`.
    ///
    /// Errors with `NotFound` when the container does not exist yet, and
    /// returns `false` when it exists but has never been started.
    async fn started_after(
        &self,
        name: &str,
        instant: DateTime<Utc>,
    ) -> Result<bool, ContainerError> {
        let details = self.require(name).await?;
        Ok(details.started_at.is_some_and(|started| started > instant))
    }

    async fn ip_addresses(&self, name: &str) -> Result<Vec<String>, ContainerError> {
        Ok(self.require(name).await?.ip_addresses)
    }

    #[doc(hidden)]
    async fn require(&self, name: &str) -> Result<ContainerDetails, ContainerError> {
        self.inspect_container(name)
            .await?
            .ok_or_else(|| ContainerError::NotFound(name.to_string()))
    }
}

/// Errors from container operations.
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    #[error("container not found: {0}")]
    NotFound(String),

    #[error("container already exists: {0}")]
    AlreadyExists(String),

    #[error("container not running: {0}")]
    NotRunning(String),

    #[error("{0}")]
    Command(CommandFailure),

    #[error("runtime error: {0}")]
    Runtime(String),
}
