// ABOUTME: Runtime type definitions for Docker and Podman.
// ABOUTME: Includes the RuntimeType enum and the DetectedRuntime result.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The container runtime type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeType {
    Docker,
    Podman,
}

impl RuntimeType {
    /// Executable name looked up on `PATH`.
    pub fn binary_name(&self) -> &'static str {
        match self {
            RuntimeType::Docker => "docker",
            RuntimeType::Podman => "podman",
        }
    }
}

impl std::fmt::Display for RuntimeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.binary_name())
    }
}

/// Detected runtime information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedRuntime {
    /// The type of runtime detected.
    pub runtime_type: RuntimeType,
    /// Executable to invoke. A bare name when configured but not found on `PATH`.
    pub binary: PathBuf,
}
