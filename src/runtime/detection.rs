// ABOUTME: Runtime detection on the local system.
// ABOUTME: Honors an explicit runtime, else checks PATH for podman, then docker.

use super::types::{DetectedRuntime, RuntimeType};
use std::ffi::OsStr;
use std::path::PathBuf;

/// Error during runtime detection.
#[derive(Debug, thiserror::Error)]
pub enum DetectionError {
    #[error("no container runtime found (checked PATH for podman and docker)")]
    NoRuntimeFound,
}

/// Detect the container runtime to drive.
///
/// Detection order (when not explicitly configured):
/// 1. `podman` on `PATH`
/// 2. `docker` on `PATH`
///
/// An explicit `configured` runtime always wins, even when its executable is
/// not on `PATH`; the failure then surfaces when the runtime is first used.
pub fn detect_runtime(configured: Option<RuntimeType>) -> Result<DetectedRuntime, DetectionError> {
    let path = std::env::var_os("PATH");

    if let Some(runtime_type) = configured {
        let binary = path
            .as_deref()
            .and_then(|p| find_executable(p, runtime_type.binary_name()))
            .unwrap_or_else(|| PathBuf::from(runtime_type.binary_name()));
        return Ok(DetectedRuntime {
            runtime_type,
            binary,
        });
    }

    let path = path.ok_or(DetectionError::NoRuntimeFound)?;
    [RuntimeType::Podman, RuntimeType::Docker]
        .into_iter()
        .find_map(|runtime_type| {
            find_executable(&path, runtime_type.binary_name()).map(|binary| DetectedRuntime {
                runtime_type,
                binary,
            })
        })
        .ok_or(DetectionError::NoRuntimeFound)
}

fn find_executable(path: &OsStr, name: &str) -> Option<PathBuf> {
    std::env::split_paths(path)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}
