// ABOUTME: Shared helper for connecting to the docker or podman client.
// ABOUTME: Detection and the version probe happen once per command.

use convoy::error::Result;
use convoy::runtime::{CliRuntime, RuntimeError, RuntimeType, detect_runtime};

/// Connect to the container runtime on this machine.
///
/// A configured runtime wins; otherwise podman, then docker, is looked up
/// on `PATH`.
pub async fn connect_to_runtime(configured: Option<RuntimeType>) -> Result<CliRuntime> {
    let detected = detect_runtime(configured).map_err(RuntimeError::from)?;
    tracing::debug!(
        runtime = %detected.runtime_type,
        binary = %detected.binary.display(),
        "detected runtime"
    );
    Ok(CliRuntime::connect(detected).await?)
}
