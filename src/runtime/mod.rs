// ABOUTME: Container runtime access for Docker and Podman.
// ABOUTME: Capability traits, detection, the CLI-driven runtime and an in-memory runtime.

mod cli;
mod detection;
mod error;
mod memory;
pub mod traits;
mod types;

pub use cli::CliRuntime;
pub use detection::{DetectionError, detect_runtime};
pub use error::{RuntimeError, RuntimeErrorKind};
pub use memory::{LaunchFailure, MemoryRuntime, RuntimeCall};
pub use traits::*;
pub use types::{DetectedRuntime, RuntimeType};
