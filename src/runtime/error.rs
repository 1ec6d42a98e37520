// ABOUTME: Runtime error types with SNAFU pattern.
// ABOUTME: Unifies detection and connection errors for programmatic handling.

use snafu::Snafu;

use super::detection::DetectionError;
use super::traits::CommandFailure;
use super::types::RuntimeType;

/// Unified runtime error for detection and connection failures.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum RuntimeError {
    #[snafu(display("runtime detection failed: {source}"))]
    Detection { source: DetectionError },

    #[snafu(display("{runtime} is not usable: {source}"))]
    Connection {
        runtime: RuntimeType,
        source: CommandFailure,
    },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeErrorKind {
    /// No container runtime found on the system.
    NoRuntimeFound,
    /// The runtime executable could not be launched at all.
    BinaryUnavailable,
    /// The runtime ran but could not reach its daemon or service.
    ConnectionFailed,
}

impl RuntimeError {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> RuntimeErrorKind {
        match self {
            RuntimeError::Detection {
                source: DetectionError::NoRuntimeFound,
            } => RuntimeErrorKind::NoRuntimeFound,
            RuntimeError::Connection { source, .. } if source.exit_code.is_none() => {
                RuntimeErrorKind::BinaryUnavailable
            }
            RuntimeError::Connection { .. } => RuntimeErrorKind::ConnectionFailed,
        }
    }

    /// Captured runtime output if this is a connection failure.
    pub fn connection_details(&self) -> Option<&str> {
        match self {
            RuntimeError::Connection { source, .. } => Some(source.output.as_str()),
            _ => None,
        }
    }
}

impl From<DetectionError> for RuntimeError {
    fn from(source: DetectionError) -> Self {
        RuntimeError::Detection { source }
    }
}
