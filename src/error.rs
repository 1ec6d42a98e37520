// ABOUTME: Application-wide error types for convoy.
// ABOUTME: Uses thiserror for ergonomic error handling.

use crate::reconcile::ReconcileError;
use crate::runtime::RuntimeError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration file not found in {0}")]
    ConfigNotFound(PathBuf),

    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("unknown service: {0}")]
    UnknownService(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}

pub type Result<T> = std::result::Result<T, Error>;
