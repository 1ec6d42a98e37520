// ABOUTME: Image operations trait for container runtimes.
// ABOUTME: Look up local image IDs, build from a context, and pull from registries.

use super::sealed::Sealed;
use super::shared_types::{BuildSpec, CommandFailure};
use crate::types::{ImageId, ImageRef};
use async_trait::async_trait;

#[async_trait]
pub trait ImageOps: Sealed + Send + Sync {
    /// Local image ID for a reference, `None` when it is not present.
    async fn image_id(&self, reference: &ImageRef) -> Result<Option<ImageId>, ImageError>;

    /// Build `tag` from a build context. Progress goes to the terminal.
    async fn build_image(&self, tag: &ImageRef, build: &BuildSpec) -> Result<(), ImageError>;

    /// Pull an image from its registry. Progress goes to the terminal.
    async fn pull_image(&self, reference: &ImageRef) -> Result<(), ImageError>;
}

/// Errors from image operations.
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("image not found: {0}")]
    NotFound(String),

    #[error("build of {tag} failed: {source}")]
    BuildFailed {
        tag: String,
        #[source]
        source: CommandFailure,
    },

    #[error("pull of {image} failed: {source}")]
    PullFailed {
        image: String,
        #[source]
        source: CommandFailure,
    },

    #[error("{0}")]
    Command(CommandFailure),

    #[error("runtime error: {0}")]
    Runtime(String),
}
