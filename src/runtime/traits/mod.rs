// ABOUTME: Composable capability traits for container runtimes.
// ABOUTME: Defines ContainerOps, ImageOps, LogOps and the Runtime umbrella.

mod container;
mod image;
mod logs;
pub(crate) mod sealed;
mod shared_types;

pub use container::{ContainerError, ContainerOps};
pub use image::{ImageError, ImageOps};
pub use logs::{LogError, LogOps, LogStream};
pub use shared_types::*;

/// Everything the reconciler needs from a runtime.
pub trait Runtime: ContainerOps + ImageOps + LogOps {}

impl<T: ContainerOps + ImageOps + LogOps> Runtime for T {}
