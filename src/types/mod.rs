// ABOUTME: Validated domain types shared across the reconciler.
// ABOUTME: Identifiers, image references, service names, colors, and run fingerprints.

mod color;
mod fingerprint;
mod id;
mod image_ref;
mod service_name;

pub use color::{Color, ParseColorError};
pub use fingerprint::RunFingerprint;
pub use id::{ContainerId, ImageId};
pub use image_ref::{ImageRef, ParseImageRefError};
pub use service_name::{ServiceName, ServiceNameError};
