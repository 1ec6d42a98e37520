// ABOUTME: Label keys written on every container convoy launches.
// ABOUTME: Labels are the only record of what convoy created and how.

pub const PROJECT: &str = "convoy.project";
/// Project-qualified service name, e.g. `shop_web`.
pub const SERVICE: &str = "convoy.service";
/// Declared service name, e.g. `web`.
pub const SERVICE_TYPE: &str = "convoy.service-type";
pub const INSTANCE: &str = "convoy.instance";
pub const COLOR: &str = "convoy.color";
pub const FINGERPRINT: &str = "convoy.fingerprint";
