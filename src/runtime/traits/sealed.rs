// ABOUTME: Sealed trait pattern for runtime capability traits.
// ABOUTME: Only the CLI runtime and the in-memory runtime may implement them.

/// Sealed trait to prevent external implementations.
///
/// Methods can be added to the capability traits without breaking callers,
/// because every implementor lives in this crate.
pub trait Sealed {}
