// ABOUTME: Reconciliation: per-instance decisions, blue-green swaps, and cleanup.
// ABOUTME: The engine ties collection, decisions, and execution together.

mod cleanup;
mod decision;
mod engine;
mod error;
mod swap;
mod swap_state;

pub use cleanup::derive_cleanup;
pub use decision::{Decision, decide};
pub use engine::Reconciler;
pub use error::ReconcileError;
pub use swap::{Swap, blue_green};
pub use swap_state::{Confirmed, Launched, Planned, Retired};
