// ABOUTME: Execution coordinator: runs lifecycle actions in order with hooks around each.
// ABOUTME: Owns start confirmation and the wait-group for attached processes.

mod context;
mod error;
mod executor;
mod ordering;

pub use context::{ConfirmPolicy, ExecutionContext};
pub use error::ExecError;
pub use executor::Executor;
pub use ordering::{sort_for_teardown, startup_order, teardown_order};
