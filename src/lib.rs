// ABOUTME: Library root for convoy - declarative container reconciliation.
// ABOUTME: The main binary is in main.rs.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod execute;
pub mod hooks;
pub mod model;
pub mod reconcile;
pub mod runtime;
pub mod shutdown;
pub mod sink;
pub mod state;
pub mod types;
