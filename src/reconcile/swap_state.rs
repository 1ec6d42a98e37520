// ABOUTME: Blue-green swap state marker types for the type state pattern.
// ABOUTME: Retiring the old color is only reachable from Confirmed.

use chrono::{DateTime, Utc};

/// Replacement materialized under the other color, nothing launched yet.
/// Available actions: `launch()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Planned;

/// Replacement launched; not yet known to be running.
/// Available actions: `confirm()`
#[derive(Debug, Clone, Copy)]
pub struct Launched {
    pub(super) launched_at: DateTime<Utc>,
}

/// Replacement confirmed running; the old color still exists.
/// Available actions: `retire()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Confirmed;

/// Old color removed.
/// Available actions: `finish()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Retired;
