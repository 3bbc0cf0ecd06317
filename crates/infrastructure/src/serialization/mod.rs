//! Deterministic JSON serialization for dashboard and settings files.
//!
//! Output uses 2-space indentation and a trailing newline so saved dashboards
//! diff cleanly.

mod json;

pub use json::*;
