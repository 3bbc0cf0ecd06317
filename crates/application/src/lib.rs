//! Stencil Application - Template variable engine
//!
//! This crate holds everything that acts on the domain types: the interpolation
//! engine and its format registry, the per-kind variable adapters, the query
//! runners, the templating store and dependency graph, and the session that
//! coordinates refresh transactions and URL sync. External systems are reached
//! only through the traits in [`ports`].

pub mod adapters;
pub mod error;
pub mod graph;
pub mod ports;
pub mod query_runner;
pub mod session;
pub mod store;
pub mod use_cases;
pub mod variable_resolver;

pub use error::{ApplicationError, ApplicationResult};
pub use session::{InitOptions, SessionPorts, TemplatingSession};
