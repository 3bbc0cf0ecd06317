//! Application use cases (orchestration around a templating session).

mod load_dashboard;
mod save_dashboard;

pub use load_dashboard::*;
pub use save_dashboard::*;
