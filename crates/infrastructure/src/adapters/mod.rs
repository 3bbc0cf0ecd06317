//! Adapters implementing the session ports outside a browser.

mod memory_location;
mod system_clock;
mod tracing_events;

pub use memory_location::InMemoryLocation;
pub use system_clock::SystemClock;
pub use tracing_events::TracingEvents;
