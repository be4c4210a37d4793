//! Logging and run counters for the weekly metrics engine.

pub mod metrics;
pub mod tracing_setup;

pub use metrics::*;
pub use tracing_setup::*;
