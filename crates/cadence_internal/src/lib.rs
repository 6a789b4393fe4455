//! # Cadence Internal Library
//!
//! Re-exports the core Cadence crates for convenience.

/// Layer 1: record store, systems and the phase runtime.
pub use cadence_ecs;

/// Layer 2: pipes, pipelines, lifecycle hooks and the scheduler.
pub use cadence_schedule;

/// Infrastructure plugins.
pub use cadence_core_plugins;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use cadence_core_plugins::{TracingFormat, TracingPlugin};
    pub use cadence_ecs::prelude::*;
    pub use cadence_schedule::prelude::*;
}
