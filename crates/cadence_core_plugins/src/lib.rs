//! Core infrastructure plugins for Cadence.
//!
//! - [`TracingPlugin`] - Logging and observability via the `tracing` crate
//!
//! # Example
//!
//! ```
//! use cadence_core_plugins::{TracingFormat, TracingPlugin};
//! use cadence_schedule::scheduler::Scheduler;
//! use tracing::Level;
//!
//! let mut scheduler = Scheduler::new();
//! scheduler
//!     .add_plugin(
//!         TracingPlugin::default()
//!             .with_level(Level::DEBUG)
//!             .with_format(TracingFormat::Compact)
//!             .with_lifecycle_logging(true),
//!     )
//!     .unwrap();
//! ```

mod tracing_plugin;

pub use tracing_plugin::{TracingConfig, TracingFormat, TracingPlugin};
