//! The execution substrate for Cadence (Layer 1).
//!
//! `cadence_ecs` provides the primitives the scheduling layer is built on:
//!
//! - [`entity`] - Entity identifiers and their allocator
//! - [`store`] - The entity-record store with write/remove notifications
//! - [`record`] - Per-system bookkeeping records
//! - [`mod@system`] - System trait and function conversion
//! - [`phase`] - Phases, drivers, anchors and the [`PhaseRuntime`](phase::PhaseRuntime)
//!
//! # Architecture
//!
//! - **Layer 1** (`cadence_ecs`): store, systems and phase runtime (this crate)
//! - **Layer 2** (`cadence_schedule`): pipes, pipelines, lifecycle hooks, scheduler
//! - **Plugins** (`cadence_core_plugins`): tracing and other ambient concerns
//!
//! # Example
//!
//! ```
//! use cadence_ecs::phase::{Anchor, Driver, PhasePrimitive, PhaseRuntime};
//! use cadence_ecs::system::IntoSystem;
//!
//! fn integrate() {}
//!
//! let mut runtime = PhaseRuntime::new();
//! let update = runtime
//!     .phase("update", Anchor::Root(Driver::new("frame")))
//!     .unwrap();
//! runtime.on(update, integrate.into_boxed()).unwrap();
//! runtime.start();
//!
//! assert_eq!(runtime.tick("frame").unwrap(), 1);
//! ```

/// Entity identifiers.
pub mod entity;

/// Phases, drivers and the phase runtime.
pub mod phase;

/// Bookkeeping records written for every scheduled system.
pub mod record;

/// Entity-record storage with change notification.
pub mod store;

/// System execution primitives.
pub mod system;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::entity::*;
    pub use crate::phase::*;
    pub use crate::record::*;
    pub use crate::store::*;
    pub use crate::system::*;
}
