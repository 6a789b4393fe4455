//! Lifecycle hooks for scheduled systems.
//!
//! Every scheduled system owns a [`SystemRecord`](cadence_ecs::record::SystemRecord)
//! in the record store. The hooks in this module watch writes and removals of
//! that record and report them as four lifecycle kinds: a system was added,
//! ran, had its record changed, or was removed.
//!
//! # Architecture
//!
//! - **Lifecycle markers** ([`lifecycle`]): Empty types that identify hook points
//! - **Events** ([`events`]): `SystemEvent` enum carrying the data to observers
//! - **API** ([`api`]): Registration, invocation and the state machine
//!
//! # Change vs Call
//!
//! Every record write after the first is a change. Only writes that carry a
//! new frame marker are also calls. Observers that care about execution
//! should listen to [`OnSystemCall`]; [`OnSystemChange`] also fires on plain
//! metadata rewrites.

pub mod api;
pub mod events;
pub mod lifecycle;

pub use api::LifecycleHooks;
pub use events::SystemEvent;
pub use lifecycle::{
    IntoLifecycleIds, Lifecycle, LifecycleId, OnSystemAdd, OnSystemCall, OnSystemChange,
    OnSystemRemove,
};
