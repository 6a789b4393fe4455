//! Scheduling layer for Cadence (Layer 2).
//!
//! `cadence_schedule` turns declarative pipe and pipeline relationships into
//! a chain of anchored phases, attaches systems to them, and reports each
//! system's lifecycle through hooks.
//!
//! - [`pipe`] - Named scheduling positions
//! - [`pipeline`] - Ordered, build-once sequences of pipes
//! - [`hooks`] - Add/Call/Change/Remove lifecycle observers
//! - [`scheduler`] - The fluent [`Scheduler`](scheduler::Scheduler) facade
//! - [`plugin`] - Packaged scheduler configuration
//! - [`error`] - [`SchedulerError`](error::SchedulerError)
//!
//! # Ordering
//!
//! Within one pipeline, phases run in declaration order. A pipe or pipeline
//! built *after* another never starts its tick before the last phase it is
//! chained to has finished.

pub mod error;
pub mod hooks;
pub mod pipe;
pub mod pipeline;
pub mod plugin;
pub mod scheduler;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::error::SchedulerError;
    pub use crate::hooks::{
        LifecycleHooks, LifecycleId, OnSystemAdd, OnSystemCall, OnSystemChange, OnSystemRemove,
        SystemEvent,
    };
    pub use crate::pipe::Pipe;
    pub use crate::pipeline::{Pipeline, PipelineId};
    pub use crate::plugin::Plugin;
    pub use crate::scheduler::{After, KeyedSystem, Registries, Scheduler, SystemRef};
}
