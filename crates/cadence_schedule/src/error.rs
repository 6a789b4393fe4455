//! Scheduler error types.

use cadence_ecs::phase::PhaseError;
use cadence_ecs::system::SystemKey;

use crate::pipeline::PipelineId;

/// Errors raised by scheduler and pipeline builder calls.
///
/// Every variant is a programming error: the builder call that returned it
/// has left the scheduler's registries untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchedulerError {
    /// A pipe with this name has already been built on this scheduler.
    #[error("pipe '{0}' is already built")]
    DuplicatePipe(String),

    /// The pipeline has already been built on this scheduler.
    #[error("pipeline {0} is already built")]
    DuplicatePipeline(PipelineId),

    /// The callable is already scheduled on this scheduler.
    #[error("system '{0}' is already registered")]
    DuplicateSystem(SystemKey),

    /// A referenced pipe has not been built yet.
    #[error("pipe '{0}' has not been built")]
    UnbuiltPipe(String),

    /// A referenced pipeline has not been built yet.
    #[error("pipeline {0} has not been built")]
    UnbuiltPipeline(PipelineId),

    /// A pipeline with no pipes was used as an anchor.
    #[error("pipeline {0} has no phases to anchor after")]
    EmptyPipeline(PipelineId),

    /// Registration was attempted after the scheduler started.
    #[error("scheduler has already started, registries are frozen")]
    Started,

    /// The phase primitive rejected the request.
    #[error(transparent)]
    Phase(#[from] PhaseError),
}
