//! Ordered, build-once sequences of pipes.
//!
//! A [`Pipeline`] resolves its pipes into a strictly linear chain of phases:
//! the first pipe is anchored to the supplied root (or to an external
//! dependency phase), every later pipe is anchored to the one before it.
//!
//! ```text
//! anchor ─► pipe₁ ─► pipe₂ ─► … ─► pipeₙ
//! ```

use core::fmt;
use std::sync::Arc;

use cadence_ecs::phase::{Anchor, PhaseId, PhasePrimitive};
use hashbrown::{HashMap, HashSet};

use crate::error::SchedulerError;
use crate::pipe::Pipe;

/// Unique identifier for a pipeline.
///
/// Generated with nanoid, so pipelines declared independently never collide.
/// Clones of a [`Pipeline`] keep its ID and count as the same pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PipelineId(Arc<str>);

impl PipelineId {
    /// Creates a new pipeline ID with a unique nanoid.
    #[must_use]
    pub fn new() -> Self {
        Self(nanoid::nanoid!().into())
    }

    /// Creates a pipeline ID from a specific string value.
    #[must_use]
    pub fn from_string(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for PipelineId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PipelineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pipeline_{}", self.0)
    }
}

/// An ordered list of pipes that resolves to a chain of phases.
///
/// # Example
///
/// ```
/// use cadence_ecs::phase::{Driver, PhaseRuntime};
/// use cadence_schedule::pipe::Pipe;
/// use cadence_schedule::pipeline::Pipeline;
///
/// let mut runtime = PhaseRuntime::new();
/// let mut pipeline = Pipeline::new()
///     .with(Pipe::named("input"))
///     .with(Pipe::named("update"));
///
/// let phases = pipeline
///     .build(&mut runtime, Driver::new("frame"), None, None)
///     .unwrap();
///
/// assert_eq!(phases.len(), 2);
/// assert!(pipeline.is_built());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    id: PipelineId,
    pipes: Vec<Pipe>,
    built: bool,
}

impl Pipeline {
    /// Creates an empty pipeline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a pipe.
    ///
    /// Once the pipeline has been built its sequence is frozen: the call is
    /// logged and the pipe is ignored.
    #[must_use]
    pub fn with(mut self, pipe: impl Into<Pipe>) -> Self {
        let pipe = pipe.into();
        if self.built {
            tracing::warn!(
                pipeline = %self.id,
                pipe = %pipe,
                "pipeline already built, ignoring appended pipe"
            );
            return self;
        }
        self.pipes.push(pipe);
        self
    }

    /// Returns the pipeline's identity.
    #[must_use]
    pub fn id(&self) -> &PipelineId {
        &self.id
    }

    /// Returns the pipes in declaration order.
    #[must_use]
    pub fn pipes(&self) -> &[Pipe] {
        &self.pipes
    }

    /// Returns true once [`build`](Self::build) has succeeded.
    #[must_use]
    pub fn is_built(&self) -> bool {
        self.built
    }

    /// Resolves every pipe to a phase and returns the phases in order.
    ///
    /// The first pipe is anchored to `dependency` when one is given, and to
    /// `anchor` otherwise. When `registry` is given, every pipe name is
    /// checked against it before anything is resolved and recorded into it
    /// afterwards.
    ///
    /// # Errors
    ///
    /// - [`SchedulerError::DuplicatePipe`] if a pipe name is already in
    ///   `registry`, or appears twice in this pipeline while a registry is given
    /// - [`SchedulerError::Phase`] if the primitive rejects a phase
    pub fn build<P: PhasePrimitive + ?Sized>(
        &mut self,
        primitive: &mut P,
        anchor: impl Into<Anchor>,
        registry: Option<&mut HashMap<String, PhaseId>>,
        dependency: Option<PhaseId>,
    ) -> Result<Vec<PhaseId>, SchedulerError> {
        let pipes = self.pipes.clone();

        if let Some(registry) = registry.as_deref() {
            let mut seen = HashSet::with_capacity(pipes.len());
            if let Some(duplicate) = pipes
                .iter()
                .find(|pipe| registry.contains_key(pipe.name()) || !seen.insert(pipe.name()))
            {
                return Err(SchedulerError::DuplicatePipe(duplicate.name().to_owned()));
            }
        }

        let mut anchor = match dependency {
            Some(phase) => Anchor::After(phase),
            None => anchor.into(),
        };
        let mut phases = Vec::with_capacity(pipes.len());
        for pipe in &pipes {
            let phase = primitive.phase(pipe.name(), anchor)?;
            phases.push(phase);
            anchor = Anchor::After(phase);
        }

        if let Some(registry) = registry {
            for (pipe, phase) in pipes.iter().zip(&phases) {
                registry.insert(pipe.name().to_owned(), *phase);
            }
        }

        self.built = true;
        tracing::debug!(pipeline = %self.id, phases = phases.len(), "pipeline built");
        Ok(phases)
    }
}
