//! The scheduler facade.
//!
//! A [`Scheduler`] owns three registries that together describe the
//! execution graph:
//!
//! - built pipes: pipe name to concrete phase
//! - built pipelines: pipeline identity to its ordered phases
//! - system names: callable identity to the display name it was given
//!
//! The registries are writable until [`Scheduler::start`]. Starting moves
//! them into a shared read-only [`Registries`] value; every later
//! registration fails with [`SchedulerError::Started`].
//!
//! Fn items and closures that capture nothing are identified by their type,
//! so passing the same one again is a duplicate and [`SystemRef::of`] finds
//! it. Any other callable is identified by the [`SystemKey`] that
//! [`Scheduler::add_system`] returns.
//!
//! # Example
//!
//! ```
//! use cadence_ecs::phase::Driver;
//! use cadence_schedule::pipe::Pipe;
//! use cadence_schedule::pipeline::Pipeline;
//! use cadence_schedule::scheduler::{After, Scheduler};
//! # use cadence_schedule::error::SchedulerError;
//!
//! fn read_input() {}
//! fn simulate() {}
//! fn render() {}
//!
//! # fn main() -> Result<(), SchedulerError> {
//! let input = Pipe::named("input");
//! let update = Pipe::named("update");
//! let draw = Pipe::named("draw");
//! let mut frame = Pipeline::new().with(input.clone()).with(update.clone());
//!
//! let mut scheduler = Scheduler::new();
//! scheduler
//!     .with_pipeline(&mut frame, Driver::new("frame"))?
//!     .with_pipe_after(&draw, &frame)?
//!     .with_system(read_input, &input)?
//!     .with_systems((simulate,), &update)?
//!     .with_system(render, &draw)?;
//! scheduler.start();
//!
//! assert_eq!(scheduler.tick("frame")?, 3);
//! # Ok(())
//! # }
//! ```

use core::fmt;
use core::time::Duration;
use std::sync::Arc;

use cadence_ecs::entity::EntityId;
use cadence_ecs::phase::{Anchor, PhaseId, PhasePrimitive, PhaseRuntime};
use cadence_ecs::system::{BoxedSystem, IntoSystem, SystemKey};
use hashbrown::{HashMap, HashSet};
use variadics_please::all_tuples;

use crate::error::SchedulerError;
use crate::hooks::LifecycleHooks;
use crate::pipe::Pipe;
use crate::pipeline::{Pipeline, PipelineId};
use crate::plugin::Plugin;

// ─────────────────────────────────────────────────────────────────────────────
// Registries
// ─────────────────────────────────────────────────────────────────────────────

/// A system registered through the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledSystem {
    /// The display name the primitive assigned.
    pub name: String,
    /// The system's entity in the record store.
    pub entity: EntityId,
}

/// The scheduler's view of the execution graph.
#[derive(Debug, Default, Clone)]
pub struct Registries {
    pipes: HashMap<String, PhaseId>,
    pipelines: HashMap<PipelineId, Vec<PhaseId>>,
    systems: HashMap<SystemKey, ScheduledSystem>,
}

impl Registries {
    /// Returns the built pipes by name.
    #[must_use]
    pub fn pipes(&self) -> &HashMap<String, PhaseId> {
        &self.pipes
    }

    /// Returns the built pipelines and their phases.
    #[must_use]
    pub fn pipelines(&self) -> &HashMap<PipelineId, Vec<PhaseId>> {
        &self.pipelines
    }

    /// Returns the registered systems by callable identity.
    #[must_use]
    pub fn systems(&self) -> &HashMap<SystemKey, ScheduledSystem> {
        &self.systems
    }
}

enum RegistryState {
    Open(Registries),
    Frozen(Arc<Registries>),
}

impl RegistryState {
    fn open(&mut self) -> Result<&mut Registries, SchedulerError> {
        match self {
            RegistryState::Open(registries) => Ok(registries),
            RegistryState::Frozen(_) => Err(SchedulerError::Started),
        }
    }

    fn get(&self) -> &Registries {
        match self {
            RegistryState::Open(registries) => registries,
            RegistryState::Frozen(registries) => registries,
        }
    }

    /// Copy-on-write once frozen: snapshots already handed out keep their view.
    fn get_mut(&mut self) -> &mut Registries {
        match self {
            RegistryState::Open(registries) => registries,
            RegistryState::Frozen(registries) => Arc::make_mut(registries),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Argument types
// ─────────────────────────────────────────────────────────────────────────────

/// An already-built pipe or pipeline to chain after.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum After {
    /// Chain after the phase of the named pipe.
    Pipe(String),
    /// Chain after the last phase of the pipeline.
    Pipeline(PipelineId),
}

impl From<&Pipe> for After {
    fn from(pipe: &Pipe) -> Self {
        After::Pipe(pipe.name().to_owned())
    }
}

impl From<&Pipeline> for After {
    fn from(pipeline: &Pipeline) -> Self {
        After::Pipeline(pipeline.id().clone())
    }
}

impl From<&mut Pipeline> for After {
    fn from(pipeline: &mut Pipeline) -> Self {
        After::Pipeline(pipeline.id().clone())
    }
}

/// A system addressed by callable identity or by display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SystemRef {
    /// Resolved through the scheduler's system-name registry.
    Key(SystemKey),
    /// Passed to the primitive unchanged.
    Name(String),
}

impl SystemRef {
    /// Refers to a fn item or capture-free closure by identity.
    ///
    /// Other callables have no type-level identity; address them with the
    /// key returned by [`Scheduler::add_system`].
    #[must_use]
    pub fn of<T: 'static>(system: &T) -> Self {
        SystemRef::Key(SystemKey::of_val(system))
    }
}

impl From<SystemKey> for SystemRef {
    fn from(key: SystemKey) -> Self {
        SystemRef::Key(key)
    }
}

impl From<&str> for SystemRef {
    fn from(name: &str) -> Self {
        SystemRef::Name(name.to_owned())
    }
}

impl From<String> for SystemRef {
    fn from(name: String) -> Self {
        SystemRef::Name(name)
    }
}

impl fmt::Display for SystemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SystemRef::Key(key) => write!(f, "{key}"),
            SystemRef::Name(name) => f.write_str(name),
        }
    }
}

/// A boxed system together with the identity of the callable it came from.
pub struct KeyedSystem {
    key: SystemKey,
    system: BoxedSystem,
}

impl KeyedSystem {
    /// Boxes a system and records its identity.
    pub fn new<M, S: IntoSystem<M>>(system: S) -> Self {
        Self {
            key: system.key(),
            system: system.into_boxed(),
        }
    }

    /// Returns the callable's identity.
    #[must_use]
    pub fn key(&self) -> SystemKey {
        self.key
    }
}

impl fmt::Debug for KeyedSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedSystem")
            .field("key", &self.key)
            .field("name", &self.system.name())
            .finish()
    }
}

/// A list of systems accepted by [`Scheduler::with_systems`].
///
/// Implemented for tuples of up to 16 systems, for `Vec<KeyedSystem>` and for
/// a `Vec` of one system type (e.g. `Vec<fn()>`).
pub trait IntoSystemSet<Marker> {
    /// Converts into keyed systems in declaration order.
    fn into_keyed(self) -> Vec<KeyedSystem>;
}

impl IntoSystemSet<()> for Vec<KeyedSystem> {
    fn into_keyed(self) -> Vec<KeyedSystem> {
        self
    }
}

impl<M, S: IntoSystem<M>> IntoSystemSet<Vec<M>> for Vec<S> {
    fn into_keyed(self) -> Vec<KeyedSystem> {
        self.into_iter().map(KeyedSystem::new).collect()
    }
}

macro_rules! impl_into_system_set_for_tuple {
    ($(($S:ident, $M:ident)),*) => {
        impl<$($M, $S: IntoSystem<$M>),*> IntoSystemSet<($($M,)*)> for ($($S,)*) {
            #[expect(non_snake_case, reason = "tuple fields are bound to their type names")]
            fn into_keyed(self) -> Vec<KeyedSystem> {
                let ($($S,)*) = self;
                vec![$(KeyedSystem::new($S)),*]
            }
        }
    };
}

all_tuples!(impl_into_system_set_for_tuple, 1, 16, S, M);

// ─────────────────────────────────────────────────────────────────────────────
// Scheduler
// ─────────────────────────────────────────────────────────────────────────────

/// Fluent facade for declaring phases and scheduling systems.
///
/// Generic over the [`PhasePrimitive`] it resolves against; defaults to the
/// in-process [`PhaseRuntime`].
pub struct Scheduler<P: PhasePrimitive = PhaseRuntime> {
    primitive: P,
    state: RegistryState,
    hooks: Arc<LifecycleHooks>,
}

impl Scheduler<PhaseRuntime> {
    /// Creates a scheduler backed by a fresh [`PhaseRuntime`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_primitive(PhaseRuntime::new())
    }

    /// Runs one tick of the named driver. See [`PhaseRuntime::tick`].
    ///
    /// # Errors
    ///
    /// Propagates the runtime's [`PhaseError`](cadence_ecs::phase::PhaseError).
    pub fn tick(&mut self, driver: &str) -> Result<usize, SchedulerError> {
        Ok(self.primitive.tick(driver)?)
    }

    /// Ticks every driver once. See [`PhaseRuntime::tick_all`].
    ///
    /// # Errors
    ///
    /// Propagates the runtime's [`PhaseError`](cadence_ecs::phase::PhaseError).
    pub fn tick_all(&mut self) -> Result<usize, SchedulerError> {
        Ok(self.primitive.tick_all()?)
    }

    /// Advances every driver by `dt`. See [`PhaseRuntime::advance`].
    ///
    /// # Errors
    ///
    /// Propagates the runtime's [`PhaseError`](cadence_ecs::phase::PhaseError).
    pub fn advance(&mut self, dt: Duration) -> Result<usize, SchedulerError> {
        Ok(self.primitive.advance(dt)?)
    }
}

impl Default for Scheduler<PhaseRuntime> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: PhasePrimitive> Scheduler<P> {
    /// Creates a scheduler on top of the given primitive and subscribes its
    /// lifecycle hooks to the primitive's record store.
    pub fn with_primitive(primitive: P) -> Self {
        let hooks = Arc::new(LifecycleHooks::new());
        hooks.attach(primitive.store());
        Self {
            primitive,
            state: RegistryState::Open(Registries::default()),
            hooks,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Pipelines and pipes
    // ─────────────────────────────────────────────────────────────────────────

    /// Builds a pipeline rooted at `anchor`.
    ///
    /// # Errors
    ///
    /// - [`SchedulerError::Started`] after [`start`](Self::start)
    /// - [`SchedulerError::DuplicatePipeline`] if the pipeline is already built here
    /// - [`SchedulerError::DuplicatePipe`] if one of its pipes is already built here
    pub fn with_pipeline(
        &mut self,
        pipeline: &mut Pipeline,
        anchor: impl Into<Anchor>,
    ) -> Result<&mut Self, SchedulerError> {
        self.add_pipeline(pipeline, anchor.into(), None)
    }

    /// Builds a pipeline chained after an already-built pipe or pipeline.
    ///
    /// # Errors
    ///
    /// As [`with_pipeline`](Self::with_pipeline), plus
    /// [`SchedulerError::UnbuiltPipe`] or [`SchedulerError::UnbuiltPipeline`]
    /// if `after` has not been built.
    pub fn with_pipeline_after(
        &mut self,
        pipeline: &mut Pipeline,
        after: impl Into<After>,
    ) -> Result<&mut Self, SchedulerError> {
        let dependency = self.resolve_after(after.into())?;
        self.add_pipeline(pipeline, Anchor::After(dependency), Some(dependency))
    }

    /// Builds a single pipe rooted at `anchor`.
    ///
    /// # Errors
    ///
    /// - [`SchedulerError::Started`] after [`start`](Self::start)
    /// - [`SchedulerError::DuplicatePipe`] if the pipe is already built here
    pub fn with_pipe(
        &mut self,
        pipe: &Pipe,
        anchor: impl Into<Anchor>,
    ) -> Result<&mut Self, SchedulerError> {
        self.add_pipe(pipe, anchor.into())
    }

    /// Builds a single pipe chained after an already-built pipe or pipeline.
    ///
    /// # Errors
    ///
    /// As [`with_pipe`](Self::with_pipe), plus [`SchedulerError::UnbuiltPipe`]
    /// or [`SchedulerError::UnbuiltPipeline`] if `after` has not been built.
    pub fn with_pipe_after(
        &mut self,
        pipe: &Pipe,
        after: impl Into<After>,
    ) -> Result<&mut Self, SchedulerError> {
        let dependency = self.resolve_after(after.into())?;
        self.add_pipe(pipe, Anchor::After(dependency))
    }

    fn add_pipeline(
        &mut self,
        pipeline: &mut Pipeline,
        anchor: Anchor,
        dependency: Option<PhaseId>,
    ) -> Result<&mut Self, SchedulerError> {
        let registries = self.state.open()?;
        if registries.pipelines.contains_key(pipeline.id()) {
            return Err(SchedulerError::DuplicatePipeline(pipeline.id().clone()));
        }

        let phases = pipeline.build(
            &mut self.primitive,
            anchor,
            Some(&mut registries.pipes),
            dependency,
        )?;
        registries.pipelines.insert(pipeline.id().clone(), phases);
        Ok(self)
    }

    fn add_pipe(&mut self, pipe: &Pipe, anchor: Anchor) -> Result<&mut Self, SchedulerError> {
        let registries = self.state.open()?;
        if registries.pipes.contains_key(pipe.name()) {
            return Err(SchedulerError::DuplicatePipe(pipe.name().to_owned()));
        }

        let phase = self.primitive.phase(pipe.name(), anchor)?;
        tracing::debug!(%pipe, %phase, "pipe built");
        registries.pipes.insert(pipe.name().to_owned(), phase);
        Ok(self)
    }

    fn resolve_after(&mut self, after: After) -> Result<PhaseId, SchedulerError> {
        let registries = self.state.open()?;
        match after {
            After::Pipe(name) => registries
                .pipes
                .get(&name)
                .copied()
                .ok_or(SchedulerError::UnbuiltPipe(name)),
            After::Pipeline(id) => match registries.pipelines.get(&id) {
                None => Err(SchedulerError::UnbuiltPipeline(id)),
                Some(phases) => phases
                    .last()
                    .copied()
                    .ok_or(SchedulerError::EmptyPipeline(id)),
            },
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Systems
    // ─────────────────────────────────────────────────────────────────────────

    /// Schedules a system under a built pipe.
    ///
    /// # Errors
    ///
    /// - [`SchedulerError::Started`] after [`start`](Self::start)
    /// - [`SchedulerError::DuplicateSystem`] if the callable is already scheduled here
    /// - [`SchedulerError::UnbuiltPipe`] if the pipe has not been built
    pub fn with_system<M>(
        &mut self,
        system: impl IntoSystem<M>,
        pipe: &Pipe,
    ) -> Result<&mut Self, SchedulerError> {
        self.add_system(system, pipe)?;
        Ok(self)
    }

    /// Schedules a system under a built pipe and returns its key.
    ///
    /// The key addresses the registration in [`pause_system`](Self::pause_system),
    /// [`remove_system`](Self::remove_system) and the introspection methods.
    ///
    /// # Errors
    ///
    /// As [`with_system`](Self::with_system).
    pub fn add_system<M>(
        &mut self,
        system: impl IntoSystem<M>,
        pipe: &Pipe,
    ) -> Result<SystemKey, SchedulerError> {
        let key = system.key();
        self.register_system(key, system.into_boxed(), pipe)
    }

    /// Schedules several systems under one pipe, in order.
    ///
    /// Every callable is checked before any is registered, so a duplicate
    /// anywhere in the list leaves the scheduler untouched.
    ///
    /// # Errors
    ///
    /// As [`with_system`](Self::with_system).
    pub fn with_systems<M>(
        &mut self,
        systems: impl IntoSystemSet<M>,
        pipe: &Pipe,
    ) -> Result<&mut Self, SchedulerError> {
        self.add_systems(systems, pipe)?;
        Ok(self)
    }

    /// Schedules several systems under one pipe and returns their keys in
    /// order.
    ///
    /// # Errors
    ///
    /// As [`with_system`](Self::with_system).
    pub fn add_systems<M>(
        &mut self,
        systems: impl IntoSystemSet<M>,
        pipe: &Pipe,
    ) -> Result<Vec<SystemKey>, SchedulerError> {
        let systems = systems.into_keyed();
        {
            let registries = self.state.open()?;
            let mut seen = HashSet::with_capacity(systems.len());
            if let Some(duplicate) = systems.iter().find(|system| {
                registries.systems.contains_key(&system.key) || !seen.insert(system.key)
            }) {
                return Err(SchedulerError::DuplicateSystem(duplicate.key));
            }
            if !registries.pipes.contains_key(pipe.name()) {
                return Err(SchedulerError::UnbuiltPipe(pipe.name().to_owned()));
            }
        }

        systems
            .into_iter()
            .map(|system| self.register_system(system.key, system.system, pipe))
            .collect()
    }

    fn register_system(
        &mut self,
        key: SystemKey,
        system: BoxedSystem,
        pipe: &Pipe,
    ) -> Result<SystemKey, SchedulerError> {
        let registries = self.state.open()?;
        if registries.systems.contains_key(&key) {
            return Err(SchedulerError::DuplicateSystem(key));
        }
        let phase = registries
            .pipes
            .get(pipe.name())
            .copied()
            .ok_or_else(|| SchedulerError::UnbuiltPipe(pipe.name().to_owned()))?;

        let entity = self.primitive.on(phase, system)?;
        let name = self
            .primitive
            .system_name(entity)
            .unwrap_or_else(|| key.type_name().to_owned());

        tracing::debug!(system = %name, %pipe, "system scheduled");
        registries
            .systems
            .insert(key, ScheduledSystem { name, entity });
        Ok(key)
    }

    /// Unschedules a system and removes it from the primitive.
    ///
    /// Allowed after [`start`](Self::start): the frozen registries are copied
    /// on write, so earlier [`frozen_registries`](Self::frozen_registries)
    /// snapshots are unaffected. An unknown key is logged and ignored.
    ///
    /// Returns true if the system was removed.
    pub fn remove_system(&mut self, key: SystemKey) -> bool {
        let Some(scheduled) = self.state.get_mut().systems.remove(&key) else {
            tracing::warn!(system = %key, "system is not scheduled, ignoring removal");
            return false;
        };
        tracing::debug!(system = %scheduled.name, "system unscheduled");
        self.primitive.remove_system(scheduled.entity)
    }

    /// Skips a system on subsequent ticks.
    ///
    /// A callable that was never scheduled here is logged and ignored.
    pub fn pause_system(&mut self, system: impl Into<SystemRef>) -> &mut Self {
        if let Some(name) = self.resolve_name(system.into(), "pause") {
            self.primitive.pause(&name);
        }
        self
    }

    /// Resumes a paused system.
    ///
    /// A callable that was never scheduled here is logged and ignored.
    pub fn unpause_system(&mut self, system: impl Into<SystemRef>) -> &mut Self {
        if let Some(name) = self.resolve_name(system.into(), "unpause") {
            self.primitive.unpause(&name);
        }
        self
    }

    fn resolve_name(&self, system: SystemRef, action: &str) -> Option<String> {
        match system {
            SystemRef::Name(name) => Some(name),
            SystemRef::Key(key) => {
                let name = self
                    .state
                    .get()
                    .systems
                    .get(&key)
                    .map(|scheduled| scheduled.name.clone());
                if name.is_none() {
                    tracing::warn!(system = %key, action, "system is not scheduled, ignoring");
                }
                name
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Freezes the registries and starts the primitive.
    ///
    /// Calling it again logs a warning and changes nothing.
    pub fn start(&mut self) -> &mut Self {
        let RegistryState::Open(registries) = &mut self.state else {
            tracing::warn!("scheduler already started");
            return self;
        };
        let frozen = Arc::new(core::mem::take(registries));
        tracing::info!(
            pipes = frozen.pipes.len(),
            pipelines = frozen.pipelines.len(),
            systems = frozen.systems.len(),
            "scheduler started"
        );
        self.state = RegistryState::Frozen(frozen);
        self.primitive.start();
        self
    }

    /// Returns true once [`start`](Self::start) has been called.
    #[must_use]
    pub fn is_started(&self) -> bool {
        matches!(self.state, RegistryState::Frozen(_))
    }

    /// Builds a plugin into this scheduler.
    ///
    /// # Errors
    ///
    /// - [`SchedulerError::Started`] after [`start`](Self::start)
    /// - whatever the plugin's build returns
    pub fn add_plugin<T: Plugin<P>>(&mut self, plugin: T) -> Result<&mut Self, SchedulerError> {
        self.state.open()?;
        tracing::debug!(plugin = plugin.name(), "building plugin");
        plugin.build(self)?;
        Ok(self)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Introspection
    // ─────────────────────────────────────────────────────────────────────────

    /// Returns the registries.
    #[must_use]
    pub fn registries(&self) -> &Registries {
        self.state.get()
    }

    /// Returns the frozen registries, once started.
    #[must_use]
    pub fn frozen_registries(&self) -> Option<Arc<Registries>> {
        match &self.state {
            RegistryState::Open(_) => None,
            RegistryState::Frozen(registries) => Some(Arc::clone(registries)),
        }
    }

    /// Returns the phase a pipe was built into.
    #[must_use]
    pub fn phase_of(&self, pipe: &Pipe) -> Option<PhaseId> {
        self.state.get().pipes.get(pipe.name()).copied()
    }

    /// Returns the phases a pipeline was built into.
    #[must_use]
    pub fn phases_of(&self, pipeline: &Pipeline) -> Option<&[PhaseId]> {
        self.state
            .get()
            .pipelines
            .get(pipeline.id())
            .map(Vec::as_slice)
    }

    /// Returns the display name of a scheduled callable.
    #[must_use]
    pub fn system_name(&self, key: SystemKey) -> Option<&str> {
        self.state
            .get()
            .systems
            .get(&key)
            .map(|scheduled| scheduled.name.as_str())
    }

    /// Returns the store entity of a scheduled callable.
    #[must_use]
    pub fn system_entity(&self, key: SystemKey) -> Option<EntityId> {
        self.state.get().systems.get(&key).map(|scheduled| scheduled.entity)
    }

    /// Returns the lifecycle hook registry.
    #[must_use]
    pub fn hooks(&self) -> &Arc<LifecycleHooks> {
        &self.hooks
    }

    /// Returns the phase primitive.
    #[must_use]
    pub fn primitive(&self) -> &P {
        &self.primitive
    }

    /// Returns the phase primitive mutably.
    pub fn primitive_mut(&mut self) -> &mut P {
        &mut self.primitive
    }
}

impl<P: PhasePrimitive> fmt::Debug for Scheduler<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registries = self.state.get();
        f.debug_struct("Scheduler")
            .field("started", &self.is_started())
            .field("pipes", &registries.pipes.len())
            .field("pipelines", &registries.pipelines.len())
            .field("systems", &registries.systems.len())
            .finish_non_exhaustive()
    }
}
