//! Phases, drivers and anchors.
//!
//! A *phase* is a named slot in an execution chain. Every phase is anchored
//! either to a [`Driver`] (making it a root of a new, independently timed
//! chain) or to another phase (making it run right after that phase, within
//! the same tick).
//!
//! ```text
//! Driver("fixed", 16ms) ─► physics ─► collisions ─► cleanup
//! Driver("frame")       ─► input   ─► render
//! ```
//!
//! The [`PhasePrimitive`] trait is the seam the scheduling layer builds on;
//! [`PhaseRuntime`] is the in-process implementation.

mod runtime;

pub use runtime::PhaseRuntime;

use core::fmt;
use core::time::Duration;
use std::sync::Arc;

use crate::entity::EntityId;
use crate::store::RecordStore;
use crate::system::BoxedSystem;

/// Unique identifier for a phase within one runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PhaseId(pub(crate) usize);

impl PhaseId {
    /// Creates a phase ID from a raw index.
    #[must_use]
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    /// Returns the raw index.
    #[must_use]
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for PhaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "phase_{}", self.0)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Driver
// ─────────────────────────────────────────────────────────────────────────────

/// A root execution driver.
///
/// Drivers are identified by name. A driver with an interval ticks once per
/// elapsed interval when the runtime is advanced; a driver without one ticks
/// once per advance.
///
/// # Example
///
/// ```
/// use core::time::Duration;
/// use cadence_ecs::phase::Driver;
///
/// let frame = Driver::new("frame");
/// let fixed = Driver::every("fixed", Duration::from_millis(16));
///
/// assert_eq!(frame.interval(), None);
/// assert_eq!(fixed.interval(), Some(Duration::from_millis(16)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Driver {
    name: String,
    interval: Option<Duration>,
}

impl Driver {
    /// Creates a driver that ticks once per advance.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            interval: None,
        }
    }

    /// Creates a driver that ticks at a fixed interval.
    #[must_use]
    pub fn every(name: impl Into<String>, interval: Duration) -> Self {
        Self::new(name).with_interval(interval)
    }

    /// Sets the fixed interval.
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Returns the driver's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the fixed interval, if any.
    #[must_use]
    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Anchor
// ─────────────────────────────────────────────────────────────────────────────

/// Where a phase sits in the execution graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Anchor {
    /// Root of a new chain driven by the given driver.
    Root(Driver),
    /// Runs after the given phase, inheriting its driver's cadence.
    After(PhaseId),
}

impl From<Driver> for Anchor {
    fn from(driver: Driver) -> Self {
        Anchor::Root(driver)
    }
}

impl From<&Driver> for Anchor {
    fn from(driver: &Driver) -> Self {
        Anchor::Root(driver.clone())
    }
}

impl From<PhaseId> for Anchor {
    fn from(phase: PhaseId) -> Self {
        Anchor::After(phase)
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Anchor::Root(driver) => write!(f, "driver '{}'", driver.name()),
            Anchor::After(phase) => write!(f, "after {phase}"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// PhaseError
// ─────────────────────────────────────────────────────────────────────────────

/// Errors reported by a phase primitive.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PhaseError {
    /// A referenced phase does not exist.
    #[error("unknown phase: {0}")]
    UnknownPhase(PhaseId),

    /// A phase name was resolved with a different anchor than it was created with.
    #[error("phase '{name}' is anchored {existing}, cannot re-anchor to {requested}")]
    AnchorConflict {
        /// The phase name.
        name: String,
        /// The anchor the phase was created with.
        existing: Anchor,
        /// The anchor that was requested.
        requested: Anchor,
    },

    /// A driver with this name does not exist.
    #[error("unknown driver: '{0}'")]
    UnknownDriver(String),

    /// The runtime was ticked before it was started.
    #[error("phase runtime has not been started")]
    NotStarted,
}

// ─────────────────────────────────────────────────────────────────────────────
// PhasePrimitive
// ─────────────────────────────────────────────────────────────────────────────

/// The operations the scheduling layer needs from a phase implementation.
pub trait PhasePrimitive {
    /// Creates a phase, or resolves it if one with this name already exists
    /// under the same anchor.
    ///
    /// # Errors
    ///
    /// - [`PhaseError::UnknownPhase`] if the anchor refers to a missing phase
    /// - [`PhaseError::AnchorConflict`] if the name exists under another anchor
    fn phase(&mut self, name: &str, anchor: Anchor) -> Result<PhaseId, PhaseError>;

    /// Registers a system under a phase and returns its entity.
    ///
    /// # Errors
    ///
    /// Returns [`PhaseError::UnknownPhase`] if the phase does not exist.
    fn on(&mut self, phase: PhaseId, system: BoxedSystem) -> Result<EntityId, PhaseError>;

    /// Skips the named system on subsequent ticks.
    fn pause(&mut self, name: &str);

    /// Resumes the named system.
    fn unpause(&mut self, name: &str);

    /// Unregisters a system and despawns its entity, dropping any pause on
    /// its name.
    ///
    /// Returns `false` if the system was not registered here.
    fn remove_system(&mut self, system: EntityId) -> bool;

    /// Begins driving phases.
    fn start(&mut self);

    /// Returns true once [`start`](Self::start) has been called.
    fn is_started(&self) -> bool;

    /// Returns the record store the primitive writes system records into.
    fn store(&self) -> &Arc<RecordStore>;

    /// Returns the display name assigned to a registered system.
    fn system_name(&self, system: EntityId) -> Option<String> {
        self.store().name(system)
    }
}
