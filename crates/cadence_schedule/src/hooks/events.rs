//! Events delivered to lifecycle observers.

use cadence_ecs::entity::EntityId;
use cadence_ecs::record::SystemRecord;

use super::lifecycle::{LifecycleId, OnSystemAdd, OnSystemCall, OnSystemChange, OnSystemRemove};

/// A lifecycle transition of one scheduled system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemEvent {
    /// The system's record was written for the first time.
    Added {
        /// The system's entity.
        system: EntityId,
        /// The record as written.
        record: SystemRecord,
    },
    /// The system's record was rewritten.
    Changed {
        /// The system's entity.
        system: EntityId,
        /// The record as written.
        record: SystemRecord,
        /// The record before this write.
        previous: SystemRecord,
    },
    /// The system's body ran.
    Called {
        /// The system's entity.
        system: EntityId,
        /// The record as written.
        record: SystemRecord,
        /// The record before this write.
        previous: SystemRecord,
    },
    /// The system's record was removed.
    Removed {
        /// The system's entity.
        system: EntityId,
    },
}

impl SystemEvent {
    /// Returns the system the event is about.
    #[must_use]
    pub fn system(&self) -> EntityId {
        match self {
            SystemEvent::Added { system, .. }
            | SystemEvent::Changed { system, .. }
            | SystemEvent::Called { system, .. }
            | SystemEvent::Removed { system } => *system,
        }
    }

    /// Returns the lifecycle kind this event is delivered on.
    #[must_use]
    pub fn lifecycle(&self) -> LifecycleId {
        match self {
            SystemEvent::Added { .. } => LifecycleId::of::<OnSystemAdd>(),
            SystemEvent::Changed { .. } => LifecycleId::of::<OnSystemChange>(),
            SystemEvent::Called { .. } => LifecycleId::of::<OnSystemCall>(),
            SystemEvent::Removed { .. } => LifecycleId::of::<OnSystemRemove>(),
        }
    }

    /// Returns a short lowercase label, useful in logs.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            SystemEvent::Added { .. } => "added",
            SystemEvent::Changed { .. } => "changed",
            SystemEvent::Called { .. } => "called",
            SystemEvent::Removed { .. } => "removed",
        }
    }
}
