//! Entity identifiers.
//!
//! Every scheduled system is an entity in the [`RecordStore`](crate::store::RecordStore);
//! its [`EntityId`] doubles as the system's runtime identity.

use core::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for an entity in a record store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(u64);

impl EntityId {
    /// Creates an entity ID from a raw value.
    #[must_use]
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub fn index(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity_{}", self.0)
    }
}

/// Shared allocator for entity IDs.
///
/// Clones share the same counter, so every store handle derived from one
/// allocator hands out globally unique IDs without locking.
///
/// # Example
///
/// ```
/// use cadence_ecs::entity::EntityAllocator;
///
/// let allocator = EntityAllocator::new();
/// let a = allocator.allocate();
/// let b = allocator.clone().allocate();
/// assert_ne!(a, b);
/// ```
#[derive(Debug, Clone, Default)]
pub struct EntityAllocator {
    next: Arc<AtomicU64>,
}

impl EntityAllocator {
    /// Creates a new allocator starting at 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates the next unique entity ID.
    pub fn allocate(&self) -> EntityId {
        EntityId(self.next.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the number of IDs handed out so far.
    #[must_use]
    pub fn allocated(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocator_is_monotonic() {
        let allocator = EntityAllocator::new();
        assert_eq!(allocator.allocate(), EntityId::new(0));
        assert_eq!(allocator.allocate(), EntityId::new(1));
        assert_eq!(allocator.allocated(), 2);
    }

    #[test]
    fn clones_share_counter() {
        let allocator = EntityAllocator::new();
        let shared = allocator.clone();
        allocator.allocate();
        assert_eq!(shared.allocate(), EntityId::new(1));
    }

    #[test]
    fn display_format() {
        assert_eq!(EntityId::new(7).to_string(), "entity_7");
    }
}
