//! Entity-record storage with change notification.
//!
//! The [`RecordStore`] holds typed records ("components") per entity and
//! notifies registered hooks whenever a record is written or removed.
//!
//! # Previous Snapshots
//!
//! Every write that replaces an existing record keeps the replaced value as
//! the *previous snapshot* for that `(entity, kind)` pair. Hooks can compare
//! the current record against it via [`RecordStore::previous`] to tell what
//! changed in the last write.
//!
//! # Notification Order
//!
//! Hooks run after the store has released its internal locks, so a hook may
//! freely read from or write to the store. Hooks for the same record kind run
//! in registration order.
//!
//! # Example
//!
//! ```
//! use cadence_ecs::store::{Component, RecordStore};
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct Health(u32);
//! impl Component for Health {}
//!
//! let store = RecordStore::new();
//! let id = store.spawn();
//!
//! store.set(id, Health(10));
//! store.set(id, Health(7));
//!
//! assert_eq!(store.get::<Health>(id), Some(Health(7)));
//! assert_eq!(store.previous::<Health>(id), Some(Health(10)));
//! ```

use core::any::TypeId;
use std::sync::Arc;

use downcast_rs::{DowncastSync, impl_downcast};
use hashbrown::HashMap;
use parking_lot::RwLock;

use crate::entity::{EntityAllocator, EntityId};

// ─────────────────────────────────────────────────────────────────────────────
// Component
// ─────────────────────────────────────────────────────────────────────────────

/// A record kind that can be stored per entity.
///
/// Records are cloned when read, so they should be small value types.
pub trait Component: Clone + Send + Sync + 'static {
    /// Returns the type name for debugging purposes.
    fn kind_name() -> &'static str {
        core::any::type_name::<Self>()
    }
}

/// Object-safe view of a [`Component`] for heterogeneous storage.
trait ErasedComponent: DowncastSync {}

impl_downcast!(sync ErasedComponent);

impl<C: Component> ErasedComponent for C {}

type Slot = (EntityId, TypeId);

type SetHook = Arc<dyn Fn(&RecordStore, EntityId, &dyn ErasedComponent) + Send + Sync>;

type RemoveHook = Arc<dyn Fn(&RecordStore, EntityId) + Send + Sync>;

// ─────────────────────────────────────────────────────────────────────────────
// RecordStore
// ─────────────────────────────────────────────────────────────────────────────

/// Typed per-entity record storage with write and remove notifications.
///
/// The store uses interior mutability so it can be shared behind an
/// [`Arc`] between the phase runtime (which writes records as systems run)
/// and observers (which read them in response).
#[derive(Default)]
pub struct RecordStore {
    allocator: EntityAllocator,
    /// Current records.
    records: RwLock<HashMap<Slot, Box<dyn ErasedComponent>>>,
    /// Value each record held immediately before its last write.
    previous: RwLock<HashMap<Slot, Box<dyn ErasedComponent>>>,
    names: RwLock<HashMap<EntityId, String>>,
    set_hooks: RwLock<HashMap<TypeId, Vec<SetHook>>>,
    remove_hooks: RwLock<HashMap<TypeId, Vec<RemoveHook>>>,
}

impl RecordStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a fresh entity.
    pub fn spawn(&self) -> EntityId {
        self.allocator.allocate()
    }

    /// Writes a record, snapshotting the replaced value, then fires the
    /// set hooks registered for `C`.
    pub fn set<C: Component>(&self, id: EntityId, value: C) {
        let slot = (id, TypeId::of::<C>());
        let notified = value.clone();
        {
            let mut records = self.records.write();
            if let Some(old) = records.insert(slot, Box::new(value)) {
                self.previous.write().insert(slot, old);
            }
        }
        self.notify_set(id, &notified);
    }

    /// Returns a copy of the current record of kind `C`.
    #[must_use]
    pub fn get<C: Component>(&self, id: EntityId) -> Option<C> {
        self.records
            .read()
            .get(&(id, TypeId::of::<C>()))
            .and_then(|record| record.downcast_ref::<C>())
            .cloned()
    }

    /// Returns the value the record held immediately before its last write.
    ///
    /// `None` until the record has been written at least twice.
    #[must_use]
    pub fn previous<C: Component>(&self, id: EntityId) -> Option<C> {
        self.previous
            .read()
            .get(&(id, TypeId::of::<C>()))
            .and_then(|record| record.downcast_ref::<C>())
            .cloned()
    }

    /// Returns true if the entity has a record of kind `C`.
    #[must_use]
    pub fn contains<C: Component>(&self, id: EntityId) -> bool {
        self.records.read().contains_key(&(id, TypeId::of::<C>()))
    }

    /// Mutates the current record in place without snapshotting and without
    /// firing hooks.
    ///
    /// Returns `false` if the entity has no record of kind `C`.
    pub fn update_silently<C: Component>(&self, id: EntityId, f: impl FnOnce(&mut C)) -> bool {
        let mut records = self.records.write();
        match records
            .get_mut(&(id, TypeId::of::<C>()))
            .and_then(|record| record.downcast_mut::<C>())
        {
            Some(record) => {
                f(record);
                true
            }
            None => false,
        }
    }

    /// Removes the record of kind `C` along with its snapshot, then fires the
    /// remove hooks registered for `C`.
    pub fn remove<C: Component>(&self, id: EntityId) -> Option<C> {
        let kind = TypeId::of::<C>();
        let removed = self.take(id, kind)?;
        self.notify_remove(id, kind);
        removed.downcast::<C>().ok().map(|boxed| *boxed)
    }

    /// Removes every record of the entity and forgets its name.
    ///
    /// Remove hooks fire once per record kind the entity held.
    pub fn despawn(&self, id: EntityId) {
        let kinds: Vec<TypeId> = self
            .records
            .read()
            .keys()
            .filter(|(entity, _)| *entity == id)
            .map(|(_, kind)| *kind)
            .collect();

        self.names.write().remove(&id);

        for kind in kinds {
            if self.take(id, kind).is_some() {
                self.notify_remove(id, kind);
            }
        }
    }

    fn take(&self, id: EntityId, kind: TypeId) -> Option<Box<dyn ErasedComponent>> {
        let removed = self.records.write().remove(&(id, kind));
        self.previous.write().remove(&(id, kind));
        removed
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Naming
    // ─────────────────────────────────────────────────────────────────────────

    /// Assigns a human-readable name to an entity, replacing any previous one.
    pub fn set_name(&self, id: EntityId, name: impl Into<String>) {
        self.names.write().insert(id, name.into());
    }

    /// Returns the entity's name, if it has one.
    #[must_use]
    pub fn name(&self, id: EntityId) -> Option<String> {
        self.names.read().get(&id).cloned()
    }

    /// Finds the entity carrying the given name.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<EntityId> {
        self.names
            .read()
            .iter()
            .find_map(|(id, candidate)| (candidate == name).then_some(*id))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Hooks
    // ─────────────────────────────────────────────────────────────────────────

    /// Registers a hook fired after every write of a `C` record.
    pub fn on_set<C, F>(&self, hook: F)
    where
        C: Component,
        F: Fn(&RecordStore, EntityId, &C) + Send + Sync + 'static,
    {
        let erased: SetHook = Arc::new(move |store, id, record| {
            if let Some(record) = record.downcast_ref::<C>() {
                hook(store, id, record);
            }
        });
        self.set_hooks
            .write()
            .entry(TypeId::of::<C>())
            .or_default()
            .push(erased);
    }

    /// Registers a hook fired after a `C` record is removed.
    pub fn on_remove<C, F>(&self, hook: F)
    where
        C: Component,
        F: Fn(&RecordStore, EntityId) + Send + Sync + 'static,
    {
        self.remove_hooks
            .write()
            .entry(TypeId::of::<C>())
            .or_default()
            .push(Arc::new(hook));
    }

    fn notify_set<C: Component>(&self, id: EntityId, record: &C) {
        // Cloned out so hooks can register further hooks or write records.
        let hooks: Vec<SetHook> = self
            .set_hooks
            .read()
            .get(&TypeId::of::<C>())
            .cloned()
            .unwrap_or_default();
        for hook in hooks {
            hook(self, id, record);
        }
    }

    fn notify_remove(&self, id: EntityId, kind: TypeId) {
        let hooks: Vec<RemoveHook> = self
            .remove_hooks
            .read()
            .get(&kind)
            .cloned()
            .unwrap_or_default();
        for hook in hooks {
            hook(self, id);
        }
    }
}

impl core::fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RecordStore")
            .field("entities", &self.allocator.allocated())
            .field("records", &self.records.read().len())
            .finish_non_exhaustive()
    }
}
