//! Observer registry and the record-driven lifecycle state machine.
//!
//! [`LifecycleHooks`] keeps one append-only observer list per lifecycle kind
//! and translates the store's low-level notifications into
//! [`SystemEvent`]s:
//!
//! | Store notification                   | Events fired                  |
//! |--------------------------------------|-------------------------------|
//! | write, `propagated` unset            | `Added`                       |
//! | write, frame marker unchanged        | `Changed`                     |
//! | write, frame marker changed          | `Changed`, then `Called`      |
//! | remove                               | `Removed`                     |
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use cadence_ecs::record::SystemRecord;
//! use cadence_ecs::store::RecordStore;
//! use cadence_schedule::hooks::{LifecycleHooks, OnSystemAdd, OnSystemRemove, SystemEvent};
//!
//! let store = RecordStore::new();
//! let hooks = Arc::new(LifecycleHooks::new());
//! hooks.attach(&store);
//!
//! hooks.register_observer::<(OnSystemAdd, OnSystemRemove), _>("audit", |event: &SystemEvent| {
//!     tracing::info!(system = %event.system(), "{}", event.label());
//! });
//!
//! let id = store.spawn();
//! store.set(id, SystemRecord::default());
//! store.remove::<SystemRecord>(id);
//! ```

use core::fmt;
use std::sync::Arc;

use cadence_ecs::entity::EntityId;
use cadence_ecs::record::SystemRecord;
use cadence_ecs::store::RecordStore;
use hashbrown::HashMap;
use parking_lot::RwLock;

use super::events::SystemEvent;
use super::lifecycle::{
    IntoLifecycleIds, LifecycleId, OnSystemAdd, OnSystemCall, OnSystemChange, OnSystemRemove,
};

type Observer = Arc<dyn Fn(&SystemEvent) + Send + Sync>;

struct HookEntry {
    /// Human-readable name for debugging and logging.
    name: String,
    observer: Observer,
}

/// Registry of lifecycle observers.
///
/// Observers for one kind run synchronously in registration order. There is
/// no removal and no de-duplication: registering the same name twice adds a
/// second observer.
#[derive(Default)]
pub struct LifecycleHooks {
    hooks: RwLock<HashMap<LifecycleId, Vec<HookEntry>>>,
}

impl LifecycleHooks {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an observer for one or more lifecycle kinds.
    ///
    /// # Type Parameters
    ///
    /// * `K` - A lifecycle marker, or a tuple of them
    /// * `F` - The observer function type (inferred)
    pub fn register_observer<K, F>(&self, name: impl Into<String>, observer: F) -> &Self
    where
        K: IntoLifecycleIds,
        F: Fn(&SystemEvent) + Send + Sync + 'static,
    {
        let lifecycles = K::lifecycle_ids();
        let name = name.into();
        let observer: Observer = Arc::new(observer);

        let mut hooks = self.hooks.write();
        for lifecycle in &lifecycles {
            let hook_name = if lifecycles.len() > 1 {
                format!("{}@{}", name, lifecycle.type_name())
            } else {
                name.clone()
            };
            tracing::debug!(hook = %hook_name, lifecycle = lifecycle.type_name(), "observer registered");
            hooks.entry(*lifecycle).or_default().push(HookEntry {
                name: hook_name,
                observer: Arc::clone(&observer),
            });
        }
        self
    }

    /// Registers an observer for [`OnSystemAdd`].
    pub fn on_add<F>(&self, name: impl Into<String>, observer: F) -> &Self
    where
        F: Fn(EntityId, SystemRecord) + Send + Sync + 'static,
    {
        self.register_observer::<OnSystemAdd, _>(name, move |event: &SystemEvent| {
            if let SystemEvent::Added { system, record } = *event {
                observer(system, record);
            }
        })
    }

    /// Registers an observer for [`OnSystemCall`], receiving the current and
    /// previous record.
    pub fn on_call<F>(&self, name: impl Into<String>, observer: F) -> &Self
    where
        F: Fn(EntityId, SystemRecord, SystemRecord) + Send + Sync + 'static,
    {
        self.register_observer::<OnSystemCall, _>(name, move |event: &SystemEvent| {
            if let SystemEvent::Called {
                system,
                record,
                previous,
            } = *event
            {
                observer(system, record, previous);
            }
        })
    }

    /// Registers an observer for [`OnSystemChange`], receiving the current
    /// and previous record.
    pub fn on_change<F>(&self, name: impl Into<String>, observer: F) -> &Self
    where
        F: Fn(EntityId, SystemRecord, SystemRecord) + Send + Sync + 'static,
    {
        self.register_observer::<OnSystemChange, _>(name, move |event: &SystemEvent| {
            if let SystemEvent::Changed {
                system,
                record,
                previous,
            } = *event
            {
                observer(system, record, previous);
            }
        })
    }

    /// Registers an observer for [`OnSystemRemove`].
    pub fn on_remove<F>(&self, name: impl Into<String>, observer: F) -> &Self
    where
        F: Fn(EntityId) + Send + Sync + 'static,
    {
        self.register_observer::<OnSystemRemove, _>(name, move |event: &SystemEvent| {
            if let SystemEvent::Removed { system } = *event {
                observer(system);
            }
        })
    }

    /// Invokes every observer registered for the event's lifecycle kind.
    pub fn invoke(&self, event: &SystemEvent) {
        // Snapshot so observers may register further observers.
        let observers: Vec<Observer> = self
            .hooks
            .read()
            .get(&event.lifecycle())
            .map(|entries| {
                entries
                    .iter()
                    .map(|entry| Arc::clone(&entry.observer))
                    .collect()
            })
            .unwrap_or_default();

        for observer in observers {
            observer(event);
        }
    }

    /// Returns the number of observers registered for a lifecycle kind.
    #[must_use]
    pub fn hook_count(&self, lifecycle: LifecycleId) -> usize {
        self.hooks.read().get(&lifecycle).map_or(0, Vec::len)
    }

    /// Checks if an observer with the given name exists for a lifecycle kind.
    #[must_use]
    pub fn contains_hook(&self, lifecycle: LifecycleId, name: &str) -> bool {
        self.hooks
            .read()
            .get(&lifecycle)
            .is_some_and(|entries| entries.iter().any(|entry| entry.name == name))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // State machine
    // ─────────────────────────────────────────────────────────────────────────

    /// Subscribes this registry to the store's [`SystemRecord`] notifications.
    pub fn attach(self: &Arc<Self>, store: &RecordStore) {
        let on_write = Arc::clone(self);
        store.on_set::<SystemRecord, _>(move |store, system, record| {
            on_write.handle_write(store, system, record);
        });

        let on_remove = Arc::clone(self);
        store.on_remove::<SystemRecord, _>(move |_, system| {
            on_remove.handle_remove(system);
        });
    }

    /// Handles a write of a system's record.
    pub fn handle_write(&self, store: &RecordStore, system: EntityId, record: &SystemRecord) {
        if !record.propagated {
            self.invoke(&SystemEvent::Added {
                system,
                record: *record,
            });
            store.update_silently::<SystemRecord>(system, |current| current.propagated = true);
            return;
        }

        let Some(previous) = store.previous::<SystemRecord>(system) else {
            tracing::warn!(%system, "previous system record missing, skipping change notification");
            return;
        };

        self.invoke(&SystemEvent::Changed {
            system,
            record: *record,
            previous,
        });
        if record.frame != previous.frame {
            self.invoke(&SystemEvent::Called {
                system,
                record: *record,
                previous,
            });
        }
    }

    /// Handles removal of a system's record.
    pub fn handle_remove(&self, system: EntityId) {
        self.invoke(&SystemEvent::Removed { system });
    }
}

impl fmt::Debug for LifecycleHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hooks = self.hooks.read();
        let mut map = f.debug_map();
        for (lifecycle, entries) in hooks.iter() {
            let names: Vec<&str> = entries.iter().map(|entry| entry.name.as_str()).collect();
            map.entry(&lifecycle.type_name(), &names);
        }
        map.finish()
    }
}
