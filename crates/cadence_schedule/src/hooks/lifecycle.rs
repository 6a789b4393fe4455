//! Lifecycle markers for system hooks.
//!
//! Each marker type names one point in a scheduled system's life. Use them
//! with [`LifecycleId::of`] or with
//! [`register_observer::<OnSystemCall>`](super::LifecycleHooks::register_observer).

use core::any::TypeId;
use variadics_please::all_tuples;

/// Identifier for a lifecycle marker type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LifecycleId {
    type_id: TypeId,
    type_name: &'static str,
}

impl LifecycleId {
    /// Creates the identifier of the given marker type.
    ///
    /// # Example
    ///
    /// ```
    /// use cadence_schedule::hooks::{LifecycleId, OnSystemAdd, OnSystemCall};
    ///
    /// assert_ne!(LifecycleId::of::<OnSystemAdd>(), LifecycleId::of::<OnSystemCall>());
    /// ```
    #[must_use]
    pub fn of<K: 'static>() -> Self {
        Self {
            type_id: TypeId::of::<K>(),
            type_name: core::any::type_name::<K>(),
        }
    }

    /// Returns the underlying `TypeId`.
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the marker's type name for debugging.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

/// Marker trait for lifecycle kinds.
pub trait Lifecycle: 'static {}

/// Fired on the first write of a system's record, i.e. when it is registered.
///
/// Event data: [`SystemEvent::Added`](super::SystemEvent::Added)
pub struct OnSystemAdd;
impl Lifecycle for OnSystemAdd {}

/// Fired when a system's body ran, detected by a new frame marker.
///
/// Event data: [`SystemEvent::Called`](super::SystemEvent::Called)
pub struct OnSystemCall;
impl Lifecycle for OnSystemCall {}

/// Fired on every write of a system's record after the first.
///
/// Event data: [`SystemEvent::Changed`](super::SystemEvent::Changed)
pub struct OnSystemChange;
impl Lifecycle for OnSystemChange {}

/// Fired when a system's record is removed.
///
/// Event data: [`SystemEvent::Removed`](super::SystemEvent::Removed)
pub struct OnSystemRemove;
impl Lifecycle for OnSystemRemove {}

// ─────────────────────────────────────────────────────────────────────────────
// IntoLifecycleIds
// ─────────────────────────────────────────────────────────────────────────────

/// One lifecycle marker, or a tuple of them.
pub trait IntoLifecycleIds {
    /// Returns the identifiers in declaration order.
    fn lifecycle_ids() -> Vec<LifecycleId>;
}

impl<K: Lifecycle> IntoLifecycleIds for K {
    fn lifecycle_ids() -> Vec<LifecycleId> {
        vec![LifecycleId::of::<K>()]
    }
}

macro_rules! impl_into_lifecycle_ids_for_tuple {
    ($($K:ident),*) => {
        impl<$($K: Lifecycle),*> IntoLifecycleIds for ($($K,)*) {
            fn lifecycle_ids() -> Vec<LifecycleId> {
                vec![$(LifecycleId::of::<$K>()),*]
            }
        }
    };
}

all_tuples!(impl_into_lifecycle_ids_for_tuple, 2, 4, K);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_marker_yields_one_id() {
        assert_eq!(
            OnSystemAdd::lifecycle_ids(),
            vec![LifecycleId::of::<OnSystemAdd>()]
        );
    }

    #[test]
    fn tuple_preserves_order() {
        let ids = <(OnSystemChange, OnSystemCall)>::lifecycle_ids();
        assert_eq!(
            ids,
            vec![
                LifecycleId::of::<OnSystemChange>(),
                LifecycleId::of::<OnSystemCall>()
            ]
        );
    }

    #[test]
    fn type_name_names_marker() {
        assert!(LifecycleId::of::<OnSystemRemove>()
            .type_name()
            .contains("OnSystemRemove"));
    }
}
