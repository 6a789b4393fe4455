//! System execution primitives.
//!
//! A system is a callback the phase runtime invokes once per tick of the
//! phase it is registered under. Systems run synchronously and to completion;
//! a system that returns an error is logged and the chain continues.
//!
//! # Example
//!
//! Plain functions and closures become systems through [`IntoSystem`]:
//!
//! ```
//! use cadence_ecs::system::{IntoSystem, System, SystemError, TickContext};
//!
//! fn spawn_wave() {}
//!
//! fn integrate(ctx: &TickContext<'_>) -> Result<(), SystemError> {
//!     if ctx.delta().is_zero() {
//!         return Err(SystemError::execution("no time elapsed"));
//!     }
//!     Ok(())
//! }
//!
//! let a = spawn_wave.into_system();
//! let b = integrate.into_system();
//! assert!(a.name().contains("spawn_wave"));
//! assert!(b.name().contains("integrate"));
//! ```
//!
//! # Identity
//!
//! A zero-sized callable (a fn item, a closure that captures nothing, a unit
//! struct) is the only value of its type, so its [`SystemKey`] is the type
//! itself and stays stable across calls. Everything else, such as fn pointers,
//! capturing closures or systems carrying state, gets a fresh key every time
//! one is minted; callers keep that key as the handle to the registration.

use core::any::TypeId;
use core::fmt;
use core::marker::PhantomData;
use core::time::Duration;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::entity::EntityId;
use crate::store::RecordStore;

/// Errors a system can report from its body.
#[derive(Debug, thiserror::Error)]
pub enum SystemError {
    /// The system encountered an error during execution.
    #[error("execution error: {0}")]
    Execution(String),
}

impl SystemError {
    /// Creates an execution error from any displayable message.
    pub fn execution(message: impl fmt::Display) -> Self {
        Self::Execution(message.to_string())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// TickContext
// ─────────────────────────────────────────────────────────────────────────────

/// Per-invocation context handed to a running system.
#[derive(Clone, Copy)]
pub struct TickContext<'a> {
    pub(crate) frame: u64,
    pub(crate) delta: Duration,
    pub(crate) driver: &'a str,
    pub(crate) phase: &'a str,
    pub(crate) system: EntityId,
    pub(crate) store: &'a RecordStore,
}

impl<'a> TickContext<'a> {
    /// Creates a context, mainly useful for invoking systems in tests.
    #[must_use]
    pub fn new(store: &'a RecordStore, system: EntityId) -> Self {
        Self {
            frame: 0,
            delta: Duration::ZERO,
            driver: "",
            phase: "",
            system,
            store,
        }
    }

    /// Returns the frame being executed.
    #[must_use]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Returns the time step the driver advanced by for this tick.
    #[must_use]
    pub fn delta(&self) -> Duration {
        self.delta
    }

    /// Returns the name of the driver rooting this tick.
    #[must_use]
    pub fn driver(&self) -> &'a str {
        self.driver
    }

    /// Returns the name of the phase being executed.
    #[must_use]
    pub fn phase(&self) -> &'a str {
        self.phase
    }

    /// Returns the entity of the running system.
    #[must_use]
    pub fn system(&self) -> EntityId {
        self.system
    }

    /// Returns the record store backing the runtime.
    #[must_use]
    pub fn store(&self) -> &'a RecordStore {
        self.store
    }
}

impl fmt::Debug for TickContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TickContext")
            .field("frame", &self.frame)
            .field("delta", &self.delta)
            .field("driver", &self.driver)
            .field("phase", &self.phase)
            .field("system", &self.system)
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// System
// ─────────────────────────────────────────────────────────────────────────────

/// An executable unit scheduled under a phase.
///
/// Most users won't implement `System` directly. Instead, use functions or
/// closures with [`IntoSystem`].
pub trait System: Send + Sync + 'static {
    /// Executes the system for one tick.
    ///
    /// # Errors
    ///
    /// Returns [`SystemError`] if the body fails. The runtime logs the error
    /// and continues with the next system.
    fn run(&self, ctx: &TickContext<'_>) -> Result<(), SystemError>;

    /// Returns the system's name for debugging and tracing.
    fn name(&self) -> &'static str;
}

/// Boxed type-erased system.
pub type BoxedSystem = Box<dyn System>;

/// Return types accepted from system functions.
pub trait SystemOutput {
    /// Normalizes the return value into a result.
    ///
    /// # Errors
    ///
    /// Passes through the error of a failing system.
    fn into_result(self) -> Result<(), SystemError>;
}

impl SystemOutput for () {
    fn into_result(self) -> Result<(), SystemError> {
        Ok(())
    }
}

impl SystemOutput for Result<(), SystemError> {
    fn into_result(self) -> Result<(), SystemError> {
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SystemKey
// ─────────────────────────────────────────────────────────────────────────────

/// Identity of a scheduled callable.
///
/// Zero-sized callables are keyed by their type. Any other callable is keyed
/// by a counter minted with [`SystemKey::unique`], since two values of one
/// type (two `fn()` pointers, two closures from one closure expression) are
/// distinct callables.
///
/// # Example
///
/// ```
/// use cadence_ecs::system::{IntoSystem, SystemKey};
///
/// fn a() {}
/// fn b() {}
///
/// assert_eq!(SystemKey::of_val(&a), SystemKey::of_val(&a));
/// assert_ne!(SystemKey::of_val(&a), SystemKey::of_val(&b));
///
/// let pointer: fn() = a;
/// assert_ne!(IntoSystem::key(&pointer), IntoSystem::key(&pointer));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SystemKey {
    identity: Identity,
    type_name: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Identity {
    Type(TypeId),
    Instance(u64),
}

static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(0);

impl SystemKey {
    /// Returns the key shared by every value of `T`.
    ///
    /// Only identifies a single callable when `T` is zero-sized.
    #[must_use]
    pub fn of<T: 'static>() -> Self {
        Self {
            identity: Identity::Type(TypeId::of::<T>()),
            type_name: core::any::type_name::<T>(),
        }
    }

    /// Returns the type key of the given callable. See [`of`](Self::of).
    #[must_use]
    pub fn of_val<T: 'static>(_value: &T) -> Self {
        Self::of::<T>()
    }

    /// Mints a key no other call returns.
    #[must_use]
    pub fn unique<T: 'static>() -> Self {
        Self {
            identity: Identity::Instance(NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed)),
            type_name: core::any::type_name::<T>(),
        }
    }

    /// Returns the key for a callable about to be registered: its type key
    /// when it is zero-sized, a fresh [`unique`](Self::unique) key otherwise.
    #[must_use]
    pub fn for_callable<T: 'static>(_value: &T) -> Self {
        if size_of::<T>() == 0 {
            Self::of::<T>()
        } else {
            Self::unique::<T>()
        }
    }

    /// Returns true if this key was minted per registration rather than
    /// derived from a type.
    #[must_use]
    pub fn is_unique(&self) -> bool {
        matches!(self.identity, Identity::Instance(_))
    }

    /// Returns the type name for debugging.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Display for SystemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.identity {
            Identity::Type(_) => f.write_str(self.type_name),
            Identity::Instance(n) => write!(f, "{}@{n}", self.type_name),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// IntoSystem
// ─────────────────────────────────────────────────────────────────────────────

/// Converts a type into a [`System`].
///
/// # Marker Types
///
/// The `Marker` type parameter allows multiple implementations for the same
/// callable shape (zero-argument functions, functions taking a
/// [`TickContext`], and ready-made [`System`] values).
pub trait IntoSystem<Marker>: Sized + 'static {
    /// The resulting system type.
    type System: System;

    /// Converts this into a system.
    fn into_system(self) -> Self::System;

    /// Returns the identity of this callable.
    ///
    /// Stable for zero-sized callables; any other value gets a fresh key on
    /// every call. See [`SystemKey::for_callable`].
    fn key(&self) -> SystemKey {
        SystemKey::for_callable(self)
    }

    /// Converts this into a boxed, type-erased system.
    fn into_boxed(self) -> BoxedSystem {
        Box::new(self.into_system())
    }
}

/// Marker for values that already implement [`System`].
pub struct SystemMarker;

impl<S: System> IntoSystem<SystemMarker> for S {
    type System = S;

    fn into_system(self) -> Self::System {
        self
    }
}

/// A system wrapping a plain function or closure.
///
/// Created via [`IntoSystem`].
pub struct FunctionSystem<F, Marker> {
    func: F,
    name: &'static str,
    _marker: PhantomData<fn() -> Marker>,
}

impl<F, Marker> FunctionSystem<F, Marker> {
    /// Creates a new function system with the given name.
    pub fn new(func: F, name: &'static str) -> Self {
        Self {
            func,
            name,
            _marker: PhantomData,
        }
    }
}

/// Marker type for function systems.
pub struct FunctionMarker;

// 0 parameters
impl<F, O> IntoSystem<(FunctionMarker,)> for F
where
    F: Fn() -> O + Send + Sync + 'static,
    O: SystemOutput + 'static,
{
    type System = FunctionSystem<F, (FunctionMarker,)>;

    fn into_system(self) -> Self::System {
        FunctionSystem::new(self, core::any::type_name::<F>())
    }
}

impl<F, O> System for FunctionSystem<F, (FunctionMarker,)>
where
    F: Fn() -> O + Send + Sync + 'static,
    O: SystemOutput + 'static,
{
    fn run(&self, _ctx: &TickContext<'_>) -> Result<(), SystemError> {
        (self.func)().into_result()
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

// 1 parameter: the tick context
impl<F, O> IntoSystem<(FunctionMarker, TickContext<'static>)> for F
where
    F: Fn(&TickContext<'_>) -> O + Send + Sync + 'static,
    O: SystemOutput + 'static,
{
    type System = FunctionSystem<F, (FunctionMarker, TickContext<'static>)>;

    fn into_system(self) -> Self::System {
        FunctionSystem::new(self, core::any::type_name::<F>())
    }
}

impl<F, O> System for FunctionSystem<F, (FunctionMarker, TickContext<'static>)>
where
    F: Fn(&TickContext<'_>) -> O + Send + Sync + 'static,
    O: SystemOutput + 'static,
{
    fn run(&self, ctx: &TickContext<'_>) -> Result<(), SystemError> {
        (self.func)(ctx).into_result()
    }

    fn name(&self) -> &'static str {
        self.name
    }
}
