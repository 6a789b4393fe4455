//! In-process phase runtime.
//!
//! [`PhaseRuntime`] owns the phase forest, the registered systems and the
//! per-driver time accumulators. It is single threaded and cooperative: a
//! tick walks the driver's chain depth first and every system runs to
//! completion before the next one starts.

use core::fmt;
use core::time::Duration;
use std::sync::Arc;

use hashbrown::{HashMap, HashSet};

use super::{Anchor, Driver, PhaseError, PhaseId, PhasePrimitive};
use crate::entity::EntityId;
use crate::record::SystemRecord;
use crate::store::RecordStore;
use crate::system::{BoxedSystem, TickContext};

/// Default bound on how many ticks a fixed-interval driver may run per advance.
const DEFAULT_MAX_CATCH_UP: u32 = 8;

struct PhaseNode {
    name: String,
    anchor: Anchor,
    /// Systems in registration order.
    systems: Vec<EntityId>,
    /// Phases anchored after this one, in creation order.
    dependents: Vec<PhaseId>,
}

struct DriverState {
    driver: Driver,
    roots: Vec<PhaseId>,
    accumulated: Duration,
}

struct SystemSlot {
    name: String,
    phase: PhaseId,
    system: BoxedSystem,
}

/// Single-threaded phase runtime.
///
/// # Example
///
/// ```
/// use core::time::Duration;
/// use cadence_ecs::phase::{Anchor, Driver, PhasePrimitive, PhaseRuntime};
/// use cadence_ecs::system::IntoSystem;
///
/// fn step() {}
///
/// let mut runtime = PhaseRuntime::new();
/// let fixed = Driver::every("fixed", Duration::from_millis(10));
/// let physics = runtime.phase("physics", Anchor::Root(fixed)).unwrap();
/// runtime.on(physics, step.into_boxed()).unwrap();
/// runtime.start();
///
/// // 25ms of wall time covers two fixed steps.
/// assert_eq!(runtime.advance(Duration::from_millis(25)).unwrap(), 2);
/// ```
pub struct PhaseRuntime {
    store: Arc<RecordStore>,
    /// Indexed by `PhaseId`.
    phases: Vec<PhaseNode>,
    by_name: HashMap<String, PhaseId>,
    drivers: Vec<DriverState>,
    systems: HashMap<EntityId, SystemSlot>,
    paused: HashSet<String>,
    frame: u64,
    started: bool,
    max_catch_up: u32,
}

impl Default for PhaseRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseRuntime {
    /// Creates a runtime with its own empty record store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            store: Arc::new(RecordStore::new()),
            phases: Vec::new(),
            by_name: HashMap::new(),
            drivers: Vec::new(),
            systems: HashMap::new(),
            paused: HashSet::new(),
            frame: 0,
            started: false,
            max_catch_up: DEFAULT_MAX_CATCH_UP,
        }
    }

    /// Uses the given store instead of a private one.
    #[must_use]
    pub fn with_store(mut self, store: Arc<RecordStore>) -> Self {
        self.store = store;
        self
    }

    /// Sets how many ticks a fixed-interval driver may catch up per advance.
    #[must_use]
    pub fn with_max_catch_up(mut self, max: u32) -> Self {
        self.max_catch_up = max.max(1);
        self
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Introspection
    // ─────────────────────────────────────────────────────────────────────────

    /// Returns the number of the most recently executed frame.
    #[must_use]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Returns the anchor a phase was created with.
    #[must_use]
    pub fn anchor_of(&self, phase: PhaseId) -> Option<&Anchor> {
        self.phases.get(phase.0).map(|node| &node.anchor)
    }

    /// Returns the name of a phase.
    #[must_use]
    pub fn phase_name(&self, phase: PhaseId) -> Option<&str> {
        self.phases.get(phase.0).map(|node| node.name.as_str())
    }

    /// Finds a phase by name.
    #[must_use]
    pub fn phase_id(&self, name: &str) -> Option<PhaseId> {
        self.by_name.get(name).copied()
    }

    /// Returns the number of phases.
    #[must_use]
    pub fn phase_count(&self) -> usize {
        self.phases.len()
    }

    /// Returns the systems registered under a phase, in registration order.
    #[must_use]
    pub fn systems_in(&self, phase: PhaseId) -> &[EntityId] {
        self.phases
            .get(phase.0)
            .map_or(&[], |node| node.systems.as_slice())
    }

    /// Returns the phase a system is registered under.
    #[must_use]
    pub fn phase_of_system(&self, system: EntityId) -> Option<PhaseId> {
        self.systems.get(&system).map(|slot| slot.phase)
    }

    /// Returns true if the named system is currently skipped.
    #[must_use]
    pub fn is_paused(&self, name: &str) -> bool {
        self.paused.contains(name)
    }

    /// Returns the drivers in registration order.
    pub fn drivers(&self) -> impl Iterator<Item = &Driver> {
        self.drivers.iter().map(|state| &state.driver)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Driving
    // ─────────────────────────────────────────────────────────────────────────

    /// Runs one tick of the named driver's chain and returns the number of
    /// systems executed.
    ///
    /// The delta handed to systems is the driver's interval, or zero for
    /// drivers without one.
    ///
    /// # Errors
    ///
    /// - [`PhaseError::NotStarted`] before [`start`](PhasePrimitive::start)
    /// - [`PhaseError::UnknownDriver`] if no phase is rooted at that driver
    pub fn tick(&mut self, driver: &str) -> Result<usize, PhaseError> {
        self.ensure_started()?;
        let index = self
            .drivers
            .iter()
            .position(|state| state.driver.name() == driver)
            .ok_or_else(|| PhaseError::UnknownDriver(driver.to_owned()))?;
        let delta = self.drivers[index].driver.interval().unwrap_or_default();
        Ok(self.tick_driver(index, delta))
    }

    /// Runs one tick of every driver, in driver registration order.
    ///
    /// # Errors
    ///
    /// Returns [`PhaseError::NotStarted`] before [`start`](PhasePrimitive::start).
    pub fn tick_all(&mut self) -> Result<usize, PhaseError> {
        self.ensure_started()?;
        let mut executed = 0;
        for index in 0..self.drivers.len() {
            let delta = self.drivers[index].driver.interval().unwrap_or_default();
            executed += self.tick_driver(index, delta);
        }
        Ok(executed)
    }

    /// Advances every driver by `dt` and runs the ticks that became due.
    ///
    /// Fixed-interval drivers tick once per whole interval accumulated, up to
    /// the configured catch-up bound; time beyond the bound is discarded.
    /// Drivers without an interval tick exactly once with `dt` as delta.
    ///
    /// # Errors
    ///
    /// Returns [`PhaseError::NotStarted`] before [`start`](PhasePrimitive::start).
    pub fn advance(&mut self, dt: Duration) -> Result<usize, PhaseError> {
        self.ensure_started()?;
        let mut executed = 0;

        for index in 0..self.drivers.len() {
            let Some(interval) = self.drivers[index]
                .driver
                .interval()
                .filter(|interval| !interval.is_zero())
            else {
                executed += self.tick_driver(index, dt);
                continue;
            };

            self.drivers[index].accumulated += dt;
            let mut ticks = 0;
            while self.drivers[index].accumulated >= interval {
                if ticks == self.max_catch_up {
                    tracing::warn!(
                        driver = %self.drivers[index].driver.name(),
                        dropped = ?self.drivers[index].accumulated,
                        "driver fell behind, discarding accumulated time"
                    );
                    self.drivers[index].accumulated = Duration::ZERO;
                    break;
                }
                self.drivers[index].accumulated -= interval;
                executed += self.tick_driver(index, interval);
                ticks += 1;
            }
        }

        Ok(executed)
    }

    fn ensure_started(&self) -> Result<(), PhaseError> {
        if self.started {
            Ok(())
        } else {
            Err(PhaseError::NotStarted)
        }
    }

    fn tick_driver(&mut self, index: usize, delta: Duration) -> usize {
        self.frame += 1;
        let frame = self.frame;
        let state = &self.drivers[index];
        let mut executed = 0;

        // Depth first: a phase's systems, then everything anchored after it.
        let mut pending: Vec<PhaseId> = state.roots.iter().rev().copied().collect();
        while let Some(phase) = pending.pop() {
            let node = &self.phases[phase.0];

            for &system in &node.systems {
                let Some(slot) = self.systems.get(&system) else {
                    continue;
                };
                if self.paused.contains(&slot.name) {
                    tracing::trace!(system = %slot.name, frame, "skipping paused system");
                    continue;
                }

                let ctx = TickContext {
                    frame,
                    delta,
                    driver: state.driver.name(),
                    phase: &node.name,
                    system,
                    store: self.store.as_ref(),
                };
                if let Err(error) = slot.system.run(&ctx) {
                    tracing::error!(system = %slot.name, phase = %node.name, %error, "system failed");
                }

                let record = self
                    .store
                    .get::<SystemRecord>(system)
                    .unwrap_or_default();
                self.store.set(system, record.ran_in(frame));
                executed += 1;
            }

            pending.extend(node.dependents.iter().rev().copied());
        }

        tracing::trace!(driver = %state.driver.name(), frame, executed, "tick complete");
        executed
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Registration helpers
    // ─────────────────────────────────────────────────────────────────────────

    fn driver_roots(&mut self, driver: &Driver) -> &mut Vec<PhaseId> {
        let index = match self
            .drivers
            .iter()
            .position(|state| state.driver.name() == driver.name())
        {
            Some(index) => {
                if self.drivers[index].driver != *driver {
                    tracing::warn!(
                        driver = %driver.name(),
                        "driver re-declared with a different interval, keeping the first"
                    );
                }
                index
            }
            None => {
                self.drivers.push(DriverState {
                    driver: driver.clone(),
                    roots: Vec::new(),
                    accumulated: Duration::ZERO,
                });
                self.drivers.len() - 1
            }
        };
        &mut self.drivers[index].roots
    }

    fn unique_name(&self, base: &str) -> String {
        if self.store.lookup(base).is_none() {
            return base.to_owned();
        }
        (2..)
            .map(|n| format!("{base}#{n}"))
            .find(|candidate| self.store.lookup(candidate).is_none())
            .unwrap_or_else(|| base.to_owned())
    }
}

impl PhasePrimitive for PhaseRuntime {
    fn phase(&mut self, name: &str, anchor: Anchor) -> Result<PhaseId, PhaseError> {
        if let Some(&existing) = self.by_name.get(name) {
            let node = &self.phases[existing.0];
            if node.anchor == anchor {
                return Ok(existing);
            }
            return Err(PhaseError::AnchorConflict {
                name: name.to_owned(),
                existing: node.anchor.clone(),
                requested: anchor,
            });
        }

        let id = PhaseId(self.phases.len());
        match &anchor {
            Anchor::After(parent) => self
                .phases
                .get_mut(parent.0)
                .ok_or(PhaseError::UnknownPhase(*parent))?
                .dependents
                .push(id),
            Anchor::Root(driver) => self.driver_roots(driver).push(id),
        }

        tracing::debug!(phase = %name, %id, %anchor, "phase created");
        self.phases.push(PhaseNode {
            name: name.to_owned(),
            anchor,
            systems: Vec::new(),
            dependents: Vec::new(),
        });
        self.by_name.insert(name.to_owned(), id);
        Ok(id)
    }

    fn on(&mut self, phase: PhaseId, system: BoxedSystem) -> Result<EntityId, PhaseError> {
        if phase.0 >= self.phases.len() {
            return Err(PhaseError::UnknownPhase(phase));
        }

        let name = self.unique_name(system.name());
        let id = self.store.spawn();
        self.store.set_name(id, name.as_str());
        self.phases[phase.0].systems.push(id);

        tracing::debug!(system = %name, %phase, entity = %id, "system registered");
        self.systems.insert(
            id,
            SystemSlot {
                name,
                phase,
                system,
            },
        );

        self.store.set(id, SystemRecord::default());
        Ok(id)
    }

    fn pause(&mut self, name: &str) {
        if self.store.lookup(name).is_none() {
            tracing::debug!(system = %name, "pausing a system that is not registered yet");
        }
        self.paused.insert(name.to_owned());
    }

    fn unpause(&mut self, name: &str) {
        self.paused.remove(name);
    }

    fn remove_system(&mut self, system: EntityId) -> bool {
        let Some(slot) = self.systems.remove(&system) else {
            return false;
        };
        if let Some(node) = self.phases.get_mut(slot.phase.0) {
            node.systems.retain(|&id| id != system);
        }
        // The name is free for reuse; a stale pause must not carry over.
        self.paused.remove(&slot.name);
        tracing::debug!(system = %slot.name, "system removed");
        self.store.despawn(system);
        true
    }

    fn start(&mut self) {
        if self.started {
            tracing::debug!("phase runtime already started");
            return;
        }
        self.started = true;
        tracing::info!(
            phases = self.phases.len(),
            systems = self.systems.len(),
            drivers = self.drivers.len(),
            "phase runtime started"
        );
    }

    fn is_started(&self) -> bool {
        self.started
    }

    fn store(&self) -> &Arc<RecordStore> {
        &self.store
    }
}

impl fmt::Debug for PhaseRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhaseRuntime")
            .field("phases", &self.phases.len())
            .field("drivers", &self.drivers.len())
            .field("systems", &self.systems.len())
            .field("frame", &self.frame)
            .field("started", &self.started)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::{IntoSystem, SystemError};
    use std::sync::Mutex;

    fn frame_driver() -> Driver {
        Driver::new("frame")
    }

    fn recorder(log: &Arc<Mutex<Vec<&'static str>>>, tag: &'static str) -> BoxedSystem {
        let log = Arc::clone(log);
        (move || log.lock().unwrap().push(tag)).into_boxed()
    }

    #[test]
    fn phase_resolves_existing_name() {
        let mut runtime = PhaseRuntime::new();
        let a = runtime.phase("a", frame_driver().into()).unwrap();
        let again = runtime.phase("a", frame_driver().into()).unwrap();
        assert_eq!(a, again);
        assert_eq!(runtime.phase_count(), 1);
    }

    #[test]
    fn phase_rejects_reanchoring() {
        let mut runtime = PhaseRuntime::new();
        let a = runtime.phase("a", frame_driver().into()).unwrap();
        runtime.phase("b", Anchor::After(a)).unwrap();

        let err = runtime.phase("b", frame_driver().into()).unwrap_err();
        assert!(matches!(err, PhaseError::AnchorConflict { ref name, .. } if name == "b"));
    }

    #[test]
    fn phase_rejects_unknown_parent() {
        let mut runtime = PhaseRuntime::new();
        let err = runtime.phase("x", Anchor::After(PhaseId::new(3))).unwrap_err();
        assert_eq!(err, PhaseError::UnknownPhase(PhaseId::new(3)));
        assert_eq!(runtime.phase_count(), 0);
    }

    #[test]
    fn on_rejects_unknown_phase() {
        let mut runtime = PhaseRuntime::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let err = runtime.on(PhaseId::new(0), recorder(&log, "x")).unwrap_err();
        assert_eq!(err, PhaseError::UnknownPhase(PhaseId::new(0)));
    }

    #[test]
    fn tick_requires_start() {
        let mut runtime = PhaseRuntime::new();
        runtime.phase("a", frame_driver().into()).unwrap();
        assert_eq!(runtime.tick("frame"), Err(PhaseError::NotStarted));
        runtime.start();
        assert_eq!(runtime.tick("frame"), Ok(0));
        assert_eq!(
            runtime.tick("missing"),
            Err(PhaseError::UnknownDriver("missing".into()))
        );
    }

    #[test]
    fn tick_walks_chain_depth_first() {
        let mut runtime = PhaseRuntime::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let a = runtime.phase("a", frame_driver().into()).unwrap();
        let b = runtime.phase("b", Anchor::After(a)).unwrap();
        let c = runtime.phase("c", Anchor::After(b)).unwrap();
        let side = runtime.phase("side", Anchor::After(a)).unwrap();

        // Registered out of order on purpose.
        runtime.on(c, recorder(&log, "c")).unwrap();
        runtime.on(side, recorder(&log, "side")).unwrap();
        runtime.on(a, recorder(&log, "a1")).unwrap();
        runtime.on(b, recorder(&log, "b")).unwrap();
        runtime.on(a, recorder(&log, "a2")).unwrap();

        runtime.start();
        assert_eq!(runtime.tick("frame").unwrap(), 5);
        assert_eq!(*log.lock().unwrap(), vec!["a1", "a2", "b", "c", "side"]);
    }

    #[test]
    fn executed_systems_get_frame_stamped() {
        let mut runtime = PhaseRuntime::new();
        let a = runtime.phase("a", frame_driver().into()).unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        let id = runtime.on(a, recorder(&log, "a")).unwrap();

        assert_eq!(
            runtime.store().get::<SystemRecord>(id),
            Some(SystemRecord::default())
        );

        runtime.start();
        runtime.tick("frame").unwrap();
        runtime.tick("frame").unwrap();

        let store = runtime.store();
        assert_eq!(store.get::<SystemRecord>(id).map(|r| r.frame), Some(2));
        assert_eq!(store.previous::<SystemRecord>(id).map(|r| r.frame), Some(1));
    }

    #[test]
    fn paused_systems_are_skipped_by_name() {
        let mut runtime = PhaseRuntime::new();
        let a = runtime.phase("a", frame_driver().into()).unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        let id = runtime.on(a, recorder(&log, "a")).unwrap();
        let name = runtime.system_name(id).unwrap();

        runtime.start();
        runtime.pause(&name);
        assert!(runtime.is_paused(&name));
        assert_eq!(runtime.tick("frame").unwrap(), 0);

        runtime.unpause(&name);
        assert_eq!(runtime.tick("frame").unwrap(), 1);
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn duplicate_system_names_get_suffixed() {
        let mut runtime = PhaseRuntime::new();
        let a = runtime.phase("a", frame_driver().into()).unwrap();

        struct Named;
        impl crate::system::System for Named {
            fn run(&self, _ctx: &TickContext<'_>) -> Result<(), SystemError> {
                Ok(())
            }
            fn name(&self) -> &'static str {
                "named"
            }
        }

        let first = runtime.on(a, Named.into_boxed()).unwrap();
        let second = runtime.on(a, Named.into_boxed()).unwrap();
        assert_eq!(runtime.system_name(first).as_deref(), Some("named"));
        assert_eq!(runtime.system_name(second).as_deref(), Some("named#2"));
    }

    #[test]
    fn failing_system_does_not_stop_chain() {
        let mut runtime = PhaseRuntime::new();
        let a = runtime.phase("a", frame_driver().into()).unwrap();
        let b = runtime.phase("b", Anchor::After(a)).unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));

        runtime
            .on(
                a,
                (|| -> Result<(), SystemError> { Err(SystemError::execution("nope")) })
                    .into_boxed(),
            )
            .unwrap();
        runtime.on(b, recorder(&log, "b")).unwrap();

        runtime.start();
        assert_eq!(runtime.tick("frame").unwrap(), 2);
        assert_eq!(*log.lock().unwrap(), vec!["b"]);
    }

    #[test]
    fn advance_accumulates_fixed_steps() {
        let mut runtime = PhaseRuntime::new();
        let fixed = Driver::every("fixed", Duration::from_millis(10));
        let physics = runtime.phase("physics", fixed.into()).unwrap();
        let render = runtime.phase("render", frame_driver().into()).unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        runtime.on(physics, recorder(&log, "physics")).unwrap();
        runtime.on(render, recorder(&log, "render")).unwrap();
        runtime.start();

        assert_eq!(runtime.advance(Duration::from_millis(15)).unwrap(), 2);
        assert_eq!(runtime.advance(Duration::from_millis(5)).unwrap(), 2);
        assert_eq!(runtime.advance(Duration::from_millis(4)).unwrap(), 1);

        let log = log.lock().unwrap();
        assert_eq!(log.iter().filter(|tag| **tag == "physics").count(), 2);
        assert_eq!(log.iter().filter(|tag| **tag == "render").count(), 3);
    }

    #[test]
    fn advance_discards_time_beyond_catch_up_bound() {
        let mut runtime = PhaseRuntime::new().with_max_catch_up(3);
        let fixed = Driver::every("fixed", Duration::from_millis(10));
        let physics = runtime.phase("physics", fixed.into()).unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        runtime.on(physics, recorder(&log, "physics")).unwrap();
        runtime.start();

        assert_eq!(runtime.advance(Duration::from_millis(100)).unwrap(), 3);
        assert_eq!(runtime.advance(Duration::from_millis(9)).unwrap(), 0);
    }

    #[test]
    fn remove_system_despawns_record() {
        let mut runtime = PhaseRuntime::new();
        let a = runtime.phase("a", frame_driver().into()).unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        let id = runtime.on(a, recorder(&log, "a")).unwrap();

        assert!(runtime.remove_system(id));
        assert!(!runtime.remove_system(id));
        assert!(runtime.systems_in(a).is_empty());
        assert!(!runtime.store().contains::<SystemRecord>(id));
        assert_eq!(runtime.system_name(id), None);
    }

    #[test]
    fn removal_drops_pause_so_the_name_starts_fresh() {
        let mut runtime = PhaseRuntime::new();
        let a = runtime.phase("a", frame_driver().into()).unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        let id = runtime.on(a, recorder(&log, "a")).unwrap();
        let name = runtime.system_name(id).unwrap();
        runtime.pause(&name);

        assert!(runtime.remove_system(id));
        assert!(!runtime.is_paused(&name));

        let replacement = runtime.on(a, recorder(&log, "a")).unwrap();
        assert_eq!(runtime.system_name(replacement), Some(name));
        runtime.start();
        runtime.tick("frame").unwrap();
        assert_eq!(log.lock().unwrap().len(), 1);
    }
}
