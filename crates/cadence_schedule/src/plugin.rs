//! Packaged scheduler configuration.
//!
//! A plugin bundles pipes, systems and hook registrations so they can be
//! added to a scheduler in one call.
//!
//! # Example
//!
//! ```
//! use cadence_ecs::phase::{Driver, PhasePrimitive};
//! use cadence_schedule::error::SchedulerError;
//! use cadence_schedule::pipe::Pipe;
//! use cadence_schedule::plugin::Plugin;
//! use cadence_schedule::scheduler::Scheduler;
//!
//! fn autosave() {}
//!
//! struct AutosavePlugin;
//!
//! impl<P: PhasePrimitive> Plugin<P> for AutosavePlugin {
//!     fn build(&self, scheduler: &mut Scheduler<P>) -> Result<(), SchedulerError> {
//!         let pipe = Pipe::named("autosave");
//!         scheduler
//!             .with_pipe(&pipe, Driver::new("background"))?
//!             .with_system(autosave, &pipe)?;
//!         Ok(())
//!     }
//! }
//!
//! let mut scheduler = Scheduler::new();
//! scheduler.add_plugin(AutosavePlugin).unwrap();
//! assert!(scheduler.phase_of(&Pipe::named("autosave")).is_some());
//! ```

use cadence_ecs::phase::{PhasePrimitive, PhaseRuntime};

use crate::error::SchedulerError;
use crate::scheduler::Scheduler;

/// A unit of scheduler configuration.
///
/// Plugins are built immediately by
/// [`Scheduler::add_plugin`](crate::scheduler::Scheduler::add_plugin), which
/// is only allowed before the scheduler starts.
pub trait Plugin<P: PhasePrimitive = PhaseRuntime> {
    /// Registers the plugin's pipes, systems and hooks.
    ///
    /// # Errors
    ///
    /// Returns the first builder error encountered.
    fn build(&self, scheduler: &mut Scheduler<P>) -> Result<(), SchedulerError>;

    /// Returns the plugin's name for logging.
    fn name(&self) -> &'static str {
        core::any::type_name::<Self>()
    }
}
