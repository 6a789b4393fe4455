//! Named execution phases, ordered pipelines and observable systems.
//!
//! ```
//! use cadence::prelude::*;
//!
//! fn simulate(ctx: &TickContext<'_>) {
//!     tracing::trace!(frame = ctx.frame(), "simulating");
//! }
//!
//! let mut pipeline = Pipeline::new().with("input").with("simulate");
//! let render = Pipe::named("render");
//!
//! let mut scheduler = Scheduler::new();
//! scheduler
//!     .with_pipeline(&mut pipeline, Driver::new("frame"))?
//!     .with_pipe_after(&render, &pipeline)?
//!     .with_system(simulate, &Pipe::named("simulate"))?
//!     .start();
//!
//! scheduler.tick("frame")?;
//! # Ok::<(), SchedulerError>(())
//! ```

pub use cadence_internal::*;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use cadence_internal::prelude::*;
}
