//! Tracing and observability plugin.
//!
//! [`TracingPlugin`] installs a `tracing` subscriber when it is added to a
//! scheduler and can log every system lifecycle event.
//!
//! Subscriber installation uses `try_init`, so adding the plugin to several
//! schedulers (or to a process that already installed a subscriber) keeps
//! the first subscriber and is otherwise harmless.

use std::sync::{Arc, Weak};

use cadence_ecs::entity::EntityId;
use cadence_ecs::phase::PhasePrimitive;
use cadence_ecs::store::RecordStore;
use cadence_schedule::error::SchedulerError;
use cadence_schedule::hooks::{
    OnSystemAdd, OnSystemCall, OnSystemChange, OnSystemRemove, SystemEvent,
};
use cadence_schedule::plugin::Plugin;
use cadence_schedule::scheduler::Scheduler;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Name under which the lifecycle observers are registered.
const LIFECYCLE_OBSERVER: &str = "cadence::tracing";

type AllLifecycles = (OnSystemAdd, OnSystemChange, OnSystemCall, OnSystemRemove);

// ─────────────────────────────────────────────────────────────────────────────
// TracingFormat
// ─────────────────────────────────────────────────────────────────────────────

/// Tracing output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingFormat {
    /// Human-readable colored output (default).
    #[default]
    Pretty,
    /// Compact single-line output.
    Compact,
    /// JSON structured output for log aggregation.
    Json,
}

// ─────────────────────────────────────────────────────────────────────────────
// TracingConfig
// ─────────────────────────────────────────────────────────────────────────────

/// Snapshot of a [`TracingPlugin`]'s settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
    /// The configured maximum log level.
    pub level: Level,
    /// The configured output format.
    pub format: TracingFormat,
    /// Target-specific filter directives, if any.
    pub env_filter: Option<String>,
    /// Whether span enter/exit events are emitted.
    pub span_events: bool,
    /// Whether system lifecycle events are logged.
    pub lifecycle_logging: bool,
}

impl TracingConfig {
    /// Builds the filter for this configuration.
    ///
    /// An unparsable directive string falls back to the plain level.
    #[must_use]
    pub fn env_filter(&self) -> EnvFilter {
        match &self.env_filter {
            Some(filter) => {
                EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new(self.level.as_str()))
            }
            None => EnvFilter::new(self.level.as_str()),
        }
    }

    fn fmt_span(&self) -> FmtSpan {
        if self.span_events {
            FmtSpan::ENTER | FmtSpan::EXIT
        } else {
            FmtSpan::NONE
        }
    }

    /// Installs the global subscriber. Returns `false` when one was already
    /// installed.
    fn install(&self) -> bool {
        let registry = tracing_subscriber::registry().with(self.env_filter());
        let span_events = self.fmt_span();

        match self.format {
            TracingFormat::Pretty => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .pretty()
                        .with_span_events(span_events),
                )
                .try_init()
                .is_ok(),
            TracingFormat::Compact => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .compact()
                        .with_span_events(span_events),
                )
                .try_init()
                .is_ok(),
            TracingFormat::Json => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_span_events(span_events),
                )
                .try_init()
                .is_ok(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// TracingPlugin
// ─────────────────────────────────────────────────────────────────────────────

/// Tracing and logging plugin.
///
/// Configures the `tracing` subscriber. With lifecycle logging enabled it
/// also registers one observer on every lifecycle kind. Adds, calls and
/// removals log at `debug`; plain record changes log at `trace`.
///
/// # Configuration Options
///
/// ```
/// use cadence_core_plugins::{TracingFormat, TracingPlugin};
/// use tracing::Level;
///
/// // Development: pretty output with span enter/exit
/// let dev = TracingPlugin::default()
///     .with_level(Level::DEBUG)
///     .with_span_events(true)
///     .with_lifecycle_logging(true);
///
/// // Production: JSON output with per-target levels
/// let prod = TracingPlugin::default()
///     .with_format(TracingFormat::Json)
///     .with_env_filter("cadence_ecs=info,cadence_schedule=warn");
/// ```
#[derive(Debug, Clone)]
pub struct TracingPlugin {
    level: Level,
    format: TracingFormat,
    /// Environment filter (e.g., "cadence_ecs=debug,cadence_schedule=warn").
    env_filter: Option<String>,
    span_events: bool,
    lifecycle_logging: bool,
}

impl Default for TracingPlugin {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: TracingFormat::Pretty,
            env_filter: None,
            span_events: false,
            lifecycle_logging: false,
        }
    }
}

impl TracingPlugin {
    /// Creates a new `TracingPlugin` with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum log level.
    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Sets the output format.
    #[must_use]
    pub fn with_format(mut self, format: TracingFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets a custom environment filter string.
    ///
    /// Format: `target=level,target=level,...`
    #[must_use]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Enables span enter/exit events in output.
    #[must_use]
    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.span_events = enabled;
        self
    }

    /// Logs every system lifecycle event.
    #[must_use]
    pub fn with_lifecycle_logging(mut self, enabled: bool) -> Self {
        self.lifecycle_logging = enabled;
        self
    }

    /// Returns the plugin's settings.
    #[must_use]
    pub fn config(&self) -> TracingConfig {
        TracingConfig {
            level: self.level,
            format: self.format,
            env_filter: self.env_filter.clone(),
            span_events: self.span_events,
            lifecycle_logging: self.lifecycle_logging,
        }
    }
}

impl<P: PhasePrimitive> Plugin<P> for TracingPlugin {
    fn build(&self, scheduler: &mut Scheduler<P>) -> Result<(), SchedulerError> {
        let config = self.config();
        let installed = config.install();

        if config.lifecycle_logging {
            // Weak: the store already owns the hooks through its record hooks.
            let store = Arc::downgrade(scheduler.primitive().store());
            scheduler
                .hooks()
                .register_observer::<AllLifecycles, _>(LIFECYCLE_OBSERVER, move |event: &SystemEvent| {
                    log_event(&store, event);
                });
        }

        tracing::info!(
            level = %config.level,
            format = ?config.format,
            installed,
            lifecycle_logging = config.lifecycle_logging,
            "TracingPlugin initialized"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        LIFECYCLE_OBSERVER
    }
}

fn display_name(store: &Weak<RecordStore>, system: EntityId) -> String {
    store
        .upgrade()
        .and_then(|store| store.name(system))
        .unwrap_or_else(|| system.to_string())
}

fn log_event(store: &Weak<RecordStore>, event: &SystemEvent) {
    let system = event.system();
    let name = display_name(store, system);
    match *event {
        SystemEvent::Added { record, .. } => {
            tracing::debug!(%system, name = %name, frame = record.frame, "system added");
        }
        SystemEvent::Changed {
            record, previous, ..
        } => {
            tracing::trace!(
                %system,
                name = %name,
                frame = record.frame,
                previous = previous.frame,
                "system record changed"
            );
        }
        SystemEvent::Called {
            record, previous, ..
        } => {
            tracing::debug!(
                %system,
                name = %name,
                frame = record.frame,
                previous = previous.frame,
                "system called"
            );
        }
        SystemEvent::Removed { .. } => {
            tracing::debug!(%system, name = %name, "system removed");
        }
    }
}
