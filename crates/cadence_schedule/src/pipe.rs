//! Named scheduling positions.

use core::fmt;
use core::panic::Location;

/// A named handle for one logical scheduling position.
///
/// A pipe is only a label until a [`Scheduler`](crate::scheduler::Scheduler)
/// or [`Pipeline`](crate::pipeline::Pipeline) builds it into a concrete phase.
/// Unnamed pipes take the source location they were declared at as their
/// name, so two declarations never collide even though they look the same.
///
/// # Example
///
/// ```
/// use cadence_schedule::pipe::Pipe;
///
/// let input = Pipe::named("input");
/// let a = Pipe::new();
/// let b = Pipe::new();
///
/// assert_eq!(input.name(), "input");
/// assert_ne!(a, b);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Pipe {
    name: String,
}

impl Pipe {
    /// Creates a pipe labelled with the caller's `file:line:column`.
    #[must_use]
    #[track_caller]
    pub fn new() -> Self {
        let location = Location::caller();
        Self {
            name: format!(
                "{}:{}:{}",
                location.file(),
                location.line(),
                location.column()
            ),
        }
    }

    /// Creates a pipe with an explicit name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Returns the pipe's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Default for Pipe {
    #[track_caller]
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Pipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl From<&str> for Pipe {
    fn from(name: &str) -> Self {
        Self::named(name)
    }
}

impl From<String> for Pipe {
    fn from(name: String) -> Self {
        Self::named(name)
    }
}
