//! Bookkeeping records written for every scheduled system.

use crate::store::Component;

/// Execution bookkeeping for one scheduled system.
///
/// The phase runtime writes this record once when the system is registered
/// and again every time the system body runs, stamping `frame` with the
/// frame it ran in. Observers compare `frame` against the previous snapshot
/// to tell an execution apart from a plain metadata write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SystemRecord {
    /// Set once the add notification for this system has fired.
    pub propagated: bool,
    /// Frame in which the system body last ran (0 = never).
    pub frame: u64,
}

impl Component for SystemRecord {}

impl SystemRecord {
    /// Returns a copy stamped with the given frame.
    #[must_use]
    pub fn ran_in(self, frame: u64) -> Self {
        Self { frame, ..self }
    }
}
