use crate::handle::TaskHandle;

use std::error::Error;
use std::fmt;

/// Scheduler error.
///
/// None of these is fatal for the scheduler itself; each is terminal only for the
/// operation involved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedError {
    /// The scheduler was torn down; the submitted operation has been disposed.
    ShutDown,

    /// The handle no longer refers to a registered entry.
    StaleHandle(TaskHandle),
}

impl fmt::Display for SchedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedError::ShutDown => write!(f, "scheduler is torn down"),
            SchedError::StaleHandle(h) => write!(f, "stale handle: {h}"),
        }
    }
}

impl Error for SchedError {}

pub type SchedResult<T> = Result<T, SchedError>;
