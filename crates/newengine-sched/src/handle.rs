use crate::registry::Scheduler;

use serde::Serialize;
use std::fmt;

/// Lookup key for a registered operation.
///
/// Plain data: copying, storing or comparing a handle never touches the scheduler.
/// A handle silently dangles once its entry is retired; ids are never reused.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TaskHandle {
    id: u64,
}

impl TaskHandle {
    /// Id 0 never refers to an entry.
    pub const INVALID: TaskHandle = TaskHandle { id: 0 };

    #[inline]
    pub(crate) const fn from_id(id: u64) -> Self {
        Self { id }
    }

    #[inline]
    pub const fn id(self) -> u64 {
        self.id
    }

    #[inline]
    pub const fn is_invalid(self) -> bool {
        self.id == 0
    }

    #[inline]
    pub fn is_valid(self, scheduler: &Scheduler) -> bool {
        scheduler.is_valid(self)
    }

    #[inline]
    pub fn is_done(self, scheduler: &Scheduler) -> bool {
        scheduler.is_done(self)
    }

    #[inline]
    pub fn cancel(self, scheduler: &mut Scheduler) -> bool {
        scheduler.cancel(self)
    }
}

impl fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn equality_is_by_id() {
        let a = TaskHandle::from_id(3);
        let b = TaskHandle::from_id(3);
        assert_eq!(a, b);
        assert_ne!(a, TaskHandle::from_id(4));

        let set: HashSet<TaskHandle> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn default_is_invalid() {
        assert!(TaskHandle::default().is_invalid());
        assert_eq!(TaskHandle::INVALID.id(), 0);
        assert_eq!(TaskHandle::from_id(9).to_string(), "task#9");
    }
}
