use crate::handle::TaskHandle;

use serde::Serialize;
use std::panic::Location;
use std::time::Duration;

/// Why an entry left the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RetireReason {
    Completed,
    Cancelled,
    /// Removed through `unregister`, without the cancel hook.
    Unregistered,
    /// Dropped from the pending buffer by `cancel_all` before it ever ran.
    Discarded,
    TornDown,
}

/// Registration facts passed to [`SchedulerObserver::on_registered`].
#[derive(Debug, Clone, Copy)]
pub struct RegisterRecord<'a> {
    pub handle: TaskHandle,
    pub label: &'a str,
    pub registered_at: Duration,
    pub location: &'static Location<'static>,
    /// Landed in the pending buffer because an advance pass was running.
    pub deferred: bool,
}

/// Optional hook for external tooling. Never required for scheduling correctness.
pub trait SchedulerObserver: Send {
    fn on_registered(&mut self, _record: &RegisterRecord<'_>) {}

    fn on_retired(&mut self, _handle: TaskHandle, _reason: RetireReason) {}

    fn on_teardown(&mut self) {}
}
