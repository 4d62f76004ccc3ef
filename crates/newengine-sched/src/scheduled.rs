use crate::handle::TaskHandle;
use crate::registry::Scheduler;

use std::time::Duration;

/// A unit of deferred work advanced by the [`Scheduler`].
///
/// The scheduler never inspects variant state; it only drives this contract.
pub trait Scheduled: Send + 'static {
    /// Finished for any reason (completed or cancelled).
    fn is_done(&self) -> bool;

    fn is_paused(&self) -> bool {
        false
    }

    /// Advance by one tick. Never called once `is_done()` returns true.
    fn tick(&mut self, ctx: &mut TickCtx<'_>);

    /// Stop an in-progress or paused operation. The completion callback must not fire,
    /// and `is_done()` must report true afterwards.
    fn cancel(&mut self);

    /// Freeze progress. A paused operation resumes from the same point.
    fn pause(&mut self);

    /// Continue a paused operation. Does nothing if not paused.
    fn resume(&mut self);

    /// Release resources held by the operation (callbacks, captured state).
    fn dispose(&mut self) {}

    fn label(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Context handed to [`Scheduled::tick`].
///
/// Gives the advancing operation the tick timing and re-entrant access to the scheduler.
/// Registrations made through it are deferred to the next tick.
pub struct TickCtx<'a> {
    scheduler: &'a mut Scheduler,
    handle: TaskHandle,
    registered_at: Duration,
}

impl<'a> TickCtx<'a> {
    #[inline]
    pub(crate) fn new(scheduler: &'a mut Scheduler, handle: TaskHandle, registered_at: Duration) -> Self {
        Self {
            scheduler,
            handle,
            registered_at,
        }
    }

    /// Logical time of the current tick.
    #[inline]
    pub fn now(&self) -> Duration {
        self.scheduler.now()
    }

    /// Logical time elapsed since the previous tick.
    #[inline]
    pub fn dt(&self) -> Duration {
        self.scheduler.dt()
    }

    #[inline]
    pub fn tick_index(&self) -> u64 {
        self.scheduler.tick_index()
    }

    /// Handle of the operation being advanced.
    #[inline]
    pub fn id(&self) -> TaskHandle {
        self.handle
    }

    /// Logical time at which the operation was registered.
    #[inline]
    pub fn registered_at(&self) -> Duration {
        self.registered_at
    }

    #[inline]
    pub fn scheduler(&mut self) -> &mut Scheduler {
        self.scheduler
    }

    /// Shorthand for `scheduler().register(op)`.
    #[inline]
    #[track_caller]
    pub fn register<S: Scheduled>(&mut self, op: S) -> TaskHandle {
        self.scheduler.register(op)
    }

    /// Cancellation of this operation was requested during the current tick.
    ///
    /// The cancel hook runs once `tick` returns; variants check this before firing completion.
    #[inline]
    pub fn is_cancel_requested(&self) -> bool {
        self.scheduler.current_cancel_requested()
    }

    /// Shorthand for `scheduler().cancel(handle)`.
    #[inline]
    pub fn cancel(&mut self, handle: TaskHandle) -> bool {
        self.scheduler.cancel(handle)
    }
}
