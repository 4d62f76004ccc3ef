use crate::error::{EngineError, EngineResult};
use crate::frame::Frame;
use crate::module::Bus;
use crate::sync::ShutdownToken;

use newengine_sched::{SchedError, Scheduled, Scheduler, TaskHandle};

/// Context passed to modules.
///
/// Modules never hold `&mut Engine`; the scheduler, the bus and the exit flag are reached
/// through here.
pub struct ModuleCtx<'a, E: Send + 'static> {
    bus: &'a Bus<E>,
    scheduler: &'a mut Scheduler,
    shutdown: &'a ShutdownToken,
    exit: &'a mut bool,

    frame: Option<Frame>,
}

impl<'a, E: Send + 'static> ModuleCtx<'a, E> {
    #[inline]
    pub(crate) fn new(
        bus: &'a Bus<E>,
        scheduler: &'a mut Scheduler,
        shutdown: &'a ShutdownToken,
        exit: &'a mut bool,
    ) -> Self {
        Self {
            bus,
            scheduler,
            shutdown,
            exit,
            frame: None,
        }
    }

    #[inline]
    pub(crate) fn set_frame(&mut self, frame: &Frame) {
        self.frame = Some(*frame);
    }

    /// Frame snapshot for the current stage. `None` during `init`, `start` and `shutdown`.
    #[inline]
    pub fn frame(&self) -> Option<&Frame> {
        self.frame.as_ref()
    }

    #[inline]
    pub fn bus(&self) -> &Bus<E> {
        self.bus
    }

    #[inline]
    pub fn scheduler(&mut self) -> &mut Scheduler {
        self.scheduler
    }

    /// Registers `op` with the engine scheduler; fails once the scheduler is torn down.
    #[inline]
    #[track_caller]
    pub fn schedule<S: Scheduled>(&mut self, op: S) -> EngineResult<TaskHandle> {
        self.scheduler.try_register(op).map_err(EngineError::from)
    }

    /// Cancels a scheduled operation; a stale handle is reported as an error.
    pub fn cancel(&mut self, handle: TaskHandle) -> EngineResult<()> {
        if self.scheduler.cancel(handle) {
            Ok(())
        } else {
            Err(SchedError::StaleHandle(handle).into())
        }
    }

    /// Token that scheduled callbacks can capture to stop the engine later.
    #[inline]
    pub fn shutdown_token(&self) -> ShutdownToken {
        self.shutdown.clone()
    }

    #[inline]
    pub fn request_exit(&mut self) {
        *self.exit = true;
    }

    #[inline]
    pub fn is_exit_requested(&self) -> bool {
        *self.exit || self.shutdown.is_requested()
    }
}
