use super::cycle::Cycle;
use super::{Callback, ProgressFn};
use crate::scheduled::{Scheduled, TickCtx};
use crate::time::TimeSource;

use std::time::Duration;

/// Fires a callback after a span of logical time, once or repeatedly.
///
/// The span is measured from the tick time at registration. A looped timer starts its next
/// cycle at the tick it fired on.
///
/// [`on_clock`](Timer::on_clock) measures the span on a separate time source instead, such as
/// an unscaled clock that keeps running while the scheduler's logical time is slowed or frozen.
/// The timer still only checks it once per tick.
pub struct Timer {
    duration: Duration,
    looped: bool,
    // Own clock and its reading when attached.
    clock: Option<(Box<dyn TimeSource>, Duration)>,

    on_complete: Option<Callback>,
    on_update: Option<ProgressFn<Duration>>,

    cycle: Cycle,
    elapsed: Duration,
    completed: bool,
    cancelled: bool,
}

impl Timer {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            looped: false,
            clock: None,
            on_complete: None,
            on_update: None,
            cycle: Cycle::default(),
            elapsed: Duration::ZERO,
            completed: false,
            cancelled: false,
        }
    }

    /// One-shot timer firing `f` after `delay`.
    pub fn after<F>(delay: Duration, f: F) -> Self
    where
        F: FnMut(&mut TickCtx<'_>) + Send + 'static,
    {
        Self::new(delay).on_complete(f)
    }

    /// Repeating timer firing `f` every `interval`.
    pub fn every<F>(interval: Duration, f: F) -> Self
    where
        F: FnMut(&mut TickCtx<'_>) + Send + 'static,
    {
        Self::new(interval).on_complete(f).looped(true)
    }

    pub fn on_complete<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut TickCtx<'_>) + Send + 'static,
    {
        self.on_complete = Some(Box::new(f));
        self
    }

    /// Called every unpaused tick with the time elapsed in the current cycle.
    pub fn on_update<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut TickCtx<'_>, Duration) + Send + 'static,
    {
        self.on_update = Some(Box::new(f));
        self
    }

    pub fn looped(mut self, looped: bool) -> Self {
        self.looped = looped;
        self
    }

    /// Measures the span on `clock`, starting from its current reading.
    pub fn on_clock<C: TimeSource + 'static>(mut self, clock: C) -> Self {
        let origin = clock.now();
        self.clock = Some((Box::new(clock), origin));
        self
    }

    #[inline]
    pub fn uses_own_clock(&self) -> bool {
        self.clock.is_some()
    }

    #[inline]
    pub fn duration(&self) -> Duration {
        self.duration
    }

    #[inline]
    pub fn is_looped(&self) -> bool {
        self.looped
    }

    /// Finished normally. `false` if cancelled.
    #[inline]
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Time elapsed in the current cycle as of the last tick.
    ///
    /// Equals the duration once completed; frozen at the cancel/pause point otherwise.
    pub fn time_elapsed(&self) -> Duration {
        if self.completed {
            self.duration
        } else {
            self.elapsed.min(self.duration)
        }
    }

    pub fn time_remaining(&self) -> Duration {
        self.duration.saturating_sub(self.time_elapsed())
    }

    /// Progress in `[0, 1]`.
    pub fn ratio_complete(&self) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        self.time_elapsed().as_secs_f32() / self.duration.as_secs_f32()
    }

    pub fn ratio_remaining(&self) -> f32 {
        1.0 - self.ratio_complete()
    }
}

impl Scheduled for Timer {
    fn is_done(&self) -> bool {
        self.completed || self.cancelled
    }

    fn is_paused(&self) -> bool {
        self.cycle.is_paused()
    }

    fn tick(&mut self, ctx: &mut TickCtx<'_>) {
        if self.is_done() {
            return;
        }

        let (now, origin) = match &self.clock {
            Some((clock, origin)) => (clock.now(), *origin),
            None => (ctx.now(), ctx.registered_at()),
        };
        let Some(elapsed) = self.cycle.sample(now, origin) else {
            return;
        };
        self.elapsed = elapsed;

        if let Some(f) = self.on_update.as_mut() {
            f(ctx, elapsed.min(self.duration));
        }

        if elapsed < self.duration || ctx.is_cancel_requested() {
            return;
        }

        if let Some(f) = self.on_complete.as_mut() {
            f(ctx);
        }

        if self.looped {
            self.cycle.restart(now);
            self.elapsed = Duration::ZERO;
        } else {
            self.completed = true;
        }
    }

    fn cancel(&mut self) {
        if self.is_done() {
            return;
        }
        self.cancelled = true;
        self.cycle.set_paused(false);
    }

    fn pause(&mut self) {
        if self.is_done() {
            return;
        }
        self.cycle.set_paused(true);
    }

    fn resume(&mut self) {
        if self.is_done() {
            return;
        }
        self.cycle.set_paused(false);
    }

    fn dispose(&mut self) {
        self.on_complete = None;
        self.on_update = None;
    }

    fn label(&self) -> &'static str {
        if self.looped {
            "Timer(every)"
        } else {
            "Timer(after)"
        }
    }
}
