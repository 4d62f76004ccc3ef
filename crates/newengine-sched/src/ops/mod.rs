//! Built-in operation kinds and the scheduling shorthands built on them.

mod cycle;
mod frame_counter;
mod timer;
mod tween;

pub use frame_counter::FrameCounter;
pub use timer::Timer;
pub use tween::{Ease, Tween};

use crate::handle::TaskHandle;
use crate::registry::Scheduler;
use crate::scheduled::TickCtx;

use std::time::Duration;

/// Fired on completion. Receives the tick context so it can schedule follow-ups.
pub type Callback = Box<dyn FnMut(&mut TickCtx<'_>) + Send>;

/// Fired every tick with a progress value.
pub type ProgressFn<T> = Box<dyn FnMut(&mut TickCtx<'_>, T) + Send>;

impl Scheduler {
    /// Runs `f` once after `delay` of logical time.
    #[inline]
    #[track_caller]
    pub fn delay<F>(&mut self, delay: Duration, f: F) -> TaskHandle
    where
        F: FnMut(&mut TickCtx<'_>) + Send + 'static,
    {
        self.register(Timer::after(delay, f))
    }

    /// Runs `f` every `interval` until cancelled.
    #[inline]
    #[track_caller]
    pub fn every<F>(&mut self, interval: Duration, f: F) -> TaskHandle
    where
        F: FnMut(&mut TickCtx<'_>) + Send + 'static,
    {
        self.register(Timer::every(interval, f))
    }

    /// Runs `f` once after `frames` ticks.
    #[inline]
    #[track_caller]
    pub fn wait_frames<F>(&mut self, frames: u32, f: F) -> TaskHandle
    where
        F: FnMut(&mut TickCtx<'_>) + Send + 'static,
    {
        self.register(FrameCounter::new(frames, f))
    }

    /// Feeds an eased value from `from` to `to` to `on_update` over `duration`.
    #[inline]
    #[track_caller]
    pub fn tween<F>(&mut self, from: f32, to: f32, duration: Duration, ease: Ease, on_update: F) -> TaskHandle
    where
        F: FnMut(&mut TickCtx<'_>, f32) + Send + 'static,
    {
        self.register(Tween::new(from, to, duration, ease, on_update))
    }
}
