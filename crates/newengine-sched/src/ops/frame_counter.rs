use super::{Callback, ProgressFn};
use crate::scheduled::{Scheduled, TickCtx};

/// Fires a callback after a number of ticks. Paused ticks are not counted.
pub struct FrameCounter {
    frames: u32,
    count: u32,
    looped: bool,

    on_complete: Option<Callback>,
    on_update: Option<ProgressFn<u32>>,

    paused: bool,
    completed: bool,
    cancelled: bool,
}

impl FrameCounter {
    pub fn new<F>(frames: u32, on_complete: F) -> Self
    where
        F: FnMut(&mut TickCtx<'_>) + Send + 'static,
    {
        Self {
            frames,
            count: 0,
            looped: false,
            on_complete: Some(Box::new(on_complete)),
            on_update: None,
            paused: false,
            completed: false,
            cancelled: false,
        }
    }

    /// Called every counted tick with the count so far in this cycle.
    pub fn on_update<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut TickCtx<'_>, u32) + Send + 'static,
    {
        self.on_update = Some(Box::new(f));
        self
    }

    pub fn looped(mut self, looped: bool) -> Self {
        self.looped = looped;
        self
    }

    #[inline]
    pub fn frames(&self) -> u32 {
        self.frames
    }

    #[inline]
    pub fn frames_remaining(&self) -> u32 {
        self.frames.saturating_sub(self.count)
    }

    #[inline]
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

impl Scheduled for FrameCounter {
    fn is_done(&self) -> bool {
        self.completed || self.cancelled
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn tick(&mut self, ctx: &mut TickCtx<'_>) {
        if self.is_done() || self.paused {
            return;
        }

        self.count += 1;

        if let Some(f) = self.on_update.as_mut() {
            f(ctx, self.count);
        }

        if self.count < self.frames || ctx.is_cancel_requested() {
            return;
        }

        if let Some(f) = self.on_complete.as_mut() {
            f(ctx);
        }

        if self.looped {
            self.count = 0;
        } else {
            self.completed = true;
        }
    }

    fn cancel(&mut self) {
        if self.is_done() {
            return;
        }
        self.cancelled = true;
        self.paused = false;
    }

    fn pause(&mut self) {
        if !self.is_done() {
            self.paused = true;
        }
    }

    fn resume(&mut self) {
        if !self.is_done() {
            self.paused = false;
        }
    }

    fn dispose(&mut self) {
        self.on_complete = None;
        self.on_update = None;
    }

    fn label(&self) -> &'static str {
        "FrameCounter"
    }
}
