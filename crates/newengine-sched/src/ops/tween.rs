use super::cycle::Cycle;
use super::{Callback, ProgressFn};
use crate::scheduled::{Scheduled, TickCtx};

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ease {
    #[default]
    Linear,
    InQuad,
    OutQuad,
    InOutQuad,
}

impl Ease {
    /// Maps linear progress `t` in `[0, 1]` onto the curve.
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Ease::Linear => t,
            Ease::InQuad => t * t,
            Ease::OutQuad => t * (2.0 - t),
            Ease::InOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    -1.0 + (4.0 - 2.0 * t) * t
                }
            }
        }
    }
}

/// Interpolates a value over a span of logical time.
///
/// `on_update` receives the eased value every unpaused tick; the final tick always delivers
/// exactly `to` before `on_complete` runs.
pub struct Tween {
    from: f32,
    to: f32,
    duration: Duration,
    ease: Ease,

    on_update: Option<ProgressFn<f32>>,
    on_complete: Option<Callback>,

    cycle: Cycle,
    value: f32,
    completed: bool,
    cancelled: bool,
}

impl Tween {
    pub fn new<F>(from: f32, to: f32, duration: Duration, ease: Ease, on_update: F) -> Self
    where
        F: FnMut(&mut TickCtx<'_>, f32) + Send + 'static,
    {
        Self {
            from,
            to,
            duration,
            ease,
            on_update: Some(Box::new(on_update)),
            on_complete: None,
            cycle: Cycle::default(),
            value: from,
            completed: false,
            cancelled: false,
        }
    }

    pub fn on_complete<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut TickCtx<'_>) + Send + 'static,
    {
        self.on_complete = Some(Box::new(f));
        self
    }

    /// Last value delivered to `on_update`.
    #[inline]
    pub fn value(&self) -> f32 {
        self.value
    }

    #[inline]
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    fn value_at(&self, elapsed: Duration) -> f32 {
        let t = if self.duration.is_zero() {
            1.0
        } else {
            elapsed.as_secs_f32() / self.duration.as_secs_f32()
        };
        let k = self.ease.apply(t);
        self.from + (self.to - self.from) * k
    }
}

impl Scheduled for Tween {
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

        let Some(elapsed) = self.cycle.sample(ctx.now(), ctx.registered_at()) else {
            return;
        };

        let finished = elapsed >= self.duration;
        self.value = if finished { self.to } else { self.value_at(elapsed) };

        if let Some(f) = self.on_update.as_mut() {
            f(ctx, self.value);
        }

        if !finished || ctx.is_cancel_requested() {
            return;
        }

        if let Some(f) = self.on_complete.as_mut() {
            f(ctx);
        }
        self.completed = true;
    }

    fn cancel(&mut self) {
        if self.is_done() {
            return;
        }
        self.cancelled = true;
        self.cycle.set_paused(false);
    }

    fn pause(&mut self) {
        if !self.is_done() {
            self.cycle.set_paused(true);
        }
    }

    fn resume(&mut self) {
        if !self.is_done() {
            self.cycle.set_paused(false);
        }
    }

    fn dispose(&mut self) {
        self.on_update = None;
        self.on_complete = None;
    }

    fn label(&self) -> &'static str {
        "Tween"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ease_curves_hit_endpoints() {
        for ease in [Ease::Linear, Ease::InQuad, Ease::OutQuad, Ease::InOutQuad] {
            assert_eq!(ease.apply(0.0), 0.0, "{ease:?}");
            assert!((ease.apply(1.0) - 1.0).abs() < 1e-6, "{ease:?}");
        }
        assert_eq!(Ease::InQuad.apply(0.5), 0.25);
        assert_eq!(Ease::OutQuad.apply(0.5), 0.75);
        assert_eq!(Ease::Linear.apply(2.0), 1.0);
    }
}
