use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Source of logical time for the scheduler.
///
/// Must be monotonic non-decreasing. It is driven by the host, never by the system clock.
pub trait TimeSource: Send {
    fn now(&self) -> Duration;
}

/// Externally driven clock shared between the host and the scheduler.
///
/// Clones observe the same time. The host advances it once per frame.
#[derive(Clone, Default)]
pub struct ManualClock {
    nanos: Arc<AtomicU64>,
}

impl ManualClock {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn starting_at(t: Duration) -> Self {
        let clock = Self::new();
        clock.set(t);
        clock
    }

    /// Moves the clock forward by `dt`.
    #[inline]
    pub fn advance(&self, dt: Duration) {
        let dt = saturating_nanos(dt);
        let _ = self
            .nanos
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |cur| {
                Some(cur.saturating_add(dt))
            });
    }

    /// Moves the clock to `t`. Values earlier than the current time are ignored.
    #[inline]
    pub fn set(&self, t: Duration) {
        self.nanos.fetch_max(saturating_nanos(t), Ordering::Relaxed);
    }

    #[inline]
    pub fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::Relaxed))
    }
}

impl TimeSource for ManualClock {
    #[inline]
    fn now(&self) -> Duration {
        ManualClock::now(self)
    }
}

#[inline]
fn saturating_nanos(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}
