use std::time::Duration;

/// Start-of-cycle bookkeeping shared by the time-based operations.
///
/// The cycle starts at the entry's registration time. While paused, each tick pushes the
/// start forward by the time that passed, so paused time never counts as progress.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Cycle {
    start: Option<Duration>,
    last_update: Duration,
    paused: bool,
}

impl Cycle {
    /// Elapsed time of the current cycle at `now`, or `None` while paused.
    pub fn sample(&mut self, now: Duration, registered_at: Duration) -> Option<Duration> {
        let start = match self.start {
            Some(start) => start,
            None => {
                self.last_update = registered_at;
                registered_at
            }
        };

        if self.paused {
            self.start = Some(start + now.saturating_sub(self.last_update));
            self.last_update = now;
            return None;
        }

        self.start = Some(start);
        self.last_update = now;
        Some(now.saturating_sub(start))
    }

    #[inline]
    pub fn restart(&mut self, now: Duration) {
        self.start = Some(now);
        self.last_update = now;
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    #[inline]
    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn paused_time_does_not_count() {
        let mut cycle = Cycle::default();
        assert_eq!(cycle.sample(secs(1), secs(0)), Some(secs(1)));

        cycle.set_paused(true);
        assert_eq!(cycle.sample(secs(2), secs(0)), None);
        assert_eq!(cycle.sample(secs(3), secs(0)), None);

        cycle.set_paused(false);
        assert_eq!(cycle.sample(secs(4), secs(0)), Some(secs(2)));
    }

    #[test]
    fn restart_begins_a_new_cycle() {
        let mut cycle = Cycle::default();
        cycle.sample(secs(5), secs(2));
        cycle.restart(secs(5));
        assert_eq!(cycle.sample(secs(6), secs(2)), Some(secs(1)));
    }
}
