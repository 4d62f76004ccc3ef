use serde::{Deserialize, Serialize};

/// Scheduler tuning.
///
/// Capacities only pre-size collections; nothing is rejected when they are exceeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub running_capacity: usize,
    pub pending_capacity: usize,
    /// Upper bound on recycled entry wrappers kept by the pool.
    pub pool_max_retained: usize,
    /// Live population above which a single warning is logged.
    /// Handle lookups are linear scans, so this is the practical ceiling.
    pub population_warn_threshold: usize,
    /// Attach a call-site diagnostics registry at construction.
    pub diagnostics: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            running_capacity: 100,
            pending_capacity: 100,
            pool_max_retained: 200,
            population_warn_threshold: 512,
            diagnostics: false,
        }
    }
}
