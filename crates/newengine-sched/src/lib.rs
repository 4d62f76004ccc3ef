//! Per-tick cooperative scheduler.
//!
//! A single [`Scheduler`] owns every deferred operation (delays, intervals, tweens, ...)
//! and advances all of them once per host tick. Operations may be registered, cancelled,
//! paused and resumed from anywhere, including from inside the pass that is advancing them.
//!
//! The scheduler is engine-thread local: it has no locks and never spawns threads.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod handle;
pub mod invariants;
pub mod observer;
pub mod ops;
pub mod pool;
pub mod registry;
pub mod scheduled;
pub mod time;

mod entry;

pub use config::SchedulerConfig;
pub use diagnostics::{CallSiteRecord, DiagnosticsRegistry, TaskDiagnostic};
pub use error::{SchedError, SchedResult};
pub use handle::TaskHandle;
pub use observer::{RegisterRecord, RetireReason, SchedulerObserver};
pub use ops::{Ease, FrameCounter, Timer, Tween};
pub use pool::{Pool, PoolStats, Poolable};
pub use registry::Scheduler;
pub use scheduled::{Scheduled, TickCtx};
pub use time::{ManualClock, TimeSource};
