pub mod engine;
pub mod error;
pub mod frame;
pub mod module;
pub mod startup;
pub mod sync;

mod bus;

pub use engine::Engine;
pub use error::{EngineError, EngineResult, ModuleStage};
pub use frame::Frame;
pub use module::{Bus, Module, ModuleCtx};
pub use startup::{ConfigLoader, ConfigPaths, EngineConfig, LogConfig, SchedulerTickPhase};
pub use sync::ShutdownToken;

pub use newengine_sched as sched;
pub use newengine_sched::{Scheduler, TaskHandle};
