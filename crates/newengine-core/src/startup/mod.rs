mod config;
mod loader;

pub use config::{
    ConfigLoadReport,
    ConfigOverride,
    ConfigOverrides,
    ConfigPaths,
    ConfigResolvedFrom,
    ConfigSource,
    EngineConfig,
    LogConfig,
    OverrideSource,
    SchedulerTickPhase,
};

pub use loader::ConfigLoader;
