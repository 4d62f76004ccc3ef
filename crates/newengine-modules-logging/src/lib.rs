use env_logger::{Builder, WriteStyle};
use log::LevelFilter;
use newengine_core::{EngineError, EngineResult, LogConfig, Module, ModuleCtx};

use std::io::Write;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleLoggerConfig {
    pub level: LevelFilter,
    pub colors: bool,
    pub include_target: bool,
}

impl ConsoleLoggerConfig {
    /// An unparsable level falls back to `info`.
    pub fn from_log_config(log: &LogConfig) -> Self {
        Self {
            level: log.level.trim().parse().unwrap_or(LevelFilter::Info),
            colors: log.colors,
            include_target: log.include_target,
        }
    }
}

impl Default for ConsoleLoggerConfig {
    fn default() -> Self {
        Self::from_log_config(&LogConfig::default())
    }
}

impl From<&LogConfig> for ConsoleLoggerConfig {
    #[inline]
    fn from(value: &LogConfig) -> Self {
        Self::from_log_config(value)
    }
}

/// Installs an `env_logger` console sink during module `init`.
pub struct ConsoleLoggerModule {
    config: ConsoleLoggerConfig,
    initialized: bool,
}

impl ConsoleLoggerModule {
    #[inline]
    pub fn new(config: ConsoleLoggerConfig) -> Self {
        Self {
            config,
            initialized: false,
        }
    }

    fn builder(&self) -> Builder {
        let mut builder = Builder::new();
        builder.filter_level(self.config.level);
        builder.write_style(if self.config.colors {
            WriteStyle::Auto
        } else {
            WriteStyle::Never
        });

        let include_target = self.config.include_target;
        builder.format(move |buf, record| {
            let style = buf.default_level_style(record.level());
            if include_target {
                writeln!(
                    buf,
                    "[{style}{:<5}{style:#}] {:<25} {}",
                    record.level(),
                    record.target(),
                    record.args()
                )
            } else {
                writeln!(buf, "[{style}{:<5}{style:#}] {}", record.level(), record.args())
            }
        });
        builder
    }
}

impl<E: Send + 'static> Module<E> for ConsoleLoggerModule {
    fn id(&self) -> &'static str {
        "console-logger"
    }

    fn init(&mut self, _ctx: &mut ModuleCtx<'_, E>) -> EngineResult<()> {
        if self.initialized {
            return Ok(());
        }

        self.builder()
            .try_init()
            .map_err(|e| EngineError::Other(format!("logger init failed: {e}")))?;

        self.initialized = true;
        log::debug!("console logger ready (level={})", self.config.level);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_config_maps_onto_console_config() {
        let cfg = ConsoleLoggerConfig::from(&LogConfig {
            level: " Trace ".to_owned(),
            colors: false,
            include_target: false,
        });
        assert_eq!(cfg.level, LevelFilter::Trace);
        assert!(!cfg.colors);
        assert!(!cfg.include_target);
    }

    #[test]
    fn unknown_level_falls_back_to_info() {
        let cfg = ConsoleLoggerConfig::from(&LogConfig {
            level: "chatty".to_owned(),
            ..LogConfig::default()
        });
        assert_eq!(cfg.level, LevelFilter::Info);
    }
}
