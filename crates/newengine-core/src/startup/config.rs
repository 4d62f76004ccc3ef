use newengine_sched::SchedulerConfig;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ConfigPaths {
    /// Optional JSON file. A missing file is not an error.
    pub file: Option<PathBuf>,
    pub root_dir: Option<PathBuf>,
}

impl Default for ConfigPaths {
    #[inline]
    fn default() -> Self {
        Self {
            file: Some(PathBuf::from("engine.json")),
            root_dir: None,
        }
    }
}

impl ConfigPaths {
    #[inline]
    pub fn new<P>(file: P, root_dir: Option<PathBuf>) -> Self
    where
        P: Into<PathBuf>,
    {
        Self {
            file: Some(file.into()),
            root_dir,
        }
    }

    /// Defaults and overrides only.
    #[inline]
    pub fn none() -> Self {
        Self {
            file: None,
            root_dir: None,
        }
    }

    #[inline]
    pub fn with_root_dir(mut self, root_dir: impl Into<PathBuf>) -> Self {
        self.root_dir = Some(root_dir.into());
        self
    }

    #[inline]
    pub fn file_path(&self) -> Option<&Path> {
        self.file.as_deref()
    }
}

/// When the engine advances its scheduler within a frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerTickPhase {
    /// Before fixed updates; callbacks see the state left by the previous frame.
    #[default]
    BeginFrame,
    /// After render; callbacks see the state produced by this frame.
    EndFrame,
}

impl FromStr for SchedulerTickPhase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "begin" | "begin_frame" => Ok(Self::BeginFrame),
            "end" | "end_frame" => Ok(Self::EndFrame),
            other => Err(format!("unknown scheduler tick phase: {other}")),
        }
    }
}

impl fmt::Display for SchedulerTickPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BeginFrame => f.write_str("begin_frame"),
            Self::EndFrame => f.write_str("end_frame"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub colors: bool,
    pub include_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            colors: true,
            include_target: true,
        }
    }
}

/// Normalized engine configuration. Every field has a bootable default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub fixed_dt_ms: u32,
    /// Upper clamp on a measured frame delta.
    pub max_frame_dt_ms: u32,
    /// Upper bound on fixed steps per frame; excess accumulated time is dropped.
    pub max_fixed_steps: u32,
    pub tick_phase: SchedulerTickPhase,
    pub log: LogConfig,
    pub scheduler: SchedulerConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fixed_dt_ms: 16,
            max_frame_dt_ms: 250,
            max_fixed_steps: 8,
            tick_phase: SchedulerTickPhase::default(),
            log: LogConfig::default(),
            scheduler: SchedulerConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Fixed step in seconds, never below one millisecond.
    #[inline]
    pub fn fixed_dt(&self) -> f32 {
        (self.fixed_dt_ms as f32 / 1000.0).max(0.001)
    }

    #[inline]
    pub fn max_frame_dt(&self) -> Duration {
        Duration::from_millis(u64::from(self.max_frame_dt_ms))
    }

    #[inline]
    pub fn max_fixed_steps(&self) -> u32 {
        self.max_fixed_steps.max(1)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ConfigSource {
    #[default]
    Defaults,
    File {
        path: PathBuf,
    },
    Mixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideSource {
    File,
    Env,
    Programmatic,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ConfigResolvedFrom {
    /// Path was absolute and existed.
    Absolute,
    /// Found as `cwd/<file>`.
    Cwd,
    /// Found as `exe_dir/<file>`.
    ExeDir,
    /// Found as `root_dir/<file>`.
    RootDir,
    /// No file path was provided, or the file does not exist.
    #[default]
    NotProvided,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigOverride {
    pub key: &'static str,
    pub source: OverrideSource,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigLoadReport {
    pub source: ConfigSource,
    /// The actual file used (absolute when found).
    pub file: Option<PathBuf>,
    pub resolved_from: ConfigResolvedFrom,
    pub overrides: Vec<ConfigOverride>,
}

impl ConfigLoadReport {
    #[inline]
    pub fn has_overrides(&self) -> bool {
        !self.overrides.is_empty()
    }

    #[inline]
    pub fn is_defaults(&self) -> bool {
        matches!(self.source, ConfigSource::Defaults)
    }

    #[inline]
    pub fn used_file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    /// Last applied override for `key`.
    pub fn override_of(&self, key: &str) -> Option<&ConfigOverride> {
        self.overrides.iter().rev().find(|o| o.key == key)
    }
}

/// Key/value overrides applied on top of the file layer.
///
/// Keys are the `NEWENGINE_*` variable names, e.g. `NEWENGINE_FIXED_DT_MS`.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pairs: Vec<(String, String)>,
}

impl ConfigOverrides {
    pub const PREFIX: &'static str = "NEWENGINE_";

    #[inline]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Every `NEWENGINE_*` variable of the process environment.
    pub fn from_env() -> Self {
        Self::from_pairs(std::env::vars().filter(|(k, _)| k.starts_with(Self::PREFIX)))
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            pairs: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    #[inline]
    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.pairs.push((key.into(), value.into()));
        self
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
