use crate::error::{EngineError, EngineResult};
use crate::startup::{
    ConfigLoadReport, ConfigOverride, ConfigOverrides, ConfigPaths, ConfigResolvedFrom, ConfigSource,
    EngineConfig, OverrideSource, SchedulerTickPhase,
};

use serde::Deserialize;
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads engine config with layering: defaults -> file -> env.
    pub fn load_json(paths: &ConfigPaths) -> EngineResult<(EngineConfig, ConfigLoadReport)> {
        Self::load_layers(paths, &ConfigOverrides::from_env(), &ConfigOverrides::empty())
    }

    /// Loads engine config with layering: defaults -> file -> env -> programmatic.
    pub fn load_json_with_overrides(
        paths: &ConfigPaths,
        programmatic: &ConfigOverrides,
    ) -> EngineResult<(EngineConfig, ConfigLoadReport)> {
        Self::load_layers(paths, &ConfigOverrides::from_env(), programmatic)
    }

    /// Same layering with the environment layer supplied by the caller.
    pub fn load_layers(
        paths: &ConfigPaths,
        env: &ConfigOverrides,
        programmatic: &ConfigOverrides,
    ) -> EngineResult<(EngineConfig, ConfigLoadReport)> {
        let mut cfg = EngineConfig::default();
        let mut report = ConfigLoadReport::default();

        // File layer (optional)
        let mut file_used = false;
        if let Some(raw_path) = paths.file_path() {
            if let Some((resolved, from)) = resolve_config_file(paths, raw_path) {
                let data = fs::read_to_string(&resolved).map_err(|e| {
                    EngineError::Other(format!(
                        "engine config read failed: path={:?} err={}",
                        resolved, e
                    ))
                })?;

                let parsed: RootJson = serde_json::from_str(&data).map_err(|e| {
                    EngineError::Other(format!(
                        "engine config parse failed (json): path={:?} err={}",
                        resolved, e
                    ))
                })?;

                apply_root(&mut cfg, &mut report, parsed);

                report.source = ConfigSource::File {
                    path: resolved.clone(),
                };
                report.file = Some(resolved);
                report.resolved_from = from;
                file_used = true;
            }
        }

        apply_overrides(&mut cfg, &mut report, OverrideSource::Env, env);
        apply_overrides(&mut cfg, &mut report, OverrideSource::Programmatic, programmatic);

        let mixed = report
            .overrides
            .iter()
            .any(|o| o.source != OverrideSource::File);

        if mixed {
            report.source = ConfigSource::Mixed;
            if !file_used {
                report.file = None;
                report.resolved_from = ConfigResolvedFrom::NotProvided;
            }
        }

        Ok((cfg, report))
    }
}

#[derive(Deserialize)]
struct RootJson {
    engine: Option<EngineJson>,
    logging: Option<LoggingJson>,
    scheduler: Option<SchedulerJson>,
}

#[derive(Deserialize)]
struct EngineJson {
    fixed_dt_ms: Option<u32>,
    max_frame_dt_ms: Option<u32>,
    max_fixed_steps: Option<u32>,
    tick_phase: Option<SchedulerTickPhase>,
}

#[derive(Deserialize)]
struct LoggingJson {
    level: Option<String>,
    colors: Option<bool>,
    include_target: Option<bool>,
}

#[derive(Deserialize)]
struct SchedulerJson {
    running_capacity: Option<usize>,
    pending_capacity: Option<usize>,
    pool_max_retained: Option<usize>,
    population_warn_threshold: Option<usize>,
    diagnostics: Option<bool>,
}

fn apply_root(cfg: &mut EngineConfig, report: &mut ConfigLoadReport, src: RootJson) {
    let source = OverrideSource::File;

    if let Some(e) = src.engine {
        if let Some(v) = e.fixed_dt_ms {
            apply(report, source, "engine.fixed_dt_ms", &mut cfg.fixed_dt_ms, v);
        }
        if let Some(v) = e.max_frame_dt_ms {
            apply(report, source, "engine.max_frame_dt_ms", &mut cfg.max_frame_dt_ms, v);
        }
        if let Some(v) = e.max_fixed_steps {
            apply(report, source, "engine.max_fixed_steps", &mut cfg.max_fixed_steps, v);
        }
        if let Some(v) = e.tick_phase {
            apply(report, source, "engine.tick_phase", &mut cfg.tick_phase, v);
        }
    }

    if let Some(l) = src.logging {
        if let Some(v) = l.level {
            apply(report, source, "logging.level", &mut cfg.log.level, v);
        }
        if let Some(v) = l.colors {
            apply(report, source, "logging.colors", &mut cfg.log.colors, v);
        }
        if let Some(v) = l.include_target {
            apply(report, source, "logging.include_target", &mut cfg.log.include_target, v);
        }
    }

    if let Some(s) = src.scheduler {
        let sched = &mut cfg.scheduler;
        if let Some(v) = s.running_capacity {
            apply(report, source, "scheduler.running_capacity", &mut sched.running_capacity, v);
        }
        if let Some(v) = s.pending_capacity {
            apply(report, source, "scheduler.pending_capacity", &mut sched.pending_capacity, v);
        }
        if let Some(v) = s.pool_max_retained {
            apply(report, source, "scheduler.pool_max_retained", &mut sched.pool_max_retained, v);
        }
        if let Some(v) = s.population_warn_threshold {
            apply(
                report,
                source,
                "scheduler.population_warn_threshold",
                &mut sched.population_warn_threshold,
                v,
            );
        }
        if let Some(v) = s.diagnostics {
            apply(report, source, "scheduler.diagnostics", &mut sched.diagnostics, v);
        }
    }
}

fn apply_overrides(
    cfg: &mut EngineConfig,
    report: &mut ConfigLoadReport,
    source: OverrideSource,
    overrides: &ConfigOverrides,
) {
    for (key, raw) in overrides.iter() {
        let Some(name) = key.strip_prefix(ConfigOverrides::PREFIX) else {
            continue;
        };
        match name {
            "LOG" | "LOG_LEVEL" => {
                apply(report, source, "logging.level", &mut cfg.log.level, raw.trim().to_owned())
            }
            "LOG_COLORS" => apply_flag(report, source, "logging.colors", &mut cfg.log.colors, raw),
            "LOG_TARGET" => {
                apply_flag(report, source, "logging.include_target", &mut cfg.log.include_target, raw)
            }
            "FIXED_DT_MS" => apply_parsed(report, source, "engine.fixed_dt_ms", &mut cfg.fixed_dt_ms, raw),
            "MAX_FRAME_DT_MS" => {
                apply_parsed(report, source, "engine.max_frame_dt_ms", &mut cfg.max_frame_dt_ms, raw)
            }
            "MAX_FIXED_STEPS" => {
                apply_parsed(report, source, "engine.max_fixed_steps", &mut cfg.max_fixed_steps, raw)
            }
            "TICK_PHASE" => apply_parsed(report, source, "engine.tick_phase", &mut cfg.tick_phase, raw),
            "SCHED_DIAGNOSTICS" => apply_flag(
                report,
                source,
                "scheduler.diagnostics",
                &mut cfg.scheduler.diagnostics,
                raw,
            ),
            "SCHED_POOL_MAX" => apply_parsed(
                report,
                source,
                "scheduler.pool_max_retained",
                &mut cfg.scheduler.pool_max_retained,
                raw,
            ),
            "SCHED_WARN_THRESHOLD" => apply_parsed(
                report,
                source,
                "scheduler.population_warn_threshold",
                &mut cfg.scheduler.population_warn_threshold,
                raw,
            ),
            // Other NEWENGINE_* variables belong to other subsystems.
            _ => {}
        }
    }
}

fn apply<T>(report: &mut ConfigLoadReport, source: OverrideSource, key: &'static str, slot: &mut T, to: T)
where
    T: PartialEq + Display,
{
    if *slot == to {
        return;
    }
    let from = slot.to_string();
    let to_s = to.to_string();
    *slot = to;
    report.overrides.push(ConfigOverride {
        key,
        source,
        from,
        to: to_s,
    });
}

fn apply_parsed<T>(
    report: &mut ConfigLoadReport,
    source: OverrideSource,
    key: &'static str,
    slot: &mut T,
    raw: &str,
) where
    T: PartialEq + Display + FromStr,
{
    match raw.trim().parse::<T>() {
        Ok(v) => apply(report, source, key, slot, v),
        Err(_) => ignored(report, source, key, slot.to_string(), raw),
    }
}

fn apply_flag(
    report: &mut ConfigLoadReport,
    source: OverrideSource,
    key: &'static str,
    slot: &mut bool,
    raw: &str,
) {
    match parse_flag(raw) {
        Some(v) => apply(report, source, key, slot, v),
        None => ignored(report, source, key, slot.to_string(), raw),
    }
}

fn ignored(report: &mut ConfigLoadReport, source: OverrideSource, key: &'static str, from: String, raw: &str) {
    report.overrides.push(ConfigOverride {
        key,
        source,
        from,
        to: format!("ignored (invalid value {raw:?})"),
    });
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn resolve_config_file(paths: &ConfigPaths, raw: &Path) -> Option<(PathBuf, ConfigResolvedFrom)> {
    if raw.is_absolute() {
        return raw
            .is_file()
            .then(|| (raw.to_path_buf(), ConfigResolvedFrom::Absolute));
    }

    if let Ok(cwd) = std::env::current_dir() {
        let p = cwd.join(raw);
        if p.is_file() {
            return Some((p, ConfigResolvedFrom::Cwd));
        }
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let p = dir.join(raw);
            if p.is_file() {
                return Some((p, ConfigResolvedFrom::ExeDir));
            }
        }
    }

    if let Some(root) = paths.root_dir.as_deref() {
        let p = root.join(raw);
        if p.is_file() {
            return Some((p, ConfigResolvedFrom::RootDir));
        }
    }

    None
}
