use log::{info, warn};
use std::time::Duration;

use newengine_core::sched::{Ease, FrameCounter, TaskHandle};
use newengine_core::startup::ConfigLoadReport;
use newengine_core::{
    Bus, ConfigLoader, ConfigPaths, Engine, EngineResult, Module, ModuleCtx, ShutdownToken,
};
use newengine_modules_logging::{ConsoleLoggerConfig, ConsoleLoggerModule};

#[derive(Debug, Clone)]
enum DemoEvent {
    Greeting,
    Heartbeat(u32),
    Faded(f32),
    Snapshot(String),
}

/// Drives a handful of scheduled operations and reports what they post on the bus.
struct DemoModule {
    heartbeat: TaskHandle,
}

impl DemoModule {
    #[inline]
    fn new() -> Self {
        Self {
            heartbeat: TaskHandle::INVALID,
        }
    }
}

impl Module<DemoEvent> for DemoModule {
    fn id(&self) -> &'static str {
        "sched-demo"
    }

    fn start(&mut self, ctx: &mut ModuleCtx<'_, DemoEvent>) -> EngineResult<()> {
        let bus = ctx.bus().clone();
        ctx.scheduler()
            .delay(Duration::from_secs(1), move |_| bus.send(DemoEvent::Greeting));

        let bus = ctx.bus().clone();
        let mut beats = 0u32;
        self.heartbeat = ctx.scheduler().every(Duration::from_millis(500), move |_| {
            beats += 1;
            bus.send(DemoEvent::Heartbeat(beats));
        });

        let bus = ctx.bus().clone();
        ctx.scheduler().tween(
            0.0,
            1.0,
            Duration::from_secs(2),
            Ease::InOutQuad,
            move |_, v| {
                if v >= 1.0 {
                    bus.send(DemoEvent::Faded(v));
                }
            },
        );

        let bus = ctx.bus().clone();
        ctx.schedule(FrameCounter::new(30, move |tick| {
            let snapshot = tick
                .scheduler()
                .diagnostics()
                .iter()
                .map(|d| format!("{}={}", d.handle, d.label))
                .collect::<Vec<_>>()
                .join(", ");
            bus.send(DemoEvent::Snapshot(snapshot));
        }))?;

        // Stop the heartbeat after three seconds, then leave half a second later.
        let heartbeat = self.heartbeat;
        let token = ctx.shutdown_token();
        ctx.scheduler().delay(Duration::from_secs(3), move |tick| {
            tick.cancel(heartbeat);
            let token = token.clone();
            tick.scheduler()
                .delay(Duration::from_millis(500), move |_| token.request());
        });

        Ok(())
    }

    fn update(&mut self, ctx: &mut ModuleCtx<'_, DemoEvent>) -> EngineResult<()> {
        let frame = ctx.frame().map(|f| f.frame_index).unwrap_or_default();
        while let Some(ev) = ctx.bus().try_recv() {
            match ev {
                DemoEvent::Greeting => info!("frame {frame}: one second of logical time has passed"),
                DemoEvent::Heartbeat(n) => info!("frame {frame}: heartbeat #{n}"),
                DemoEvent::Faded(v) => info!("frame {frame}: tween finished at {v}"),
                DemoEvent::Snapshot(s) => info!("frame {frame}: live operations [{s}]"),
            }
        }
        Ok(())
    }

    fn shutdown(&mut self, ctx: &mut ModuleCtx<'_, DemoEvent>) -> EngineResult<()> {
        let live = ctx.scheduler().len();
        info!(
            "sched-demo: {live} operation(s) still scheduled, heartbeat {} valid={}",
            self.heartbeat,
            self.heartbeat.is_valid(ctx.scheduler())
        );

        if let Some(registry) = ctx.scheduler().diagnostics_registry() {
            match registry.to_json() {
                Ok(json) => info!("sched-demo: call sites {json}"),
                Err(e) => warn!("sched-demo: diagnostics export failed: {e}"),
            }
        }
        Ok(())
    }
}

fn log_report(report: &ConfigLoadReport) {
    match report.used_file() {
        Some(path) => info!("config: loaded {}", path.display()),
        None => info!("config: defaults"),
    }
    for o in &report.overrides {
        info!("config: {} {} -> {} ({:?})", o.key, o.from, o.to, o.source);
    }
}

fn main() -> anyhow::Result<()> {
    let (config, report) = ConfigLoader::load_json(&ConfigPaths::default())?;

    let shutdown = ShutdownToken::new();
    {
        let token = shutdown.clone();
        ctrlc::set_handler(move || token.request())?;
    }

    let frame_time = Duration::from_millis(u64::from(config.fixed_dt_ms.max(1)));
    let logger = ConsoleLoggerConfig::from(&config.log);

    let mut engine: Engine<DemoEvent> = Engine::new(config, Bus::unbounded(), shutdown);
    engine.register_module(Box::new(ConsoleLoggerModule::new(logger)))?;
    engine.register_module(Box::new(DemoModule::new()))?;

    engine.start()?;
    log_report(&report);

    engine.run(frame_time)?;
    Ok(())
}
