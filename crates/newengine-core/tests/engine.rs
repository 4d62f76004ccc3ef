use newengine_core::sched::{SchedError, Timer};
use newengine_core::{
    Bus, Engine, EngineConfig, EngineError, EngineResult, Module, ModuleCtx, ModuleStage,
    SchedulerTickPhase, ShutdownToken,
};

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
enum Ev {
    Fired(u64),
}

fn engine(config: EngineConfig) -> Engine<Ev> {
    Engine::new(config, Bus::unbounded(), ShutdownToken::new())
}

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

/// Schedules a one-frame wait on start and logs bus events seen during `update`.
struct Waiter {
    seen: Arc<Mutex<Vec<(u64, Ev)>>>,
}

impl Module<Ev> for Waiter {
    fn id(&self) -> &'static str {
        "waiter"
    }

    fn start(&mut self, ctx: &mut ModuleCtx<'_, Ev>) -> EngineResult<()> {
        let bus = ctx.bus().clone();
        ctx.scheduler()
            .wait_frames(1, move |tick| bus.send(Ev::Fired(tick.tick_index())));
        Ok(())
    }

    fn update(&mut self, ctx: &mut ModuleCtx<'_, Ev>) -> EngineResult<()> {
        let frame = ctx.frame().map(|f| f.frame_index).unwrap_or_default();
        let mut events = Vec::new();
        ctx.bus().drain_into(&mut events);
        let mut seen = self.seen.lock().unwrap();
        seen.extend(events.into_iter().map(|ev| (frame, ev)));
        Ok(())
    }
}

fn run_waiter(phase: SchedulerTickPhase) -> Vec<(u64, Ev)> {
    let seen: Arc<Mutex<Vec<(u64, Ev)>>> = Arc::default();
    let mut e = engine(EngineConfig {
        tick_phase: phase,
        ..EngineConfig::default()
    });
    e.register_module(Box::new(Waiter { seen: seen.clone() })).unwrap();

    for _ in 0..3 {
        e.step_dt(ms(16)).unwrap();
    }
    e.shutdown().unwrap();

    let out = seen.lock().unwrap().clone();
    out
}

#[test]
fn begin_frame_callbacks_are_visible_to_the_same_frame() {
    assert_eq!(run_waiter(SchedulerTickPhase::BeginFrame), vec![(0, Ev::Fired(1))]);
}

#[test]
fn end_frame_callbacks_are_visible_to_the_next_frame() {
    assert_eq!(run_waiter(SchedulerTickPhase::EndFrame), vec![(1, Ev::Fired(1))]);
}

/// Records the scheduler tick seen by every stage.
struct StageRecorder {
    fixed: Arc<AtomicU32>,
    ticks: Arc<Mutex<Vec<(ModuleStage, u64)>>>,
}

impl StageRecorder {
    fn record(&self, ctx: &ModuleCtx<'_, Ev>, stage: ModuleStage) {
        if let Some(frame) = ctx.frame() {
            self.ticks.lock().unwrap().push((stage, frame.sched_tick));
        }
    }
}

impl Module<Ev> for StageRecorder {
    fn id(&self) -> &'static str {
        "stage-recorder"
    }

    fn fixed_update(&mut self, ctx: &mut ModuleCtx<'_, Ev>) -> EngineResult<()> {
        self.fixed.fetch_add(1, Ordering::SeqCst);
        self.record(ctx, ModuleStage::FixedUpdate);
        Ok(())
    }

    fn update(&mut self, ctx: &mut ModuleCtx<'_, Ev>) -> EngineResult<()> {
        self.record(ctx, ModuleStage::Update);
        Ok(())
    }

    fn render(&mut self, ctx: &mut ModuleCtx<'_, Ev>) -> EngineResult<()> {
        self.record(ctx, ModuleStage::Render);
        Ok(())
    }
}

#[test]
fn scheduler_advances_once_per_frame_regardless_of_fixed_steps() {
    let fixed = Arc::new(AtomicU32::new(0));
    let ticks: Arc<Mutex<Vec<(ModuleStage, u64)>>> = Arc::default();

    let mut e = engine(EngineConfig {
        fixed_dt_ms: 10,
        ..EngineConfig::default()
    });
    e.register_module(Box::new(StageRecorder {
        fixed: fixed.clone(),
        ticks: ticks.clone(),
    }))
    .unwrap();

    let frame = e.step_dt(ms(35)).unwrap();
    assert_eq!(frame.fixed_step_count, 3);
    assert_eq!(fixed.load(Ordering::SeqCst), 3);
    assert_eq!(e.scheduler().tick_index(), 1);
    assert!(ticks.lock().unwrap().iter().all(|&(_, tick)| tick == 1));

    e.step_dt(Duration::ZERO).unwrap();
    assert_eq!(e.scheduler().tick_index(), 2);
    assert_eq!(e.frame_index(), 2);
}

#[test]
fn frame_delta_is_clamped_before_reaching_the_scheduler() {
    let mut e = engine(EngineConfig::default());
    let frame = e.step_dt(Duration::from_secs(10)).unwrap();

    assert_eq!(e.clock().now(), ms(250));
    assert_eq!(e.scheduler().dt(), ms(250));
    assert!(frame.fixed_step_count <= 8);
}

/// Starts a delay on the engine clock and stops the engine when it fires.
struct Stopper;

impl Module<Ev> for Stopper {
    fn id(&self) -> &'static str {
        "stopper"
    }

    fn start(&mut self, ctx: &mut ModuleCtx<'_, Ev>) -> EngineResult<()> {
        let token = ctx.shutdown_token();
        ctx.schedule(Timer::after(ms(100), move |_| token.request()))?;
        Ok(())
    }
}

#[test]
fn scheduled_callback_can_stop_the_engine() {
    let mut e = engine(EngineConfig::default());
    e.register_module(Box::new(Stopper)).unwrap();

    assert!(e.step_dt(ms(50)).is_ok());
    assert!(matches!(e.step_dt(ms(50)), Err(EngineError::ExitRequested)));
    assert!(e.exit_requested());

    e.shutdown().unwrap();
    assert!(e.scheduler().is_torn_down());
}

struct Ordered {
    id: &'static str,
    log: Arc<Mutex<Vec<String>>>,
}

impl Module<Ev> for Ordered {
    fn id(&self) -> &'static str {
        self.id
    }

    fn start(&mut self, ctx: &mut ModuleCtx<'_, Ev>) -> EngineResult<()> {
        ctx.scheduler().every(ms(10), |_| {});
        Ok(())
    }

    fn shutdown(&mut self, ctx: &mut ModuleCtx<'_, Ev>) -> EngineResult<()> {
        let live = ctx.scheduler().len();
        self.log.lock().unwrap().push(format!("{}:{live}", self.id));
        Ok(())
    }
}

#[test]
fn shutdown_runs_in_reverse_then_tears_down_the_scheduler() {
    let log: Arc<Mutex<Vec<String>>> = Arc::default();
    let mut e = engine(EngineConfig::default());
    for id in ["first", "second"] {
        e.register_module(Box::new(Ordered { id, log: log.clone() }))
            .unwrap();
    }

    e.step_dt(ms(16)).unwrap();
    e.shutdown().unwrap();
    e.shutdown().unwrap();

    assert_eq!(*log.lock().unwrap(), vec!["second:2", "first:2"]);
    assert!(e.scheduler().is_torn_down());
    assert!(e.scheduler().is_empty());
    assert!(matches!(e.step_dt(ms(16)), Err(EngineError::ExitRequested)));
}

struct Faulty;

impl Module<Ev> for Faulty {
    fn id(&self) -> &'static str {
        "faulty"
    }

    fn update(&mut self, _ctx: &mut ModuleCtx<'_, Ev>) -> EngineResult<()> {
        Err(EngineError::other("boom"))
    }
}

#[test]
fn module_errors_carry_id_and_stage() {
    let mut e = engine(EngineConfig::default());
    e.register_module(Box::new(Faulty)).unwrap();

    let err = e.step_dt(ms(16)).unwrap_err();
    assert!(matches!(
        err,
        EngineError::Module {
            module_id: "faulty",
            stage: ModuleStage::Update,
            ..
        }
    ));
    assert_eq!(err.to_string(), "module 'faulty' stage Update: boom");
}

struct StaleCanceller {
    outcome: Arc<Mutex<Option<EngineError>>>,
}

impl Module<Ev> for StaleCanceller {
    fn id(&self) -> &'static str {
        "stale-canceller"
    }

    fn start(&mut self, ctx: &mut ModuleCtx<'_, Ev>) -> EngineResult<()> {
        let h = ctx.scheduler().wait_frames(1, |_| {});
        ctx.cancel(h)?;
        *self.outcome.lock().unwrap() = ctx.cancel(h).err();
        Ok(())
    }
}

#[test]
fn cancelling_a_stale_handle_is_reported() {
    let outcome: Arc<Mutex<Option<EngineError>>> = Arc::default();
    let mut e = engine(EngineConfig::default());
    e.register_module(Box::new(StaleCanceller {
        outcome: outcome.clone(),
    }))
    .unwrap();
    e.start().unwrap();

    let outcome = outcome.lock().unwrap().take();
    assert!(matches!(
        outcome,
        Some(EngineError::Scheduler(SchedError::StaleHandle(_)))
    ));
}

#[test]
fn duplicate_and_late_modules_are_rejected() {
    let mut e = engine(EngineConfig::default());
    e.register_module(Box::new(Faulty)).unwrap();
    assert!(e.register_module(Box::new(Faulty)).is_err());

    e.start().unwrap();
    assert!(e.register_module(Box::new(Stopper)).is_err());
}

#[test]
fn diagnostics_follow_scheduler_config() {
    let mut config = EngineConfig::default();
    config.scheduler.diagnostics = true;
    let mut e = engine(config);

    e.scheduler_mut().delay(ms(500), |_| {});
    let registry = e.diagnostics_registry().expect("diagnostics enabled");
    assert_eq!(registry.len(), 1);
    assert_eq!(e.diagnostics().len(), 1);
}
