use crate::error::{EngineError, EngineResult, ModuleStage};
use crate::frame::Frame;
use crate::module::{Bus, Module, ModuleCtx};
use crate::startup::{EngineConfig, SchedulerTickPhase};
use crate::sync::ShutdownToken;

use log::{debug, info, trace, warn};
use newengine_sched::{DiagnosticsRegistry, ManualClock, Scheduler, TaskDiagnostic};
use std::collections::HashSet;
use std::time::{Duration, Instant};

type Modules<E> = Vec<Box<dyn Module<E>>>;

/// Frame loop host.
///
/// Owns the modules and the single [`Scheduler`]. Each variable frame advances the scheduler
/// exactly once, at the phase selected by [`EngineConfig::tick_phase`]; the scheduler's clock is
/// the engine's accumulated (clamped) frame time.
pub struct Engine<E: Send + 'static> {
    config: EngineConfig,
    fixed_dt: f32,

    modules: Modules<E>,
    module_ids: HashSet<&'static str>,

    bus: Bus<E>,
    clock: ManualClock,
    scheduler: Scheduler,

    shutdown: ShutdownToken,
    exit_requested: bool,

    frame_index: u64,
    fixed_tick: u64,
    started: bool,
    shut_down: bool,
    last: Option<Instant>,
    acc: f32,
}

impl<E: Send + 'static> Engine<E> {
    pub fn new(config: EngineConfig, bus: Bus<E>, shutdown: ShutdownToken) -> Self {
        let clock = ManualClock::new();
        let scheduler = Scheduler::with_config(config.scheduler.clone(), clock.clone());

        Self {
            fixed_dt: config.fixed_dt(),
            config,
            modules: Vec::new(),
            module_ids: HashSet::new(),
            bus,
            clock,
            scheduler,
            shutdown,
            exit_requested: false,
            frame_index: 0,
            fixed_tick: 0,
            started: false,
            shut_down: false,
            last: None,
            acc: 0.0,
        }
    }

    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[inline]
    pub fn bus(&self) -> &Bus<E> {
        &self.bus
    }

    #[inline]
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    #[inline]
    pub fn scheduler_mut(&mut self) -> &mut Scheduler {
        &mut self.scheduler
    }

    /// Logical time fed to the scheduler.
    #[inline]
    pub fn clock(&self) -> &ManualClock {
        &self.clock
    }

    #[inline]
    pub fn diagnostics(&self) -> Vec<TaskDiagnostic> {
        self.scheduler.diagnostics()
    }

    #[inline]
    pub fn diagnostics_registry(&self) -> Option<&DiagnosticsRegistry> {
        self.scheduler.diagnostics_registry()
    }

    #[inline]
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    #[inline]
    pub fn shutdown_token(&self) -> ShutdownToken {
        self.shutdown.clone()
    }

    #[inline]
    pub fn request_exit(&mut self) {
        self.shutdown.request();
        self.exit_requested = true;
    }

    #[inline]
    pub fn exit_requested(&self) -> bool {
        self.is_exit_requested()
    }

    pub fn register_module(&mut self, module: Box<dyn Module<E>>) -> EngineResult<()> {
        let id = module.id();
        if self.started {
            return Err(EngineError::Other(format!("module registered after start: {id}")));
        }
        if !self.module_ids.insert(id) {
            return Err(EngineError::Other(format!("module already registered: {id}")));
        }

        debug!("engine: module registered: {id}");
        self.modules.push(module);
        Ok(())
    }

    /// Runs `init` then `start` on every module. Implied by the first frame.
    pub fn start(&mut self) -> EngineResult<()> {
        if self.started {
            return Ok(());
        }
        self.started = true;
        self.sync_shutdown_state();

        info!(
            "engine: starting {} module(s), fixed_dt={}s, scheduler tick at {}",
            self.modules.len(),
            self.fixed_dt,
            self.config.tick_phase
        );

        self.with_modules(|engine, modules| {
            engine.run_stage(modules, None, ModuleStage::Init)?;
            engine.run_stage(modules, None, ModuleStage::Start)
        })
    }

    /// Runs one frame using the wall-clock time since the previous call.
    pub fn step(&mut self) -> EngineResult<Frame> {
        let now = Instant::now();
        let dt = match self.last.replace(now) {
            Some(last) => now.saturating_duration_since(last),
            None => Duration::ZERO,
        };
        self.step_dt(dt)
    }

    /// Runs one frame of `dt`, clamped to `max_frame_dt`.
    ///
    /// Order: scheduler (begin phase), fixed updates, update, render, scheduler (end phase).
    pub fn step_dt(&mut self, dt: Duration) -> EngineResult<Frame> {
        self.sync_shutdown_state();
        if self.shut_down || self.is_exit_requested() {
            return Err(EngineError::ExitRequested);
        }

        if !self.started {
            self.start()?;
        }

        let dt = dt.min(self.config.max_frame_dt());
        self.clock.advance(dt);

        self.with_modules(|engine, modules| engine.run_frame(modules, dt.as_secs_f32()))
    }

    /// Steps until exit is requested, pacing frames to `target_frame`, then shuts down.
    pub fn run(&mut self, target_frame: Duration) -> EngineResult<()> {
        let result = loop {
            let begin = Instant::now();
            match self.step() {
                Ok(_) => {}
                Err(EngineError::ExitRequested) => break Ok(()),
                Err(e) => break Err(e),
            }
            if let Some(rest) = target_frame.checked_sub(begin.elapsed()) {
                std::thread::sleep(rest);
            }
        };

        let shutdown = self.shutdown();
        result.and(shutdown)
    }

    /// Shuts modules down in reverse order, then tears the scheduler down. Idempotent.
    ///
    /// Every module gets its `shutdown` call even if an earlier one fails; the first failure is
    /// returned.
    pub fn shutdown(&mut self) -> EngineResult<()> {
        if self.shut_down {
            return Ok(());
        }
        self.shut_down = true;

        let mut first_err: Option<EngineError> = None;
        let mut modules = std::mem::take(&mut self.modules);

        for m in modules.iter_mut().rev() {
            let mut ctx = ModuleCtx::new(
                &self.bus,
                &mut self.scheduler,
                &self.shutdown,
                &mut self.exit_requested,
            );

            if let Err(e) = m.shutdown(&mut ctx) {
                let e = EngineError::with_module_stage(m.id(), ModuleStage::Shutdown, e);
                if !e.is_exit() {
                    warn!("engine: {e}");
                    first_err.get_or_insert(e);
                }
            }
        }
        self.modules = modules;

        self.scheduler.teardown();
        info!("engine: shut down after {} frame(s)", self.frame_index);

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn run_frame(&mut self, modules: &mut Modules<E>, dt: f32) -> EngineResult<Frame> {
        if self.config.tick_phase == SchedulerTickPhase::BeginFrame {
            self.advance_scheduler()?;
        }

        let max_steps = self.config.max_fixed_steps();
        self.acc = (self.acc + dt).min(self.fixed_dt * max_steps as f32);

        let mut steps = 0u32;
        let mut rest = self.acc;
        while rest >= self.fixed_dt && steps < max_steps {
            rest -= self.fixed_dt;
            steps += 1;
        }

        for index in 0..steps {
            self.acc -= self.fixed_dt;

            let fixed_frame = Frame {
                frame_index: self.frame_index,
                dt: self.fixed_dt,
                fixed_dt: self.fixed_dt,
                fixed_alpha: 0.0,
                fixed_step_count: steps,
                fixed_step_index: index,
                fixed_tick: self.fixed_tick,
                sched_tick: self.scheduler.tick_index(),
            };

            self.run_stage(modules, Some(&fixed_frame), ModuleStage::FixedUpdate)?;
            self.fixed_tick = self.fixed_tick.wrapping_add(1);
        }

        let frame = Frame {
            frame_index: self.frame_index,
            dt,
            fixed_dt: self.fixed_dt,
            fixed_alpha: (self.acc / self.fixed_dt).clamp(0.0, 0.999_999),
            fixed_step_count: steps,
            fixed_step_index: 0,
            fixed_tick: self.fixed_tick,
            sched_tick: self.scheduler.tick_index(),
        };

        self.run_stage(modules, Some(&frame), ModuleStage::Update)?;
        self.run_stage(modules, Some(&frame), ModuleStage::Render)?;

        if self.config.tick_phase == SchedulerTickPhase::EndFrame {
            self.advance_scheduler()?;
        }

        trace!(
            "engine: frame {} dt={dt:.4} fixed_steps={steps} scheduled={}",
            self.frame_index,
            self.scheduler.len()
        );
        self.frame_index = self.frame_index.wrapping_add(1);
        Ok(frame)
    }

    fn advance_scheduler(&mut self) -> EngineResult<()> {
        self.scheduler.advance();
        self.sync_shutdown_state();
        if self.is_exit_requested() {
            return Err(EngineError::ExitRequested);
        }
        Ok(())
    }

    fn run_stage(
        &mut self,
        modules: &mut [Box<dyn Module<E>>],
        frame: Option<&Frame>,
        stage: ModuleStage,
    ) -> EngineResult<()> {
        for m in modules.iter_mut() {
            self.sync_shutdown_state();

            let mut ctx = ModuleCtx::new(
                &self.bus,
                &mut self.scheduler,
                &self.shutdown,
                &mut self.exit_requested,
            );
            if let Some(frame) = frame {
                ctx.set_frame(frame);
            }

            let r = match stage {
                ModuleStage::Init => m.init(&mut ctx),
                ModuleStage::Start => m.start(&mut ctx),
                ModuleStage::FixedUpdate => m.fixed_update(&mut ctx),
                ModuleStage::Update => m.update(&mut ctx),
                ModuleStage::Render => m.render(&mut ctx),
                ModuleStage::Shutdown => m.shutdown(&mut ctx),
            };
            r.map_err(|e| EngineError::with_module_stage(m.id(), stage, e))?;

            if self.is_exit_requested() {
                return Err(EngineError::ExitRequested);
            }
        }
        Ok(())
    }

    /// Modules are moved out while a stage runs so each gets a context over the engine fields.
    fn with_modules<R>(&mut self, f: impl FnOnce(&mut Self, &mut Modules<E>) -> R) -> R {
        let mut modules = std::mem::take(&mut self.modules);
        let r = f(self, &mut modules);
        self.modules = modules;
        r
    }

    #[inline]
    fn is_exit_requested(&self) -> bool {
        self.exit_requested || self.shutdown.is_requested()
    }

    #[inline]
    fn sync_shutdown_state(&mut self) {
        if self.shutdown.is_requested() {
            self.exit_requested = true;
        }
    }
}
