use crate::config::SchedulerConfig;
use crate::diagnostics::{DiagnosticsRegistry, TaskDiagnostic};
use crate::entry::{Entry, Slot};
use crate::error::{SchedError, SchedResult};
use crate::handle::TaskHandle;
use crate::invariants::{bad_state, require};
use crate::observer::{RegisterRecord, RetireReason, SchedulerObserver};
use crate::pool::{Pool, PoolStats};
use crate::scheduled::{Scheduled, TickCtx};
use crate::time::TimeSource;

use log::{debug, trace, warn};
use std::panic::Location;
use std::time::Duration;

/// Request against the entry whose `tick` is on the stack. Applied once it returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Deferred {
    Cancel,
    Pause,
    Resume,
    Unregister,
}

struct CurrentTick {
    id: u64,
    deferred: Vec<Deferred>,
    cancel_requested: bool,
}

#[derive(Debug, Clone, Copy)]
enum Place {
    Running(usize),
    Pending(usize),
}

/// Registry that owns every scheduled operation and advances them once per tick.
///
/// Registration while a pass is running ("gate closed") lands in a pending buffer that is
/// flushed at the start of the next [`advance`](Scheduler::advance), so an operation never runs
/// in the tick it was created. Removing a running entry mid-pass is deferred to the sweep at the
/// end of the pass; pending entries are never walked and are removed right away.
///
/// Handle lookups are linear scans over the running and pending sets. Populations in the low
/// hundreds are expected; `population_warn_threshold` logs when that is exceeded.
pub struct Scheduler {
    config: SchedulerConfig,
    clock: Box<dyn TimeSource>,

    running: Vec<Box<Entry>>,
    pending: Vec<Box<Entry>>,
    pool: Pool<Entry>,

    // Starts at 1; 0 is the invalid handle.
    next_id: u64,
    gate_open: bool,
    torn_down: bool,
    current: Option<CurrentTick>,

    now: Duration,
    dt: Duration,
    tick_index: u64,

    observers: Vec<Box<dyn SchedulerObserver>>,
    diagnostics: Option<DiagnosticsRegistry>,
    population_warned: bool,
}

impl Scheduler {
    #[inline]
    pub fn new<C: TimeSource + 'static>(clock: C) -> Self {
        Self::with_config(SchedulerConfig::default(), clock)
    }

    pub fn with_config<C: TimeSource + 'static>(config: SchedulerConfig, clock: C) -> Self {
        let now = clock.now();
        let mut scheduler = Self {
            running: Vec::with_capacity(config.running_capacity),
            pending: Vec::with_capacity(config.pending_capacity),
            pool: Pool::new(config.pool_max_retained),
            clock: Box::new(clock),
            next_id: 1,
            gate_open: true,
            torn_down: false,
            current: None,
            now,
            dt: Duration::ZERO,
            tick_index: 0,
            observers: Vec::new(),
            diagnostics: None,
            population_warned: false,
            config,
        };
        if scheduler.config.diagnostics {
            scheduler.attach_diagnostics();
        }
        scheduler
    }

    #[inline]
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /* ============================
       Registration
       ============================ */

    /// Registers an operation and returns its handle.
    ///
    /// After [`teardown`](Scheduler::teardown) the operation is disposed immediately and
    /// [`TaskHandle::INVALID`] is returned.
    #[inline]
    #[track_caller]
    pub fn register<S: Scheduled>(&mut self, op: S) -> TaskHandle {
        self.register_boxed(Box::new(op))
    }

    #[inline]
    #[track_caller]
    pub fn register_boxed(&mut self, op: Box<dyn Scheduled>) -> TaskHandle {
        self.try_register_boxed(op).unwrap_or(TaskHandle::INVALID)
    }

    /// Like [`register`](Scheduler::register), but reports a torn-down scheduler as an error.
    #[inline]
    #[track_caller]
    pub fn try_register<S: Scheduled>(&mut self, op: S) -> SchedResult<TaskHandle> {
        self.try_register_boxed(Box::new(op))
    }

    #[track_caller]
    pub fn try_register_boxed(&mut self, mut op: Box<dyn Scheduled>) -> SchedResult<TaskHandle> {
        let location = Location::caller();

        if self.torn_down {
            warn!(
                "scheduler: '{}' registered after teardown at {location}; disposing it",
                op.label()
            );
            op.dispose();
            return Err(SchedError::ShutDown);
        }

        let id = self.next_id;
        self.next_id += 1;

        let registered_at = self.clock.now();
        let label = op.label();

        let mut entry = self.pool.get();
        require(
            entry.id == 0 && matches!(entry.slot, Slot::Vacant),
            "pooled entry handed out without reset",
        );
        entry.id = id;
        entry.timestamp = registered_at;
        entry.slot = Slot::Live(op);

        let deferred = !self.gate_open;
        if deferred {
            self.pending.push(entry);
        } else {
            self.running.push(entry);
        }

        let handle = TaskHandle::from_id(id);
        debug!("scheduler: registered {handle} '{label}' deferred={deferred} at {location}");

        let record = RegisterRecord {
            handle,
            label,
            registered_at,
            location,
            deferred,
        };
        for observer in self.observers.iter_mut() {
            observer.on_registered(&record);
        }

        self.check_population();
        Ok(handle)
    }

    /// Removes an entry without running its cancel hook and hands the operation back.
    ///
    /// Returns `None` for stale handles, and for the operation currently inside its own `tick`
    /// (that one is disposed right after the tick returns).
    pub fn unregister(&mut self, handle: TaskHandle) -> Option<Box<dyn Scheduled>> {
        let place = self.find(handle)?;

        if self.is_ticking(place) {
            debug!("scheduler: {handle} unregistered from inside its own tick");
            self.defer(Deferred::Unregister);
            return None;
        }

        let op = if self.can_remove_now(place) {
            let mut entry = self.remove(place);
            let op = entry.take_op();
            self.pool.release(entry);
            op
        } else {
            // Vacated in place; the sweep reclaims the wrapper.
            self.entry_mut(place).take_op()
        };

        debug!("scheduler: unregistered {handle}");
        self.notify_retired(handle, RetireReason::Unregistered);
        op
    }

    /* ============================
       Tick
       ============================ */

    /// Advances every running operation by one tick.
    ///
    /// Must be called exactly once per host tick and never from inside a `tick`.
    pub fn advance(&mut self) {
        require(self.gate_open, "Scheduler::advance re-entered during an advance pass");
        if self.torn_down {
            return;
        }

        let now = self.clock.now();
        if now < self.now {
            warn!(
                "scheduler: time source went backwards ({:?} -> {:?}); treating as zero dt",
                self.now, now
            );
            self.dt = Duration::ZERO;
        } else {
            self.dt = now - self.now;
            self.now = now;
        }
        self.tick_index += 1;

        self.gate_open = false;

        if !self.pending.is_empty() {
            self.running.append(&mut self.pending);
        }

        let len = self.running.len();
        for index in 0..len {
            self.tick_entry(index);
        }
        require(
            self.running.len() == len,
            "running set resized during an advance pass",
        );

        self.gate_open = true;

        if self.torn_down {
            self.finish_teardown();
            return;
        }

        self.sweep();

        trace!(
            "scheduler: tick {} dt={:?} running={} pending={}",
            self.tick_index,
            self.dt,
            self.running.len(),
            self.pending.len()
        );
    }

    fn tick_entry(&mut self, index: usize) {
        let entry = &mut self.running[index];

        let ready = matches!(&entry.slot, Slot::Live(op) if !op.is_done());
        if !ready {
            return;
        }

        let Slot::Live(mut op) = std::mem::replace(&mut entry.slot, Slot::Ticking) else {
            bad_state("entry slot changed between check and take");
        };
        let id = entry.id;
        let registered_at = entry.timestamp;

        self.current = Some(CurrentTick {
            id,
            deferred: Vec::new(),
            cancel_requested: false,
        });

        op.tick(&mut TickCtx::new(self, TaskHandle::from_id(id), registered_at));

        let deferred = match self.current.take() {
            Some(current) if current.id == id => current.deferred,
            _ => bad_state("current tick record lost during tick"),
        };

        let mut keep = true;
        let mut cancelled = false;
        for request in deferred {
            match request {
                Deferred::Cancel => {
                    if !op.is_done() {
                        op.cancel();
                        cancelled = true;
                    }
                }
                Deferred::Pause => op.pause(),
                Deferred::Resume => op.resume(),
                Deferred::Unregister => keep = false,
            }
        }

        let entry = &mut self.running[index];
        entry.cancelled |= cancelled;

        if keep {
            entry.slot = Slot::Live(op);
        } else {
            entry.slot = Slot::Vacant;
            op.dispose();
            self.notify_retired(TaskHandle::from_id(id), RetireReason::Unregistered);
        }
    }

    /// Reverse walk so removal by index never shifts entries not yet visited.
    fn sweep(&mut self) {
        for index in (0..self.running.len()).rev() {
            if !self.running[index].is_retired() {
                continue;
            }
            let entry = self.running.remove(index);
            let reason = retire_reason(&entry);
            self.retire(entry, reason);
        }

        if self.population_warned && self.len() <= self.config.population_warn_threshold {
            self.population_warned = false;
        }
    }

    /* ============================
       Control
       ============================ */

    /// Cancels the operation behind `handle`. Returns `false` for stale handles.
    ///
    /// The cancel hook runs synchronously. Mid-pass, removal of a running entry waits for the
    /// sweep, so the handle stays valid until the end of the current tick. Entries registered
    /// during the pass are removed immediately. Cancelling the operation that is currently
    /// inside its own `tick` takes effect as soon as that `tick` returns.
    pub fn cancel(&mut self, handle: TaskHandle) -> bool {
        let Some(place) = self.find(handle) else {
            return false;
        };

        if self.is_ticking(place) {
            self.defer(Deferred::Cancel);
            debug!("scheduler: cancel {handle} deferred until its tick returns");
            return true;
        }

        self.entry_mut(place).cancel();
        debug!("scheduler: cancelled {handle}");

        if self.can_remove_now(place) {
            let entry = self.remove(place);
            let reason = retire_reason(&entry);
            self.retire(entry, reason);
        }
        true
    }

    pub fn pause(&mut self, handle: TaskHandle) -> bool {
        self.control(handle, Deferred::Pause)
    }

    pub fn resume(&mut self, handle: TaskHandle) -> bool {
        self.control(handle, Deferred::Resume)
    }

    fn control(&mut self, handle: TaskHandle, request: Deferred) -> bool {
        let Some(place) = self.find(handle) else {
            return false;
        };

        if self.is_ticking(place) {
            self.defer(request);
            return true;
        }

        if let Some(op) = self.entry_mut(place).op_mut() {
            match request {
                Deferred::Pause => op.pause(),
                Deferred::Resume => op.resume(),
                _ => bad_state("control() only handles pause/resume"),
            }
        }
        true
    }

    /// Pauses every operation in the running set.
    pub fn pause_all(&mut self) {
        self.broadcast(Deferred::Pause);
    }

    /// Resumes every operation in the running set.
    pub fn resume_all(&mut self) {
        self.broadcast(Deferred::Resume);
    }

    fn broadcast(&mut self, request: Deferred) {
        let mut current = false;
        for entry in self.running.iter_mut() {
            match &mut entry.slot {
                Slot::Live(op) => match request {
                    Deferred::Pause => op.pause(),
                    Deferred::Resume => op.resume(),
                    _ => bad_state("broadcast() only handles pause/resume"),
                },
                Slot::Ticking => current = true,
                Slot::Vacant => {}
            }
        }
        if current {
            self.defer(request);
        }
    }

    /// Cancels every running operation and discards the pending buffer.
    ///
    /// Pending operations are never advanced. Calling this twice in a row is harmless:
    /// operations that are already done are not cancelled again.
    pub fn cancel_all(&mut self) {
        let cancelled = self.cancel_running();
        debug!(
            "scheduler: cancel_all ({cancelled} running, {} pending)",
            self.pending.len()
        );

        if self.gate_open {
            let mut running = std::mem::take(&mut self.running);
            for entry in running.drain(..) {
                let reason = retire_reason(&entry);
                self.retire(entry, reason);
            }
            self.running = running;
        }

        self.discard_pending(RetireReason::Discarded);
    }

    /// Cancels every live running entry; returns how many were visited.
    fn cancel_running(&mut self) -> usize {
        let mut current = false;
        let mut n = 0usize;
        for entry in self.running.iter_mut() {
            match entry.slot {
                Slot::Ticking => current = true,
                Slot::Live(_) => entry.cancel(),
                Slot::Vacant => continue,
            }
            n += 1;
        }
        if current {
            self.defer(Deferred::Cancel);
        }
        n
    }

    fn discard_pending(&mut self, reason: RetireReason) {
        let mut pending = std::mem::take(&mut self.pending);
        for mut entry in pending.drain(..) {
            entry.cancel();
            self.retire(entry, reason);
        }
        self.pending = pending;
    }

    /// Cancels and disposes everything, then rejects all further registrations.
    ///
    /// Idempotent. Called from inside a `tick`, the running set is released once the pass
    /// unwinds.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;

        debug!(
            "scheduler: teardown ({} running, {} pending)",
            self.running.len(),
            self.pending.len()
        );

        self.cancel_running();
        self.discard_pending(RetireReason::TornDown);

        if self.gate_open {
            self.finish_teardown();
        }
    }

    fn finish_teardown(&mut self) {
        let running = std::mem::take(&mut self.running);
        for entry in running {
            self.retire(entry, RetireReason::TornDown);
        }
        for observer in self.observers.iter_mut() {
            observer.on_teardown();
        }
        self.pool.clear();
    }

    /* ============================
       Lookup
       ============================ */

    #[inline]
    pub fn is_valid(&self, handle: TaskHandle) -> bool {
        self.find(handle).is_some()
    }

    /// The operation behind `handle`.
    ///
    /// `None` for stale handles and for the operation currently inside its own `tick`.
    pub fn try_get(&self, handle: TaskHandle) -> Option<&dyn Scheduled> {
        let place = self.find(handle)?;
        self.entry(place).op()
    }

    pub fn try_get_mut(&mut self, handle: TaskHandle) -> Option<&mut (dyn Scheduled + 'static)> {
        let place = self.find(handle)?;
        self.entry_mut(place).op_mut()
    }

    /// Whether the operation finished but has not been swept yet. `false` for stale handles.
    #[inline]
    pub fn is_done(&self, handle: TaskHandle) -> bool {
        self.try_get(handle).is_some_and(|op| op.is_done())
    }

    /// Number of tracked entries (running and pending).
    #[inline]
    pub fn len(&self) -> usize {
        self.running.len() + self.pending.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn running_len(&self) -> usize {
        self.running.len()
    }

    #[inline]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    #[inline]
    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Whether an advance pass is running.
    #[inline]
    pub fn is_advancing(&self) -> bool {
        !self.gate_open
    }

    /// Logical time of the last tick.
    #[inline]
    pub fn now(&self) -> Duration {
        self.now
    }

    #[inline]
    pub fn dt(&self) -> Duration {
        self.dt
    }

    #[inline]
    pub fn tick_index(&self) -> u64 {
        self.tick_index
    }

    /// Whether the operation inside its own `tick` has asked to be cancelled.
    #[inline]
    pub(crate) fn current_cancel_requested(&self) -> bool {
        self.current.as_ref().is_some_and(|c| c.cancel_requested)
    }

    #[inline]
    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /* ============================
       Diagnostics
       ============================ */

    pub fn add_observer(&mut self, observer: Box<dyn SchedulerObserver>) {
        self.observers.push(observer);
    }

    /// Installs a call-site registry (once) and returns a handle to it.
    pub fn attach_diagnostics(&mut self) -> DiagnosticsRegistry {
        if let Some(existing) = &self.diagnostics {
            return existing.clone();
        }
        let registry = DiagnosticsRegistry::new();
        self.observers.push(Box::new(registry.clone()));
        self.diagnostics = Some(registry.clone());
        registry
    }

    #[inline]
    pub fn diagnostics_registry(&self) -> Option<&DiagnosticsRegistry> {
        self.diagnostics.as_ref()
    }

    /// Snapshot of every tracked operation, running set first.
    pub fn diagnostics(&self) -> Vec<TaskDiagnostic> {
        let now = self.clock.now();
        let running = self.running.iter().map(|e| (e, false));
        let pending = self.pending.iter().map(|e| (e, true));

        running
            .chain(pending)
            .filter_map(|(entry, pending)| {
                let (label, paused, done) = match &entry.slot {
                    Slot::Live(op) => (op.label(), op.is_paused(), op.is_done()),
                    Slot::Ticking => ("(advancing)", false, false),
                    Slot::Vacant => return None,
                };
                Some(TaskDiagnostic {
                    handle: TaskHandle::from_id(entry.id),
                    label,
                    elapsed: now.saturating_sub(entry.timestamp),
                    paused,
                    done,
                    pending,
                })
            })
            .collect()
    }

    /* ============================
       Internals
       ============================ */

    fn find(&self, handle: TaskHandle) -> Option<Place> {
        if handle.is_invalid() {
            return None;
        }
        let id = handle.id();
        if let Some(i) = self.running.iter().position(|e| is_tracked(e, id)) {
            return Some(Place::Running(i));
        }
        self.pending
            .iter()
            .position(|e| is_tracked(e, id))
            .map(Place::Pending)
    }

    #[inline]
    fn entry(&self, place: Place) -> &Entry {
        match place {
            Place::Running(i) => &self.running[i],
            Place::Pending(i) => &self.pending[i],
        }
    }

    #[inline]
    fn entry_mut(&mut self, place: Place) -> &mut Entry {
        match place {
            Place::Running(i) => &mut self.running[i],
            Place::Pending(i) => &mut self.pending[i],
        }
    }

    #[inline]
    fn remove(&mut self, place: Place) -> Box<Entry> {
        match place {
            Place::Running(i) => self.running.remove(i),
            Place::Pending(i) => self.pending.remove(i),
        }
    }

    #[inline]
    fn is_ticking(&self, place: Place) -> bool {
        matches!(self.entry(place).slot, Slot::Ticking)
    }

    /// The running set is being walked while the gate is closed; the pending buffer never is.
    #[inline]
    fn can_remove_now(&self, place: Place) -> bool {
        self.gate_open || matches!(place, Place::Pending(_))
    }

    fn defer(&mut self, request: Deferred) {
        match self.current.as_mut() {
            Some(current) => {
                current.cancel_requested |= request == Deferred::Cancel;
                current.deferred.push(request);
            }
            None => bad_state("ticking entry without a current tick record"),
        }
    }

    fn retire(&mut self, mut entry: Box<Entry>, reason: RetireReason) {
        require(
            !matches!(entry.slot, Slot::Ticking),
            "retiring an entry while it is being advanced",
        );

        let handle = TaskHandle::from_id(entry.id);
        // Vacant entries were reported when they were unregistered.
        if let Some(mut op) = entry.take_op() {
            op.dispose();
            self.notify_retired(handle, reason);
        }
        self.pool.release(entry);
    }

    fn notify_retired(&mut self, handle: TaskHandle, reason: RetireReason) {
        for observer in self.observers.iter_mut() {
            observer.on_retired(handle, reason);
        }
    }

    fn check_population(&mut self) {
        let population = self.len();
        if !self.population_warned && population > self.config.population_warn_threshold {
            self.population_warned = true;
            warn!(
                "scheduler: {population} live operations exceed the lookup ceiling of {}; handle lookups are linear",
                self.config.population_warn_threshold
            );
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[inline]
fn is_tracked(entry: &Entry, id: u64) -> bool {
    entry.id == id && !matches!(entry.slot, Slot::Vacant)
}

#[inline]
fn retire_reason(entry: &Entry) -> RetireReason {
    if entry.cancelled {
        RetireReason::Cancelled
    } else {
        RetireReason::Completed
    }
}
