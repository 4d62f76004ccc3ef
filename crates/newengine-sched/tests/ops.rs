use newengine_sched::{Ease, FrameCounter, ManualClock, Scheduler, Timer, Tween};

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

const STEP: Duration = Duration::from_millis(250);

struct Rig {
    scheduler: Scheduler,
    clock: ManualClock,
}

impl Rig {
    fn new() -> Self {
        let clock = ManualClock::new();
        Self {
            scheduler: Scheduler::new(clock.clone()),
            clock,
        }
    }

    fn step(&mut self) {
        self.clock.advance(STEP);
        self.scheduler.advance();
    }

    fn steps(&mut self, n: usize) {
        for _ in 0..n {
            self.step();
        }
    }
}

fn counter() -> (Arc<AtomicU32>, impl Fn() -> u32) {
    let c = Arc::new(AtomicU32::new(0));
    let read = {
        let c = c.clone();
        move || c.load(Ordering::SeqCst)
    };
    (c, read)
}

#[test]
fn delay_fires_once_after_its_span() {
    let mut rig = Rig::new();
    let (fired, read) = counter();

    let h = rig.scheduler.delay(Duration::from_secs(1), move |_| {
        fired.fetch_add(1, Ordering::SeqCst);
    });

    rig.steps(3);
    assert_eq!(read(), 0);
    assert!(rig.scheduler.is_valid(h));

    rig.step();
    assert_eq!(read(), 1);
    assert!(!rig.scheduler.is_valid(h));

    rig.steps(4);
    assert_eq!(read(), 1);
}

#[test]
fn every_fires_each_interval_until_cancelled() {
    let mut rig = Rig::new();
    let (fired, read) = counter();

    let h = rig.scheduler.every(Duration::from_millis(500), move |_| {
        fired.fetch_add(1, Ordering::SeqCst);
    });

    rig.steps(6);
    assert_eq!(read(), 3);

    assert!(rig.scheduler.cancel(h));
    rig.steps(4);
    assert_eq!(read(), 3);
    assert!(rig.scheduler.is_empty());
}

#[test]
fn cancelled_timer_never_completes() {
    let mut rig = Rig::new();
    let (fired, read) = counter();

    let h = rig.scheduler.delay(Duration::from_millis(500), move |_| {
        fired.fetch_add(1, Ordering::SeqCst);
    });
    rig.step();
    rig.scheduler.cancel(h);
    rig.steps(4);

    assert_eq!(read(), 0);
}

#[test]
fn paused_timer_does_not_accumulate_time() {
    let mut rig = Rig::new();
    let fired_at: Arc<Mutex<Option<u64>>> = Arc::default();

    let sink = fired_at.clone();
    let h = rig.scheduler.delay(Duration::from_secs(1), move |ctx| {
        *sink.lock() = Some(ctx.tick_index());
    });

    rig.step();
    rig.scheduler.pause(h);
    assert!(rig.scheduler.try_get(h).is_some_and(|op| op.is_paused()));
    rig.steps(2);
    rig.scheduler.resume(h);

    rig.steps(2);
    assert!(fired_at.lock().is_none());

    rig.step();
    assert_eq!(*fired_at.lock(), Some(6));
}

#[test]
fn timer_cancelled_from_its_own_update_skips_completion() {
    let mut rig = Rig::new();
    let (fired, read) = counter();

    rig.scheduler.register(
        Timer::after(STEP, move |_| {
            fired.fetch_add(1, Ordering::SeqCst);
        })
        .on_update(|ctx, _elapsed| {
            let me = ctx.id();
            ctx.cancel(me);
        }),
    );

    rig.step();
    assert_eq!(read(), 0);
    assert!(rig.scheduler.is_empty());
}

#[test]
fn timer_update_reports_elapsed_time() {
    let mut rig = Rig::new();
    let seen: Arc<Mutex<Vec<Duration>>> = Arc::default();

    let sink = seen.clone();
    rig.scheduler
        .register(Timer::new(Duration::from_millis(600)).on_update(move |_, elapsed| sink.lock().push(elapsed)));

    rig.steps(4);
    assert_eq!(
        *seen.lock(),
        vec![
            Duration::from_millis(250),
            Duration::from_millis(500),
            Duration::from_millis(600),
        ]
    );
}

#[test]
fn callback_can_chain_a_follow_up() {
    let mut rig = Rig::new();
    let order: Arc<Mutex<Vec<(&'static str, u64)>>> = Arc::default();

    let sink = order.clone();
    rig.scheduler.delay(STEP, move |ctx| {
        sink.lock().push(("first", ctx.tick_index()));
        let sink = sink.clone();
        ctx.scheduler().wait_frames(1, move |ctx| {
            sink.lock().push(("second", ctx.tick_index()));
        });
    });

    rig.steps(3);
    assert_eq!(*order.lock(), vec![("first", 1), ("second", 2)]);
}

#[test]
fn wait_frames_counts_ticks() {
    let mut rig = Rig::new();
    let (fired, read) = counter();

    rig.scheduler.wait_frames(3, move |_| {
        fired.fetch_add(1, Ordering::SeqCst);
    });

    rig.steps(2);
    assert_eq!(read(), 0);
    rig.step();
    assert_eq!(read(), 1);
    assert!(rig.scheduler.is_empty());
}

#[test]
fn looped_frame_counter_reports_progress() {
    let mut rig = Rig::new();
    let (laps, read_laps) = counter();
    let counts: Arc<Mutex<Vec<u32>>> = Arc::default();

    let sink = counts.clone();
    let h = rig.scheduler.register(
        FrameCounter::new(2, move |_| {
            laps.fetch_add(1, Ordering::SeqCst);
        })
        .on_update(move |_, n| sink.lock().push(n))
        .looped(true),
    );

    rig.steps(5);
    assert_eq!(read_laps(), 2);
    assert_eq!(*counts.lock(), vec![1, 2, 1, 2, 1]);
    assert!(rig.scheduler.is_valid(h));
}

#[test]
fn tween_delivers_eased_values_and_lands_on_target() {
    let mut rig = Rig::new();
    let values: Arc<Mutex<Vec<f32>>> = Arc::default();
    let (done, read_done) = counter();

    let sink = values.clone();
    rig.scheduler.register(
        Tween::new(0.0, 10.0, Duration::from_secs(1), Ease::Linear, move |_, v| {
            sink.lock().push(v)
        })
        .on_complete(move |_| {
            done.fetch_add(1, Ordering::SeqCst);
        }),
    );

    rig.steps(5);
    assert_eq!(*values.lock(), vec![2.5, 5.0, 7.5, 10.0]);
    assert_eq!(read_done(), 1);
    assert!(rig.scheduler.is_empty());
}

#[test]
fn tween_shorthand_with_zero_duration_finishes_on_first_tick() {
    let mut rig = Rig::new();
    let values: Arc<Mutex<Vec<f32>>> = Arc::default();

    let sink = values.clone();
    rig.scheduler
        .tween(3.0, -1.0, Duration::ZERO, Ease::InOutQuad, move |_, v| sink.lock().push(v));

    rig.steps(2);
    assert_eq!(*values.lock(), vec![-1.0]);
}

#[test]
fn timer_on_its_own_clock_ignores_frozen_logical_time() {
    let mut s = Scheduler::new(ManualClock::new());
    let wall = ManualClock::starting_at(Duration::from_secs(10));
    let (fired, read) = counter();

    let h = s.register(
        Timer::new(Duration::from_millis(500))
            .on_clock(wall.clone())
            .on_complete(move |_| {
                fired.fetch_add(1, Ordering::SeqCst);
            }),
    );

    wall.advance(STEP);
    s.advance();
    assert_eq!(read(), 0);
    assert_eq!(s.now(), Duration::ZERO);

    wall.advance(STEP);
    s.advance();
    assert_eq!(read(), 1);
    assert!(!s.is_valid(h));
}

#[test]
fn paused_timer_on_its_own_clock_does_not_count_paused_time() {
    let mut s = Scheduler::new(ManualClock::new());
    let wall = ManualClock::new();
    let (fired, read) = counter();

    let h = s.register(
        Timer::new(Duration::from_millis(500))
            .on_clock(wall.clone())
            .on_complete(move |_| {
                fired.fetch_add(1, Ordering::SeqCst);
            }),
    );

    wall.advance(STEP);
    s.advance();
    s.pause(h);
    for _ in 0..4 {
        wall.advance(STEP);
        s.advance();
    }
    assert_eq!(read(), 0);
    s.resume(h);

    wall.advance(STEP);
    s.advance();
    assert_eq!(read(), 1);
}

#[test]
fn cancel_all_stops_every_kind() {
    let mut rig = Rig::new();
    let (fired, read) = counter();

    for _ in 0..3 {
        let f = fired.clone();
        rig.scheduler.delay(STEP, move |_| {
            f.fetch_add(1, Ordering::SeqCst);
        });
    }
    let f = fired.clone();
    rig.scheduler.wait_frames(1, move |_| {
        f.fetch_add(1, Ordering::SeqCst);
    });
    rig.scheduler
        .tween(0.0, 1.0, STEP, Ease::OutQuad, move |_, _| {
            fired.fetch_add(1, Ordering::SeqCst);
        });

    rig.scheduler.cancel_all();
    rig.steps(2);
    assert_eq!(read(), 0);
}
