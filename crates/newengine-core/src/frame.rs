/// Frame timing snapshot.
///
/// Two kinds of frames are handed to modules:
///
/// - **Variable frame**, for `update()` and `render()`. `dt` is the clamped wall-clock delta.
/// - **Fixed subframe**, one per `fixed_update()` step. `dt == fixed_dt`, `fixed_alpha == 0.0`
///   and `fixed_step_index` is the substep within the current variable frame.
///
/// `sched_tick` is the scheduler's tick index as seen by the stage. The scheduler advances
/// exactly once per variable frame, so every stage of a frame observes the same value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    /// Monotonic variable-frame index.
    pub frame_index: u64,

    /// Delta time for this frame in seconds. For fixed subframes this equals `fixed_dt`.
    pub dt: f32,

    pub fixed_dt: f32,

    /// Interpolation factor in `[0..1)` for render smoothing. Always `0.0` for fixed subframes.
    pub fixed_alpha: f32,

    /// Number of fixed substeps executed during this variable frame.
    pub fixed_step_count: u32,

    /// Index of the current fixed substep. Always `0` for variable frames.
    pub fixed_step_index: u32,

    /// Monotonic fixed-tick index; never resets.
    pub fixed_tick: u64,

    pub sched_tick: u64,
}

impl Frame {
    #[inline]
    pub fn is_fixed(&self) -> bool {
        self.dt == self.fixed_dt && self.fixed_alpha == 0.0 && self.fixed_step_count != 0
    }
}
