//! Drift-correction policy.
//!
//! Audio and video run on independent threads and inevitably drift apart.
//! The correction is asymmetric because a sleep cannot be negative: when
//! video leads, the current frame is held on screen longer so audio catches
//! up; when video trails badly, the only way to catch up is to skip forward.
//!
//! The planner is pure arithmetic over one iteration's measurements, which
//! keeps the policy testable without threads or clocks.

use std::time::Duration;

/// Video this many frames behind audio (exclusive) triggers a catch-up skip
/// instead of a timing adjustment.
pub const CATCH_UP_LAG_FRAMES: i64 = 10;

/// Default hard ceiling on a single sleep. Shutdown races can spike the
/// measured drift to absurd values; the ceiling bounds the damage.
pub const DEFAULT_MAX_SLEEP: Duration = Duration::from_millis(3000);

/// One iteration's timing decision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationPlan {
    /// How long to keep the current frame on screen, if at all. `None`
    /// means proceed immediately: either the budget is already spent or the
    /// computed sleep tripped the ceiling.
    pub sleep: Option<Duration>,
    /// Frames to skip forward to close a large lag. Zero in the normal case.
    pub skip_forward: i64,
    /// The computed sleep in milliseconds before the ceiling check, for
    /// diagnostics. Negative when rendering overran the frame budget.
    pub sleep_ms: f64,
}

/// Plans the end of one display iteration.
///
/// `drift` is video position minus audio position in frames (positive =
/// video ahead). `av_active` is true only when the source carries both
/// streams; without both there is nothing to correct against and the plan
/// is the plain frame-budget remainder.
pub fn plan_iteration(
    frame_duration: Duration,
    render_time: Duration,
    drift: i64,
    av_active: bool,
    max_sleep: Duration,
) -> IterationPlan {
    let frame_ms = frame_duration.as_secs_f64() * 1000.0;
    let mut sleep_ms = frame_ms - render_time.as_secs_f64() * 1000.0;
    let mut skip_forward = 0;

    if av_active && drift > 0 {
        // Video ahead: hold the frame longer so audio catches up.
        sleep_ms += drift as f64 * frame_ms;
    } else if av_active && drift < -CATCH_UP_LAG_FRAMES {
        // Video far behind: jump half the gap and go straight to the next
        // frame. Halving rather than closing fully avoids a visible seek.
        skip_forward = (-drift) / 2;
        sleep_ms = 0.0;
    }

    let sleep = (sleep_ms > 0.0 && sleep_ms < max_sleep.as_secs_f64() * 1000.0)
        .then(|| Duration::from_secs_f64(sleep_ms / 1000.0));

    IterationPlan {
        sleep,
        skip_forward,
        sleep_ms,
    }
}
