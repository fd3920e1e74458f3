use crate::animation::ease::Easing;
use crate::foundation::math::{clamp_unit, usable_duration};
use crate::playback::clock::PlaybackClock;
use crate::playback::request::{TransitionOpts, TransitionRequest};
use crate::render::backend::EngineMode;

/// Engine-wide transition defaults applied to unset [`TransitionOpts`] fields.
#[derive(Clone, Debug, Default)]
pub struct TransitionDefaults {
    /// Default transition length in milliseconds.
    pub transition_speed_ms: f64,
    /// Default easing.
    pub easing: Easing,
}

/// Facts about the engine the controller needs for one decision.
#[derive(Clone, Copy, Debug)]
pub struct TargetContext {
    /// Frame-store duration in canvas mode, media duration otherwise.
    pub duration: Option<f64>,
    /// Whether a transition is already in flight.
    pub transition_active: bool,
    /// Current render mode.
    pub mode: EngineMode,
}

/// Outcome of [`PositionController::set_target_percentage`].
#[derive(Clone, Debug)]
pub enum TargetDecision {
    /// Duration unknown; the percentage is kept for [`PositionController::take_pending`].
    Deferred,
    /// Nothing to do.
    Ignored,
    /// Hand `request` to the scheduler.
    Schedule {
        /// Resolved request.
        request: TransitionRequest,
        /// Native playback should resume forward before the first tick.
        resume_forward: bool,
        /// `current_time` was snapped to the superseded target.
        skipped_ahead: bool,
    },
}

/// Turns external percentages into target times.
#[derive(Debug, Default)]
pub struct PositionController {
    pending: Option<(f64, TransitionOpts)>,
}

impl PositionController {
    /// Create a controller with no pending target.
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `p` onto the timeline and decide how to get there.
    pub fn set_target_percentage(
        &mut self,
        p: f64,
        opts: TransitionOpts,
        defaults: &TransitionDefaults,
        clock: &mut PlaybackClock,
        ctx: TargetContext,
    ) -> TargetDecision {
        if p.is_nan() {
            tracing::debug!("ignoring NaN position");
            return TargetDecision::Ignored;
        }
        let Some(duration) = usable_duration(ctx.duration) else {
            tracing::debug!(p, "duration unknown, deferring target");
            self.pending = Some((p, opts));
            return TargetDecision::Deferred;
        };

        let old_target = clock.target_time;
        let target = clamp_unit(p) * duration;
        clock.target_time = target;

        if !opts.jump {
            if clock.is_close_to(target) {
                return TargetDecision::Ignored;
            }
            if ctx.transition_active && target == old_target {
                return TargetDecision::Ignored;
            }
        }

        let mut skipped_ahead = false;
        if target > old_target && old_target > clock.current_time && !clock.is_close_to(old_target)
        {
            tracing::debug!(from = clock.current_time, to = old_target, "skipping forward");
            clock.current_time = old_target;
            skipped_ahead = true;
        }

        let mut request = opts.resolve(defaults.transition_speed_ms, &defaults.easing);
        if target < clock.current_time {
            tracing::debug!("moving backward, jumping");
            request.jump = true;
        }

        let resume_forward = ctx.mode == EngineMode::NativeVideo
            && !request.jump
            && target > clock.current_time;

        TargetDecision::Schedule {
            request,
            resume_forward,
            skipped_ahead,
        }
    }

    /// Take the percentage remembered while duration was unknown.
    pub fn take_pending(&mut self) -> Option<(f64, TransitionOpts)> {
        self.pending.take()
    }

    /// Whether a deferred target is waiting.
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/playback/controller.rs"]
mod tests;
