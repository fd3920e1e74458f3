use crate::foundation::core::{Direction, TransitionId};
use crate::foundation::error::ScrollyResult;
use crate::foundation::math::clamp_time;
use crate::playback::clock::PlaybackClock;
use crate::playback::request::{Strategy, TransitionRequest};
use crate::render::backend::RenderBackend;

/// Slowest play rate the native backend is driven at.
pub const MIN_PLAY_RATE: f64 = 0.0625;
/// Fastest play rate the native backend is driven at.
pub const MAX_PLAY_RATE: f64 = 16.0;

/// Lifecycle of one scheduled transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransitionState {
    /// Waiting for its first tick.
    Scheduled,
    /// Advancing on every tick.
    Ticking,
    /// Reached its target and stopped.
    Converged,
    /// Cancelled by a newer transition or by teardown.
    Superseded,
}

/// Result of one [`TransitionScheduler::tick`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// No transition is active.
    Idle,
    /// Call again on the next animation frame.
    Continue,
    /// The active transition terminated on this tick.
    Converged,
}

#[derive(Debug)]
struct Active {
    id: TransitionId,
    request: TransitionRequest,
    direction: Direction,
    distance_ms: f64,
    start_current: f64,
    start_ts: Option<f64>,
    prev_ts: f64,
}

/// Per-animation-frame loop advancing `current_time` toward `target_time`.
///
/// At most one transition is active; [`TransitionScheduler::run_transition`] supersedes the
/// previous one synchronously.
#[derive(Debug, Default)]
pub struct TransitionScheduler {
    next_id: u64,
    active: Option<Active>,
    last: Option<(TransitionId, TransitionState)>,
}

impl TransitionScheduler {
    /// Create an idle scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `request` from the clock's current state, cancelling any in-flight transition.
    pub fn run_transition(&mut self, request: TransitionRequest, clock: &PlaybackClock) -> TransitionId {
        self.cancel();
        self.next_id += 1;
        let id = TransitionId(self.next_id);
        let delta = clock.delta();
        tracing::trace!(
            id = id.0,
            jump = request.jump,
            speed_ms = request.transition_speed_ms,
            current = clock.current_time,
            target = clock.target_time,
            "transition scheduled"
        );
        self.active = Some(Active {
            id,
            request,
            direction: Direction::from_delta(delta),
            distance_ms: delta.abs() * 1000.0,
            start_current: clock.current_time,
            start_ts: None,
            prev_ts: 0.0,
        });
        self.last = Some((id, TransitionState::Scheduled));
        id
    }

    /// Cancel the in-flight transition, if any. Returns whether one was active.
    pub fn cancel(&mut self) -> bool {
        match self.active.take() {
            Some(a) => {
                self.last = Some((a.id, TransitionState::Superseded));
                true
            }
            None => false,
        }
    }

    /// Whether a transition is scheduled or ticking.
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// State of the most recently scheduled transition.
    pub fn last_state(&self) -> Option<(TransitionId, TransitionState)> {
        self.last
    }

    /// Advance the active transition to animation-frame timestamp `now_ms`.
    pub fn tick(
        &mut self,
        now_ms: f64,
        clock: &mut PlaybackClock,
        backend: &mut dyn RenderBackend,
    ) -> ScrollyResult<TickOutcome> {
        let Some(active) = self.active.as_mut() else {
            return Ok(TickOutcome::Idle);
        };
        let start_ts = match active.start_ts {
            Some(ts) => ts,
            None => {
                active.start_ts = Some(now_ms);
                active.prev_ts = now_ms;
                active.start_current = clock.current_time;
                self.last = Some((active.id, TransitionState::Ticking));
                now_ms
            }
        };

        let strategy = active.request.strategy();
        if strategy == Strategy::Jump {
            if clock.target_time.is_finite() {
                clock.target_time = clamp_time(clock.target_time, backend.duration());
                clock.current_time = clock.target_time;
                backend.seek_to(clock.current_time)?;
            }
            return Ok(self.finish(backend));
        }

        let has_passed = active
            .direction
            .has_reached(clock.current_time, clock.target_time);
        if clock.target_time.is_nan() || clock.is_close_to(clock.target_time) || has_passed {
            return Ok(self.finish(backend));
        }

        clock.target_time = clamp_time(clock.target_time, backend.duration());
        let dt = now_ms - active.prev_ts;
        let dir = active.direction.factor();

        match strategy {
            Strategy::Jump | Strategy::NativeSpeed => {
                let autonomous = backend.can_play() && active.direction == Direction::Forward;
                if autonomous {
                    if (backend.current_position() - clock.current_time).abs() >= clock.frame_threshold {
                        backend.seek_to(clock.current_time)?;
                    }
                    backend.play(1.0)?;
                    clock.current_time = backend.current_position();
                } else {
                    let mut next = clock.current_time + dt * 0.001 * dir;
                    if active.direction.has_reached(next, clock.target_time) {
                        next = clock.target_time;
                    }
                    if next.is_finite() {
                        clock.current_time = next;
                        backend.seek_to(next)?;
                    }
                }
            }
            Strategy::Eased => {
                let speed = active.request.transition_speed_ms;
                let progress_at = |ts: f64| (ts - start_ts) / speed;
                let progress = progress_at(now_ms).clamp(0.0, 1.0);
                let eased = active.request.easing.apply(progress);
                let next = active.start_current + eased * active.distance_ms * dir * 0.001;
                if next.is_finite() {
                    clock.current_time = next;
                }

                let rate_driven = backend.can_play()
                    && backend.supports_play_rate()
                    && active.direction == Direction::Forward;
                let elapsed = progress_at(now_ms) >= 1.0;
                if !rate_driven || elapsed {
                    if next.is_finite() {
                        backend.seek_to(next)?;
                    }
                } else {
                    let base_rate = active.distance_ms / speed;
                    let p0 = progress_at(now_ms);
                    let p1 = progress_at(now_ms + dt);
                    let easing = &active.request.easing;
                    let factor = (easing.apply(p1) - easing.apply(p0)) / (p1 - p0);
                    let rate = (base_rate * factor).clamp(MIN_PLAY_RATE, MAX_PLAY_RATE);
                    if rate.is_finite() {
                        tracing::trace!(rate, "play rate");
                        backend.play(rate)?;
                    }
                    clock.current_time = backend.current_position();
                }
            }
        }

        active.prev_ts = now_ms;
        Ok(TickOutcome::Continue)
    }

    fn finish(&mut self, backend: &mut dyn RenderBackend) -> TickOutcome {
        backend.pause();
        if let Some(a) = self.active.take() {
            tracing::trace!(id = a.id.0, "transition converged");
            self.last = Some((a.id, TransitionState::Converged));
        }
        TickOutcome::Converged
    }
}

#[cfg(test)]
#[path = "../../tests/unit/playback/scheduler.rs"]
mod tests;
