use crate::foundation::math::clamp_time;

/// Current and target playback position, in seconds.
///
/// The position controller writes `target_time`; the transition scheduler writes `current_time`.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PlaybackClock {
    /// Position last rendered.
    pub current_time: f64,
    /// Position the engine is moving toward.
    pub target_time: f64,
    /// Distance below which two positions are considered the same frame.
    pub frame_threshold: f64,
}

impl PlaybackClock {
    /// Clock at `0.0` with the given threshold.
    pub fn new(frame_threshold: f64) -> Self {
        Self {
            current_time: 0.0,
            target_time: 0.0,
            frame_threshold,
        }
    }

    /// `|current_time - t| < frame_threshold`.
    pub fn is_close_to(&self, t: f64) -> bool {
        (self.current_time - t).abs() < self.frame_threshold
    }

    /// Signed distance `target_time - current_time`.
    pub fn delta(&self) -> f64 {
        self.target_time - self.current_time
    }

    /// Clamp both positions into `[0, duration]`. Non-finite values are left alone.
    pub fn clamp_to(&mut self, duration: Option<f64>) {
        if self.target_time.is_finite() {
            self.target_time = clamp_time(self.target_time, duration);
        }
        if self.current_time.is_finite() {
            self.current_time = clamp_time(self.current_time, duration);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/playback/clock.rs"]
mod tests;
