use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Direction of motion between the current and the target playback position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Direction {
    /// `target > current`.
    Forward,
    /// `target <= current`.
    Backward,
}

impl Direction {
    /// Classify `target - current`. Zero and NaN count as backward.
    pub fn from_delta(delta: f64) -> Self {
        if delta > 0.0 {
            Self::Forward
        } else {
            Self::Backward
        }
    }

    /// `+1.0` forward, `-1.0` backward.
    pub fn factor(self) -> f64 {
        match self {
            Self::Forward => 1.0,
            Self::Backward => -1.0,
        }
    }

    /// Return `true` when `current` has reached or passed `target` in this direction.
    pub fn has_reached(self, current: f64, target: f64) -> bool {
        match self {
            Self::Forward => current >= target,
            Self::Backward => current <= target,
        }
    }
}

/// Identifier of one scheduled transition; a newer id supersedes every older one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TransitionId(pub u64);

/// Shared cancellation flag for long-running work (decode sessions, worker threads).
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create a fresh, not-cancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Return `true` once [`CancelToken::cancel`] has been called on any clone.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
