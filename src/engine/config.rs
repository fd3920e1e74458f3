use crate::animation::ease::Ease;
use crate::foundation::error::{ScrollyError, ScrollyResult};
use crate::media::pipeline::DecodeOptions;
use crate::render::fit::ObjectFit;

/// Where the decode pipeline runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodeMode {
    /// On a [`crate::DecodeWorker`] thread that also paints and ticks canvas transitions.
    #[default]
    Worker,
    /// Pumped from [`crate::ScrollyVideo::frame`], one non-blocking step per animation frame.
    InThread,
}

/// Engine options. Every field except `src` has a default.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Video location, resolved by the mount's byte source.
    pub src: String,
    /// How frames fill their container.
    pub object_fit: ObjectFit,
    /// Host hint: keep the container pinned while scrolling through it.
    pub sticky: bool,
    /// Follow the host's scroll position.
    pub track_scroll: bool,
    /// Re-issue programmatic scrolls interrupted by the user.
    pub lock_scroll: bool,
    /// Default transition length in milliseconds; `0` follows native timing.
    pub transition_speed_ms: f64,
    /// Positions closer than this (seconds) count as the same frame.
    pub frame_threshold: f64,
    /// Try to decode into frames for canvas painting.
    pub use_decode_pipeline: bool,
    /// Where decoding runs.
    pub decode_mode: DecodeMode,
    /// Default easing preset.
    pub ease: Ease,
    /// Enables [`crate::ScrollyVideo::paint_frame`].
    pub debug: bool,
    /// Pipeline tuning.
    pub decode: DecodeOptions,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            src: String::new(),
            object_fit: ObjectFit::Contain,
            sticky: true,
            track_scroll: true,
            lock_scroll: true,
            transition_speed_ms: 16.0,
            frame_threshold: 0.05,
            use_decode_pipeline: true,
            decode_mode: DecodeMode::Worker,
            ease: Ease::Linear,
            debug: false,
            decode: DecodeOptions::default(),
        }
    }
}

impl EngineConfig {
    /// Defaults for `src`.
    pub fn new(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            ..Self::default()
        }
    }

    /// Parse and validate JSON.
    pub fn from_json_str(s: &str) -> ScrollyResult<Self> {
        let cfg: Self = serde_json::from_str(s)
            .map_err(|e| ScrollyError::configuration(format!("invalid engine config: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> ScrollyResult<()> {
        if self.src.trim().is_empty() {
            return Err(ScrollyError::configuration("src must be non-empty"));
        }
        if !(self.frame_threshold.is_finite() && self.frame_threshold > 0.0) {
            return Err(ScrollyError::configuration(
                "frame_threshold must be finite and > 0",
            ));
        }
        if !(self.transition_speed_ms.is_finite() && self.transition_speed_ms >= 0.0) {
            return Err(ScrollyError::configuration(
                "transition_speed_ms must be finite and >= 0",
            ));
        }
        if self.decode.read_chunk_size == 0 {
            return Err(ScrollyError::configuration(
                "decode.read_chunk_size must be > 0",
            ));
        }
        if self.decode.max_decode_queue == 0 {
            return Err(ScrollyError::configuration(
                "decode.max_decode_queue must be > 0",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/engine/config.rs"]
mod tests;
