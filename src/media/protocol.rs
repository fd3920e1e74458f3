use crate::foundation::error::{ScrollyError, ScrollyResult};
use crate::playback::request::TransitionOptions;
use crate::render::fit::ObjectFit;

/// Command sent to a decode worker.
///
/// Serialized as a JSON object tagged by `message`, e.g. `{"message":"PAINT_FRAME","frame":12}`.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "message", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerRequest {
    /// Decode `src` into the worker's frame store.
    RequestDecode {
        /// Source location resolved by the worker's byte source.
        src: String,
    },
    /// Start painting onto the transferred surface.
    #[serde(rename_all = "camelCase")]
    SetupCanvas {
        /// Native media duration, used when the container carried none.
        duration: Option<f64>,
        /// Position to paint first.
        current_time: f64,
    },
    /// Paint the frame for a time.
    #[serde(rename_all = "camelCase")]
    PaintCurrentTime {
        /// Seconds.
        current_time: f64,
    },
    /// Paint a frame by index, bypassing the idempotence cache.
    PaintFrame {
        /// Frame index; clamped by the worker.
        frame: i64,
    },
    /// Run a transition on the worker's own scheduler.
    #[serde(rename_all = "camelCase")]
    RequestTransition {
        /// Clamped target time in seconds.
        target_time: f64,
        /// Skip-ahead position chosen by the controller, if any.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        current_time: Option<f64>,
        /// Resolved transition.
        options: TransitionOptions,
    },
    /// Report the worker's current time.
    GetCurrentTime,
    /// Container changed size.
    #[serde(rename_all = "camelCase")]
    Resize {
        /// Container width in pixels.
        container_width: f64,
        /// Container height in pixels.
        container_height: f64,
        /// Fit mode.
        fit: ObjectFit,
    },
    /// Stop the worker loop.
    Shutdown,
}

/// Reply from a decode worker.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "message", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerResponse {
    /// The frame store is populated.
    #[serde(rename_all = "camelCase")]
    DecodingSuccess {
        /// Frames decoded.
        frame_count: usize,
        /// Container duration, when known.
        duration: Option<f64>,
    },
    /// Decoding failed; the worker holds no frames.
    DecodingFailed {
        /// Display form of the error.
        reason: String,
        /// The native element must reload from the start.
        reload: bool,
    },
    /// The surface is set up and showing a frame.
    CanvasCreated,
    /// Answer to [`WorkerRequest::GetCurrentTime`].
    #[serde(rename_all = "camelCase")]
    CurrentTime {
        /// Seconds.
        current_time: f64,
    },
    /// Painting failed; the worker released its frames.
    RenderFailed {
        /// Display form of the error.
        reason: String,
    },
}

impl WorkerResponse {
    /// Failure reply for `err`.
    pub fn decoding_failed(err: &ScrollyError) -> Self {
        Self::DecodingFailed {
            reason: err.to_string(),
            reload: err.requires_reload(),
        }
    }
}

/// Encode a message as JSON.
pub fn to_json<T: serde::Serialize>(msg: &T) -> ScrollyResult<String> {
    serde_json::to_string(msg).map_err(|e| ScrollyError::protocol(e.to_string()))
}

/// Decode a JSON message.
pub fn from_json<T: serde::de::DeserializeOwned>(s: &str) -> ScrollyResult<T> {
    serde_json::from_str(s).map_err(|e| ScrollyError::protocol(e.to_string()))
}

#[cfg(test)]
#[path = "../../tests/unit/media/protocol.rs"]
mod tests;
