/// Convenience result type used across scrolly.
pub type ScrollyResult<T> = Result<T, ScrollyError>;

/// Top-level error taxonomy used by engine and decode APIs.
///
/// Only [`ScrollyError::Configuration`] is fatal. Every other variant is absorbed by the engine,
/// which degrades to native playback and reports the cause through `tracing`.
#[derive(thiserror::Error, Debug)]
pub enum ScrollyError {
    /// Missing or invalid construction arguments (source, mount target, options).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The source is not a parseable video container, or carries no usable video track.
    #[error("unsupported container: {0}")]
    UnsupportedContainer(String),

    /// The streaming decoder failed to configure or reported an error mid-stream.
    #[error("decoder error: {0}")]
    DecoderRuntime(String),

    /// Decoding finished without producing a single frame.
    #[error("decode produced no frames")]
    EmptyResult,

    /// The source bytes could not be opened or read.
    #[error("fetch error: {0}")]
    Fetch(String),

    /// The decode session was abandoned by teardown.
    #[error("decode cancelled")]
    Cancelled,

    /// A cross-context message could not be serialized or deserialized.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ScrollyError {
    /// Build a [`ScrollyError::Configuration`] value.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Build a [`ScrollyError::UnsupportedContainer`] value.
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::UnsupportedContainer(msg.into())
    }

    /// Build a [`ScrollyError::DecoderRuntime`] value.
    pub fn decoder(msg: impl Into<String>) -> Self {
        Self::DecoderRuntime(msg.into())
    }

    /// Build a [`ScrollyError::Fetch`] value.
    pub fn fetch(msg: impl Into<String>) -> Self {
        Self::Fetch(msg.into())
    }

    /// Build a [`ScrollyError::Protocol`] value.
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// `false` only for errors that must abort construction.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Configuration(_))
    }

    /// `true` when the native element has to reload from the start after falling back.
    pub fn requires_reload(&self) -> bool {
        matches!(self, Self::DecoderRuntime(_))
    }
}

impl From<serde_json::Error> for ScrollyError {
    fn from(e: serde_json::Error) -> Self {
        Self::protocol(e.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
