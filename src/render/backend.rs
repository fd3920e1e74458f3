use crate::foundation::error::ScrollyResult;

/// Which renderer currently owns the output. Exactly one renders at a time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineMode {
    /// The native media element plays and seeks itself.
    #[default]
    NativeVideo,
    /// Decoded frames are painted onto a surface.
    CanvasFrames,
}

/// Capability interface the transition scheduler renders through.
///
/// The scheduler never asks which backend it talks to; strategy differences are expressed by
/// [`RenderBackend::can_play`] and [`RenderBackend::supports_play_rate`].
pub trait RenderBackend {
    /// Mode this backend implements.
    fn kind(&self) -> EngineMode;

    /// Stop autonomous playback and show `time` exactly.
    fn seek_to(&mut self, time: f64) -> ScrollyResult<()>;

    /// Start autonomous playback at `rate`. Backends that cannot play ignore this.
    fn play(&mut self, rate: f64) -> ScrollyResult<()>;

    /// Stop autonomous playback.
    fn pause(&mut self);

    /// Position the backend is showing, in seconds.
    fn current_position(&self) -> f64;

    /// Whether autonomous playback is running.
    fn is_playing(&self) -> bool;

    /// Whether the backend advances its own position when playing.
    fn can_play(&self) -> bool;

    /// Whether the play rate can be changed while playing.
    fn supports_play_rate(&self) -> bool;

    /// Media duration in seconds, once known.
    fn duration(&self) -> Option<f64>;
}
