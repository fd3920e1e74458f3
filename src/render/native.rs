use std::sync::Arc;

use parking_lot::Mutex;

use crate::foundation::error::ScrollyResult;
use crate::render::backend::{EngineMode, RenderBackend};

/// The host's native media element (a `<video>` or a platform player).
pub trait MediaElement: Send {
    /// Duration in seconds, once metadata has loaded.
    fn duration(&self) -> Option<f64>;
    /// Playback position in seconds.
    fn current_time(&self) -> f64;
    /// Seek.
    fn set_current_time(&mut self, t: f64);
    /// Start playing at the current rate.
    fn play(&mut self);
    /// Pause.
    fn pause(&mut self);
    /// Whether playback is paused.
    fn is_paused(&self) -> bool;
    /// Change the playback rate.
    fn set_playback_rate(&mut self, rate: f64);
    /// Whether rate changes are honored smoothly. WebKit-like engines report `false`.
    fn supports_playback_rate(&self) -> bool {
        true
    }
    /// Reload the source from the start.
    fn reload(&mut self);
}

/// [`RenderBackend`] over a [`MediaElement`].
pub struct NativeBackend {
    element: Box<dyn MediaElement>,
}

impl NativeBackend {
    /// Wrap `element`.
    pub fn new(element: Box<dyn MediaElement>) -> Self {
        Self { element }
    }

    /// The wrapped element.
    pub fn element(&self) -> &dyn MediaElement {
        self.element.as_ref()
    }

    /// The wrapped element, mutably.
    pub fn element_mut(&mut self) -> &mut dyn MediaElement {
        self.element.as_mut()
    }
}

impl std::fmt::Debug for NativeBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeBackend")
            .field("current_time", &self.element.current_time())
            .field("paused", &self.element.is_paused())
            .finish()
    }
}

impl RenderBackend for NativeBackend {
    fn kind(&self) -> EngineMode {
        EngineMode::NativeVideo
    }

    fn seek_to(&mut self, time: f64) -> ScrollyResult<()> {
        self.element.pause();
        self.element.set_current_time(time);
        Ok(())
    }

    fn play(&mut self, rate: f64) -> ScrollyResult<()> {
        self.element.set_playback_rate(rate);
        self.element.play();
        Ok(())
    }

    fn pause(&mut self) {
        self.element.pause();
    }

    fn current_position(&self) -> f64 {
        self.element.current_time()
    }

    fn is_playing(&self) -> bool {
        !self.element.is_paused()
    }

    fn can_play(&self) -> bool {
        true
    }

    fn supports_play_rate(&self) -> bool {
        self.element.supports_playback_rate()
    }

    fn duration(&self) -> Option<f64> {
        self.element.duration()
    }
}

/// Observable state of a [`SimulatedMediaElement`].
#[derive(Clone, Debug, PartialEq)]
pub struct SimulatedState {
    /// Known duration.
    pub duration: Option<f64>,
    /// Position in seconds.
    pub current_time: f64,
    /// Paused flag.
    pub paused: bool,
    /// Current playback rate.
    pub rate: f64,
    /// Whether rate changes are honored.
    pub supports_rate: bool,
    /// Number of seeks performed.
    pub seeks: u32,
    /// Number of reloads performed.
    pub reloads: u32,
}

/// Headless media element advancing on an explicit clock.
///
/// Clones share state, so a host keeps a handle while the engine owns the boxed element.
#[derive(Clone, Debug)]
pub struct SimulatedMediaElement(Arc<Mutex<SimulatedState>>);

impl SimulatedMediaElement {
    /// Paused element at `0.0`.
    pub fn new(duration: Option<f64>) -> Self {
        Self(Arc::new(Mutex::new(SimulatedState {
            duration,
            current_time: 0.0,
            paused: true,
            rate: 1.0,
            supports_rate: true,
            seeks: 0,
            reloads: 0,
        })))
    }

    /// Same element, reporting no smooth rate control.
    pub fn without_rate_control(self) -> Self {
        self.0.lock().supports_rate = false;
        self
    }

    /// Simulate metadata arriving.
    pub fn set_duration(&self, duration: f64) {
        self.0.lock().duration = Some(duration);
    }

    /// Let `dt_ms` of wall time pass. Playback stops at the end of the media.
    pub fn advance(&self, dt_ms: f64) {
        let mut s = self.0.lock();
        if s.paused {
            return;
        }
        let mut t = s.current_time + dt_ms * 0.001 * s.rate;
        if let Some(d) = s.duration
            && t >= d
        {
            t = d;
            s.paused = true;
        }
        s.current_time = t;
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> SimulatedState {
        self.0.lock().clone()
    }
}

impl MediaElement for SimulatedMediaElement {
    fn duration(&self) -> Option<f64> {
        self.0.lock().duration
    }

    fn current_time(&self) -> f64 {
        self.0.lock().current_time
    }

    fn set_current_time(&mut self, t: f64) {
        let mut s = self.0.lock();
        let t = t.max(0.0);
        s.current_time = match s.duration {
            Some(d) => t.min(d),
            None => t,
        };
        s.seeks += 1;
    }

    fn play(&mut self) {
        self.0.lock().paused = false;
    }

    fn pause(&mut self) {
        self.0.lock().paused = true;
    }

    fn is_paused(&self) -> bool {
        self.0.lock().paused
    }

    fn set_playback_rate(&mut self, rate: f64) {
        self.0.lock().rate = rate;
    }

    fn supports_playback_rate(&self) -> bool {
        self.0.lock().supports_rate
    }

    fn reload(&mut self) {
        let mut s = self.0.lock();
        s.current_time = 0.0;
        s.paused = true;
        s.reloads += 1;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/native.rs"]
mod tests;
