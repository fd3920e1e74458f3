use std::sync::Arc;

use parking_lot::Mutex;

use crate::foundation::error::{ScrollyError, ScrollyResult};
use crate::media::frame::DecodedFrame;
use crate::media::store::FrameStore;
use crate::render::backend::{EngineMode, RenderBackend};
use crate::render::fit::Layout;

/// Paint target for decoded frames (a canvas, a window, an encoder).
pub trait Surface: Send {
    /// Show `frame`. The frame stays owned by the store.
    fn present(&mut self, frame: &DecodedFrame) -> ScrollyResult<()>;

    /// New placement after creation or a resize.
    fn apply_layout(&mut self, _layout: Layout) {}
}

/// [`RenderBackend`] that paints [`FrameStore`] frames onto a [`Surface`].
pub struct CanvasBackend {
    store: FrameStore,
    surface: Box<dyn Surface>,
    current: f64,
}

impl CanvasBackend {
    /// Paint from `store` onto `surface`.
    pub fn new(store: FrameStore, surface: Box<dyn Surface>) -> Self {
        Self {
            store,
            surface,
            current: 0.0,
        }
    }

    /// Frames being painted.
    pub fn store(&self) -> &FrameStore {
        &self.store
    }

    /// Paint frame `index`, clamped to the store. Returns whether anything was presented.
    ///
    /// Repeating the last painted index is a no-op unless `force` is set.
    pub fn paint_frame(&mut self, index: i64, force: bool) -> ScrollyResult<bool> {
        let Some(index) = self.store.clamp_index(index) else {
            return Ok(false);
        };
        if !force && self.store.last_painted_index() == Some(index) {
            return Ok(false);
        }
        let frame = self
            .store
            .get(index)
            .ok_or_else(|| ScrollyError::decoder(format!("frame {index} missing")))?;
        self.surface.present(frame)?;
        tracing::trace!(index, "painted frame");
        self.store.set_last_painted(Some(index));
        Ok(true)
    }

    /// Paint the frame for `time`.
    pub fn paint_time(&mut self, time: f64, force: bool) -> ScrollyResult<bool> {
        self.current = time;
        match self.store.index_for_time(time) {
            Some(index) => self.paint_frame(index, force),
            None => Ok(false),
        }
    }

    /// Repaint the current frame regardless of the cache.
    pub fn repaint(&mut self) -> ScrollyResult<bool> {
        self.paint_time(self.current, true)
    }

    /// Forward a layout to the surface.
    pub fn apply_layout(&mut self, layout: Layout) {
        self.surface.apply_layout(layout);
    }

    /// Override the duration the frame rate derives from.
    pub fn set_duration(&mut self, duration: f64) -> ScrollyResult<()> {
        self.store.set_duration(duration)
    }

    /// Move the painted position without painting.
    pub fn set_current(&mut self, time: f64) {
        self.current = time;
    }

    /// Release every frame.
    pub fn release(&mut self) {
        self.store.release_all();
    }
}

impl std::fmt::Debug for CanvasBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CanvasBackend")
            .field("frames", &self.store.len())
            .field("current", &self.current)
            .finish()
    }
}

impl RenderBackend for CanvasBackend {
    fn kind(&self) -> EngineMode {
        EngineMode::CanvasFrames
    }

    fn seek_to(&mut self, time: f64) -> ScrollyResult<()> {
        self.paint_time(time, false).map(|_| ())
    }

    fn play(&mut self, _rate: f64) -> ScrollyResult<()> {
        Ok(())
    }

    fn pause(&mut self) {}

    fn current_position(&self) -> f64 {
        self.current
    }

    fn is_playing(&self) -> bool {
        false
    }

    fn can_play(&self) -> bool {
        false
    }

    fn supports_play_rate(&self) -> bool {
        false
    }

    fn duration(&self) -> Option<f64> {
        self.store.duration()
    }
}

/// What a [`MemorySurface`] has been shown.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MemorySurfaceLog {
    /// Frame indices in presentation order.
    pub presented: Vec<usize>,
    /// Size of the last presented frame.
    pub last_size: Option<(u32, u32)>,
    /// Last layout applied.
    pub layout: Option<Layout>,
}

#[derive(Debug, Default)]
struct MemorySurfaceInner {
    log: MemorySurfaceLog,
    fail_after: Option<usize>,
    last_pixels: Vec<u8>,
}

/// In-memory [`Surface`] recording every presented frame.
///
/// Clones share state. Used by the CLI and by tests.
#[derive(Clone, Debug, Default)]
pub struct MemorySurface(Arc<Mutex<MemorySurfaceInner>>);

impl MemorySurface {
    /// Empty surface.
    pub fn new() -> Self {
        Self::default()
    }

    /// Surface whose `present` fails once `n` frames have been shown.
    pub fn failing_after(n: usize) -> Self {
        let s = Self::default();
        s.0.lock().fail_after = Some(n);
        s
    }

    /// Copy of the presentation log.
    pub fn log(&self) -> MemorySurfaceLog {
        self.0.lock().log.clone()
    }

    /// Pixels of the last presented frame.
    pub fn last_pixels(&self) -> Vec<u8> {
        self.0.lock().last_pixels.clone()
    }
}

impl Surface for MemorySurface {
    fn present(&mut self, frame: &DecodedFrame) -> ScrollyResult<()> {
        let mut inner = self.0.lock();
        if inner
            .fail_after
            .is_some_and(|n| inner.log.presented.len() >= n)
        {
            return Err(ScrollyError::decoder("surface lost"));
        }
        inner.log.presented.push(frame.index());
        inner.log.last_size = Some((frame.width(), frame.height()));
        inner.last_pixels = frame.pixels().to_vec();
        Ok(())
    }

    fn apply_layout(&mut self, layout: Layout) {
        self.0.lock().log.layout = Some(layout);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/canvas.rs"]
mod tests;
