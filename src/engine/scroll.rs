/// Delay before an interrupted programmatic scroll is issued again.
pub const SCROLL_DEBOUNCE_MS: f64 = 100.0;
/// Distance in pixels at which a programmatic scroll counts as arrived.
pub const SCROLL_ARRIVAL_PX: f64 = 1.0;

/// The host page's scroll collaborator.
pub trait ScrollHost: Send {
    /// Scroll the page to `offset` pixels.
    fn request_scroll_to(&mut self, offset: f64, smooth: bool);
}

/// Scroll-relevant measurements of the host page, in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ScrollGeometry {
    /// Top of the scroll container relative to the viewport (negative once scrolled past).
    pub container_top: f64,
    /// Current page scroll offset.
    pub page_offset: f64,
    /// Height of the scroll container.
    pub container_height: f64,
    /// Height of the viewport.
    pub viewport_height: f64,
}

impl ScrollGeometry {
    fn scroll_range(&self) -> f64 {
        self.container_height - self.viewport_height
    }

    /// How far through the container the page is scrolled, in `[0, 1]`.
    pub fn percentage(&self) -> f64 {
        let range = self.scroll_range();
        if !(range > 0.0) {
            return 0.0;
        }
        let p = -self.container_top / range;
        if p.is_finite() { p.clamp(0.0, 1.0) } else { 0.0 }
    }

    /// Page offset at which the container is scrolled `p` of the way through.
    pub fn offset_for(&self, p: f64) -> f64 {
        self.container_top + self.page_offset + self.scroll_range() * p
    }

    /// Whether the page sits at `offset`.
    pub fn is_at(&self, offset: f64) -> bool {
        (self.page_offset - offset).abs() < SCROLL_ARRIVAL_PX
    }
}

/// What a scroll event means for the engine.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ScrollEvent {
    /// A user scroll; follow it.
    Position(f64),
    /// A programmatic scroll reached its target.
    Arrived,
    /// Scroll happened while a programmatic target is pending; ignored.
    Suppressed,
}

/// Reconciles programmatic scrolling with scroll events it causes.
///
/// While a programmatic target is pending, incoming scroll positions are not fed back into the
/// engine. With scroll lock, a scroll that does not land on the target re-issues the
/// programmatic scroll once no further scroll arrived for [`SCROLL_DEBOUNCE_MS`].
#[derive(Clone, Debug, Default)]
pub struct ScrollSync {
    lock: bool,
    target: Option<f64>,
    target_percentage: f64,
    reissue_at: Option<f64>,
}

impl ScrollSync {
    /// Sync with or without scroll lock.
    pub fn new(lock: bool) -> Self {
        Self {
            lock,
            ..Self::default()
        }
    }

    /// Pending programmatic target offset.
    pub fn target(&self) -> Option<f64> {
        self.target
    }

    /// Scroll the host so the container sits at `p`. Returns whether a scroll was requested.
    pub fn scroll_to_percentage(
        &mut self,
        p: f64,
        geometry: &ScrollGeometry,
        host: &mut dyn ScrollHost,
    ) -> bool {
        let offset = geometry.offset_for(p);
        self.target_percentage = p;
        self.reissue_at = None;
        if !offset.is_finite() || geometry.is_at(offset) {
            self.target = None;
            return false;
        }
        tracing::debug!(offset, p, "requesting programmatic scroll");
        host.request_scroll_to(offset, true);
        self.target = Some(offset);
        true
    }

    /// Classify a scroll event at animation-frame time `now_ms`.
    pub fn on_scroll(&mut self, geometry: &ScrollGeometry, now_ms: f64) -> ScrollEvent {
        let Some(target) = self.target else {
            return ScrollEvent::Position(geometry.percentage());
        };
        if geometry.is_at(target) {
            self.target = None;
            self.reissue_at = None;
            return ScrollEvent::Arrived;
        }
        if self.lock {
            self.reissue_at = Some(now_ms + SCROLL_DEBOUNCE_MS);
        }
        ScrollEvent::Suppressed
    }

    /// Re-issue an interrupted programmatic scroll once its debounce expired.
    pub fn poll(&mut self, now_ms: f64, geometry: &ScrollGeometry, host: &mut dyn ScrollHost) -> bool {
        match self.reissue_at {
            Some(at) if now_ms >= at => {
                let p = self.target_percentage;
                self.scroll_to_percentage(p, geometry, host)
            }
            _ => false,
        }
    }
}

/// [`ScrollHost`] recording requests, for headless hosts and tests.
#[derive(Clone, Debug, Default)]
pub struct RecordingScrollHost(std::sync::Arc<parking_lot::Mutex<Vec<(f64, bool)>>>);

impl RecordingScrollHost {
    /// Empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests so far.
    pub fn requests(&self) -> Vec<(f64, bool)> {
        self.0.lock().clone()
    }
}

impl ScrollHost for RecordingScrollHost {
    fn request_scroll_to(&mut self, offset: f64, smooth: bool) {
        self.0.lock().push((offset, smooth));
    }
}

#[cfg(test)]
#[path = "../../tests/unit/engine/scroll.rs"]
mod tests;
