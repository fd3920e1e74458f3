use crate::foundation::error::{ScrollyError, ScrollyResult};
use crate::foundation::math::usable_duration;
use crate::media::frame::{DecodedFrame, FrameLedger, RawFrame};

/// Append-only, randomly indexable decoded frames plus the derived frame rate.
///
/// Frames are appended in decode order during a session and read-only afterwards. The frame rate
/// is `len / duration` and exists only once a duration has been set.
#[derive(Debug, Default)]
pub struct FrameStore {
    frames: Vec<DecodedFrame>,
    duration: Option<f64>,
    last_painted: Option<usize>,
    ledger: FrameLedger,
}

impl FrameStore {
    /// Empty store accounting into `ledger`.
    pub fn new(ledger: FrameLedger) -> Self {
        Self {
            ledger,
            ..Self::default()
        }
    }

    /// Append a decoded frame; returns its index.
    pub fn push(&mut self, raw: RawFrame) -> ScrollyResult<usize> {
        let index = self.frames.len();
        let frame = DecodedFrame::from_raw(index, raw, &self.ledger)?;
        self.frames.push(frame);
        Ok(index)
    }

    /// Number of frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether no frames were stored.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Fix the video duration the frame rate is derived from.
    ///
    /// Fails with [`ScrollyError::EmptyResult`] on an empty store and ignores unusable durations.
    pub fn set_duration(&mut self, duration: f64) -> ScrollyResult<()> {
        if self.frames.is_empty() {
            return Err(ScrollyError::EmptyResult);
        }
        match usable_duration(Some(duration)) {
            Some(d) => self.duration = Some(d),
            None => tracing::warn!(duration, "ignoring unusable frame store duration"),
        }
        Ok(())
    }

    /// Duration the frame rate is derived from.
    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    /// `len / duration`, once the duration is known.
    pub fn frame_rate(&self) -> Option<f64> {
        self.duration.map(|d| self.frames.len() as f64 / d)
    }

    /// `floor(time * frame_rate)`, unclamped.
    pub fn index_for_time(&self, time: f64) -> Option<i64> {
        let idx = (time * self.frame_rate()?).floor();
        idx.is_finite().then_some(idx as i64)
    }

    /// Clamp `index` into `[0, len - 1]`; `None` when empty.
    pub fn clamp_index(&self, index: i64) -> Option<usize> {
        let last = self.frames.len().checked_sub(1)?;
        Some(index.clamp(0, last as i64) as usize)
    }

    /// Frame at `index`.
    pub fn get(&self, index: usize) -> Option<&DecodedFrame> {
        self.frames.get(index)
    }

    /// Index most recently presented.
    pub fn last_painted_index(&self) -> Option<usize> {
        self.last_painted
    }

    pub(crate) fn set_last_painted(&mut self, index: Option<usize>) {
        self.last_painted = index;
    }

    /// Ledger this store accounts into.
    pub fn ledger(&self) -> &FrameLedger {
        &self.ledger
    }

    /// Close every frame and empty the store.
    pub fn release_all(&mut self) {
        let n = self.frames.len();
        for f in &mut self.frames {
            f.close();
        }
        self.frames.clear();
        self.last_painted = None;
        if n > 0 {
            tracing::debug!(frames = n, "released frame store");
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/media/store.rs"]
mod tests;
