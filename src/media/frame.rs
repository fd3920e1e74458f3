use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::foundation::error::{ScrollyError, ScrollyResult};

/// Tightly packed RGBA8 frame as produced by a decoder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawFrame {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Presentation timestamp in microseconds.
    pub timestamp_us: i64,
    /// `width * height * 4` bytes.
    pub data: Vec<u8>,
}

/// Counts decoded frames that have not been released yet.
///
/// Clones share the same counter, so a test or a host can watch a store it no longer owns.
#[derive(Clone, Debug, Default)]
pub struct FrameLedger(Arc<AtomicUsize>);

impl FrameLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames acquired and not yet released.
    pub fn live(&self) -> usize {
        self.0.load(Ordering::Acquire)
    }

    fn acquire(&self) {
        self.0.fetch_add(1, Ordering::AcqRel);
    }

    fn release(&self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// A paintable frame owned by a [`crate::FrameStore`].
///
/// Pixels are released by [`DecodedFrame::close`] or on drop, whichever comes first.
#[derive(Debug)]
pub struct DecodedFrame {
    index: usize,
    width: u32,
    height: u32,
    timestamp_us: i64,
    pixels: Option<Box<[u8]>>,
    ledger: FrameLedger,
}

impl DecodedFrame {
    /// Take ownership of `raw` as frame number `index`.
    pub fn from_raw(index: usize, raw: RawFrame, ledger: &FrameLedger) -> ScrollyResult<Self> {
        let expected = (raw.width as usize)
            .checked_mul(raw.height as usize)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| ScrollyError::decoder("frame dimensions overflow"))?;
        if raw.width == 0 || raw.height == 0 || raw.data.len() != expected {
            return Err(ScrollyError::decoder(format!(
                "frame {index}: {}x{} needs {expected} bytes, got {}",
                raw.width,
                raw.height,
                raw.data.len()
            )));
        }
        ledger.acquire();
        Ok(Self {
            index,
            width: raw.width,
            height: raw.height,
            timestamp_us: raw.timestamp_us,
            pixels: Some(raw.data.into_boxed_slice()),
            ledger: ledger.clone(),
        })
    }

    /// Position in decode order.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Presentation timestamp in microseconds.
    pub fn timestamp_us(&self) -> i64 {
        self.timestamp_us
    }

    /// RGBA8 pixels; empty once closed.
    pub fn pixels(&self) -> &[u8] {
        self.pixels.as_deref().unwrap_or(&[])
    }

    /// Whether the pixels were released.
    pub fn is_closed(&self) -> bool {
        self.pixels.is_none()
    }

    /// Release the pixels. Idempotent.
    pub fn close(&mut self) {
        if self.pixels.take().is_some() {
            self.ledger.release();
        }
    }
}

impl Drop for DecodedFrame {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/media/frame.rs"]
mod tests;
