use std::io::Read;
use std::time::{Duration, Instant};

use crate::foundation::core::CancelToken;
use crate::foundation::error::{ScrollyError, ScrollyResult};
use crate::media::avcc::AvcDecoderConfig;
use crate::media::decoder::{
    Bitstream, ChunkKind, CodecConfig, DecoderOutput, EncodedChunk, VideoDecoder,
};
use crate::media::frame::FrameLedger;
use crate::media::mp4::{Mp4Demuxer, Mp4Sample};
use crate::media::store::FrameStore;

/// Tuning knobs of a decode session.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DecodeOptions {
    /// Bytes read from the source per step.
    pub read_chunk_size: usize,
    /// How long to wait for trailing frames once the decoder queue is empty after flushing.
    pub drain_grace_ms: u64,
    /// Chunks allowed in the decoder before feeding pauses.
    pub max_decode_queue: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            read_chunk_size: 64 * 1024,
            drain_grace_ms: 500,
            max_decode_queue: 16,
        }
    }
}

/// Progress of a [`DecodePipeline`].
#[derive(Debug)]
pub enum DecodeStep {
    /// More work remains.
    Pending,
    /// Every frame is in the store.
    Complete(FrameStore),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Feeding,
    Draining,
    Done,
}

/// One decode session: source bytes to a populated [`FrameStore`].
///
/// Driven by [`DecodePipeline::step`], so it can run on a worker thread (blocking steps) or be
/// pumped from an animation-frame loop (non-blocking steps).
pub struct DecodePipeline {
    reader: Box<dyn Read + Send>,
    demuxer: Mp4Demuxer,
    decoder: Box<dyn VideoDecoder>,
    store: FrameStore,
    avcc: Option<AvcDecoderConfig>,
    held: Option<Mp4Sample>,
    opts: DecodeOptions,
    cancel: CancelToken,
    phase: Phase,
    eof: bool,
    idle_since: Option<Instant>,
    read_buf: Vec<u8>,
}

impl DecodePipeline {
    /// Start a session reading `reader` into frames accounted on `ledger`.
    pub fn new(
        reader: Box<dyn Read + Send>,
        decoder: Box<dyn VideoDecoder>,
        ledger: FrameLedger,
        opts: DecodeOptions,
        cancel: CancelToken,
    ) -> Self {
        let read_buf = vec![0; opts.read_chunk_size.max(1)];
        Self {
            reader,
            demuxer: Mp4Demuxer::new(),
            decoder,
            store: FrameStore::new(ledger),
            avcc: None,
            held: None,
            opts,
            cancel,
            phase: Phase::Feeding,
            eof: false,
            idle_since: None,
            read_buf,
        }
    }

    /// Frames decoded so far.
    pub fn frames_decoded(&self) -> usize {
        self.store.len()
    }

    /// Do a bounded amount of work.
    ///
    /// With `blocking`, waits briefly for decoder output instead of returning immediately. Any
    /// error releases captured frames and closes the decoder; the pipeline is unusable after.
    pub fn step(&mut self, blocking: bool) -> ScrollyResult<DecodeStep> {
        if self.phase == Phase::Done {
            return Err(ScrollyError::Other(anyhow::anyhow!(
                "decode pipeline already finished"
            )));
        }
        match self.advance(blocking) {
            Ok(true) => self.complete().map(DecodeStep::Complete),
            Ok(false) => Ok(DecodeStep::Pending),
            Err(e) => {
                tracing::warn!(error = %e, frames = self.store.len(), "decode failed");
                self.abort();
                Err(e)
            }
        }
    }

    /// Run to completion on the calling thread.
    #[tracing::instrument(skip_all)]
    pub fn run(mut self) -> ScrollyResult<FrameStore> {
        loop {
            if let DecodeStep::Complete(store) = self.step(true)? {
                return Ok(store);
            }
        }
    }

    /// Release every captured frame and close the decoder.
    pub fn abort(&mut self) {
        self.store.release_all();
        self.decoder.close();
        self.phase = Phase::Done;
    }

    fn advance(&mut self, blocking: bool) -> ScrollyResult<bool> {
        if self.cancel.is_cancelled() {
            return Err(ScrollyError::Cancelled);
        }
        if self.phase == Phase::Feeding {
            if !self.eof && self.held.is_none() {
                self.read_more()?;
            }
            self.feed()?;
            if self.eof && self.held.is_none() && self.demuxer.remaining() == 0 {
                self.decoder.flush()?;
                self.phase = Phase::Draining;
            }
        }
        self.collect(blocking)
    }

    fn read_more(&mut self) -> ScrollyResult<()> {
        let n = loop {
            match self.reader.read(&mut self.read_buf) {
                Ok(n) => break n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(ScrollyError::fetch(format!("read failed: {e}"))),
            }
        };
        if n == 0 {
            self.eof = true;
            self.demuxer.finish()?;
            return Ok(());
        }
        if self.demuxer.append(&self.read_buf[..n])? {
            self.configure()?;
        }
        Ok(())
    }

    fn configure(&mut self) -> ScrollyResult<()> {
        let track = self
            .demuxer
            .track()
            .ok_or_else(|| ScrollyError::unsupported("no video track"))?;
        let config = CodecConfig::from_track(track);
        tracing::debug!(codec = %config.codec, width = config.coded_width, height = config.coded_height, "configuring decoder");
        self.avcc = Some(track.avcc.clone());
        if let Some(d) = track.duration {
            tracing::trace!(duration = d, "container duration");
        }
        self.decoder.configure(&config)
    }

    fn feed(&mut self) -> ScrollyResult<()> {
        let Some(avcc) = &self.avcc else {
            return Ok(());
        };
        while self.decoder.decode_queue_size() < self.opts.max_decode_queue.max(1) {
            let Some(sample) = self.held.take().or_else(|| self.demuxer.next_sample()) else {
                break;
            };
            let data = match self.decoder.bitstream() {
                Bitstream::AnnexB => avcc.to_annex_b(&sample.data, sample.is_sync)?,
                Bitstream::Avcc => sample.data,
            };
            self.decoder.decode(EncodedChunk {
                kind: if sample.is_sync {
                    ChunkKind::Key
                } else {
                    ChunkKind::Delta
                },
                timestamp_us: sample.timestamp_us,
                duration_us: sample.duration_us,
                data,
            })?;
        }
        if self.decoder.decode_queue_size() >= self.opts.max_decode_queue.max(1)
            && self.held.is_none()
        {
            self.held = self.demuxer.next_sample();
        }
        Ok(())
    }

    /// Move decoder output into the store. Returns `true` once decoding is complete.
    fn collect(&mut self, blocking: bool) -> ScrollyResult<bool> {
        let grace = Duration::from_millis(self.opts.drain_grace_ms);
        let mut waited = false;
        loop {
            let out = if blocking && !waited && self.should_wait() {
                waited = true;
                self.decoder.wait_output(Duration::from_millis(20))?
            } else {
                self.decoder.poll_output()?
            };
            match out {
                DecoderOutput::Frame(raw) => {
                    self.store.push(raw)?;
                    self.idle_since = None;
                }
                DecoderOutput::Finished => return Ok(self.phase == Phase::Draining),
                DecoderOutput::Pending => break,
            }
        }

        if self.phase != Phase::Draining || self.decoder.decode_queue_size() > 0 {
            return Ok(false);
        }
        let since = *self.idle_since.get_or_insert_with(Instant::now);
        if since.elapsed() >= grace {
            return Ok(true);
        }
        if blocking {
            std::thread::sleep((grace - since.elapsed()).min(Duration::from_millis(20)));
        }
        Ok(false)
    }

    /// Nothing can be fed right now, so blocking on output makes progress.
    fn should_wait(&self) -> bool {
        self.phase == Phase::Draining || self.held.is_some()
    }

    fn complete(&mut self) -> ScrollyResult<FrameStore> {
        self.decoder.close();
        self.phase = Phase::Done;
        let mut store = std::mem::take(&mut self.store);
        if store.is_empty() {
            return Err(ScrollyError::EmptyResult);
        }
        if let Some(d) = self.demuxer.track().and_then(|t| t.duration) {
            store.set_duration(d)?;
        }
        tracing::info!(frames = store.len(), fps = ?store.frame_rate(), "decode complete");
        Ok(store)
    }
}

impl std::fmt::Debug for DecodePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodePipeline")
            .field("phase", &self.phase)
            .field("eof", &self.eof)
            .field("frames", &self.store.len())
            .finish()
    }
}

/// Decode `reader` to completion on the calling thread.
pub fn decode(
    reader: Box<dyn Read + Send>,
    decoder: Box<dyn VideoDecoder>,
    opts: DecodeOptions,
) -> ScrollyResult<FrameStore> {
    DecodePipeline::new(reader, decoder, FrameLedger::new(), opts, CancelToken::new()).run()
}

#[cfg(test)]
#[path = "../../tests/unit/media/pipeline.rs"]
mod tests;
