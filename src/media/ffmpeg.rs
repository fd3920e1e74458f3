use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::io::{Read, Write};
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use parking_lot::Mutex;

use crate::foundation::error::{ScrollyError, ScrollyResult};
use crate::media::decoder::{
    Bitstream, CodecConfig, DecoderFactory, DecoderOutput, EncodedChunk, VideoDecoder,
};
use crate::media::frame::RawFrame;

/// Whether an `ffmpeg` binary can be run.
pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Settings of an [`FfmpegDecoder`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FfmpegDecoderOpts {
    /// Scale frames down to at most this width, keeping the aspect ratio.
    pub max_width: Option<u32>,
}

impl FfmpegDecoderOpts {
    /// Output size for a `width` x `height` stream. Dimensions are even and at least 2.
    pub fn output_size(&self, width: u32, height: u32) -> (u32, u32) {
        let (w, h) = match self.max_width {
            Some(max) if max > 0 && width > max => {
                let h = (f64::from(height) * f64::from(max) / f64::from(width)).round() as u32;
                (max, h)
            }
            _ => (width, height),
        };
        (even(w), even(h))
    }
}

fn even(v: u32) -> u32 {
    (v & !1).max(2)
}

/// Factory creating one [`FfmpegDecoder`] per session.
#[derive(Clone, Copy, Debug, Default)]
pub struct FfmpegDecoderFactory {
    /// Settings for every decoder.
    pub opts: FfmpegDecoderOpts,
}

impl DecoderFactory for FfmpegDecoderFactory {
    fn create(&self) -> ScrollyResult<Box<dyn VideoDecoder>> {
        Ok(Box::new(FfmpegDecoder::new(self.opts)))
    }
}

enum ReadEvent {
    Frame(Vec<u8>),
    Eof,
    Failed(String),
}

enum Polled {
    Event(ReadEvent),
    Empty,
    Closed,
}

struct Running {
    child: Child,
    chunks: Option<Sender<Vec<u8>>>,
    frames: Receiver<ReadEvent>,
    stderr: Arc<Mutex<String>>,
    threads: Vec<JoinHandle<()>>,
    width: u32,
    height: u32,
}

/// [`VideoDecoder`] backed by the system `ffmpeg` binary.
///
/// Annex-B chunks are piped to `ffmpeg -f h264` on a writer thread; raw RGBA frames are read back
/// on a reader thread. Output is in presentation order, so timestamps are assigned from a min-heap
/// of submitted timestamps.
pub struct FfmpegDecoder {
    opts: FfmpegDecoderOpts,
    running: Option<Running>,
    pending_ts: BinaryHeap<Reverse<i64>>,
    submitted: usize,
    emitted: usize,
    flushed: bool,
    finished: bool,
}

impl FfmpegDecoder {
    /// Unconfigured decoder.
    pub fn new(opts: FfmpegDecoderOpts) -> Self {
        Self {
            opts,
            running: None,
            pending_ts: BinaryHeap::new(),
            submitted: 0,
            emitted: 0,
            flushed: false,
            finished: false,
        }
    }

    fn spawn(&self, config: &CodecConfig) -> ScrollyResult<Running> {
        if !config.codec.starts_with("avc1") && !config.codec.starts_with("avc3") {
            return Err(ScrollyError::decoder(format!(
                "codec '{}' not supported by the ffmpeg decoder",
                config.codec
            )));
        }
        let (width, height) = self
            .opts
            .output_size(config.coded_width, config.coded_height);

        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .args([
                "-hide_banner",
                "-loglevel",
                "error",
                "-f",
                "h264",
                "-i",
                "pipe:0",
                "-an",
                "-fps_mode",
                "passthrough",
                "-vf",
                &format!("scale={width}:{height}"),
                "-f",
                "rawvideo",
                "-pix_fmt",
                "rgba",
                "pipe:1",
            ]);
        let mut child = cmd.spawn().map_err(|e| {
            ScrollyError::decoder(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;

        let stdin = child.stdin.take();
        let stdout = child.stdout.take();
        let stderr_pipe = child.stderr.take();
        let (Some(mut stdin), Some(mut stdout), Some(mut stderr_pipe)) =
            (stdin, stdout, stderr_pipe)
        else {
            let _ = child.kill();
            return Err(ScrollyError::decoder("failed to open ffmpeg pipes"));
        };

        let (chunk_tx, chunk_rx) = crossbeam_channel::unbounded::<Vec<u8>>();
        let (frame_tx, frame_rx) = crossbeam_channel::unbounded();
        let stderr = Arc::new(Mutex::new(String::new()));
        let frame_len = width as usize * height as usize * 4;

        let writer = std::thread::spawn(move || {
            for chunk in chunk_rx {
                if let Err(e) = stdin.write_all(&chunk) {
                    tracing::debug!(error = %e, "ffmpeg stdin closed");
                    return;
                }
            }
        });
        let reader = std::thread::spawn(move || {
            loop {
                let mut buf = vec![0u8; frame_len];
                let event = match read_frame(&mut stdout, &mut buf) {
                    Ok(true) => ReadEvent::Frame(buf),
                    Ok(false) => ReadEvent::Eof,
                    Err(e) => ReadEvent::Failed(e.to_string()),
                };
                let done = !matches!(event, ReadEvent::Frame(_));
                if frame_tx.send(event).is_err() || done {
                    return;
                }
            }
        });
        let stderr_sink = stderr.clone();
        let drain = std::thread::spawn(move || {
            let mut s = String::new();
            if stderr_pipe.read_to_string(&mut s).is_ok() {
                stderr_sink.lock().push_str(&s);
            }
        });

        tracing::debug!(codec = %config.codec, width, height, "spawned ffmpeg decoder");
        Ok(Running {
            child,
            chunks: Some(chunk_tx),
            frames: frame_rx,
            stderr,
            threads: vec![writer, reader, drain],
            width,
            height,
        })
    }

    fn on_polled(&mut self, polled: Polled) -> ScrollyResult<DecoderOutput> {
        let Some(running) = self.running.as_mut() else {
            return Err(ScrollyError::decoder("ffmpeg decoder not configured"));
        };
        match polled {
            Polled::Event(ReadEvent::Frame(data)) => {
                self.emitted += 1;
                let timestamp_us = self.pending_ts.pop().map_or(0, |Reverse(ts)| ts);
                Ok(DecoderOutput::Frame(RawFrame {
                    width: running.width,
                    height: running.height,
                    timestamp_us,
                    data,
                }))
            }
            Polled::Event(ReadEvent::Eof) | Polled::Closed => {
                let status = running
                    .child
                    .wait()
                    .map_err(|e| ScrollyError::decoder(format!("wait for ffmpeg: {e}")))?;
                if !status.success() {
                    let stderr = running.stderr.lock().trim().to_owned();
                    return Err(ScrollyError::decoder(format!(
                        "ffmpeg exited with status {status}: {stderr}"
                    )));
                }
                if !self.flushed {
                    return Err(ScrollyError::decoder("ffmpeg stopped before end of stream"));
                }
                self.finished = true;
                self.pending_ts.clear();
                self.submitted = self.emitted;
                Ok(DecoderOutput::Finished)
            }
            Polled::Event(ReadEvent::Failed(e)) => {
                Err(ScrollyError::decoder(format!("read ffmpeg output: {e}")))
            }
            Polled::Empty => Ok(DecoderOutput::Pending),
        }
    }
}

impl VideoDecoder for FfmpegDecoder {
    fn bitstream(&self) -> Bitstream {
        Bitstream::AnnexB
    }

    fn configure(&mut self, config: &CodecConfig) -> ScrollyResult<()> {
        if self.running.is_some() {
            return Err(ScrollyError::decoder("ffmpeg decoder already configured"));
        }
        self.running = Some(self.spawn(config)?);
        Ok(())
    }

    fn decode(&mut self, chunk: EncodedChunk) -> ScrollyResult<()> {
        let Some(tx) = self.running.as_ref().and_then(|r| r.chunks.as_ref()) else {
            return Err(ScrollyError::decoder("ffmpeg decoder is not accepting chunks"));
        };
        tx.send(chunk.data)
            .map_err(|_| ScrollyError::decoder("ffmpeg writer stopped"))?;
        self.pending_ts.push(Reverse(chunk.timestamp_us));
        self.submitted += 1;
        Ok(())
    }

    fn decode_queue_size(&self) -> usize {
        self.submitted.saturating_sub(self.emitted)
    }

    fn poll_output(&mut self) -> ScrollyResult<DecoderOutput> {
        if self.finished {
            return Ok(DecoderOutput::Finished);
        }
        let polled = match self.running.as_ref().map(|r| r.frames.try_recv()) {
            Some(Ok(ev)) => Polled::Event(ev),
            Some(Err(TryRecvError::Empty)) => Polled::Empty,
            Some(Err(TryRecvError::Disconnected)) => Polled::Closed,
            None => return Err(ScrollyError::decoder("ffmpeg decoder not configured")),
        };
        self.on_polled(polled)
    }

    fn wait_output(&mut self, timeout: Duration) -> ScrollyResult<DecoderOutput> {
        if self.finished {
            return Ok(DecoderOutput::Finished);
        }
        let polled = match self.running.as_ref().map(|r| r.frames.recv_timeout(timeout)) {
            Some(Ok(ev)) => Polled::Event(ev),
            Some(Err(RecvTimeoutError::Timeout)) => Polled::Empty,
            Some(Err(RecvTimeoutError::Disconnected)) => Polled::Closed,
            None => return Err(ScrollyError::decoder("ffmpeg decoder not configured")),
        };
        self.on_polled(polled)
    }

    fn flush(&mut self) -> ScrollyResult<()> {
        if let Some(running) = self.running.as_mut() {
            running.chunks.take();
        }
        self.flushed = true;
        Ok(())
    }

    fn close(&mut self) {
        let Some(mut running) = self.running.take() else {
            return;
        };
        running.chunks.take();
        if !self.finished {
            let _ = running.child.kill();
        }
        let _ = running.child.wait();
        drop(running.frames);
        for t in running.threads {
            let _ = t.join();
        }
    }
}

impl Drop for FfmpegDecoder {
    fn drop(&mut self) {
        self.close();
    }
}

/// Fill `buf` with one frame. `Ok(false)` on a clean end of stream.
fn read_frame(r: &mut impl Read, buf: &mut [u8]) -> std::io::Result<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(false),
            Ok(0) => {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "truncated frame",
                ));
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(true)
}

#[cfg(test)]
#[path = "../../tests/unit/media/ffmpeg.rs"]
mod tests;
