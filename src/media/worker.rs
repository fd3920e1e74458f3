use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use kurbo::Size;

use crate::animation::ease::Easing;
use crate::foundation::core::CancelToken;
use crate::foundation::error::{ScrollyError, ScrollyResult};
use crate::foundation::math::usable_duration;
use crate::media::decoder::DecoderFactory;
use crate::media::frame::FrameLedger;
use crate::media::pipeline::{DecodeOptions, DecodePipeline};
use crate::media::protocol::{WorkerRequest, WorkerResponse};
use crate::media::source::ByteSource;
use crate::media::store::FrameStore;
use crate::playback::clock::PlaybackClock;
use crate::playback::scheduler::{TickOutcome, TransitionScheduler};
use crate::render::canvas::{CanvasBackend, Surface};
use crate::render::fit::{Layout, ObjectFit};

/// Animation-frame period the worker ticks at while a transition runs.
pub const WORKER_TICK: Duration = Duration::from_micros(16_667);

/// A request plus the values that cannot be serialized.
pub struct WorkerEnvelope {
    /// The command.
    pub request: WorkerRequest,
    /// Surface moved into the worker with `SETUP_CANVAS`.
    pub surface: Option<Box<dyn Surface>>,
    /// Caller easing closure for `REQUEST_TRANSITION`.
    pub easing: Option<Easing>,
}

impl WorkerEnvelope {
    /// Envelope carrying only `request`.
    pub fn new(request: WorkerRequest) -> Self {
        Self {
            request,
            surface: None,
            easing: None,
        }
    }

    /// Move `surface` along with the request.
    pub fn with_surface(mut self, surface: Box<dyn Surface>) -> Self {
        self.surface = Some(surface);
        self
    }

    /// Attach a caller easing.
    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = Some(easing);
        self
    }
}

impl std::fmt::Debug for WorkerEnvelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerEnvelope")
            .field("request", &self.request)
            .field("surface", &self.surface.is_some())
            .field("easing", &self.easing)
            .finish()
    }
}

/// Settings of a worker thread.
#[derive(Clone, Debug, PartialEq)]
pub struct WorkerOptions {
    /// Pipeline tuning.
    pub decode: DecodeOptions,
    /// Frame threshold of the worker's own clock.
    pub frame_threshold: f64,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self {
            decode: DecodeOptions::default(),
            frame_threshold: 0.05,
        }
    }
}

/// Decode pipeline, frame store and canvas scheduler on their own thread.
///
/// Talks to the engine only through [`WorkerEnvelope`]s and [`WorkerResponse`]s.
pub struct DecodeWorker {
    tx: Option<Sender<WorkerEnvelope>>,
    rx: Receiver<WorkerResponse>,
    cancel: CancelToken,
    ledger: FrameLedger,
    handle: Option<JoinHandle<()>>,
}

impl DecodeWorker {
    /// Start a worker thread.
    pub fn spawn(
        decoders: Arc<dyn DecoderFactory>,
        sources: Arc<dyn ByteSource>,
        opts: WorkerOptions,
    ) -> ScrollyResult<Self> {
        let (req_tx, req_rx) = crossbeam_channel::unbounded();
        let (resp_tx, resp_rx) = crossbeam_channel::unbounded();
        let cancel = CancelToken::new();
        let ledger = FrameLedger::new();
        let mut state = WorkerState::new(
            decoders,
            sources,
            opts,
            cancel.clone(),
            ledger.clone(),
            resp_tx,
        );
        let handle = std::thread::Builder::new()
            .name("scrolly-decode".to_owned())
            .spawn(move || state.run(req_rx))
            .map_err(|e| ScrollyError::Other(anyhow::anyhow!("spawn decode worker: {e}")))?;
        Ok(Self {
            tx: Some(req_tx),
            rx: resp_rx,
            cancel,
            ledger,
            handle: Some(handle),
        })
    }

    /// Send a plain request.
    pub fn post(&self, request: WorkerRequest) -> ScrollyResult<()> {
        self.post_envelope(WorkerEnvelope::new(request))
    }

    /// Send a request with attachments.
    pub fn post_envelope(&self, envelope: WorkerEnvelope) -> ScrollyResult<()> {
        let tx = self
            .tx
            .as_ref()
            .ok_or_else(|| ScrollyError::protocol("worker terminated"))?;
        tx.send(envelope)
            .map_err(|_| ScrollyError::protocol("worker thread exited"))
    }

    /// Next reply, if one is waiting.
    ///
    /// Fails with [`ScrollyError::DecoderRuntime`] once the worker thread is gone and every reply
    /// it sent was read.
    pub fn try_recv(&self) -> ScrollyResult<Option<WorkerResponse>> {
        match self.rx.try_recv() {
            Ok(msg) => Ok(Some(msg)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(ScrollyError::decoder("decode worker exited")),
        }
    }

    /// Next reply, waiting up to `timeout`.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<WorkerResponse> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// Frames currently held by the worker.
    pub fn live_frames(&self) -> usize {
        self.ledger.live()
    }

    /// Abandon any decode, stop the thread and wait for it to release its frames.
    pub fn terminate(&mut self) {
        self.cancel.cancel();
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(WorkerEnvelope::new(WorkerRequest::Shutdown));
        }
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            tracing::warn!("decode worker panicked");
        }
    }

    /// Whether [`DecodeWorker::terminate`] already ran.
    pub fn is_terminated(&self) -> bool {
        self.handle.is_none()
    }
}

impl Drop for DecodeWorker {
    fn drop(&mut self) {
        self.terminate();
    }
}

impl std::fmt::Debug for DecodeWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodeWorker")
            .field("terminated", &self.is_terminated())
            .field("live_frames", &self.ledger.live())
            .finish()
    }
}

struct WorkerState {
    decoders: Arc<dyn DecoderFactory>,
    sources: Arc<dyn ByteSource>,
    opts: WorkerOptions,
    cancel: CancelToken,
    ledger: FrameLedger,
    out: Sender<WorkerResponse>,
    decoded: Option<FrameStore>,
    canvas: Option<CanvasBackend>,
    container: Option<(Size, ObjectFit)>,
    clock: PlaybackClock,
    scheduler: TransitionScheduler,
    epoch: Instant,
    next_tick: Instant,
}

impl WorkerState {
    fn new(
        decoders: Arc<dyn DecoderFactory>,
        sources: Arc<dyn ByteSource>,
        opts: WorkerOptions,
        cancel: CancelToken,
        ledger: FrameLedger,
        out: Sender<WorkerResponse>,
    ) -> Self {
        let now = Instant::now();
        Self {
            clock: PlaybackClock::new(opts.frame_threshold),
            decoders,
            sources,
            opts,
            cancel,
            ledger,
            out,
            decoded: None,
            canvas: None,
            container: None,
            scheduler: TransitionScheduler::new(),
            epoch: now,
            next_tick: now,
        }
    }

    fn run(&mut self, rx: Receiver<WorkerEnvelope>) {
        tracing::debug!("decode worker started");
        loop {
            let envelope = if self.scheduler.is_active() {
                match rx.recv_deadline(self.next_tick) {
                    Ok(env) => Some(env),
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            } else {
                match rx.recv() {
                    Ok(env) => Some(env),
                    Err(_) => break,
                }
            };
            if self.cancel.is_cancelled() {
                break;
            }
            if let Some(env) = envelope
                && !self.handle(env)
            {
                break;
            }
            if self.scheduler.is_active() && Instant::now() >= self.next_tick {
                self.tick();
            }
        }
        self.release();
        tracing::debug!("decode worker stopped");
    }

    #[tracing::instrument(skip_all, fields(message = request_name(&env.request)))]
    fn handle(&mut self, env: WorkerEnvelope) -> bool {
        let WorkerEnvelope {
            request,
            surface,
            easing,
        } = env;
        match request {
            WorkerRequest::RequestDecode { src } => self.decode(&src),
            WorkerRequest::SetupCanvas {
                duration,
                current_time,
            } => self.setup_canvas(surface, duration, current_time),
            WorkerRequest::PaintCurrentTime { current_time } => {
                self.clock.current_time = current_time;
                self.paint(|c| c.paint_time(current_time, false));
            }
            WorkerRequest::PaintFrame { frame } => self.paint(|c| c.paint_frame(frame, true)),
            WorkerRequest::RequestTransition {
                target_time,
                current_time,
                options,
            } => {
                if self.canvas.is_none() {
                    self.reply(WorkerResponse::RenderFailed {
                        reason: "transition requested before canvas setup".to_owned(),
                    });
                    return true;
                }
                if let Some(t) = current_time {
                    self.clock.current_time = t;
                }
                self.clock.target_time = target_time;
                self.scheduler
                    .run_transition(options.into_request(easing), &self.clock);
                self.tick();
            }
            WorkerRequest::GetCurrentTime => self.reply(WorkerResponse::CurrentTime {
                current_time: self.clock.current_time,
            }),
            WorkerRequest::Resize {
                container_width,
                container_height,
                fit,
            } => {
                self.container = Some((Size::new(container_width, container_height), fit));
                self.apply_layout();
                self.paint(|c| c.repaint());
            }
            WorkerRequest::Shutdown => return false,
        }
        true
    }

    fn decode(&mut self, src: &str) {
        self.release();
        let result = self
            .sources
            .open(src)
            .and_then(|reader| Ok((reader, self.decoders.create()?)))
            .and_then(|(reader, decoder)| {
                DecodePipeline::new(
                    reader,
                    decoder,
                    self.ledger.clone(),
                    self.opts.decode.clone(),
                    self.cancel.clone(),
                )
                .run()
            });
        match result {
            Ok(store) => {
                let reply = WorkerResponse::DecodingSuccess {
                    frame_count: store.len(),
                    duration: store.duration(),
                };
                self.decoded = Some(store);
                self.reply(reply);
            }
            Err(ScrollyError::Cancelled) => tracing::debug!("decode cancelled"),
            Err(e) => {
                tracing::warn!(src, error = %e, "decode failed");
                self.reply(WorkerResponse::decoding_failed(&e));
            }
        }
    }

    fn setup_canvas(
        &mut self,
        surface: Option<Box<dyn Surface>>,
        duration: Option<f64>,
        current_time: f64,
    ) {
        let Some(surface) = surface else {
            return self.fail_render("no surface transferred");
        };
        let Some(mut store) = self.decoded.take() else {
            return self.fail_render("no decoded frames");
        };
        if store.duration().is_none()
            && let Some(d) = usable_duration(duration)
            && let Err(e) = store.set_duration(d)
        {
            return self.fail_render(&e.to_string());
        }
        if store.frame_rate().is_none() {
            store.release_all();
            return self.fail_render("video duration unknown");
        }
        self.canvas = Some(CanvasBackend::new(store, surface));
        self.apply_layout();
        self.clock.current_time = current_time;
        self.clock.target_time = current_time;
        self.paint(|c| c.paint_time(current_time, true));
        if self.canvas.is_some() {
            self.reply(WorkerResponse::CanvasCreated);
        }
    }

    fn apply_layout(&mut self) {
        let (Some(canvas), Some((container, fit))) = (self.canvas.as_mut(), self.container) else {
            return;
        };
        let Some(first) = canvas.store().get(0) else {
            return;
        };
        let content = Size::new(f64::from(first.width()), f64::from(first.height()));
        canvas.apply_layout(Layout::new(content, container, fit));
    }

    fn paint(&mut self, op: impl FnOnce(&mut CanvasBackend) -> ScrollyResult<bool>) {
        let Some(canvas) = self.canvas.as_mut() else {
            tracing::debug!("paint before canvas setup ignored");
            return;
        };
        if let Err(e) = op(canvas) {
            self.fail_render(&e.to_string());
        }
    }

    fn tick(&mut self) {
        let now_ms = self.epoch.elapsed().as_secs_f64() * 1000.0;
        self.next_tick = Instant::now() + WORKER_TICK;
        let Some(canvas) = self.canvas.as_mut() else {
            self.scheduler.cancel();
            return;
        };
        match self.scheduler.tick(now_ms, &mut self.clock, canvas) {
            Ok(TickOutcome::Converged) => {
                tracing::trace!(current = self.clock.current_time, "worker transition converged");
            }
            Ok(TickOutcome::Continue | TickOutcome::Idle) => {}
            Err(e) => self.fail_render(&e.to_string()),
        }
    }

    fn fail_render(&mut self, reason: &str) {
        tracing::warn!(reason, "worker render failed");
        self.scheduler.cancel();
        if let Some(mut canvas) = self.canvas.take() {
            canvas.release();
        }
        self.reply(WorkerResponse::RenderFailed {
            reason: reason.to_owned(),
        });
    }

    fn reply(&self, msg: WorkerResponse) {
        if self.out.send(msg).is_err() {
            tracing::trace!("worker reply dropped, engine gone");
        }
    }

    fn release(&mut self) {
        self.scheduler.cancel();
        if let Some(mut canvas) = self.canvas.take() {
            canvas.release();
        }
        if let Some(mut store) = self.decoded.take() {
            store.release_all();
        }
    }
}

fn request_name(request: &WorkerRequest) -> &'static str {
    match request {
        WorkerRequest::RequestDecode { .. } => "REQUEST_DECODE",
        WorkerRequest::SetupCanvas { .. } => "SETUP_CANVAS",
        WorkerRequest::PaintCurrentTime { .. } => "PAINT_CURRENT_TIME",
        WorkerRequest::PaintFrame { .. } => "PAINT_FRAME",
        WorkerRequest::RequestTransition { .. } => "REQUEST_TRANSITION",
        WorkerRequest::GetCurrentTime => "GET_CURRENT_TIME",
        WorkerRequest::Resize { .. } => "RESIZE",
        WorkerRequest::Shutdown => "SHUTDOWN",
    }
}

#[cfg(test)]
#[path = "../../tests/unit/media/worker.rs"]
mod tests;
