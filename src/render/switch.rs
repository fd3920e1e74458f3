use std::time::{Duration, Instant};

use kurbo::Size;

use crate::animation::ease::Easing;
use crate::foundation::error::ScrollyResult;
use crate::media::protocol::{WorkerRequest, WorkerResponse};
use crate::media::worker::{DecodeWorker, WorkerEnvelope};
use crate::playback::clock::PlaybackClock;
use crate::playback::request::TransitionRequest;
use crate::playback::scheduler::TransitionScheduler;
use crate::render::backend::{EngineMode, RenderBackend};
use crate::render::canvas::CanvasBackend;
use crate::render::fit::{Layout, ObjectFit};
use crate::render::native::NativeBackend;

/// How long leaving remote canvas mode waits for the worker's position.
const RESYNC_TIMEOUT: Duration = Duration::from_millis(250);

/// Where canvas frames are painted.
#[derive(Debug)]
pub enum CanvasTarget {
    /// Frames and surface live on this thread; the engine's scheduler ticks them.
    Local(CanvasBackend),
    /// Frames and surface live on a worker thread with its own scheduler.
    Remote {
        /// The worker.
        worker: DecodeWorker,
        /// Duration reported with `DECODING_SUCCESS`.
        duration: Option<f64>,
    },
}

/// Owns both renderers and decides which one is live.
///
/// Starts in [`EngineMode::NativeVideo`]. Switching cancels the running transition before the
/// other renderer takes over, so the two never render at once.
#[derive(Debug)]
pub struct RenderTargetSwitch {
    native: NativeBackend,
    canvas: Option<CanvasTarget>,
}

impl RenderTargetSwitch {
    /// Native-only switch.
    pub fn new(native: NativeBackend) -> Self {
        Self {
            native,
            canvas: None,
        }
    }

    /// Live renderer.
    pub fn mode(&self) -> EngineMode {
        match self.canvas {
            Some(_) => EngineMode::CanvasFrames,
            None => EngineMode::NativeVideo,
        }
    }

    /// Native backend, live or not.
    pub fn native(&self) -> &NativeBackend {
        &self.native
    }

    /// Native backend, mutably.
    pub fn native_mut(&mut self) -> &mut NativeBackend {
        &mut self.native
    }

    /// Local canvas, when painting on this thread.
    pub fn local_canvas(&self) -> Option<&CanvasBackend> {
        match &self.canvas {
            Some(CanvasTarget::Local(c)) => Some(c),
            _ => None,
        }
    }

    /// Worker, when painting off-thread.
    pub fn worker(&self) -> Option<&DecodeWorker> {
        match &self.canvas {
            Some(CanvasTarget::Remote { worker, .. }) => Some(worker),
            _ => None,
        }
    }

    /// Whether transitions are ticked by the worker rather than the engine.
    pub fn is_remote(&self) -> bool {
        matches!(self.canvas, Some(CanvasTarget::Remote { .. }))
    }

    /// Duration of whatever is live: the frame store in canvas mode, the media otherwise.
    pub fn duration(&self) -> Option<f64> {
        match &self.canvas {
            Some(CanvasTarget::Local(c)) => c.duration(),
            Some(CanvasTarget::Remote { duration, .. }) => duration.or(self.native.duration()),
            None => self.native.duration(),
        }
    }

    /// Backend the engine's scheduler should tick, if it ticks at all.
    pub fn active_backend(&mut self) -> Option<&mut dyn RenderBackend> {
        match &mut self.canvas {
            None => Some(&mut self.native),
            Some(CanvasTarget::Local(c)) => Some(c),
            Some(CanvasTarget::Remote { .. }) => None,
        }
    }

    /// Cancel native animation and take the native element's position as authoritative.
    pub fn sync_from_native(
        &mut self,
        scheduler: &mut TransitionScheduler,
        clock: &mut PlaybackClock,
    ) -> f64 {
        scheduler.cancel();
        self.native.pause();
        let t = self.native.current_position();
        if t.is_finite() {
            clock.current_time = t;
        }
        clock.current_time
    }

    /// Hand rendering to `target`, starting from the native element's position.
    pub fn enter_canvas(
        &mut self,
        mut target: CanvasTarget,
        scheduler: &mut TransitionScheduler,
        clock: &mut PlaybackClock,
    ) -> ScrollyResult<()> {
        let t = self.sync_from_native(scheduler, clock);
        match &mut target {
            CanvasTarget::Local(canvas) => {
                canvas.set_current(t);
                canvas.paint_time(t, true)?;
            }
            CanvasTarget::Remote { worker, .. } => {
                worker.post(WorkerRequest::PaintCurrentTime { current_time: t })?;
            }
        }
        let remote = matches!(target, CanvasTarget::Remote { .. });
        tracing::info!(current = t, remote, "switched to canvas frames");
        self.canvas = Some(target);
        Ok(())
    }

    /// Return rendering to the native element at the canvas's last position.
    ///
    /// Frames are released and a worker is terminated. Returns the resynchronized time.
    pub fn leave_canvas(
        &mut self,
        scheduler: &mut TransitionScheduler,
        clock: &mut PlaybackClock,
    ) -> ScrollyResult<f64> {
        scheduler.cancel();
        let Some(target) = self.canvas.take() else {
            return Ok(clock.current_time);
        };
        let t = match target {
            CanvasTarget::Local(mut canvas) => {
                let t = canvas.current_position();
                canvas.release();
                t
            }
            CanvasTarget::Remote { mut worker, .. } => {
                let t = remote_current_time(&worker).unwrap_or(clock.current_time);
                worker.terminate();
                t
            }
        };
        if t.is_finite() {
            clock.current_time = t;
        }
        self.native.seek_to(clock.current_time)?;
        tracing::info!(current = clock.current_time, "switched to native video");
        Ok(clock.current_time)
    }

    /// Paint frame `index` (clamped). No-op in native mode.
    pub fn paint_frame(&mut self, index: i64, force: bool) -> ScrollyResult<bool> {
        match &mut self.canvas {
            Some(CanvasTarget::Local(c)) => c.paint_frame(index, force),
            Some(CanvasTarget::Remote { worker, .. }) => {
                worker.post(WorkerRequest::PaintFrame { frame: index })?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Drive the native element directly. No-op in canvas mode.
    pub fn seek_native(&mut self, time: f64, playing: bool, rate: f64) -> ScrollyResult<()> {
        if self.canvas.is_some() || !time.is_finite() {
            return Ok(());
        }
        if playing {
            self.native.element_mut().set_current_time(time);
            self.native.play(rate)
        } else {
            self.native.seek_to(time)
        }
    }

    /// Re-place the frame in a resized container and repaint it.
    pub fn resize(&mut self, container: Size, fit: ObjectFit) -> ScrollyResult<()> {
        match &mut self.canvas {
            Some(CanvasTarget::Local(c)) => {
                if let Some(first) = c.store().get(0) {
                    let content = Size::new(f64::from(first.width()), f64::from(first.height()));
                    c.apply_layout(Layout::new(content, container, fit));
                }
                c.repaint().map(|_| ())
            }
            Some(CanvasTarget::Remote { worker, .. }) => worker.post(WorkerRequest::Resize {
                container_width: container.width,
                container_height: container.height,
                fit,
            }),
            None => Ok(()),
        }
    }

    /// Forward a transition to the worker.
    pub fn request_remote_transition(
        &self,
        request: &TransitionRequest,
        clock: &PlaybackClock,
        skipped_ahead: bool,
    ) -> ScrollyResult<()> {
        let Some(worker) = self.worker() else {
            return Ok(());
        };
        let easing = match &request.easing {
            Easing::Custom(_) => Some(request.easing.clone()),
            Easing::Preset(_) => None,
        };
        let envelope = WorkerEnvelope {
            request: WorkerRequest::RequestTransition {
                target_time: clock.target_time,
                current_time: skipped_ahead.then_some(clock.current_time),
                options: request.to_wire(),
            },
            surface: None,
            easing,
        };
        worker.post_envelope(envelope)
    }

    /// Next message from the worker, if any.
    pub fn poll_worker(&self) -> ScrollyResult<Option<WorkerResponse>> {
        self.worker().map_or(Ok(None), DecodeWorker::try_recv)
    }

    /// Release every frame and stop the worker. The switch is native-only afterwards.
    pub fn release(&mut self) {
        match self.canvas.take() {
            Some(CanvasTarget::Local(mut c)) => c.release(),
            Some(CanvasTarget::Remote { mut worker, .. }) => worker.terminate(),
            None => {}
        }
    }
}

/// Ask the worker where it is, skipping unrelated replies.
///
/// Replies already queued answer older requests and are dropped first. A gone worker answers
/// nothing, so there is no wait.
fn remote_current_time(worker: &DecodeWorker) -> Option<f64> {
    while let Some(queued) = worker.try_recv().ok()? {
        tracing::trace!(?queued, "dropping queued worker reply");
    }
    worker.post(WorkerRequest::GetCurrentTime).ok()?;
    let deadline = Instant::now() + RESYNC_TIMEOUT;
    loop {
        let left = deadline.checked_duration_since(Instant::now())?;
        match worker.recv_timeout(left)? {
            WorkerResponse::CurrentTime { current_time } => return Some(current_time),
            other => tracing::debug!(?other, "skipping worker reply during resync"),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/switch.rs"]
mod tests;
