//! The [`ScrollyVideo`] engine: wires position control, transitions, decoding and rendering to the
//! host's collaborators.
//!
//! The host drives the engine with three kinds of calls:
//! - events: [`ScrollyVideo::on_scroll`], [`ScrollyVideo::on_external_position_change`],
//!   [`ScrollyVideo::media_metadata_ready`], [`ScrollyVideo::viewport_resized`];
//! - commands: [`ScrollyVideo::set_video_percentage`], [`ScrollyVideo::set_easing`];
//! - [`ScrollyVideo::frame`] once per display refresh, which ticks transitions and pumps decoding.
//!
//! Decode and render failures never surface as errors: the engine logs them and keeps playing
//! through the native element.

pub(crate) mod config;
pub(crate) mod scroll;

use std::sync::Arc;

use kurbo::Size;

use crate::animation::ease::Easing;
use crate::engine::config::{DecodeMode, EngineConfig};
use crate::engine::scroll::{ScrollEvent, ScrollGeometry, ScrollHost, ScrollSync};
use crate::foundation::core::CancelToken;
use crate::foundation::error::{ScrollyError, ScrollyResult};
use crate::foundation::math::usable_duration;
use crate::media::decoder::DecoderFactory;
use crate::media::frame::FrameLedger;
use crate::media::pipeline::{DecodePipeline, DecodeStep};
use crate::media::protocol::{WorkerRequest, WorkerResponse};
use crate::media::source::{ByteSource, default_source};
use crate::media::store::FrameStore;
use crate::media::worker::{DecodeWorker, WorkerEnvelope, WorkerOptions};
use crate::playback::clock::PlaybackClock;
use crate::playback::controller::{
    PositionController, TargetContext, TargetDecision, TransitionDefaults,
};
use crate::playback::request::TransitionOpts;
use crate::playback::scheduler::{TickOutcome, TransitionScheduler};
use crate::render::backend::{EngineMode, RenderBackend};
use crate::render::canvas::{CanvasBackend, Surface};
use crate::render::fit::Layout;
use crate::render::native::{MediaElement, NativeBackend};
use crate::render::switch::{CanvasTarget, RenderTargetSwitch};

/// Called once the engine settled into its initial mode.
pub type ReadyHook = Box<dyn FnMut() + Send>;
/// Called with every external position the engine accepts.
pub type PositionHook = Box<dyn FnMut(f64) + Send>;

/// Collaborators handed to [`ScrollyVideo::new`].
pub struct Mount {
    /// The native media element. Always required.
    pub element: Box<dyn MediaElement>,
    /// Paint target for decoded frames. Without one the engine stays native.
    pub surface: Option<Box<dyn Surface>>,
    /// Scroll collaborator for programmatic scrolling.
    pub scroll: Option<Box<dyn ScrollHost>>,
    /// Decoder backend. Without one the engine stays native.
    pub decoders: Option<Arc<dyn DecoderFactory>>,
    /// Resolves `src` to bytes.
    pub sources: Arc<dyn ByteSource>,
    /// See [`ReadyHook`].
    pub on_ready: Option<ReadyHook>,
    /// See [`PositionHook`].
    pub on_position_changed: Option<PositionHook>,
}

impl Mount {
    /// Native-only mount around `element`.
    pub fn new(element: Box<dyn MediaElement>) -> Self {
        Self {
            element,
            surface: None,
            scroll: None,
            decoders: None,
            sources: default_source(),
            on_ready: None,
            on_position_changed: None,
        }
    }

    /// Add a canvas surface.
    pub fn with_surface(mut self, surface: Box<dyn Surface>) -> Self {
        self.surface = Some(surface);
        self
    }

    /// Add a scroll collaborator.
    pub fn with_scroll(mut self, scroll: Box<dyn ScrollHost>) -> Self {
        self.scroll = Some(scroll);
        self
    }

    /// Add a decoder backend.
    pub fn with_decoders(mut self, decoders: Arc<dyn DecoderFactory>) -> Self {
        self.decoders = Some(decoders);
        self
    }

    /// Replace the byte source.
    pub fn with_sources(mut self, sources: Arc<dyn ByteSource>) -> Self {
        self.sources = sources;
        self
    }

    /// Set the ready hook.
    pub fn on_ready(mut self, f: impl FnMut() + Send + 'static) -> Self {
        self.on_ready = Some(Box::new(f));
        self
    }

    /// Set the position hook.
    pub fn on_position_changed(mut self, f: impl FnMut(f64) + Send + 'static) -> Self {
        self.on_position_changed = Some(Box::new(f));
        self
    }
}

impl std::fmt::Debug for Mount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mount")
            .field("surface", &self.surface.is_some())
            .field("scroll", &self.scroll.is_some())
            .field("decoders", &self.decoders.is_some())
            .finish_non_exhaustive()
    }
}

/// Where decoding stands.
enum DecodeState {
    /// Decoding never started or already settled.
    Idle,
    /// In-thread pipeline pumped by [`ScrollyVideo::frame`].
    InThread(DecodePipeline),
    /// Worker decoding.
    WorkerDecoding(DecodeWorker),
    /// Worker decoded and is setting up its canvas.
    WorkerSettingUp {
        worker: DecodeWorker,
        duration: Option<f64>,
    },
    /// In-thread frames wait for a duration from the native element.
    AwaitingDuration(FrameStore),
}

impl DecodeState {
    fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::InThread(_) => "in_thread",
            Self::WorkerDecoding(_) => "worker_decoding",
            Self::WorkerSettingUp { .. } => "worker_setting_up",
            Self::AwaitingDuration(_) => "awaiting_duration",
        }
    }
}

/// Scroll-driven video engine.
pub struct ScrollyVideo {
    config: EngineConfig,
    clock: PlaybackClock,
    controller: PositionController,
    scheduler: TransitionScheduler,
    defaults: TransitionDefaults,
    switch: RenderTargetSwitch,
    decode: DecodeState,
    surface: Option<Box<dyn Surface>>,
    ledger: FrameLedger,
    cancel: CancelToken,
    scroll_host: Option<Box<dyn ScrollHost>>,
    scroll_sync: ScrollSync,
    geometry: Option<ScrollGeometry>,
    container: Option<Size>,
    media_duration: Option<f64>,
    video_percentage: f64,
    awaiting_time: bool,
    on_ready: Option<ReadyHook>,
    on_position_changed: Option<PositionHook>,
    ready: bool,
    destroyed: bool,
    now_ms: f64,
}

impl ScrollyVideo {
    /// Validate `config`, wire `mount` and start decoding when possible.
    ///
    /// Only configuration errors fail; anything that goes wrong with decoding leaves the engine in
    /// native mode.
    #[tracing::instrument(skip_all, fields(src = %config.src))]
    pub fn new(config: EngineConfig, mount: Mount) -> ScrollyResult<Self> {
        config.validate()?;
        let Mount {
            element,
            surface,
            scroll,
            decoders,
            sources,
            on_ready,
            on_position_changed,
        } = mount;

        let mut engine = Self {
            clock: PlaybackClock::new(config.frame_threshold),
            controller: PositionController::new(),
            scheduler: TransitionScheduler::new(),
            defaults: TransitionDefaults {
                transition_speed_ms: config.transition_speed_ms,
                easing: Easing::Preset(config.ease),
            },
            switch: RenderTargetSwitch::new(NativeBackend::new(element)),
            decode: DecodeState::Idle,
            surface,
            ledger: FrameLedger::new(),
            cancel: CancelToken::new(),
            scroll_host: scroll,
            scroll_sync: ScrollSync::new(config.lock_scroll),
            geometry: None,
            container: None,
            media_duration: None,
            video_percentage: 0.0,
            awaiting_time: false,
            on_ready,
            on_position_changed,
            ready: false,
            destroyed: false,
            now_ms: 0.0,
            config,
        };
        engine.start_decode(decoders, sources);
        if matches!(engine.decode, DecodeState::Idle) {
            engine.fire_ready();
        }
        Ok(engine)
    }

    fn start_decode(
        &mut self,
        decoders: Option<Arc<dyn DecoderFactory>>,
        sources: Arc<dyn ByteSource>,
    ) {
        if !self.config.use_decode_pipeline {
            tracing::debug!("decode pipeline disabled");
            return;
        }
        let (Some(decoders), true) = (decoders, self.surface.is_some()) else {
            tracing::info!("no decoder or surface, staying on native video");
            return;
        };
        match self.config.decode_mode {
            DecodeMode::Worker => {
                let opts = WorkerOptions {
                    decode: self.config.decode.clone(),
                    frame_threshold: self.config.frame_threshold,
                };
                let started = DecodeWorker::spawn(decoders, sources, opts).and_then(|w| {
                    w.post(WorkerRequest::RequestDecode {
                        src: self.config.src.clone(),
                    })?;
                    Ok(w)
                });
                match started {
                    Ok(worker) => self.decode = DecodeState::WorkerDecoding(worker),
                    Err(e) => self.fall_back(&e),
                }
            }
            DecodeMode::InThread => {
                let started = sources.open(&self.config.src).and_then(|reader| {
                    Ok(DecodePipeline::new(
                        reader,
                        decoders.create()?,
                        self.ledger.clone(),
                        self.config.decode.clone(),
                        self.cancel.clone(),
                    ))
                });
                match started {
                    Ok(pipeline) => self.decode = DecodeState::InThread(pipeline),
                    Err(e) => self.fall_back(&e),
                }
            }
        }
    }

    /// Options the engine was built with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Live renderer.
    pub fn mode(&self) -> EngineMode {
        self.switch.mode()
    }

    /// Position last rendered, in seconds.
    pub fn current_time(&self) -> f64 {
        self.clock.current_time
    }

    /// Position being moved toward, in seconds.
    pub fn target_time(&self) -> f64 {
        self.clock.target_time
    }

    /// Last accepted external percentage.
    pub fn video_percentage(&self) -> f64 {
        self.video_percentage
    }

    /// Whether the ready hook fired.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Whether decoding is still in progress.
    pub fn is_decoding(&self) -> bool {
        !matches!(self.decode, DecodeState::Idle)
    }

    /// Whether a transition is running on this thread.
    pub fn is_transitioning(&self) -> bool {
        self.scheduler.is_active()
    }

    /// Decoded frames currently held, on this thread or the worker.
    pub fn live_frames(&self) -> usize {
        let worker = match &self.decode {
            DecodeState::WorkerDecoding(w) | DecodeState::WorkerSettingUp { worker: w, .. } => {
                Some(w)
            }
            _ => self.switch.worker(),
        };
        self.ledger.live() + worker.map_or(0, DecodeWorker::live_frames)
    }

    /// Native backend, for hosts that need the element.
    pub fn native(&self) -> &NativeBackend {
        self.switch.native()
    }

    /// Replace the default easing for transitions without their own.
    pub fn set_easing(&mut self, easing: Easing) {
        self.defaults.easing = easing;
    }

    /// Duration of whatever is live.
    fn duration(&self) -> Option<f64> {
        usable_duration(self.switch.duration()).or(self.media_duration)
    }

    fn fire_ready(&mut self) {
        if self.ready {
            return;
        }
        self.ready = true;
        tracing::info!(mode = ?self.mode(), "engine ready");
        if let Some(hook) = self.on_ready.as_mut() {
            hook();
        }
    }

    fn fire_position(&mut self, p: f64) {
        if let Some(hook) = self.on_position_changed.as_mut() {
            hook(p);
        }
    }

    /// A scroll happened on the host page.
    pub fn on_scroll(&mut self, geometry: ScrollGeometry) {
        if self.destroyed || !self.config.track_scroll {
            return;
        }
        self.geometry = Some(geometry);
        match self.scroll_sync.on_scroll(&geometry, self.now_ms) {
            ScrollEvent::Position(p) => self.on_external_position_change(p, false),
            ScrollEvent::Arrived | ScrollEvent::Suppressed => {}
        }
    }

    /// Record the page geometry without treating it as a scroll.
    pub fn set_scroll_geometry(&mut self, geometry: ScrollGeometry) {
        self.geometry = Some(geometry);
    }

    /// An external position signal, e.g. from a scroll measurement.
    pub fn on_external_position_change(&mut self, p: f64, jump: bool) {
        if self.destroyed || p.is_nan() {
            return;
        }
        self.video_percentage = p;
        self.fire_position(p);
        let opts = TransitionOpts {
            jump,
            ..TransitionOpts::default()
        };
        self.set_target_percentage(p, opts);
    }

    /// Move the video to `p` programmatically, scrolling the host along when tracking scroll.
    pub fn set_video_percentage(&mut self, p: f64, opts: TransitionOpts) {
        if self.destroyed || p.is_nan() {
            return;
        }
        self.scheduler.cancel();
        self.video_percentage = p;
        self.fire_position(p);
        if self.config.track_scroll
            && let (Some(host), Some(geometry)) = (self.scroll_host.as_deref_mut(), self.geometry)
        {
            self.scroll_sync.scroll_to_percentage(p, &geometry, host);
        }
        self.set_target_percentage(p, opts);
    }

    /// Map `p` to a target time and schedule the transition there.
    pub fn set_target_percentage(&mut self, p: f64, opts: TransitionOpts) {
        if self.destroyed {
            return;
        }
        let remote = self.switch.is_remote();
        let ctx = TargetContext {
            duration: self.duration(),
            transition_active: self.scheduler.is_active(),
            mode: self.mode(),
        };
        let decision =
            self.controller
                .set_target_percentage(p, opts, &self.defaults, &mut self.clock, ctx);
        let TargetDecision::Schedule {
            request,
            resume_forward,
            skipped_ahead,
        } = decision
        else {
            return;
        };
        if remote {
            if let Err(e) = self
                .switch
                .request_remote_transition(&request, &self.clock, skipped_ahead)
            {
                self.fall_back(&e);
            }
            return;
        }
        if resume_forward {
            let native = self.switch.native_mut();
            if native.supports_play_rate()
                && let Err(e) = native.play(1.0)
            {
                tracing::debug!(error = %e, "resume forward failed");
            }
        }
        self.scheduler.run_transition(request, &self.clock);
    }

    /// The native element knows its duration.
    pub fn media_metadata_ready(&mut self, duration: f64) {
        if self.destroyed {
            return;
        }
        tracing::debug!(duration, "media metadata ready");
        self.media_duration = usable_duration(Some(duration));
        if matches!(self.decode, DecodeState::AwaitingDuration(_))
            && let DecodeState::AwaitingDuration(mut store) =
                std::mem::replace(&mut self.decode, DecodeState::Idle)
        {
            match store.set_duration(duration) {
                Ok(()) => self.finish_local_decode(store),
                Err(e) => self.fall_back(&e),
            }
        }
        let pending = self.controller.take_pending();
        if self.config.track_scroll {
            let p = pending.map_or(self.video_percentage, |(p, _)| p);
            self.set_target_percentage(p, TransitionOpts::jump());
        } else if let Some((p, opts)) = pending {
            self.set_target_percentage(p, opts);
        } else {
            self.set_target_percentage(0.0, TransitionOpts::jump());
        }
    }

    /// The container changed size. Repaints without moving the target.
    pub fn viewport_resized(&mut self, width: f64, height: f64) {
        if self.destroyed {
            return;
        }
        let size = Size::new(width, height);
        self.container = Some(size);
        if let Err(e) = self.switch.resize(size, self.config.object_fit) {
            self.fall_back(&e);
        }
    }

    /// Paint a specific frame. Only honored with `debug` set and in canvas mode.
    pub fn paint_frame(&mut self, index: i64) -> bool {
        if !self.config.debug {
            tracing::warn!("paint_frame requires debug mode");
            return false;
        }
        match self.switch.paint_frame(index, true) {
            Ok(painted) => painted,
            Err(e) => {
                self.fall_back(&e);
                false
            }
        }
    }

    /// Advance one display frame at timestamp `now_ms`.
    pub fn frame(&mut self, now_ms: f64) {
        if self.destroyed {
            return;
        }
        self.now_ms = now_ms;
        self.pump_decode();
        self.pump_worker();
        if let (Some(host), Some(geometry)) = (self.scroll_host.as_deref_mut(), self.geometry) {
            self.scroll_sync.poll(now_ms, &geometry, host);
        }
        self.tick(now_ms);
    }

    fn tick(&mut self, now_ms: f64) {
        if !self.scheduler.is_active() {
            return;
        }
        let Some(backend) = self.switch.active_backend() else {
            self.scheduler.cancel();
            return;
        };
        match self.scheduler.tick(now_ms, &mut self.clock, backend) {
            Ok(TickOutcome::Converged) => {
                tracing::trace!(current = self.clock.current_time, "transition converged");
            }
            Ok(TickOutcome::Continue | TickOutcome::Idle) => {}
            Err(e) => self.fall_back(&e),
        }
    }

    fn pump_decode(&mut self) {
        let step = match &mut self.decode {
            DecodeState::InThread(pipeline) => pipeline.step(false),
            _ => return,
        };
        match step {
            Ok(DecodeStep::Pending) => {}
            Ok(DecodeStep::Complete(mut store)) => {
                self.decode = DecodeState::Idle;
                if store.duration().is_none() {
                    match usable_duration(self.switch.native().duration()).or(self.media_duration) {
                        Some(d) => {
                            if let Err(e) = store.set_duration(d) {
                                return self.fall_back(&e);
                            }
                        }
                        None => {
                            tracing::debug!("frames ready, waiting for media duration");
                            self.decode = DecodeState::AwaitingDuration(store);
                            return;
                        }
                    }
                }
                self.finish_local_decode(store);
            }
            Err(e) => {
                self.decode = DecodeState::Idle;
                self.fall_back(&e);
            }
        }
    }

    fn finish_local_decode(&mut self, store: FrameStore) {
        let Some(surface) = self.surface.take() else {
            return self.fall_back(&ScrollyError::configuration("surface already consumed"));
        };
        let mut canvas = CanvasBackend::new(store, surface);
        if let (Some(container), Some(first)) = (self.container, canvas.store().get(0)) {
            let content = Size::new(f64::from(first.width()), f64::from(first.height()));
            canvas.apply_layout(Layout::new(content, container, self.config.object_fit));
        }
        match self.switch.enter_canvas(
            CanvasTarget::Local(canvas),
            &mut self.scheduler,
            &mut self.clock,
        ) {
            Ok(()) => self.fire_ready(),
            Err(e) => self.fall_back(&e),
        }
    }

    fn pump_worker(&mut self) {
        loop {
            let msg = match &self.decode {
                DecodeState::WorkerDecoding(w) | DecodeState::WorkerSettingUp { worker: w, .. } => {
                    w.try_recv()
                }
                _ => self.switch.poll_worker(),
            };
            let msg = match msg {
                Ok(Some(msg)) => msg,
                Ok(None) => break,
                Err(e) => {
                    self.fall_back(&e);
                    break;
                }
            };
            self.on_worker_message(msg);
            if self.destroyed {
                return;
            }
        }
        if self.switch.is_remote()
            && !self.awaiting_time
            && let Some(worker) = self.switch.worker()
        {
            self.awaiting_time = worker.post(WorkerRequest::GetCurrentTime).is_ok();
        }
    }

    #[tracing::instrument(skip_all, fields(state = self.decode.name()))]
    fn on_worker_message(&mut self, msg: WorkerResponse) {
        match msg {
            WorkerResponse::DecodingSuccess {
                frame_count,
                duration,
            } => {
                if !matches!(self.decode, DecodeState::WorkerDecoding(_)) {
                    return;
                }
                let DecodeState::WorkerDecoding(worker) =
                    std::mem::replace(&mut self.decode, DecodeState::Idle)
                else {
                    return;
                };
                tracing::info!(frame_count, ?duration, "worker decoded video");
                let duration = duration
                    .or(usable_duration(self.switch.native().duration()))
                    .or(self.media_duration);
                let current_time = self
                    .switch
                    .sync_from_native(&mut self.scheduler, &mut self.clock);
                let Some(surface) = self.surface.take() else {
                    return self.fall_back(&ScrollyError::configuration("surface already consumed"));
                };
                let mut posted = worker.post_envelope(
                    WorkerEnvelope::new(WorkerRequest::SetupCanvas {
                        duration,
                        current_time,
                    })
                    .with_surface(surface),
                );
                if posted.is_ok()
                    && let Some(container) = self.container
                {
                    posted = worker.post(WorkerRequest::Resize {
                        container_width: container.width,
                        container_height: container.height,
                        fit: self.config.object_fit,
                    });
                }
                match posted {
                    Ok(()) => self.decode = DecodeState::WorkerSettingUp { worker, duration },
                    Err(e) => self.fall_back(&e),
                }
            }
            WorkerResponse::CanvasCreated => {
                if !matches!(self.decode, DecodeState::WorkerSettingUp { .. }) {
                    return;
                }
                let DecodeState::WorkerSettingUp { worker, duration } =
                    std::mem::replace(&mut self.decode, DecodeState::Idle)
                else {
                    return;
                };
                match self.switch.enter_canvas(
                    CanvasTarget::Remote { worker, duration },
                    &mut self.scheduler,
                    &mut self.clock,
                ) {
                    Ok(()) => self.fire_ready(),
                    Err(e) => self.fall_back(&e),
                }
            }
            WorkerResponse::CurrentTime { current_time } => {
                self.awaiting_time = false;
                if self.switch.is_remote() && current_time.is_finite() {
                    self.clock.current_time = current_time;
                }
            }
            WorkerResponse::DecodingFailed { reason, reload } => {
                let err = if reload {
                    ScrollyError::DecoderRuntime(reason)
                } else {
                    ScrollyError::UnsupportedContainer(reason)
                };
                self.fall_back(&err);
            }
            WorkerResponse::RenderFailed { reason } => {
                self.fall_back(&ScrollyError::Other(anyhow::anyhow!(
                    "worker render failed: {reason}"
                )));
            }
        }
    }

    /// Give up on canvas rendering for good and continue on the native element.
    fn fall_back(&mut self, err: &ScrollyError) {
        tracing::warn!(error = %err, "falling back to native video");
        match std::mem::replace(&mut self.decode, DecodeState::Idle) {
            DecodeState::InThread(mut pipeline) => pipeline.abort(),
            DecodeState::WorkerDecoding(mut worker)
            | DecodeState::WorkerSettingUp { mut worker, .. } => worker.terminate(),
            DecodeState::AwaitingDuration(mut store) => store.release_all(),
            DecodeState::Idle => {}
        }
        self.surface = None;
        self.awaiting_time = false;
        if self.switch.mode() == EngineMode::CanvasFrames
            && let Err(e) = self.switch.leave_canvas(&mut self.scheduler, &mut self.clock)
        {
            tracing::warn!(error = %e, "native resync failed");
        }
        if err.requires_reload() {
            self.scheduler.cancel();
            self.switch.native_mut().element_mut().reload();
            self.clock.current_time = 0.0;
            if usable_duration(self.duration()).is_some() {
                self.set_target_percentage(self.video_percentage, TransitionOpts::jump());
            }
        }
        if !self.destroyed {
            self.fire_ready();
        }
    }

    /// Cancel transitions, stop decoding, release every frame and detach collaborators.
    ///
    /// Idempotent. Every other call is a no-op afterwards.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        tracing::debug!("destroying engine");
        self.scheduler.cancel();
        self.cancel.cancel();
        match std::mem::replace(&mut self.decode, DecodeState::Idle) {
            DecodeState::InThread(mut pipeline) => pipeline.abort(),
            DecodeState::WorkerDecoding(mut worker)
            | DecodeState::WorkerSettingUp { mut worker, .. } => worker.terminate(),
            DecodeState::AwaitingDuration(mut store) => store.release_all(),
            DecodeState::Idle => {}
        }
        self.switch.release();
        self.switch.native_mut().pause();
        self.surface = None;
        self.scroll_host = None;
        self.on_ready = None;
        self.on_position_changed = None;
    }

    /// Whether [`ScrollyVideo::destroy`] ran.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }
}

impl Drop for ScrollyVideo {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl std::fmt::Debug for ScrollyVideo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScrollyVideo")
            .field("mode", &self.mode())
            .field("clock", &self.clock)
            .field("decode", &self.decode.name())
            .field("ready", &self.ready)
            .field("destroyed", &self.destroyed)
            .finish()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/engine/mod.rs"]
mod tests;
