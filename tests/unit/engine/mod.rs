use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::*;
use crate::animation::ease::Ease;
use crate::engine::scroll::RecordingScrollHost;
use crate::media::decoder::VideoDecoder;
use crate::media::mp4_fixture::{FixtureSpec, build_avc_mp4};
use crate::media::source::MemorySource;
use crate::media::stub_decoder::{StubBehavior, StubDecoder};
use crate::render::canvas::MemorySurface;
use crate::render::native::SimulatedMediaElement;

const FRAME_MS: f64 = 16.0;

struct Harness {
    engine: ScrollyVideo,
    element: SimulatedMediaElement,
    surface: MemorySurface,
    ready: Arc<AtomicUsize>,
    positions: Arc<Mutex<Vec<f64>>>,
    now: f64,
}

impl Harness {
    /// Advance `ms` of wall time one display frame at a time.
    fn run(&mut self, ms: f64) {
        let end = self.now + ms;
        while self.now < end {
            self.element.advance(FRAME_MS);
            self.now += FRAME_MS;
            self.engine.frame(self.now);
        }
    }

    /// Pump frames until `done` holds, sleeping between frames for worker round trips.
    fn pump_until(&mut self, done: impl Fn(&ScrollyVideo) -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !done(&self.engine) {
            assert!(Instant::now() < deadline, "engine did not settle");
            self.now += FRAME_MS;
            self.engine.frame(self.now);
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    fn ready_count(&self) -> usize {
        self.ready.load(Ordering::SeqCst)
    }
}

fn stub_factory(behavior: StubBehavior) -> Arc<dyn DecoderFactory> {
    Arc::new(move || -> ScrollyResult<Box<dyn VideoDecoder>> {
        Ok(Box::new(StubDecoder::new(behavior.clone()).0))
    })
}

fn build(config: EngineConfig, element: SimulatedMediaElement, decode: Option<StubBehavior>) -> Harness {
    build_with(config, element, decode.map(stub_factory))
}

fn build_with(
    config: EngineConfig,
    element: SimulatedMediaElement,
    decoders: Option<Arc<dyn DecoderFactory>>,
) -> Harness {
    let surface = MemorySurface::new();
    let ready = Arc::new(AtomicUsize::new(0));
    let positions = Arc::new(Mutex::new(Vec::new()));
    let mut mount = Mount::new(Box::new(element.clone()))
        .with_surface(Box::new(surface.clone()))
        .with_sources(Arc::new(
            MemorySource::new().with("clip.mp4", build_avc_mp4(&FixtureSpec::default())),
        ))
        .on_ready({
            let ready = ready.clone();
            move || {
                ready.fetch_add(1, Ordering::SeqCst);
            }
        })
        .on_position_changed({
            let positions = positions.clone();
            move |p| positions.lock().push(p)
        });
    if let Some(decoders) = decoders {
        mount = mount.with_decoders(decoders);
    }
    Harness {
        engine: ScrollyVideo::new(config, mount).unwrap(),
        element,
        surface,
        ready,
        positions,
        now: 0.0,
    }
}

fn native_config() -> EngineConfig {
    EngineConfig {
        track_scroll: false,
        use_decode_pipeline: false,
        ..EngineConfig::new("clip.mp4")
    }
}

/// Ten-second native engine, metadata loaded, sitting at 0.
fn native_harness(element: SimulatedMediaElement) -> Harness {
    let mut h = build(native_config(), element, None);
    h.engine.media_metadata_ready(10.0);
    h.run(FRAME_MS * 2.0);
    h
}

fn linear(ms: f64) -> TransitionOpts {
    TransitionOpts::animated(ms).with_easing(Easing::custom(|x| x))
}

#[test]
fn invalid_config_aborts_construction() {
    let mount = Mount::new(Box::new(SimulatedMediaElement::new(Some(1.0))));
    let err = ScrollyVideo::new(EngineConfig::default(), mount).unwrap_err();
    assert!(matches!(err, ScrollyError::Configuration(_)));
}

#[test]
fn native_only_engine_is_ready_immediately() {
    let h = build(native_config(), SimulatedMediaElement::new(Some(10.0)), None);
    assert_eq!(h.ready_count(), 1);
    assert_eq!(h.engine.mode(), EngineMode::NativeVideo);
    assert!(!h.engine.is_decoding());
}

#[test]
fn eased_transition_converges_by_seeking() {
    let mut h = native_harness(SimulatedMediaElement::new(Some(10.0)).without_rate_control());
    h.engine.set_target_percentage(0.5, linear(1000.0));
    assert_eq!(h.engine.target_time(), 5.0);

    let mut last_gap = f64::INFINITY;
    for _ in 0..70 {
        h.run(FRAME_MS);
        let gap = (h.engine.target_time() - h.engine.current_time()).abs();
        assert!(gap <= last_gap + 1e-9);
        last_gap = gap;
    }
    assert!((h.engine.current_time() - 5.0).abs() < 0.05);
    assert!(!h.engine.is_transitioning());
    assert!((h.element.snapshot().current_time - h.engine.current_time()).abs() < 1e-9);
}

#[test]
fn eased_transition_converges_with_play_rate() {
    let mut h = native_harness(SimulatedMediaElement::new(Some(10.0)));
    h.engine.set_target_percentage(0.5, linear(1000.0));
    h.run(1_100.0);
    assert!((h.engine.current_time() - 5.0).abs() < 0.05);
    assert!(!h.engine.is_transitioning());
    assert!(h.element.snapshot().paused);
}

#[test]
fn moving_backward_jumps_on_next_tick() {
    let mut h = native_harness(SimulatedMediaElement::new(Some(10.0)).without_rate_control());
    h.engine.set_target_percentage(0.5, linear(1000.0));
    h.run(600.0);
    assert!(h.engine.current_time() > 2.0);

    h.engine.set_target_percentage(0.2, TransitionOpts::default());
    assert_eq!(h.engine.target_time(), 2.0);
    h.run(FRAME_MS);
    assert_eq!(h.engine.current_time(), 2.0);
    assert_eq!(h.element.snapshot().current_time, 2.0);
}

#[test]
fn repeating_a_target_schedules_once() {
    let mut h = native_harness(SimulatedMediaElement::new(Some(10.0)));
    h.engine.set_target_percentage(0.5, linear(1000.0));
    let first = h.engine.scheduler.last_state();
    h.engine.set_target_percentage(0.5, linear(1000.0));
    assert_eq!(h.engine.scheduler.last_state(), first);
}

#[test]
fn targets_are_clamped_to_the_timeline() {
    let mut h = native_harness(SimulatedMediaElement::new(Some(10.0)));
    h.engine.set_target_percentage(1.7, TransitionOpts::jump());
    assert_eq!(h.engine.target_time(), 10.0);
    h.run(FRAME_MS);
    assert_eq!(h.engine.current_time(), 10.0);
    h.engine.set_target_percentage(-3.0, TransitionOpts::jump());
    assert_eq!(h.engine.target_time(), 0.0);
}

#[test]
fn targets_before_metadata_are_replayed() {
    let element = SimulatedMediaElement::new(None);
    let mut h = build(native_config(), element, None);
    h.engine.set_target_percentage(0.5, TransitionOpts::jump());
    assert_eq!(h.engine.target_time(), 0.0);

    h.element.set_duration(8.0);
    h.engine.media_metadata_ready(8.0);
    assert_eq!(h.engine.target_time(), 4.0);
    h.run(FRAME_MS);
    assert_eq!(h.engine.current_time(), 4.0);
}

#[test]
fn metadata_applies_last_scroll_position_when_tracking() {
    let config = EngineConfig {
        use_decode_pipeline: false,
        ..EngineConfig::new("clip.mp4")
    };
    let mut h = build(config, SimulatedMediaElement::new(None), None);
    h.engine.on_external_position_change(0.3, false);
    assert_eq!(*h.positions.lock(), vec![0.3]);

    h.element.set_duration(10.0);
    h.engine.media_metadata_ready(10.0);
    h.run(FRAME_MS);
    assert!((h.engine.current_time() - 3.0).abs() < 1e-9);
}

#[test]
fn set_video_percentage_scrolls_the_host() {
    let host = RecordingScrollHost::new();
    let element = SimulatedMediaElement::new(Some(10.0));
    let config = EngineConfig {
        use_decode_pipeline: false,
        ..EngineConfig::new("clip.mp4")
    };
    let mount = Mount::new(Box::new(element.clone())).with_scroll(Box::new(host.clone()));
    let mut engine = ScrollyVideo::new(config, mount).unwrap();
    engine.media_metadata_ready(10.0);
    let at = |page_offset: f64| ScrollGeometry {
        container_top: -page_offset,
        page_offset,
        container_height: 3000.0,
        viewport_height: 1000.0,
    };
    engine.set_scroll_geometry(at(0.0));

    engine.set_video_percentage(0.5, TransitionOpts::jump());
    assert_eq!(host.requests(), vec![(1000.0, true)]);
    assert_eq!(engine.target_time(), 5.0);

    // Smooth-scroll progress must not drag the video back.
    engine.on_scroll(at(400.0));
    assert_eq!(engine.target_time(), 5.0);
    engine.on_scroll(at(1000.0));
    engine.on_scroll(at(1500.0));
    assert_eq!(engine.target_time(), 7.5);
}

#[test]
fn paint_frame_requires_debug() {
    let mut h = build(native_config(), SimulatedMediaElement::new(Some(1.0)), None);
    assert!(!h.engine.paint_frame(3));
}

fn in_thread_config() -> EngineConfig {
    EngineConfig {
        track_scroll: false,
        decode_mode: DecodeMode::InThread,
        debug: true,
        ..EngineConfig::new("clip.mp4")
    }
}

#[test]
fn in_thread_decode_switches_to_canvas() {
    let element = SimulatedMediaElement::new(Some(1.0));
    let mut h = build(in_thread_config(), element, Some(StubBehavior::default()));
    assert_eq!(h.ready_count(), 0);
    h.pump_until(|e| e.mode() == EngineMode::CanvasFrames);
    assert_eq!(h.ready_count(), 1);
    assert_eq!(h.engine.live_frames(), 30);
    assert_eq!(h.surface.log().presented, vec![0]);

    h.engine.media_metadata_ready(1.0);
    h.engine.set_target_percentage(0.5, linear(100.0));
    h.run(200.0);
    assert!((h.engine.current_time() - 0.5).abs() < 0.05);
    let presented = h.surface.log().presented;
    assert!(presented.len() > 2);
    assert!(presented.windows(2).all(|w| w[0] <= w[1]));
    assert!(h.element.snapshot().paused);

    assert!(h.engine.paint_frame(1_000));
    assert_eq!(h.surface.log().presented.last(), Some(&29));

    h.engine.viewport_resized(640.0, 480.0);
    assert!(h.surface.log().layout.is_some());

    h.engine.destroy();
    assert_eq!(h.engine.live_frames(), 0);
    assert_eq!(h.ready_count(), 1);
}

#[test]
fn in_thread_decoder_failure_falls_back_and_reloads() {
    let element = SimulatedMediaElement::new(Some(1.0));
    let behavior = StubBehavior {
        fail_at_chunk: Some(5),
        ..StubBehavior::default()
    };
    let mut h = build(in_thread_config(), element, Some(behavior));
    h.pump_until(|e| e.is_ready());
    assert_eq!(h.engine.mode(), EngineMode::NativeVideo);
    assert_eq!(h.ready_count(), 1);
    assert_eq!(h.element.snapshot().reloads, 1);
    assert_eq!(h.engine.live_frames(), 0);
    h.run(100.0);
    assert_eq!(h.ready_count(), 1);
}

#[test]
fn unsupported_source_falls_back_without_reload() {
    let element = SimulatedMediaElement::new(Some(1.0));
    let config = EngineConfig {
        src: "missing.mp4".to_owned(),
        ..in_thread_config()
    };
    let h = build(config, element, Some(StubBehavior::default()));
    assert!(h.engine.is_ready());
    assert_eq!(h.engine.mode(), EngineMode::NativeVideo);
    assert_eq!(h.element.snapshot().reloads, 0);
}

fn worker_config() -> EngineConfig {
    EngineConfig {
        track_scroll: false,
        decode_mode: DecodeMode::Worker,
        ease: Ease::InOutQuad,
        ..EngineConfig::new("clip.mp4")
    }
}

#[test]
fn worker_decode_switches_to_remote_canvas() {
    let element = SimulatedMediaElement::new(Some(1.0));
    let mut h = build(worker_config(), element, Some(StubBehavior::default()));
    h.engine.media_metadata_ready(1.0);
    h.pump_until(|e| e.mode() == EngineMode::CanvasFrames);
    assert_eq!(h.ready_count(), 1);
    assert!(h.engine.switch.is_remote());
    assert_eq!(h.engine.live_frames(), 30);

    h.engine.set_target_percentage(0.5, TransitionOpts::jump());
    let surface = h.surface.clone();
    h.pump_until(move |_| surface.log().presented.contains(&15));
    h.pump_until(|e| (e.current_time() - 0.5).abs() < 1e-9);

    h.engine.destroy();
    assert_eq!(h.engine.live_frames(), 0);
}

#[test]
fn worker_decode_failure_still_fires_ready_once() {
    let element = SimulatedMediaElement::new(Some(1.0));
    let behavior = StubBehavior {
        emit_nothing: true,
        ..StubBehavior::default()
    };
    let mut h = build(worker_config(), element, Some(behavior));
    h.pump_until(|e| e.is_ready());
    assert_eq!(h.engine.mode(), EngineMode::NativeVideo);
    assert!(!h.engine.is_decoding());
    h.run(100.0);
    assert_eq!(h.ready_count(), 1);
}

#[test]
fn crashed_worker_falls_back_and_fires_ready_once() {
    let crashing: Arc<dyn DecoderFactory> =
        Arc::new(|| -> ScrollyResult<Box<dyn VideoDecoder>> { panic!("decoder backend crashed") });
    let element = SimulatedMediaElement::new(Some(1.0));
    let mut h = build_with(worker_config(), element, Some(crashing));
    h.engine.media_metadata_ready(1.0);
    h.pump_until(|e| e.is_ready());
    assert_eq!(h.engine.mode(), EngineMode::NativeVideo);
    assert!(!h.engine.is_decoding());
    assert_eq!(h.element.snapshot().reloads, 1);
    h.run(300.0);
    assert_eq!(h.ready_count(), 1);
    assert!(!h.engine.is_decoding());
}

#[test]
fn destroy_detaches_everything() {
    let mut h = native_harness(SimulatedMediaElement::new(Some(10.0)));
    h.engine.set_target_percentage(0.5, linear(1000.0));
    h.run(FRAME_MS * 3.0);
    h.engine.destroy();
    assert!(h.engine.is_destroyed());
    assert!(!h.engine.is_transitioning());

    let before = h.engine.current_time();
    h.engine.on_external_position_change(0.9, true);
    h.run(100.0);
    assert!(h.positions.lock().is_empty());
    assert_eq!(h.engine.current_time(), before);
    h.engine.destroy();
}
