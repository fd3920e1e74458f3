use super::*;

fn ctx(duration: Option<f64>) -> TargetContext {
    TargetContext {
        duration,
        transition_active: false,
        mode: EngineMode::NativeVideo,
    }
}

fn defaults() -> TransitionDefaults {
    TransitionDefaults {
        transition_speed_ms: 16.0,
        easing: Easing::default(),
    }
}

fn schedule(d: TargetDecision) -> (TransitionRequest, bool, bool) {
    match d {
        TargetDecision::Schedule {
            request,
            resume_forward,
            skipped_ahead,
        } => (request, resume_forward, skipped_ahead),
        other => panic!("expected schedule, got {other:?}"),
    }
}

#[test]
fn percentage_maps_and_clamps() {
    let mut c = PositionController::new();
    let mut clock = PlaybackClock::new(0.05);
    for (p, expect) in [(0.5, 5.0), (-3.0, 0.0), (7.0, 10.0), (f64::INFINITY, 10.0)] {
        clock.current_time = 0.0;
        let _ = c.set_target_percentage(p, TransitionOpts::jump(), &defaults(), &mut clock, ctx(Some(10.0)));
        assert_eq!(clock.target_time, expect, "p={p}");
    }
}

#[test]
fn sub_threshold_move_is_noop_unless_jumping() {
    let mut c = PositionController::new();
    let mut clock = PlaybackClock::new(0.05);
    clock.current_time = 5.0;
    let d = c.set_target_percentage(0.502, TransitionOpts::default(), &defaults(), &mut clock, ctx(Some(10.0)));
    assert!(matches!(d, TargetDecision::Ignored));
    let d = c.set_target_percentage(0.502, TransitionOpts::jump(), &defaults(), &mut clock, ctx(Some(10.0)));
    assert!(matches!(d, TargetDecision::Schedule { .. }));
}

#[test]
fn repeated_percentage_schedules_once() {
    let mut c = PositionController::new();
    let mut clock = PlaybackClock::new(0.05);
    let first = c.set_target_percentage(0.5, TransitionOpts::animated(1000.0), &defaults(), &mut clock, ctx(Some(10.0)));
    assert!(matches!(first, TargetDecision::Schedule { .. }));
    let mut active = ctx(Some(10.0));
    active.transition_active = true;
    let second = c.set_target_percentage(0.5, TransitionOpts::animated(1000.0), &defaults(), &mut clock, active);
    assert!(matches!(second, TargetDecision::Ignored));
}

#[test]
fn backward_motion_forces_jump() {
    let mut c = PositionController::new();
    let mut clock = PlaybackClock::new(0.05);
    clock.current_time = 3.0;
    clock.target_time = 5.0;
    let (req, resume, _) = schedule(c.set_target_percentage(
        0.2,
        TransitionOpts::default(),
        &defaults(),
        &mut clock,
        ctx(Some(10.0)),
    ));
    assert!(req.jump);
    assert!(!resume);
    assert_eq!(clock.target_time, 2.0);
}

#[test]
fn skip_ahead_snaps_to_superseded_target() {
    let mut c = PositionController::new();
    let mut clock = PlaybackClock::new(0.05);
    clock.current_time = 1.0;
    clock.target_time = 3.0;
    let (req, resume, skipped) = schedule(c.set_target_percentage(
        0.6,
        TransitionOpts::default(),
        &defaults(),
        &mut clock,
        ctx(Some(10.0)),
    ));
    assert!(skipped);
    assert_eq!(clock.current_time, 3.0);
    assert!(!req.jump);
    assert!(resume);
}

#[test]
fn no_skip_when_previous_target_reached() {
    let mut c = PositionController::new();
    let mut clock = PlaybackClock::new(0.05);
    clock.current_time = 2.98;
    clock.target_time = 3.0;
    let (_, _, skipped) = schedule(c.set_target_percentage(
        0.6,
        TransitionOpts::default(),
        &defaults(),
        &mut clock,
        ctx(Some(10.0)),
    ));
    assert!(!skipped);
    assert_eq!(clock.current_time, 2.98);
}

#[test]
fn canvas_mode_never_resumes_native_playback() {
    let mut c = PositionController::new();
    let mut clock = PlaybackClock::new(0.05);
    let mut cx = ctx(Some(10.0));
    cx.mode = EngineMode::CanvasFrames;
    let (_, resume, _) = schedule(c.set_target_percentage(0.5, TransitionOpts::default(), &defaults(), &mut clock, cx));
    assert!(!resume);
}

#[test]
fn unknown_duration_defers() {
    let mut c = PositionController::new();
    let mut clock = PlaybackClock::new(0.05);
    let d = c.set_target_percentage(0.4, TransitionOpts::default(), &defaults(), &mut clock, ctx(None));
    assert!(matches!(d, TargetDecision::Deferred));
    assert_eq!(clock.target_time, 0.0);
    assert!(c.has_pending());
    let (p, _) = c.take_pending().unwrap();
    assert_eq!(p, 0.4);
    assert!(!c.has_pending());
}

#[test]
fn nan_percentage_is_ignored() {
    let mut c = PositionController::new();
    let mut clock = PlaybackClock::new(0.05);
    let d = c.set_target_percentage(f64::NAN, TransitionOpts::jump(), &defaults(), &mut clock, ctx(Some(10.0)));
    assert!(matches!(d, TargetDecision::Ignored));
    assert_eq!(clock.target_time, 0.0);
}
