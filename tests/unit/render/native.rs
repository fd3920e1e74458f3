use super::*;

#[test]
fn backend_drives_element() {
    let el = SimulatedMediaElement::new(Some(10.0));
    let mut b = NativeBackend::new(Box::new(el.clone()));
    b.play(2.0).unwrap();
    assert!(b.is_playing());
    el.advance(500.0);
    assert!((b.current_position() - 1.0).abs() < 1e-9);

    b.seek_to(4.0).unwrap();
    let s = el.snapshot();
    assert!(s.paused);
    assert_eq!(s.current_time, 4.0);
    assert_eq!(s.seeks, 1);
    assert_eq!(b.kind(), EngineMode::NativeVideo);
}

#[test]
fn playback_stops_at_end() {
    let mut el = SimulatedMediaElement::new(Some(1.0));
    el.play();
    el.advance(5_000.0);
    let s = el.snapshot();
    assert_eq!(s.current_time, 1.0);
    assert!(s.paused);
}

#[test]
fn reload_rewinds() {
    let mut el = SimulatedMediaElement::new(Some(3.0));
    el.set_current_time(2.0);
    el.reload();
    let s = el.snapshot();
    assert_eq!(s.current_time, 0.0);
    assert_eq!(s.reloads, 1);
}

#[test]
fn rate_support_is_reported() {
    let el = SimulatedMediaElement::new(None).without_rate_control();
    let b = NativeBackend::new(Box::new(el));
    assert!(!b.supports_play_rate());
    assert_eq!(b.duration(), None);
}
