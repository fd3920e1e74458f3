use super::*;

#[test]
fn clamp_unit_saturates() {
    assert_eq!(clamp_unit(-0.5), 0.0);
    assert_eq!(clamp_unit(1.5), 1.0);
    assert_eq!(clamp_unit(f64::INFINITY), 1.0);
    assert_eq!(clamp_unit(f64::NEG_INFINITY), 0.0);
    assert!(clamp_unit(f64::NAN).is_nan());
}

#[test]
fn clamp_time_respects_known_duration_only() {
    assert_eq!(clamp_time(-1.0, Some(10.0)), 0.0);
    assert_eq!(clamp_time(12.0, Some(10.0)), 10.0);
    assert_eq!(clamp_time(12.0, None), 12.0);
    assert_eq!(clamp_time(12.0, Some(f64::NAN)), 12.0);
}

#[test]
fn usable_duration_rejects_degenerate_values() {
    assert_eq!(usable_duration(Some(3.0)), Some(3.0));
    assert_eq!(usable_duration(Some(0.0)), None);
    assert_eq!(usable_duration(Some(f64::NAN)), None);
    assert_eq!(usable_duration(None), None);
}
