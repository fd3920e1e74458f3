/// Clamp a position percentage into `[0, 1]`. Infinities saturate; NaN stays NaN.
pub fn clamp_unit(p: f64) -> f64 {
    p.clamp(0.0, 1.0)
}

/// Clamp a time into `[0, duration]`.
///
/// An unknown or non-finite duration only enforces the lower bound.
pub fn clamp_time(t: f64, duration: Option<f64>) -> f64 {
    let t = t.max(0.0);
    match duration {
        Some(d) if d.is_finite() && d >= 0.0 => t.min(d),
        _ => t,
    }
}

/// `Some(d)` when `d` is a usable media duration.
pub fn usable_duration(d: Option<f64>) -> Option<f64> {
    d.filter(|d| d.is_finite() && *d > 0.0)
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
