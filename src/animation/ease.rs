use std::fmt;
use std::sync::Arc;

/// Named easing curves usable from configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ease {
    /// Identity.
    #[default]
    Linear,
    /// Quadratic ease-in.
    InQuad,
    /// Quadratic ease-out.
    OutQuad,
    /// Quadratic ease-in-out.
    InOutQuad,
    /// Cubic ease-in.
    InCubic,
    /// Cubic ease-out.
    OutCubic,
    /// Cubic ease-in-out.
    InOutCubic,
}

impl Ease {
    /// Remap progress `t` (clamped to `[0, 1]`).
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::InQuad => t * t,
            Self::OutQuad => 1.0 - (1.0 - t).powi(2),
            Self::InOutQuad if t < 0.5 => 2.0 * t * t,
            Self::InOutQuad => 1.0 - (-2.0 * t + 2.0).powi(2) / 2.0,
            Self::InCubic => t.powi(3),
            Self::OutCubic => 1.0 - (1.0 - t).powi(3),
            Self::InOutCubic if t < 0.5 => 4.0 * t.powi(3),
            Self::InOutCubic => 1.0 - (-2.0 * t + 2.0).powi(3) / 2.0,
        }
    }
}

/// Caller-supplied progress remapping.
pub type EaseFn = Arc<dyn Fn(f64) -> f64 + Send + Sync>;

/// Easing used by eased transitions: a named preset or an arbitrary closure.
///
/// Closures are not serializable; they only enter the engine through
/// [`crate::ScrollyVideo::set_easing`] or a [`crate::TransitionOpts`].
#[derive(Clone)]
pub enum Easing {
    /// A named curve.
    Preset(Ease),
    /// A caller closure. Output is not clamped.
    Custom(EaseFn),
}

impl Easing {
    /// Wrap a closure.
    pub fn custom(f: impl Fn(f64) -> f64 + Send + Sync + 'static) -> Self {
        Self::Custom(Arc::new(f))
    }

    /// Remap progress `t`. Input is clamped to `[0, 1]` for both variants.
    pub fn apply(&self, t: f64) -> f64 {
        match self {
            Self::Preset(ease) => ease.apply(t),
            Self::Custom(f) => f(t.clamp(0.0, 1.0)),
        }
    }
}

impl Default for Easing {
    fn default() -> Self {
        Self::Preset(Ease::Linear)
    }
}

impl From<Ease> for Easing {
    fn from(ease: Ease) -> Self {
        Self::Preset(ease)
    }
}

impl fmt::Debug for Easing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Preset(ease) => f.debug_tuple("Preset").field(ease).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/animation/ease.rs"]
mod tests;
