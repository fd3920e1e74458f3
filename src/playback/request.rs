use crate::animation::ease::{Ease, Easing};

/// A fully resolved transition, created per call and consumed by the scheduler.
#[derive(Clone, Debug, Default)]
pub struct TransitionRequest {
    /// Move straight to the target with no interpolation.
    pub jump: bool,
    /// Transition length in milliseconds. `0.0` means "follow native media timing".
    pub transition_speed_ms: f64,
    /// Progress remapping for eased transitions.
    pub easing: Easing,
}

impl TransitionRequest {
    /// Strategy this request selects.
    pub fn strategy(&self) -> Strategy {
        if self.jump || !(self.transition_speed_ms >= 0.0 && self.transition_speed_ms.is_finite()) {
            Strategy::Jump
        } else if self.transition_speed_ms == 0.0 {
            Strategy::NativeSpeed
        } else {
            Strategy::Eased
        }
    }

    /// Serializable form. Closures do not cross the wire; a custom easing becomes `None`.
    pub fn to_wire(&self) -> TransitionOptions {
        TransitionOptions {
            jump: self.jump,
            transition_speed_ms: self.transition_speed_ms,
            ease: match &self.easing {
                Easing::Preset(e) => Some(*e),
                Easing::Custom(_) => None,
            },
        }
    }
}

/// How the scheduler advances `current_time`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    /// Instant. Also chosen for negative or non-finite speeds.
    Jump,
    /// Wall-clock paced, at native speed.
    NativeSpeed,
    /// Fixed duration, eased.
    Eased,
}

/// Caller options for a position change; unset fields fall back to the engine defaults.
#[derive(Clone, Debug, Default)]
pub struct TransitionOpts {
    /// Jump instead of animating.
    pub jump: bool,
    /// Override the configured transition speed.
    pub transition_speed_ms: Option<f64>,
    /// Override the configured easing.
    pub easing: Option<Easing>,
}

impl TransitionOpts {
    /// Options requesting a jump.
    pub fn jump() -> Self {
        Self {
            jump: true,
            ..Self::default()
        }
    }

    /// Options for an animated move of `speed_ms`.
    pub fn animated(speed_ms: f64) -> Self {
        Self {
            transition_speed_ms: Some(speed_ms),
            ..Self::default()
        }
    }

    /// Attach an easing.
    pub fn with_easing(mut self, easing: impl Into<Easing>) -> Self {
        self.easing = Some(easing.into());
        self
    }

    /// Fill unset fields from `speed_ms` and `easing`.
    pub fn resolve(self, speed_ms: f64, easing: &Easing) -> TransitionRequest {
        TransitionRequest {
            jump: self.jump,
            transition_speed_ms: self.transition_speed_ms.unwrap_or(speed_ms),
            easing: self.easing.unwrap_or_else(|| easing.clone()),
        }
    }
}

/// Wire form of a [`TransitionRequest`], carried by `REQUEST_TRANSITION`.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionOptions {
    /// See [`TransitionRequest::jump`].
    pub jump: bool,
    /// See [`TransitionRequest::transition_speed_ms`].
    #[serde(rename = "transitionSpeed")]
    pub transition_speed_ms: f64,
    /// Preset easing, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ease: Option<Ease>,
}

impl TransitionOptions {
    /// Rebuild a request. `attached` wins over the wire preset; linear is the last resort.
    pub fn into_request(self, attached: Option<Easing>) -> TransitionRequest {
        let easing = attached
            .or(self.ease.map(Easing::Preset))
            .unwrap_or_default();
        TransitionRequest {
            jump: self.jump,
            transition_speed_ms: self.transition_speed_ms,
            easing,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/playback/request.rs"]
mod tests;
