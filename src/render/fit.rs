use kurbo::{Rect, Size};

/// How frames are scaled into their container.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectFit {
    /// Scale to fit entirely inside, letterboxing the rest.
    #[default]
    Contain,
    /// Scale to fill, cropping the overflow.
    Cover,
}

/// Placement handed to a surface on creation and on every resize.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Layout {
    /// Container size.
    pub container: Size,
    /// Destination rectangle inside the container; may extend past it for `cover`.
    pub dest: Rect,
    /// Fit mode `dest` was computed with.
    pub fit: ObjectFit,
}

impl Layout {
    /// Compute the layout of `content` inside `container`.
    pub fn new(content: Size, container: Size, fit: ObjectFit) -> Self {
        Self {
            container,
            dest: fit_rect(content, container, fit),
            fit,
        }
    }
}

/// Centered destination rectangle for `content` placed in `container`.
///
/// Degenerate sizes yield the container rectangle.
pub fn fit_rect(content: Size, container: Size, fit: ObjectFit) -> Rect {
    let full = Rect::from_origin_size((0.0, 0.0), container);
    if !(content.width > 0.0 && content.height > 0.0) {
        return full;
    }
    let sx = container.width / content.width;
    let sy = container.height / content.height;
    let scale = match fit {
        ObjectFit::Contain => sx.min(sy),
        ObjectFit::Cover => sx.max(sy),
    };
    if !scale.is_finite() || scale <= 0.0 {
        return full;
    }
    let size = Size::new(content.width * scale, content.height * scale);
    let origin = (
        (container.width - size.width) / 2.0,
        (container.height - size.height) / 2.0,
    );
    Rect::from_origin_size(origin, size)
}

#[cfg(test)]
#[path = "../../tests/unit/render/fit.rs"]
mod tests;
