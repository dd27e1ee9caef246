//! Camera math for the canvas viewport.
//!
//! The canvas is drawn inside a viewport with its transform origin at the
//! viewport center. These helpers compute transforms; animating between them
//! is left to the page.

use crate::models::{Position, Size, ViewportTransform};
use serde::{Deserialize, Serialize};

/// Zoom level used when focusing a card.
pub const FOCUS_SCALE: f64 = 1.8;
pub const MIN_SCALE: f64 = 0.5;
pub const MAX_SCALE: f64 = 3.0;
/// Scale change per wheel delta unit.
pub const WHEEL_SENSITIVITY: f64 = 0.001;
/// Canvas inset inside the viewport when the page reports none.
pub const DEFAULT_PADDING: f64 = 12.0;

/// Visible window dimensions plus the inset of the canvas origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    #[serde(default = "default_padding")]
    pub padding_left: f64,
    #[serde(default = "default_padding")]
    pub padding_top: f64,
}

fn default_padding() -> f64 {
    DEFAULT_PADDING
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            padding_left: DEFAULT_PADDING,
            padding_top: DEFAULT_PADDING,
        }
    }

    pub fn center(&self) -> (f64, f64) {
        (self.width / 2.0, self.height / 2.0)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1280.0, 800.0)
    }
}

/// Transform that puts the center of a card at the viewport center at `scale`.
///
/// `offset = viewport_center - (position + padding + size / 2) * scale`
pub fn focus_transform(
    position: Position,
    size: Size,
    viewport: &Viewport,
    scale: f64,
) -> ViewportTransform {
    let (center_x, center_y) = viewport.center();
    let item_x = position.x + viewport.padding_left + size.width / 2.0;
    let item_y = position.y + viewport.padding_top + size.height / 2.0;

    ViewportTransform {
        scale,
        offset_x: center_x - item_x * scale,
        offset_y: center_y - item_y * scale,
    }
}

/// Like [`focus_transform`], but a card without a resolved position or size
/// yields `None` instead of a transform.
pub fn focus_item(
    position: Option<Position>,
    size: Option<Size>,
    viewport: &Viewport,
) -> Option<ViewportTransform> {
    Some(focus_transform(position?, size?, viewport, FOCUS_SCALE))
}

pub fn clamp_scale(scale: f64) -> f64 {
    scale.clamp(MIN_SCALE, MAX_SCALE)
}

/// Mouse wheel zoom. Scrolling up (negative delta) zooms in.
pub fn wheel_zoom(transform: ViewportTransform, delta_y: f64) -> ViewportTransform {
    ViewportTransform {
        scale: clamp_scale(transform.scale - delta_y * WHEEL_SENSITIVITY),
        ..transform
    }
}

/// Two-finger zoom relative to the scale and finger distance at gesture start.
pub fn pinch_zoom(
    transform: ViewportTransform,
    initial_scale: f64,
    initial_distance: f64,
    distance: f64,
) -> ViewportTransform {
    if initial_distance <= 0.0 {
        return transform;
    }
    ViewportTransform {
        scale: clamp_scale(initial_scale * distance / initial_distance),
        ..transform
    }
}

/// Drag pan by a pointer delta in screen pixels.
pub fn pan_by(transform: ViewportTransform, dx: f64, dy: f64) -> ViewportTransform {
    ViewportTransform {
        offset_x: transform.offset_x + dx,
        offset_y: transform.offset_y + dy,
        ..transform
    }
}
