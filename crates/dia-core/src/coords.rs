//! Coordinate model: normalized annotation space ↔ viewport pixels.
//!
//! All functions here are pure. They take the measured image bounds (the
//! image's untransformed layout box), the current zoom/pan transform, and
//! optionally the debug calibration multipliers:
//!
//! ```text
//! screen.x = bounds.left + (x * cal.x) * bounds.width  * zoom + translate.x
//! screen.y = bounds.top  + (y * cal.y) * bounds.height * zoom + translate.y
//! ```
//!
//! Invalid bounds (zero, negative, or non-finite size) yield `None` so the
//! caller skips positioning instead of writing garbage styles.

use kurbo::{Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Measured on-screen rectangle of the background image.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.left.is_finite()
            && self.top.is_finite()
            && self.width.is_finite()
            && self.height.is_finite()
            && self.width > 0.0
            && self.height > 0.0
    }

    pub fn origin(&self) -> Point {
        Point::new(self.left, self.top)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn to_rect(&self) -> Rect {
        Rect::from_origin_size(self.origin(), self.size())
    }

    pub fn from_rect(rect: Rect) -> Self {
        Self::new(rect.x0, rect.y0, rect.width(), rect.height())
    }

    pub fn translated(&self, delta: Vec2) -> Self {
        Self::new(self.left + delta.x, self.top + delta.y, self.width, self.height)
    }
}

/// Current zoom/pan state applied on top of the layout box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub zoom: f64,
    pub translate: Vec2,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        zoom: 1.0,
        translate: Vec2::ZERO,
    };

    pub fn new(zoom: f64, translate: Vec2) -> Self {
        Self { zoom, translate }
    }
}

/// Per-axis multipliers applied to normalized coordinates (debug tuning).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    pub x: f64,
    pub y: f64,
}

impl Default for Calibration {
    fn default() -> Self {
        Self::NONE
    }
}

impl Calibration {
    pub const NONE: Calibration = Calibration { x: 1.0, y: 1.0 };

    /// Parse a multiplier from user input; anything unparsable or non-positive
    /// falls back to 1.
    pub fn parse_axis(input: &str) -> f64 {
        match input.trim().parse::<f64>() {
            Ok(v) if v.is_finite() && v > 0.0 => v,
            _ => 1.0,
        }
    }

    pub fn apply(&self, p: Point) -> Point {
        Point::new(p.x * self.x, p.y * self.y)
    }
}

/// Map a normalized position to viewport pixels.
pub fn to_screen(
    pos: Point,
    bounds: &Bounds,
    transform: &Transform,
    calibration: &Calibration,
) -> Option<Point> {
    if !bounds.is_valid() {
        return None;
    }
    let p = calibration.apply(pos);
    Some(Point::new(
        bounds.left + p.x * bounds.width * transform.zoom + transform.translate.x,
        bounds.top + p.y * bounds.height * transform.zoom + transform.translate.y,
    ))
}

/// Convert a relative size along one axis to pixels.
pub fn to_screen_size(rel: f64, extent: f64, zoom: f64) -> f64 {
    rel * extent * zoom
}

/// Convert a pixel length back to relative units along one axis.
pub fn to_relative_size(pixels: f64, displayed_extent: f64) -> Option<f64> {
    if displayed_extent > 0.0 && displayed_extent.is_finite() {
        Some(pixels / displayed_extent)
    } else {
        None
    }
}

/// The image as it appears on screen after zoom and pan.
///
/// Every gesture clamps against this rectangle.
pub fn display_rect(bounds: &Bounds, transform: &Transform) -> Option<Rect> {
    if !bounds.is_valid() {
        return None;
    }
    let origin = bounds.origin() + transform.translate;
    let size = Size::new(
        bounds.width * transform.zoom,
        bounds.height * transform.zoom,
    );
    Some(Rect::from_origin_size(origin, size))
}

/// Inverse of [`to_screen`] without calibration: viewport pixels → normalized.
///
/// The result is *not* clamped; callers decide whether to clamp or reject.
pub fn to_normalized(screen: Point, bounds: &Bounds, transform: &Transform) -> Option<Point> {
    let rect = display_rect(bounds, transform)?;
    from_display(screen, rect)
}

/// Normalize a point against an already computed display rectangle.
pub fn from_display(screen: Point, display: Rect) -> Option<Point> {
    if !(display.width() > 0.0 && display.height() > 0.0) {
        return None;
    }
    Some(Point::new(
        (screen.x - display.x0) / display.width(),
        (screen.y - display.y0) / display.height(),
    ))
}
