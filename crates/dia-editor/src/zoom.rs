//! Zoom/pan controller.
//!
//! All points given to the controller are *image-local*: viewport pixels
//! minus the image's untransformed layout origin. The transform maps a local
//! point `p` to `p * zoom + translate`, so anchoring a zoom on `p` keeps the
//! image pixel under `p` fixed:
//!
//! ```text
//! target     = (p - translate) / old_zoom
//! translate' = p - target * new_zoom
//! ```

use dia_core::{Transform, ZoomConfig};
use kurbo::{Point, Vec2};

/// Zoom within this distance of 1 counts as unzoomed (wheel steps drift).
const IDENTITY_SLACK: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq)]
struct PinchStart {
    zoom: f64,
    distance: f64,
    translate: Vec2,
    midpoint: Point,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct PanStart {
    pointer: Point,
    translate: Vec2,
}

#[derive(Debug, Clone)]
pub struct ZoomPan {
    config: ZoomConfig,
    zoom: f64,
    translate: Vec2,
    pinch: Option<PinchStart>,
    pan: Option<PanStart>,
}

impl Default for ZoomPan {
    fn default() -> Self {
        Self::new(ZoomConfig::default())
    }
}

impl ZoomPan {
    pub fn new(config: ZoomConfig) -> Self {
        Self {
            config,
            zoom: 1.0,
            translate: Vec2::ZERO,
            pinch: None,
            pan: None,
        }
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn translate(&self) -> Vec2 {
        self.translate
    }

    pub fn transform(&self) -> Transform {
        Transform::new(self.zoom, self.translate)
    }

    pub fn is_zoomed(&self) -> bool {
        self.zoom > 1.0
    }

    /// Back to zoom 1 and no translation.
    pub fn reset(&mut self) {
        self.zoom = 1.0;
        self.translate = Vec2::ZERO;
        self.pinch = None;
        self.pan = None;
    }

    fn zoom_about(&mut self, anchor: Point, from_zoom: f64, from_translate: Vec2, to_zoom: f64) {
        let to_zoom = to_zoom.clamp(self.config.min, self.config.max);
        if to_zoom <= 1.0 + IDENTITY_SLACK {
            self.zoom = 1.0;
            self.translate = Vec2::ZERO;
            return;
        }
        let target = (anchor.to_vec2() - from_translate) / from_zoom;
        self.translate = anchor.to_vec2() - target * to_zoom;
        self.zoom = to_zoom;
    }

    /// One wheel notch anchored at `local`. Returns whether anything changed.
    pub fn wheel(&mut self, local: Point, delta_y: f64) -> bool {
        if delta_y == 0.0 || !delta_y.is_finite() {
            return false;
        }
        let step = if delta_y < 0.0 {
            self.config.wheel_step
        } else {
            -self.config.wheel_step
        };
        let before = self.transform();
        self.zoom_about(local, self.zoom, self.translate, self.zoom + step);
        log::trace!("wheel zoom {:.2} -> {:.2}", before.zoom, self.zoom);
        self.transform() != before
    }

    // ─── Pinch ───────────────────────────────────────────────────────────

    pub fn begin_pinch(&mut self, a: Point, b: Point) {
        let distance = a.distance(b);
        if distance <= 0.0 {
            return;
        }
        self.pan = None;
        self.pinch = Some(PinchStart {
            zoom: self.zoom,
            distance,
            translate: self.translate,
            midpoint: a.midpoint(b),
        });
    }

    /// Zoom to gesture-start zoom × finger-distance ratio, the ratio clamped to
    /// the configured pinch range, anchored on the current midpoint.
    pub fn update_pinch(&mut self, a: Point, b: Point) -> bool {
        let Some(start) = self.pinch else {
            return false;
        };
        let ratio = (a.distance(b) / start.distance)
            .clamp(self.config.pinch_min_ratio, self.config.pinch_max_ratio);
        let before = self.transform();

        // Anchor the image point that was under the starting midpoint
        let target = (start.midpoint.to_vec2() - start.translate) / start.zoom;
        let to_zoom = (start.zoom * ratio).clamp(self.config.min, self.config.max);
        if to_zoom <= 1.0 + IDENTITY_SLACK {
            self.zoom = 1.0;
            self.translate = Vec2::ZERO;
        } else {
            self.translate = a.midpoint(b).to_vec2() - target * to_zoom;
            self.zoom = to_zoom;
        }
        self.transform() != before
    }

    pub fn end_pinch(&mut self) {
        self.pinch = None;
    }

    pub fn is_pinching(&self) -> bool {
        self.pinch.is_some()
    }

    // ─── Pan ─────────────────────────────────────────────────────────────

    /// Start panning if zoomed in. Returns whether a pan started.
    pub fn begin_pan(&mut self, local: Point) -> bool {
        if !self.is_zoomed() || self.pinch.is_some() {
            return false;
        }
        self.pan = Some(PanStart {
            pointer: local,
            translate: self.translate,
        });
        true
    }

    /// Translate by the pointer delta since the pan started. Unclamped.
    pub fn update_pan(&mut self, local: Point) -> bool {
        let Some(start) = self.pan else {
            return false;
        };
        let next = start.translate + (local - start.pointer);
        let changed = next != self.translate;
        self.translate = next;
        changed
    }

    pub fn end_pan(&mut self) -> bool {
        self.pan.take().is_some()
    }

    pub fn is_panning(&self) -> bool {
        self.pan.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn wheel_zooms_about_pointer() {
        let mut z = ZoomPan::default();
        assert!(z.wheel(Point::new(100.0, 50.0), -1.0));
        assert!(approx(z.zoom(), 1.1));
        // The image pixel under the pointer stays put
        let target = Point::new(100.0, 50.0);
        let screen = target.to_vec2() * z.zoom() + z.translate();
        assert!(approx(screen.x, 100.0) && approx(screen.y, 50.0));
    }

    #[test]
    fn wheel_out_snaps_to_identity() {
        let mut z = ZoomPan::default();
        z.wheel(Point::new(300.0, 300.0), -1.0);
        z.wheel(Point::new(10.0, 10.0), 1.0);
        assert_eq!(z.transform(), Transform::IDENTITY);
        assert!(!z.wheel(Point::new(10.0, 10.0), 1.0));
    }

    #[test]
    fn wheel_clamps_at_max() {
        let mut z = ZoomPan::default();
        for _ in 0..100 {
            z.wheel(Point::new(0.0, 0.0), -1.0);
        }
        assert_eq!(z.zoom(), 4.0);
        assert!(!z.wheel(Point::new(0.0, 0.0), -1.0));
    }

    #[test]
    fn pinch_ratio_clamps_against_gesture_start_zoom() {
        let mut z = ZoomPan::default();
        z.zoom_about(Point::ZERO, 1.0, Vec2::ZERO, 1.5);
        z.begin_pinch(Point::new(0.0, 0.0), Point::new(100.0, 0.0));

        // Fingers spread 3x: ratio capped at 2, relative to the start zoom
        z.update_pinch(Point::new(0.0, 0.0), Point::new(300.0, 0.0));
        assert!(approx(z.zoom(), 3.0));

        // Back to the start distance: the start zoom, not a compounded value
        z.update_pinch(Point::new(0.0, 0.0), Point::new(100.0, 0.0));
        assert!(approx(z.zoom(), 1.5));

        // Pinch in 4x: ratio floored at 0.5, below 1 snaps to identity
        z.update_pinch(Point::new(0.0, 0.0), Point::new(25.0, 0.0));
        assert_eq!(z.transform(), Transform::IDENTITY);
        z.end_pinch();
        assert!(!z.is_pinching());
    }

    #[test]
    fn pinch_anchors_on_midpoint() {
        let mut z = ZoomPan::default();
        let (a, b) = (Point::new(100.0, 100.0), Point::new(200.0, 100.0));
        z.begin_pinch(a, b);
        z.update_pinch(Point::new(50.0, 100.0), Point::new(250.0, 100.0));
        assert!(approx(z.zoom(), 2.0));
        // Midpoint (150, 100) stays over the same image pixel
        let screen = Point::new(150.0, 100.0).to_vec2() * 2.0 + z.translate();
        assert!(approx(screen.x, 150.0) && approx(screen.y, 100.0));
    }

    #[test]
    fn pan_only_when_zoomed() {
        let mut z = ZoomPan::default();
        assert!(!z.begin_pan(Point::new(10.0, 10.0)));

        z.wheel(Point::ZERO, -1.0);
        assert!(z.begin_pan(Point::new(10.0, 10.0)));
        assert!(z.update_pan(Point::new(-990.0, 10.0)));
        assert_eq!(z.translate(), Vec2::new(-1000.0, 0.0));
        assert!(z.end_pan());
        assert!(!z.is_panning());
    }

    #[test]
    fn reset_returns_to_identity() {
        let mut z = ZoomPan::default();
        z.wheel(Point::new(40.0, 40.0), -1.0);
        z.reset();
        assert_eq!(z.transform(), Transform::IDENTITY);
    }
}
