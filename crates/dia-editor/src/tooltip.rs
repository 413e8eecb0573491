//! Tooltip positioner.
//!
//! Tooltips are centered horizontally on their anchor and clamped so they
//! touch the viewport edge exactly rather than overflow. Vertically they sit
//! above the anchor when it is in the lower half of the viewport and there is
//! room, otherwise below, and are finally clamped inside the viewport.

use kurbo::{Point, Rect, Size};

/// Top-left corner for a tooltip of `size` anchored at `anchor`.
pub fn place(size: Size, anchor: Point, viewport: Rect, gap: f64) -> Point {
    let left = (anchor.x - size.width / 2.0)
        .min(viewport.x1 - size.width)
        .max(viewport.x0);

    let above = anchor.y - gap - size.height;
    let lower_half = anchor.y > viewport.center().y;
    let mut top = if lower_half && above >= viewport.y0 {
        above
    } else {
        anchor.y + gap
    };

    if top + size.height > viewport.y1 {
        top = viewport.y1 - size.height;
    }
    if top < viewport.y0 {
        top = viewport.y0;
    }
    Point::new(left, top)
}

/// Tooltip width honoring the configured minimum.
pub fn width(measured: f64, min_width: f64) -> f64 {
    measured.max(min_width)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn viewport() -> Rect {
        Rect::new(0.0, 0.0, 1000.0, 800.0)
    }

    const TIP: Size = Size::new(380.0, 100.0);

    #[test]
    fn centered_below_in_upper_half() {
        let p = place(TIP, Point::new(500.0, 200.0), viewport(), 8.0);
        assert_eq!(p, Point::new(310.0, 208.0));
    }

    #[test]
    fn above_in_lower_half() {
        let p = place(TIP, Point::new(500.0, 600.0), viewport(), 8.0);
        assert_eq!(p, Point::new(310.0, 492.0));
    }

    #[test]
    fn clamps_to_touch_left_and_right_edges() {
        let p = place(TIP, Point::new(20.0, 100.0), viewport(), 8.0);
        assert_eq!(p.x, 0.0);
        let p = place(TIP, Point::new(990.0, 100.0), viewport(), 8.0);
        assert_eq!(p.x, 620.0);
    }

    #[test]
    fn lower_half_without_room_above_goes_below_then_clamps() {
        let tall = Size::new(200.0, 500.0);
        let vp = Rect::new(0.0, 0.0, 1000.0, 800.0);
        let p = place(tall, Point::new(500.0, 450.0), vp, 8.0);
        // Below would overflow the bottom: pinned to it
        assert_eq!(p.y, 300.0);
    }

    #[test]
    fn taller_than_viewport_pins_to_top() {
        let huge = Size::new(200.0, 900.0);
        let p = place(huge, Point::new(500.0, 100.0), viewport(), 8.0);
        assert_eq!(p.y, 0.0);
    }

    #[test]
    fn min_width_applies() {
        assert_eq!(width(120.0, 380.0), 380.0);
        assert_eq!(width(500.0, 380.0), 500.0);
    }
}
