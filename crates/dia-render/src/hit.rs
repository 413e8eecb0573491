//! Hit testing: screen point → annotation part.
//!
//! Walks placements back to front (last positioned = topmost). User areas
//! expose four corner handles that take precedence over their body.

use crate::layout::Placement;
use dia_core::{AnnotationId, Shape};
use kurbo::{Point, Rect};

/// A corner resize handle of an area annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handle {
    Nw,
    Ne,
    Sw,
    Se,
}

impl Handle {
    pub const ALL: [Handle; 4] = [Handle::Nw, Handle::Ne, Handle::Sw, Handle::Se];

    pub fn as_str(&self) -> &'static str {
        match self {
            Handle::Nw => "nw",
            Handle::Ne => "ne",
            Handle::Sw => "sw",
            Handle::Se => "se",
        }
    }

    /// Dragging this handle moves the left edge (`w` component).
    pub fn moves_left(&self) -> bool {
        matches!(self, Handle::Nw | Handle::Sw)
    }

    /// Dragging this handle moves the top edge (`n` component).
    pub fn moves_top(&self) -> bool {
        matches!(self, Handle::Nw | Handle::Ne)
    }

    pub fn corner_of(&self, rect: Rect) -> Point {
        match self {
            Handle::Nw => Point::new(rect.x0, rect.y0),
            Handle::Ne => Point::new(rect.x1, rect.y0),
            Handle::Sw => Point::new(rect.x0, rect.y1),
            Handle::Se => Point::new(rect.x1, rect.y1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Part {
    Body,
    Handle(Handle),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    pub id: AnnotationId,
    pub user_index: Option<usize>,
    pub part: Part,
}

/// Find the topmost annotation part under `point`.
///
/// `handle_radius` is how far from a corner a press still grabs the handle.
/// Returns `None` for the background.
pub fn hit_test(placements: &[Placement], point: Point, handle_radius: f64) -> Option<Hit> {
    for p in placements.iter().rev() {
        if p.is_area()
            && p.is_user()
            && let Some(handle) = handle_at(p.rect, point, handle_radius)
        {
            return Some(Hit {
                id: p.id,
                user_index: p.user_index,
                part: Part::Handle(handle),
            });
        }
        if body_contains(p, point) {
            return Some(Hit {
                id: p.id,
                user_index: p.user_index,
                part: Part::Body,
            });
        }
    }
    None
}

/// Drawn border of an area annotation, in pixels.
pub const AREA_BORDER_WIDTH: f64 = 3.0;

/// Whether `point` is in the hover band of an area: inside its box but
/// outside the core inset by `inset` pixels (an ellipse for circles).
/// Areas too small to have a core are all band.
pub fn in_hover_band(p: &Placement, point: Point, inset: f64) -> bool {
    if !body_contains(p, point) {
        return false;
    }
    let core = p.rect.inset(-inset);
    if core.width() <= 0.0 || core.height() <= 0.0 {
        return true;
    }
    if p.shape == Shape::Circle {
        return !ellipse_contains(core, point);
    }
    !core.contains(point)
}

fn handle_at(rect: Rect, point: Point, radius: f64) -> Option<Handle> {
    Handle::ALL
        .into_iter()
        .find(|h| h.corner_of(rect).distance(point) <= radius)
}

fn body_contains(p: &Placement, point: Point) -> bool {
    let r = p.rect;
    let inside = point.x >= r.x0 && point.x <= r.x1 && point.y >= r.y0 && point.y <= r.y1;
    if !inside {
        return false;
    }
    // Round markers only react inside the inscribed ellipse
    if p.shape == Shape::Circle && !p.is_area() {
        return ellipse_contains(r, point);
    }
    true
}

fn ellipse_contains(r: Rect, point: Point) -> bool {
    let c = r.center();
    let (rx, ry) = (r.width() / 2.0, r.height() / 2.0);
    if rx <= 0.0 || ry <= 0.0 {
        return false;
    }
    let dx = (point.x - c.x) / rx;
    let dy = (point.y - c.y) / ry;
    dx * dx + dy * dy <= 1.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Anchor;
    use dia_core::TypeKey;
    use kurbo::Size;

    fn placement(rect: Rect, area: bool, user: Option<usize>, shape: Shape) -> Placement {
        Placement {
            id: AnnotationId::next(),
            user_index: user,
            kind: TypeKey::intern("area-info"),
            anchor: if area { Anchor::TopLeft } else { Anchor::Center },
            position: rect.origin(),
            rect,
            font_size: 0.0,
            shape,
            display_index: 1,
        }
    }

    #[test]
    fn hit_background_is_none() {
        let ps = vec![placement(
            Rect::new(10.0, 10.0, 50.0, 50.0),
            false,
            None,
            Shape::Rectangle,
        )];
        assert_eq!(hit_test(&ps, Point::new(100.0, 100.0), 6.0), None);
    }

    #[test]
    fn topmost_wins() {
        let below = placement(Rect::new(0.0, 0.0, 100.0, 100.0), true, Some(0), Shape::Rectangle);
        let above = placement(Rect::new(40.0, 40.0, 60.0, 60.0), false, Some(1), Shape::Rectangle);
        let above_id = above.id;
        let ps = vec![below, above];
        let hit = hit_test(&ps, Point::new(50.0, 50.0), 6.0).unwrap();
        assert_eq!(hit.id, above_id);
        assert_eq!(hit.part, Part::Body);
    }

    #[test]
    fn user_area_corners_are_handles() {
        let rect = Rect::from_origin_size((100.0, 100.0), Size::new(120.0, 80.0));
        let ps = vec![placement(rect, true, Some(0), Shape::Rectangle)];
        let hit = hit_test(&ps, Point::new(218.0, 178.0), 6.0).unwrap();
        assert_eq!(hit.part, Part::Handle(Handle::Se));
        let hit = hit_test(&ps, Point::new(97.0, 100.0), 6.0).unwrap();
        assert_eq!(hit.part, Part::Handle(Handle::Nw));
        let hit = hit_test(&ps, Point::new(160.0, 140.0), 6.0).unwrap();
        assert_eq!(hit.part, Part::Body);
    }

    #[test]
    fn builtin_areas_have_no_handles() {
        let rect = Rect::new(0.0, 0.0, 100.0, 100.0);
        let ps = vec![placement(rect, true, None, Shape::Rectangle)];
        let hit = hit_test(&ps, Point::new(100.0, 100.0), 6.0).unwrap();
        assert_eq!(hit.part, Part::Body);
    }

    #[test]
    fn circle_marker_ignores_corners() {
        let rect = Rect::new(0.0, 0.0, 20.0, 20.0);
        let ps = vec![placement(rect, false, Some(0), Shape::Circle)];
        assert_eq!(hit_test(&ps, Point::new(1.0, 1.0), 6.0), None);
        assert!(hit_test(&ps, Point::new(10.0, 10.0), 6.0).is_some());
    }

    #[test]
    fn area_hover_band_excludes_the_core() {
        let rect = Rect::new(100.0, 100.0, 200.0, 180.0);
        let area = placement(rect, true, None, Shape::Rectangle);
        assert!(!in_hover_band(&area, Point::new(150.0, 140.0), 8.0));
        assert!(in_hover_band(&area, Point::new(150.0, 104.0), 8.0));
        assert!(in_hover_band(&area, Point::new(196.0, 140.0), 8.0));
        assert!(!in_hover_band(&area, Point::new(250.0, 140.0), 8.0));

        // Circle areas: the box corner is outside the inset ellipse
        let round = placement(rect, true, None, Shape::Circle);
        assert!(in_hover_band(&round, Point::new(110.0, 110.0), 8.0));
        assert!(!in_hover_band(&round, Point::new(150.0, 140.0), 8.0));

        let tiny = placement(Rect::new(0.0, 0.0, 10.0, 10.0), true, None, Shape::Rectangle);
        assert!(in_hover_band(&tiny, Point::new(5.0, 5.0), 8.0));
    }

    #[test]
    fn handle_edges() {
        assert!(Handle::Nw.moves_left() && Handle::Nw.moves_top());
        assert!(!Handle::Se.moves_left() && !Handle::Se.moves_top());
        assert_eq!(Handle::Sw.as_str(), "sw");
    }
}
