//! Positioning pass: store entries → on-screen boxes.
//!
//! One pure function computes where every annotation sits for the current
//! bounds, transform, and calibration. Built-in markers are sized from the
//! displayed image width; user point markers by their type's scale; areas by
//! their relative size. Running it twice without a state change produces the
//! same output.

use dia_core::coords::{display_rect, to_screen, to_screen_size};
use dia_core::{
    AnnotationId, AnnotationRef, AnnotationStore, Bounds, Calibration, Config, Shape, Transform,
    TypeKey,
};
use kurbo::{Point, Rect, Size};

/// Which point of the box the annotation's `(x, y)` refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// Markers: `(x, y)` is the center.
    Center,
    /// Areas: `(x, y)` is the top-left corner.
    TopLeft,
}

/// Resolved on-screen geometry of one annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub id: AnnotationId,
    /// Index into the user list, `None` for built-ins.
    pub user_index: Option<usize>,
    pub kind: TypeKey,
    pub anchor: Anchor,
    /// Screen position of the annotation's `(x, y)`.
    pub position: Point,
    /// Screen box of the rendered marker or area.
    pub rect: Rect,
    pub font_size: f64,
    pub shape: Shape,
    pub display_index: u32,
}

impl Placement {
    pub fn is_area(&self) -> bool {
        self.anchor == Anchor::TopLeft
    }

    pub fn is_user(&self) -> bool {
        self.user_index.is_some()
    }

    /// Where a tooltip for this annotation is anchored by default.
    pub fn tooltip_anchor(&self) -> Point {
        self.rect.center()
    }
}

/// Position every annotation in the store.
///
/// Returns `None` when the bounds can't be used (unmounted or zero-size
/// image); the caller then skips positioning entirely. User annotations whose
/// type is not configured are skipped.
pub fn position_all(
    store: &AnnotationStore,
    config: &Config,
    bounds: &Bounds,
    transform: &Transform,
    calibration: &Calibration,
) -> Option<Vec<Placement>> {
    let display = display_rect(bounds, transform)?;
    let marker_base = display.width() * config.marker_scale;

    let mut out = Vec::with_capacity(store.builtin_count() + store.user_count());
    for (id, entry) in store.all_with_ids() {
        let position = to_screen(entry.position(), bounds, transform, calibration)?;
        let placement = match entry {
            AnnotationRef::Builtin {
                annotation,
                display_index,
            } => {
                let size = marker_base * annotation.size.factor();
                Placement {
                    id,
                    user_index: None,
                    kind: annotation.kind,
                    anchor: Anchor::Center,
                    position,
                    rect: Rect::from_center_size(position, Size::new(size, size)),
                    font_size: size * 0.5,
                    shape: Shape::Circle,
                    display_index,
                }
            }
            AnnotationRef::User {
                index, annotation, ..
            } => {
                let Some(style) = config.style(annotation.kind) else {
                    log::trace!("no style for {}; not positioned", annotation.kind);
                    continue;
                };
                let display_index = entry.display_index();
                if style.is_area() {
                    let size = match annotation.area_size() {
                        Some(rel) => Size::new(
                            to_screen_size(rel.width, bounds.width, transform.zoom),
                            to_screen_size(rel.height, bounds.height, transform.zoom),
                        ),
                        None => style.default_size,
                    };
                    Placement {
                        id,
                        user_index: Some(index),
                        kind: annotation.kind,
                        anchor: Anchor::TopLeft,
                        position,
                        rect: Rect::from_origin_size(position, size),
                        font_size: 0.0,
                        shape: annotation.shape,
                        display_index,
                    }
                } else {
                    let size = marker_base * style.scale;
                    Placement {
                        id,
                        user_index: Some(index),
                        kind: annotation.kind,
                        anchor: Anchor::Center,
                        position,
                        rect: Rect::from_center_size(position, Size::new(size, size)),
                        font_size: size * 0.4,
                        shape: annotation.shape,
                        display_index,
                    }
                }
            }
        };
        out.push(placement);
    }
    log::trace!("positioned {} annotations", out.len());
    Some(out)
}

/// Look up a placement by annotation id.
pub fn find(placements: &[Placement], id: AnnotationId) -> Option<&Placement> {
    placements.iter().find(|p| p.id == id)
}
