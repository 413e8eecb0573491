//! Input abstraction layer.
//!
//! Normalizes mouse, wheel, touch, and keyboard events from the page into a
//! single `InputEvent` enum. Positions are viewport pixels (`clientX/Y`).

use kurbo::Point;
use smallvec::SmallVec;

/// One active finger.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchPoint {
    pub id: i32,
    pub position: Point,
}

pub type Touches = SmallVec<[TouchPoint; 2]>;

#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    PointerDown { position: Point },
    PointerMove { position: Point },
    PointerUp { position: Point },

    /// Wheel notch; negative `delta_y` zooms in.
    Wheel { position: Point, delta_y: f64 },

    /// Touches currently on the surface after the change.
    TouchStart { touches: Touches },
    TouchMove { touches: Touches },
    TouchEnd { touches: Touches },

    Key { key: String },
}

impl InputEvent {
    pub fn pointer_down(x: f64, y: f64) -> Self {
        Self::PointerDown {
            position: Point::new(x, y),
        }
    }

    pub fn pointer_move(x: f64, y: f64) -> Self {
        Self::PointerMove {
            position: Point::new(x, y),
        }
    }

    pub fn pointer_up(x: f64, y: f64) -> Self {
        Self::PointerUp {
            position: Point::new(x, y),
        }
    }

    pub fn key(key: &str) -> Self {
        Self::Key {
            key: key.to_string(),
        }
    }

    /// Build touches from a flat `[id, x, y, id, x, y, ...]` list.
    pub fn touches_from_flat(flat: &[f64]) -> Touches {
        flat.chunks_exact(3)
            .map(|c| TouchPoint {
                id: c[0] as i32,
                position: Point::new(c[1], c[2]),
            })
            .collect()
    }

    /// Extract the position if this is a single-pointer event.
    pub fn position(&self) -> Option<Point> {
        match self {
            Self::PointerDown { position }
            | Self::PointerMove { position }
            | Self::PointerUp { position }
            | Self::Wheel { position, .. } => Some(*position),
            _ => None,
        }
    }

    pub fn is_escape(&self) -> bool {
        matches!(self, Self::Key { key } if key == "Escape")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_touch_list() {
        let touches = InputEvent::touches_from_flat(&[1.0, 10.0, 20.0, 2.0, 30.0, 40.0, 9.0]);
        assert_eq!(touches.len(), 2);
        assert_eq!(touches[1].id, 2);
        assert_eq!(touches[1].position, Point::new(30.0, 40.0));
        assert!(!touches.spilled());
    }

    #[test]
    fn escape_key() {
        assert!(InputEvent::key("Escape").is_escape());
        assert!(!InputEvent::key("Enter").is_escape());
        assert_eq!(
            InputEvent::pointer_up(1.0, 2.0).position(),
            Some(Point::new(1.0, 2.0))
        );
    }
}
