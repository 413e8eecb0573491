//! Interaction state machine.
//!
//! Placement, drag, and resize are mutually exclusive states of one [`Mode`];
//! edit mode is an orthogonal flag that gates drag and resize and is read
//! only when a gesture starts.
//!
//! All gesture geometry is computed in viewport pixels against the displayed
//! image rectangle (the image after zoom and pan) and converted to normalized
//! units only on release. Nothing here mutates the store: a finished gesture
//! yields [`Effect::Commit`] for the session to apply.
//!
//! ## Placement anchors
//!
//! | Type  | Click means      | Stored `(x, y)`                    |
//! |-------|------------------|------------------------------------|
//! | point | marker center    | the click, clamped to `[0, 1]`     |
//! | area  | region center    | click minus half the default size  |

use crate::effect::{Effect, StoreMutation};
use crate::input::InputEvent;
use dia_core::coords::from_display;
use dia_core::model::clamp_unit;
use dia_core::{
    AnnotationId, AnnotationPatch, AnnotationStore, Config, DiaError, PlacementDraft, TypeStyle,
};
use dia_render::layout::{self, Anchor, Placement};
use dia_render::{AREA_BORDER_WIDTH, Handle, Hit, Part, in_hover_band};
use kurbo::{Point, Rect, Size};

/// Ghost size for point annotations, in pixels.
const POINT_GHOST: Size = Size::new(32.0, 32.0);

/// Areas may not grow beyond this share of the displayed image.
const MAX_DISPLAY_SHARE: f64 = 0.8;

/// Float slack allowed when converting a clamped box back to `[0, 1]`.
const EDGE_EPSILON: f64 = 1e-9;

/// What an interaction needs to see of the rest of the session.
pub struct Frame<'a> {
    pub config: &'a Config,
    pub store: &'a AnnotationStore,
    pub placements: &'a [Placement],
    /// The image on screen after zoom and pan; `None` if it can't be measured.
    pub display: Option<Rect>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DragState {
    pub index: usize,
    pub id: AnnotationId,
    pub anchor: Anchor,
    pub start_pointer: Point,
    pub start_rect: Rect,
    pub current: Rect,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResizeState {
    pub index: usize,
    pub id: AnnotationId,
    pub handle: Handle,
    pub start_pointer: Point,
    pub start_rect: Rect,
    pub current: Rect,
    pub min_size: Size,
    pub max_size: Size,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Mode {
    #[default]
    Idle,
    Placing {
        draft: PlacementDraft,
        area: bool,
        ghost: Size,
    },
    Dragging(DragState),
    Resizing(ResizeState),
}

#[derive(Debug, Default)]
pub struct Interaction {
    mode: Mode,
    edit_mode: bool,
    hovered: Option<AnnotationId>,
}

impl Interaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn edit_mode(&self) -> bool {
        self.edit_mode
    }

    pub fn is_idle(&self) -> bool {
        self.mode == Mode::Idle
    }

    /// A drag or resize is in progress.
    pub fn is_gesture_active(&self) -> bool {
        matches!(self.mode, Mode::Dragging(_) | Mode::Resizing(_))
    }

    pub fn is_placing(&self) -> bool {
        matches!(self.mode, Mode::Placing { .. })
    }

    pub fn hovered(&self) -> Option<AnnotationId> {
        self.hovered
    }

    /// Dispatch a pointer or key event.
    pub fn handle(&mut self, event: &InputEvent, hit: Option<Hit>, frame: &Frame) -> Vec<Effect> {
        match event {
            InputEvent::PointerDown { position } => self.pointer_down(*position, hit, frame),
            InputEvent::PointerMove { position } => self.pointer_move(*position, hit, frame),
            InputEvent::PointerUp { position } => self.pointer_up(*position, frame),
            e if e.is_escape() => self.cancel(),
            _ => Vec::new(),
        }
    }

    pub fn set_edit_mode(&mut self, on: bool) -> Result<Vec<Effect>, DiaError> {
        if self.is_gesture_active() {
            return Err(DiaError::GestureInProgress);
        }
        if self.edit_mode == on {
            return Ok(Vec::new());
        }
        log::debug!("edit mode {}", if on { "on" } else { "off" });
        self.edit_mode = on;
        let mut fx = vec![Effect::EditModeChanged(on)];
        if on {
            self.hovered = None;
            fx.push(Effect::HideTooltips);
        }
        Ok(fx)
    }

    // ─── Placement ───────────────────────────────────────────────────────

    /// Enter placement mode. An active placement is cancelled first.
    pub fn begin_placement(
        &mut self,
        draft: PlacementDraft,
        style: &TypeStyle,
    ) -> Result<Vec<Effect>, DiaError> {
        if self.is_gesture_active() {
            return Err(DiaError::GestureInProgress);
        }
        let mut fx = Vec::new();
        if self.is_placing() {
            log::debug!("placement restarted; cancelling the previous one");
            fx.extend(self.cancel());
        }
        if let Some(id) = self.hovered.take() {
            fx.push(Effect::HideTooltip { id });
        }

        let area = style.is_area();
        let ghost = if area { style.default_size } else { POINT_GHOST };
        fx.push(Effect::ShowGhost {
            kind: draft.kind,
            shape: draft.shape,
            size: ghost,
        });
        fx.push(Effect::CaptureGlobalPointer);
        log::debug!("placing {:?} ({})", draft.title, draft.kind);
        self.mode = Mode::Placing { draft, area, ghost };
        Ok(fx)
    }

    fn commit_placement(
        &mut self,
        draft: PlacementDraft,
        area: bool,
        pointer: Point,
        frame: &Frame,
    ) -> Vec<Effect> {
        let mut fx = vec![Effect::RemoveGhost, Effect::ReleaseGlobalPointer];
        let Some(display) = frame.display else {
            log::warn!("image not measurable; placement cancelled");
            return fx;
        };
        if !contains_inclusive(display, pointer) {
            log::debug!("placement click outside the image; cancelled");
            return fx;
        }
        if frame.store.is_full() {
            let err = DiaError::CapacityExceeded {
                max: frame.store.max_users(),
            };
            fx.push(Effect::Notify(err.to_string()));
            return fx;
        }
        let Some(n) = from_display(pointer, display) else {
            return fx;
        };

        let annotation = if area {
            let Some(style) = frame.config.style(draft.kind) else {
                log::warn!("type {} disappeared during placement", draft.kind);
                return fx;
            };
            let size = Size::new(
                style.default_size.width / display.width(),
                style.default_size.height / display.height(),
            );
            let origin = Point::new(
                clamp_origin(n.x - size.width / 2.0, size.width),
                clamp_origin(n.y - size.height / 2.0, size.height),
            );
            draft.at(origin, Some(size))
        } else {
            draft.at(Point::new(clamp_unit(n.x), clamp_unit(n.y)), None)
        };

        fx.push(Effect::Commit(StoreMutation::Add(annotation)));
        if !self.edit_mode {
            self.edit_mode = true;
            fx.push(Effect::EditModeChanged(true));
            fx.push(Effect::HideTooltips);
        }
        fx.push(Effect::Reposition);
        fx
    }

    // ─── Pointer ─────────────────────────────────────────────────────────

    fn pointer_down(&mut self, pointer: Point, hit: Option<Hit>, frame: &Frame) -> Vec<Effect> {
        if !self.is_idle() || !self.edit_mode {
            return Vec::new();
        }
        let Some(hit) = hit else {
            return Vec::new();
        };
        let Some(index) = hit.user_index else {
            return Vec::new();
        };
        let Some(placement) = layout::find(frame.placements, hit.id) else {
            return Vec::new();
        };

        match hit.part {
            Part::Body => {
                log::debug!("drag start {}", hit.id);
                self.mode = Mode::Dragging(DragState {
                    index,
                    id: hit.id,
                    anchor: placement.anchor,
                    start_pointer: pointer,
                    start_rect: placement.rect,
                    current: placement.rect,
                });
            }
            Part::Handle(handle) => {
                let Some(style) = frame.config.style(placement.kind) else {
                    return Vec::new();
                };
                if !placement.is_area() {
                    return Vec::new();
                }
                log::debug!("resize start {} via {}", hit.id, handle.as_str());
                self.mode = Mode::Resizing(ResizeState {
                    index,
                    id: hit.id,
                    handle,
                    start_pointer: pointer,
                    start_rect: placement.rect,
                    current: placement.rect,
                    min_size: style.min_size,
                    max_size: style.max_size,
                });
            }
        }
        let mut fx = vec![Effect::CaptureGlobalPointer];
        if let Some(id) = self.hovered.take() {
            fx.push(Effect::HideTooltip { id });
        }
        fx
    }

    fn pointer_move(&mut self, pointer: Point, hit: Option<Hit>, frame: &Frame) -> Vec<Effect> {
        if self.is_idle() {
            return self.hover(pointer, hit, frame);
        }
        match &mut self.mode {
            Mode::Placing { ghost, .. } => {
                vec![Effect::MoveGhost(pointer - ghost.to_vec2() / 2.0)]
            }
            Mode::Dragging(drag) => {
                let Some(display) = frame.display else {
                    return Vec::new();
                };
                drag.current = drag_rect(drag, pointer, display);
                vec![Effect::SetElementRect {
                    id: drag.id,
                    rect: drag.current,
                }]
            }
            Mode::Resizing(resize) => {
                let Some(display) = frame.display else {
                    return Vec::new();
                };
                resize.current = resize_rect(resize, pointer, display);
                vec![Effect::SetElementRect {
                    id: resize.id,
                    rect: resize.current,
                }]
            }
            Mode::Idle => Vec::new(),
        }
    }

    fn pointer_up(&mut self, pointer: Point, frame: &Frame) -> Vec<Effect> {
        match std::mem::take(&mut self.mode) {
            Mode::Idle => Vec::new(),
            Mode::Placing { draft, area, .. } => self.commit_placement(draft, area, pointer, frame),
            Mode::Dragging(drag) => finish_drag(&drag, pointer, frame),
            Mode::Resizing(resize) => finish_resize(&resize, pointer, frame),
        }
    }

    /// Escape: abandon whatever is in progress. The store is untouched.
    pub fn cancel(&mut self) -> Vec<Effect> {
        match std::mem::take(&mut self.mode) {
            Mode::Idle => Vec::new(),
            Mode::Placing { .. } => vec![Effect::RemoveGhost, Effect::ReleaseGlobalPointer],
            Mode::Dragging(_) | Mode::Resizing(_) => {
                vec![Effect::ReleaseGlobalPointer, Effect::Reposition]
            }
        }
    }

    fn hover(&mut self, pointer: Point, hit: Option<Hit>, frame: &Frame) -> Vec<Effect> {
        if self.edit_mode {
            return Vec::new();
        }
        // Areas only react near their border
        let inset = AREA_BORDER_WIDTH + frame.config.area_hover_distance;
        let target = hit.map(|h| h.id).filter(|&id| {
            layout::find(frame.placements, id)
                .is_none_or(|p| !p.is_area() || in_hover_band(p, pointer, inset))
        });
        if target == self.hovered {
            return Vec::new();
        }
        let mut fx = Vec::new();
        if let Some(id) = self.hovered.take() {
            fx.push(Effect::HideTooltip { id });
        }
        if let Some(id) = target
            && let Some(p) = layout::find(frame.placements, id)
        {
            // Areas anchor where the pointer entered
            let anchor = if p.is_area() {
                pointer
            } else {
                p.tooltip_anchor()
            };
            fx.push(Effect::ShowTooltip { id, anchor });
            self.hovered = Some(id);
        }
        fx
    }

    /// Forget the hovered annotation (it was unmounted).
    pub fn forget(&mut self, id: AnnotationId) {
        if self.hovered == Some(id) {
            self.hovered = None;
        }
    }
}

// ─── Gesture geometry ────────────────────────────────────────────────────

fn finish_drag(drag: &DragState, pointer: Point, frame: &Frame) -> Vec<Effect> {
    let mut fx = vec![Effect::ReleaseGlobalPointer];
    if pointer != drag.start_pointer
        && let Some(display) = frame.display
    {
        let rect = drag_rect(drag, pointer, display);
        let reference = match drag.anchor {
            Anchor::Center => rect.center(),
            Anchor::TopLeft => rect.origin(),
        };
        match from_display(reference, display).and_then(snap_unit) {
            Some(position) => fx.push(Effect::Commit(StoreMutation::Update {
                index: drag.index,
                patch: AnnotationPatch::moved_to(position),
            })),
            None => log::warn!("drag of {} ended off the image; discarded", drag.id),
        }
    }
    fx.push(Effect::Reposition);
    fx
}

fn finish_resize(resize: &ResizeState, pointer: Point, frame: &Frame) -> Vec<Effect> {
    let mut fx = vec![Effect::ReleaseGlobalPointer];
    if pointer != resize.start_pointer
        && let Some(display) = frame.display
    {
        let rect = resize_rect(resize, pointer, display);
        let size = Size::new(
            rect.width() / display.width(),
            rect.height() / display.height(),
        );
        let origin = from_display(rect.origin(), display).and_then(snap_unit);
        match origin {
            Some(origin) if size.is_finite() && size.width > 0.0 && size.height > 0.0 => {
                fx.push(Effect::Commit(StoreMutation::Update {
                    index: resize.index,
                    patch: AnnotationPatch::resized(origin, size),
                }));
            }
            _ => log::warn!("resize of {} produced invalid geometry; discarded", resize.id),
        }
    }
    fx.push(Effect::Reposition);
    fx
}

/// Move the start box by the pointer delta, keeping a point marker's center
/// or an area's whole box inside the displayed image.
fn drag_rect(drag: &DragState, pointer: Point, display: Rect) -> Rect {
    let moved = drag.start_rect + (pointer - drag.start_pointer);
    match drag.anchor {
        Anchor::Center => {
            let c = moved.center();
            let c = Point::new(
                c.x.clamp(display.x0, display.x1),
                c.y.clamp(display.y0, display.y1),
            );
            Rect::from_center_size(c, moved.size())
        }
        Anchor::TopLeft => {
            let size = moved.size();
            let x = moved.x0.min(display.x1 - size.width).max(display.x0);
            let y = moved.y0.min(display.y1 - size.height).max(display.y0);
            Rect::from_origin_size((x, y), size)
        }
    }
}

/// Resize from one corner. Size is clamped to `[min, min(max, 80% of the
/// displayed image)]`, then limited so the box never crosses the image edge.
fn resize_rect(resize: &ResizeState, pointer: Point, display: Rect) -> Rect {
    let start = resize.start_rect;
    let delta = pointer - resize.start_pointer;
    let (start_w, start_h) = (start.width(), start.height());
    let handle = resize.handle;

    let mut left = start.x0;
    let mut top = start.y0;
    let width = if handle.moves_left() {
        left = start.x0 + delta.x;
        start_w - delta.x
    } else {
        start_w + delta.x
    };
    let height = if handle.moves_top() {
        top = start.y0 + delta.y;
        start_h - delta.y
    } else {
        start_h + delta.y
    };

    let max_w = resize.max_size.width.min(display.width() * MAX_DISPLAY_SHARE);
    let max_h = resize.max_size.height.min(display.height() * MAX_DISPLAY_SHARE);
    let mut w = width.min(max_w).max(resize.min_size.width);
    let mut h = height.min(max_h).max(resize.min_size.height);

    if handle.moves_left() {
        w = w.min(start.x0 - display.x0 + start_w);
        left = display.x0.max(start.x0 + (start_w - w));
    } else {
        w = w.min(display.x1 - start.x0);
    }
    if handle.moves_top() {
        h = h.min(start.y0 - display.y0 + start_h);
        top = display.y0.max(start.y0 + (start_h - h));
    } else {
        h = h.min(display.y1 - start.y0);
    }

    left = left.min(display.x1 - w).max(display.x0);
    top = top.min(display.y1 - h).max(display.y0);
    Rect::from_origin_size((left, top), Size::new(w, h))
}

fn contains_inclusive(rect: Rect, p: Point) -> bool {
    p.x >= rect.x0 && p.x <= rect.x1 && p.y >= rect.y0 && p.y <= rect.y1
}

/// Keep an area's origin so that its box stays inside `[0, 1]`.
fn clamp_origin(v: f64, extent: f64) -> f64 {
    v.clamp(0.0, (1.0 - extent).max(0.0))
}

/// Accept a normalized point within float slack of `[0, 1]`, snapping it in.
fn snap_unit(p: Point) -> Option<Point> {
    let ok = |v: f64| v.is_finite() && (-EDGE_EPSILON..=1.0 + EDGE_EPSILON).contains(&v);
    (ok(p.x) && ok(p.y)).then(|| Point::new(clamp_unit(p.x), clamp_unit(p.y)))
}
