//! Effects: what the engine asks the page to do.
//!
//! Nothing in the editor touches the page directly. State transitions return
//! a list of effects which the bridge applies in order. `Commit` is the one
//! exception: it is consumed by the session, which is the only mutator of
//! the store, and never reaches the page.

use dia_core::{Annotation, AnnotationId, AnnotationPatch, ParamUpdate, Shape, Transform, TypeKey};
use kurbo::{Point, Rect, Size};

/// A change to the user subset of the store.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreMutation {
    Add(Annotation),
    Update { index: usize, patch: AnnotationPatch },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    // ─── Placement ghost ─────────────────────────────────────────────────
    ShowGhost {
        kind: TypeKey,
        shape: Shape,
        size: Size,
    },
    /// Top-left of the ghost in viewport pixels.
    MoveGhost(Point),
    RemoveGhost,

    // ─── Gesture listeners ───────────────────────────────────────────────
    CaptureGlobalPointer,
    ReleaseGlobalPointer,

    /// Live feedback while dragging or resizing: the element's box in
    /// viewport pixels. The store is untouched until release.
    SetElementRect {
        id: AnnotationId,
        rect: Rect,
    },

    // ─── Tooltips ────────────────────────────────────────────────────────
    ShowTooltip {
        id: AnnotationId,
        anchor: Point,
    },
    HideTooltip {
        id: AnnotationId,
    },
    HideTooltips,

    // ─── State ───────────────────────────────────────────────────────────
    Commit(StoreMutation),
    EditModeChanged(bool),
    TransformChanged(Transform),
    /// User-visible message (capacity reached, invalid form input).
    Notify(String),

    // ─── Rendering ───────────────────────────────────────────────────────
    /// Positions are stale; the session turns this into `RequestFrame`.
    Reposition,
    /// Ask the host for an animation frame and call back with this ticket.
    RequestFrame(u64),
    /// The user list changed: re-create user elements.
    Rerender,
    Unmount(AnnotationId),

    // ─── URL / debug ─────────────────────────────────────────────────────
    WriteParam(ParamUpdate),
    PickedCoordinate(String),
}
