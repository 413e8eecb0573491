//! JSON shapes handed to the page.
//!
//! Every effect becomes one `{"kind": ..., ...}` object; the page script
//! switches on `kind`. Geometry is in viewport pixels.

use dia_editor::Effect;
use dia_render::{Anchor, Placement};
use serde::Serialize;
use serde_json::{Value, json};

/// One positioned annotation, as the page lays it out.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementView {
    pub id: u64,
    pub user_index: Option<usize>,
    #[serde(rename = "type")]
    pub kind: String,
    pub area: bool,
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    pub font_size: f64,
    pub shape: &'static str,
    pub display_index: u32,
}

impl From<&Placement> for PlacementView {
    fn from(p: &Placement) -> Self {
        Self {
            id: p.id.raw(),
            user_index: p.user_index,
            kind: p.kind.as_str().to_string(),
            area: p.anchor == Anchor::TopLeft,
            left: p.rect.x0,
            top: p.rect.y0,
            width: p.rect.width(),
            height: p.rect.height(),
            font_size: p.font_size,
            shape: p.shape.as_str(),
            display_index: p.display_index,
        }
    }
}

/// Encode an effect, or `None` for effects the bridge consumes itself.
pub fn to_json(effect: &Effect) -> Option<Value> {
    let value = match effect {
        Effect::ShowGhost { kind, shape, size } => json!({
            "kind": "showGhost",
            "type": kind.as_str(),
            "shape": shape.as_str(),
            "width": size.width,
            "height": size.height,
        }),
        Effect::MoveGhost(p) => json!({ "kind": "moveGhost", "left": p.x, "top": p.y }),
        Effect::RemoveGhost => json!({ "kind": "removeGhost" }),
        Effect::CaptureGlobalPointer => json!({ "kind": "capturePointer" }),
        Effect::ReleaseGlobalPointer => json!({ "kind": "releasePointer" }),
        Effect::SetElementRect { id, rect } => json!({
            "kind": "setRect",
            "id": id.raw(),
            "left": rect.x0,
            "top": rect.y0,
            "width": rect.width(),
            "height": rect.height(),
        }),
        Effect::ShowTooltip { id, anchor } => json!({
            "kind": "showTooltip",
            "id": id.raw(),
            "x": anchor.x,
            "y": anchor.y,
        }),
        Effect::HideTooltip { id } => json!({ "kind": "hideTooltip", "id": id.raw() }),
        Effect::HideTooltips => json!({ "kind": "hideTooltips" }),
        Effect::EditModeChanged(on) => json!({ "kind": "editMode", "enabled": on }),
        Effect::TransformChanged(t) => json!({
            "kind": "transform",
            "zoom": t.zoom,
            "x": t.translate.x,
            "y": t.translate.y,
        }),
        Effect::Notify(message) => json!({ "kind": "notify", "message": message }),
        Effect::RequestFrame(ticket) => json!({ "kind": "requestFrame", "ticket": ticket }),
        Effect::Rerender => json!({ "kind": "rerender" }),
        Effect::Unmount(id) => json!({ "kind": "unmount", "id": id.raw() }),
        Effect::PickedCoordinate(line) => json!({ "kind": "picked", "line": line }),
        Effect::Commit(_) | Effect::Reposition | Effect::WriteParam(_) => return None,
    };
    Some(value)
}

/// Encode a batch of effects as a JSON array string.
pub fn batch_to_string(effects: &[Effect]) -> String {
    let items: Vec<Value> = effects.iter().filter_map(to_json).collect();
    Value::Array(items).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dia_core::{
        Annotation, AnnotationStore, Bounds, Calibration, Config, Dataset, ParamUpdate, Point,
        Shape, Size, Transform, TypeKey,
    };
    use dia_render::position_all;
    use pretty_assertions::assert_eq;

    #[test]
    fn ghost_and_frame_requests() {
        let fx = vec![
            Effect::ShowGhost {
                kind: TypeKey::intern("area-info"),
                shape: Shape::Rectangle,
                size: Size::new(120.0, 80.0),
            },
            Effect::MoveGhost(Point::new(10.0, 20.0)),
            Effect::RequestFrame(3),
        ];
        assert_eq!(
            batch_to_string(&fx),
            r#"[{"height":80.0,"kind":"showGhost","shape":"rectangle","type":"area-info","width":120.0},{"kind":"moveGhost","left":10.0,"top":20.0},{"kind":"requestFrame","ticket":3}]"#
        );
    }

    #[test]
    fn internal_effects_are_not_sent() {
        let fx = vec![
            Effect::Reposition,
            Effect::WriteParam(ParamUpdate::Remove),
            Effect::HideTooltips,
        ];
        assert_eq!(batch_to_string(&fx), r#"[{"kind":"hideTooltips"}]"#);
    }

    #[test]
    fn transform_effect() {
        let v = to_json(&Effect::TransformChanged(Transform::IDENTITY)).unwrap();
        assert_eq!(v["zoom"], 1.0);
        assert_eq!(v["x"], 0.0);
    }

    #[test]
    fn placement_view_uses_page_field_names() {
        let config = Config::default();
        let mut store = AnnotationStore::new(&Dataset::default(), 10);
        store
            .add(
                Annotation::area(0.1, 0.2, Size::new(0.5, 0.25), TypeKey::intern("area-pri-1"), "r")
                    .with_shape(Shape::Circle),
            )
            .unwrap();
        let placements = position_all(
            &store,
            &config,
            &Bounds::new(0.0, 0.0, 400.0, 200.0),
            &Transform::IDENTITY,
            &Calibration::NONE,
        )
        .unwrap();
        let view = PlacementView::from(&placements[0]);
        assert_eq!(view.left, 40.0);
        assert_eq!(view.top, 40.0);
        assert_eq!(view.width, 200.0);
        assert_eq!(view.height, 50.0);
        assert!(view.area);

        let v = serde_json::to_value(&view).unwrap();
        assert_eq!(v["type"], "area-pri-1");
        assert_eq!(v["userIndex"], 0);
        assert_eq!(v["displayIndex"], 1);
        assert_eq!(v["shape"], "circle");
    }
}
