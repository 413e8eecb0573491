//! Integration tests: a full editing session (dia-editor ↔ dia-render ↔ dia-core).
//!
//! Drives a `Session` with page-level input against an image laid out away
//! from the viewport origin, and checks what ends up in the store, the URL
//! parameter, and the positioning pass.

use dia_core::{
    Annotation, Bounds, Config, Dataset, FixedBounds, ParamUpdate, Point, Size, TypeKey, decode,
};
use dia_editor::{Effect, InputEvent, PageParams, Session};
use pretty_assertions::assert_eq;

const DATASET: &str = include_str!("../../dia-core/tests/fixtures/landscape.json");

/// Image at (100, 50), 800 × 600 viewport pixels.
fn image() -> FixedBounds {
    FixedBounds(Bounds::new(100.0, 50.0, 800.0, 600.0))
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn session(params: PageParams) -> Session<FixedBounds> {
    init_logging();
    let dataset = Dataset::from_json(DATASET).unwrap();
    Session::new(Config::default(), dataset, params, image()).unwrap()
}

fn written(fx: &[Effect]) -> Option<String> {
    fx.iter().find_map(|e| match e {
        Effect::WriteParam(ParamUpdate::Set(s)) => Some(s.clone()),
        _ => None,
    })
}

fn ticket(fx: &[Effect]) -> Option<u64> {
    fx.iter().find_map(|e| match e {
        Effect::RequestFrame(t) => Some(*t),
        _ => None,
    })
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

// ─── Authoring → sharing ────────────────────────────────────────────────

#[test]
fn authored_annotations_survive_a_shared_link() {
    let mut author = session(PageParams::default());

    author
        .begin_placement("Pump", "user-pri-1", "Check\nseals", "circle")
        .unwrap();
    author.handle(&InputEvent::pointer_down(300.0, 200.0), 0.0);
    author.handle(&InputEvent::pointer_up(300.0, 200.0), 1.0);

    author
        .begin_placement("Tank farm", "area-info", "", "rectangle")
        .unwrap();
    let fx = author.handle(&InputEvent::pointer_up(500.0, 350.0), 2.0);
    let param = written(&fx).expect("placement persists");

    let users = author.store().users().to_vec();
    assert_eq!(users.len(), 2);
    assert!(approx(users[0].x, 0.25) && approx(users[0].y, 0.25));
    // Area: click is the center, default size 120 × 80 px
    assert!(approx(users[1].x, 0.5 - 60.0 / 800.0));
    assert!(approx(users[1].y, 0.5 - 40.0 / 600.0));

    let reader = session(PageParams::from_pairs([("annotations", param.as_str())]));
    assert_eq!(reader.store().users(), users.as_slice());
    assert_eq!(reader.store().builtin_count(), 5);
    assert_eq!(decode(&param, reader.config()), users);
}

#[test]
fn placement_while_zoomed_maps_through_the_transform() {
    let mut s = session(PageParams::default());

    // Zoom in at the image center, then place at the same viewport point
    let fx = s.handle(
        &InputEvent::Wheel {
            position: Point::new(500.0, 350.0),
            delta_y: -120.0,
        },
        0.0,
    );
    assert!(matches!(fx[0], Effect::TransformChanged(t) if approx(t.zoom, 1.1)));

    s.begin_placement("Center", "user-info", "", "circle").unwrap();
    s.handle(&InputEvent::pointer_down(500.0, 350.0), 1.0);
    s.handle(&InputEvent::pointer_up(500.0, 350.0), 2.0);

    let placed = &s.store().users()[0];
    assert!(approx(placed.x, 0.5) && approx(placed.y, 0.5));
}

// ─── Positioning ────────────────────────────────────────────────────────

#[test]
fn frame_positions_builtins_and_users_with_display_indices() {
    let users = [Annotation::point(0.5, 0.5, TypeKey::intern("user-info"), "mine")];
    let ParamUpdate::Set(param) = dia_core::encode(&users) else {
        panic!("non-empty list encodes");
    };
    let mut s = session(PageParams::from_pairs([("annotations", param)]));

    let t = ticket(&s.resize()).unwrap();
    let placements = s.frame(t, 0.0).unwrap().to_vec();
    let indices: Vec<u32> = placements.iter().map(|p| p.display_index).collect();
    assert_eq!(indices, vec![1, 1, 2, 2, 3, 1]);

    let mine = placements.last().unwrap();
    assert_eq!(mine.position, Point::new(500.0, 350.0));

    // Same state, same output
    let t = ticket(&s.resize()).unwrap();
    assert_eq!(s.frame(t, 100.0).unwrap(), placements.as_slice());
}

#[test]
fn hovering_a_builtin_shows_its_tooltip() {
    let mut s = session(PageParams::default());
    // "Build isolation" at (0.48, 0.30)
    let over = Point::new(100.0 + 0.48 * 800.0, 50.0 + 0.30 * 600.0);
    let fx = s.handle(&InputEvent::PointerMove { position: over }, 0.0);
    let Some(Effect::ShowTooltip { id, anchor }) = fx.first().cloned() else {
        panic!("expected a tooltip, got {fx:?}");
    };
    assert!(approx(anchor.x, over.x) && approx(anchor.y, over.y));
    assert_eq!(s.tooltip_html(id).unwrap(), "<b>Build isolation</b>");

    let fx = s.handle(&InputEvent::pointer_move(120.0, 640.0), 1.0);
    assert_eq!(fx, vec![Effect::HideTooltip { id }]);
}

// ─── Touch ──────────────────────────────────────────────────────────────

#[test]
fn one_finger_drags_a_user_area() {
    let users = [Annotation::area(
        0.1,
        0.1,
        Size::new(0.25, 0.2),
        TypeKey::intern("area-info"),
        "Yard",
    )];
    let ParamUpdate::Set(param) = dia_core::encode(&users) else {
        panic!("non-empty list encodes");
    };
    let mut s = session(PageParams::from_pairs([("annotations", param)]));
    s.set_edit_mode(true).unwrap();

    // Area box: (180, 110) .. (380, 230)
    let touch = |x: f64, y: f64| InputEvent::touches_from_flat(&[7.0, x, y]);
    let fx = s.handle(&InputEvent::TouchStart { touches: touch(280.0, 170.0) }, 0.0);
    assert_eq!(fx, vec![Effect::CaptureGlobalPointer]);

    let fx = s.handle(&InputEvent::TouchMove { touches: touch(360.0, 230.0) }, 1.0);
    assert!(matches!(fx[0], Effect::SetElementRect { .. }));

    let fx = s.handle(&InputEvent::TouchEnd { touches: Default::default() }, 2.0);
    assert_eq!(fx[0], Effect::ReleaseGlobalPointer);
    assert!(written(&fx).is_some());

    let moved = &s.store().users()[0];
    assert!(approx(moved.x, 0.2) && approx(moved.y, 0.2));
    assert_eq!(moved.width_rel, Some(0.25));
}

#[test]
fn escape_ends_a_pan() {
    let mut s = session(PageParams::default());
    s.handle(
        &InputEvent::Wheel {
            position: Point::new(500.0, 350.0),
            delta_y: -1.0,
        },
        0.0,
    );
    // Bottom-left corner of the image has no markers
    let fx = s.handle(&InputEvent::pointer_down(110.0, 640.0), 1.0);
    assert_eq!(fx, vec![Effect::CaptureGlobalPointer]);
    let fx = s.handle(&InputEvent::key("Escape"), 2.0);
    assert_eq!(fx, vec![Effect::ReleaseGlobalPointer]);
    let fx = s.handle(&InputEvent::pointer_move(200.0, 600.0), 3.0);
    assert!(!fx.iter().any(|e| matches!(e, Effect::TransformChanged(_))));
}
