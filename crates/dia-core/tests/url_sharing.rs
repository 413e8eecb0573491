//! Integration tests: store → URL parameter → fresh store.
//!
//! Exercises the sharing path end to end: user annotations are authored in
//! one store, encoded for the URL, and restored into another store built from
//! the same dataset.

use dia_core::*;
use pretty_assertions::assert_eq;

const DATASET: &str = include_str!("fixtures/landscape.json");

fn store(config: &Config) -> AnnotationStore {
    let dataset = Dataset::from_json(DATASET).unwrap();
    AnnotationStore::new(&dataset, config.max_user_annotations)
}

// ─── Round trip ─────────────────────────────────────────────────────────

#[test]
fn shared_link_restores_user_annotations() {
    let config = Config::default();
    let mut author = store(&config);
    author
        .add(
            Annotation::point(0.3, 0.4, TypeKey::intern("user-pri-1"), "Check this")
                .with_description("Line one\nLine <b>two</b>")
                .with_shape(Shape::Circle),
        )
        .unwrap();
    author
        .add(Annotation::area(
            0.0,
            0.9,
            Size::new(0.15, 0.1),
            TypeKey::intern("area-info"),
            "Corner region",
        ))
        .unwrap();

    let ParamUpdate::Set(param) = encode(author.users()) else {
        panic!("expected the parameter to be set");
    };

    let mut reader = store(&config);
    reader.load_users(decode(&param, &config));
    assert_eq!(reader.users(), author.users());
    assert_eq!(reader.builtin_count(), 5);
}

#[test]
fn clearing_all_removes_the_parameter() {
    let config = Config::default();
    let mut s = store(&config);
    s.add(Annotation::point(0.5, 0.5, TypeKey::intern("user-info"), "x"))
        .unwrap();
    s.clear();
    assert_eq!(encode(s.users()), ParamUpdate::Remove);
}

// ─── Hostile input ──────────────────────────────────────────────────────

#[test]
fn tampered_link_keeps_only_valid_entries() {
    let config = Config::from_json(r#"{"maxUserAnnotations": 2}"#).unwrap();
    let json = r#"[
        {"x": -0.1, "y": 0.5, "type": "user-info", "title": "left of image"},
        {"x": 0.2, "y": 0.5, "type": "user-info", "title": "kept 1"},
        {"x": 0.3, "y": 0.5, "type": "user-info", "title": "kept 2"},
        {"x": 0.4, "y": 0.5, "type": "user-info", "title": "over capacity"}
    ]"#;
    use base64::Engine as _;
    let raw = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(json);

    let mut s = store(&config);
    s.load_users(decode(&raw, &config));
    let titles: Vec<&str> = s.users().iter().map(|a| a.title.as_str()).collect();
    assert_eq!(titles, vec!["kept 1", "kept 2"]);
}

#[test]
fn user_numbering_follows_builtins() {
    let config = Config::default();
    let mut s = store(&config);
    s.add(Annotation::point(0.5, 0.5, TypeKey::intern("user-info"), "u"))
        .unwrap();
    let numbers: Vec<(bool, u32)> = s
        .all()
        .map(|r| (r.user_index().is_some(), r.display_index()))
        .collect();
    assert_eq!(
        numbers,
        vec![
            (false, 1),
            (false, 1),
            (false, 2),
            (false, 2),
            (false, 3),
            (true, 1)
        ]
    );
}
