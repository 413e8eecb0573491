//! Annotation data model.
//!
//! Coordinates are **normalized**: `x` and `y` are fractions of the source
//! image's width and height, independent of zoom, pan, and viewport size.
//! Area sizes (`widthRel`, `heightRel`) use the same units so a region
//! scales with the image.
//!
//! The serialized form of [`Annotation`] is exactly the persisted URL schema:
//! `{x, y, type, title, description, shape, widthRel?, heightRel?}`.

use crate::error::DiaError;
use crate::id::TypeKey;
use kurbo::{Point, Size};
use serde::{Deserialize, Serialize};

/// Maximum title length, in characters.
pub const TITLE_MAX: usize = 50;
/// Maximum description length, in characters.
pub const DESCRIPTION_MAX: usize = 500;

/// Visual outline of a marker or area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    Circle,
    #[default]
    Rectangle,
}

impl Shape {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "circle" => Some(Shape::Circle),
            "rectangle" => Some(Shape::Rectangle),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Shape::Circle => "circle",
            Shape::Rectangle => "rectangle",
        }
    }
}

/// Marker size of a built-in annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerSize {
    Small,
    #[default]
    Normal,
}

impl MarkerSize {
    /// Multiplier applied to the base marker size.
    pub fn factor(&self) -> f64 {
        match self {
            MarkerSize::Small => 0.5,
            MarkerSize::Normal => 1.0,
        }
    }
}

/// A user-authored annotation. The only entity that is persisted.
///
/// For point annotations `(x, y)` is the marker **center**; for area
/// annotations it is the **top-left corner** of the region. Which of the two
/// applies is decided by the type's style (see [`crate::config::TypeStyle`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub x: f64,
    pub y: f64,
    #[serde(rename = "type")]
    pub kind: TypeKey,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub shape: Shape,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width_rel: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height_rel: Option<f64>,
}

impl Annotation {
    /// A point annotation at a normalized position.
    pub fn point(x: f64, y: f64, kind: TypeKey, title: &str) -> Self {
        Self {
            x,
            y,
            kind,
            title: truncate_chars(title, TITLE_MAX).to_string(),
            description: String::new(),
            shape: Shape::default(),
            width_rel: None,
            height_rel: None,
        }
    }

    /// An area annotation with its origin corner and relative size.
    pub fn area(x: f64, y: f64, size: Size, kind: TypeKey, title: &str) -> Self {
        Self {
            width_rel: Some(size.width),
            height_rel: Some(size.height),
            ..Self::point(x, y, kind, title)
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = truncate_chars(description, DESCRIPTION_MAX).to_string();
        self
    }

    pub fn with_shape(mut self, shape: Shape) -> Self {
        self.shape = shape;
        self
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Relative size, if both dimensions are present.
    pub fn area_size(&self) -> Option<Size> {
        match (self.width_rel, self.height_rel) {
            (Some(w), Some(h)) => Some(Size::new(w, h)),
            _ => None,
        }
    }

    /// Check the annotation invariants. Called before any commit to the store.
    pub fn validate(&self) -> Result<(), DiaError> {
        if !in_unit_range(self.x) || !in_unit_range(self.y) {
            return Err(DiaError::InvalidAnnotation(format!(
                "position ({}, {}) outside [0, 1]",
                self.x, self.y
            )));
        }
        let title_len = self.title.chars().count();
        if title_len > TITLE_MAX {
            return Err(DiaError::InvalidAnnotation(format!(
                "title has {title_len} characters (max {TITLE_MAX})"
            )));
        }
        let desc_len = self.description.chars().count();
        if desc_len > DESCRIPTION_MAX {
            return Err(DiaError::InvalidAnnotation(format!(
                "description has {desc_len} characters (max {DESCRIPTION_MAX})"
            )));
        }
        for rel in [self.width_rel, self.height_rel].into_iter().flatten() {
            if !(rel.is_finite() && rel > 0.0) {
                return Err(DiaError::InvalidAnnotation(format!(
                    "relative size {rel} must be positive"
                )));
            }
        }
        Ok(())
    }
}

/// Whether `v` is a finite number in `[0, 1]`.
pub fn in_unit_range(v: f64) -> bool {
    v.is_finite() && (0.0..=1.0).contains(&v)
}

/// Clamp a normalized coordinate into `[0, 1]`.
pub fn clamp_unit(v: f64) -> f64 {
    v.clamp(0.0, 1.0)
}

/// Truncate to at most `max` characters without splitting a code point.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((byte_idx, _)) => &s[..byte_idx],
        None => s,
    }
}

/// What the "place annotation" action carries into placement mode.
///
/// The draft has no position: the click that commits the placement supplies
/// it. Point annotations store the click as their center; area annotations
/// treat the click as the region's center and store the origin corner, offset
/// by half the type's default size.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacementDraft {
    pub title: String,
    pub kind: TypeKey,
    pub description: String,
    pub shape: Shape,
}

impl PlacementDraft {
    /// Build a draft from form input: title is trimmed and must be non-empty,
    /// lengths are truncated.
    pub fn new(
        title: &str,
        kind: TypeKey,
        description: &str,
        shape: Shape,
    ) -> Result<Self, DiaError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(DiaError::InvalidAnnotation("title is required".into()));
        }
        Ok(Self {
            title: truncate_chars(title, TITLE_MAX).to_string(),
            kind,
            description: truncate_chars(description, DESCRIPTION_MAX).to_string(),
            shape,
        })
    }

    /// Materialize the draft at a committed position.
    pub fn at(&self, position: Point, size: Option<Size>) -> Annotation {
        Annotation {
            x: position.x,
            y: position.y,
            kind: self.kind,
            title: self.title.clone(),
            description: self.description.clone(),
            shape: self.shape,
            width_rel: size.map(|s| s.width),
            height_rel: size.map(|s| s.height),
        }
    }
}

/// Partial update applied by [`crate::store::AnnotationStore::update`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub kind: Option<TypeKey>,
    pub position: Option<Point>,
    pub size: Option<Size>,
}

impl AnnotationPatch {
    pub fn moved_to(position: Point) -> Self {
        Self {
            position: Some(position),
            ..Default::default()
        }
    }

    pub fn resized(position: Point, size: Size) -> Self {
        Self {
            position: Some(position),
            size: Some(size),
            ..Default::default()
        }
    }

    /// Produce the patched annotation. Text fields are truncated; geometry is
    /// copied as-is so the caller can validate it.
    pub fn apply(&self, base: &Annotation) -> Annotation {
        let mut next = base.clone();
        if let Some(title) = &self.title {
            next.title = truncate_chars(title, TITLE_MAX).to_string();
        }
        if let Some(description) = &self.description {
            next.description = truncate_chars(description, DESCRIPTION_MAX).to_string();
        }
        if let Some(kind) = self.kind {
            next.kind = kind;
        }
        if let Some(p) = self.position {
            next.x = p.x;
            next.y = p.y;
        }
        if let Some(s) = self.size {
            next.width_rel = Some(s.width);
            next.height_rel = Some(s.height);
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_to_url_schema() {
        let ann = Annotation::area(
            0.25,
            0.5,
            Size::new(0.1, 0.2),
            TypeKey::intern("area-info"),
            "Ingress",
        )
        .with_shape(Shape::Circle);
        let json = serde_json::to_string(&ann).unwrap();
        assert_eq!(
            json,
            r#"{"x":0.25,"y":0.5,"type":"area-info","title":"Ingress","description":"","shape":"circle","widthRel":0.1,"heightRel":0.2}"#
        );
    }

    #[test]
    fn point_annotation_omits_area_fields() {
        let ann = Annotation::point(0.1, 0.1, TypeKey::intern("user-info"), "t");
        let json = serde_json::to_string(&ann).unwrap();
        assert!(!json.contains("widthRel"));
        assert!(ann.area_size().is_none());
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("", 0), "");
    }

    #[test]
    fn validate_rejects_out_of_range() {
        let ann = Annotation::point(1.2, 0.5, TypeKey::intern("user-info"), "t");
        assert!(matches!(ann.validate(), Err(DiaError::InvalidAnnotation(_))));

        let ann = Annotation::point(f64::NAN, 0.5, TypeKey::intern("user-info"), "t");
        assert!(ann.validate().is_err());
    }

    #[test]
    fn validate_rejects_non_positive_size() {
        let ann = Annotation::area(
            0.1,
            0.1,
            Size::new(0.0, 0.1),
            TypeKey::intern("area-info"),
            "t",
        );
        assert!(ann.validate().is_err());
    }

    #[test]
    fn draft_trims_and_truncates() {
        let long = "x".repeat(80);
        let draft =
            PlacementDraft::new("  hi  ", TypeKey::intern("user-info"), &long, Shape::Circle)
                .unwrap();
        assert_eq!(draft.title, "hi");
        assert_eq!(draft.description.len(), 80);

        let draft = PlacementDraft::new(&long, TypeKey::intern("user-info"), "", Shape::Circle)
            .unwrap();
        assert_eq!(draft.title.chars().count(), TITLE_MAX);

        assert!(PlacementDraft::new("   ", TypeKey::intern("user-info"), "", Shape::Circle).is_err());
    }

    #[test]
    fn patch_applies_only_present_fields() {
        let base = Annotation::point(0.1, 0.2, TypeKey::intern("user-info"), "old");
        let patch = AnnotationPatch {
            title: Some("new".into()),
            ..Default::default()
        };
        let next = patch.apply(&base);
        assert_eq!(next.title, "new");
        assert_eq!(next.x, 0.1);
        assert_eq!(next.kind, base.kind);
    }
}
