//! Runtime configuration.
//!
//! Every field has a default matching the shipped page, so a config JSON only
//! needs the keys it overrides.

use crate::error::DiaError;
use crate::id::TypeKey;
use kurbo::Size;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Whether a user annotation type renders as a fixed-size marker or a
/// resizable region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationKind {
    Point,
    Area,
}

/// Style and sizing rules for one user annotation type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeStyle {
    pub annotation_type: AnnotationKind,
    /// Point markers: multiple of the base marker size.
    #[serde(default = "default_point_scale")]
    pub scale: f64,
    /// Areas: size in pixels of a freshly placed region.
    #[serde(default)]
    pub default_size: Size,
    /// Areas: resize lower bound in pixels.
    #[serde(default)]
    pub min_size: Size,
    /// Areas: resize upper bound in pixels.
    #[serde(default)]
    pub max_size: Size,
    #[serde(default)]
    pub bg: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub border: String,
}

fn default_point_scale() -> f64 {
    2.0
}

impl TypeStyle {
    pub fn is_area(&self) -> bool {
        self.annotation_type == AnnotationKind::Area
    }

    fn point(bg: &str, color: &str, border: &str) -> Self {
        Self {
            annotation_type: AnnotationKind::Point,
            scale: default_point_scale(),
            default_size: Size::ZERO,
            min_size: Size::ZERO,
            max_size: Size::ZERO,
            bg: bg.to_string(),
            color: color.to_string(),
            border: border.to_string(),
        }
    }

    fn area(bg: &str, color: &str, border: &str) -> Self {
        Self {
            annotation_type: AnnotationKind::Area,
            default_size: Size::new(120.0, 80.0),
            min_size: Size::new(40.0, 30.0),
            max_size: Size::new(600.0, 400.0),
            ..Self::point(bg, color, border)
        }
    }
}

/// Colors of a built-in marker type. Values are CSS strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerStyle {
    pub bg: String,
    pub color: String,
    pub radius: String,
    pub border: String,
}

impl MarkerStyle {
    fn new(bg: &str, color: &str, radius: &str, border: &str) -> Self {
        Self {
            bg: bg.to_string(),
            color: color.to_string(),
            radius: radius.to_string(),
            border: border.to_string(),
        }
    }
}

/// Zoom/pan limits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ZoomConfig {
    pub min: f64,
    pub max: f64,
    /// Zoom change per wheel notch.
    pub wheel_step: f64,
    /// Pinch ratio bounds, relative to the zoom at gesture start.
    pub pinch_min_ratio: f64,
    pub pinch_max_ratio: f64,
}

impl Default for ZoomConfig {
    fn default() -> Self {
        Self {
            min: 1.0,
            max: 4.0,
            wheel_step: 0.1,
            pinch_min_ratio: 0.5,
            pinch_max_ratio: 2.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub max_user_annotations: usize,
    /// Built-in marker diameter as a fraction of the displayed image width.
    pub marker_scale: f64,
    pub tooltip_min_width: f64,
    /// Gap between a tooltip and its anchor, in pixels.
    pub tooltip_gap: f64,
    pub tooltip_hide_delay_ms: u32,
    /// How long a measured bounds rectangle stays fresh.
    pub bounds_cache_ms: f64,
    /// Radius around a resize handle's corner that still grabs it.
    pub handle_hit_radius: f64,
    /// Width of the band inside an area's border that shows its tooltip.
    pub area_hover_distance: f64,
    pub zoom: ZoomConfig,
    pub allowed_html_tags: Vec<String>,
    /// Per-tag attribute allow-list for the sanitizer.
    pub html_whitelist: BTreeMap<String, Vec<String>>,
    pub user_types: BTreeMap<String, TypeStyle>,
    /// Built-in marker colors by type.
    pub type_styles: BTreeMap<String, MarkerStyle>,
}

impl Default for Config {
    fn default() -> Self {
        let palette = [
            ("pri-1", "#c00", "#fff", "50%", "orange"),
            ("pri-2", "#f60", "#fff", "50%", "orange"),
            ("pri-3", "#ff0", "#000", "50%", "orange"),
            ("info", "#0af", "#fff", "6px", "#004080"),
        ];
        let mut user_types = BTreeMap::new();
        let mut type_styles = BTreeMap::new();
        for (base, bg, color, radius, border) in palette {
            user_types.insert(format!("user-{base}"), TypeStyle::point(bg, color, border));
            user_types.insert(format!("area-{base}"), TypeStyle::area(bg, color, border));
            type_styles.insert(base.to_string(), MarkerStyle::new(bg, color, radius, border));
        }

        Self {
            max_user_annotations: 10,
            marker_scale: 0.01,
            tooltip_min_width: 380.0,
            tooltip_gap: 8.0,
            tooltip_hide_delay_ms: 100,
            bounds_cache_ms: 16.0,
            handle_hit_radius: 6.0,
            area_hover_distance: 5.0,
            zoom: ZoomConfig::default(),
            allowed_html_tags: ["br", "b", "strong", "i", "em"]
                .into_iter()
                .map(String::from)
                .collect(),
            html_whitelist: BTreeMap::new(),
            user_types,
            type_styles,
        }
    }
}

/// Older page configs name some keys differently, and keep some of them
/// under these sections.
const LEGACY_KEYS: [(&str, &str); 3] = [
    ("boundsCacheDuration", "boundsCacheMs"),
    ("tooltipHideDelay", "tooltipHideDelayMs"),
    ("minHoverDistance", "areaHoverDistance"),
];
const LEGACY_SECTIONS: [&str; 2] = ["ui", "areaAnnotationConfig"];

fn upgrade_legacy_keys(root: &mut Map<String, Value>) {
    let mut found = Vec::new();
    for (old, new) in LEGACY_KEYS {
        if let Some(v) = root.remove(old) {
            found.push((new, v));
        }
    }
    for section in LEGACY_SECTIONS {
        if let Some(Value::Object(nested)) = root.get_mut(section) {
            for (old, new) in LEGACY_KEYS {
                if let Some(v) = nested.remove(old) {
                    found.push((new, v));
                }
            }
        }
    }
    // Current names win over legacy ones; top-level legacy over nested
    for (new, v) in found {
        root.entry(new).or_insert(v);
    }
}

impl Config {
    /// Parse a JSON config, filling absent keys with defaults.
    ///
    /// Legacy key names (`boundsCacheDuration`, `ui.tooltipHideDelay`,
    /// `areaAnnotationConfig.minHoverDistance`) are accepted.
    pub fn from_json(json: &str) -> Result<Self, DiaError> {
        let mut value: Value =
            serde_json::from_str(json).map_err(|e| DiaError::Config(e.to_string()))?;
        if let Value::Object(root) = &mut value {
            upgrade_legacy_keys(root);
        }
        let config: Config =
            serde_json::from_value(value).map_err(|e| DiaError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), DiaError> {
        if self.max_user_annotations == 0 {
            return Err(DiaError::Config("maxUserAnnotations must be at least 1".into()));
        }
        let z = &self.zoom;
        if !(z.min > 0.0 && z.min <= z.max) {
            return Err(DiaError::Config(format!(
                "zoom range [{}, {}] is empty",
                z.min, z.max
            )));
        }
        if !(z.pinch_min_ratio > 0.0 && z.pinch_min_ratio <= z.pinch_max_ratio) {
            return Err(DiaError::Config("pinch ratio range is empty".into()));
        }
        for (name, style) in &self.user_types {
            if style.is_area() {
                let (min, max) = (style.min_size, style.max_size);
                if min.width > max.width || min.height > max.height {
                    return Err(DiaError::Config(format!(
                        "type {name}: minSize exceeds maxSize"
                    )));
                }
                if style.default_size.width <= 0.0 || style.default_size.height <= 0.0 {
                    return Err(DiaError::Config(format!(
                        "type {name}: defaultSize must be positive"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Style of a user annotation type, if configured.
    pub fn style(&self, kind: TypeKey) -> Option<&TypeStyle> {
        self.user_types.get(kind.as_str())
    }

    pub fn style_or_err(&self, kind: TypeKey) -> Result<&TypeStyle, DiaError> {
        self.style(kind)
            .ok_or_else(|| DiaError::UnknownType(kind.as_str().to_string()))
    }

    /// Colors for a marker of `kind`: built-in styles first, then the
    /// user type table.
    pub fn marker_style(&self, kind: TypeKey) -> Option<MarkerStyle> {
        if let Some(style) = self.type_styles.get(kind.as_str()) {
            return Some(style.clone());
        }
        self.style(kind).map(|s| MarkerStyle {
            bg: s.bg.clone(),
            color: s.color.clone(),
            radius: String::new(),
            border: s.border.clone(),
        })
    }

    pub fn is_area(&self, kind: TypeKey) -> bool {
        self.style(kind).is_some_and(TypeStyle::is_area)
    }

    /// Configured type keys for one authoring mode, in key order.
    pub fn types_of(&self, kind: AnnotationKind) -> Vec<TypeKey> {
        self.user_types
            .iter()
            .filter(|(_, s)| s.annotation_type == kind)
            .map(|(name, _)| TypeKey::intern(name))
            .collect()
    }
}
