//! Static content dataset: legend, separators, and built-in markers.
//!
//! The dataset is an ordered JSON array. Entries are classified by shape:
//! `type: "separator"` is a list heading, an entry without `x`/`y` is a legend
//! item, and anything with numeric `x` and `y` is a positioned marker.

use crate::coords::Calibration;
use crate::error::DiaError;
use crate::id::TypeKey;
use crate::model::MarkerSize;
use kurbo::Point;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An immutable marker defined by the dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuiltinAnnotation {
    pub x: f64,
    pub y: f64,
    #[serde(rename = "type")]
    pub kind: TypeKey,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub size: MarkerSize,
}

impl BuiltinAnnotation {
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DatasetEntry {
    Separator { title: String },
    Legend {
        kind: TypeKey,
        title: String,
        description: String,
    },
    Marker(BuiltinAnnotation),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    entries: Vec<DatasetEntry>,
}

impl Dataset {
    pub fn new(entries: Vec<DatasetEntry>) -> Self {
        Self { entries }
    }

    /// Parse the dataset JSON. Descriptions are de-indented.
    pub fn from_json(json: &str) -> Result<Self, DiaError> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| DiaError::Config(format!("dataset: {e}")))?;
        let Value::Array(items) = value else {
            return Err(DiaError::Config("dataset must be a JSON array".into()));
        };

        let mut entries = Vec::with_capacity(items.len());
        for (i, item) in items.into_iter().enumerate() {
            let Value::Object(obj) = item else {
                log::warn!("dataset entry {i} is not an object; skipped");
                continue;
            };
            match classify(obj) {
                Ok(entry) => entries.push(entry),
                Err(e) => log::warn!("dataset entry {i} skipped: {e}"),
            }
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[DatasetEntry] {
        &self.entries
    }

    /// Positioned markers in dataset order.
    pub fn markers(&self) -> impl Iterator<Item = &BuiltinAnnotation> {
        self.entries.iter().filter_map(|e| match e {
            DatasetEntry::Marker(m) => Some(m),
            _ => None,
        })
    }

    /// Display numbers for [`Dataset::markers`], in the same order.
    ///
    /// `info` markers and all other types are numbered by separate counters.
    pub fn display_indices(&self) -> Vec<u32> {
        let mut info = 0;
        let mut other = 0;
        self.markers()
            .map(|m| {
                let counter = if m.kind.is_info() {
                    &mut info
                } else {
                    &mut other
                };
                *counter += 1;
                *counter
            })
            .collect()
    }

    /// Markers with calibration multipliers baked in, rounded to 4 decimals.
    /// Used by the debug export to write tuned coordinates back to the dataset.
    pub fn export_calibrated(&self, calibration: &Calibration) -> Value {
        let items = self
            .entries
            .iter()
            .map(|entry| match entry {
                DatasetEntry::Separator { title } => {
                    serde_json::json!({ "type": "separator", "title": title })
                }
                DatasetEntry::Legend {
                    kind,
                    title,
                    description,
                } => serde_json::json!({
                    "type": kind.as_str(),
                    "title": title,
                    "description": description,
                }),
                DatasetEntry::Marker(m) => {
                    let mut obj = Map::new();
                    obj.insert("x".into(), round4(m.x * calibration.x).into());
                    obj.insert("y".into(), round4(m.y * calibration.y).into());
                    obj.insert("type".into(), m.kind.as_str().into());
                    obj.insert("title".into(), m.title.clone().into());
                    obj.insert("description".into(), m.description.clone().into());
                    if m.size == MarkerSize::Small {
                        obj.insert("size".into(), "small".into());
                    }
                    Value::Object(obj)
                }
            })
            .collect();
        Value::Array(items)
    }
}

fn classify(mut obj: Map<String, Value>) -> Result<DatasetEntry, String> {
    let kind = obj
        .get("type")
        .and_then(Value::as_str)
        .ok_or("missing string `type`")?
        .to_string();
    let title = obj
        .get("title")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    if kind == "separator" {
        return Ok(DatasetEntry::Separator { title });
    }

    let has_position = obj.contains_key("x") && obj.contains_key("y");
    if !has_position {
        let description = obj
            .get("description")
            .and_then(Value::as_str)
            .map(dedent)
            .unwrap_or_default();
        return Ok(DatasetEntry::Legend {
            kind: TypeKey::intern(&kind),
            title,
            description,
        });
    }

    if let Some(Value::String(desc)) = obj.get_mut("description") {
        *desc = dedent(desc);
    }
    let marker: BuiltinAnnotation =
        serde_json::from_value(Value::Object(obj)).map_err(|e| e.to_string())?;
    if !(marker.x.is_finite() && marker.y.is_finite()) {
        return Err("non-finite marker position".into());
    }
    Ok(DatasetEntry::Marker(marker))
}

/// Strip the common leading indentation of a multi-line string, drop a
/// leading blank line and trailing whitespace.
pub fn dedent(s: &str) -> String {
    let body = s.trim_end();
    let body = match body.find('\n') {
        Some(nl) if body[..nl].trim().is_empty() => &body[nl + 1..],
        _ => body,
    };
    let indent = body
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.chars().take_while(|c| c.is_whitespace()).count())
        .min()
        .unwrap_or(0);
    body.lines()
        .map(|l| strip_leading_whitespace(l, indent))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Drop up to `n` leading whitespace chars. Counted in chars so multibyte
/// whitespace such as NBSP is never split.
fn strip_leading_whitespace(line: &str, n: usize) -> &str {
    let start = line
        .char_indices()
        .take_while(|(_, c)| c.is_whitespace())
        .nth(n)
        .map_or_else(|| line.len() - line.trim_start().len(), |(i, _)| i);
    &line[start..]
}

/// Debug coordinate picking: the dataset line for a clicked position.
pub fn pick_line(p: Point) -> String {
    format!(
        "{{ x: {:.3}, y: {:.3}, type: 'pri-3', title: 'Title', description: 'Description' }},",
        p.x, p.y
    )
}

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}
