//! URL codec for user annotations.
//!
//! The user subset of the store travels in the `annotations` query parameter
//! as base64-encoded JSON. The payload comes from a shareable URL that may be
//! hand-edited, truncated, or stale, so decoding validates every element,
//! repairs what it can (truncation, default shape), drops what it can't, and
//! never fails: any structural problem yields an empty list.

use crate::config::Config;
use crate::model::{Annotation, DESCRIPTION_MAX, Shape, TITLE_MAX, in_unit_range, truncate_chars};
use crate::id::TypeKey;
use base64::Engine as _;
use base64::alphabet;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use serde_json::Value;
use thiserror::Error;

/// Query parameter carrying the encoded user annotations.
pub const ANNOTATIONS_PARAM: &str = "annotations";

/// Query parameter enabling coordinate picking and calibration.
pub const DEBUG_PARAM: &str = "debug";

const LENIENT: GeneralPurposeConfig = GeneralPurposeConfig::new()
    .with_decode_padding_mode(DecodePaddingMode::Indifferent)
    .with_decode_allow_trailing_bits(true);

/// Accepts what we write (URL-safe, unpadded) as well as hand-made links.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, LENIENT);
const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, LENIENT);

/// What to do with the `annotations` parameter after a store mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamUpdate {
    Set(String),
    /// The user list is empty: delete the parameter rather than write `annotations=`.
    Remove,
    /// Encoding failed; leave the URL as it is.
    Unchanged,
}

/// Why a payload could not be read. Only logged, never surfaced.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("payload is not UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("payload is not a JSON array")]
    NotArray,
}

/// Encode the user annotations for the URL.
pub fn encode(users: &[Annotation]) -> ParamUpdate {
    if users.is_empty() {
        return ParamUpdate::Remove;
    }
    match serde_json::to_string(users) {
        Ok(json) => ParamUpdate::Set(URL_SAFE_NO_PAD.encode(json.as_bytes())),
        Err(e) => {
            log::error!("failed to encode user annotations: {e}");
            ParamUpdate::Unchanged
        }
    }
}

/// Decode and validate a raw `annotations` parameter value.
///
/// Invalid elements are dropped, overlong text is truncated, and the result
/// is capped at `config.max_user_annotations`.
pub fn decode(raw: &str, config: &Config) -> Vec<Annotation> {
    let items = match decode_payload(raw) {
        Ok(items) => items,
        Err(e) => {
            log::warn!("ignoring `{ANNOTATIONS_PARAM}` parameter: {e}");
            return Vec::new();
        }
    };

    let total = items.len();
    let valid: Vec<Annotation> = items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| match read_entry(item, config) {
            Ok(ann) => Some(ann),
            Err(reason) => {
                log::warn!("dropping shared annotation {i}: {reason}");
                None
            }
        })
        .take(config.max_user_annotations)
        .collect();

    if valid.len() < total {
        log::debug!("decoded {} of {total} shared annotations", valid.len());
    }
    valid
}

/// Strict decoding of the envelope: base64 → UTF-8 → JSON array.
pub fn decode_payload(raw: &str) -> Result<Vec<Value>, DecodeError> {
    // Form decoding turns `+` into a space
    let cleaned: String = raw
        .trim()
        .chars()
        .map(|c| if c == ' ' { '+' } else { c })
        .collect();

    let engine = if cleaned.contains(['-', '_']) {
        &URL_SAFE_LENIENT
    } else {
        &STANDARD_LENIENT
    };
    let bytes = engine.decode(cleaned.as_bytes())?;
    let json = String::from_utf8(bytes)?;
    match serde_json::from_str::<Value>(&json)? {
        Value::Array(items) => Ok(items),
        _ => Err(DecodeError::NotArray),
    }
}

fn read_entry(item: &Value, config: &Config) -> Result<Annotation, &'static str> {
    let obj = item.as_object().ok_or("not an object")?;

    let x = obj.get("x").and_then(Value::as_f64).ok_or("`x` is not a number")?;
    let y = obj.get("y").and_then(Value::as_f64).ok_or("`y` is not a number")?;
    if !in_unit_range(x) || !in_unit_range(y) {
        return Err("position outside [0, 1]");
    }

    let kind = obj
        .get("type")
        .and_then(Value::as_str)
        .ok_or("`type` is not a string")?;
    let kind = TypeKey::intern(kind);
    if config.style(kind).is_none() {
        return Err("unknown annotation type");
    }

    let title = obj
        .get("title")
        .and_then(Value::as_str)
        .ok_or("`title` is not a string")?;
    let description = obj
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or_default();

    let shape = obj
        .get("shape")
        .and_then(Value::as_str)
        .and_then(Shape::parse)
        .unwrap_or_default();

    Ok(Annotation {
        x,
        y,
        kind,
        title: truncate_chars(title, TITLE_MAX).to_string(),
        description: truncate_chars(description, DESCRIPTION_MAX).to_string(),
        shape,
        width_rel: positive(obj.get("widthRel")),
        height_rel: positive(obj.get("heightRel")),
    })
}

fn positive(v: Option<&Value>) -> Option<f64> {
    v.and_then(Value::as_f64).filter(|v| v.is_finite() && *v > 0.0)
}
