pub mod bounds;
pub mod codec;
pub mod config;
pub mod coords;
pub mod dataset;
pub mod error;
pub mod id;
pub mod model;
pub mod sanitize;
pub mod store;

pub use bounds::{BoundsCache, FixedBounds, Measure};
pub use codec::{ANNOTATIONS_PARAM, ParamUpdate, decode, encode};
pub use config::{AnnotationKind, Config, MarkerStyle, TypeStyle, ZoomConfig};
pub use coords::{Bounds, Calibration, Transform};
pub use dataset::{BuiltinAnnotation, Dataset, DatasetEntry};
pub use error::DiaError;
pub use id::{AnnotationId, TypeKey};
pub use model::*;
pub use sanitize::{AllowList, Sanitizer};
pub use store::{AnnotationRef, AnnotationStore};

// Re-export kurbo geometry so downstream crates share one set of types
pub use kurbo::{Point, Rect, Size, Vec2};
