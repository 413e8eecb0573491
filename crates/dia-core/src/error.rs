//! Error type shared by every Dia crate.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DiaError {
    #[error("annotation index {index} out of range (have {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Maximum {max} user annotations allowed.")]
    CapacityExceeded { max: usize },

    #[error("unknown annotation type: {0}")]
    UnknownType(String),

    #[error("invalid annotation: {0}")]
    InvalidAnnotation(String),

    #[error("image bounds are not measurable")]
    InvalidBounds,

    #[error("cannot change edit mode while a gesture is active")]
    GestureInProgress,

    #[error("config error: {0}")]
    Config(String),
}

impl DiaError {
    /// Whether this error should be shown to the user rather than only logged.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            DiaError::CapacityExceeded { .. } | DiaError::InvalidAnnotation(_)
        )
    }
}
