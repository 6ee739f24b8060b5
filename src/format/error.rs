//! Export and import errors.

use thiserror::Error;

use crate::model::{AnnotationId, StoreError};

/// Failure while writing or reading back an export.
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("Write failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Bad JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("PNG encoding failed: {0}")]
    Image(#[from] image::ImageError),

    /// Top-level shape is wrong (not an object, `annotations` not an array).
    #[error("Unexpected structure: {message}")]
    InvalidFormat { message: String },

    #[error("'{field}' is required")]
    MissingField { field: String },

    /// Label that is not a known field path.
    #[error("Label '{label}' rejected: {message}")]
    InvalidLabel { label: String, message: String },

    /// Box with a non-positive extent or an edge past `i32::MAX`.
    #[error("annotations[{index}] has an unusable bbox {bbox:?}")]
    InvalidBox { index: usize, bbox: [i32; 4] },

    #[error("Cannot allocate a {width}x{height} canvas")]
    Canvas { width: u32, height: u32 },

    #[error("Annotation id {0} appears more than once")]
    DuplicateId(AnnotationId),

    #[error("{0}")]
    UnsupportedOperation(String),
}

impl FormatError {
    pub fn invalid_format(message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            message: message.into(),
        }
    }

    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    pub fn invalid_label(label: impl Into<String>, message: impl ToString) -> Self {
        Self::InvalidLabel {
            label: label.into(),
            message: message.to_string(),
        }
    }
}

impl From<StoreError> for FormatError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateId(id) => FormatError::DuplicateId(id),
        }
    }
}
