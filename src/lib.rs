//! Invoice Annotator
//!
//! Bounding-box annotation of scanned invoices. Each box is bound to a field
//! of a structured invoice record, and the result is exported as labeled
//! datasets for training extraction models.

pub mod color_utils;
pub mod config;
pub mod constants;
pub mod data;
pub mod format;
pub mod geometry;
pub mod model;
pub mod ocr;
pub mod state;
pub mod undo;
pub mod validation;
pub mod viewport;

pub use config::AnnotatorConfig;
pub use model::{Annotation, AnnotationId, AnnotationStore, Document, FieldPath};
pub use state::Session;
pub use validation::{validate, ValidationReport};
