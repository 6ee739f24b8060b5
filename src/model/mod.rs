//! Data models: field paths, the fixed schema, the invoice document and
//! the annotation store.

mod annotation;
mod document;
mod path;
pub mod schema;
mod store;

pub use annotation::{Annotation, AnnotationId, Confidence};
pub use document::{Document, DocumentError};
pub use path::{FieldPath, LineIndex, PathError};
pub use schema::{FieldSpec, Group};
pub use store::{AnnotationStore, StoreError};
