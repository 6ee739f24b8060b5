//! Export and import of annotation sessions.
//!
//! Each output file is produced by a type implementing [`ExportFormat`].
//! The formats are collected in a [`FormatRegistry`] keyed by id.
//!
//! ## Supported Formats
//!
//! - **Labels JSON**: native format, the only one that can be imported again
//! - **COCO JSON**: single-image detection dataset
//! - **Updated document**: the invoice JSON with recognized text merged in
//! - **Annotated PNG**: the page with box overlays burned in
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//!
//! use invoice_annotator::format::{ExportFormat, FormatRegistry};
//! use invoice_annotator::Session;
//!
//! let session = Session::new();
//! let registry = FormatRegistry::new();
//! if let Some(format) = registry.get("coco") {
//!     let result = format.export(&session.export_data(), Path::new("scan-coco.json"))?;
//!     println!("{} boxes written", result.annotations_exported);
//! }
//! # Ok::<(), invoice_annotator::format::FormatError>(())
//! ```

mod error;
pub mod formats;
mod registry;
mod traits;

pub use error::FormatError;
pub use registry::FormatRegistry;
pub use traits::{
    output_filename, ExportData, ExportFormat, ExportResult, FormatWarning, WarningSeverity,
};
