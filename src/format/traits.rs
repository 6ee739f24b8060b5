//! The export format trait and the data it reads.

use std::path::{Path, PathBuf};

use image::DynamicImage;

use crate::constants::DEFAULT_IMAGE_NAME;
use crate::format::error::FormatError;
use crate::geometry::ImageBounds;
use crate::model::{Annotation, AnnotationId, AnnotationStore, Document};
use crate::state::DisplayOptions;
use crate::validation::{validate, ValidationReport};

/// One output format. Implementations turn an [`ExportData`] snapshot into
/// bytes; the labels format can also read its own output back.
pub trait ExportFormat: Send + Sync {
    /// Registry key, also accepted by `--format`.
    fn id(&self) -> &'static str;

    fn display_name(&self) -> &'static str;

    /// Suffix appended to the image base name, e.g. `-labels.json`.
    fn suffix(&self) -> &'static str;

    /// Serialize `data` in this format.
    fn export_to_bytes(
        &self,
        data: &ExportData<'_>,
    ) -> Result<(Vec<u8>, ExportResult), FormatError>;

    /// Write the export to `path`.
    fn export(&self, data: &ExportData<'_>, path: &Path) -> Result<ExportResult, FormatError> {
        let (bytes, mut result) = self.export_to_bytes(data)?;
        std::fs::write(path, &bytes)?;
        log::info!(
            "💾 {} -> {:?} ({} boxes, {} notes)",
            self.display_name(),
            path,
            result.annotations_exported,
            result.warnings.len()
        );
        result.files_created.push(path.to_path_buf());
        Ok(result)
    }

    /// Whether [`ExportFormat::import_from_bytes`] is implemented.
    fn supports_import(&self) -> bool {
        false
    }

    /// Read annotations back from a previous export.
    fn import_from_bytes(&self, _bytes: &[u8]) -> Result<Vec<Annotation>, FormatError> {
        Err(FormatError::UnsupportedOperation(format!(
            "{} cannot be imported",
            self.display_name()
        )))
    }
}

/// Everything an exporter reads, borrowed from the session.
pub struct ExportData<'a> {
    /// Page image file name (or a default when none is loaded).
    pub image_filename: &'a str,
    pub bounds: ImageBounds,
    pub document: &'a Document,
    pub annotations: &'a AnnotationStore,
    /// Validation report computed for this export.
    pub report: ValidationReport,
    /// Decoded page, when one is loaded.
    pub image: Option<&'a DynamicImage>,
    pub display: DisplayOptions,
    /// Drawn with a heavier border in image exports.
    pub selected: Option<AnnotationId>,
}

impl<'a> ExportData<'a> {
    /// Gather export data and run the validator.
    pub fn new(
        image_filename: Option<&'a str>,
        bounds: ImageBounds,
        document: &'a Document,
        annotations: &'a AnnotationStore,
    ) -> Self {
        Self {
            image_filename: image_filename.unwrap_or(DEFAULT_IMAGE_NAME),
            bounds,
            document,
            annotations,
            report: validate(document, annotations, bounds),
            image: None,
            display: DisplayOptions::default(),
            selected: None,
        }
    }

    /// Attach the decoded page image.
    pub fn with_image(mut self, image: &'a DynamicImage) -> Self {
        self.image = Some(image);
        self
    }

    pub fn with_selected(mut self, selected: Option<AnnotationId>) -> Self {
        self.selected = selected;
        self
    }

    /// Set overlay options for image exports.
    pub fn with_display(mut self, display: DisplayOptions) -> Self {
        self.display = display;
        self
    }
}

/// Build the output file name for an export: the image name without a
/// `.png`/`.jpg`/`.jpeg` extension, plus `suffix`.
pub fn output_filename(image_filename: &str, suffix: &str) -> String {
    let lower = image_filename.to_ascii_lowercase();
    let base = [".png", ".jpg", ".jpeg"]
        .iter()
        .find(|ext| lower.ends_with(*ext))
        .map(|ext| &image_filename[..image_filename.len() - ext.len()])
        .unwrap_or(image_filename);
    let base = if base.is_empty() { "image" } else { base };
    format!("{base}{suffix}")
}

/// Outcome of one export: counts, notes and the files touched.
#[derive(Debug, Default)]
pub struct ExportResult {
    pub annotations_exported: usize,
    pub warnings: Vec<FormatWarning>,
    /// Filled in by [`ExportFormat::export`]; empty for byte exports.
    pub files_created: Vec<PathBuf>,
}

impl ExportResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_count(count: usize) -> Self {
        Self {
            annotations_exported: count,
            ..Self::default()
        }
    }

    pub fn add_warning(&mut self, warning: FormatWarning) {
        self.warnings.push(warning);
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Note attached to an export, e.g. a label COCO has no category for.
#[derive(Debug, Clone)]
pub struct FormatWarning {
    pub message: String,
    pub severity: WarningSeverity,
}

impl FormatWarning {
    pub fn new(message: impl Into<String>, severity: WarningSeverity) -> Self {
        Self {
            message: message.into(),
            severity,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(message, WarningSeverity::Info)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(message, WarningSeverity::Warning)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningSeverity {
    /// Nothing lost.
    Info,
    /// Something was skipped or substituted.
    Warning,
}
