//! Labels JSON format.
//!
//! The native export: image metadata, the class list, every annotation with
//! its bound value, and the validator's notes. It is the only format that can
//! be read back into a session.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::format::error::FormatError;
use crate::format::traits::{ExportData, ExportFormat, ExportResult};
use crate::model::{schema, Annotation, FieldPath, Group};

/// Labels JSON format.
pub struct LabelsFormat;

/// Top-level structure of a labels file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelsFile {
    pub image: LabelsImage,
    pub classes: Vec<String>,
    pub annotations: Vec<Annotation>,
    pub notes: LabelsNotes,
}

/// Page image metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelsImage {
    pub filename: String,
    pub width: u32,
    pub height: u32,
    pub pages: u32,
}

/// Validator output at export time.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LabelsNotes {
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub omitted_null_fields: Vec<String>,
}

impl LabelsFile {
    /// Assemble a labels file from export data.
    pub fn from_export(data: &ExportData<'_>) -> Self {
        Self {
            image: LabelsImage {
                filename: data.image_filename.to_string(),
                width: data.bounds.width,
                height: data.bounds.height,
                pages: data.document.source_pages(),
            },
            classes: schema::class_names().map(str::to_string).collect(),
            annotations: data.annotations.iter().cloned().collect(),
            notes: LabelsNotes {
                warnings: data.report.warnings.clone(),
                omitted_null_fields: data.report.omitted.clone(),
            },
        }
    }
}

impl LabelsFormat {
    /// Parse annotations from a labels file.
    ///
    /// Only the `annotations` list is required. Every label must parse and
    /// every bbox must have positive extents; ids and group colors that are
    /// missing are filled in.
    pub fn parse_annotations(json: &str) -> Result<Vec<Annotation>, FormatError> {
        let root: Value = serde_json::from_str(json)?;
        let Some(object) = root.as_object() else {
            return Err(FormatError::invalid_format("labels file must be a JSON object"));
        };
        let Some(entries) = object.get("annotations") else {
            return Err(FormatError::missing_field("annotations"));
        };
        let Some(entries) = entries.as_array() else {
            return Err(FormatError::invalid_format("'annotations' must be a list"));
        };

        let mut annotations = Vec::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            let Some(label) = entry.get("label").and_then(Value::as_str) else {
                return Err(FormatError::missing_field(format!("annotations[{index}].label")));
            };
            if let Err(e) = FieldPath::parse(label) {
                return Err(FormatError::invalid_label(label, e));
            }

            let mut annotation: Annotation = serde_json::from_value(entry.clone())?;
            if !annotation.bbox.is_well_formed() {
                return Err(FormatError::InvalidBox {
                    index,
                    bbox: annotation.bbox.into(),
                });
            }
            if annotation.group_color.is_empty() {
                annotation.group_color = Group::of(&annotation.label).color().to_string();
            }
            annotations.push(annotation);
        }

        log::debug!("Parsed {} annotations from labels file", annotations.len());
        Ok(annotations)
    }
}

impl ExportFormat for LabelsFormat {
    fn id(&self) -> &'static str {
        "labels"
    }

    fn display_name(&self) -> &'static str {
        "Labels (JSON)"
    }

    fn suffix(&self) -> &'static str {
        "-labels.json"
    }

    fn export_to_bytes(
        &self,
        data: &ExportData<'_>,
    ) -> Result<(Vec<u8>, ExportResult), FormatError> {
        let file = LabelsFile::from_export(data);
        let bytes = serde_json::to_vec_pretty(&file)?;
        Ok((bytes, ExportResult::with_count(file.annotations.len())))
    }

    fn supports_import(&self) -> bool {
        true
    }

    fn import_from_bytes(&self, bytes: &[u8]) -> Result<Vec<Annotation>, FormatError> {
        let json = std::str::from_utf8(bytes)
            .map_err(|e| FormatError::invalid_format(format!("labels file is not UTF-8: {e}")))?;
        Self::parse_annotations(json)
    }
}
