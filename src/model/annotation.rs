//! A single labeled box on the page.

use serde::{Deserialize, Serialize};

use super::path::FieldPath;
use crate::geometry::{BBox, Point};

/// Unique identifier for an annotation.
pub type AnnotationId = uuid::Uuid;

/// How sure the annotator is about the bound value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    #[default]
    Exact,
    Low,
    Unsure,
}

impl Confidence {
    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::Exact => "exact",
            Confidence::Low => "low",
            Confidence::Unsure => "unsure",
        }
    }

    /// All levels in picker order.
    pub fn all() -> &'static [Confidence] {
        &[Confidence::Exact, Confidence::Low, Confidence::Unsure]
    }
}

/// A labeled box bound to a document field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    #[serde(default = "uuid::Uuid::new_v4")]
    pub id: AnnotationId,
    pub label: FieldPath,
    /// Text captured for the field (prefilled from the document, or OCR).
    #[serde(default)]
    pub value: String,
    pub bbox: BBox,
    #[serde(default)]
    pub page: u32,
    /// Display color of the label's group; filled in from the schema when
    /// a file leaves it out.
    #[serde(default)]
    pub group_color: String,
    #[serde(default)]
    pub confidence: Confidence,
}

impl Annotation {
    /// Create a fresh annotation with a new random id.
    pub fn new(label: FieldPath, bbox: BBox, group_color: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            label,
            value: String::new(),
            bbox,
            page: 0,
            group_color: group_color.into(),
            confidence: Confidence::Exact,
        }
    }

    /// Builder-style value setter.
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    /// Check if a point (image coordinates) is inside the box.
    pub fn hit_test(&self, point: Point) -> bool {
        self.bbox.contains(point)
    }

    /// The schema template this annotation's label reduces to.
    pub fn template(&self) -> FieldPath {
        self.label.template()
    }
}
