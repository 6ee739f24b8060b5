//! COCO JSON format implementation.
//!
//! A single-image COCO detection dataset. Categories are every scalar
//! template in class order, followed by line-item templates in the order
//! they are first used.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::format::error::FormatError;
use crate::format::traits::{ExportData, ExportFormat, ExportResult, FormatWarning};
use crate::model::{schema, FieldPath, Group};

/// COCO JSON format.
pub struct CocoFormat;

impl ExportFormat for CocoFormat {
    fn id(&self) -> &'static str {
        "coco"
    }

    fn display_name(&self) -> &'static str {
        "COCO (JSON)"
    }

    fn suffix(&self) -> &'static str {
        "-coco.json"
    }

    fn export_to_bytes(
        &self,
        data: &ExportData<'_>,
    ) -> Result<(Vec<u8>, ExportResult), FormatError> {
        let mut result = ExportResult::new();
        let mut coco = CocoDataset::new();
        let mut categories = CategoryTable::with_scalar_templates(&mut coco.categories);

        coco.images.push(CocoImage {
            id: 1,
            file_name: data.image_filename.to_string(),
            width: data.bounds.width,
            height: data.bounds.height,
        });

        for (idx, ann) in data.annotations.iter().enumerate() {
            let template = ann.template();
            if schema::spec_for(&template).is_none() {
                result.add_warning(FormatWarning::info(format!(
                    "Label '{}' is outside the schema, exported under its own category",
                    ann.label
                )));
            }
            let category_id = categories.id_for(&template, &mut coco.categories);
            let b = ann.bbox;
            coco.annotations.push(CocoAnnotation {
                id: idx as u64 + 1,
                image_id: 1,
                category_id,
                bbox: [b.x, b.y, b.w, b.h],
                area: b.area(),
                iscrowd: 0,
            });
        }

        result.annotations_exported = coco.annotations.len();
        let bytes = serde_json::to_vec_pretty(&coco)?;
        Ok((bytes, result))
    }
}

/// Name to category-id mapping that grows as new templates appear.
struct CategoryTable {
    ids: HashMap<String, u32>,
    next_id: u32,
}

impl CategoryTable {
    fn with_scalar_templates(categories: &mut Vec<CocoCategory>) -> Self {
        let mut table = Self {
            ids: HashMap::new(),
            next_id: 1,
        };
        for template in schema::templates().iter().filter(|t| !t.is_indexed()) {
            table.insert(template, categories);
        }
        table
    }

    fn id_for(&mut self, template: &FieldPath, categories: &mut Vec<CocoCategory>) -> u32 {
        match self.ids.get(&template.to_string()) {
            Some(id) => *id,
            None => self.insert(template, categories),
        }
    }

    fn insert(&mut self, template: &FieldPath, categories: &mut Vec<CocoCategory>) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        let name = template.to_string();
        categories.push(CocoCategory {
            id,
            name: name.clone(),
            supercategory: Group::of(template).id().to_string(),
        });
        self.ids.insert(name, id);
        id
    }
}

// COCO JSON structures

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CocoDataset {
    pub images: Vec<CocoImage>,
    pub annotations: Vec<CocoAnnotation>,
    pub categories: Vec<CocoCategory>,
}

impl CocoDataset {
    fn new() -> Self {
        Self {
            images: Vec::new(),
            annotations: Vec::new(),
            categories: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CocoImage {
    pub id: u64,
    pub file_name: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CocoAnnotation {
    pub id: u64,
    pub image_id: u64,
    pub category_id: u32,
    /// [x, y, width, height]
    pub bbox: [i32; 4],
    pub area: i64,
    pub iscrowd: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CocoCategory {
    pub id: u32,
    pub name: String,
    pub supercategory: String,
}
