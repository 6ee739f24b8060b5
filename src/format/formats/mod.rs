//! Export format implementations.

mod annotated;
mod coco;
mod document;
mod labels;

#[cfg(test)]
mod tests;

pub use annotated::{
    AnnotatedImageFormat, BLANK_BACKGROUND, FILL_ALPHA, PILL_BACKGROUND, label_font,
};
pub use coco::{CocoAnnotation, CocoCategory, CocoDataset, CocoFormat, CocoImage};
pub use document::DocumentFormat;
pub use labels::{LabelsFile, LabelsFormat, LabelsImage, LabelsNotes};
