//! Ordered storage of annotations for one page.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::annotation::{Annotation, AnnotationId};
use super::path::FieldPath;
use super::schema;
use crate::geometry::Point;

/// Errors from store mutations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// An annotation with this id is already stored.
    #[error("duplicate annotation id {0}")]
    DuplicateId(AnnotationId),
}

/// All annotations in creation order.
///
/// Order only matters for hit testing, where the most recently created box
/// wins. Cloning the store yields a fully independent copy, which is what the
/// undo history relies on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotationStore {
    annotations: Vec<Annotation>,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a list, rejecting duplicate ids.
    pub fn from_annotations(
        annotations: impl IntoIterator<Item = Annotation>,
    ) -> Result<Self, StoreError> {
        let mut store = Self::new();
        for ann in annotations {
            store.add(ann)?;
        }
        Ok(store)
    }

    /// Append an annotation and return its ID.
    pub fn add(&mut self, annotation: Annotation) -> Result<AnnotationId, StoreError> {
        if self.find(annotation.id).is_some() {
            return Err(StoreError::DuplicateId(annotation.id));
        }
        let id = annotation.id;
        self.annotations.push(annotation);
        Ok(id)
    }

    /// Remove an annotation by ID.
    pub fn remove(&mut self, id: AnnotationId) -> Option<Annotation> {
        let pos = self.annotations.iter().position(|a| a.id == id)?;
        Some(self.annotations.remove(pos))
    }

    /// Get an annotation by ID.
    pub fn find(&self, id: AnnotationId) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.id == id)
    }

    /// Get a mutable reference to an annotation by ID.
    pub fn find_mut(&mut self, id: AnnotationId) -> Option<&mut Annotation> {
        self.annotations.iter_mut().find(|a| a.id == id)
    }

    /// Topmost annotation containing the point (edges inclusive).
    pub fn hit_test(&self, point: Point) -> Option<AnnotationId> {
        self.annotations
            .iter()
            .rev()
            .find(|a| a.hit_test(point))
            .map(|a| a.id)
    }

    /// Number of annotations per template, with every schema template present.
    pub fn count_by_template(&self) -> HashMap<String, usize> {
        let mut counts: HashMap<String, usize> = schema::class_names()
            .map(|key| (key.to_string(), 0))
            .collect();
        for ann in &self.annotations {
            *counts.entry(ann.template().to_string()).or_default() += 1;
        }
        counts
    }

    /// Number of annotations whose label equals `label` exactly.
    pub fn count_label(&self, label: &FieldPath) -> usize {
        self.annotations.iter().filter(|a| &a.label == label).count()
    }

    /// Smallest line index not yet used by an annotation of `template`.
    ///
    /// Scalar templates always yield 0.
    pub fn next_index_for_template(&self, template: &FieldPath) -> usize {
        let template = template.template();
        if !template.is_indexed() {
            return 0;
        }
        let used: BTreeSet<usize> = self
            .annotations
            .iter()
            .filter(|a| a.template() == template)
            .filter_map(|a| a.label.index())
            .collect();
        (0..).find(|i| !used.contains(i)).unwrap_or_default()
    }

    /// Iterate in creation order.
    pub fn iter(&self) -> impl Iterator<Item = &Annotation> {
        self.annotations.iter()
    }

    pub fn as_slice(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    pub fn clear(&mut self) {
        self.annotations.clear();
    }
}

impl<'a> IntoIterator for &'a AnnotationStore {
    type Item = &'a Annotation;
    type IntoIter = std::slice::Iter<'a, Annotation>;

    fn into_iter(self) -> Self::IntoIter {
        self.annotations.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::BBox;

    fn ann(label: &str, bbox: BBox) -> Annotation {
        Annotation::new(FieldPath::parse(label).unwrap(), bbox, "#000000")
    }

    #[test]
    fn test_add_remove() {
        let mut store = AnnotationStore::new();
        let id1 = store.add(ann("buyer.gstin", BBox::new(10, 10, 50, 50))).unwrap();
        let id2 = store.add(ann("seller.gstin", BBox::new(100, 100, 5, 5))).unwrap();

        assert_eq!(store.len(), 2);
        assert!(store.find(id1).is_some());
        assert!(store.find(id2).is_some());

        assert!(store.remove(id1).is_some());
        assert_eq!(store.len(), 1);
        assert!(store.find(id1).is_none());
        assert!(store.remove(id1).is_none());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut store = AnnotationStore::new();
        let a = ann("buyer.gstin", BBox::new(0, 0, 5, 5));
        store.add(a.clone()).unwrap();
        assert_eq!(store.add(a.clone()), Err(StoreError::DuplicateId(a.id)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_hit_test_topmost_wins() {
        let mut store = AnnotationStore::new();
        let below = store.add(ann("buyer.address", BBox::new(0, 0, 100, 100))).unwrap();
        let above = store.add(ann("buyer.gstin", BBox::new(50, 50, 100, 100))).unwrap();

        assert_eq!(store.hit_test(Point::new(75.0, 75.0)), Some(above));
        assert_eq!(store.hit_test(Point::new(10.0, 10.0)), Some(below));
        assert_eq!(store.hit_test(Point::new(100.0, 100.0)), Some(above));
        assert_eq!(store.hit_test(Point::new(300.0, 300.0)), None);
    }

    #[test]
    fn test_count_by_template_seeded() {
        let mut store = AnnotationStore::new();
        store.add(ann("invoice.line_items[0].unit", BBox::new(0, 0, 5, 5))).unwrap();
        store.add(ann("invoice.line_items[3].unit", BBox::new(0, 0, 5, 5))).unwrap();

        let counts = store.count_by_template();
        assert_eq!(counts.len(), schema::FIELDS.len());
        assert_eq!(counts["invoice.line_items[i].unit"], 2);
        assert_eq!(counts["buyer.gstin"], 0);
    }

    #[test]
    fn test_next_index_fills_gaps() {
        let template = FieldPath::parse("invoice.line_items[i].product_name").unwrap();
        let mut store = AnnotationStore::new();
        assert_eq!(store.next_index_for_template(&template), 0);

        store.add(ann("invoice.line_items[0].product_name", BBox::new(0, 0, 5, 5))).unwrap();
        let gap = store
            .add(ann("invoice.line_items[1].product_name", BBox::new(0, 0, 5, 5)))
            .unwrap();
        store.add(ann("invoice.line_items[2].product_name", BBox::new(0, 0, 5, 5))).unwrap();
        // Other templates do not interfere
        store.add(ann("invoice.line_items[5].unit", BBox::new(0, 0, 5, 5))).unwrap();
        assert_eq!(store.next_index_for_template(&template), 3);

        store.remove(gap);
        assert_eq!(store.next_index_for_template(&template), 1);

        let scalar = FieldPath::parse("buyer.gstin").unwrap();
        assert_eq!(store.next_index_for_template(&scalar), 0);
    }

    #[test]
    fn test_clone_is_independent() {
        let mut store = AnnotationStore::new();
        let id = store.add(ann("buyer.gstin", BBox::new(0, 0, 5, 5))).unwrap();
        let snapshot = store.clone();

        if let Some(a) = store.find_mut(id) {
            a.bbox = BBox::new(9, 9, 9, 9);
            a.value = "changed".into();
        }
        assert_eq!(snapshot.find(id).map(|a| a.bbox), Some(BBox::new(0, 0, 5, 5)));
        assert_eq!(snapshot.find(id).map(|a| a.value.as_str()), Some(""));
    }

    #[test]
    fn test_count_label_exact_match() {
        let mut store = AnnotationStore::new();
        store.add(ann("invoice.line_items[1].unit", BBox::new(0, 0, 5, 5))).unwrap();
        store.add(ann("invoice.line_items[1].unit", BBox::new(0, 0, 5, 5))).unwrap();
        store.add(ann("invoice.line_items[2].unit", BBox::new(0, 0, 5, 5))).unwrap();
        let label = FieldPath::parse("invoice.line_items[1].unit").unwrap();
        assert_eq!(store.count_label(&label), 2);
    }
}
