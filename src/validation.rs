//! Consistency checks between the document and the drawn boxes.
//!
//! [`validate`] is a pure function. The session calls it after every
//! discrete change and hands the report to its observers.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::geometry::ImageBounds;
use crate::model::{schema, AnnotationStore, Document, FieldPath};

/// Outcome of a validation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// Human-readable problems, in rule order.
    pub warnings: Vec<String>,
    /// Scalar templates whose document value is null or absent.
    pub omitted: Vec<String>,
}

impl ValidationReport {
    /// True when there is nothing to report.
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty() && self.omitted.is_empty()
    }
}

const PRODUCT_NAME_FIELD: &str = "product_name";
const QUANTITY_FIELD: &str = "quantity";

/// Cross-check `document` against `store` for an image of size `bounds`.
pub fn validate(
    document: &Document,
    store: &AnnotationStore,
    bounds: ImageBounds,
) -> ValidationReport {
    let mut report = ValidationReport::default();

    let scalars: Vec<&FieldPath> = schema::templates()
        .iter()
        .filter(|t| !t.is_indexed())
        .collect();

    for template in &scalars {
        if document.read(template).is_none() {
            report.omitted.push(template.to_string());
        }
    }

    for template in &scalars {
        if document.read(template).is_none() {
            continue;
        }
        match store.count_label(template) {
            0 => report.warnings.push(format!("{template} has 0 boxes")),
            1 => {}
            _ => report.warnings.push(format!("{template} has >1 boxes")),
        }
    }

    for ann in store.iter() {
        if !ann.bbox.is_within(bounds) {
            report.warnings.push(format!(
                "Annotation {} ({}) is out of bounds",
                ann.id, ann.label
            ));
        }
    }

    let mut products: BTreeMap<usize, usize> = BTreeMap::new();
    for ann in store.iter() {
        if let Some(i) = line_field_index(&ann.label, PRODUCT_NAME_FIELD) {
            *products.entry(i).or_default() += 1;
        }
    }
    for (i, n) in products {
        if n < 2 {
            continue;
        }
        let has_quantity = store
            .iter()
            .any(|a| line_field_index(&a.label, QUANTITY_FIELD) == Some(i));
        if !has_quantity {
            report.warnings.push(format!(
                "Line item [{i}] has {n} products annotated; consider updating 'quantity' to {n}."
            ));
        }
    }

    report.warnings.extend(document.meta_warnings());

    log::debug!(
        "Validation: {} warnings, {} omitted",
        report.warnings.len(),
        report.omitted.len()
    );
    report
}

/// Line index of `label` if it addresses `field` of a concrete record in
/// `invoice.line_items`.
fn line_field_index(label: &FieldPath, field: &str) -> Option<usize> {
    if !label.in_invoice_line_items() {
        return None;
    }
    match label {
        FieldPath::Indexed { field: inner, .. } if inner.len() == 1 && inner[0] == field => {
            label.index()
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::BBox;
    use crate::model::Annotation;
    use serde_json::json;

    const BOUNDS: ImageBounds = ImageBounds {
        width: 100,
        height: 100,
    };

    fn document() -> Document {
        Document::from_value(json!({
            "buyer": { "company_name": "ABC", "address": "X", "gstin": null },
            "seller": { "company_name": "Y", "address": "Z", "gstin": "12ABC" },
            "invoice": {
                "bill_no": "B1",
                "date": "2025-01-01",
                "line_items": [],
                "subtotal_printed": 100,
                "gst_breakdown": null,
                "round_off": null,
                "grand_total_printed": 100
            },
            "meta": { "source_pages": 1, "warnings": ["dates disagree"] }
        }))
        .unwrap()
    }

    fn add(store: &mut AnnotationStore, label: &str, bbox: BBox) {
        let ann = Annotation::new(FieldPath::parse(label).unwrap(), bbox, "#000000");
        store.add(ann).unwrap();
    }

    #[test]
    fn test_null_scalar_is_omitted_and_missing_box_warned() {
        let mut doc = document();
        doc.write(&FieldPath::parse("seller.gstin").unwrap(), json!(null))
            .unwrap();
        let report = validate(&doc, &AnnotationStore::new(), BOUNDS);

        assert!(report.omitted.contains(&"seller.gstin".to_string()));
        assert!(report
            .warnings
            .contains(&"buyer.company_name has 0 boxes".to_string()));
        assert!(!report.warnings.iter().any(|w| w.starts_with("seller.gstin")));
    }

    #[test]
    fn test_omitted_follows_class_order() {
        let report = validate(&document(), &AnnotationStore::new(), BOUNDS);
        assert_eq!(report.omitted[0], "buyer.gstin");
        assert!(report
            .omitted
            .contains(&"invoice.gst_breakdown.cgst_percent".to_string()));
        assert!(report.omitted.contains(&"invoice.round_off".to_string()));
        assert!(!report.omitted.iter().any(|o| o.contains("[i]")));
    }

    #[test]
    fn test_cardinality_warnings() {
        let mut store = AnnotationStore::new();
        add(&mut store, "buyer.company_name", BBox::new(10, 10, 20, 10));
        add(&mut store, "buyer.address", BBox::new(10, 30, 20, 10));
        add(&mut store, "buyer.address", BBox::new(10, 50, 20, 10));
        let report = validate(&document(), &store, BOUNDS);

        assert!(!report.warnings.iter().any(|w| w.starts_with("buyer.company_name")));
        assert!(report.warnings.contains(&"buyer.address has >1 boxes".to_string()));
    }

    #[test]
    fn test_out_of_bounds() {
        let mut store = AnnotationStore::new();
        add(&mut store, "invoice.date", BBox::new(90, 90, 20, 5));
        add(&mut store, "invoice.bill_no", BBox::new(0, 0, 100, 100));
        let id = store.iter().next().map(|a| a.id).unwrap();
        let report = validate(&document(), &store, BOUNDS);

        let oob: Vec<_> = report
            .warnings
            .iter()
            .filter(|w| w.ends_with("is out of bounds"))
            .collect();
        assert_eq!(oob.len(), 1);
        assert_eq!(*oob[0], format!("Annotation {id} (invoice.date) is out of bounds"));
    }

    #[test]
    fn test_product_quantity_heuristic() {
        let mut store = AnnotationStore::new();
        for _ in 0..3 {
            add(&mut store, "invoice.line_items[2].product_name", BBox::new(1, 1, 5, 5));
        }
        for _ in 0..2 {
            add(&mut store, "invoice.line_items[0].product_name", BBox::new(1, 1, 5, 5));
        }
        add(&mut store, "invoice.line_items[1].product_name", BBox::new(1, 1, 5, 5));
        let report = validate(&document(), &store, BOUNDS);

        let hints: Vec<_> = report
            .warnings
            .iter()
            .filter(|w| w.starts_with("Line item"))
            .cloned()
            .collect();
        assert_eq!(
            hints,
            vec![
                "Line item [0] has 2 products annotated; consider updating 'quantity' to 2."
                    .to_string(),
                "Line item [2] has 3 products annotated; consider updating 'quantity' to 3."
                    .to_string(),
            ]
        );

        add(&mut store, "invoice.line_items[2].quantity", BBox::new(1, 1, 5, 5));
        let report = validate(&document(), &store, BOUNDS);
        assert!(!report.warnings.iter().any(|w| w.starts_with("Line item [2]")));
    }

    #[test]
    fn test_product_heuristic_ignores_other_sequences() {
        let mut store = AnnotationStore::new();
        for _ in 0..2 {
            add(&mut store, "notes.line_items[0].product_name", BBox::new(1, 1, 5, 5));
        }
        for _ in 0..2 {
            add(&mut store, "invoice.line_items[1].product_name", BBox::new(1, 1, 5, 5));
        }
        add(&mut store, "notes.line_items[1].quantity", BBox::new(1, 1, 5, 5));
        let report = validate(&document(), &store, BOUNDS);

        let hints: Vec<_> = report
            .warnings
            .iter()
            .filter(|w| w.starts_with("Line item"))
            .collect();
        assert_eq!(
            hints,
            vec!["Line item [1] has 2 products annotated; consider updating 'quantity' to 2."]
        );
    }

    #[test]
    fn test_meta_warnings_come_last() {
        let report = validate(&document(), &AnnotationStore::new(), BOUNDS);
        assert_eq!(report.warnings.last().map(String::as_str), Some("dates disagree"));
    }

    #[test]
    fn test_report_serializes_both_lists() {
        let report = validate(&document(), &AnnotationStore::new(), BOUNDS);
        let value = serde_json::to_value(&report).unwrap();
        assert!(value["warnings"].is_array());
        assert!(value["omitted"].is_array());
    }
}
