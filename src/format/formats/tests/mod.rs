//! Unit tests for export format implementations.


use serde_json::json;

use crate::geometry::{BBox, ImageBounds};
use crate::model::{Annotation, AnnotationStore, Document, FieldPath, Group};

pub(super) const BOUNDS: ImageBounds = ImageBounds {
    width: 200,
    height: 300,
};

/// A small invoice with one line item and a null GSTIN.
pub(super) fn sample_document() -> Document {
    Document::from_value(json!({
        "buyer": { "company_name": "ABC Traders", "address": "Main Rd", "gstin": null },
        "seller": { "company_name": "XYZ Mills", "address": "Ring Rd", "gstin": "29ABCDE1234F1Z5" },
        "invoice": {
            "bill_no": "INV-7",
            "date": "2025-03-01",
            "line_items": [
                { "product_name": "Rice", "unit": "kg", "quantity": 10,
                  "unit_price": 50, "line_total_calculated": 500, "line_total_printed": 500 }
            ],
            "subtotal_printed": 500,
            "grand_total_printed": 525
        },
        "meta": { "source_pages": 2, "warnings": ["total mismatch"] }
    }))
    .unwrap()
}

pub(super) fn annotation(label: &str, bbox: BBox) -> Annotation {
    let path = FieldPath::parse(label).unwrap();
    let color = Group::of(&path).color();
    Annotation::new(path, bbox, color)
}

/// Store with a scalar box, two line-item boxes and a duplicate scalar.
pub(super) fn sample_store() -> AnnotationStore {
    let mut store = AnnotationStore::new();
    for (label, bbox) in [
        ("buyer.company_name", BBox::new(10, 10, 80, 12)),
        ("invoice.line_items[0].product_name", BBox::new(10, 100, 60, 10)),
        ("invoice.line_items[0].quantity", BBox::new(80, 100, 20, 10)),
        ("invoice.line_items[1].product_name", BBox::new(10, 120, 60, 10)),
        ("buyer.company_name", BBox::new(10, 30, 80, 12)),
    ] {
        store.add(annotation(label, bbox).with_value("v")).unwrap();
    }
    store
}
