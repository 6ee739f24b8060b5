//! The fixed invoice field schema.
//!
//! Twenty-three templates grouped into buyer, seller, invoice meta, line
//! items and totals. Template keys are the ML-facing labels; the short
//! titles are only for display.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use super::path::FieldPath;

/// Field group, each with its own display color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Group {
    Buyer,
    Seller,
    Meta,
    Line,
    Totals,
}

impl Group {
    /// Stable identifier, also used as the COCO supercategory.
    pub fn id(&self) -> &'static str {
        match self {
            Group::Buyer => "buyer",
            Group::Seller => "seller",
            Group::Meta => "meta",
            Group::Line => "line",
            Group::Totals => "totals",
        }
    }

    /// Display title of the group.
    pub fn title(&self) -> &'static str {
        match self {
            Group::Buyer => "Buyer",
            Group::Seller => "Seller",
            Group::Meta => "Invoice Meta",
            Group::Line => "Line Items",
            Group::Totals => "Totals / GST",
        }
    }

    /// Hex color used for boxes of this group.
    pub fn color(&self) -> &'static str {
        match self {
            Group::Buyer => "#2563EB",
            Group::Seller => "#EF4444",
            Group::Meta => "#10B981",
            Group::Line => "#F59E0B",
            Group::Totals => "#8B5CF6",
        }
    }

    /// All groups in sidebar order.
    pub fn all() -> &'static [Group] {
        &[
            Group::Buyer,
            Group::Seller,
            Group::Meta,
            Group::Line,
            Group::Totals,
        ]
    }

    /// Group for any label, including labels outside the schema.
    pub fn of(label: &FieldPath) -> Group {
        let key = label.template().to_string();
        if let Some(spec) = FIELDS.iter().find(|f| f.key == key) {
            return spec.group;
        }

        if label.starts_with("buyer") {
            Group::Buyer
        } else if label.starts_with("seller") {
            Group::Seller
        } else if label.is_indexed() && label.starts_with("invoice") {
            Group::Line
        } else if label.starts_with("invoice")
            && ["gst_breakdown", "subtotal", "grand_total", "round_off"]
                .iter()
                .any(|needle| key.contains(needle))
        {
            Group::Totals
        } else {
            Group::Meta
        }
    }
}

/// One schema entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    /// Template key, e.g. `invoice.line_items[i].quantity`.
    pub key: &'static str,
    /// Short display title, e.g. `Qty`.
    pub title: &'static str,
    /// Owning group.
    pub group: Group,
}

const fn field(key: &'static str, title: &'static str, group: Group) -> FieldSpec {
    FieldSpec { key, title, group }
}

/// Every template in canonical class order.
pub const FIELDS: [FieldSpec; 23] = [
    field("buyer.company_name", "Buyer Name", Group::Buyer),
    field("buyer.address", "Buyer Address", Group::Buyer),
    field("buyer.gstin", "Buyer GSTIN", Group::Buyer),
    field("seller.company_name", "Seller Name", Group::Seller),
    field("seller.address", "Seller Address", Group::Seller),
    field("seller.gstin", "Seller GSTIN", Group::Seller),
    field("invoice.bill_no", "Bill No", Group::Meta),
    field("invoice.date", "Date", Group::Meta),
    field("invoice.line_items[i].product_name", "Product Name", Group::Line),
    field("invoice.line_items[i].unit", "Unit", Group::Line),
    field("invoice.line_items[i].quantity", "Qty", Group::Line),
    field("invoice.line_items[i].unit_price", "Unit Price", Group::Line),
    field("invoice.line_items[i].line_total_printed", "Line Total", Group::Line),
    field("invoice.subtotal_printed", "Subtotal", Group::Totals),
    field("invoice.gst_breakdown.cgst_percent", "CGST %", Group::Totals),
    field("invoice.gst_breakdown.cgst_amount", "CGST Amt", Group::Totals),
    field("invoice.gst_breakdown.sgst_percent", "SGST %", Group::Totals),
    field("invoice.gst_breakdown.sgst_amount", "SGST Amt", Group::Totals),
    field("invoice.gst_breakdown.other_gst_label", "Other GST Label", Group::Totals),
    field("invoice.gst_breakdown.other_gst_percent", "Other GST %", Group::Totals),
    field("invoice.gst_breakdown.other_gst_amount", "Other GST Amt", Group::Totals),
    field("invoice.round_off", "Round Off", Group::Totals),
    field("invoice.grand_total_printed", "Grand Total", Group::Totals),
];

/// Fields of a line-item record, used when padding the sequence.
pub const LINE_ITEM_FIELDS: [&str; 6] = [
    "product_name",
    "unit",
    "quantity",
    "unit_price",
    "line_total_calculated",
    "line_total_printed",
];

/// Template keys in class order.
pub fn class_names() -> impl Iterator<Item = &'static str> {
    FIELDS.iter().map(|f| f.key)
}

/// Parsed templates in class order.
pub fn templates() -> &'static [FieldPath] {
    static TEMPLATES: OnceLock<Vec<FieldPath>> = OnceLock::new();
    TEMPLATES.get_or_init(|| {
        FIELDS
            .iter()
            .filter_map(|f| FieldPath::parse(f.key).ok())
            .collect()
    })
}

/// Look up the schema entry for a label (any index is ignored).
pub fn spec_for(label: &FieldPath) -> Option<&'static FieldSpec> {
    let key = label.template().to_string();
    FIELDS.iter().find(|f| f.key == key)
}

/// Display title for a label, falling back to the label itself.
pub fn display_title(label: &FieldPath) -> String {
    spec_for(label)
        .map(|f| f.title.to_string())
        .unwrap_or_else(|| label.to_string())
}
