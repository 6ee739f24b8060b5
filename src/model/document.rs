//! The invoice record being annotated.
//!
//! The document is kept as a loosely typed JSON tree so that fields outside
//! the schema survive a load/export round trip untouched. All access goes
//! through [`FieldPath`]s: reads never fail (a miss is `None`), writes
//! create whatever containers the path needs.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use super::path::{FieldPath, LineIndex, MAX_LINE_INDEX};
use super::schema::{FIELDS, LINE_ITEM_FIELDS};

/// Errors from document construction and path writes.
#[derive(Error, Debug)]
pub enum DocumentError {
    /// The input was not valid JSON.
    #[error("invalid document JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The top level of the document must be a mapping.
    #[error("document root must be a JSON object")]
    NotAnObject,

    /// Writes need a concrete line-item index.
    #[error("cannot write through unresolved placeholder path '{path}'")]
    UnresolvedIndex {
        /// The template path that was written to
        path: String,
    },

    /// Line index past [`MAX_LINE_INDEX`]; the sequence is not grown.
    #[error("cannot write '{path}': line index exceeds {MAX_LINE_INDEX}")]
    IndexOutOfRange {
        /// The path that was written to
        path: String,
    },

    /// An intermediate value exists but is not a mapping or sequence.
    #[error("cannot write '{path}': '{segment}' holds a non-container value")]
    NotAContainer {
        /// The path that was written to
        path: String,
        /// The segment whose value blocked the write
        segment: String,
    },
}

/// The nested invoice record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    root: Value,
}

impl Default for Document {
    fn default() -> Self {
        Self {
            root: Value::Object(Map::new()),
        }
    }
}

impl Document {
    /// Wrap a JSON value. The root must be an object.
    pub fn from_value(root: Value) -> Result<Self, DocumentError> {
        if !root.is_object() {
            return Err(DocumentError::NotAnObject);
        }
        Ok(Self { root })
    }

    /// Parse a document from JSON text.
    pub fn from_json(json: &str) -> Result<Self, DocumentError> {
        let root: Value = serde_json::from_str(json)?;
        Self::from_value(root)
    }

    /// A document containing every schema field set to null, an empty
    /// line-item list and empty metadata.
    pub fn skeleton() -> Self {
        let mut doc = Self::default();
        for spec in FIELDS.iter() {
            let Ok(path) = FieldPath::parse(spec.key) else {
                continue;
            };
            if path.is_indexed() {
                continue;
            }
            // Cannot fail: every intermediate is created as a mapping
            let _ = doc.write(&path, Value::Null);
        }
        if let Some(invoice) = doc.root.get_mut("invoice").and_then(Value::as_object_mut) {
            invoice.insert("line_items".into(), Value::Array(Vec::new()));
        }
        if let Some(root) = doc.root.as_object_mut() {
            root.insert(
                "confidence_notes".into(),
                serde_json::json!({ "low_confidence_fields": [], "unparsed_text_snippets": [] }),
            );
            root.insert(
                "meta".into(),
                serde_json::json!({ "source_pages": 1, "warnings": [] }),
            );
        }
        doc
    }

    /// The underlying JSON tree.
    pub fn as_value(&self) -> &Value {
        &self.root
    }

    /// Pretty JSON, verbatim.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.root)
    }

    /// Read the value at `path`. Missing containers, out-of-range indices,
    /// explicit nulls and placeholder indices all read as `None`.
    pub fn read(&self, path: &FieldPath) -> Option<&Value> {
        let value = match path {
            FieldPath::Scalar(segments) => descend(&self.root, segments)?,
            FieldPath::Indexed {
                array,
                index,
                field,
            } => {
                let LineIndex::At(n) = index else {
                    return None;
                };
                let item = descend(&self.root, array)?.as_array()?.get(*n)?;
                descend(item, field)?
            }
        };
        (!value.is_null()).then_some(value)
    }

    /// Read by label string; unparsable labels read as `None`.
    pub fn read_str(&self, label: &str) -> Option<&Value> {
        FieldPath::parse(label).ok().and_then(|p| self.read(&p))
    }

    /// Read a value as display text: strings as-is, numbers and booleans
    /// formatted, absent values as the empty string.
    pub fn text_at(&self, path: &FieldPath) -> String {
        match self.read(path) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::Bool(b)) => b.to_string(),
            Some(other) => other.to_string(),
            None => String::new(),
        }
    }

    /// Set the value at `path`, creating intermediate mappings and growing
    /// the line-item sequence with null-filled records as needed.
    pub fn write(&mut self, path: &FieldPath, value: Value) -> Result<(), DocumentError> {
        match path {
            FieldPath::Scalar(segments) => {
                let (last, parents) = match segments.split_last() {
                    Some(split) => split,
                    None => return Ok(()),
                };
                let parent = vivify(&mut self.root, parents, path)?;
                parent.insert(last.clone(), value);
                Ok(())
            }
            FieldPath::Indexed {
                array,
                index,
                field,
            } => {
                let LineIndex::At(n) = *index else {
                    return Err(DocumentError::UnresolvedIndex {
                        path: path.to_string(),
                    });
                };
                if n > MAX_LINE_INDEX {
                    return Err(DocumentError::IndexOutOfRange {
                        path: path.to_string(),
                    });
                }
                let (seq_name, seq_parents) = match array.split_last() {
                    Some(split) => split,
                    None => return Ok(()),
                };
                let parent = vivify(&mut self.root, seq_parents, path)?;
                let slot = parent.entry(seq_name.clone()).or_insert(Value::Null);
                if slot.is_null() {
                    *slot = Value::Array(Vec::new());
                }
                let Value::Array(items) = slot else {
                    return Err(DocumentError::NotAContainer {
                        path: path.to_string(),
                        segment: seq_name.clone(),
                    });
                };
                while items.len() <= n {
                    items.push(blank_line_item());
                }

                let (last, inner) = match field.split_last() {
                    Some(split) => split,
                    None => return Ok(()),
                };
                let target = vivify(&mut items[n], inner, path)?;
                target.insert(last.clone(), value);
                Ok(())
            }
        }
    }

    /// Number of records in `invoice.line_items`.
    pub fn line_item_count(&self) -> usize {
        self.root
            .get("invoice")
            .and_then(|inv| inv.get("line_items"))
            .and_then(Value::as_array)
            .map_or(0, Vec::len)
    }

    /// Warnings recorded in the document's own `meta.warnings`, in order.
    pub fn meta_warnings(&self) -> Vec<String> {
        self.root
            .get("meta")
            .and_then(|meta| meta.get("warnings"))
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .map(|w| match w {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of source pages, defaulting to one.
    pub fn source_pages(&self) -> u32 {
        self.root
            .get("meta")
            .and_then(|meta| meta.get("source_pages"))
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(1)
    }
}

fn descend<'a>(mut value: &'a Value, segments: &[String]) -> Option<&'a Value> {
    for segment in segments {
        value = value.as_object()?.get(segment)?;
    }
    Some(value)
}

/// Walk `segments` from `value`, turning missing or null slots into empty
/// mappings, and return the mapping at the end.
fn vivify<'a>(
    mut value: &'a mut Value,
    segments: &[String],
    path: &FieldPath,
) -> Result<&'a mut Map<String, Value>, DocumentError> {
    let mut current_segment = String::new();
    for segment in segments {
        if value.is_null() {
            *value = Value::Object(Map::new());
        }
        let Value::Object(map) = value else {
            return Err(DocumentError::NotAContainer {
                path: path.to_string(),
                segment: current_segment,
            });
        };
        value = map.entry(segment.clone()).or_insert(Value::Null);
        current_segment = segment.clone();
    }
    if value.is_null() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(DocumentError::NotAContainer {
            path: path.to_string(),
            segment: current_segment,
        }),
    }
}

fn blank_line_item() -> Value {
    Value::Object(
        LINE_ITEM_FIELDS
            .iter()
            .map(|f| ((*f).to_string(), Value::Null))
            .collect(),
    )
}
