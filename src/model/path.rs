//! Dotted and indexed field paths into the invoice document.
//!
//! A label such as `invoice.line_items[2].quantity` is parsed once into a
//! [`FieldPath`] and handled structurally from then on. The only segment
//! that may carry a bracket index is `line_items`; writing `[i]` instead of
//! a number produces a template (placeholder) path.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Name of the only segment that accepts a bracket index.
pub const LINE_ITEMS_SEGMENT: &str = "line_items";

/// Text used for the index placeholder in templates.
pub const INDEX_PLACEHOLDER: &str = "i";

/// Segments leading to the invoice's line-item sequence.
pub const LINE_ITEMS_ARRAY: [&str; 2] = ["invoice", LINE_ITEMS_SEGMENT];

/// Highest line-item index a path may address.
pub const MAX_LINE_INDEX: usize = 9_999;

/// Errors produced while parsing a field path.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// The path string was empty.
    #[error("empty field path")]
    Empty,

    /// Two dots in a row, or a leading/trailing dot.
    #[error("empty segment in field path '{path}'")]
    EmptySegment {
        /// The offending path
        path: String,
    },

    /// A bracket was opened but not closed, or junk followed it.
    #[error("malformed index in segment '{segment}'")]
    MalformedIndex {
        /// The offending segment
        segment: String,
    },

    /// The index was neither a non-negative integer nor the placeholder.
    #[error("invalid index '{index}' in segment '{segment}'")]
    InvalidIndex {
        /// The offending segment
        segment: String,
        /// The text found between the brackets
        index: String,
    },

    /// The index is past [`MAX_LINE_INDEX`].
    #[error("index {index} in segment '{segment}' exceeds the limit of {MAX_LINE_INDEX}")]
    IndexTooLarge { segment: String, index: usize },

    /// A bracket index appeared on a segment other than `line_items`.
    #[error("segment '{segment}' cannot be indexed, only 'line_items' can")]
    UnexpectedIndex {
        /// The offending segment
        segment: String,
    },

    /// More than one indexed segment in a single path.
    #[error("field path '{path}' has more than one indexed segment")]
    MultipleIndices {
        /// The offending path
        path: String,
    },

    /// The indexed segment was the last one, so no field is addressed.
    #[error("field path '{path}' ends at a sequence, a field name must follow the index")]
    MissingField {
        /// The offending path
        path: String,
    },
}

/// Index carried by an indexed path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LineIndex {
    /// The `[i]` placeholder used by templates.
    Placeholder,
    /// A concrete line-item position.
    At(usize),
}

impl fmt::Display for LineIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineIndex::Placeholder => f.write_str(INDEX_PLACEHOLDER),
            LineIndex::At(n) => write!(f, "{n}"),
        }
    }
}

/// A parsed location inside the document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldPath {
    /// Plain dotted path, e.g. `seller.gstin`.
    Scalar(Vec<String>),
    /// Path through the line-items sequence, e.g. `invoice.line_items[3].unit`.
    Indexed {
        /// Segments up to and including `line_items`.
        array: Vec<String>,
        /// Position in the sequence, or the placeholder.
        index: LineIndex,
        /// Segments inside the addressed line item.
        field: Vec<String>,
    },
}

impl FieldPath {
    /// Parse a label string.
    pub fn parse(input: &str) -> Result<Self, PathError> {
        if input.is_empty() {
            return Err(PathError::Empty);
        }

        let mut head = Vec::new();
        let mut tail = Vec::new();
        let mut index = None;

        for token in input.split('.') {
            if token.is_empty() {
                return Err(PathError::EmptySegment {
                    path: input.to_string(),
                });
            }

            let (name, token_index) = split_index(token)?;
            if let Some(token_index) = token_index {
                if name != LINE_ITEMS_SEGMENT {
                    return Err(PathError::UnexpectedIndex {
                        segment: token.to_string(),
                    });
                }
                if index.is_some() {
                    return Err(PathError::MultipleIndices {
                        path: input.to_string(),
                    });
                }
                head.push(name.to_string());
                index = Some(token_index);
                continue;
            }

            if index.is_some() {
                tail.push(name.to_string());
            } else {
                head.push(name.to_string());
            }
        }

        match index {
            None => Ok(FieldPath::Scalar(head)),
            Some(_) if tail.is_empty() => Err(PathError::MissingField {
                path: input.to_string(),
            }),
            Some(index) => Ok(FieldPath::Indexed {
                array: head,
                index,
                field: tail,
            }),
        }
    }

    /// The template this path reduces to. Idempotent.
    pub fn template(&self) -> FieldPath {
        match self {
            FieldPath::Scalar(_) => self.clone(),
            FieldPath::Indexed { array, field, .. } => FieldPath::Indexed {
                array: array.clone(),
                index: LineIndex::Placeholder,
                field: field.clone(),
            },
        }
    }

    /// Replace the index of an indexed path. Scalar paths are returned unchanged.
    pub fn with_index(&self, n: usize) -> FieldPath {
        match self {
            FieldPath::Scalar(_) => self.clone(),
            FieldPath::Indexed { array, field, .. } => FieldPath::Indexed {
                array: array.clone(),
                index: LineIndex::At(n),
                field: field.clone(),
            },
        }
    }

    /// Concrete line-item index, if any.
    pub fn index(&self) -> Option<usize> {
        match self {
            FieldPath::Indexed {
                index: LineIndex::At(n),
                ..
            } => Some(*n),
            _ => None,
        }
    }

    /// Whether this path goes through the line-items sequence.
    pub fn is_indexed(&self) -> bool {
        matches!(self, FieldPath::Indexed { .. })
    }

    /// Whether this path goes through `invoice.line_items` specifically.
    pub fn in_invoice_line_items(&self) -> bool {
        match self {
            FieldPath::Indexed { array, .. } => array.iter().map(String::as_str).eq(LINE_ITEMS_ARRAY),
            FieldPath::Scalar(_) => false,
        }
    }

    /// Whether this path still carries the `[i]` placeholder.
    pub fn is_template(&self) -> bool {
        matches!(
            self,
            FieldPath::Indexed {
                index: LineIndex::Placeholder,
                ..
            }
        )
    }

    /// Last segment name (the addressed field).
    pub fn leaf(&self) -> &str {
        let segments = match self {
            FieldPath::Scalar(segments) => segments,
            FieldPath::Indexed { field, .. } => field,
        };
        segments.last().map(String::as_str).unwrap_or_default()
    }

    /// Whether the first segment equals `root`.
    pub fn starts_with(&self, root: &str) -> bool {
        let first = match self {
            FieldPath::Scalar(segments) => segments.first(),
            FieldPath::Indexed { array, .. } => array.first(),
        };
        first.is_some_and(|s| s == root)
    }
}

/// Split `name[idx]` into its name and parsed index.
fn split_index(token: &str) -> Result<(&str, Option<LineIndex>), PathError> {
    let Some(open) = token.find('[') else {
        if token.contains(']') {
            return Err(PathError::MalformedIndex {
                segment: token.to_string(),
            });
        }
        return Ok((token, None));
    };

    let name = &token[..open];
    let rest = &token[open + 1..];
    let Some(inner) = rest.strip_suffix(']') else {
        return Err(PathError::MalformedIndex {
            segment: token.to_string(),
        });
    };
    if name.is_empty() || inner.contains('[') || inner.contains(']') {
        return Err(PathError::MalformedIndex {
            segment: token.to_string(),
        });
    }

    let index = if inner == INDEX_PLACEHOLDER {
        LineIndex::Placeholder
    } else if !inner.is_empty() && inner.bytes().all(|b| b.is_ascii_digit()) {
        inner
            .parse()
            .map(LineIndex::At)
            .map_err(|_| PathError::InvalidIndex {
                segment: token.to_string(),
                index: inner.to_string(),
            })?
    } else {
        return Err(PathError::InvalidIndex {
            segment: token.to_string(),
            index: inner.to_string(),
        });
    };

    if let LineIndex::At(n) = index {
        if n > MAX_LINE_INDEX {
            return Err(PathError::IndexTooLarge {
                segment: token.to_string(),
                index: n,
            });
        }
    }

    Ok((name, Some(index)))
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldPath::Scalar(segments) => f.write_str(&segments.join(".")),
            FieldPath::Indexed {
                array,
                index,
                field,
            } => write!(f, "{}[{}].{}", array.join("."), index, field.join(".")),
        }
    }
}

impl FromStr for FieldPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldPath::parse(s)
    }
}

impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FieldPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        FieldPath::parse(&raw).map_err(serde::de::Error::custom)
    }
}
