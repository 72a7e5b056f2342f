//! Native field primitives.
//!
//! A [`NativeDocument`] is the engine-level view of a document: a flat list
//! of physical fields. One logical value may map to several physical fields
//! (for example a stored copy for retrieval plus a point for range queries).
//!
//! | Variant   | Searchable by          | Retrievable      |
//! |-----------|------------------------|------------------|
//! | `Keyword` | exact term             | when `stored`    |
//! | `Text`    | analyzed tokens        | when `stored`    |
//! | `Point`   | numeric range          | never            |
//! | `Stored`  | nothing                | always           |

use serde::{Deserialize, Serialize};

/// A value held by a stored-only field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StoredValue {
    /// 32-bit signed integer.
    Int(i32),
    /// 64-bit signed integer.
    Long(i64),
    /// 32-bit float.
    Float(f32),
    /// 64-bit float.
    Double(f64),
    /// UTF-8 string.
    Str(String),
    /// Opaque bytes.
    Bytes(Vec<u8>),
}

/// A numeric value indexed for range queries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointValue {
    /// 32-bit signed integer point.
    Int(i32),
    /// 64-bit signed integer point.
    Long(i64),
    /// 32-bit float point.
    Float(f32),
    /// 64-bit float point.
    Double(f64),
}

/// One physical field of a [`NativeDocument`].
#[derive(Debug, Clone, PartialEq)]
pub enum NativeField {
    /// Untokenized field, matched only by its whole value.
    Keyword {
        /// Field name.
        name: String,
        /// Exact value.
        value: String,
        /// Whether the value is retrievable from search hits.
        stored: bool,
    },
    /// Tokenized field, matched by analyzed tokens.
    Text {
        /// Field name.
        name: String,
        /// Full text.
        value: String,
        /// Whether the text is retrievable from search hits.
        stored: bool,
    },
    /// Range-queryable numeric field. Never retrievable.
    Point {
        /// Field name.
        name: String,
        /// Indexed number.
        value: PointValue,
    },
    /// Retrieval-only field. Never searchable.
    Stored {
        /// Field name.
        name: String,
        /// Stored value.
        value: StoredValue,
    },
}

impl NativeField {
    /// Creates a keyword field.
    pub fn keyword(name: impl Into<String>, value: impl Into<String>, stored: bool) -> Self {
        Self::Keyword {
            name: name.into(),
            value: value.into(),
            stored,
        }
    }

    /// Creates a tokenized text field.
    pub fn text(name: impl Into<String>, value: impl Into<String>, stored: bool) -> Self {
        Self::Text {
            name: name.into(),
            value: value.into(),
            stored,
        }
    }

    /// Creates a point field.
    pub fn point(name: impl Into<String>, value: PointValue) -> Self {
        Self::Point {
            name: name.into(),
            value,
        }
    }

    /// Creates a stored-only field.
    pub fn stored(name: impl Into<String>, value: StoredValue) -> Self {
        Self::Stored {
            name: name.into(),
            value,
        }
    }

    /// Returns the field name.
    pub fn name(&self) -> &str {
        match self {
            Self::Keyword { name, .. }
            | Self::Text { name, .. }
            | Self::Point { name, .. }
            | Self::Stored { name, .. } => name,
        }
    }

    /// Returns true if the field survives a round trip through the index.
    pub fn is_stored(&self) -> bool {
        match self {
            Self::Keyword { stored, .. } | Self::Text { stored, .. } => *stored,
            Self::Point { .. } => false,
            Self::Stored { .. } => true,
        }
    }
}

/// An ordered list of native fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NativeDocument {
    fields: Vec<NativeField>,
}

impl NativeDocument {
    /// Creates an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a field.
    pub fn add(&mut self, field: NativeField) {
        self.fields.push(field);
    }

    /// Returns all fields in insertion order.
    pub fn fields(&self) -> &[NativeField] {
        &self.fields
    }

    /// Returns the first field with the given name.
    pub fn get(&self, name: &str) -> Option<&NativeField> {
        self.fields.iter().find(|f| f.name() == name)
    }

    /// Iterates over every field with the given name.
    pub fn fields_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a NativeField> {
        self.fields.iter().filter(move |f| f.name() == name)
    }

    /// Returns the number of physical fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the document has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<NativeField> for NativeDocument {
    fn from_iter<I: IntoIterator<Item = NativeField>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for NativeDocument {
    type Item = NativeField;
    type IntoIter = std::vec::IntoIter<NativeField>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

/// An exact term on a keyword field, or a single token of a text field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Term {
    field: String,
    value: String,
}

impl Term {
    /// Creates a term.
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Returns the field name.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Returns the term value.
    pub fn value(&self) -> &str {
        &self.value
    }
}
