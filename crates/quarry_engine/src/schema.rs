//! The fixed tantivy schema backing every index.
//!
//! tantivy needs a schema up front, while documents here carry arbitrary
//! field names. Every index therefore uses the same three columns and the
//! dynamic field name is folded into the term (see [`crate::encoding`]).
//! Retrievable fields travel together as one CBOR payload.

use crate::analysis::Analyzer;
use crate::encoding::{point_key, term_key};
use crate::error::{EngineError, EngineResult};
use crate::field::{NativeDocument, NativeField, PointValue, StoredValue, Term};
use serde::{Deserialize, Serialize};
use tantivy::schema::{Field, Schema, Value, STORED, STRING};
use tantivy::TantivyDocument;

/// Column holding keyword values and text tokens.
pub const TERMS_FIELD: &str = "_terms";
/// Column holding encoded numeric points.
pub const POINTS_FIELD: &str = "_points";
/// Column holding the stored-field payload.
pub const STORED_FIELD: &str = "_stored";

#[derive(Debug, Serialize, Deserialize)]
enum StoredEntry {
    Keyword { name: String, value: String },
    Text { name: String, value: String },
    Value { name: String, value: StoredValue },
}

/// Handles to the fixed columns plus the analyzer used for text.
#[derive(Debug, Clone)]
pub struct EngineSchema {
    schema: Schema,
    terms: Field,
    points: Field,
    stored: Field,
    analyzer: Analyzer,
}

impl EngineSchema {
    /// Builds the schema.
    pub fn build() -> Self {
        let mut builder = Schema::builder();
        let terms = builder.add_text_field(TERMS_FIELD, STRING);
        let points = builder.add_text_field(POINTS_FIELD, STRING);
        let stored = builder.add_bytes_field(STORED_FIELD, STORED);
        Self {
            schema: builder.build(),
            terms,
            points,
            stored,
            analyzer: Analyzer::new(),
        }
    }

    /// Returns the tantivy schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub(crate) fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    /// Builds the tantivy term for an exact match.
    pub(crate) fn term(&self, term: &Term) -> tantivy::Term {
        tantivy::Term::from_field_text(self.terms, &term_key(term.field(), term.value()))
    }

    pub(crate) fn point_bound(&self, field: &str, value: PointValue) -> String {
        point_key(field, value)
    }

    /// Lowers a native document to a tantivy document.
    pub fn to_tantivy(&self, doc: &NativeDocument) -> EngineResult<TantivyDocument> {
        let mut out = TantivyDocument::default();
        let mut stored = Vec::new();

        for field in doc.fields() {
            match field {
                NativeField::Keyword {
                    name,
                    value,
                    stored: keep,
                } => {
                    out.add_text(self.terms, term_key(name, value));
                    if *keep {
                        stored.push(StoredEntry::Keyword {
                            name: name.clone(),
                            value: value.clone(),
                        });
                    }
                }
                NativeField::Text {
                    name,
                    value,
                    stored: keep,
                } => {
                    for token in self.analyzer.tokens(value) {
                        out.add_text(self.terms, term_key(name, &token));
                    }
                    if *keep {
                        stored.push(StoredEntry::Text {
                            name: name.clone(),
                            value: value.clone(),
                        });
                    }
                }
                NativeField::Point { name, value } => {
                    out.add_text(self.points, point_key(name, *value));
                }
                NativeField::Stored { name, value } => {
                    stored.push(StoredEntry::Value {
                        name: name.clone(),
                        value: value.clone(),
                    });
                }
            }
        }

        let mut payload = Vec::new();
        ciborium::into_writer(&stored, &mut payload)
            .map_err(|e| EngineError::codec(e.to_string()))?;
        out.add_bytes(self.stored, payload);
        Ok(out)
    }

    /// Recovers the retrievable fields of a tantivy document.
    ///
    /// Only stored fields come back: unstored keywords, unstored text and
    /// points exist solely in the inverted index.
    pub fn from_tantivy(&self, doc: &TantivyDocument) -> EngineResult<NativeDocument> {
        let payload = doc
            .get_first(self.stored)
            .and_then(|v| v.as_bytes())
            .ok_or_else(|| EngineError::codec("document has no stored payload"))?;
        let entries: Vec<StoredEntry> =
            ciborium::from_reader(payload).map_err(|e| EngineError::codec(e.to_string()))?;

        Ok(entries
            .into_iter()
            .map(|entry| match entry {
                StoredEntry::Keyword { name, value } => NativeField::keyword(name, value, true),
                StoredEntry::Text { name, value } => NativeField::text(name, value, true),
                StoredEntry::Value { name, value } => NativeField::stored(name, value),
            })
            .collect())
    }
}

impl Default for EngineSchema {
    fn default() -> Self {
        Self::build()
    }
}
