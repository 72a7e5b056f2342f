//! Benchmark utilities.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use quarry_core::{Document, FieldConfig, IndexSettings};

/// A document with `fields` text fields of `words` words each, plus a
/// keyword, a long and a multi-valued keyword field.
pub fn wide_document(id: usize, fields: usize, words: usize) -> Document {
    let mut doc = Document::new(id.to_string())
        .with_keyword("category", if id % 3 == 0 { "tech" } else { "other" })
        .with_long("sequence", i64::try_from(id).unwrap_or(i64::MAX));
    for f in 0..fields {
        let text: Vec<String> = (0..words).map(|w| format!("w{}", (id + f + w) % 997)).collect();
        doc.add_field(format!("body_{f}"), text.join(" "), FieldConfig::text());
    }
    doc.add_fields("tags", ["a", "b", "a"], FieldConfig::keyword());
    doc
}

/// `count` documents with ids `0..count`.
pub fn generate_documents(count: usize, fields: usize, words: usize) -> Vec<Document> {
    (0..count).map(|id| wide_document(id, fields, words)).collect()
}

/// Settings with background tasks off, so timings only include the
/// benchmarked calls.
pub fn manual_settings() -> IndexSettings {
    IndexSettings::builder()
        .auto_refresh(false)
        .auto_commit(false)
        .build()
}
