//! Conversion between logical documents and native engine documents.
//!
//! Lowering rules, per value and by configured type:
//!
//! | Type                        | stored + indexed     | indexed only | not indexed |
//! |-----------------------------|----------------------|--------------|-------------|
//! | keyword                     | keyword (stored)     | keyword      | stored      |
//! | text, object                | text (stored)        | text         | stored      |
//! | integer, long, float, double| stored + point       | point        | stored      |
//! | date (epoch millis)         | stored + long point  | long point   | stored      |
//! | boolean                     | stored str + keyword | keyword      | stored      |
//! | binary                      | stored bytes         | stored bytes | stored      |
//!
//! Lifting reads back every value-bearing field, skips points, and
//! deduplicates by canonical string so that a value represented by two
//! physical fields yields one logical value.

use super::{Document, FieldConfig, FieldType, FieldValue};
use crate::error::ValidationError;
use quarry_engine::{NativeDocument, NativeField, PointValue, StoredValue};
use std::collections::{HashMap, HashSet};

/// Reserved name of the identifier field.
pub const ID_FIELD: &str = "_id";
/// Field names starting with this prefix are internal and never lifted.
pub const INTERNAL_PREFIX: char = '_';

/// Stateless converter between [`Document`] and [`NativeDocument`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentConverter;

impl DocumentConverter {
    /// Lowers a document to native fields.
    ///
    /// # Errors
    ///
    /// Fails if the identifier is blank, a field name is reserved, a
    /// non-null value's field has no type, or a value cannot be coerced to
    /// its field's type. Null values are skipped.
    pub fn to_native(doc: &Document) -> Result<NativeDocument, ValidationError> {
        if doc.id().trim().is_empty() {
            return Err(ValidationError::MissingIdentifier);
        }

        let mut native = NativeDocument::new();
        native.add(NativeField::keyword(ID_FIELD, doc.id(), true));

        for (name, values, config) in doc.fields() {
            if name.starts_with(INTERNAL_PREFIX) {
                return Err(ValidationError::ReservedFieldName {
                    field: name.to_string(),
                });
            }
            for value in values.iter().filter(|v| !v.is_null()) {
                lower_value(&mut native, name, value, config)?;
            }
        }
        Ok(native)
    }

    /// Lifts native fields back to a document.
    ///
    /// # Errors
    ///
    /// Fails if the native document has no identifier.
    pub fn from_native(native: &NativeDocument) -> Result<Document, ValidationError> {
        let id = match native.get(ID_FIELD) {
            Some(NativeField::Keyword { value, .. } | NativeField::Text { value, .. }) => value,
            Some(NativeField::Stored {
                value: StoredValue::Str(value),
                ..
            }) => value,
            _ => return Err(ValidationError::MissingIdentifier),
        };
        if id.is_empty() {
            return Err(ValidationError::MissingIdentifier);
        }

        let mut groups: Vec<(&str, Vec<FieldValue>, FieldConfig)> = Vec::new();
        let mut positions: HashMap<&str, usize> = HashMap::new();

        for field in native.fields() {
            let name = field.name();
            if name.starts_with(INTERNAL_PREFIX) {
                continue;
            }
            let position = *positions.entry(name).or_insert_with(|| {
                groups.push((name, Vec::new(), infer_config(field)));
                groups.len() - 1
            });
            let group = &mut groups[position];
            if let NativeField::Point { value, .. } = field {
                // A point next to a stored copy means the field was range-indexed.
                if !group.2.is_indexed() {
                    group.2 = FieldConfig::number(point_type(*value));
                }
            }
            if let Some(value) = lift_value(field) {
                group.1.push(value);
            }
        }

        let mut doc = Document::new(id.as_str());
        for (name, values, config) in groups {
            if values.is_empty() {
                continue;
            }
            let mut seen = HashSet::new();
            let deduped: Vec<FieldValue> = values
                .into_iter()
                .filter(|v| seen.insert(v.to_string()))
                .collect();
            doc.add_fields(name, deduped, config);
        }
        Ok(doc)
    }
}

fn lower_value(
    native: &mut NativeDocument,
    name: &str,
    value: &FieldValue,
    config: FieldConfig,
) -> Result<(), ValidationError> {
    let field_type = config
        .field_type()
        .ok_or_else(|| ValidationError::MissingFieldType {
            field: name.to_string(),
        })?;

    if !config.is_indexed() {
        native.add(NativeField::stored(name, stored_only_value(value)));
        return Ok(());
    }

    let stored = config.is_stored();
    let mismatch = || ValidationError::type_mismatch(name, field_type.as_str(), value);

    match field_type {
        FieldType::Keyword => native.add(NativeField::keyword(name, value.to_string(), stored)),
        FieldType::Integer => {
            let v = value.to_int().ok_or_else(mismatch)?;
            add_numeric(native, name, stored, StoredValue::Int(v), PointValue::Int(v));
        }
        FieldType::Long => {
            let v = value.to_long().ok_or_else(mismatch)?;
            add_numeric(native, name, stored, StoredValue::Long(v), PointValue::Long(v));
        }
        FieldType::Float => {
            let v = value.to_float().ok_or_else(mismatch)?;
            add_numeric(native, name, stored, StoredValue::Float(v), PointValue::Float(v));
        }
        FieldType::Double => {
            let v = value.to_double().ok_or_else(mismatch)?;
            add_numeric(native, name, stored, StoredValue::Double(v), PointValue::Double(v));
        }
        FieldType::Date => {
            let v = value.to_timestamp_millis().ok_or_else(mismatch)?;
            add_numeric(native, name, stored, StoredValue::Long(v), PointValue::Long(v));
        }
        FieldType::Boolean => {
            let text = value.to_string();
            if stored {
                native.add(NativeField::stored(name, StoredValue::Str(text.clone())));
            }
            native.add(NativeField::keyword(name, text, false));
        }
        FieldType::Binary => {
            native.add(NativeField::stored(name, StoredValue::Bytes(value.to_bytes())));
        }
        FieldType::Text | FieldType::Object => {
            native.add(NativeField::text(name, value.to_string(), stored));
        }
    }
    Ok(())
}

fn add_numeric(
    native: &mut NativeDocument,
    name: &str,
    stored: bool,
    stored_value: StoredValue,
    point: PointValue,
) {
    if stored {
        native.add(NativeField::stored(name, stored_value));
    }
    native.add(NativeField::point(name, point));
}

fn stored_only_value(value: &FieldValue) -> StoredValue {
    match value {
        FieldValue::Integer(v) => StoredValue::Int(*v),
        FieldValue::Long(v) | FieldValue::Date(v) => StoredValue::Long(*v),
        FieldValue::Float(v) => StoredValue::Float(*v),
        FieldValue::Double(v) => StoredValue::Double(*v),
        FieldValue::Binary(bytes) => StoredValue::Bytes(bytes.clone()),
        other => StoredValue::Str(other.to_string()),
    }
}

fn lift_value(field: &NativeField) -> Option<FieldValue> {
    match field {
        NativeField::Keyword { value, .. } | NativeField::Text { value, .. } => {
            Some(FieldValue::Text(value.clone()))
        }
        NativeField::Stored { value, .. } => Some(match value {
            StoredValue::Int(v) => FieldValue::Integer(*v),
            StoredValue::Long(v) => FieldValue::Long(*v),
            StoredValue::Float(v) => FieldValue::Float(*v),
            StoredValue::Double(v) => FieldValue::Double(*v),
            StoredValue::Str(s) => FieldValue::Text(s.clone()),
            StoredValue::Bytes(b) => FieldValue::Binary(b.clone()),
        }),
        NativeField::Point { .. } => None,
    }
}

fn infer_config(field: &NativeField) -> FieldConfig {
    match field {
        NativeField::Text { stored, .. } => FieldConfig::builder()
            .field_type(FieldType::Text)
            .stored(*stored)
            .build(),
        NativeField::Keyword { stored, .. } => FieldConfig::builder()
            .field_type(FieldType::Keyword)
            .tokenized(false)
            .stored(*stored)
            .build(),
        NativeField::Point { value, .. } => FieldConfig::builder()
            .field_type(point_type(*value))
            .tokenized(false)
            .stored(false)
            .build(),
        NativeField::Stored { value, .. } => FieldConfig::stored_only(match value {
            StoredValue::Int(_) => FieldType::Integer,
            StoredValue::Long(_) => FieldType::Long,
            StoredValue::Float(_) => FieldType::Float,
            StoredValue::Double(_) => FieldType::Double,
            StoredValue::Str(_) => FieldType::Text,
            StoredValue::Bytes(_) => FieldType::Binary,
        }),
    }
}

fn point_type(value: PointValue) -> FieldType {
    match value {
        PointValue::Int(_) => FieldType::Integer,
        PointValue::Long(_) => FieldType::Long,
        PointValue::Float(_) => FieldType::Float,
        PointValue::Double(_) => FieldType::Double,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canonical(values: &[FieldValue]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn identifier_is_emitted_first() {
        let native = DocumentConverter::to_native(&Document::new("doc-1")).unwrap();
        assert_eq!(
            native.fields(),
            &[NativeField::keyword(ID_FIELD, "doc-1", true)]
        );
    }

    #[test]
    fn blank_identifier_is_rejected() {
        for id in ["", "   "] {
            assert_eq!(
                DocumentConverter::to_native(&Document::new(id)),
                Err(ValidationError::MissingIdentifier)
            );
        }
    }

    #[test]
    fn missing_identifier_is_rejected_on_lift() {
        let native: NativeDocument = vec![NativeField::text("title", "x", true)]
            .into_iter()
            .collect();
        assert_eq!(
            DocumentConverter::from_native(&native),
            Err(ValidationError::MissingIdentifier)
        );
    }

    #[test]
    fn keyword_and_text_fields() {
        let doc = Document::new("1")
            .with_keyword("category", "Electronics")
            .with_text("title", "Quick Brown Fox");
        let native = DocumentConverter::to_native(&doc).unwrap();

        assert_eq!(
            native.get("category"),
            Some(&NativeField::keyword("category", "Electronics", true))
        );
        assert_eq!(
            native.get("title"),
            Some(&NativeField::text("title", "Quick Brown Fox", true))
        );
    }

    #[test]
    fn stored_numbers_emit_two_fields() {
        let doc = Document::new("1").with_long("price", 100);
        let native = DocumentConverter::to_native(&doc).unwrap();
        let price: Vec<&NativeField> = native.fields_named("price").collect();
        assert_eq!(
            price,
            vec![
                &NativeField::stored("price", StoredValue::Long(100)),
                &NativeField::point("price", PointValue::Long(100)),
            ]
        );

        let back = DocumentConverter::from_native(&native).unwrap();
        assert_eq!(back.values("price"), &[FieldValue::Long(100)]);
        assert_eq!(back.field_config("price"), FieldConfig::long());
    }

    #[test]
    fn indexed_only_numbers_emit_points() {
        let config = FieldConfig::builder()
            .field_type(FieldType::Integer)
            .stored(false)
            .build();
        let doc = Document::new("1").with_field("rank", 3, config);
        let native = DocumentConverter::to_native(&doc).unwrap();
        assert_eq!(
            native.fields_named("rank").collect::<Vec<_>>(),
            vec![&NativeField::point("rank", PointValue::Int(3))]
        );
        // Points carry no retrievable value.
        assert!(!DocumentConverter::from_native(&native)
            .unwrap()
            .has_field("rank"));
    }

    #[test]
    fn unindexed_fields_are_stored_only() {
        let doc = Document::new("1").with_field(
            "views",
            7i64,
            FieldConfig::stored_only(FieldType::Long),
        );
        let native = DocumentConverter::to_native(&doc).unwrap();
        assert_eq!(
            native.fields_named("views").collect::<Vec<_>>(),
            vec![&NativeField::stored("views", StoredValue::Long(7))]
        );
    }

    #[test]
    fn booleans_are_stored_as_strings() {
        let doc = Document::new("1").with_boolean("active", true);
        let native = DocumentConverter::to_native(&doc).unwrap();
        assert_eq!(
            native.fields_named("active").collect::<Vec<_>>(),
            vec![
                &NativeField::stored("active", StoredValue::Str("true".into())),
                &NativeField::keyword("active", "true", false),
            ]
        );
        let back = DocumentConverter::from_native(&native).unwrap();
        assert_eq!(back.values("active"), &[FieldValue::from("true")]);
    }

    #[test]
    fn binary_is_never_indexed() {
        let doc = Document::new("1").with_field("blob", vec![1u8, 2, 3], FieldConfig::text());
        let doc = doc.with_field("blob", vec![4u8], FieldConfig::builder().field_type(FieldType::Binary).build());
        let native = DocumentConverter::to_native(&doc).unwrap();
        assert!(native
            .fields_named("blob")
            .all(|f| matches!(f, NativeField::Stored { value: StoredValue::Bytes(_), .. })));
    }

    #[test]
    fn dates_are_epoch_millis() {
        let doc = Document::new("1").with_field("at", FieldValue::Date(1_700_000_000_000), FieldConfig::date());
        let native = DocumentConverter::to_native(&doc).unwrap();
        assert!(native
            .fields_named("at")
            .any(|f| *f == NativeField::point("at", PointValue::Long(1_700_000_000_000))));
    }

    #[test]
    fn nulls_are_skipped() {
        let mut doc = Document::new("1");
        doc.add_field("maybe", None::<i64>, FieldConfig::long());
        doc.add_field("untyped", FieldValue::Null, FieldConfig::builder().build());
        let native = DocumentConverter::to_native(&doc).unwrap();
        assert_eq!(native.len(), 1);
    }

    #[test]
    fn missing_type_is_rejected() {
        let mut doc = Document::new("1");
        doc.add_field("raw", "x", FieldConfig::builder().build());
        assert_eq!(
            DocumentConverter::to_native(&doc),
            Err(ValidationError::MissingFieldType {
                field: "raw".into()
            })
        );
    }

    #[test]
    fn reserved_field_names_are_rejected() {
        let hijack = Document::new("1").with_keyword(ID_FIELD, "2");
        assert_eq!(
            DocumentConverter::to_native(&hijack),
            Err(ValidationError::ReservedFieldName {
                field: ID_FIELD.into()
            })
        );
        let internal = Document::new("1").with_long("_version", 3);
        assert!(matches!(
            DocumentConverter::to_native(&internal),
            Err(ValidationError::ReservedFieldName { .. })
        ));
    }

    #[test]
    fn uncoercible_values_are_rejected() {
        let doc = Document::new("1").with_field("price", "abc", FieldConfig::long());
        assert!(matches!(
            DocumentConverter::to_native(&doc),
            Err(ValidationError::TypeMismatch { expected: "long", .. })
        ));
        let ok = Document::new("1").with_field("price", "125", FieldConfig::long());
        assert!(DocumentConverter::to_native(&ok).is_ok());
    }

    #[test]
    fn duplicate_representations_collapse() {
        let native: NativeDocument = vec![
            NativeField::keyword(ID_FIELD, "1", true),
            NativeField::keyword("category", "Tech", false),
            NativeField::stored("category", StoredValue::Str("Tech".into())),
        ]
        .into_iter()
        .collect();

        let doc = DocumentConverter::from_native(&native).unwrap();
        assert_eq!(doc.values("category"), &[FieldValue::from("Tech")]);
        assert_eq!(
            doc.field_config("category").field_type(),
            Some(FieldType::Keyword)
        );
    }

    #[test]
    fn internal_fields_are_hidden() {
        let native: NativeDocument = vec![
            NativeField::keyword(ID_FIELD, "1", true),
            NativeField::keyword("_internal", "secret", true),
            NativeField::stored("_version", StoredValue::Long(3)),
            NativeField::text("title", "visible", true),
        ]
        .into_iter()
        .collect();

        let doc = DocumentConverter::from_native(&native).unwrap();
        assert_eq!(doc.field_names().collect::<Vec<_>>(), vec!["title"]);
    }

    #[test]
    fn multi_values_keep_order_and_dedup() {
        let doc = Document::new("1").with_field("tags", "b", FieldConfig::keyword());
        let mut doc = doc;
        doc.add_fields("tags", ["a", "b", "c"], FieldConfig::keyword());

        let back = DocumentConverter::from_native(&DocumentConverter::to_native(&doc).unwrap()).unwrap();
        assert_eq!(canonical(back.values("tags")), vec!["b", "a", "c"]);
    }

    #[test]
    fn complex_document_round_trip() {
        let doc = Document::new("complex-1")
            .with_text("title", "Complex Document")
            .with_keyword("status", "published")
            .with_integer("rating", 5)
            .with_long("views", 10_000)
            .with_float("score", 4.5)
            .with_double("ratio", 0.125)
            .with_boolean("featured", false)
            .with_field("created", FieldValue::Date(1_600_000_000_000), FieldConfig::date())
            .with_binary("thumbnail", vec![0xde, 0xad, 0xbe, 0xef]);

        let back = DocumentConverter::from_native(&DocumentConverter::to_native(&doc).unwrap()).unwrap();
        assert_eq!(back.id(), "complex-1");
        assert_eq!(
            back.field_names().collect::<Vec<_>>(),
            doc.field_names().collect::<Vec<_>>()
        );
        for name in doc.field_names() {
            assert_eq!(canonical(back.values(name)), canonical(doc.values(name)), "{name}");
        }
        assert_eq!(back.values("thumbnail"), &[FieldValue::Binary(vec![0xde, 0xad, 0xbe, 0xef])]);
    }
}
