//! Property-based test generators using proptest.
//!
//! Provides strategies for documents whose fields survive conversion to
//! native fields and back.

use proptest::prelude::*;
use quarry_core::{Document, FieldConfig, FieldType, FieldValue};
use std::collections::HashSet;

/// Strategy for valid index names.
pub fn index_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z0-9][a-z0-9_-]{0,31}").expect("Invalid regex")
}

/// Strategy for non-blank document identifiers.
pub fn document_id_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Za-z0-9-]{1,24}").expect("Invalid regex")
}

/// Strategy for user field names (never internal).
pub fn field_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_]{0,11}").expect("Invalid regex")
}

/// Field types whose values round-trip losslessly.
pub fn field_type_strategy() -> impl Strategy<Value = FieldType> {
    prop_oneof![
        Just(FieldType::Text),
        Just(FieldType::Keyword),
        Just(FieldType::Integer),
        Just(FieldType::Long),
        Just(FieldType::Float),
        Just(FieldType::Double),
        Just(FieldType::Boolean),
        Just(FieldType::Date),
        Just(FieldType::Binary),
    ]
}

/// Strategy for one value of `field_type`.
pub fn field_value_strategy(field_type: FieldType) -> BoxedStrategy<FieldValue> {
    match field_type {
        FieldType::Text | FieldType::Keyword | FieldType::Object => {
            prop::string::string_regex("[a-zA-Z0-9 ]{1,16}")
                .expect("Invalid regex")
                .prop_map(FieldValue::Text)
                .boxed()
        }
        FieldType::Integer => any::<i32>().prop_map(FieldValue::Integer).boxed(),
        FieldType::Long => any::<i64>().prop_map(FieldValue::Long).boxed(),
        FieldType::Float => (-1.0e6f32..1.0e6).prop_map(FieldValue::Float).boxed(),
        FieldType::Double => (-1.0e12f64..1.0e12).prop_map(FieldValue::Double).boxed(),
        FieldType::Boolean => any::<bool>().prop_map(FieldValue::Boolean).boxed(),
        FieldType::Date => (0i64..4_102_444_800_000).prop_map(FieldValue::Date).boxed(),
        FieldType::Binary => prop::collection::vec(any::<u8>(), 0..32)
            .prop_map(FieldValue::Binary)
            .boxed(),
    }
}

/// Strategy for a stored field: its type and one to four values, with
/// repeats allowed so deduplication is exercised.
pub fn typed_values_strategy() -> impl Strategy<Value = (FieldType, Vec<FieldValue>)> {
    field_type_strategy().prop_flat_map(|field_type| {
        (
            Just(field_type),
            prop::collection::vec(field_value_strategy(field_type), 1..4).prop_map(|mut values| {
                if values.len() > 1 {
                    let first = values[0].clone();
                    values.push(first);
                }
                values
            }),
        )
    })
}

/// The configuration the generators use for `field_type`: stored and, except
/// for binary, indexed.
pub fn stored_config(field_type: FieldType) -> FieldConfig {
    match field_type {
        FieldType::Text => FieldConfig::text(),
        FieldType::Keyword => FieldConfig::keyword(),
        FieldType::Boolean => FieldConfig::boolean(),
        FieldType::Date => FieldConfig::date(),
        FieldType::Binary => FieldConfig::binary(),
        FieldType::Object => FieldConfig::object(),
        numeric => FieldConfig::number(numeric),
    }
}

/// Strategy for documents with up to six distinct stored fields.
pub fn document_strategy() -> impl Strategy<Value = Document> {
    (
        document_id_strategy(),
        prop::collection::vec((field_name_strategy(), typed_values_strategy()), 0..6),
    )
        .prop_map(|(id, fields)| {
            let mut doc = Document::new(id);
            let mut names = HashSet::new();
            for (name, (field_type, values)) in fields {
                if names.insert(name.clone()) {
                    doc.add_fields(name, values, stored_config(field_type));
                }
            }
            doc
        })
}

/// Each field's values in canonical string form, with nulls dropped and
/// repeats collapsed in first-seen order.
///
/// Two documents that round-trip correctly have equal canonical fields.
pub fn canonical_fields(doc: &Document) -> Vec<(String, Vec<String>)> {
    doc.fields()
        .filter_map(|(name, values, _)| {
            let mut seen = HashSet::new();
            let canonical: Vec<String> = values
                .iter()
                .filter(|v| !v.is_null())
                .map(ToString::to_string)
                .filter(|s| seen.insert(s.clone()))
                .collect();
            (!canonical.is_empty()).then(|| (name.to_string(), canonical))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarry_core::validate_index_name;

    proptest! {
        #[test]
        fn generated_index_names_are_valid(name in index_name_strategy()) {
            prop_assert!(validate_index_name(&name).is_ok());
        }

        #[test]
        fn generated_documents_are_valid(doc in document_strategy()) {
            prop_assert!(doc.is_valid());
            prop_assert!(doc.field_names().all(|n| !n.starts_with('_')));
        }
    }

    #[test]
    fn canonical_fields_collapse_repeats() {
        let mut doc = Document::new("1");
        doc.add_fields("tags", ["b", "a", "b"], FieldConfig::keyword());
        assert_eq!(
            canonical_fields(&doc),
            vec![("tags".to_string(), vec!["b".to_string(), "a".to_string()])]
        );
    }
}
