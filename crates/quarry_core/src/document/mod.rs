//! Logical documents.
//!
//! A [`Document`] is an identifier plus an ordered bag of multi-valued
//! fields. Each field name carries one [`FieldConfig`]; adding values to an
//! existing field appends them and replaces its configuration.
//!
//! ```rust
//! use quarry_core::{Document, FieldConfig};
//!
//! let doc = Document::new("article-1")
//!     .with_text("title", "Hello world")
//!     .with_keyword("category", "tech")
//!     .with_long("views", 42)
//!     .with_field("tags", "rust", FieldConfig::keyword())
//!     .with_field("tags", "search", FieldConfig::keyword());
//!
//! assert!(doc.is_valid());
//! assert_eq!(doc.values("tags").len(), 2);
//! ```

mod config;
mod converter;
mod value;

pub use config::{FieldConfig, FieldConfigBuilder, FieldType};
pub use converter::{DocumentConverter, ID_FIELD, INTERNAL_PREFIX};
pub use value::{millis_to_system_time, FieldValue};

use crate::error::ValidationError;
use std::collections::HashMap;
use std::time::SystemTime;

/// A document with a mandatory identifier and ordered fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    id: String,
    fields: Vec<(String, Vec<FieldValue>)>,
    configs: HashMap<String, FieldConfig>,
}

impl Document {
    /// Creates an empty document.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Creates an empty document with a random UUID identifier.
    pub fn with_generated_id() -> Self {
        Self::new(uuid::Uuid::new_v4().to_string())
    }

    /// Returns the identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Replaces the identifier.
    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    /// Appends a value using the default text configuration.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> &mut Self {
        self.add_field(name, value, FieldConfig::default())
    }

    /// Appends a value and sets the field's configuration.
    pub fn add_field(
        &mut self,
        name: impl Into<String>,
        value: impl Into<FieldValue>,
        config: FieldConfig,
    ) -> &mut Self {
        self.add_fields(name, std::iter::once(value), config)
    }

    /// Appends several values and sets the field's configuration.
    pub fn add_fields<V: Into<FieldValue>>(
        &mut self,
        name: impl Into<String>,
        values: impl IntoIterator<Item = V>,
        config: FieldConfig,
    ) -> &mut Self {
        let name = name.into();
        let values = values.into_iter().map(Into::into);
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => existing.extend(values),
            None => self.fields.push((name.clone(), values.collect())),
        }
        self.configs.insert(name, config);
        self
    }

    /// Builder form of [`add_field`](Self::add_field).
    #[must_use]
    pub fn with_field(
        mut self,
        name: impl Into<String>,
        value: impl Into<FieldValue>,
        config: FieldConfig,
    ) -> Self {
        self.add_field(name, value, config);
        self
    }

    /// Adds analyzed text.
    #[must_use]
    pub fn with_text(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.with_field(name, FieldValue::Text(value.into()), FieldConfig::text())
    }

    /// Adds an exact-match keyword.
    #[must_use]
    pub fn with_keyword(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.with_field(name, FieldValue::Text(value.into()), FieldConfig::keyword())
    }

    /// Adds a 32-bit integer.
    #[must_use]
    pub fn with_integer(self, name: impl Into<String>, value: i32) -> Self {
        self.with_field(name, value, FieldConfig::integer())
    }

    /// Adds a 64-bit integer.
    #[must_use]
    pub fn with_long(self, name: impl Into<String>, value: i64) -> Self {
        self.with_field(name, value, FieldConfig::long())
    }

    /// Adds a 32-bit float.
    #[must_use]
    pub fn with_float(self, name: impl Into<String>, value: f32) -> Self {
        self.with_field(name, value, FieldConfig::float())
    }

    /// Adds a 64-bit float.
    #[must_use]
    pub fn with_double(self, name: impl Into<String>, value: f64) -> Self {
        self.with_field(name, value, FieldConfig::double())
    }

    /// Adds a boolean.
    #[must_use]
    pub fn with_boolean(self, name: impl Into<String>, value: bool) -> Self {
        self.with_field(name, value, FieldConfig::boolean())
    }

    /// Adds a timestamp.
    #[must_use]
    pub fn with_date(self, name: impl Into<String>, value: SystemTime) -> Self {
        self.with_field(name, FieldValue::date(value), FieldConfig::date())
    }

    /// Adds stored-only bytes.
    #[must_use]
    pub fn with_binary(self, name: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.with_field(name, FieldValue::Binary(value.into()), FieldConfig::binary())
    }

    /// Returns the first value of a field.
    pub fn get_first(&self, name: &str) -> Option<&FieldValue> {
        self.values(name).first()
    }

    /// Returns every value of a field; empty for unknown fields.
    pub fn values(&self, name: &str) -> &[FieldValue] {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map_or(&[], |(_, values)| values.as_slice())
    }

    /// Returns a field's configuration, or the default for unknown fields.
    pub fn field_config(&self, name: &str) -> FieldConfig {
        self.configs.get(name).copied().unwrap_or_default()
    }

    /// Returns true if the field exists.
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|(n, _)| n == name)
    }

    /// Returns field names in insertion order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    /// Iterates over `(name, values, config)` in insertion order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &[FieldValue], FieldConfig)> {
        self.fields
            .iter()
            .map(|(n, values)| (n.as_str(), values.as_slice(), self.field_config(n)))
    }

    /// Returns the number of distinct field names.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Removes a field and its configuration.
    pub fn remove_field(&mut self, name: &str) -> Option<Vec<FieldValue>> {
        let position = self.fields.iter().position(|(n, _)| n == name)?;
        self.configs.remove(name);
        Some(self.fields.remove(position).1)
    }

    /// Lists every problem with the document.
    pub fn validation_errors(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if self.id.trim().is_empty() {
            errors.push(ValidationError::MissingIdentifier);
        }
        for (name, values) in &self.fields {
            if name.trim().is_empty() {
                errors.push(ValidationError::invalid_argument(
                    "field name must not be empty",
                ));
            }
            if name.starts_with(INTERNAL_PREFIX) {
                errors.push(ValidationError::ReservedFieldName {
                    field: name.clone(),
                });
            }
            if values.iter().any(FieldValue::is_null) {
                errors.push(ValidationError::NullValue {
                    field: name.clone(),
                });
            }
            if self.field_config(name).field_type().is_none() {
                errors.push(ValidationError::MissingFieldType {
                    field: name.clone(),
                });
            }
        }
        errors
    }

    /// Returns true if [`validation_errors`](Self::validation_errors) is empty.
    pub fn is_valid(&self) -> bool {
        self.validation_errors().is_empty()
    }
}
