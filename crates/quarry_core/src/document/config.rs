//! Per-field indexing policy.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    /// Analyzed full text.
    Text,
    /// Exact-match string.
    Keyword,
    /// 32-bit integer.
    Integer,
    /// 64-bit integer.
    Long,
    /// 64-bit float.
    Double,
    /// 32-bit float.
    Float,
    /// Boolean.
    Boolean,
    /// Timestamp in epoch milliseconds.
    Date,
    /// Opaque bytes.
    Binary,
    /// Anything else; indexed as analyzed text.
    Object,
}

impl FieldType {
    /// Returns the lowercase type name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Keyword => "keyword",
            Self::Integer => "integer",
            Self::Long => "long",
            Self::Double => "double",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Binary => "binary",
            Self::Object => "object",
        }
    }

    /// Returns true for the four numeric types.
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Integer | Self::Long | Self::Double | Self::Float)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a field is stored and indexed.
///
/// Immutable once built. `indexed == false` makes the field stored-only
/// whatever its type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldConfig {
    stored: bool,
    indexed: bool,
    tokenized: bool,
    field_type: Option<FieldType>,
}

impl FieldConfig {
    /// Starts a builder with stored, indexed and tokenized set and no type.
    #[must_use]
    pub const fn builder() -> FieldConfigBuilder {
        FieldConfigBuilder {
            config: FieldConfig {
                stored: true,
                indexed: true,
                tokenized: true,
                field_type: None,
            },
        }
    }

    /// Stored, indexed, tokenized text.
    #[must_use]
    pub const fn text() -> Self {
        Self::builder().field_type(FieldType::Text).build()
    }

    /// Stored, indexed, untokenized keyword.
    #[must_use]
    pub const fn keyword() -> Self {
        Self::builder()
            .field_type(FieldType::Keyword)
            .tokenized(false)
            .build()
    }

    /// Stored, range-indexed number of the given type.
    #[must_use]
    pub const fn number(field_type: FieldType) -> Self {
        Self::builder()
            .field_type(field_type)
            .tokenized(false)
            .build()
    }

    /// Stored, range-indexed 32-bit integer.
    #[must_use]
    pub const fn integer() -> Self {
        Self::number(FieldType::Integer)
    }

    /// Stored, range-indexed 64-bit integer.
    #[must_use]
    pub const fn long() -> Self {
        Self::number(FieldType::Long)
    }

    /// Stored, range-indexed 32-bit float.
    #[must_use]
    pub const fn float() -> Self {
        Self::number(FieldType::Float)
    }

    /// Stored, range-indexed 64-bit float.
    #[must_use]
    pub const fn double() -> Self {
        Self::number(FieldType::Double)
    }

    /// Stored boolean, exact-match indexed.
    #[must_use]
    pub const fn boolean() -> Self {
        Self::number(FieldType::Boolean)
    }

    /// Stored, range-indexed timestamp.
    #[must_use]
    pub const fn date() -> Self {
        Self::number(FieldType::Date)
    }

    /// Stored-only bytes.
    #[must_use]
    pub const fn binary() -> Self {
        Self::builder()
            .field_type(FieldType::Binary)
            .indexed(false)
            .tokenized(false)
            .build()
    }

    /// Analyzed text fallback for arbitrary values.
    #[must_use]
    pub const fn object() -> Self {
        Self::builder().field_type(FieldType::Object).build()
    }

    /// Retrievable but not searchable.
    #[must_use]
    pub const fn stored_only(field_type: FieldType) -> Self {
        Self::builder()
            .field_type(field_type)
            .indexed(false)
            .tokenized(false)
            .build()
    }

    /// Searchable but not retrievable text.
    #[must_use]
    pub const fn indexed_only() -> Self {
        Self::builder()
            .field_type(FieldType::Text)
            .stored(false)
            .build()
    }

    /// Whether values are retrievable.
    pub const fn is_stored(&self) -> bool {
        self.stored
    }

    /// Whether values are searchable.
    pub const fn is_indexed(&self) -> bool {
        self.indexed
    }

    /// Whether text values are analyzed.
    pub const fn is_tokenized(&self) -> bool {
        self.tokenized
    }

    /// The logical type, if one was set.
    pub const fn field_type(&self) -> Option<FieldType> {
        self.field_type
    }
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self::text()
    }
}

/// Builder for [`FieldConfig`].
#[derive(Debug, Clone, Copy)]
pub struct FieldConfigBuilder {
    config: FieldConfig,
}

impl FieldConfigBuilder {
    /// Sets whether values are retrievable.
    #[must_use]
    pub const fn stored(mut self, value: bool) -> Self {
        self.config.stored = value;
        self
    }

    /// Sets whether values are searchable.
    #[must_use]
    pub const fn indexed(mut self, value: bool) -> Self {
        self.config.indexed = value;
        self
    }

    /// Sets whether text values are analyzed.
    #[must_use]
    pub const fn tokenized(mut self, value: bool) -> Self {
        self.config.tokenized = value;
        self
    }

    /// Sets the logical type.
    #[must_use]
    pub const fn field_type(mut self, value: FieldType) -> Self {
        self.config.field_type = Some(value);
        self
    }

    /// Finishes the configuration.
    #[must_use]
    pub const fn build(self) -> FieldConfig {
        self.config
    }
}
