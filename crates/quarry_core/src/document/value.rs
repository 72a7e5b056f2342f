//! Typed field values.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A single value of a document field.
///
/// The [`Display`](fmt::Display) form is the canonical string
/// representation: two values are duplicates of each other when their
/// canonical strings are equal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    /// Absent value. Skipped by conversion.
    Null,
    /// UTF-8 text.
    Text(String),
    /// 32-bit integer.
    Integer(i32),
    /// 64-bit integer.
    Long(i64),
    /// 32-bit float.
    Float(f32),
    /// 64-bit float.
    Double(f64),
    /// Boolean.
    Boolean(bool),
    /// Milliseconds since the Unix epoch.
    Date(i64),
    /// Opaque bytes.
    Binary(Vec<u8>),
}

impl FieldValue {
    /// Creates a date value from a system time.
    pub fn date(time: SystemTime) -> Self {
        let millis = match time.duration_since(UNIX_EPOCH) {
            Ok(after) => i64::try_from(after.as_millis()).unwrap_or(i64::MAX),
            Err(before) => i64::try_from(before.duration().as_millis())
                .map(|m| -m)
                .unwrap_or(i64::MIN),
        };
        Self::Date(millis)
    }

    /// Returns true for [`FieldValue::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the variant name.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Text(_) => "text",
            Self::Integer(_) => "integer",
            Self::Long(_) => "long",
            Self::Float(_) => "float",
            Self::Double(_) => "double",
            Self::Boolean(_) => "boolean",
            Self::Date(_) => "date",
            Self::Binary(_) => "binary",
        }
    }

    /// Returns the text if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Coerces to `i64`. Floats truncate toward zero; text is parsed.
    pub fn to_long(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(i64::from(*v)),
            Self::Long(v) | Self::Date(v) => Some(*v),
            Self::Float(v) => Some(*v as i64),
            Self::Double(v) => Some(*v as i64),
            Self::Text(s) => s.trim().parse().ok(),
            Self::Null | Self::Boolean(_) | Self::Binary(_) => None,
        }
    }

    /// Coerces to `i32`. Out-of-range integers are rejected.
    pub fn to_int(&self) -> Option<i32> {
        match self {
            Self::Text(s) => s.trim().parse().ok(),
            other => other.to_long().and_then(|v| i32::try_from(v).ok()),
        }
    }

    /// Coerces to `f64`.
    pub fn to_double(&self) -> Option<f64> {
        match self {
            Self::Integer(v) => Some(f64::from(*v)),
            Self::Long(v) | Self::Date(v) => Some(*v as f64),
            Self::Float(v) => Some(f64::from(*v)),
            Self::Double(v) => Some(*v),
            Self::Text(s) => s.trim().parse().ok(),
            Self::Null | Self::Boolean(_) | Self::Binary(_) => None,
        }
    }

    /// Coerces to `f32`.
    pub fn to_float(&self) -> Option<f32> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Text(s) => s.trim().parse().ok(),
            other => other.to_double().map(|v| v as f32),
        }
    }

    /// Coerces to epoch milliseconds.
    pub fn to_timestamp_millis(&self) -> Option<i64> {
        self.to_long()
    }

    /// Returns the raw bytes of a binary value, or the UTF-8 bytes of the
    /// canonical string otherwise.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Self::Binary(bytes) => bytes.clone(),
            other => other.to_string().into_bytes(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Text(s) => f.write_str(s),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Long(v) | Self::Date(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::Boolean(v) => write!(f, "{v}"),
            Self::Binary(bytes) => bytes.iter().try_for_each(|b| write!(f, "{b:02x}")),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self::Integer(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Long(value)
    }
}

impl From<f32> for FieldValue {
    fn from(value: f32) -> Self {
        Self::Float(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<Vec<u8>> for FieldValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Binary(value)
    }
}

impl From<&[u8]> for FieldValue {
    fn from(value: &[u8]) -> Self {
        Self::Binary(value.to_vec())
    }
}

impl From<SystemTime> for FieldValue {
    fn from(value: SystemTime) -> Self {
        Self::date(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Converts epoch milliseconds back to a system time.
pub fn millis_to_system_time(millis: i64) -> SystemTime {
    let magnitude = Duration::from_millis(millis.unsigned_abs());
    if millis >= 0 {
        UNIX_EPOCH + magnitude
    } else {
        UNIX_EPOCH - magnitude
    }
}
