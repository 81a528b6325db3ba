//! Canonical value type system.
//!
//! Every property value in the model is exactly one of twelve canonical
//! types. Host representations never leak past this boundary: the coercion
//! engine (`crate::coerce`) normalizes arbitrary input into one of these
//! variants or fails.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

/// The twelve canonical property types.
///
/// These are the only wire/storage-level types. `PropertyDef` pins each
/// field to one of them; the coercion engine normalizes input accordingly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    Integer,
    Float,
    Boolean,
    String,
    Text,
    BigInteger,
    BigDecimal,
    DateTime,
    Uri,
    Uuid,
    Clob,
    Blob,
}

impl ValueType {
    pub fn name(&self) -> &'static str {
        match self {
            ValueType::Integer => "INTEGER",
            ValueType::Float => "FLOAT",
            ValueType::Boolean => "BOOLEAN",
            ValueType::String => "STRING",
            ValueType::Text => "TEXT",
            ValueType::BigInteger => "BIG_INTEGER",
            ValueType::BigDecimal => "BIG_DECIMAL",
            ValueType::DateTime => "DATE_TIME",
            ValueType::Uri => "URI",
            ValueType::Uuid => "UUID",
            ValueType::Clob => "CLOB",
            ValueType::Blob => "BLOB",
        }
    }

    /// All twelve types, in declaration order.
    pub const ALL: [ValueType; 12] = [
        ValueType::Integer,
        ValueType::Float,
        ValueType::Boolean,
        ValueType::String,
        ValueType::Text,
        ValueType::BigInteger,
        ValueType::BigDecimal,
        ValueType::DateTime,
        ValueType::Uri,
        ValueType::Uuid,
        ValueType::Clob,
        ValueType::Blob,
    ];
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A property value: one case per canonical type, plus `Null` and `List`.
///
/// `List` is the container for multivalued properties; its elements are
/// themselves canonical scalars. Nesting lists inside lists is not part of
/// the model and the coercion engine rejects it.
///
/// `BigInteger`/`BigDecimal` carry their canonical *string* form — the
/// persistence contract is string-keyed, so the canonical string is also
/// the storage form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    Null,
    Integer(i64),
    Float(f64),
    Boolean(bool),
    String(String),
    Text(String),
    BigInteger(String),
    BigDecimal(String),
    DateTime(DateTime<Utc>),
    Uri(Url),
    Uuid(Uuid),
    Clob(String),
    Blob(Vec<u8>),
    List(Vec<Value>),
}

// ============================================================================
// Type checking
// ============================================================================

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::List(_) => "LIST",
            Value::Integer(_) => ValueType::Integer.name(),
            Value::Float(_) => ValueType::Float.name(),
            Value::Boolean(_) => ValueType::Boolean.name(),
            Value::String(_) => ValueType::String.name(),
            Value::Text(_) => ValueType::Text.name(),
            Value::BigInteger(_) => ValueType::BigInteger.name(),
            Value::BigDecimal(_) => ValueType::BigDecimal.name(),
            Value::DateTime(_) => ValueType::DateTime.name(),
            Value::Uri(_) => ValueType::Uri.name(),
            Value::Uuid(_) => ValueType::Uuid.name(),
            Value::Clob(_) => ValueType::Clob.name(),
            Value::Blob(_) => ValueType::Blob.name(),
        }
    }

    /// The canonical type of a scalar value. `None` for `Null` and `List`.
    pub fn value_type(&self) -> Option<ValueType> {
        match self {
            Value::Null | Value::List(_) => None,
            Value::Integer(_) => Some(ValueType::Integer),
            Value::Float(_) => Some(ValueType::Float),
            Value::Boolean(_) => Some(ValueType::Boolean),
            Value::String(_) => Some(ValueType::String),
            Value::Text(_) => Some(ValueType::Text),
            Value::BigInteger(_) => Some(ValueType::BigInteger),
            Value::BigDecimal(_) => Some(ValueType::BigDecimal),
            Value::DateTime(_) => Some(ValueType::DateTime),
            Value::Uri(_) => Some(ValueType::Uri),
            Value::Uuid(_) => Some(ValueType::Uuid),
            Value::Clob(_) => Some(ValueType::Clob),
            Value::Blob(_) => Some(ValueType::Blob),
        }
    }

    /// True if this scalar is already the canonical in-memory form of `ty`.
    pub fn is_canonical(&self, ty: ValueType) -> bool {
        self.value_type() == Some(ty)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Value::List(_))
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Value::Integer(_) | Value::Float(_) | Value::BigInteger(_) | Value::BigDecimal(_)
        )
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Text(s) | Value::Clob(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            Value::Uuid(u) => Some(*u),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Blob(b) => Some(b),
            _ => None,
        }
    }
}

// ============================================================================
// Conversions (From impls)
// ============================================================================

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}
impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}
impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}
impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}
impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}
impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}
impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}
impl From<Url> for Value {
    fn from(v: Url) -> Self {
        Value::Uri(v)
    }
}
impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::DateTime(v)
    }
}
impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}
impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

// ============================================================================
// Display — the canonical string form
// ============================================================================

impl fmt::Display for Value {
    /// Canonical string form: what String/Text/CLOB coercion yields and
    /// what the default storage-string hook emits.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::String(s) | Value::Text(s) | Value::Clob(s) => f.write_str(s),
            Value::BigInteger(s) | Value::BigDecimal(s) => f.write_str(s),
            Value::DateTime(dt) => write!(f, "{}", dt.to_rfc3339()),
            Value::Uri(u) => write!(f, "{u}"),
            Value::Uuid(u) => write!(f, "{u}"),
            Value::Blob(bytes) => {
                for b in bytes {
                    write!(f, "{b:02x}")?;
                }
                Ok(())
            }
            Value::List(items) => {
                write!(f, "[")?;
                for (i, v) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_from() {
        assert_eq!(Value::from("hello"), Value::String("hello".into()));
        assert_eq!(Value::from(42), Value::Integer(42));
        assert_eq!(Value::from(2.5), Value::Float(2.5));
        assert_eq!(Value::from(true), Value::Boolean(true));
        assert_eq!(Value::from(None::<i64>), Value::Null);
    }

    #[test]
    fn test_canonical_check() {
        assert!(Value::Integer(1).is_canonical(ValueType::Integer));
        assert!(!Value::Integer(1).is_canonical(ValueType::Float));
        assert!(!Value::Null.is_canonical(ValueType::Integer));
        assert!(Value::Text("t".into()).is_canonical(ValueType::Text));
    }

    #[test]
    fn test_display_blob_hex() {
        assert_eq!(Value::Blob(vec![0xde, 0xad, 0x01]).to_string(), "dead01");
    }

    #[test]
    fn test_display_list() {
        let v = Value::List(vec![Value::Integer(1), Value::String("a".into())]);
        assert_eq!(v.to_string(), "[1, a]");
    }

    #[test]
    fn test_all_types_named() {
        for ty in ValueType::ALL {
            assert!(!ty.name().is_empty());
        }
        assert_eq!(ValueType::ALL.len(), 12);
    }
}
