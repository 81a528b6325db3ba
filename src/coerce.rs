//! Value coercion engine.
//!
//! Given a target canonical type and an arbitrary input value, produce
//! exactly that type's canonical in-memory form or fail. Nothing is ever
//! silently downgraded: a failed coercion is an error, never a substituted
//! null or zero.
//!
//! The engine is a plain struct, not a global — callers (Aspect builder,
//! hierarchy writers) hold one, usually `Coercer::utc()`. The configured
//! offset only affects DateTime inputs that lack an explicit zone.

use chrono::{
    DateTime, FixedOffset, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc,
};
use url::Url;
use uuid::Uuid;

use crate::model::{PropertyDef, Value, ValueType};
use crate::{Error, Result};

/// Normalizes heterogeneous input into canonical [`Value`]s.
#[derive(Debug, Clone, Copy)]
pub struct Coercer {
    /// Offset applied to zone-less DateTime input.
    default_offset: FixedOffset,
}

impl Default for Coercer {
    fn default() -> Self {
        Self::utc()
    }
}

impl Coercer {
    pub fn new(default_offset: FixedOffset) -> Self {
        Self { default_offset }
    }

    /// Coercer interpreting zone-less datetimes as UTC.
    pub fn utc() -> Self {
        Self { default_offset: Utc.fix() }
    }

    pub fn default_offset(&self) -> FixedOffset {
        self.default_offset
    }

    /// Coerce `value` against a full property definition: nullability,
    /// container shape, and element type.
    ///
    /// For multivalued defs an already-canonical list passes through
    /// untouched (same allocation); anything else yields a new list with
    /// each element coerced independently. A bare scalar for a multivalued
    /// def, or a list for a single-valued def, is an error — never a
    /// silent wrap or unwrap.
    pub fn coerce(&self, def: &PropertyDef, value: Value) -> Result<Value> {
        if value.is_null() {
            if def.nullable {
                return Ok(Value::Null);
            }
            return Err(Error::NullViolation(def.name.clone()));
        }

        if def.multivalued {
            let items = match value {
                Value::List(items) => items,
                other => {
                    return Err(coercion_err(
                        def.value_type,
                        format!(
                            "multivalued property '{}' requires an ordered container, got {}",
                            def.name,
                            other.type_name()
                        ),
                    ));
                }
            };

            // Identity-preserving fast path: nothing to normalize.
            if items.iter().all(|v| v.is_canonical(def.value_type)) {
                return Ok(Value::List(items));
            }

            let mut out = Vec::with_capacity(items.len());
            for item in items {
                if item.is_null() {
                    return Err(coercion_err(
                        def.value_type,
                        format!("list element of property '{}' is null", def.name),
                    ));
                }
                out.push(self.coerce_scalar(def.value_type, item)?);
            }
            return Ok(Value::List(out));
        }

        if value.is_list() {
            return Err(coercion_err(
                def.value_type,
                format!("single-valued property '{}' cannot accept a container", def.name),
            ));
        }

        self.coerce_scalar(def.value_type, value)
    }

    /// Coerce one scalar to the target canonical type.
    ///
    /// `Null` and `List` are handled by [`Coercer::coerce`]; here they are
    /// plain type errors.
    pub fn coerce_scalar(&self, target: ValueType, value: Value) -> Result<Value> {
        match target {
            ValueType::Integer => self.to_integer(value),
            ValueType::Float => self.to_float(value),
            ValueType::Boolean => self.to_boolean(value),
            ValueType::String => self.to_stringish(value, Value::String, ValueType::String),
            ValueType::Text => self.to_stringish(value, Value::Text, ValueType::Text),
            ValueType::Clob => self.to_stringish(value, Value::Clob, ValueType::Clob),
            ValueType::BigInteger => self.to_big_integer(value),
            ValueType::BigDecimal => self.to_big_decimal(value),
            ValueType::DateTime => self.to_datetime(value),
            ValueType::Uri => self.to_uri(value),
            ValueType::Uuid => self.to_uuid(value),
            ValueType::Blob => self.to_blob(value),
        }
    }

    // ========================================================================
    // Numeric targets
    // ========================================================================

    fn to_integer(&self, value: Value) -> Result<Value> {
        match value {
            Value::Integer(i) => Ok(Value::Integer(i)),
            Value::Float(f) => float_to_i64(f).map(Value::Integer),
            Value::BigInteger(s) | Value::BigDecimal(s) => {
                parse_i64(&s).map(Value::Integer)
            }
            Value::String(s) | Value::Text(s) | Value::Clob(s) => {
                parse_i64(&s).map(Value::Integer)
            }
            other => Err(type_mismatch(ValueType::Integer, &other)),
        }
    }

    fn to_float(&self, value: Value) -> Result<Value> {
        match value {
            Value::Float(f) => Ok(Value::Float(f)),
            Value::Integer(i) => Ok(Value::Float(i as f64)),
            Value::BigInteger(s) | Value::BigDecimal(s) => parse_f64(&s).map(Value::Float),
            Value::String(s) | Value::Text(s) | Value::Clob(s) => {
                parse_f64(&s).map(Value::Float)
            }
            other => Err(type_mismatch(ValueType::Float, &other)),
        }
    }

    fn to_big_integer(&self, value: Value) -> Result<Value> {
        match value {
            Value::BigInteger(s) => {
                if is_integer_literal(&s) {
                    Ok(Value::BigInteger(s))
                } else {
                    Err(coercion_err(ValueType::BigInteger, format!("'{s}' is not an integer")))
                }
            }
            Value::Integer(i) => Ok(Value::BigInteger(i.to_string())),
            Value::Float(f) => float_to_i128(f).map(|i| Value::BigInteger(i.to_string())),
            Value::BigDecimal(s)
            | Value::String(s)
            | Value::Text(s)
            | Value::Clob(s) => {
                let t = s.trim();
                if is_integer_literal(t) {
                    Ok(Value::BigInteger(t.to_owned()))
                } else {
                    // Decimal input truncates toward zero, same as Integer.
                    let f = parse_f64(t)?;
                    float_to_i128(f).map(|i| Value::BigInteger(i.to_string()))
                }
            }
            other => Err(type_mismatch(ValueType::BigInteger, &other)),
        }
    }

    fn to_big_decimal(&self, value: Value) -> Result<Value> {
        match value {
            Value::BigDecimal(s) => {
                parse_f64(&s)?;
                Ok(Value::BigDecimal(s))
            }
            Value::Integer(i) => Ok(Value::BigDecimal(i.to_string())),
            Value::Float(f) => {
                if !f.is_finite() {
                    return Err(coercion_err(ValueType::BigDecimal, "non-finite float".into()));
                }
                Ok(Value::BigDecimal(f.to_string()))
            }
            Value::BigInteger(s)
            | Value::String(s)
            | Value::Text(s)
            | Value::Clob(s) => {
                let t = s.trim().to_owned();
                // Validate numeric syntax but keep the caller's digits:
                // round-tripping through f64 would lose precision.
                parse_f64(&t)?;
                Ok(Value::BigDecimal(t))
            }
            other => Err(type_mismatch(ValueType::BigDecimal, &other)),
        }
    }

    // ========================================================================
    // Boolean
    // ========================================================================

    fn to_boolean(&self, value: Value) -> Result<Value> {
        match value {
            Value::Boolean(b) => Ok(Value::Boolean(b)),
            // Case-sensitive literal match; every other string is false.
            Value::String(s) | Value::Text(s) | Value::Clob(s) => {
                Ok(Value::Boolean(s == "true"))
            }
            Value::Integer(i) => Ok(Value::Boolean(i != 0)),
            Value::Float(f) => Ok(Value::Boolean(f != 0.0)),
            Value::BigInteger(s) | Value::BigDecimal(s) => {
                let f = parse_f64(&s)?;
                Ok(Value::Boolean(f != 0.0))
            }
            other => Err(type_mismatch(ValueType::Boolean, &other)),
        }
    }

    // ========================================================================
    // String-like targets
    // ========================================================================

    fn to_stringish(&self, value: Value, wrap: fn(String) -> Value, target: ValueType) -> Result<Value> {
        match value {
            // Null and containers are type errors here, same as every
            // other target; only scalars have a canonical string form.
            Value::Null | Value::List(_) => Err(type_mismatch(target, &value)),
            scalar => Ok(wrap(scalar.to_string())),
        }
    }

    // ========================================================================
    // Temporal
    // ========================================================================

    fn to_datetime(&self, value: Value) -> Result<Value> {
        match value {
            Value::DateTime(dt) => Ok(Value::DateTime(dt)),
            Value::String(s) | Value::Text(s) | Value::Clob(s) => {
                self.parse_datetime(&s).map(Value::DateTime)
            }
            // Legacy timestamp: integer epoch milliseconds.
            Value::Integer(ms) => match Utc.timestamp_millis_opt(ms) {
                LocalResult::Single(dt) => Ok(Value::DateTime(dt)),
                _ => Err(coercion_err(
                    ValueType::DateTime,
                    format!("{ms} is out of range for an epoch-millisecond timestamp"),
                )),
            },
            other => Err(type_mismatch(ValueType::DateTime, &other)),
        }
    }

    fn parse_datetime(&self, s: &str) -> Result<DateTime<Utc>> {
        let s = s.trim();

        // Explicit offset wins; the configured default never applies.
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(dt.with_timezone(&Utc));
        }

        let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
            .or_else(|_| {
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .map(|d| d.and_time(NaiveTime::MIN))
            })
            .map_err(|_| {
                coercion_err(ValueType::DateTime, format!("'{s}' is not an ISO-8601 timestamp"))
            })?;

        match self.default_offset.from_local_datetime(&naive) {
            LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
            _ => Err(coercion_err(
                ValueType::DateTime,
                format!("'{s}' is ambiguous in the configured offset"),
            )),
        }
    }

    // ========================================================================
    // Identifier-like targets
    // ========================================================================

    fn to_uri(&self, value: Value) -> Result<Value> {
        match value {
            Value::Uri(u) => Ok(Value::Uri(u)),
            Value::String(s) | Value::Text(s) | Value::Clob(s) => Url::parse(&s)
                .map(Value::Uri)
                .map_err(|e| coercion_err(ValueType::Uri, format!("'{s}': {e}"))),
            other => Err(type_mismatch(ValueType::Uri, &other)),
        }
    }

    fn to_uuid(&self, value: Value) -> Result<Value> {
        match value {
            Value::Uuid(u) => Ok(Value::Uuid(u)),
            Value::String(s) | Value::Text(s) | Value::Clob(s) => Uuid::parse_str(s.trim())
                .map(Value::Uuid)
                .map_err(|e| coercion_err(ValueType::Uuid, format!("'{s}': {e}"))),
            other => Err(type_mismatch(ValueType::Uuid, &other)),
        }
    }

    // ========================================================================
    // Binary
    // ========================================================================

    fn to_blob(&self, value: Value) -> Result<Value> {
        match value {
            Value::Blob(b) => Ok(Value::Blob(b)),
            // Fixed byte encoding for text input: UTF-8.
            Value::String(s) | Value::Text(s) | Value::Clob(s) => {
                Ok(Value::Blob(s.into_bytes()))
            }
            other => Err(type_mismatch(ValueType::Blob, &other)),
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn coercion_err(target: ValueType, message: String) -> Error {
    Error::Coercion { target: target.name(), message }
}

fn type_mismatch(target: ValueType, got: &Value) -> Error {
    coercion_err(target, format!("cannot coerce {}", got.type_name()))
}

fn parse_i64(s: &str) -> Result<i64> {
    let t = s.trim();
    if let Ok(i) = t.parse::<i64>() {
        return Ok(i);
    }
    // Decimal strings truncate toward zero: "42.9" → 42.
    if let Ok(f) = t.parse::<f64>() {
        return float_to_i64(f);
    }
    Err(coercion_err(ValueType::Integer, format!("'{s}' is not numeric")))
}

fn parse_f64(s: &str) -> Result<f64> {
    s.trim()
        .parse::<f64>()
        .map_err(|_| coercion_err(ValueType::Float, format!("'{s}' is not numeric")))
}

fn float_to_i128(f: f64) -> Result<i128> {
    // i128::MAX as f64 rounds up to 2^127, so the upper bound is
    // exclusive; -2^127 is exactly i128::MIN and casts cleanly.
    if !f.is_finite() || f.trunc() < i128::MIN as f64 || f.trunc() >= i128::MAX as f64 {
        return Err(coercion_err(ValueType::BigInteger, format!("{f} is out of range")));
    }
    Ok(f.trunc() as i128)
}

fn float_to_i64(f: f64) -> Result<i64> {
    if !f.is_finite() || f.trunc() < i64::MIN as f64 || f.trunc() > i64::MAX as f64 {
        return Err(coercion_err(ValueType::Integer, format!("{f} is out of range")));
    }
    Ok(f.trunc() as i64)
}

/// `^-?[0-9]+$` — an integer literal with no decimal point or exponent.
fn is_integer_literal(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}
