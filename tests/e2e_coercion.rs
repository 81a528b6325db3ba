//! End-to-end integration tests for coercion on assignment.
//!
//! Every write path funnels through the coercer, so these scenarios drive
//! whole-aspect assignment rather than calling the converter directly.

use chrono::{FixedOffset, TimeZone, Utc};
use cheap_rs::{
    Aspect, AspectDef, Coercer, EntityId, Error, PropertyDef, Value, ValueType,
};

// ============================================================================
// Helper: one def with a property of every interesting shape.
// ============================================================================

fn mixed_def() -> AspectDef {
    AspectDef::immutable(
        "app.mixed",
        [
            PropertyDef::new("count", ValueType::Integer).required(),
            PropertyDef::new("ratio", ValueType::Float),
            PropertyDef::new("active", ValueType::Boolean),
            PropertyDef::new("label", ValueType::String),
            PropertyDef::new("ledger", ValueType::BigInteger),
            PropertyDef::new("price", ValueType::BigDecimal),
            PropertyDef::new("seen-at", ValueType::DateTime),
            PropertyDef::new("home", ValueType::Uri),
            PropertyDef::new("token", ValueType::Uuid),
            PropertyDef::new("payload", ValueType::Blob),
            PropertyDef::new("tags", ValueType::String).multivalued(),
        ],
    )
    .unwrap()
}

fn built(def: &AspectDef, name: &str, value: impl Into<Value>) -> Aspect {
    Aspect::builder(def, EntityId::new())
        .set("count", 1)
        .unwrap()
        .set(name, value)
        .unwrap()
        .build()
        .unwrap()
}

// ============================================================================
// 1. Numeric coercion: strings parse, decimals truncate toward zero
// ============================================================================

#[test]
fn test_decimal_string_truncates_to_integer() {
    let def = mixed_def();
    let aspect = built(&def, "count", "42.9");
    assert_eq!(aspect.get("count"), Some(&Value::Integer(42)));

    let aspect = built(&def, "count", "-7.9");
    assert_eq!(aspect.get("count"), Some(&Value::Integer(-7)));
}

#[test]
fn test_integer_widens_to_float() {
    let def = mixed_def();
    let aspect = built(&def, "ratio", 3);
    assert_eq!(aspect.get("ratio"), Some(&Value::Float(3.0)));
}

#[test]
fn test_non_numeric_string_fails_integer() {
    let def = mixed_def();
    let err = Aspect::builder(&def, EntityId::new())
        .set("count", "forty-two")
        .unwrap_err();
    assert!(matches!(err, Error::Coercion { target: "INTEGER", .. }));
}

#[test]
fn test_non_finite_float_fails_integer() {
    let coercer = Coercer::utc();
    let err = coercer
        .coerce_scalar(ValueType::Integer, Value::Float(f64::NAN))
        .unwrap_err();
    assert!(matches!(err, Error::Coercion { .. }));
}

// ============================================================================
// 2. Boolean coercion: case-sensitive literal, numeric truthiness
// ============================================================================

#[test]
fn test_boolean_string_literal_is_case_sensitive() {
    let def = mixed_def();
    assert_eq!(built(&def, "active", "true").get("active"), Some(&Value::Boolean(true)));
    // Anything but the exact literal is false, not an error.
    assert_eq!(built(&def, "active", "True").get("active"), Some(&Value::Boolean(false)));
    assert_eq!(built(&def, "active", "yes").get("active"), Some(&Value::Boolean(false)));
}

#[test]
fn test_boolean_numeric_truthiness() {
    let def = mixed_def();
    assert_eq!(built(&def, "active", 0).get("active"), Some(&Value::Boolean(false)));
    assert_eq!(built(&def, "active", -3).get("active"), Some(&Value::Boolean(true)));
    assert_eq!(built(&def, "active", 0.5).get("active"), Some(&Value::Boolean(true)));
}

// ============================================================================
// 3. Arbitrary-precision targets keep the caller's digits
// ============================================================================

#[test]
fn test_big_integer_accepts_beyond_i64() {
    let def = mixed_def();
    let huge = "170141183460469231731687303715884105727";
    let aspect = built(&def, "ledger", huge);
    assert_eq!(aspect.get("ledger"), Some(&Value::BigInteger(huge.to_owned())));
}

#[test]
fn test_big_decimal_preserves_digits_verbatim() {
    let def = mixed_def();
    let precise = "3.14159265358979323846264338327950288";
    let aspect = built(&def, "price", precise);
    assert_eq!(aspect.get("price"), Some(&Value::BigDecimal(precise.to_owned())));
}

// ============================================================================
// 4. Temporal coercion: RFC 3339, zone-less fallback, epoch millis
// ============================================================================

#[test]
fn test_datetime_rfc3339_string() {
    let def = mixed_def();
    let aspect = built(&def, "seen-at", "2024-06-01T12:30:00Z");
    let expected = Utc.with_ymd_and_hms(2024, 6, 1, 12, 30, 0).unwrap();
    assert_eq!(aspect.get("seen-at"), Some(&Value::DateTime(expected)));
}

#[test]
fn test_zone_less_datetime_uses_configured_offset() {
    let offset = FixedOffset::east_opt(2 * 3600).unwrap();
    let coercer = Coercer::new(offset);
    let coerced = coercer
        .coerce_scalar(ValueType::DateTime, Value::from("2024-06-01T12:00:00"))
        .unwrap();
    // Noon at +02:00 is 10:00 UTC.
    let expected = Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap();
    assert_eq!(coerced, Value::DateTime(expected));
}

#[test]
fn test_epoch_millis_integer_becomes_datetime() {
    let def = mixed_def();
    let aspect = built(&def, "seen-at", 1_700_000_000_000i64);
    let expected = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
    assert_eq!(aspect.get("seen-at"), Some(&Value::DateTime(expected)));
}

// ============================================================================
// 5. Uri / Uuid / Blob
// ============================================================================

#[test]
fn test_uri_and_uuid_parse_from_strings() {
    let def = mixed_def();
    let aspect = built(&def, "home", "https://example.org/ada");
    assert!(matches!(aspect.get("home"), Some(Value::Uri(_))));

    let id = uuid::Uuid::new_v4();
    let aspect = built(&def, "token", id.to_string());
    assert_eq!(aspect.get("token").unwrap().as_uuid(), Some(id));
}

#[test]
fn test_string_to_blob_is_utf8_bytes() {
    let coercer = Coercer::utc();
    let coerced = coercer
        .coerce_scalar(ValueType::Blob, Value::from("hi"))
        .unwrap();
    assert_eq!(coerced, Value::Blob(b"hi".to_vec()));
}

// ============================================================================
// 6. Nullability and container shape
// ============================================================================

#[test]
fn test_null_rejected_for_required_accepted_for_nullable() {
    let def = mixed_def();
    let err = Aspect::builder(&def, EntityId::new())
        .set("count", Value::Null)
        .unwrap_err();
    assert!(matches!(err, Error::NullViolation(name) if name == "count"));

    let aspect = built(&def, "label", Value::Null);
    assert_eq!(aspect.get("label"), Some(&Value::Null));
}

#[test]
fn test_scalar_rejected_for_multivalued_and_vice_versa() {
    let def = mixed_def();
    let err = Aspect::builder(&def, EntityId::new())
        .set("tags", "solo")
        .unwrap_err();
    assert!(matches!(err, Error::Coercion { .. }));

    let err = Aspect::builder(&def, EntityId::new())
        .set("label", vec![Value::from("a")])
        .unwrap_err();
    assert!(matches!(err, Error::Coercion { .. }));
}

#[test]
fn test_multivalue_elements_coerced_individually() {
    let def = mixed_def();
    let aspect = built(
        &def,
        "tags",
        vec![Value::from("alpha"), Value::Integer(7), Value::Boolean(true)],
    );
    let list = aspect.get("tags").unwrap().as_list().unwrap();
    assert_eq!(list, [Value::from("alpha"), Value::from("7"), Value::from("true")]);
}

#[test]
fn test_canonical_multivalue_passes_through_same_allocation() {
    let coercer = Coercer::utc();
    let pdef = PropertyDef::new("tags", ValueType::String).multivalued();

    let items = vec![Value::from("a"), Value::from("b")];
    let ptr = items.as_ptr();
    let coerced = coercer.coerce(&pdef, Value::List(items)).unwrap();
    let Value::List(out) = coerced else { panic!("expected a list") };
    assert_eq!(out.as_ptr(), ptr);
}
