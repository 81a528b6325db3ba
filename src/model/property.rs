//! Property schema and values.
//!
//! `PropertyDef` is the field-level schema owned by exactly one AspectDef;
//! `Property` is an immutable name/value pair validated against it.

use serde::{Deserialize, Serialize};

use super::value::{Value, ValueType};

/// Field-level schema: name, canonical type, and constraint flags.
///
/// A `PropertyDef` has no identity of its own — it is owned by one
/// AspectDef and compared structurally. Derived `PartialEq` *is* the
/// structural-equality check the registration rules depend on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDef {
    pub name: String,
    pub value_type: ValueType,
    pub nullable: bool,
    pub readable: bool,
    pub writable: bool,
    pub removable: bool,
    pub multivalued: bool,
    /// Default value, meaningful only when `has_default` is set. A nullable
    /// def may have an explicit default of `Value::Null`, which is distinct
    /// from having no default at all.
    pub default: Option<Value>,
    pub has_default: bool,
}

impl PropertyDef {
    /// A readable, writable, removable, nullable, single-valued def.
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
            nullable: true,
            readable: true,
            writable: true,
            removable: true,
            multivalued: false,
            default: None,
            has_default: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.writable = false;
        self
    }

    pub fn fixed(mut self) -> Self {
        self.removable = false;
        self
    }

    pub fn multivalued(mut self) -> Self {
        self.multivalued = true;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self.has_default = true;
        self
    }

    /// The default value, if one was declared.
    pub fn default_value(&self) -> Option<&Value> {
        if self.has_default { self.default.as_ref() } else { None }
    }
}

/// An immutable name/value pair.
///
/// Multivalued properties hold an ordered `Value::List` that is replaced
/// wholesale on write, never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    name: String,
    value: Value,
}

impl Property {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self { name: name.into(), value }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Consume the pair, yielding the value.
    pub fn into_value(self) -> Value {
        self.value
    }

    pub fn as_integer(&self) -> Option<i64> {
        self.value.as_integer()
    }

    pub fn as_float(&self) -> Option<f64> {
        self.value.as_float()
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.value.as_bool()
    }

    pub fn as_str(&self) -> Option<&str> {
        self.value.as_str()
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        self.value.as_list()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_def_builder_flags() {
        let def = PropertyDef::new("age", ValueType::Integer)
            .required()
            .read_only()
            .fixed();
        assert!(!def.nullable);
        assert!(!def.writable);
        assert!(!def.removable);
        assert!(def.readable);
        assert!(!def.multivalued);
    }

    #[test]
    fn test_default_requires_flag() {
        let bare = PropertyDef::new("x", ValueType::String);
        assert_eq!(bare.default_value(), None);

        let with = PropertyDef::new("x", ValueType::String).with_default(Value::from("y"));
        assert_eq!(with.default_value(), Some(&Value::from("y")));
    }

    #[test]
    fn test_structural_equality() {
        let a = PropertyDef::new("n", ValueType::Uuid).required();
        let b = PropertyDef::new("n", ValueType::Uuid).required();
        assert_eq!(a, b);
        assert_ne!(a, b.clone().multivalued());
    }

    #[test]
    fn test_property_accessors() {
        let p = Property::new("count", Value::Integer(7));
        assert_eq!(p.name(), "count");
        assert_eq!(p.as_integer(), Some(7));
        assert_eq!(p.as_str(), None);
    }
}
