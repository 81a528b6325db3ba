//! Aspect schema (`AspectDef`) and data records (`Aspect`).
//!
//! An AspectDef is the record-level schema: a globally-unique namespaced
//! name, a map of PropertyDefs, and four capability flags. An Aspect is one
//! data instance of that schema, attached to exactly one Entity within one
//! Catalog.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use url::Url;
use uuid::Uuid;

use super::entity::EntityId;
use super::property::{Property, PropertyDef};
use super::value::Value;
use crate::coerce::Coercer;
use crate::{Error, Result};

// ============================================================================
// AspectDef
// ============================================================================

/// Record-level schema for a class of Aspects.
///
/// Two construction paths:
/// - [`AspectDef::immutable`] — fixed property set, add/remove always
///   rejected;
/// - [`AspectDef::extensible`] — add/remove governed by the capability
///   flags.
///
/// Property names are unique within the def. The map is ordered so the
/// content hash is deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AspectDef {
    name: String,
    id: Uuid,
    uri: Option<Url>,
    version: Option<u64>,
    properties: BTreeMap<String, PropertyDef>,
    readable: bool,
    writable: bool,
    can_add_properties: bool,
    can_remove_properties: bool,
}

impl AspectDef {
    /// Fixed-shape def: the property set can never change.
    pub fn immutable(
        name: impl Into<String>,
        properties: impl IntoIterator<Item = PropertyDef>,
    ) -> Result<Self> {
        Self::build(name.into(), properties, false, false)
    }

    /// Growable def: add/remove gated by the given flags.
    pub fn extensible(
        name: impl Into<String>,
        properties: impl IntoIterator<Item = PropertyDef>,
        can_add: bool,
        can_remove: bool,
    ) -> Result<Self> {
        Self::build(name.into(), properties, can_add, can_remove)
    }

    fn build(
        name: String,
        properties: impl IntoIterator<Item = PropertyDef>,
        can_add: bool,
        can_remove: bool,
    ) -> Result<Self> {
        let mut map = BTreeMap::new();
        for def in properties {
            if map.contains_key(&def.name) {
                return Err(Error::SchemaViolation(format!(
                    "duplicate property '{}' in aspect def '{name}'",
                    def.name
                )));
            }
            map.insert(def.name.clone(), def);
        }
        Ok(Self {
            name,
            id: Uuid::new_v4(),
            uri: None,
            version: None,
            properties: map,
            readable: true,
            writable: true,
            can_add_properties: can_add,
            can_remove_properties: can_remove,
        })
    }

    pub fn with_uri(mut self, uri: Url) -> Self {
        self.uri = Some(uri);
        self
    }

    pub fn with_version(mut self, version: u64) -> Self {
        self.version = Some(version);
        self
    }

    pub fn read_only(mut self) -> Self {
        self.writable = false;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn uri(&self) -> Option<&Url> {
        self.uri.as_ref()
    }

    pub fn version(&self) -> Option<u64> {
        self.version
    }

    pub fn is_readable(&self) -> bool {
        self.readable
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }

    pub fn can_add_properties(&self) -> bool {
        self.can_add_properties
    }

    pub fn can_remove_properties(&self) -> bool {
        self.can_remove_properties
    }

    pub fn property(&self, name: &str) -> Option<&PropertyDef> {
        self.properties.get(name)
    }

    pub fn properties(&self) -> impl Iterator<Item = &PropertyDef> {
        self.properties.values()
    }

    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    pub fn property_count(&self) -> usize {
        self.properties.len()
    }

    /// Add a PropertyDef. Rejected unless `can_add_properties` is set and
    /// the name is not already taken.
    pub fn add_property(&mut self, def: PropertyDef) -> Result<()> {
        if !self.can_add_properties {
            return Err(Error::SchemaViolation(format!(
                "aspect def '{}' does not allow adding properties",
                self.name
            )));
        }
        if self.properties.contains_key(&def.name) {
            return Err(Error::SchemaViolation(format!(
                "property '{}' already exists on aspect def '{}'",
                def.name, self.name
            )));
        }
        self.properties.insert(def.name.clone(), def);
        Ok(())
    }

    /// Remove a PropertyDef. Rejected unless `can_remove_properties` is set
    /// and the property exists.
    pub fn remove_property(&mut self, name: &str) -> Result<PropertyDef> {
        if !self.can_remove_properties {
            return Err(Error::SchemaViolation(format!(
                "aspect def '{}' does not allow removing properties",
                self.name
            )));
        }
        self.properties.remove(name).ok_or_else(|| {
            Error::SchemaViolation(format!(
                "no property '{name}' on aspect def '{}'",
                self.name
            ))
        })
    }

    /// Structural identity: everything except the instance UUID.
    ///
    /// Registration uses this — two independently built defs with the same
    /// full name must agree on shape even though their UUIDs differ.
    pub fn structurally_equal(&self, other: &AspectDef) -> bool {
        self.name == other.name
            && self.uri == other.uri
            && self.version == other.version
            && self.properties == other.properties
            && self.readable == other.readable
            && self.writable == other.writable
            && self.can_add_properties == other.can_add_properties
            && self.can_remove_properties == other.can_remove_properties
    }

    /// Implicit content-derived hash version (SHA-256 hex of the structural
    /// form; the instance UUID is excluded so structural twins hash alike).
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.name.as_bytes());
        if let Some(uri) = &self.uri {
            hasher.update(uri.as_str().as_bytes());
        }
        if let Some(v) = self.version {
            hasher.update(v.to_be_bytes());
        }
        hasher.update([
            self.readable as u8,
            self.writable as u8,
            self.can_add_properties as u8,
            self.can_remove_properties as u8,
        ]);
        // BTreeMap order makes this deterministic.
        for (name, def) in &self.properties {
            hasher.update(name.as_bytes());
            hasher.update(def.value_type.name().as_bytes());
            hasher.update([
                def.nullable as u8,
                def.readable as u8,
                def.writable as u8,
                def.removable as u8,
                def.multivalued as u8,
                def.has_default as u8,
            ]);
            if let Some(default) = def.default_value() {
                hasher.update(default.type_name().as_bytes());
                hasher.update(default.to_string().as_bytes());
            }
        }
        let digest = hasher.finalize();
        let mut out = String::with_capacity(64);
        for b in digest {
            out.push_str(&format!("{b:02x}"));
        }
        out
    }
}

// ============================================================================
// Aspect
// ============================================================================

/// A data instance of an AspectDef attached to one Entity.
///
/// Aspects are produced by [`AspectBuilder`], which validates everything
/// up front — a rejected build never leaves a partially-written Aspect.
/// Post-build writes go through [`Aspect::set`], which re-validates against
/// the def on every call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aspect {
    entity: EntityId,
    def_name: String,
    values: BTreeMap<String, Value>,
}

impl Aspect {
    pub fn builder(def: &AspectDef, entity: EntityId) -> AspectBuilder<'_> {
        AspectBuilder::new(def, entity)
    }

    pub fn entity(&self) -> EntityId {
        self.entity
    }

    pub fn def_name(&self) -> &str {
        &self.def_name
    }

    /// The stored value, if one was set.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// The stored value, falling back to the def's declared default.
    pub fn get_or_default<'a>(&'a self, def: &'a AspectDef, name: &str) -> Option<&'a Value> {
        self.values
            .get(name)
            .or_else(|| def.property(name).and_then(|p| p.default_value()))
    }

    /// The stored value as an immutable [`Property`] pair.
    pub fn property(&self, name: &str) -> Option<Property> {
        self.values.get(name).map(|v| Property::new(name, v.clone()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Write a property value, validating against the def.
    ///
    /// Known names must be writable and coercible; unknown names are
    /// rejected unless the def permits additions, in which case any
    /// canonical scalar or list is accepted as-is.
    pub fn set(
        &mut self,
        def: &AspectDef,
        coercer: &Coercer,
        name: &str,
        value: Value,
    ) -> Result<()> {
        debug_assert_eq!(def.name(), self.def_name);
        if !def.is_writable() {
            return Err(Error::SchemaViolation(format!(
                "aspect def '{}' is not writable",
                def.name()
            )));
        }
        match def.property(name) {
            Some(pdef) => {
                if !pdef.writable {
                    return Err(Error::SchemaViolation(format!(
                        "property '{name}' of '{}' is not writable",
                        def.name()
                    )));
                }
                let coerced = coercer.coerce(pdef, value)?;
                self.values.insert(name.to_owned(), coerced);
                Ok(())
            }
            None if def.can_add_properties() => {
                self.values.insert(name.to_owned(), value);
                Ok(())
            }
            None => Err(Error::SchemaViolation(format!(
                "unknown property '{name}' on non-extensible aspect def '{}'",
                def.name()
            ))),
        }
    }

    /// Remove a property value, gated by the def's removal rules.
    pub fn remove(&mut self, def: &AspectDef, name: &str) -> Result<Value> {
        if let Some(pdef) = def.property(name) {
            if !pdef.removable {
                return Err(Error::SchemaViolation(format!(
                    "property '{name}' of '{}' is not removable",
                    def.name()
                )));
            }
        } else if !def.can_remove_properties() {
            return Err(Error::SchemaViolation(format!(
                "unknown property '{name}' on aspect def '{}'",
                def.name()
            )));
        }
        self.values
            .remove(name)
            .ok_or_else(|| Error::NotFound(format!("property '{name}'")))
    }
}

// ============================================================================
// AspectBuilder
// ============================================================================

/// Accumulates property assignments and validates everything before
/// producing an immutable [`Aspect`].
#[derive(Debug)]
pub struct AspectBuilder<'d> {
    def: &'d AspectDef,
    entity: EntityId,
    coercer: Coercer,
    values: BTreeMap<String, Value>,
}

impl<'d> AspectBuilder<'d> {
    pub fn new(def: &'d AspectDef, entity: EntityId) -> Self {
        Self {
            def,
            entity,
            coercer: Coercer::utc(),
            values: BTreeMap::new(),
        }
    }

    pub fn with_coercer(mut self, coercer: Coercer) -> Self {
        self.coercer = coercer;
        self
    }

    /// Assign a property by name. The name must exist on the def (or the
    /// def must permit additions); the value is coerced immediately so a
    /// bad assignment fails here, not at `build()`.
    pub fn set(mut self, name: impl Into<String>, value: impl Into<Value>) -> Result<Self> {
        let name = name.into();
        let value = value.into();
        match self.def.property(&name) {
            Some(pdef) => {
                let coerced = self.coercer.coerce(pdef, value)?;
                self.values.insert(name, coerced);
            }
            None if self.def.can_add_properties() => {
                self.values.insert(name, value);
            }
            None => {
                return Err(Error::SchemaViolation(format!(
                    "unknown property '{name}' on non-extensible aspect def '{}'",
                    self.def.name()
                )));
            }
        }
        Ok(self)
    }

    /// Assign a property by definition reference.
    ///
    /// Accepted only if that exact PropertyDef (full structural equality)
    /// matches the def's own — this is the guard against silent schema
    /// drift when a caller holds a stale or foreign PropertyDef.
    pub fn set_by_def(self, pdef: &PropertyDef, value: impl Into<Value>) -> Result<Self> {
        match self.def.property(&pdef.name) {
            Some(own) if own == pdef => self.set(pdef.name.clone(), value),
            Some(_) => Err(Error::SchemaViolation(format!(
                "property def '{}' does not match the definition on aspect def '{}'",
                pdef.name,
                self.def.name()
            ))),
            None => Err(Error::SchemaViolation(format!(
                "no property '{}' on aspect def '{}'",
                pdef.name,
                self.def.name()
            ))),
        }
    }

    /// Validate completeness and freeze.
    ///
    /// Absent properties take their declared default; an absent
    /// non-nullable property with no default fails the build.
    pub fn build(mut self) -> Result<Aspect> {
        for pdef in self.def.properties() {
            if self.values.contains_key(&pdef.name) {
                continue;
            }
            if let Some(default) = pdef.default_value() {
                let coerced = self.coercer.coerce(pdef, default.clone())?;
                self.values.insert(pdef.name.clone(), coerced);
            } else if !pdef.nullable {
                return Err(Error::SchemaViolation(format!(
                    "required property '{}' of '{}' was never assigned",
                    pdef.name,
                    self.def.name()
                )));
            }
        }
        Ok(Aspect {
            entity: self.entity,
            def_name: self.def.name().to_owned(),
            values: self.values,
        })
    }
}
