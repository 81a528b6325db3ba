//! Tag taxonomy — namespaced, inheritable metadata labels.
//!
//! Tags are self-hosted: the registry (`tag::registry`) stores each tag as
//! an Entity carrying a tag-definition Aspect inside a dedicated Catalog,
//! using the exact same primitives the tags describe.
//!
//! Lifecycle: *proposed* (a built [`TagDefinition`], not yet registered) →
//! *registered* (accepted by [`registry::TagRegistry::define`]) → *applied*
//! (validated against a target element kind).

pub mod registry;

use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::model::EntityId;
use crate::{Error, Result};

pub use registry::TagRegistry;

/// A registered tag's identifier. Tags are Entities, so this is an entity
/// id.
pub type TagId = EntityId;

/// Whether a tag belongs to the built-in standard set or was user-defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TagScope {
    Standard,
    Custom,
}

impl TagScope {
    pub fn name(&self) -> &'static str {
        match self {
            TagScope::Standard => "STANDARD",
            TagScope::Custom => "CUSTOM",
        }
    }
}

impl fmt::Display for TagScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The kinds of model elements a tag can be applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ElementKind {
    Property,
    Aspect,
    Entity,
    Hierarchy,
    Catalog,
}

impl ElementKind {
    pub fn name(&self) -> &'static str {
        match self {
            ElementKind::Property => "PROPERTY",
            ElementKind::Aspect => "ASPECT",
            ElementKind::Entity => "ENTITY",
            ElementKind::Hierarchy => "HIERARCHY",
            ElementKind::Catalog => "CATALOG",
        }
    }

    pub fn parse(s: &str) -> Option<ElementKind> {
        match s {
            "PROPERTY" => Some(ElementKind::Property),
            "ASPECT" => Some(ElementKind::Aspect),
            "ENTITY" => Some(ElementKind::Entity),
            "HIERARCHY" => Some(ElementKind::Hierarchy),
            "CATALOG" => Some(ElementKind::Catalog),
            _ => None,
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A proposed tag: everything but an identity. Immutable once registered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagDefinition {
    pub namespace: String,
    pub name: String,
    pub description: String,
    pub applicability: SmallVec<[ElementKind; 5]>,
    pub scope: TagScope,
    pub aliases: Vec<String>,
    pub parents: SmallVec<[TagId; 4]>,
}

impl TagDefinition {
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            description: description.into(),
            applicability: SmallVec::new(),
            scope: TagScope::Custom,
            aliases: Vec::new(),
            parents: SmallVec::new(),
        }
    }

    pub fn applies_to(mut self, kind: ElementKind) -> Self {
        if !self.applicability.contains(&kind) {
            self.applicability.push(kind);
        }
        self
    }

    pub fn scoped(mut self, scope: TagScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn with_parent(mut self, parent: TagId) -> Self {
        self.parents.push(parent);
        self
    }

    /// The globally unique full name: `namespace:name`.
    pub fn full_name(&self) -> String {
        full_name(&self.namespace, &self.name)
    }

    pub fn is_applicable_to(&self, kind: ElementKind) -> bool {
        self.applicability.contains(&kind)
    }
}

pub fn full_name(namespace: &str, name: &str) -> String {
    format!("{namespace}:{name}")
}

// ============================================================================
// Syntax validation
// ============================================================================

/// One namespace segment or short name: lowercase alphanumeric with
/// internal hyphens. No leading/trailing hyphen, never empty.
fn valid_segment(s: &str) -> bool {
    !s.is_empty()
        && !s.starts_with('-')
        && !s.ends_with('-')
        && s.bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

/// Validate a dot-segmented namespace, e.g. `cheap.core`.
///
/// Empty segments cover the no-leading-dot, no-trailing-dot, and
/// no-consecutive-dots rules in one check.
pub fn validate_namespace(namespace: &str) -> Result<()> {
    if namespace.is_empty() {
        return Err(Error::TagValidation("namespace is empty".into()));
    }
    for segment in namespace.split('.') {
        if !valid_segment(segment) {
            return Err(Error::TagValidation(format!(
                "malformed namespace '{namespace}': bad segment '{segment}'"
            )));
        }
    }
    Ok(())
}

/// Validate a short tag name, e.g. `primary-key`. Same rule as a namespace
/// segment; dots are not allowed.
pub fn validate_name(name: &str) -> Result<()> {
    if !valid_segment(name) {
        return Err(Error::TagValidation(format!("malformed tag name '{name}'")));
    }
    Ok(())
}
