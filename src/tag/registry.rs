//! The tag registry — self-hosted on the model it describes.
//!
//! Each registered tag is an Entity inside a dedicated Catalog, carrying a
//! `cheap.tag` Aspect in that catalog's AspectMap hierarchy. The registry
//! keeps a name index on the side; the catalog remains the source of truth
//! and is reachable through [`TagRegistry::catalog`] for serialization.

use hashbrown::HashMap;
use smallvec::SmallVec;
use tracing::debug;
use url::Url;

use super::{ElementKind, TagDefinition, TagId, TagScope, full_name, validate_name,
            validate_namespace};
use crate::coerce::Coercer;
use crate::model::{Aspect, AspectDef, Catalog, PropertyDef, Value, ValueType};
use crate::{Error, Result};

/// Full name of the tag-definition aspect (and of its AspectMap hierarchy).
pub const TAG_ASPECT: &str = "cheap.tag";

/// Reserved namespace of the built-in standard tag set.
pub const STANDARD_NAMESPACE: &str = "cheap.std";

fn tag_aspect_def() -> Result<AspectDef> {
    AspectDef::immutable(
        TAG_ASPECT,
        [
            PropertyDef::new("namespace", ValueType::String).required(),
            PropertyDef::new("name", ValueType::String).required(),
            PropertyDef::new("description", ValueType::Text)
                .with_default(Value::Text(String::new())),
            PropertyDef::new("applicability", ValueType::String)
                .required()
                .multivalued(),
            PropertyDef::new("scope", ValueType::String).required(),
            PropertyDef::new("aliases", ValueType::String).multivalued(),
            PropertyDef::new("parents", ValueType::Uuid).multivalued(),
        ],
    )
}

/// Registry of tag definitions with validation on every registration.
pub struct TagRegistry {
    catalog: Catalog,
    def: AspectDef,
    /// Full name (and every alias full name) → tag id.
    by_name: HashMap<String, TagId>,
    coercer: Coercer,
}

impl TagRegistry {
    /// An empty registry with its dedicated catalog. The standard tag set
    /// is not installed; call [`TagRegistry::install_standard_tags`].
    pub fn new() -> Result<Self> {
        let locator = Url::parse("urn:cheap:tags").map_err(|e| Error::Storage(e.to_string()))?;
        let mut catalog = Catalog::sink_of(locator)?;
        let def = tag_aspect_def()?;
        catalog.register_aspect_def(def.clone())?;
        catalog.register_hierarchy(crate::model::Hierarchy::aspect_map(&def))?;
        Ok(Self {
            catalog,
            def,
            by_name: HashMap::new(),
            coercer: Coercer::utc(),
        })
    }

    /// The backing catalog (tags as entities + aspects), e.g. for
    /// serialization or persistence.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn len(&self) -> usize {
        self.catalog
            .hierarchy(TAG_ASPECT)
            .map(|h| h.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolve a full name or alias to a tag id.
    pub fn resolve(&self, name: &str) -> Option<TagId> {
        self.by_name.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Register a proposed tag: proposed → registered.
    ///
    /// Rejected when the namespace or name is malformed, applicability is
    /// empty, the full name or an alias is taken, a parent does not
    /// resolve, or the parent graph would gain a cycle.
    pub fn define(&mut self, tag: TagDefinition) -> Result<TagId> {
        validate_namespace(&tag.namespace)?;
        validate_name(&tag.name)?;
        for alias in &tag.aliases {
            validate_name(alias)?;
        }
        if tag.applicability.is_empty() {
            return Err(Error::TagValidation(format!(
                "tag '{}' declares no applicable element kinds",
                tag.full_name()
            )));
        }

        let full = tag.full_name();
        if self.by_name.contains_key(&full) {
            return Err(Error::TagValidation(format!("tag '{full}' is already registered")));
        }
        let alias_names: Vec<String> = tag
            .aliases
            .iter()
            .map(|a| full_name(&tag.namespace, a))
            .collect();
        for alias in &alias_names {
            if self.by_name.contains_key(alias) || alias == &full {
                return Err(Error::TagValidation(format!("tag alias '{alias}' is already taken")));
            }
        }

        for parent in &tag.parents {
            if !self.exists(*parent) {
                return Err(Error::TagValidation(format!(
                    "parent tag {parent} of '{full}' is not registered"
                )));
            }
        }

        let id = TagId::new();
        self.check_acyclic(id, &tag.parents, &full)?;

        let aspect = Aspect::builder(&self.def, id)
            .with_coercer(self.coercer)
            .set("namespace", tag.namespace.as_str())?
            .set("name", tag.name.as_str())?
            .set("description", Value::Text(tag.description.clone()))?
            .set(
                "applicability",
                Value::List(
                    tag.applicability
                        .iter()
                        .map(|k| Value::String(k.name().to_owned()))
                        .collect(),
                ),
            )?
            .set("scope", tag.scope.name())?
            .set(
                "aliases",
                Value::List(tag.aliases.iter().map(|a| Value::String(a.clone())).collect()),
            )?
            .set(
                "parents",
                Value::List(tag.parents.iter().map(|p| Value::Uuid(p.0)).collect()),
            )?
            .build()?;

        self.catalog
            .with_hierarchy_mut(TAG_ASPECT, false, |h| h.aspect_put(aspect))?;
        self.by_name.insert(full.clone(), id);
        for alias in alias_names {
            self.by_name.insert(alias, id);
        }
        debug!(tag = %full, id = %id, "tag registered");
        Ok(id)
    }

    /// Registered → applied: validate that `tag` may be attached to an
    /// element of `target` kind. Returns the resolved id; the attachment
    /// itself lives with the target element.
    pub fn apply(&self, tag: &str, target: ElementKind) -> Result<TagId> {
        let id = self
            .resolve(tag)
            .ok_or_else(|| Error::NotFound(format!("tag '{tag}'")))?;
        let definition = self
            .get_by_id(id)
            .ok_or_else(|| Error::NotFound(format!("tag '{tag}'")))?;
        if !definition.is_applicable_to(target) {
            return Err(Error::TagValidation(format!(
                "tag '{tag}' is not applicable to {target} elements"
            )));
        }
        Ok(id)
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// Reconstruct a tag definition from its stored aspect.
    pub fn get(&self, name: &str) -> Option<TagDefinition> {
        self.resolve(name).and_then(|id| self.get_by_id(id))
    }

    pub fn get_by_id(&self, id: TagId) -> Option<TagDefinition> {
        let aspect = self.aspect_of(id)?;
        let str_of = |key: &str| aspect.get(key).and_then(|v| v.as_str().map(str::to_owned));
        let list_of = |key: &str| -> Vec<Value> {
            aspect
                .get(key)
                .and_then(Value::as_list)
                .map(<[Value]>::to_vec)
                .unwrap_or_default()
        };

        let scope = match str_of("scope").as_deref() {
            Some("STANDARD") => TagScope::Standard,
            _ => TagScope::Custom,
        };
        Some(TagDefinition {
            namespace: str_of("namespace")?,
            name: str_of("name")?,
            description: str_of("description").unwrap_or_default(),
            applicability: list_of("applicability")
                .iter()
                .filter_map(|v| v.as_str().and_then(ElementKind::parse))
                .collect(),
            scope,
            aliases: list_of("aliases")
                .iter()
                .filter_map(|v| v.as_str().map(str::to_owned))
                .collect(),
            parents: list_of("parents")
                .iter()
                .filter_map(|v| v.as_uuid().map(crate::model::EntityId))
                .collect(),
        })
    }

    /// Declared parents of a registered tag.
    pub fn parents_of(&self, id: TagId) -> SmallVec<[TagId; 4]> {
        self.aspect_of(id)
            .and_then(|a| a.get("parents").and_then(Value::as_list).map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_uuid().map(crate::model::EntityId))
                    .collect()
            }))
            .unwrap_or_default()
    }

    fn aspect_of(&self, id: TagId) -> Option<&Aspect> {
        self.catalog
            .hierarchy(TAG_ASPECT)
            .and_then(|h| h.aspect_get(id).ok().flatten())
    }

    fn exists(&self, id: TagId) -> bool {
        self.aspect_of(id).is_some()
    }

    // ========================================================================
    // Cycle detection
    // ========================================================================

    /// Depth-first reachability walk: if `candidate` is reachable from any
    /// of its declared parents through the stored parent chains, admitting
    /// it would close a cycle.
    fn check_acyclic(
        &self,
        candidate: TagId,
        parents: &[TagId],
        full: &str,
    ) -> Result<()> {
        let mut stack: Vec<TagId> = parents.to_vec();
        let mut seen: Vec<TagId> = Vec::new();
        while let Some(current) = stack.pop() {
            if current == candidate {
                return Err(Error::TagValidation(format!(
                    "registering '{full}' would create a parent-tag cycle"
                )));
            }
            if seen.contains(&current) {
                continue;
            }
            seen.push(current);
            stack.extend(self.parents_of(current));
        }
        Ok(())
    }

    // ========================================================================
    // Standard tag set
    // ========================================================================

    /// Install the built-in standard tags in the reserved `cheap.std`
    /// namespace. Idempotent: tags that already exist are left untouched,
    /// and the return value is the number of newly created tags.
    pub fn install_standard_tags(&mut self) -> Result<usize> {
        let mut created = 0;
        for (name, description, kinds, parents) in STANDARD_TAGS {
            let full = full_name(STANDARD_NAMESPACE, name);
            if self.by_name.contains_key(&full) {
                continue;
            }
            let mut tag = TagDefinition::new(STANDARD_NAMESPACE, *name, *description)
                .scoped(TagScope::Standard);
            for kind in *kinds {
                tag = tag.applies_to(*kind);
            }
            for parent in *parents {
                let parent_full = full_name(STANDARD_NAMESPACE, parent);
                let id = self.resolve(&parent_full).ok_or_else(|| {
                    Error::TagValidation(format!(
                        "standard tag '{name}' references unknown parent '{parent}'"
                    ))
                })?;
                tag = tag.with_parent(id);
            }
            self.define(tag)?;
            created += 1;
        }
        debug!(created, total = self.len(), "standard tags installed");
        Ok(created)
    }
}

// ============================================================================
// The standard set
// ============================================================================

const P: &[ElementKind] = &[ElementKind::Property];
const PA: &[ElementKind] = &[ElementKind::Property, ElementKind::Aspect];
const ALL: &[ElementKind] = &[
    ElementKind::Property,
    ElementKind::Aspect,
    ElementKind::Entity,
    ElementKind::Hierarchy,
    ElementKind::Catalog,
];
const PHC: &[ElementKind] = &[
    ElementKind::Property,
    ElementKind::Hierarchy,
    ElementKind::Catalog,
];
const PH: &[ElementKind] = &[ElementKind::Property, ElementKind::Hierarchy];

/// `(name, description, applicability, parents)` — parents always appear
/// earlier in the table so installation resolves them in one pass.
const STANDARD_TAGS: &[(&str, &str, &[ElementKind], &[&str])] = &[
    // Identity
    ("identifier", "uniquely identifies its bearer", P, &[]),
    ("unique", "values are unique within their collection", P, &[]),
    ("primary-key", "the primary identifying property", P, &["identifier", "unique"]),
    ("foreign-key", "references an identifier elsewhere", P, &["identifier"]),
    ("natural-key", "identifier with real-world meaning", P, &["identifier"]),
    ("surrogate-key", "identifier with no real-world meaning", P, &["identifier"]),
    ("immutable", "never changes after creation", P, &[]),
    ("derived", "computed from other values", P, &[]),
    ("computed", "recomputed on demand", P, &["derived"]),
    ("cached", "materialized copy of a derived value", P, &["derived"]),
    ("transient", "not persisted", PA, &[]),
    // Naming
    ("display-name", "human-readable name of its bearer", P, &[]),
    ("title", "primary heading text", P, &["display-name"]),
    ("label", "short display text", P, &["display-name"]),
    ("description", "longer explanatory text", P, &[]),
    ("comment", "free-form remark", P, &[]),
    ("note", "annotation attached to a record", PA, &[]),
    // Temporal
    ("temporal", "represents a point or span in time", P, &[]),
    ("created-at", "creation timestamp", P, &["temporal"]),
    ("updated-at", "last-modification timestamp", P, &["temporal"]),
    ("deleted-at", "soft-deletion timestamp", P, &["temporal"]),
    ("valid-from", "start of validity interval", P, &["temporal"]),
    ("valid-to", "end of validity interval", P, &["temporal"]),
    ("expires-at", "expiry timestamp", P, &["temporal"]),
    ("duration", "length of a time span", P, &[]),
    // Sensitivity
    ("sensitive", "needs handling care", PA, &[]),
    ("pii", "personally identifying information", PA, &["sensitive"]),
    ("secret", "credential or key material", P, &["sensitive"]),
    ("confidential", "restricted business data", PA, &["sensitive"]),
    ("redacted", "masked before display", P, &["sensitive"]),
    ("public", "safe for unrestricted disclosure", PA, &[]),
    ("internal", "for internal consumption only", PA, &[]),
    ("anonymized", "stripped of identifying detail", PA, &[]),
    // Personal data
    ("email", "email address", P, &["pii"]),
    ("phone", "telephone number", P, &["pii"]),
    ("postal-address", "physical mailing address", P, &["pii"]),
    ("person-name", "name of a natural person", P, &["pii"]),
    ("birth-date", "date of birth", P, &["pii", "temporal"]),
    // Geography
    ("geo", "geographic datum", P, &[]),
    ("latitude", "north-south coordinate", P, &["geo"]),
    ("longitude", "east-west coordinate", P, &["geo"]),
    ("country", "country name or code", P, &["geo"]),
    ("region", "state, province, or region", P, &["geo"]),
    ("locality", "city or town", P, &["geo"]),
    ("postal-code", "postal or zip code", P, &["geo"]),
    // Measures
    ("measure", "numeric measurement", P, &[]),
    ("quantity", "amount of something countable", P, &["measure"]),
    ("currency", "monetary amount", P, &["measure"]),
    ("percentage", "proportion scaled to 100", P, &["measure"]),
    ("ratio", "dimensionless proportion", P, &["measure"]),
    ("count", "cardinality of a collection", P, &["measure"]),
    ("unit", "unit of measure for a sibling value", P, &[]),
    // Content formats
    ("binary", "raw byte content", P, &[]),
    ("image", "encoded picture data", P, &["binary"]),
    ("document", "self-contained document body", P, &[]),
    ("json", "JSON-encoded text", P, &[]),
    ("xml", "XML-encoded text", P, &[]),
    ("markdown", "Markdown-formatted text", P, &[]),
    ("html", "HTML-formatted text", P, &[]),
    ("link", "URI pointing elsewhere", P, &[]),
    // Lifecycle
    ("deprecated", "scheduled for removal", ALL, &[]),
    ("experimental", "unstable, may change without notice", ALL, &[]),
    ("beta", "feature-complete but unproven", ALL, &[]),
    ("stable", "subject to compatibility guarantees", ALL, &[]),
    ("legacy", "kept for backward compatibility", ALL, &[]),
    ("read-only", "never written through this model", PHC, &[]),
    // Search
    ("searchable", "participates in text search", PH, &[]),
    ("indexed", "backed by a lookup index", PH, &[]),
    ("sortable", "usable as a sort key", P, &[]),
    ("filterable", "usable as a filter predicate", P, &[]),
    ("faceted", "drives faceted navigation", P, &["filterable"]),
];
