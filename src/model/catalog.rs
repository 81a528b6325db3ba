//! Catalog — the top-level container.
//!
//! A Catalog is a cache or working copy of data that durably lives
//! elsewhere. Its species is fixed at construction and determines the
//! relationship:
//!
//! | Species | Relates to | Discipline |
//! |---------|-----------|------------|
//! | `Source` | external source | read-only cache |
//! | `Sink` | external source | read-write working copy |
//! | `Mirror` | upstream catalog | read-only, identical definition |
//! | `Cache` | upstream catalog | write-through, possibly buffered |
//! | `Clone` | upstream catalog | manual-sync write-back |
//! | `Fork` | nothing (transient) | severed copy, destined for Source/Sink |
//!
//! Construction enforces the locator-XOR-upstream invariant. Destroying a
//! Catalog cascades through ownership: hierarchies, aspects, and values are
//! all owned by the catalog and drop with it.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;
use url::Url;
use uuid::Uuid;

use super::aspect::AspectDef;
use super::hierarchy::{Hierarchy, HierarchyDef, HierarchyKind};
use crate::{Error, Result};

/// Global catalog identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CatalogId(pub Uuid);

impl CatalogId {
    pub fn new() -> Self {
        CatalogId(Uuid::new_v4())
    }
}

impl Default for CatalogId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CatalogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A catalog's caching relationship, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Species {
    Source,
    Sink,
    Mirror,
    Cache,
    Clone,
    Fork,
}

impl Species {
    pub fn name(&self) -> &'static str {
        match self {
            Species::Source => "SOURCE",
            Species::Sink => "SINK",
            Species::Mirror => "MIRROR",
            Species::Cache => "CACHE",
            Species::Clone => "CLONE",
            Species::Fork => "FORK",
        }
    }

    /// Source/Sink cache an external data source.
    pub fn uses_external_source(&self) -> bool {
        matches!(self, Species::Source | Species::Sink)
    }

    /// Mirror/Cache/Clone relate to an upstream catalog.
    pub fn uses_upstream(&self) -> bool {
        matches!(self, Species::Mirror | Species::Cache | Species::Clone)
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Aspectage — the AspectDef directory
// ============================================================================

/// Directory of all AspectDefs known to one Catalog.
///
/// An explicit per-catalog registry object, not a process-wide table.
/// Registration under an already-taken full name succeeds only when the
/// incoming def is structurally identical to the registered one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Aspectage {
    defs: BTreeMap<String, AspectDef>,
}

impl Aspectage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a def, returning a reference to the registered instance
    /// (the already-present one when a structural twin arrives).
    pub fn register(&mut self, def: AspectDef) -> Result<&AspectDef> {
        if let Some(existing) = self.defs.get(def.name()) {
            if existing.structurally_equal(&def) {
                return Ok(&self.defs[def.name()]);
            }
            return Err(Error::SchemaViolation(format!(
                "aspect def '{}' is already registered with a different shape",
                def.name()
            )));
        }
        debug!(name = def.name(), hash = %def.content_hash(), "registering aspect def");
        let name = def.name().to_owned();
        self.defs.insert(name.clone(), def);
        Ok(&self.defs[&name])
    }

    pub fn get(&self, name: &str) -> Option<&AspectDef> {
        self.defs.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.defs.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AspectDef> {
        self.defs.values()
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}

// ============================================================================
// CatalogDef — the definition object
// ============================================================================

/// Structural definition of a catalog: hierarchy definitions plus the
/// content-hash version of every registered AspectDef. This is what the
/// MIRROR equality check compares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogDef {
    pub hierarchies: BTreeMap<String, HierarchyDef>,
    pub aspect_defs: BTreeMap<String, String>,
}

impl CatalogDef {
    /// Content hash of the whole definition.
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        for (name, def) in &self.hierarchies {
            hasher.update(name.as_bytes());
            hasher.update(def.kind.name().as_bytes());
            hasher.update([def.modifiable as u8]);
        }
        for (name, hash) in &self.aspect_defs {
            hasher.update(name.as_bytes());
            hasher.update(hash.as_bytes());
        }
        let digest = hasher.finalize();
        digest.iter().map(|b| format!("{b:02x}")).collect()
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// The top-level container: owns an Aspectage and a set of named
/// hierarchies, and carries an explicit manually-incremented version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    id: CatalogId,
    species: Species,
    source: Option<Url>,
    upstream: Option<CatalogId>,
    version: u64,
    aspectage: Aspectage,
    hierarchies: BTreeMap<String, Hierarchy>,
}

impl Catalog {
    /// Construct a catalog, enforcing the species invariant:
    /// an external-source locator *or* an upstream reference, never both,
    /// and never neither except for the transient Fork.
    pub fn new(
        species: Species,
        source: Option<Url>,
        upstream: Option<CatalogId>,
    ) -> Result<Self> {
        match (species, &source, &upstream) {
            (_, Some(_), Some(_)) => {
                return Err(Error::InvariantViolation(format!(
                    "{species} catalog cannot have both an external source and an upstream"
                )));
            }
            (Species::Fork, None, None) => {}
            (s, None, None) => {
                return Err(Error::InvariantViolation(format!(
                    "{s} catalog needs an external source or an upstream"
                )));
            }
            (s, Some(_), None) if !s.uses_external_source() => {
                return Err(Error::InvariantViolation(format!(
                    "{s} catalog cannot use an external source locator"
                )));
            }
            (s, None, Some(_)) if !s.uses_upstream() => {
                return Err(Error::InvariantViolation(format!(
                    "{s} catalog cannot reference an upstream catalog"
                )));
            }
            _ => {}
        }
        let catalog = Self {
            id: CatalogId::new(),
            species,
            source,
            upstream,
            version: 0,
            aspectage: Aspectage::new(),
            hierarchies: BTreeMap::new(),
        };
        debug!(id = %catalog.id, species = %species, "catalog created");
        Ok(catalog)
    }

    /// Read-only cache of an external source.
    pub fn source_of(locator: Url) -> Result<Self> {
        Self::new(Species::Source, Some(locator), None)
    }

    /// Read-write working copy of an external source.
    pub fn sink_of(locator: Url) -> Result<Self> {
        Self::new(Species::Sink, Some(locator), None)
    }

    /// Read-only mirror of an upstream catalog.
    pub fn mirror_of(upstream: CatalogId) -> Result<Self> {
        Self::new(Species::Mirror, None, Some(upstream))
    }

    /// Write-through cache of an upstream catalog.
    pub fn cache_of(upstream: CatalogId) -> Result<Self> {
        Self::new(Species::Cache, None, Some(upstream))
    }

    /// Manual-sync write-back copy of an upstream catalog.
    pub fn clone_of(upstream: CatalogId) -> Result<Self> {
        Self::new(Species::Clone, None, Some(upstream))
    }

    pub fn id(&self) -> CatalogId {
        self.id
    }

    pub fn species(&self) -> Species {
        self.species
    }

    pub fn source(&self) -> Option<&Url> {
        self.source.as_ref()
    }

    pub fn upstream(&self) -> Option<CatalogId> {
        self.upstream
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Explicit version bump. Hierarchy mutations never do this on their
    /// own; propagation is always requested.
    pub fn touch(&mut self) -> u64 {
        self.version += 1;
        self.version
    }

    /// A detached fork: no source, no upstream, contents copied.
    /// Tri-state lifecycle: promote it into a Source/Sink, or drop it —
    /// a never-promoted fork simply never becomes durable.
    pub fn fork(&self) -> Catalog {
        let fork = Catalog {
            id: CatalogId::new(),
            species: Species::Fork,
            source: None,
            upstream: None,
            version: 0,
            aspectage: self.aspectage.clone(),
            hierarchies: self.hierarchies.clone(),
        };
        debug!(from = %self.id, fork = %fork.id, "catalog forked");
        fork
    }

    /// Turn a fork into a Source/Sink bound to a fresh locator.
    pub fn promote(mut self, species: Species, locator: Url) -> Result<Catalog> {
        if self.species != Species::Fork {
            return Err(Error::InvariantViolation(format!(
                "only a FORK can be promoted, this catalog is {}",
                self.species
            )));
        }
        if !species.uses_external_source() {
            return Err(Error::InvariantViolation(format!(
                "a fork promotes to SOURCE or SINK, not {species}"
            )));
        }
        debug!(id = %self.id, to = %species, "fork promoted");
        self.species = species;
        self.source = Some(locator);
        Ok(self)
    }

    // ========================================================================
    // Aspectage
    // ========================================================================

    pub fn aspectage(&self) -> &Aspectage {
        &self.aspectage
    }

    pub fn register_aspect_def(&mut self, def: AspectDef) -> Result<&AspectDef> {
        self.aspectage.register(def)
    }

    pub fn aspect_def(&self, name: &str) -> Option<&AspectDef> {
        self.aspectage.get(name)
    }

    // ========================================================================
    // Hierarchies
    // ========================================================================

    /// Register a hierarchy under its name, which must be free. An
    /// AspectMap additionally requires its AspectDef to be registered in
    /// the Aspectage first.
    pub fn register_hierarchy(&mut self, hierarchy: Hierarchy) -> Result<&Hierarchy> {
        if self.hierarchies.contains_key(hierarchy.name()) {
            return Err(Error::SchemaViolation(format!(
                "hierarchy '{}' already exists in catalog {}",
                hierarchy.name(),
                self.id
            )));
        }
        if hierarchy.kind() == HierarchyKind::AspectMap
            && !self.aspectage.contains(hierarchy.name())
        {
            return Err(Error::SchemaViolation(format!(
                "aspect map '{}' has no registered aspect def",
                hierarchy.name()
            )));
        }
        debug!(catalog = %self.id, name = hierarchy.name(), kind = hierarchy.kind().name(),
               "hierarchy registered");
        let name = hierarchy.name().to_owned();
        self.hierarchies.insert(name.clone(), hierarchy);
        Ok(&self.hierarchies[&name])
    }

    pub fn hierarchy(&self, name: &str) -> Option<&Hierarchy> {
        self.hierarchies.get(name)
    }

    /// Mutable access without catalog-version propagation.
    pub fn hierarchy_mut(&mut self, name: &str) -> Option<&mut Hierarchy> {
        self.hierarchies.get_mut(name)
    }

    /// Run a mutation against one hierarchy; when `propagate` is set and
    /// the mutation succeeds, the catalog version is bumped too.
    pub fn with_hierarchy_mut<T>(
        &mut self,
        name: &str,
        propagate: bool,
        f: impl FnOnce(&mut Hierarchy) -> Result<T>,
    ) -> Result<T> {
        let hierarchy = self
            .hierarchies
            .get_mut(name)
            .ok_or_else(|| Error::NotFound(format!("hierarchy '{name}'")))?;
        let out = f(hierarchy)?;
        if propagate {
            self.version += 1;
        }
        Ok(out)
    }

    pub fn remove_hierarchy(&mut self, name: &str) -> Option<Hierarchy> {
        self.hierarchies.remove(name)
    }

    pub fn hierarchies(&self) -> impl Iterator<Item = &Hierarchy> {
        self.hierarchies.values()
    }

    pub fn hierarchy_names(&self) -> impl Iterator<Item = &str> {
        self.hierarchies.keys().map(String::as_str)
    }

    // ========================================================================
    // Definition & sync
    // ========================================================================

    /// The definition object: hierarchy defs plus AspectDef hash versions.
    pub fn definition(&self) -> CatalogDef {
        CatalogDef {
            hierarchies: self
                .hierarchies
                .iter()
                .map(|(name, h)| (name.clone(), h.definition()))
                .collect(),
            aspect_defs: self
                .aspectage
                .iter()
                .map(|def| (def.name().to_owned(), def.content_hash()))
                .collect(),
        }
    }

    /// Sync-time structural check against the upstream catalog.
    ///
    /// Verifies that `upstream` really is this catalog's upstream, and —
    /// for a MIRROR — that the two definitions are structurally equal.
    /// This runs at every sync, not just at construction: an upstream that
    /// grew an AspectDef after the mirror was built fails here.
    pub fn verify_sync(&self, upstream: &Catalog) -> Result<()> {
        match self.upstream {
            Some(expected) if expected == upstream.id => {}
            Some(expected) => {
                return Err(Error::IdentityConflict(format!(
                    "catalog {} expected upstream {expected}, got {}",
                    self.id, upstream.id
                )));
            }
            None => {
                return Err(Error::InvariantViolation(format!(
                    "{} catalog {} has no upstream to sync from",
                    self.species, self.id
                )));
            }
        }
        if self.species == Species::Mirror && self.definition() != upstream.definition() {
            return Err(Error::InvariantViolation(format!(
                "mirror {} definition diverged from upstream {}",
                self.id, upstream.id
            )));
        }
        Ok(())
    }
}
