//! In-memory persistence adapter.
//!
//! Reference implementation of `Persistence`: hashbrown maps behind
//! RwLocks, no durability, no transactions. Saves are applied immediately
//! and whole catalogs are stored by value.
//!
//! Use this backend for:
//! - Testing model code that talks to the persistence contract
//! - Embedding the model in applications that don't need durability

use std::sync::Arc;

use async_trait::async_trait;
use hashbrown::HashMap;
use parking_lot::RwLock;
use tracing::debug;

use super::Persistence;
use crate::model::{AspectDef, Catalog, CatalogId, EntityId, Hierarchy};
use crate::{Error, Result};

/// In-memory catalog store.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    catalogs: RwLock<HashMap<CatalogId, Catalog>>,
    /// (catalog, def name) → def, fed by the per-element hook.
    aspect_defs: RwLock<HashMap<(CatalogId, String), AspectDef>>,
    /// (catalog, hierarchy name) → hierarchy, fed by the per-element hook.
    hierarchies: RwLock<HashMap<(CatalogId, String), Hierarchy>>,
    entities: RwLock<HashMap<CatalogId, Vec<EntityId>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn catalog_count(&self) -> usize {
        self.inner.catalogs.read().len()
    }

    /// Entities recorded through the per-element hook for one catalog.
    pub fn saved_entities(&self, catalog: CatalogId) -> Vec<EntityId> {
        self.inner.entities.read().get(&catalog).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl Persistence for MemoryBackend {
    async fn catalog_exists(&self, id: CatalogId) -> Result<bool> {
        Ok(self.inner.catalogs.read().contains_key(&id))
    }

    /// Upsert by id. A save that would *regress* an already-stored
    /// catalog — same id, lower explicit version, different definition —
    /// is an identity conflict: two copies claim the id with divergent
    /// content and the stale one loses.
    async fn save_catalog(&self, catalog: &Catalog) -> Result<()> {
        let mut catalogs = self.inner.catalogs.write();
        if let Some(existing) = catalogs.get(&catalog.id()) {
            if existing.version() > catalog.version()
                && existing.definition() != catalog.definition()
            {
                return Err(Error::IdentityConflict(format!(
                    "catalog {} v{} conflicts with stored v{}",
                    catalog.id(),
                    catalog.version(),
                    existing.version()
                )));
            }
        }
        debug!(id = %catalog.id(), version = catalog.version(), "catalog saved");
        catalogs.insert(catalog.id(), catalog.clone());
        Ok(())
    }

    async fn load_catalog(&self, id: CatalogId) -> Result<Option<Catalog>> {
        Ok(self.inner.catalogs.read().get(&id).cloned())
    }

    async fn delete_catalog(&self, id: CatalogId) -> Result<bool> {
        let removed = self.inner.catalogs.write().remove(&id).is_some();
        // Cascade: everything owned by the catalog goes with it.
        self.inner.aspect_defs.write().retain(|(cat, _), _| *cat != id);
        self.inner.hierarchies.write().retain(|(cat, _), _| *cat != id);
        self.inner.entities.write().remove(&id);
        if removed {
            debug!(id = %id, "catalog deleted");
        }
        Ok(removed)
    }

    async fn save_aspect_def(&self, catalog: CatalogId, def: &AspectDef) -> Result<()> {
        self.inner
            .aspect_defs
            .write()
            .insert((catalog, def.name().to_owned()), def.clone());
        Ok(())
    }

    async fn save_entity(&self, catalog: CatalogId, entity: EntityId) -> Result<()> {
        let mut entities = self.inner.entities.write();
        let list = entities.entry(catalog).or_default();
        if !list.contains(&entity) {
            list.push(entity);
        }
        Ok(())
    }

    async fn save_hierarchy(&self, catalog: CatalogId, hierarchy: &Hierarchy) -> Result<()> {
        self.inner
            .hierarchies
            .write()
            .insert((catalog, hierarchy.name().to_owned()), hierarchy.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn sink() -> Catalog {
        Catalog::sink_of(Url::parse("urn:test:db").unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_save_load_delete_cycle() {
        let backend = MemoryBackend::new();
        let catalog = sink();
        let id = catalog.id();

        assert!(!backend.catalog_exists(id).await.unwrap());
        backend.save_catalog(&catalog).await.unwrap();
        assert!(backend.catalog_exists(id).await.unwrap());

        let loaded = backend.load_catalog(id).await.unwrap().unwrap();
        assert_eq!(loaded, catalog);

        assert!(backend.delete_catalog(id).await.unwrap());
        assert!(!backend.delete_catalog(id).await.unwrap());
        assert!(backend.load_catalog(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stale_divergent_save_conflicts() {
        let backend = MemoryBackend::new();
        let mut newer = sink();
        let stale = newer.clone();

        newer
            .register_hierarchy(crate::model::Hierarchy::entity_set("s"))
            .unwrap();
        newer.touch();
        backend.save_catalog(&newer).await.unwrap();

        let err = backend.save_catalog(&stale).await.unwrap_err();
        assert!(matches!(err, Error::IdentityConflict(_)));

        // Saving the same newer state again is fine.
        backend.save_catalog(&newer).await.unwrap();
    }

    #[tokio::test]
    async fn test_element_hooks_and_cascade() {
        let backend = MemoryBackend::new();
        let catalog = sink();
        let id = catalog.id();
        backend.save_catalog(&catalog).await.unwrap();

        let entity = EntityId::new();
        backend.save_entity(id, entity).await.unwrap();
        backend.save_entity(id, entity).await.unwrap();
        assert_eq!(backend.saved_entities(id), vec![entity]);

        backend
            .save_hierarchy(id, &Hierarchy::entity_dir("by-name"))
            .await
            .unwrap();

        backend.delete_catalog(id).await.unwrap();
        assert!(backend.saved_entities(id).is_empty());
    }
}
