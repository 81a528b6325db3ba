//! # Persistence collaborator contract
//!
//! Durability is delegated entirely to external relational backends; the
//! model only ever talks to this trait. Backend adapters own schema
//! creation, type-affinity mapping, and transactional rollback — none of
//! that leaks in here.
//!
//! | Backend | Module | Description |
//! |---------|--------|-------------|
//! | `MemoryBackend` | `memory` | In-memory reference adapter for tests/embedding |

pub mod memory;

use async_trait::async_trait;

use crate::model::{AspectDef, Catalog, CatalogId, EntityId, Hierarchy, Value, ValueType};
use crate::{Error, Result};

pub use memory::MemoryBackend;

/// The persistence contract consumed by the model.
///
/// Whole-catalog operations are required; per-element save hooks default
/// to "not supported" for adapters that only persist catalogs wholesale.
#[async_trait]
pub trait Persistence: Send + Sync + 'static {
    // ========================================================================
    // Catalog lifecycle
    // ========================================================================

    async fn catalog_exists(&self, id: CatalogId) -> Result<bool>;

    /// Persist a catalog, replacing any previously saved state for its id.
    async fn save_catalog(&self, catalog: &Catalog) -> Result<()>;

    /// Load a catalog. `None` if the id was never saved.
    async fn load_catalog(&self, id: CatalogId) -> Result<Option<Catalog>>;

    /// Delete a catalog and everything it owns. Returns true if it existed.
    async fn delete_catalog(&self, id: CatalogId) -> Result<bool>;

    // ========================================================================
    // Per-element save hooks
    // ========================================================================

    /// Persist one aspect def of a catalog.
    ///
    /// Default returns "not supported" — wholesale adapters don't need it.
    async fn save_aspect_def(&self, _catalog: CatalogId, _def: &AspectDef) -> Result<()> {
        Err(Error::Storage("per-element aspect def save not supported".into()))
    }

    /// Persist one entity id of a catalog.
    async fn save_entity(&self, _catalog: CatalogId, _entity: EntityId) -> Result<()> {
        Err(Error::Storage("per-element entity save not supported".into()))
    }

    /// Persist one hierarchy of a catalog.
    async fn save_hierarchy(&self, _catalog: CatalogId, _hierarchy: &Hierarchy) -> Result<()> {
        Err(Error::Storage("per-element hierarchy save not supported".into()))
    }

    // ========================================================================
    // Value-to-storage conversion
    // ========================================================================

    /// Convert a canonical value to its storage string, keyed by type.
    ///
    /// The default covers all twelve types: the canonical string form for
    /// scalars (hex for BLOB, RFC 3339 for DateTime), `"null"` for null,
    /// and a JSON array of element strings for multivalue lists. Adapters
    /// override per-type when their backend wants different affinities.
    fn value_to_storage(&self, ty: ValueType, value: &Value) -> Result<String> {
        match value {
            Value::Null => Ok("null".to_owned()),
            Value::List(items) => {
                let mut parts = Vec::with_capacity(items.len());
                for item in items {
                    if !item.is_canonical(ty) {
                        return Err(Error::Coercion {
                            target: ty.name(),
                            message: format!(
                                "list element {} is not canonical",
                                item.type_name()
                            ),
                        });
                    }
                    parts.push(item.to_string());
                }
                Ok(serde_json::to_string(&parts)?)
            }
            scalar if scalar.is_canonical(ty) => Ok(scalar.to_string()),
            other => Err(Error::Coercion {
                target: ty.name(),
                message: format!("{} is not canonical", other.type_name()),
            }),
        }
    }
}
