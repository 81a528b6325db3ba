//! End-to-end integration tests for the persistence contract.
//!
//! Exercises the MemoryBackend through the Persistence trait object
//! surface: lifecycle, stale-save conflict, cascade delete, per-element
//! hooks, and value-to-storage conversion.

use std::sync::Arc;

use cheap_rs::{
    Aspect, AspectDef, Catalog, Entity, EntityId, Error, Hierarchy, MemoryBackend, Persistence,
    PropertyDef, Value, ValueType,
};
use url::Url;

// ============================================================================
// Helper: a sink catalog with a person aspect map.
// ============================================================================

fn seeded() -> (Catalog, EntityId) {
    let locator = Url::parse("postgres://db.example.org/store").unwrap();
    let mut catalog = Catalog::sink_of(locator).unwrap();

    let person = AspectDef::immutable(
        "app.person",
        [PropertyDef::new("name", ValueType::String).required()],
    )
    .unwrap();
    catalog.register_aspect_def(person.clone()).unwrap();
    catalog.register_hierarchy(Hierarchy::aspect_map(&person)).unwrap();

    let ada = EntityId::new();
    let aspect = Aspect::builder(&person, ada)
        .set("name", "Ada")
        .unwrap()
        .build()
        .unwrap();
    catalog.with_hierarchy_mut("app.person", true, |h| h.aspect_put(aspect)).unwrap();
    (catalog, ada)
}

// ============================================================================
// 1. Lifecycle through a trait object
// ============================================================================

#[tokio::test]
async fn test_lifecycle_through_dyn_persistence() {
    let backend: Arc<dyn Persistence> = Arc::new(MemoryBackend::new());
    let (catalog, ada) = seeded();
    let id = catalog.id();

    assert!(!backend.catalog_exists(id).await.unwrap());
    backend.save_catalog(&catalog).await.unwrap();
    assert!(backend.catalog_exists(id).await.unwrap());

    let loaded = backend.load_catalog(id).await.unwrap().unwrap();
    assert_eq!(loaded, catalog);
    let aspect = loaded
        .hierarchy("app.person")
        .unwrap()
        .aspect_get(ada)
        .unwrap()
        .unwrap();
    assert_eq!(aspect.get("name").unwrap().as_str(), Some("Ada"));

    assert!(backend.delete_catalog(id).await.unwrap());
    assert!(!backend.delete_catalog(id).await.unwrap());
    assert!(backend.load_catalog(id).await.unwrap().is_none());
}

// ============================================================================
// 2. Stale save with a divergent definition is a conflict
// ============================================================================

#[tokio::test]
async fn test_stale_divergent_save_conflicts() {
    let backend = MemoryBackend::new();
    let (mut catalog, _) = seeded();
    let stale = catalog.clone();

    catalog.register_hierarchy(Hierarchy::entity_list("roster")).unwrap();
    catalog.touch();
    backend.save_catalog(&catalog).await.unwrap();

    // Same id, lower version, different definition.
    let err = backend.save_catalog(&stale).await.unwrap_err();
    assert!(matches!(err, Error::IdentityConflict(_)));

    // A re-save of the current state is a plain upsert.
    backend.save_catalog(&catalog).await.unwrap();
    assert_eq!(backend.catalog_count(), 1);
}

// ============================================================================
// 3. Per-element hooks and cascade delete
// ============================================================================

#[tokio::test]
async fn test_per_element_saves_and_cascade() {
    let backend = MemoryBackend::new();
    let (catalog, _) = seeded();
    let id = catalog.id();

    backend.save_catalog(&catalog).await.unwrap();

    let ada = Entity::eager();
    let grace = Entity::eager();
    for e in [&ada, &grace] {
        let gid = e.global_id().unwrap();
        backend.save_entity(id, gid).await.unwrap();
        // Saving the same entity twice must not duplicate it.
        backend.save_entity(id, gid).await.unwrap();
    }
    assert_eq!(backend.saved_entities(id).len(), 2);

    backend.delete_catalog(id).await.unwrap();
    assert!(backend.saved_entities(id).is_empty());
    assert_eq!(backend.catalog_count(), 0);
}

// ============================================================================
// 4. Entity identity strategies interact with per-element save
// ============================================================================

#[tokio::test]
async fn test_identity_strategies() {
    let backend = MemoryBackend::new();
    let (catalog, _) = seeded();
    backend.save_catalog(&catalog).await.unwrap();

    // Local-only entities never produce a persistable global id.
    let scratch = Entity::local_only();
    assert!(scratch.global_id().is_none());
    assert!(scratch.local().is_some());

    // A lazy entity mints its id on first observation and keeps it.
    let lazy = Entity::lazy();
    let first = lazy.global_id().unwrap();
    assert_eq!(lazy.global_id().unwrap(), first);
    backend.save_entity(catalog.id(), first).await.unwrap();
    assert_eq!(backend.saved_entities(catalog.id()), vec![first]);
}

// ============================================================================
// 5. Value-to-storage defaults
// ============================================================================

#[tokio::test]
async fn test_value_to_storage_defaults() {
    let backend = MemoryBackend::new();

    let s = backend
        .value_to_storage(ValueType::Integer, &Value::Integer(42))
        .unwrap();
    assert_eq!(s, "42");

    let s = backend
        .value_to_storage(ValueType::Blob, &Value::Blob(vec![0xde, 0xad]))
        .unwrap();
    assert_eq!(s, "dead");

    let s = backend
        .value_to_storage(ValueType::Integer, &Value::Null)
        .unwrap();
    assert_eq!(s, "null");

    let s = backend
        .value_to_storage(
            ValueType::String,
            &Value::List(vec![Value::from("a"), Value::from("b")]),
        )
        .unwrap();
    assert_eq!(s, r#"["a","b"]"#);

    // A non-canonical scalar never silently converts at storage time.
    let err = backend
        .value_to_storage(ValueType::Integer, &Value::from("42"))
        .unwrap_err();
    assert!(matches!(err, Error::Coercion { .. }));
}
