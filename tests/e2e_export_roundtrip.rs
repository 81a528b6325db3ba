//! End-to-end integration tests for structural JSON export.
//!
//! A populated catalog — one of each hierarchy kind, defs, aspects — is
//! serialized and read back, and the reloaded graph must be structurally
//! identical to the original.

use cheap_rs::{export, Aspect, AspectDef, Catalog, EntityId, Hierarchy, PropertyDef, Value, ValueType};
use pretty_assertions::assert_eq;
use url::Url;

// ============================================================================
// Helper: a catalog exercising every hierarchy kind.
// ============================================================================

fn populated_catalog() -> (Catalog, EntityId) {
    let locator = Url::parse("postgres://db.example.org/export").unwrap();
    let mut catalog = Catalog::sink_of(locator).unwrap();

    let person = AspectDef::immutable(
        "app.person",
        [
            PropertyDef::new("name", ValueType::String).required(),
            PropertyDef::new("age", ValueType::Integer),
            PropertyDef::new("tags", ValueType::String).multivalued(),
        ],
    )
    .unwrap();
    catalog.register_aspect_def(person.clone()).unwrap();

    catalog.register_hierarchy(Hierarchy::entity_list("roster")).unwrap();
    catalog.register_hierarchy(Hierarchy::entity_set("members")).unwrap();
    catalog.register_hierarchy(Hierarchy::entity_dir("by-email")).unwrap();
    catalog.register_hierarchy(Hierarchy::entity_tree("org-chart")).unwrap();
    catalog.register_hierarchy(Hierarchy::aspect_map(&person)).unwrap();

    let ada = EntityId::new();
    let grace = EntityId::new();

    catalog.with_hierarchy_mut("roster", true, |h| {
        h.list_push(ada)?;
        h.list_push(grace)
    })
    .unwrap();
    catalog.with_hierarchy_mut("members", true, |h| {
        h.set_add(ada)?;
        h.set_add(grace)?;
        Ok(())
    })
    .unwrap();
    catalog.with_hierarchy_mut("by-email", true, |h| {
        h.dir_put("ada@example.org", ada)
    })
    .unwrap();
    catalog.with_hierarchy_mut("org-chart", true, |h| {
        h.tree_insert(&[], "engineering", Some(ada))?;
        h.tree_insert(&["engineering"], "compilers", Some(grace))
    })
    .unwrap();

    let aspect = Aspect::builder(&person, ada)
        .set("name", "Ada Lovelace")
        .unwrap()
        .set("age", 36)
        .unwrap()
        .set("tags", vec![Value::from("founder"), Value::from("mathematician")])
        .unwrap()
        .build()
        .unwrap();
    catalog.with_hierarchy_mut("app.person", true, |h| h.aspect_put(aspect)).unwrap();

    (catalog, ada)
}

// ============================================================================
// 1. Full structural round trip
// ============================================================================

#[test]
fn test_round_trip_is_structurally_identical() {
    let (catalog, _) = populated_catalog();
    let json = export::to_json(&catalog).unwrap();
    let reloaded = export::from_json(&json).unwrap();

    assert_eq!(reloaded, catalog);
    assert_eq!(reloaded.id(), catalog.id());
    assert_eq!(reloaded.species(), catalog.species());
    assert_eq!(reloaded.version(), catalog.version());
    assert_eq!(reloaded.definition(), catalog.definition());
}

#[test]
fn test_round_trip_preserves_hierarchy_contents() {
    let (catalog, ada) = populated_catalog();
    let reloaded = export::from_json(&export::to_json(&catalog).unwrap()).unwrap();

    let roster = reloaded.hierarchy("roster").unwrap();
    assert_eq!(roster.list_get(0).unwrap(), Some(ada));

    let members = reloaded.hierarchy("members").unwrap();
    assert!(members.set_contains(ada).unwrap());

    let dir = reloaded.hierarchy("by-email").unwrap();
    assert_eq!(dir.dir_get("ada@example.org").unwrap(), Some(ada));

    let chart = reloaded.hierarchy("org-chart").unwrap();
    let node = chart.tree_get(&["engineering", "compilers"]).unwrap().unwrap();
    assert!(node.entity.is_some());

    let map = reloaded.hierarchy("app.person").unwrap();
    let aspect = map.aspect_get(ada).unwrap().unwrap();
    assert_eq!(aspect.get("name").unwrap().as_str(), Some("Ada Lovelace"));
    assert_eq!(aspect.get("age").unwrap().as_integer(), Some(36));
    assert_eq!(aspect.get("tags").unwrap().as_list().unwrap().len(), 2);
}

// ============================================================================
// 2. Writer output ends with a newline and parses back
// ============================================================================

#[test]
fn test_write_json_to_buffer() {
    let (catalog, _) = populated_catalog();
    let mut buf = Vec::new();
    export::write_json(&catalog, &mut buf).unwrap();

    let text = String::from_utf8(buf).unwrap();
    assert!(text.ends_with('\n'));
    assert_eq!(export::from_json(&text).unwrap(), catalog);
}

// ============================================================================
// 3. Value edge cases survive serialization
// ============================================================================

#[test]
fn test_tagged_values_survive() {
    let locator = Url::parse("postgres://db.example.org/values").unwrap();
    let mut catalog = Catalog::sink_of(locator).unwrap();

    let blobby = AspectDef::immutable(
        "app.blobby",
        [
            PropertyDef::new("payload", ValueType::Blob).required(),
            PropertyDef::new("ledger", ValueType::BigInteger),
        ],
    )
    .unwrap();
    catalog.register_aspect_def(blobby.clone()).unwrap();
    catalog.register_hierarchy(Hierarchy::aspect_map(&blobby)).unwrap();

    let id = EntityId::new();
    let aspect = Aspect::builder(&blobby, id)
        .set("payload", Value::Blob(vec![0, 1, 2, 255]))
        .unwrap()
        .set("ledger", "987654321987654321987654321")
        .unwrap()
        .build()
        .unwrap();
    catalog.with_hierarchy_mut("app.blobby", true, |h| h.aspect_put(aspect)).unwrap();

    let reloaded = export::from_json(&export::to_json(&catalog).unwrap()).unwrap();
    let stored = reloaded
        .hierarchy("app.blobby")
        .unwrap()
        .aspect_get(id)
        .unwrap()
        .unwrap();
    assert_eq!(stored.get("payload").unwrap().as_bytes(), Some(&[0u8, 1, 2, 255][..]));
    assert_eq!(
        stored.get("ledger"),
        Some(&Value::BigInteger("987654321987654321987654321".to_owned()))
    );
}
