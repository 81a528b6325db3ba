//! # cheap-rs — Schema-Flexible Structured-Data Model
//!
//! A five-tier object graph — Catalog → Hierarchy → Entity → Aspect →
//! Property — with strict per-record schema enforcement, a twelve-type
//! canonical value system, and a self-hosted tag taxonomy.
//!
//! ## Design Principles
//!
//! 1. **Passive data**: the model is a plain data structure; callers bring
//!    their own threads and their own transaction boundaries
//! 2. **Trait at the durability seam**: `Persistence` is the contract
//!    between model and storage — no SQL, no schema, no dialect in here
//! 3. **Tagged values**: every property value is one variant of `Value`,
//!    so coercion is exhaustively checked at compile time
//! 4. **Self-hosted metadata**: tags are Entities carrying Aspects, stored
//!    with the same primitives they describe
//!
//! ## Quick Start
//!
//! ```rust
//! use cheap_rs::{Aspect, AspectDef, Catalog, EntityId, Hierarchy, PropertyDef, ValueType};
//!
//! # fn example() -> cheap_rs::Result<()> {
//! let locator = url::Url::parse("postgres://db.example.org/app").unwrap();
//! let mut catalog = Catalog::sink_of(locator)?;
//!
//! let person = AspectDef::immutable(
//!     "app.person",
//!     [PropertyDef::new("name", ValueType::String).required()],
//! )?;
//! catalog.register_aspect_def(person.clone())?;
//! catalog.register_hierarchy(Hierarchy::aspect_map(&person))?;
//!
//! let ada = EntityId::new();
//! catalog.with_hierarchy_mut("app.person", true, |h| {
//!     h.aspect_put(Aspect::builder(&person, ada).set("name", "Ada")?.build()?)
//! })?;
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod coerce;
pub mod export;
pub mod model;
pub mod storage;
pub mod tag;

// ============================================================================
// Re-exports: Model (the DTOs)
// ============================================================================

pub use model::{
    Aspect, AspectBuilder, AspectDef, Aspectage, Catalog, CatalogDef, CatalogId, Entity,
    EntityId, Hierarchy, HierarchyDef, HierarchyKind, LocalId, Property, PropertyDef, Species,
    TreeNode, Value, ValueType,
};

// ============================================================================
// Re-exports: Coercion
// ============================================================================

pub use coerce::Coercer;

// ============================================================================
// Re-exports: Tags
// ============================================================================

pub use tag::{ElementKind, TagDefinition, TagId, TagRegistry, TagScope};

// ============================================================================
// Re-exports: Storage
// ============================================================================

pub use storage::{MemoryBackend, Persistence};

// ============================================================================
// Error Types
// ============================================================================

/// Every local, synchronous failure the model can return. Failures never
/// retry and never downgrade to a default value; a method either fully
/// succeeds or leaves the model untouched.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Schema violation: {0}")]
    SchemaViolation(String),

    #[error("Coercion failure: cannot coerce to {target}: {message}")]
    Coercion { target: &'static str, message: String },

    #[error("Property '{0}' cannot be null")]
    NullViolation(String),

    #[error("Identity conflict: {0}")]
    IdentityConflict(String),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Tag validation failure: {0}")]
    TagValidation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
