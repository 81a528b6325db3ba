//! # The five-tier data model
//!
//! Catalog → Hierarchy → Entity → Aspect → Property, plus the canonical
//! value types underneath.
//!
//! Design rule: this module is pure data — no I/O, no async, no storage
//! types. Persistence and serialization collaborators walk these types
//! through their public accessors only.

pub mod aspect;
pub mod catalog;
pub mod entity;
pub mod hierarchy;
pub mod property;
pub mod value;

pub use aspect::{Aspect, AspectBuilder, AspectDef};
pub use catalog::{Aspectage, Catalog, CatalogDef, CatalogId, Species};
pub use entity::{Entity, EntityId, LocalId};
pub use hierarchy::{Hierarchy, HierarchyDef, HierarchyKind, TreeNode};
pub use property::{Property, PropertyDef};
pub use value::{Value, ValueType};
