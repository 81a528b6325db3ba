//! Entity — a bare identity with no inherent data.
//!
//! Everything an Entity "is" lives in Aspects attached to it; the Entity
//! itself only answers the identity contract: `global_id()` and `local()`.
//! Three strategies differ in *when* the global identifier is produced:
//!
//! | Strategy | Global id | Local ref | Use case |
//! |----------|-----------|-----------|----------|
//! | Eager | at construction | none | cross-catalog sharing |
//! | Lazy | on first access | yes | avoid UUID churn for short-lived entities |
//! | Local | never | yes | strictly same-process data |

use std::fmt;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Global 128-bit entity identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub Uuid);

impl EntityId {
    pub fn new() -> Self {
        EntityId(Uuid::new_v4())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Process-local reference for fast same-process access.
///
/// Never leaves the process: it is not serialized and two processes may
/// reuse the same numeric value for different entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocalId(pub u64);

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "~{}", self.0)
    }
}

static NEXT_LOCAL: AtomicU64 = AtomicU64::new(1);

fn next_local() -> LocalId {
    LocalId(NEXT_LOCAL.fetch_add(1, Ordering::Relaxed))
}

/// An entity with one of the three identity strategies.
///
/// The lazy variant materializes its global id through an init-once cell:
/// concurrent first readers all observe the same generated UUID and the
/// initializer runs at most once.
#[derive(Debug)]
pub enum Entity {
    /// Global id generated at construction.
    Eager { id: EntityId },
    /// Global id generated on first `global_id()` call.
    Lazy {
        id: OnceLock<EntityId>,
        local: LocalId,
    },
    /// Local-only; no global promotion path.
    Local { local: LocalId },
}

impl Entity {
    /// Entity with an eagerly generated global id.
    pub fn eager() -> Self {
        Entity::Eager { id: EntityId::new() }
    }

    /// Entity adopting an existing global id (e.g. loaded from upstream).
    pub fn with_id(id: EntityId) -> Self {
        Entity::Eager { id }
    }

    /// Entity whose global id materializes on first access.
    pub fn lazy() -> Self {
        Entity::Lazy {
            id: OnceLock::new(),
            local: next_local(),
        }
    }

    /// Entity that never gets a global id.
    pub fn local_only() -> Self {
        Entity::Local { local: next_local() }
    }

    /// The global identifier, generating it if this entity is lazy.
    /// `None` only for local-only entities.
    pub fn global_id(&self) -> Option<EntityId> {
        match self {
            Entity::Eager { id } => Some(*id),
            Entity::Lazy { id, .. } => Some(*id.get_or_init(EntityId::new)),
            Entity::Local { .. } => None,
        }
    }

    /// The local reference, if this entity carries one.
    pub fn local(&self) -> Option<LocalId> {
        match self {
            Entity::Eager { .. } => None,
            Entity::Lazy { local, .. } | Entity::Local { local } => Some(*local),
        }
    }

    /// Whether a global id exists *right now*, without materializing one.
    pub fn has_global_id(&self) -> bool {
        match self {
            Entity::Eager { .. } => true,
            Entity::Lazy { id, .. } => id.get().is_some(),
            Entity::Local { .. } => false,
        }
    }
}

impl Clone for Entity {
    fn clone(&self) -> Self {
        match self {
            Entity::Eager { id } => Entity::Eager { id: *id },
            Entity::Lazy { id, local } => Entity::Lazy {
                id: id.clone(),
                local: *local,
            },
            Entity::Local { local } => Entity::Local { local: *local },
        }
    }
}
