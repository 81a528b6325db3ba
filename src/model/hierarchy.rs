//! Hierarchies — named, typed indexes over Entities and Aspects.
//!
//! | Kind | Shape | Duplicates | Key |
//! |------|-------|------------|-----|
//! | `EntityList` | ordered sequence | allowed | position |
//! | `EntitySet` | ordered unique collection | unique ids | membership |
//! | `EntityDir` | string → entity id | unique keys | string |
//! | `EntityTree` | named-node tree | unique child name per parent | path |
//! | `AspectMap` | entity id → Aspect of one def | one per entity | entity id |
//!
//! A hierarchy lives inside exactly one Catalog, has no global identity of
//! its own, and is versioned independently of its Catalog: every content
//! mutation bumps the hierarchy version only.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::aspect::{Aspect, AspectDef};
use super::entity::EntityId;
use crate::{Error, Result};

/// The five hierarchy kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HierarchyKind {
    EntityList,
    EntitySet,
    EntityDir,
    EntityTree,
    AspectMap,
}

impl HierarchyKind {
    pub fn name(&self) -> &'static str {
        match self {
            HierarchyKind::EntityList => "ENTITY_LIST",
            HierarchyKind::EntitySet => "ENTITY_SET",
            HierarchyKind::EntityDir => "ENTITY_DIR",
            HierarchyKind::EntityTree => "ENTITY_TREE",
            HierarchyKind::AspectMap => "ASPECT_MAP",
        }
    }
}

/// Definition-level view of a hierarchy: what the Catalog definition
/// object records, without the contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyDef {
    pub name: String,
    pub kind: HierarchyKind,
    pub modifiable: bool,
}

/// A node in an `EntityTree`. Interior and leaf nodes may both hold an
/// entity id; child names are unique per parent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    pub entity: Option<EntityId>,
    children: BTreeMap<String, TreeNode>,
}

impl TreeNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entity(entity: EntityId) -> Self {
        Self { entity: Some(entity), children: BTreeMap::new() }
    }

    pub fn child(&self, name: &str) -> Option<&TreeNode> {
        self.children.get(name)
    }

    pub fn child_names(&self) -> impl Iterator<Item = &str> {
        self.children.keys().map(String::as_str)
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    fn descend(&self, path: &[&str]) -> Option<&TreeNode> {
        let mut node = self;
        for segment in path {
            node = node.children.get(*segment)?;
        }
        Some(node)
    }

    fn descend_mut(&mut self, path: &[&str]) -> Option<&mut TreeNode> {
        let mut node = self;
        for segment in path {
            node = node.children.get_mut(*segment)?;
        }
        Some(node)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Contents {
    EntityList(Vec<EntityId>),
    EntitySet(BTreeSet<EntityId>),
    EntityDir(BTreeMap<String, EntityId>),
    EntityTree(TreeNode),
    AspectMap {
        def_name: String,
        aspects: BTreeMap<EntityId, Aspect>,
    },
}

impl Contents {
    fn kind(&self) -> HierarchyKind {
        match self {
            Contents::EntityList(_) => HierarchyKind::EntityList,
            Contents::EntitySet(_) => HierarchyKind::EntitySet,
            Contents::EntityDir(_) => HierarchyKind::EntityDir,
            Contents::EntityTree(_) => HierarchyKind::EntityTree,
            Contents::AspectMap { .. } => HierarchyKind::AspectMap,
        }
    }
}

/// A named, typed index inside one Catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hierarchy {
    name: String,
    modifiable: bool,
    version: u64,
    contents: Contents,
}

impl Hierarchy {
    pub fn entity_list(name: impl Into<String>) -> Self {
        Self::with_contents(name.into(), Contents::EntityList(Vec::new()))
    }

    pub fn entity_set(name: impl Into<String>) -> Self {
        Self::with_contents(name.into(), Contents::EntitySet(BTreeSet::new()))
    }

    pub fn entity_dir(name: impl Into<String>) -> Self {
        Self::with_contents(name.into(), Contents::EntityDir(BTreeMap::new()))
    }

    pub fn entity_tree(name: impl Into<String>) -> Self {
        Self::with_contents(name.into(), Contents::EntityTree(TreeNode::new()))
    }

    /// An AspectMap is born from its AspectDef: the hierarchy name *is*
    /// the def's full name, which is what pins one def per map.
    pub fn aspect_map(def: &AspectDef) -> Self {
        Self::with_contents(
            def.name().to_owned(),
            Contents::AspectMap { def_name: def.name().to_owned(), aspects: BTreeMap::new() },
        )
    }

    fn with_contents(name: String, contents: Contents) -> Self {
        Self { name, modifiable: true, version: 0, contents }
    }

    pub fn read_only(mut self) -> Self {
        self.modifiable = false;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> HierarchyKind {
        self.contents.kind()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn is_modifiable(&self) -> bool {
        self.modifiable
    }

    pub fn definition(&self) -> HierarchyDef {
        HierarchyDef {
            name: self.name.clone(),
            kind: self.kind(),
            modifiable: self.modifiable,
        }
    }

    pub fn len(&self) -> usize {
        match &self.contents {
            Contents::EntityList(v) => v.len(),
            Contents::EntitySet(s) => s.len(),
            Contents::EntityDir(m) => m.len(),
            Contents::EntityTree(root) => {
                fn count(node: &TreeNode) -> usize {
                    usize::from(node.entity.is_some())
                        + node.children.values().map(count).sum::<usize>()
                }
                count(root)
            }
            Contents::AspectMap { aspects, .. } => aspects.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_modifiable(&self) -> Result<()> {
        if self.modifiable {
            Ok(())
        } else {
            Err(Error::InvariantViolation(format!(
                "hierarchy '{}' is not modifiable",
                self.name
            )))
        }
    }

    fn wrong_kind(&self, wanted: HierarchyKind) -> Error {
        Error::InvariantViolation(format!(
            "hierarchy '{}' is {}, not {}",
            self.name,
            self.kind().name(),
            wanted.name()
        ))
    }

    // ========================================================================
    // ENTITY_LIST
    // ========================================================================

    pub fn list_push(&mut self, id: EntityId) -> Result<()> {
        self.check_modifiable()?;
        match &mut self.contents {
            Contents::EntityList(v) => {
                v.push(id);
                self.version += 1;
                Ok(())
            }
            _ => Err(self.wrong_kind(HierarchyKind::EntityList)),
        }
    }

    pub fn list_insert(&mut self, index: usize, id: EntityId) -> Result<()> {
        self.check_modifiable()?;
        match &mut self.contents {
            Contents::EntityList(v) => {
                if index > v.len() {
                    return Err(Error::NotFound(format!(
                        "index {index} in hierarchy '{}' of length {}",
                        self.name,
                        v.len()
                    )));
                }
                v.insert(index, id);
                self.version += 1;
                Ok(())
            }
            _ => Err(self.wrong_kind(HierarchyKind::EntityList)),
        }
    }

    pub fn list_get(&self, index: usize) -> Result<Option<EntityId>> {
        match &self.contents {
            Contents::EntityList(v) => Ok(v.get(index).copied()),
            _ => Err(self.wrong_kind(HierarchyKind::EntityList)),
        }
    }

    pub fn list_iter(&self) -> Result<impl Iterator<Item = EntityId> + '_> {
        match &self.contents {
            Contents::EntityList(v) => Ok(v.iter().copied()),
            _ => Err(self.wrong_kind(HierarchyKind::EntityList)),
        }
    }

    // ========================================================================
    // ENTITY_SET
    // ========================================================================

    /// Returns true if the id was newly added.
    pub fn set_add(&mut self, id: EntityId) -> Result<bool> {
        self.check_modifiable()?;
        match &mut self.contents {
            Contents::EntitySet(s) => {
                let added = s.insert(id);
                if added {
                    self.version += 1;
                }
                Ok(added)
            }
            _ => Err(self.wrong_kind(HierarchyKind::EntitySet)),
        }
    }

    pub fn set_remove(&mut self, id: EntityId) -> Result<bool> {
        self.check_modifiable()?;
        match &mut self.contents {
            Contents::EntitySet(s) => {
                let removed = s.remove(&id);
                if removed {
                    self.version += 1;
                }
                Ok(removed)
            }
            _ => Err(self.wrong_kind(HierarchyKind::EntitySet)),
        }
    }

    pub fn set_contains(&self, id: EntityId) -> Result<bool> {
        match &self.contents {
            Contents::EntitySet(s) => Ok(s.contains(&id)),
            _ => Err(self.wrong_kind(HierarchyKind::EntitySet)),
        }
    }

    pub fn set_iter(&self) -> Result<impl Iterator<Item = EntityId> + '_> {
        match &self.contents {
            Contents::EntitySet(s) => Ok(s.iter().copied()),
            _ => Err(self.wrong_kind(HierarchyKind::EntitySet)),
        }
    }

    // ========================================================================
    // ENTITY_DIR
    // ========================================================================

    /// Upsert. Returns the previous id under that key, if any.
    pub fn dir_put(&mut self, key: impl Into<String>, id: EntityId) -> Result<Option<EntityId>> {
        self.check_modifiable()?;
        match &mut self.contents {
            Contents::EntityDir(m) => {
                let prev = m.insert(key.into(), id);
                self.version += 1;
                Ok(prev)
            }
            _ => Err(self.wrong_kind(HierarchyKind::EntityDir)),
        }
    }

    pub fn dir_get(&self, key: &str) -> Result<Option<EntityId>> {
        match &self.contents {
            Contents::EntityDir(m) => Ok(m.get(key).copied()),
            _ => Err(self.wrong_kind(HierarchyKind::EntityDir)),
        }
    }

    pub fn dir_remove(&mut self, key: &str) -> Result<Option<EntityId>> {
        self.check_modifiable()?;
        match &mut self.contents {
            Contents::EntityDir(m) => {
                let prev = m.remove(key);
                if prev.is_some() {
                    self.version += 1;
                }
                Ok(prev)
            }
            _ => Err(self.wrong_kind(HierarchyKind::EntityDir)),
        }
    }

    pub fn dir_keys(&self) -> Result<impl Iterator<Item = &str>> {
        match &self.contents {
            Contents::EntityDir(m) => Ok(m.keys().map(String::as_str)),
            _ => Err(self.wrong_kind(HierarchyKind::EntityDir)),
        }
    }

    // ========================================================================
    // ENTITY_TREE
    // ========================================================================

    /// Insert a child node under the parent at `path`. Child names are
    /// unique per parent; a collision is an error, not an upsert.
    pub fn tree_insert(
        &mut self,
        path: &[&str],
        name: impl Into<String>,
        entity: Option<EntityId>,
    ) -> Result<()> {
        self.check_modifiable()?;
        let hierarchy_name = self.name.clone();
        match &mut self.contents {
            Contents::EntityTree(root) => {
                let parent = root.descend_mut(path).ok_or_else(|| {
                    Error::NotFound(format!(
                        "tree path {path:?} in hierarchy '{hierarchy_name}'"
                    ))
                })?;
                let name = name.into();
                if parent.children.contains_key(&name) {
                    return Err(Error::InvariantViolation(format!(
                        "child '{name}' already exists at {path:?} in hierarchy '{hierarchy_name}'"
                    )));
                }
                parent
                    .children
                    .insert(name, TreeNode { entity, children: BTreeMap::new() });
                self.version += 1;
                Ok(())
            }
            _ => Err(self.wrong_kind(HierarchyKind::EntityTree)),
        }
    }

    pub fn tree_get(&self, path: &[&str]) -> Result<Option<&TreeNode>> {
        match &self.contents {
            Contents::EntityTree(root) => Ok(root.descend(path)),
            _ => Err(self.wrong_kind(HierarchyKind::EntityTree)),
        }
    }

    pub fn tree_root(&self) -> Result<&TreeNode> {
        match &self.contents {
            Contents::EntityTree(root) => Ok(root),
            _ => Err(self.wrong_kind(HierarchyKind::EntityTree)),
        }
    }

    // ========================================================================
    // ASPECT_MAP
    // ========================================================================

    pub fn aspect_def_name(&self) -> Result<&str> {
        match &self.contents {
            Contents::AspectMap { def_name, .. } => Ok(def_name),
            _ => Err(self.wrong_kind(HierarchyKind::AspectMap)),
        }
    }

    /// Upsert the aspect for its entity. At most one aspect per entity: a
    /// put replaces the existing one and returns it.
    pub fn aspect_put(&mut self, aspect: Aspect) -> Result<Option<Aspect>> {
        self.check_modifiable()?;
        let hierarchy_name = self.name.clone();
        match &mut self.contents {
            Contents::AspectMap { def_name, aspects } => {
                if aspect.def_name() != def_name {
                    return Err(Error::SchemaViolation(format!(
                        "aspect of def '{}' cannot live in aspect map '{hierarchy_name}'",
                        aspect.def_name()
                    )));
                }
                let prev = aspects.insert(aspect.entity(), aspect);
                self.version += 1;
                Ok(prev)
            }
            _ => Err(self.wrong_kind(HierarchyKind::AspectMap)),
        }
    }

    pub fn aspect_get(&self, entity: EntityId) -> Result<Option<&Aspect>> {
        match &self.contents {
            Contents::AspectMap { aspects, .. } => Ok(aspects.get(&entity)),
            _ => Err(self.wrong_kind(HierarchyKind::AspectMap)),
        }
    }

    /// Mutable access to one entity's aspect. Handing out `&mut` counts
    /// as a mutation for versioning, but only on a hit; a miss leaves the
    /// version untouched.
    pub fn aspect_get_mut(&mut self, entity: EntityId) -> Result<Option<&mut Aspect>> {
        self.check_modifiable()?;
        // Kind check before the borrow: the &mut handed out below lives
        // until the caller drops it, so no other arm may touch self.
        if self.kind() != HierarchyKind::AspectMap {
            return Err(self.wrong_kind(HierarchyKind::AspectMap));
        }
        let Contents::AspectMap { aspects, .. } = &mut self.contents else {
            return Ok(None);
        };
        match aspects.get_mut(&entity) {
            Some(aspect) => {
                self.version += 1;
                Ok(Some(aspect))
            }
            None => Ok(None),
        }
    }

    pub fn aspect_remove(&mut self, entity: EntityId) -> Result<Option<Aspect>> {
        self.check_modifiable()?;
        match &mut self.contents {
            Contents::AspectMap { aspects, .. } => {
                let prev = aspects.remove(&entity);
                if prev.is_some() {
                    self.version += 1;
                }
                Ok(prev)
            }
            _ => Err(self.wrong_kind(HierarchyKind::AspectMap)),
        }
    }

    pub fn aspect_iter(&self) -> Result<impl Iterator<Item = (&EntityId, &Aspect)>> {
        match &self.contents {
            Contents::AspectMap { aspects, .. } => Ok(aspects.iter()),
            _ => Err(self.wrong_kind(HierarchyKind::AspectMap)),
        }
    }
}
