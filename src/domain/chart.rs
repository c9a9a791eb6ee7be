//! Whole-chart mutation operations.
//!
//! An [`OrgChart`] is one immutable snapshot: the hierarchy plus the talent
//! pool. Operations validate their input, run the tree algorithms on a copy
//! and hand back the next snapshot; a rejected operation leaves the current
//! one as it was.

use std::collections::HashSet;

use tracing::debug;

use crate::domain::algorithms::{
    find_and_remove, insert_as_child, insert_before, is_descendant_or_self, recompute_depths,
};
use crate::domain::entities::normalize_name;
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::{
    default_tree, default_unassigned, NodeId, OrgNode, OrgRecord, OrgTree, Person,
};

/// Where a dragged card was dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropTarget {
    /// Onto the card body: reparent as its last child.
    Child(NodeId),
    /// Onto the gap above the card: insert as its sibling, immediately before it.
    Before(NodeId),
}

impl DropTarget {
    pub fn id(&self) -> &NodeId {
        match self {
            DropTarget::Child(id) | DropTarget::Before(id) => id,
        }
    }
}

/// Result of an operation that may legitimately do nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Changed(OrgChart),
    Unchanged,
}

/// What happened to lazily fetched children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Installation {
    /// Fetched children became the node's children.
    Installed(usize),
    /// The node already had children; the fetched ones were dropped.
    Discarded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrgChart {
    tree: OrgTree,
    unassigned: Vec<Person>,
}

impl Default for OrgChart {
    fn default() -> Self {
        Self {
            tree: OrgTree::from_node_unchecked(&default_tree()),
            unassigned: default_unassigned(),
        }
    }
}

impl OrgChart {
    /// Combine a tree and a pool, rejecting ids that appear twice.
    pub fn new(tree: OrgTree, unassigned: Vec<Person>) -> DomainResult<Self> {
        let mut seen = HashSet::new();
        for person in &unassigned {
            if tree.contains_id(person.id.as_str()) || !seen.insert(person.id.as_str()) {
                return Err(DomainError::DuplicateId(person.id.clone()));
            }
        }
        Ok(Self { tree, unassigned })
    }

    /// Build a snapshot from a persisted record.
    ///
    /// A record without an unassigned list gets the built-in pool.
    pub fn from_record(record: &OrgRecord) -> DomainResult<Self> {
        let tree = OrgTree::from_node(&record.tree)?;
        let unassigned = record
            .unassigned
            .clone()
            .unwrap_or_else(default_unassigned);
        Self::new(tree, unassigned)
    }

    pub fn to_record(&self) -> OrgRecord {
        OrgRecord {
            tree: self.tree.to_node(),
            unassigned: Some(self.unassigned.clone()),
        }
    }

    pub fn tree(&self) -> &OrgTree {
        &self.tree
    }

    pub fn unassigned(&self) -> &[Person] {
        &self.unassigned
    }

    pub fn root_id(&self) -> &NodeId {
        self.tree.root_id()
    }

    /// Whether `id` names a tree node or a pool entry.
    pub fn contains_id(&self, id: &str) -> bool {
        self.tree.contains_id(id) || self.unassigned.iter().any(|p| p.id.as_str() == id)
    }

    /// Add a new direct report under `parent_id`.
    ///
    /// A parent explicitly marked as not loaded becomes loaded: its child set
    /// is now authoritative.
    pub fn add_node(
        &self,
        parent_id: &str,
        id: NodeId,
        name: &str,
        role: Option<&str>,
    ) -> DomainResult<Self> {
        let name = normalize_name(name).ok_or(DomainError::EmptyName)?;
        if self.contains_id(id.as_str()) {
            return Err(DomainError::DuplicateId(id));
        }
        let parent = self
            .tree
            .index_of(parent_id)
            .ok_or_else(|| DomainError::NotFound(parent_id.into()))?;

        let mut node = OrgNode::new(id, name).with_loaded(true);
        node.role = role.and_then(normalize_name);

        let mut tree = insert_as_child(&self.tree, parent_id, &node)?;
        if let Some(p) = tree.get_mut(parent) {
            if p.data.is_loaded == Some(false) {
                p.data.is_loaded = Some(true);
            }
        }
        debug!(parent = parent_id, id = %node.id, "added node");
        Ok(Self {
            tree,
            unassigned: self.unassigned.clone(),
        })
    }

    pub fn rename_node(&self, id: &str, name: &str) -> DomainResult<Transition> {
        let name = normalize_name(name).ok_or(DomainError::EmptyName)?;
        let idx = self
            .tree
            .index_of(id)
            .ok_or_else(|| DomainError::NotFound(id.into()))?;
        if self.tree.get(idx).is_some_and(|n| n.data.name == name) {
            return Ok(Transition::Unchanged);
        }

        let mut next = self.clone();
        if let Some(node) = next.tree.get_mut(idx) {
            node.data.name = name;
        }
        Ok(Transition::Changed(next))
    }

    /// Set or clear the secondary label. Blank roles clear it.
    pub fn set_role(&self, id: &str, role: Option<&str>) -> DomainResult<Transition> {
        let role = role.and_then(normalize_name);
        let idx = self
            .tree
            .index_of(id)
            .ok_or_else(|| DomainError::NotFound(id.into()))?;
        if self.tree.get(idx).is_some_and(|n| n.data.role == role) {
            return Ok(Transition::Unchanged);
        }

        let mut next = self.clone();
        if let Some(node) = next.tree.get_mut(idx) {
            node.data.role = role;
        }
        Ok(Transition::Changed(next))
    }

    /// Remove a node together with its whole subtree.
    ///
    /// Descendants are always discarded. With `return_to_pool` the removed
    /// node itself goes back to the unassigned list.
    pub fn delete_node(&self, id: &str, return_to_pool: bool) -> DomainResult<(Self, OrgNode)> {
        let (tree, removed) = find_and_remove(&self.tree, id)?;
        let mut unassigned = self.unassigned.clone();
        if return_to_pool {
            unassigned.push(Person::new(removed.id.clone(), removed.name.clone()));
        }
        debug!(id, removed = removed.count(), return_to_pool, "deleted subtree");
        Ok((Self { tree, unassigned }, removed))
    }

    /// Reparent `active_id` (a tree node or a pool entry) at `target`.
    pub fn move_node(&self, active_id: &str, target: &DropTarget) -> DomainResult<Transition> {
        let target_id = target.id().as_str();
        if active_id == target_id {
            return Ok(Transition::Unchanged);
        }
        if active_id == self.root_id().as_str() {
            return Err(DomainError::RootProtected(active_id.into()));
        }
        if !self.tree.contains_id(target_id) {
            return Err(DomainError::NotFound(target.id().clone()));
        }

        if let Some(pos) = self.unassigned.iter().position(|p| p.id.as_str() == active_id) {
            let person = &self.unassigned[pos];
            let node = OrgNode::new(person.id.clone(), person.name.clone()).with_loaded(true);
            let tree = place(&self.tree, target, &node)?;
            let mut unassigned = self.unassigned.clone();
            unassigned.remove(pos);
            debug!(active = active_id, target = target_id, "placed unassigned person");
            return Ok(Transition::Changed(Self {
                tree: recompute_depths(&tree),
                unassigned,
            }));
        }

        if !self.tree.contains_id(active_id) {
            return Err(DomainError::NotFound(active_id.into()));
        }
        if is_descendant_or_self(&self.tree, active_id, target_id) {
            return Err(DomainError::CycleDetected {
                active: active_id.into(),
                target: target.id().clone(),
            });
        }

        // Both steps work on copies: a failed attach leaves `self` as the rollback.
        let (detached, node) = find_and_remove(&self.tree, active_id)?;
        let tree = place(&detached, target, &node)?;
        debug!(active = active_id, target = target_id, "moved node");
        Ok(Transition::Changed(Self {
            tree: recompute_depths(&tree),
            unassigned: self.unassigned.clone(),
        }))
    }

    /// Append a new person to the unassigned list.
    pub fn add_unassigned(&self, id: NodeId, name: &str) -> DomainResult<Self> {
        let name = normalize_name(name).ok_or(DomainError::EmptyName)?;
        if self.contains_id(id.as_str()) {
            return Err(DomainError::DuplicateId(id));
        }
        let mut next = self.clone();
        next.unassigned.push(Person::new(id, name));
        Ok(next)
    }

    /// Complete a lazy load of `id`'s children.
    ///
    /// First writer wins: if the node acquired children while the fetch was
    /// in flight, the fetched ones are dropped. Either way the node ends up
    /// marked as loaded.
    pub fn install_children(
        &self,
        id: &str,
        fetched: &[OrgNode],
    ) -> DomainResult<(Transition, Installation)> {
        let idx = self
            .tree
            .index_of(id)
            .ok_or_else(|| DomainError::NotFound(id.into()))?;
        let (has_children, flagged) = match self.tree.get(idx) {
            Some(n) => (!n.children.is_empty(), n.data.is_loaded == Some(true)),
            None => return Err(DomainError::NotFound(id.into())),
        };

        if has_children || fetched.is_empty() {
            let installation = if has_children && !fetched.is_empty() {
                Installation::Discarded
            } else {
                Installation::Installed(0)
            };
            if flagged {
                return Ok((Transition::Unchanged, installation));
            }
            let mut next = self.clone();
            if let Some(node) = next.tree.get_mut(idx) {
                node.data.is_loaded = Some(true);
            }
            return Ok((Transition::Changed(next), installation));
        }

        let mut tree = self.tree.clone();
        for child in fetched {
            if self.unassigned.iter().any(|p| child.contains(p.id.as_str())) {
                return Err(DomainError::DuplicateId(child.id.clone()));
            }
            tree.attach(idx, child, None)?;
        }
        if let Some(node) = tree.get_mut(idx) {
            node.data.is_loaded = Some(true);
        }
        Ok((
            Transition::Changed(Self {
                tree: recompute_depths(&tree),
                unassigned: self.unassigned.clone(),
            }),
            Installation::Installed(fetched.len()),
        ))
    }
}

fn place(tree: &OrgTree, target: &DropTarget, node: &OrgNode) -> DomainResult<OrgTree> {
    match target {
        DropTarget::Child(id) => insert_as_child(tree, id.as_str(), node),
        DropTarget::Before(id) => insert_before(tree, id.as_str(), node),
    }
}
