use std::collections::{HashMap, HashSet};
use std::fmt;

use generational_arena::{Arena, Index};
use tracing::instrument;

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::{NodeId, OrgNode};

/// Data payload for tree nodes representing people.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeData {
    pub id: NodeId,
    pub name: String,
    pub role: Option<String>,
    /// Explicit lazy-load flag; `None` if the record never set one
    pub is_loaded: Option<bool>,
}

impl fmt::Display for NodeData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.role {
            Some(role) => write!(f, "{} ({})", self.name, role),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Tree node in the arena-based hierarchy structure.
#[derive(Debug, Clone)]
pub struct TreeNode {
    /// Person data for this node
    pub data: NodeData,
    /// Index of parent node in the arena, None for the root
    pub parent: Option<Index>,
    /// Indices of child nodes in the arena, in display order
    pub children: Vec<Index>,
    /// Number of ancestors
    pub depth: usize,
}

impl TreeNode {
    /// Whether this node's children are materialized.
    pub fn children_loaded(&self) -> bool {
        self.data.is_loaded.unwrap_or(!self.children.is_empty())
    }
}

/// Arena-based snapshot of one organization hierarchy.
///
/// Parent/child links are arena indices, so there is no recursive ownership.
/// An id index gives O(1) lookups. Snapshots are cheap to clone and every
/// mutation in [`crate::domain::algorithms`] works on a clone, leaving the
/// original untouched.
#[derive(Debug, Clone)]
pub struct OrgTree {
    arena: Arena<TreeNode>,
    root: Index,
    index: HashMap<NodeId, Index>,
}

impl PartialEq for OrgTree {
    /// Structural equality: same ids, names, roles, flags, depths and order.
    fn eq(&self, other: &Self) -> bool {
        self.to_node() == other.to_node()
    }
}

impl Eq for OrgTree {}

impl OrgTree {
    /// Build a snapshot from a record. Stored depths are ignored.
    #[instrument(level = "debug", skip(root), fields(root = %root.id))]
    pub fn from_node(root: &OrgNode) -> DomainResult<Self> {
        check_unique_ids(root, &HashMap::<NodeId, Index>::new())?;
        Ok(Self::from_node_unchecked(root))
    }

    /// Build a snapshot from a record whose ids are known to be unique.
    pub(crate) fn from_node_unchecked(root: &OrgNode) -> Self {
        let mut arena = Arena::new();
        let root_idx = arena.insert(TreeNode {
            data: node_data(root),
            parent: None,
            children: Vec::new(),
            depth: 0,
        });
        let mut index = HashMap::new();
        index.insert(root.id.clone(), root_idx);

        let mut tree = Self {
            arena,
            root: root_idx,
            index,
        };
        for child in &root.children {
            let child_idx = tree.insert_record(root_idx, 1, child);
            tree.push_child(root_idx, child_idx, None);
        }
        tree
    }

    /// Export the whole tree as a record.
    pub fn to_node(&self) -> OrgNode {
        self.export(self.root)
    }

    pub fn root(&self) -> Index {
        self.root
    }

    pub fn root_id(&self) -> &NodeId {
        // root is never removed from the arena
        &self.arena[self.root].data.id
    }

    pub fn get(&self, idx: Index) -> Option<&TreeNode> {
        self.arena.get(idx)
    }

    pub fn index_of(&self, id: &str) -> Option<Index> {
        self.index.get(id).copied()
    }

    pub fn node(&self, id: &str) -> Option<&TreeNode> {
        self.index_of(id).and_then(|idx| self.arena.get(idx))
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Parent of the node with `id`, None for the root or unknown ids.
    pub fn parent_of(&self, id: &str) -> Option<&TreeNode> {
        self.node(id)
            .and_then(|n| n.parent)
            .and_then(|p| self.arena.get(p))
    }

    /// Children of `idx` in display order.
    pub fn children(&self, idx: Index) -> impl Iterator<Item = &TreeNode> {
        self.arena
            .get(idx)
            .map(|n| n.children.as_slice())
            .unwrap_or_default()
            .iter()
            .filter_map(|&c| self.arena.get(c))
    }

    /// Total number of nodes.
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Pre-order traversal of the whole tree.
    #[instrument(level = "trace", skip(self))]
    pub fn iter(&self) -> TreeIterator<'_> {
        TreeIterator::new(self, self.root)
    }

    /// Pre-order traversal of the subtree rooted at `idx`.
    pub fn iter_from(&self, idx: Index) -> TreeIterator<'_> {
        TreeIterator::new(self, idx)
    }

    /// Number of levels in the tree (a lone root has height 1).
    #[instrument(level = "debug", skip(self))]
    pub fn height(&self) -> usize {
        self.iter().map(|(_, n)| n.depth + 1).max().unwrap_or(0)
    }

    // ------------------------------------------------------------
    // In-place edits; only used on private clones by the algorithms
    // ------------------------------------------------------------

    pub(crate) fn get_mut(&mut self, idx: Index) -> Option<&mut TreeNode> {
        self.arena.get_mut(idx)
    }

    /// Attach a record subtree under `parent`, at `position` among its
    /// children (append when None). Fails without side effects if any id
    /// of the subtree is already present.
    #[instrument(level = "trace", skip(self, node), fields(node = %node.id))]
    pub(crate) fn attach(
        &mut self,
        parent: Index,
        node: &OrgNode,
        position: Option<usize>,
    ) -> DomainResult<Index> {
        check_unique_ids(node, &self.index)?;
        let depth = self
            .arena
            .get(parent)
            .map(|p| p.depth + 1)
            .ok_or_else(|| DomainError::NotFound(node.id.clone()))?;
        let idx = self.insert_record(parent, depth, node);
        self.push_child(parent, idx, position);
        Ok(idx)
    }

    /// Detach the subtree at `idx` from its parent and free its slots.
    /// Returns None for the root or stale indices.
    #[instrument(level = "trace", skip(self))]
    pub(crate) fn detach(&mut self, idx: Index) -> Option<OrgNode> {
        let parent = self.arena.get(idx)?.parent?;
        let removed = self.export(idx);

        if let Some(p) = self.arena.get_mut(parent) {
            p.children.retain(|&c| c != idx);
        }
        let doomed: Vec<Index> = self.iter_from(idx).map(|(i, _)| i).collect();
        for i in doomed {
            if let Some(node) = self.arena.remove(i) {
                self.index.remove(&node.data.id);
            }
        }
        Some(removed)
    }

    /// Reassign `depth` for every node from the root down.
    #[instrument(level = "trace", skip(self))]
    pub(crate) fn reset_depths(&mut self) {
        let mut stack = vec![(self.root, 0usize)];
        while let Some((idx, depth)) = stack.pop() {
            if let Some(node) = self.arena.get_mut(idx) {
                node.depth = depth;
                stack.extend(node.children.iter().map(|&c| (c, depth + 1)));
            }
        }
    }

    fn insert_record(&mut self, parent: Index, depth: usize, node: &OrgNode) -> Index {
        let idx = self.arena.insert(TreeNode {
            data: node_data(node),
            parent: Some(parent),
            children: Vec::new(),
            depth,
        });
        self.index.insert(node.id.clone(), idx);
        for child in &node.children {
            let child_idx = self.insert_record(idx, depth + 1, child);
            self.push_child(idx, child_idx, None);
        }
        idx
    }

    fn push_child(&mut self, parent: Index, child: Index, position: Option<usize>) {
        if let Some(p) = self.arena.get_mut(parent) {
            match position {
                Some(pos) if pos <= p.children.len() => p.children.insert(pos, child),
                _ => p.children.push(child),
            }
        }
    }

    fn export(&self, idx: Index) -> OrgNode {
        let node = &self.arena[idx];
        OrgNode {
            id: node.data.id.clone(),
            name: node.data.name.clone(),
            role: node.data.role.clone(),
            depth: node.depth,
            is_loaded: node.data.is_loaded,
            children: node
                .children
                .iter()
                .filter(|&&c| self.arena.contains(c))
                .map(|&c| self.export(c))
                .collect(),
        }
    }
}

fn node_data(node: &OrgNode) -> NodeData {
    NodeData {
        id: node.id.clone(),
        name: node.name.clone(),
        role: node.role.clone(),
        is_loaded: node.is_loaded,
    }
}

/// Reject a subtree whose ids repeat internally or collide with `existing`.
fn check_unique_ids<V>(node: &OrgNode, existing: &HashMap<NodeId, V>) -> DomainResult<()> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut stack = vec![node];
    while let Some(current) = stack.pop() {
        let id = current.id.as_str();
        if existing.contains_key(id) || !seen.insert(id) {
            return Err(DomainError::DuplicateId(current.id.clone()));
        }
        stack.extend(current.children.iter());
    }
    Ok(())
}

pub struct TreeIterator<'a> {
    tree: &'a OrgTree,
    stack: Vec<Index>,
}

impl<'a> TreeIterator<'a> {
    fn new(tree: &'a OrgTree, start: Index) -> Self {
        let mut stack = Vec::new();
        if tree.arena.contains(start) {
            stack.push(start);
        }
        Self { tree, stack }
    }
}

impl<'a> Iterator for TreeIterator<'a> {
    type Item = (Index, &'a TreeNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current_idx) = self.stack.pop() {
            if let Some(node) = self.tree.arena.get(current_idx) {
                // Push children in reverse order for left-to-right traversal
                for &child in node.children.iter().rev() {
                    self.stack.push(child);
                }
                return Some((current_idx, node));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::default_tree;

    fn sample() -> OrgNode {
        OrgNode::new("a", "A").with_children(vec![
            OrgNode::new("b", "B").with_children(vec![OrgNode::new("d", "D")]),
            OrgNode::new("c", "C"),
        ])
    }

    #[test]
    fn given_record_when_building_then_depths_follow_parents() {
        let mut record = sample();
        record.children[0].depth = 7; // stale depth must be ignored

        let tree = OrgTree::from_node(&record).unwrap();

        assert_eq!(tree.node("a").unwrap().depth, 0);
        assert_eq!(tree.node("b").unwrap().depth, 1);
        assert_eq!(tree.node("d").unwrap().depth, 2);
        assert_eq!(tree.len(), 4);
        assert_eq!(tree.height(), 3);
    }

    #[test]
    fn given_duplicate_ids_when_building_then_rejects() {
        let record = OrgNode::new("a", "A")
            .with_children(vec![OrgNode::new("b", "B"), OrgNode::new("b", "B2")]);

        let result = OrgTree::from_node(&record);

        assert_eq!(result.unwrap_err(), DomainError::DuplicateId("b".into()));
    }

    #[test]
    fn given_tree_when_iterating_then_visits_in_preorder() {
        let tree = OrgTree::from_node(&sample()).unwrap();

        let ids: Vec<&str> = tree.iter().map(|(_, n)| n.data.id.as_str()).collect();

        assert_eq!(ids, vec!["a", "b", "d", "c"]);
    }

    #[test]
    fn given_tree_when_exporting_then_round_trips_record() {
        let mut record = default_tree();
        record.children.iter_mut().for_each(|c| c.depth = 1);

        let tree = OrgTree::from_node(&record).unwrap();

        assert_eq!(tree.to_node(), record);
    }

    #[test]
    fn given_subtree_when_detaching_then_frees_all_its_ids() {
        let mut tree = OrgTree::from_node(&sample()).unwrap();
        let b = tree.index_of("b").unwrap();

        let removed = tree.detach(b).unwrap();

        assert_eq!(removed.count(), 2);
        assert!(!tree.contains_id("b"));
        assert!(!tree.contains_id("d"));
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn given_root_when_detaching_then_refuses() {
        let mut tree = OrgTree::from_node(&sample()).unwrap();
        let root = tree.root();

        assert!(tree.detach(root).is_none());
        assert_eq!(tree.len(), 4);
    }

    #[test]
    fn given_colliding_subtree_when_attaching_then_tree_unchanged() {
        let mut tree = OrgTree::from_node(&sample()).unwrap();
        let before = tree.clone();
        let root = tree.root();
        let incoming = OrgNode::new("x", "X").with_children(vec![OrgNode::new("c", "dup")]);

        let result = tree.attach(root, &incoming, None);

        assert!(matches!(result, Err(DomainError::DuplicateId(_))));
        assert_eq!(tree, before);
    }
}
