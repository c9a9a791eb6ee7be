//! Pure tree algorithms over [`OrgTree`] snapshots.
//!
//! Each function leaves its input untouched and returns either a new snapshot
//! or the reason the operation was rejected.

use tracing::trace;

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::{OrgNode, OrgTree, TreeNode};

/// Look up a node by id.
pub fn find<'a>(tree: &'a OrgTree, id: &str) -> Option<&'a TreeNode> {
    tree.node(id)
}

/// Detach the node `id` and its subtree from its parent.
///
/// Remaining siblings keep their order. The root has no parent and is
/// always rejected.
pub fn find_and_remove(tree: &OrgTree, id: &str) -> DomainResult<(OrgTree, OrgNode)> {
    let idx = tree
        .index_of(id)
        .ok_or_else(|| DomainError::NotFound(id.into()))?;
    if idx == tree.root() {
        return Err(DomainError::RootProtected(id.into()));
    }

    let mut next = tree.clone();
    let removed = next
        .detach(idx)
        .ok_or_else(|| DomainError::RootProtected(id.into()))?;
    trace!(id, removed = removed.count(), "detached subtree");
    Ok((next, removed))
}

/// True iff `target_id` is `ancestor_id` itself or lies anywhere beneath it.
///
/// Walks parent links upward from the target, so the cost is bounded by the
/// target's depth rather than the subtree size.
pub fn is_descendant_or_self(tree: &OrgTree, ancestor_id: &str, target_id: &str) -> bool {
    let Some(ancestor) = tree.index_of(ancestor_id) else {
        return false;
    };
    let mut current = tree.index_of(target_id);
    while let Some(idx) = current {
        if idx == ancestor {
            return true;
        }
        current = tree.get(idx).and_then(|n| n.parent);
    }
    false
}

/// Append `node` (with its subtree) as the last child of `target_id`.
pub fn insert_as_child(tree: &OrgTree, target_id: &str, node: &OrgNode) -> DomainResult<OrgTree> {
    let target = tree
        .index_of(target_id)
        .ok_or_else(|| DomainError::NotFound(target_id.into()))?;

    let mut next = tree.clone();
    next.attach(target, node, None)?;
    Ok(next)
}

/// Splice `node` into the sibling list of `sibling_id`, immediately before it.
pub fn insert_before(tree: &OrgTree, sibling_id: &str, node: &OrgNode) -> DomainResult<OrgTree> {
    let sibling = tree
        .index_of(sibling_id)
        .ok_or_else(|| DomainError::NotFound(sibling_id.into()))?;
    let parent = tree
        .get(sibling)
        .and_then(|n| n.parent)
        .ok_or_else(|| DomainError::RootHasNoSiblings(sibling_id.into()))?;
    let position = tree
        .get(parent)
        .and_then(|p| p.children.iter().position(|&c| c == sibling));

    let mut next = tree.clone();
    next.attach(parent, node, position)?;
    Ok(next)
}

/// Reassign every depth from scratch: root 0, child = parent + 1.
pub fn recompute_depths(tree: &OrgTree) -> OrgTree {
    let mut next = tree.clone();
    next.reset_depths();
    next
}
