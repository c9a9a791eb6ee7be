//! Text rendering of the chart via termtree

use generational_arena::Index;
use termtree::Tree;

use crate::domain::{OrgTree, TreeNode};

/// Conversion of a chart tree into a printable `termtree::Tree`.
pub trait ToTermTree {
    fn to_term_tree(&self) -> Tree<String>;
}

impl ToTermTree for OrgTree {
    fn to_term_tree(&self) -> Tree<String> {
        fn build(tree: &OrgTree, idx: Index) -> Tree<String> {
            let label = tree.get(idx).map(node_label).unwrap_or_default();
            let leaves: Vec<_> = tree
                .get(idx)
                .map(|node| node.children.iter().map(|&c| build(tree, c)).collect())
                .unwrap_or_default();
            Tree::new(label).with_leaves(leaves)
        }

        build(self, self.root())
    }
}

/// `Name (Role) [id]`, with a marker on nodes whose reports are not loaded yet.
fn node_label(node: &TreeNode) -> String {
    let mut label = format!("{} [{}]", node.data, node.data.id);
    if !node.children_loaded() {
        label.push_str(" +");
    }
    label
}
