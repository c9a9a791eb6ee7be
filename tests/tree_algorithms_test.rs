//! Tests for the pure tree algorithms over arena snapshots

use rstest::{fixture, rstest};

use orgview::domain::algorithms::{
    find, find_and_remove, insert_as_child, insert_before, is_descendant_or_self,
    recompute_depths,
};
use orgview::domain::{DomainError, OrgNode, OrgTree};
use orgview::util::testing;

#[ctor::ctor]
fn init() {
    testing::init_test_setup();
}

/// root
/// ├── a
/// │   ├── a1
/// │   └── a2
/// │       └── a2x
/// └── b
#[fixture]
fn tree() -> OrgTree {
    let record = OrgNode::new("root", "Root").with_children(vec![
        OrgNode::new("a", "A").with_children(vec![
            OrgNode::new("a1", "A1"),
            OrgNode::new("a2", "A2").with_children(vec![OrgNode::new("a2x", "A2X")]),
        ]),
        OrgNode::new("b", "B"),
    ]);
    OrgTree::from_node(&record).expect("valid tree")
}

fn child_ids(tree: &OrgTree, id: &str) -> Vec<String> {
    let idx = tree.index_of(id).expect("node exists");
    tree.children(idx).map(|n| n.data.id.to_string()).collect()
}

fn assert_depths_consistent(tree: &OrgTree) {
    for (_, node) in tree.iter() {
        match node.parent.and_then(|p| tree.get(p)) {
            Some(parent) => {
                assert_eq!(node.depth, parent.depth + 1, "depth of {}", node.data.id)
            }
            None => assert_eq!(node.depth, 0, "root depth"),
        }
    }
}

#[rstest]
#[case("root", Some(0))]
#[case("a2", Some(2))]
#[case("a2x", Some(3))]
#[case("missing", None)]
fn given_tree_when_finding_then_returns_node_at_its_depth(
    tree: OrgTree,
    #[case] id: &str,
    #[case] depth: Option<usize>,
) {
    assert_eq!(find(&tree, id).map(|n| n.depth), depth);
}

#[rstest]
fn given_inner_node_when_removing_then_subtree_leaves_and_siblings_keep_order(tree: OrgTree) {
    // Act
    let (next, removed) = find_and_remove(&tree, "a2").expect("remove");

    // Assert
    assert_eq!(removed.id.as_str(), "a2");
    assert_eq!(removed.count(), 2);
    assert!(!next.contains_id("a2"));
    assert!(!next.contains_id("a2x"));
    assert_eq!(child_ids(&next, "a"), vec!["a1"]);
    assert_eq!(next.len(), tree.len() - 2);
    // input untouched
    assert!(tree.contains_id("a2x"));
}

#[rstest]
fn given_root_when_removing_then_rejected(tree: OrgTree) {
    assert_eq!(
        find_and_remove(&tree, "root").unwrap_err(),
        DomainError::RootProtected("root".into())
    );
}

#[rstest]
fn given_unknown_id_when_removing_then_not_found(tree: OrgTree) {
    assert!(matches!(
        find_and_remove(&tree, "nobody"),
        Err(DomainError::NotFound(_))
    ));
}

#[rstest]
#[case("a", "a", true)]
#[case("a", "a2x", true)]
#[case("a2", "a1", false)]
#[case("b", "a", false)]
#[case("root", "b", true)]
#[case("a2x", "a", false)]
#[case("missing", "a", false)]
fn given_pair_when_checking_descendant_or_self_then_follows_ancestry(
    tree: OrgTree,
    #[case] ancestor: &str,
    #[case] target: &str,
    #[case] expected: bool,
) {
    assert_eq!(is_descendant_or_self(&tree, ancestor, target), expected);
}

#[rstest]
fn given_subtree_when_inserting_as_child_then_appended_last(tree: OrgTree) {
    let node = OrgNode::new("n", "New").with_children(vec![OrgNode::new("n1", "Deep")]);

    let next = insert_as_child(&tree, "a", &node).expect("insert");

    assert_eq!(child_ids(&next, "a"), vec!["a1", "a2", "n"]);
    assert_eq!(find(&next, "n1").map(|n| n.depth), Some(3));
    assert_depths_consistent(&next);
}

#[rstest]
fn given_sibling_when_inserting_before_then_spliced_in_front(tree: OrgTree) {
    let next = insert_before(&tree, "a2", &OrgNode::new("n", "New")).expect("insert");

    assert_eq!(child_ids(&next, "a"), vec!["a1", "n", "a2"]);
    assert_eq!(next.parent_of("n").map(|p| p.data.id.as_str()), Some("a"));
}

#[rstest]
fn given_root_as_sibling_when_inserting_before_then_rejected(tree: OrgTree) {
    assert_eq!(
        insert_before(&tree, "root", &OrgNode::new("n", "New")).unwrap_err(),
        DomainError::RootHasNoSiblings("root".into())
    );
}

#[rstest]
fn given_existing_id_when_inserting_then_duplicate_rejected(tree: OrgTree) {
    let node = OrgNode::new("fresh", "Fresh").with_children(vec![OrgNode::new("b", "Dup")]);

    assert_eq!(
        insert_as_child(&tree, "a1", &node).unwrap_err(),
        DomainError::DuplicateId("b".into())
    );
}

#[rstest]
fn given_moved_subtree_when_recomputing_depths_then_consistent(tree: OrgTree) {
    let (detached, node) = find_and_remove(&tree, "a").expect("remove");
    let moved = insert_as_child(&detached, "b", &node).expect("insert");

    let next = recompute_depths(&moved);

    assert_depths_consistent(&next);
    assert_eq!(find(&next, "a2x").map(|n| n.depth), Some(4));
    assert_eq!(next.height(), 5);
}
