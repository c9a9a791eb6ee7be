//! Domain entities: core data structures

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Id of the built-in root node.
pub const DEFAULT_ROOT_ID: &str = "root";

/// Opaque node identity, unique across the tree and the unassigned list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Recursive record form of a tree node.
///
/// This is the persisted shape (`{ id, name, role?, depth, isLoaded?, children }`)
/// and also the shape of detached subtrees and of lazily fetched children.
/// `depth` is informational only: it is recomputed whenever a record is
/// turned into an [`OrgTree`](crate::domain::OrgTree).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrgNode {
    pub id: NodeId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub depth: usize,
    /// `None` means the record did not say; see [`OrgNode::children_loaded`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_loaded: Option<bool>,
    #[serde(default)]
    pub children: Vec<OrgNode>,
}

impl OrgNode {
    pub fn new(id: impl Into<NodeId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role: None,
            depth: 0,
            is_loaded: None,
            children: Vec::new(),
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn with_children(mut self, children: Vec<OrgNode>) -> Self {
        self.children = children;
        self
    }

    pub fn with_loaded(mut self, loaded: bool) -> Self {
        self.is_loaded = Some(loaded);
        self
    }

    /// Whether this node's children are materialized.
    ///
    /// An absent flag counts as loaded only when children are already present.
    pub fn children_loaded(&self) -> bool {
        self.is_loaded.unwrap_or(!self.children.is_empty())
    }

    /// Depth-first containment check on a detached subtree:
    /// true iff `id` is this node or any node beneath it.
    pub fn contains(&self, id: &str) -> bool {
        self.id.as_str() == id || self.children.iter().any(|c| c.contains(id))
    }

    /// Number of nodes in this subtree, including self.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(OrgNode::count).sum::<usize>()
    }
}

/// A person not yet placed in the hierarchy (talent pool entry).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: NodeId,
    pub name: String,
}

impl Person {
    pub fn new(id: impl Into<NodeId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// The single persisted record: `{ tree, unassigned? }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgRecord {
    pub tree: OrgNode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unassigned: Option<Vec<Person>>,
}

/// Built-in chart used when nothing (valid) is persisted.
pub fn default_tree() -> OrgNode {
    OrgNode::new(DEFAULT_ROOT_ID, "Sarah Chen").with_children(vec![
        OrgNode::new("1", "Marcus Rodriguez"),
        OrgNode::new("2", "Elena Gilbert"),
    ])
}

/// Built-in talent pool.
pub fn default_unassigned() -> Vec<Person> {
    vec![
        Person::new("u1", "Priya Patel"),
        Person::new("u2", "James Wilson"),
        Person::new("u3", "Aiko Tanaka"),
    ]
}

/// Validate a user-supplied display name.
pub(crate) fn normalize_name(name: &str) -> Option<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_record_without_children_when_deserializing_then_children_default_empty() {
        let json = r#"{"tree":{"id":"root","name":"Sarah Chen","depth":0}}"#;

        let record: OrgRecord = serde_json::from_str(json).expect("parse record");

        assert!(record.tree.children.is_empty());
        assert_eq!(record.tree.is_loaded, None);
        assert!(record.unassigned.is_none());
    }

    #[test]
    fn given_missing_is_loaded_when_children_present_then_counts_as_loaded() {
        let with_children = default_tree();
        let leaf = OrgNode::new("x", "X");

        assert!(with_children.children_loaded());
        assert!(!leaf.children_loaded());
        assert!(leaf.clone().with_loaded(true).children_loaded());
    }

    #[test]
    fn given_node_when_serializing_then_uses_camel_case_and_skips_absent_fields() {
        let node = OrgNode::new("a", "A").with_loaded(false);

        let json = serde_json::to_string(&node).expect("serialize");

        assert!(json.contains("\"isLoaded\":false"));
        assert!(!json.contains("role"));
    }

    #[test]
    fn given_nested_subtree_when_contains_then_finds_deep_descendant() {
        let tree = OrgNode::new("a", "A").with_children(vec![
            OrgNode::new("b", "B").with_children(vec![OrgNode::new("c", "C")]),
        ]);

        assert!(tree.contains("a"));
        assert!(tree.contains("c"));
        assert!(!tree.contains("z"));
        assert_eq!(tree.count(), 3);
    }

    #[test]
    fn given_blank_name_when_normalizing_then_rejects() {
        assert_eq!(normalize_name("   "), None);
        assert_eq!(normalize_name("  Ada "), Some("Ada".to_string()));
    }
}
