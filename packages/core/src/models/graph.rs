//! Graph Aggregate
//!
//! A `Graph` owns every [`Node`] of one code trail, the ordered list of root
//! node IDs and the currently focused node. All structural changes go
//! through the mutation primitives here so the hierarchy stays consistent:
//!
//! - every `parent_id` points at an existing node that lists the child in
//!   its `child_ids`, and every listed child points back
//! - `root_nodes` is exactly the set of nodes without a parent
//! - `current_node_id` is either `None` or an existing node
//!
//! Primitives either apply completely or fail without touching the graph.

use crate::models::Node;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use uuid::Uuid;

/// Structural errors raised by graph primitives
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Node already exists: {0}")]
    DuplicateId(String),

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Cannot attach {child_id} under {parent_id}: it would create a cycle")]
    WouldCreateCycle { parent_id: String, child_id: String },
}

/// A broken hierarchy invariant, as reported by [`Graph::invariant_violations`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GraphInvariantViolation {
    MissingParent { node_id: String, parent_id: String },
    ChildNotListed { node_id: String, parent_id: String },
    UnknownChild { parent_id: String, child_id: String },
    ChildPointsElsewhere { parent_id: String, child_id: String },
    DuplicateChild { parent_id: String, child_id: String },
    RootHasParent { node_id: String },
    UnknownRoot { node_id: String },
    RootNotListed { node_id: String },
    DuplicateRoot { node_id: String },
    DanglingCurrentNode { node_id: String },
    CycleDetected { node_id: String },
}

/// Summary of a stored graph, for listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphMetadata {
    pub id: String,
    pub name: String,
    pub node_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A full hierarchy of nodes plus the focused node.
///
/// Deserialization goes through [`Graph::from_parts`], so stored data with
/// broken links is repaired on the way in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "StoredGraph")]
pub struct Graph {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    nodes: HashMap<String, Node>,
    root_nodes: Vec<String>,
    current_node_id: Option<String>,
}

/// Serialized graph as read from storage, before repair
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredGraph {
    id: String,
    name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    nodes: HashMap<String, Node>,
    #[serde(default)]
    root_nodes: Vec<String>,
    #[serde(default)]
    current_node_id: Option<String>,
}

impl From<StoredGraph> for Graph {
    fn from(stored: StoredGraph) -> Self {
        let mut nodes: Vec<Node> = stored.nodes.into_values().collect();
        // Orphans promoted during repair are appended in creation order
        nodes.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));

        Graph::from_parts(
            stored.id,
            stored.name,
            stored.created_at,
            stored.updated_at,
            nodes,
            stored.root_nodes,
            stored.current_node_id,
        )
    }
}

impl Graph {
    /// Create an empty graph with a fresh UUID
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            created_at: now,
            updated_at: now,
            nodes: HashMap::new(),
            root_nodes: Vec::new(),
            current_node_id: None,
        }
    }

    //
    // MUTATION PRIMITIVES
    //

    /// Insert a node.
    ///
    /// A node without a parent is appended to `root_nodes`. A node that
    /// arrives with a `parent_id` is linked into that parent's `child_ids`,
    /// so the parent must already exist. Any `child_ids` it carries are
    /// ignored; children are attached through [`Graph::set_parent_child`].
    pub fn add_node(&mut self, mut node: Node) -> Result<(), GraphError> {
        if self.nodes.contains_key(&node.id) {
            return Err(GraphError::DuplicateId(node.id));
        }
        if let Some(parent_id) = &node.parent_id {
            if !self.nodes.contains_key(parent_id) {
                return Err(GraphError::NodeNotFound(parent_id.clone()));
            }
        }

        node.child_ids.clear();
        let id = node.id.clone();
        match node.parent_id.clone() {
            Some(parent_id) => {
                if let Some(parent) = self.nodes.get_mut(&parent_id) {
                    parent.child_ids.push(id.clone());
                }
            }
            None => self.root_nodes.push(id.clone()),
        }

        self.nodes.insert(id, node);
        self.touch();
        Ok(())
    }

    /// Remove a node, promoting its children to roots.
    ///
    /// Children keep their own subtrees; only their `parent_id` is cleared.
    /// Clears the current node pointer if it pointed at the removed node.
    pub fn remove_node(&mut self, id: &str) -> Result<Node, GraphError> {
        let node = self
            .nodes
            .remove(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.to_string()))?;

        match &node.parent_id {
            Some(parent_id) => {
                if let Some(parent) = self.nodes.get_mut(parent_id) {
                    parent.child_ids.retain(|child| child != id);
                }
            }
            None => self.root_nodes.retain(|root| root != id),
        }

        for child_id in &node.child_ids {
            if let Some(child) = self.nodes.get_mut(child_id) {
                child.parent_id = None;
                child.touch();
                self.root_nodes.push(child_id.clone());
            }
        }

        if self.current_node_id.as_deref() == Some(id) {
            self.current_node_id = None;
        }

        self.touch();
        Ok(node)
    }

    /// Make `child_id` a child of `parent_id`.
    ///
    /// If the child already had a different parent it is detached from it
    /// first; if it was a root it leaves `root_nodes`. The child is appended
    /// to the parent's `child_ids` unless already present. Rejects links
    /// that would make a node its own ancestor.
    pub fn set_parent_child(&mut self, parent_id: &str, child_id: &str) -> Result<(), GraphError> {
        if !self.nodes.contains_key(parent_id) {
            return Err(GraphError::NodeNotFound(parent_id.to_string()));
        }
        let previous_parent = match self.nodes.get(child_id) {
            Some(child) => child.parent_id.clone(),
            None => return Err(GraphError::NodeNotFound(child_id.to_string())),
        };
        if parent_id == child_id || self.is_ancestor(child_id, parent_id) {
            return Err(GraphError::WouldCreateCycle {
                parent_id: parent_id.to_string(),
                child_id: child_id.to_string(),
            });
        }

        match previous_parent.as_deref() {
            Some(old) if old != parent_id => {
                if let Some(old_parent) = self.nodes.get_mut(old) {
                    old_parent.child_ids.retain(|c| c != child_id);
                    old_parent.touch();
                }
            }
            Some(_) => {}
            None => self.root_nodes.retain(|root| root != child_id),
        }

        if let Some(child) = self.nodes.get_mut(child_id) {
            child.parent_id = Some(parent_id.to_string());
            child.touch();
        }
        if let Some(parent) = self.nodes.get_mut(parent_id) {
            if !parent.child_ids.iter().any(|c| c == child_id) {
                parent.child_ids.push(child_id.to_string());
            }
            parent.touch();
        }

        self.touch();
        Ok(())
    }

    /// Detach a node from its parent and append it to `root_nodes`.
    ///
    /// No-op for nodes that are already roots.
    pub fn detach_to_root(&mut self, id: &str) -> Result<(), GraphError> {
        let parent_id = match self.nodes.get(id) {
            Some(node) => node.parent_id.clone(),
            None => return Err(GraphError::NodeNotFound(id.to_string())),
        };
        let Some(parent_id) = parent_id else {
            return Ok(());
        };

        if let Some(parent) = self.nodes.get_mut(&parent_id) {
            parent.child_ids.retain(|c| c != id);
            parent.touch();
        }
        if let Some(node) = self.nodes.get_mut(id) {
            node.parent_id = None;
            node.touch();
        }
        self.root_nodes.push(id.to_string());
        self.touch();
        Ok(())
    }

    /// Move every child of `from_id` under `to_id`, preserving order.
    ///
    /// `from_id` ends up childless. `to_id` must not be a descendant of
    /// `from_id` (that would orphan the moved subtree into a cycle).
    pub fn transfer_children(&mut self, from_id: &str, to_id: &str) -> Result<(), GraphError> {
        if !self.nodes.contains_key(to_id) {
            return Err(GraphError::NodeNotFound(to_id.to_string()));
        }
        let children = match self.nodes.get(from_id) {
            Some(node) => node.child_ids.clone(),
            None => return Err(GraphError::NodeNotFound(from_id.to_string())),
        };
        if children
            .iter()
            .any(|child| child == to_id || self.is_ancestor(child, to_id))
        {
            return Err(GraphError::WouldCreateCycle {
                parent_id: to_id.to_string(),
                child_id: from_id.to_string(),
            });
        }

        for child_id in &children {
            if let Some(child) = self.nodes.get_mut(child_id) {
                child.parent_id = Some(to_id.to_string());
                child.touch();
            }
        }
        if let Some(from) = self.nodes.get_mut(from_id) {
            from.child_ids.clear();
            from.touch();
        }
        if let Some(to) = self.nodes.get_mut(to_id) {
            for child_id in children {
                if !to.child_ids.contains(&child_id) {
                    to.child_ids.push(child_id);
                }
            }
            to.touch();
        }

        self.touch();
        Ok(())
    }

    /// Point the focus at an existing node
    pub fn set_current_node(&mut self, id: &str) -> Result<(), GraphError> {
        if !self.nodes.contains_key(id) {
            return Err(GraphError::NodeNotFound(id.to_string()));
        }
        self.current_node_id = Some(id.to_string());
        self.touch();
        Ok(())
    }

    /// Drop the focus
    pub fn clear_current_node(&mut self) {
        self.current_node_id = None;
        self.touch();
    }

    /// Mutable access to a node's non-structural fields.
    ///
    /// Callers must not edit `id`, `parent_id` or `child_ids` through this;
    /// use the primitives above.
    pub fn node_mut(&mut self, id: &str) -> Result<&mut Node, GraphError> {
        self.updated_at = Utc::now();
        self.nodes
            .get_mut(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.to_string()))
    }

    /// Bump the modification timestamp
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    //
    // QUERIES
    //

    pub fn get_node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// The focused node, if any
    pub fn current_node(&self) -> Option<&Node> {
        self.current_node_id
            .as_deref()
            .and_then(|id| self.nodes.get(id))
    }

    pub fn current_node_id(&self) -> Option<&str> {
        self.current_node_id.as_deref()
    }

    /// Root node IDs in insertion order
    pub fn root_nodes(&self) -> &[String] {
        &self.root_nodes
    }

    /// All nodes, in no particular order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Direct children in `child_ids` order
    pub fn children(&self, id: &str) -> Vec<&Node> {
        self.nodes
            .get(id)
            .map(|node| {
                node.child_ids
                    .iter()
                    .filter_map(|child| self.nodes.get(child))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// IDs of the node's siblings list, itself included: the parent's
    /// `child_ids`, or `root_nodes` for a root.
    pub fn sibling_ids(&self, id: &str) -> Option<&[String]> {
        let node = self.nodes.get(id)?;
        match &node.parent_id {
            Some(parent_id) => self.nodes.get(parent_id).map(|p| p.child_ids.as_slice()),
            None => Some(self.root_nodes.as_slice()),
        }
    }

    /// Ancestors from the direct parent up to the root
    pub fn ancestors(&self, id: &str) -> Vec<&Node> {
        let mut result = Vec::new();
        let mut seen = HashSet::new();
        let mut cursor = self.nodes.get(id).and_then(|n| n.parent_id.as_deref());

        while let Some(parent_id) = cursor {
            if !seen.insert(parent_id) {
                break;
            }
            match self.nodes.get(parent_id) {
                Some(parent) => {
                    result.push(parent);
                    cursor = parent.parent_id.as_deref();
                }
                None => break,
            }
        }

        result
    }

    /// Whether `ancestor_id` lies on the parent chain above `id`
    pub fn is_ancestor(&self, ancestor_id: &str, id: &str) -> bool {
        self.ancestors(id).iter().any(|n| n.id == ancestor_id)
    }

    /// The subtree below `id` in pre-order (parent before children),
    /// excluding `id` itself.
    pub fn descendants_preorder(&self, id: &str) -> Vec<String> {
        let mut result = Vec::new();
        let mut seen = HashSet::new();
        let mut stack: Vec<&str> = self
            .nodes
            .get(id)
            .map(|n| n.child_ids.iter().rev().map(String::as_str).collect())
            .unwrap_or_default();

        while let Some(current) = stack.pop() {
            if !seen.insert(current) {
                continue;
            }
            if let Some(node) = self.nodes.get(current) {
                result.push(current.to_string());
                stack.extend(node.child_ids.iter().rev().map(String::as_str));
            }
        }

        result
    }

    pub fn metadata(&self) -> GraphMetadata {
        GraphMetadata {
            id: self.id.clone(),
            name: self.name.clone(),
            node_count: self.nodes.len(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    //
    // INVARIANTS
    //

    /// Every broken hierarchy invariant. Empty for a consistent graph.
    pub fn invariant_violations(&self) -> Vec<GraphInvariantViolation> {
        let mut violations = Vec::new();

        for node in self.nodes.values() {
            if let Some(parent_id) = &node.parent_id {
                match self.nodes.get(parent_id) {
                    None => violations.push(GraphInvariantViolation::MissingParent {
                        node_id: node.id.clone(),
                        parent_id: parent_id.clone(),
                    }),
                    Some(parent) if !parent.child_ids.contains(&node.id) => {
                        violations.push(GraphInvariantViolation::ChildNotListed {
                            node_id: node.id.clone(),
                            parent_id: parent_id.clone(),
                        })
                    }
                    Some(_) => {}
                }
            } else if !self.root_nodes.contains(&node.id) {
                violations.push(GraphInvariantViolation::RootNotListed {
                    node_id: node.id.clone(),
                });
            }

            let mut seen_children = HashSet::new();
            for child_id in &node.child_ids {
                if !seen_children.insert(child_id) {
                    violations.push(GraphInvariantViolation::DuplicateChild {
                        parent_id: node.id.clone(),
                        child_id: child_id.clone(),
                    });
                }
                match self.nodes.get(child_id) {
                    None => violations.push(GraphInvariantViolation::UnknownChild {
                        parent_id: node.id.clone(),
                        child_id: child_id.clone(),
                    }),
                    Some(child) if child.parent_id.as_deref() != Some(node.id.as_str()) => {
                        violations.push(GraphInvariantViolation::ChildPointsElsewhere {
                            parent_id: node.id.clone(),
                            child_id: child_id.clone(),
                        })
                    }
                    Some(_) => {}
                }
            }

            if self.is_ancestor(&node.id, &node.id) {
                violations.push(GraphInvariantViolation::CycleDetected {
                    node_id: node.id.clone(),
                });
            }
        }

        let mut seen_roots = HashSet::new();
        for root_id in &self.root_nodes {
            if !seen_roots.insert(root_id) {
                violations.push(GraphInvariantViolation::DuplicateRoot {
                    node_id: root_id.clone(),
                });
            }
            match self.nodes.get(root_id) {
                None => violations.push(GraphInvariantViolation::UnknownRoot {
                    node_id: root_id.clone(),
                }),
                Some(node) if node.parent_id.is_some() => {
                    violations.push(GraphInvariantViolation::RootHasParent {
                        node_id: root_id.clone(),
                    })
                }
                Some(_) => {}
            }
        }

        if let Some(current) = &self.current_node_id {
            if !self.nodes.contains_key(current) {
                violations.push(GraphInvariantViolation::DanglingCurrentNode {
                    node_id: current.clone(),
                });
            }
        }

        violations
    }

    /// Rebuild a consistent graph from possibly inconsistent parts.
    ///
    /// Used for data that did not come through the primitives (imports,
    /// stored or hand-edited files). Parent links win over child lists: a node whose
    /// parent is missing, or whose parent chain loops back to itself,
    /// becomes a root; each parent's `child_ids` keeps its recorded order
    /// for valid children and appends any it forgot. Existing root order is
    /// kept and new roots are appended.
    pub fn from_parts(
        id: String,
        name: String,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
        nodes: Vec<Node>,
        root_order: Vec<String>,
        current_node_id: Option<String>,
    ) -> Self {
        let mut by_id: HashMap<String, Node> = HashMap::with_capacity(nodes.len());
        let mut insertion_order = Vec::with_capacity(nodes.len());
        for node in nodes {
            if !by_id.contains_key(&node.id) {
                insertion_order.push(node.id.clone());
                by_id.insert(node.id.clone(), node);
            }
        }

        // Missing parents and self-parents become roots
        for id in &insertion_order {
            let orphan = match by_id.get(id).and_then(|n| n.parent_id.as_ref()) {
                Some(parent_id) => parent_id == id || !by_id.contains_key(parent_id),
                None => false,
            };
            if orphan {
                if let Some(node) = by_id.get_mut(id) {
                    node.parent_id = None;
                }
            }
        }

        // Break parent loops by promoting the first node found on each loop
        for id in &insertion_order {
            let mut seen = HashSet::new();
            let mut cursor = id.clone();
            while let Some(parent) = by_id.get(&cursor).and_then(|n| n.parent_id.clone()) {
                if parent == *id {
                    if let Some(node) = by_id.get_mut(id) {
                        node.parent_id = None;
                    }
                    break;
                }
                // A loop further up; it is broken when one of its members is visited
                if !seen.insert(cursor.clone()) {
                    break;
                }
                cursor = parent;
            }
        }

        // Rebuild child lists from parent links, keeping recorded order
        let mut children_of: HashMap<String, Vec<String>> = HashMap::new();
        for id in &insertion_order {
            if let Some(parent_id) = by_id.get(id).and_then(|n| n.parent_id.clone()) {
                children_of.entry(parent_id).or_default().push(id.clone());
            }
        }
        for id in &insertion_order {
            let actual = children_of.remove(id).unwrap_or_default();
            if let Some(node) = by_id.get_mut(id) {
                let mut ordered: Vec<String> = node
                    .child_ids
                    .iter()
                    .filter(|c| actual.contains(c))
                    .cloned()
                    .collect();
                let mut listed: HashSet<String> = HashSet::new();
                ordered.retain(|c| listed.insert(c.clone()));
                for child in actual {
                    if listed.insert(child.clone()) {
                        ordered.push(child);
                    }
                }
                node.child_ids = ordered;
            }
        }

        let is_root = |id: &String| by_id.get(id).is_some_and(|n| n.parent_id.is_none());
        let mut root_nodes: Vec<String> = Vec::new();
        for id in root_order.iter().chain(insertion_order.iter()) {
            if is_root(id) && !root_nodes.contains(id) {
                root_nodes.push(id.clone());
            }
        }

        let current_node_id = current_node_id.filter(|id| by_id.contains_key(id));

        Self {
            id,
            name,
            created_at,
            updated_at,
            nodes: by_id,
            root_nodes,
            current_node_id,
        }
    }
}
