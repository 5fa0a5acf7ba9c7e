//! Node Manager - Node CRUD and Relationship Operations
//!
//! This module is the mutation surface for nodes of the current graph:
//!
//! - Creation (`create_node`, `create_child_node`, `create_parent_node`,
//!   `create_bro_node`) with code anchoring from the file reader
//! - Deletion, with child promotion or whole-subtree removal
//! - Partial updates and re-parenting
//! - Focus movement through the hierarchy
//! - Location validation, navigation and relocation
//! - Search over a snapshot of the graph
//!
//! # Tree Fork
//!
//! `create_parent_node` on a node that already has a parent does not move
//! that node. It duplicates it, moves the original's children under the
//! duplicate, and attaches the duplicate below the new parent. The original
//! stays under its old parent, childless:
//!
//! ```text
//! before:  A -> B -> C          after:  A -> B
//!                                       D -> B' -> C
//! ```
//!
//! # Concurrency
//!
//! Every mutation runs under the [`GraphManager`] write token. File reads
//! for new nodes happen before the token is taken; reads that depend on the
//! graph (relocation) happen while holding it. Read-only operations work on
//! a snapshot.

use crate::models::{
    coerce_line_number, validate_file_path, validate_name, Graph, LocationValidation, MatchQuery,
    MatchResult, NavigationResult, Node, NodeUpdate,
};
use crate::services::{GraphManager, GraphWriteGuard, LocationTracker, NodeMatcher, Result, TrailError};
use std::sync::Arc;

/// Which way `move_focus` goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FocusMove {
    Parent,
    FirstChild,
    NextSibling,
    PreviousSibling,
}

/// Node operations on the current graph of a [`GraphManager`]
///
/// # Examples
///
/// ```rust
/// use codetrail_core::config::TrailConfig;
/// use codetrail_core::db::MemoryStore;
/// use codetrail_core::services::{GraphManager, NodeManager};
/// use codetrail_core::source::InMemoryFileReader;
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let reader = Arc::new(InMemoryFileReader::new());
/// reader.insert_file("src/main.rs", "fn main() {\n    serve();\n}\n").await;
///
/// let graphs = Arc::new(GraphManager::new(
///     Arc::new(MemoryStore::new()),
///     reader,
///     TrailConfig::default(),
/// ));
/// let nodes = NodeManager::new(graphs);
///
/// let entry = nodes.create_node("Entry", "src/main.rs", 1, None).await?;
/// let serve = nodes.create_child_node(&entry.id, "Serve", "src/main.rs", 2).await?;
///
/// assert_eq!(serve.code_snippet.as_deref(), Some("    serve();"));
/// assert_eq!(serve.parent_id.as_deref(), Some(entry.id.as_str()));
/// # Ok(())
/// # }
/// ```
pub struct NodeManager {
    graphs: Arc<GraphManager>,
    matcher: NodeMatcher,
}

impl NodeManager {
    pub fn new(graphs: Arc<GraphManager>) -> Self {
        let matcher = NodeMatcher::new(graphs.config().matcher.clone());
        Self { graphs, matcher }
    }

    pub fn graph_manager(&self) -> &Arc<GraphManager> {
        &self.graphs
    }

    fn tracker(&self) -> &LocationTracker {
        self.graphs.tracker()
    }

    //
    // CREATION
    //

    /// Create a root node and focus it, opening a default graph if none is
    /// current.
    ///
    /// The text read from `file_path:line_number` becomes the snippet; the
    /// caller's `code_snippet` is only used when the file cannot be read.
    pub async fn create_node(
        &self,
        name: &str,
        file_path: &str,
        line_number: i64,
        code_snippet: Option<String>,
    ) -> Result<Node> {
        let node = self
            .build_node(name, file_path, line_number, code_snippet)
            .await?;
        let guard = self.graphs.write().await;
        let mut graph = guard.snapshot_or_create().await;

        let id = node.id.clone();
        graph.add_node(node)?;
        graph.set_current_node(&id)?;

        let created = find_node(&graph, &id)?;
        tracing::debug!("Created node '{}' ({}) in graph {}", created.name, id, graph.id);
        guard.commit(graph).await;
        Ok(created)
    }

    /// Create a node under `parent_id` and focus it
    pub async fn create_child_node(
        &self,
        parent_id: &str,
        name: &str,
        file_path: &str,
        line_number: i64,
    ) -> Result<Node> {
        let mut node = self.build_node(name, file_path, line_number, None).await?;
        let guard = self.graphs.write().await;
        let mut graph = writable_snapshot(&guard, parent_id).await?;

        node.parent_id = Some(parent_id.to_string());
        let id = node.id.clone();
        graph.add_node(node)?;
        graph.set_current_node(&id)?;

        let created = find_node(&graph, &id)?;
        tracing::debug!("Created child {} under {}", id, parent_id);
        guard.commit(graph).await;
        Ok(created)
    }

    /// Insert a new parent above `child_id` and focus it.
    ///
    /// A root child is simply attached under the new parent. A child that
    /// already has a parent forks the tree (see the module docs). Returns the
    /// new parent.
    pub async fn create_parent_node(
        &self,
        child_id: &str,
        name: &str,
        file_path: &str,
        line_number: i64,
    ) -> Result<Node> {
        let parent = self.build_node(name, file_path, line_number, None).await?;
        let guard = self.graphs.write().await;
        let mut graph = writable_snapshot(&guard, child_id).await?;
        let child = find_node(&graph, child_id)?;

        let parent_id = parent.id.clone();
        graph.add_node(parent)?;

        match child.parent_id {
            None => graph.set_parent_child(&parent_id, child_id)?,
            Some(_) => {
                let duplicate = child.duplicate();
                let duplicate_id = duplicate.id.clone();
                graph.add_node(duplicate)?;
                graph.transfer_children(child_id, &duplicate_id)?;
                graph.set_parent_child(&parent_id, &duplicate_id)?;
                tracing::debug!(
                    "Forked {} into {} under new parent {}",
                    child_id,
                    duplicate_id,
                    parent_id
                );
            }
        }
        graph.set_current_node(&parent_id)?;

        let created = find_node(&graph, &parent_id)?;
        guard.commit(graph).await;
        Ok(created)
    }

    /// Create a node next to `sibling_id`: under the same parent, or as
    /// another root. The new node is focused.
    pub async fn create_bro_node(
        &self,
        sibling_id: &str,
        name: &str,
        file_path: &str,
        line_number: i64,
    ) -> Result<Node> {
        let mut node = self.build_node(name, file_path, line_number, None).await?;
        let guard = self.graphs.write().await;
        let mut graph = writable_snapshot(&guard, sibling_id).await?;
        let sibling = find_node(&graph, sibling_id)?;

        node.parent_id = sibling.parent_id;
        let id = node.id.clone();
        graph.add_node(node)?;
        graph.set_current_node(&id)?;

        let created = find_node(&graph, &id)?;
        guard.commit(graph).await;
        Ok(created)
    }

    /// Validate input and anchor a new node on the code at its location
    async fn build_node(
        &self,
        name: &str,
        file_path: &str,
        line_number: i64,
        fallback_snippet: Option<String>,
    ) -> Result<Node> {
        let name = validate_name(name, self.graphs.config().max_name_length)?;
        let file_path = validate_file_path(file_path)?;
        let line_number = coerce_line_number(line_number);

        let snippet = match self.tracker().read_snippet(&file_path, line_number).await {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::debug!(
                    "Could not read {}:{} ({}), using provided snippet",
                    file_path,
                    line_number,
                    e
                );
                fallback_snippet
            }
        };
        let hash = LocationTracker::code_hash_for(snippet.as_deref());

        Ok(Node::new(name, file_path, line_number).with_code(snippet, hash))
    }

    //
    // DELETION
    //

    /// Delete a node. Its children become roots. Returns the removed node.
    pub async fn delete_node(&self, id: &str) -> Result<Node> {
        let removed = self
            .graphs
            .mutate_current(|graph| Ok(graph.remove_node(id)?))
            .await
            .map_err(|e| not_found_as_node(e, id))?;

        tracing::debug!("Deleted node {} ({} child(ren) promoted)", id, removed.child_ids.len());
        Ok(removed)
    }

    /// Delete a node and its whole subtree, deepest nodes first.
    ///
    /// Returns the removed IDs in pre-order (the node itself first).
    pub async fn delete_node_with_children(&self, id: &str) -> Result<Vec<String>> {
        self.graphs
            .mutate_current(|graph| {
                if !graph.contains(id) {
                    return Err(TrailError::node_not_found(id));
                }

                let mut order = vec![id.to_string()];
                order.extend(graph.descendants_preorder(id));
                for node_id in order.iter().rev() {
                    graph.remove_node(node_id)?;
                }

                tracing::debug!("Deleted subtree of {} ({} node(s))", id, order.len());
                Ok(order)
            })
            .await
            .map_err(|e| not_found_as_node(e, id))
    }

    //
    // UPDATES
    //

    /// Apply the fields present in `update`.
    ///
    /// A new snippet recomputes the hash; clearing the snippet clears the
    /// hash. Hierarchy and identity cannot change here.
    pub async fn update_node(&self, id: &str, update: NodeUpdate) -> Result<Node> {
        let max_name_length = self.graphs.config().max_name_length;
        let name = update
            .name
            .as_deref()
            .map(|n| validate_name(n, max_name_length))
            .transpose()?;
        let file_path = update
            .file_path
            .as_deref()
            .map(validate_file_path)
            .transpose()?;
        let line_number = update.line_number.map(coerce_line_number);
        let unchanged = update.is_empty();

        self.graphs
            .mutate_current(|graph| {
                let node = graph.node_mut(id)?;
                if unchanged {
                    return Ok(node.clone());
                }

                if let Some(name) = name {
                    node.name = name;
                }
                if file_path.is_some() || line_number.is_some() {
                    let path = file_path.unwrap_or_else(|| node.file_path.clone());
                    let line = line_number.unwrap_or(node.line_number);
                    node.set_location(path, line);
                }
                if let Some(snippet) = update.code_snippet {
                    let hash = LocationTracker::code_hash_for(snippet.as_deref());
                    node.set_code(snippet, hash);
                }
                if let Some(warning) = update.validation_warning {
                    node.validation_warning = warning;
                }
                node.touch();

                Ok(node.clone())
            })
            .await
            .map_err(|e| not_found_as_node(e, id))
    }

    /// Re-parent a node. `None` makes it a root.
    ///
    /// Rejects making a node its own parent or a child of its own
    /// descendant.
    pub async fn move_node(&self, id: &str, new_parent_id: Option<&str>) -> Result<Node> {
        self.graphs
            .mutate_current(|graph| {
                match new_parent_id {
                    Some(parent_id) => graph.set_parent_child(parent_id, id)?,
                    None => graph.detach_to_root(id)?,
                }
                find_node(graph, id)
            })
            .await
            .map_err(|e| not_found_as_node(e, id))
    }

    //
    // READS
    //

    pub async fn get_node(&self, id: &str) -> Result<Node> {
        let graph = self.snapshot().await;
        graph
            .as_ref()
            .and_then(|g| g.get_node(id).cloned())
            .ok_or_else(|| TrailError::node_not_found(id))
    }

    pub async fn get_current_node(&self) -> Option<Node> {
        self.snapshot()
            .await
            .and_then(|g| g.current_node().cloned())
    }

    /// Every node of the current graph, in hierarchy pre-order
    pub async fn list_nodes(&self) -> Vec<Node> {
        let Some(graph) = self.snapshot().await else {
            return Vec::new();
        };

        let mut ordered = Vec::with_capacity(graph.node_count());
        for root_id in graph.root_nodes() {
            ordered.push(root_id.clone());
            ordered.extend(graph.descendants_preorder(root_id));
        }
        ordered
            .iter()
            .filter_map(|id| graph.get_node(id).cloned())
            .collect()
    }

    /// Direct children in order
    pub async fn get_children(&self, id: &str) -> Result<Vec<Node>> {
        let graph = self.snapshot_containing(id).await?;
        Ok(graph.children(id).into_iter().cloned().collect())
    }

    /// Ancestors, nearest first
    pub async fn get_ancestors(&self, id: &str) -> Result<Vec<Node>> {
        let graph = self.snapshot_containing(id).await?;
        Ok(graph.ancestors(id).into_iter().cloned().collect())
    }

    pub async fn get_root_nodes(&self) -> Vec<Node> {
        let Some(graph) = self.snapshot().await else {
            return Vec::new();
        };
        graph
            .root_nodes()
            .iter()
            .filter_map(|id| graph.get_node(id).cloned())
            .collect()
    }

    //
    // FOCUS
    //

    pub async fn set_current_node(&self, id: &str) -> Result<Node> {
        self.graphs
            .mutate_current(|graph| {
                graph.set_current_node(id)?;
                find_node(graph, id)
            })
            .await
            .map_err(|e| not_found_as_node(e, id))
    }

    pub async fn focus_parent(&self) -> Result<Option<Node>> {
        self.move_focus(FocusMove::Parent).await
    }

    pub async fn focus_first_child(&self) -> Result<Option<Node>> {
        self.move_focus(FocusMove::FirstChild).await
    }

    pub async fn focus_next_sibling(&self) -> Result<Option<Node>> {
        self.move_focus(FocusMove::NextSibling).await
    }

    pub async fn focus_previous_sibling(&self) -> Result<Option<Node>> {
        self.move_focus(FocusMove::PreviousSibling).await
    }

    /// Move the focus; `None` (focus unchanged) when there is nowhere to go
    async fn move_focus(&self, direction: FocusMove) -> Result<Option<Node>> {
        let guard = self.graphs.write().await;
        let mut graph = guard.require_snapshot().await?;
        let Some(current) = graph.current_node().cloned() else {
            return Ok(None);
        };

        let target = match direction {
            FocusMove::Parent => current.parent_id.clone(),
            FocusMove::FirstChild => current.child_ids.first().cloned(),
            FocusMove::NextSibling | FocusMove::PreviousSibling => {
                graph.sibling_ids(&current.id).and_then(|siblings| {
                    let position = siblings.iter().position(|s| *s == current.id)?;
                    let index = match direction {
                        FocusMove::NextSibling => position.checked_add(1)?,
                        _ => position.checked_sub(1)?,
                    };
                    siblings.get(index).cloned()
                })
            }
        };

        let Some(target) = target else {
            return Ok(None);
        };
        graph.set_current_node(&target)?;
        let focused = find_node(&graph, &target)?;
        guard.commit(graph).await;
        Ok(Some(focused))
    }

    //
    // LOCATION
    //

    /// Check a node's location against the file. Does not mutate.
    pub async fn validate_node(&self, id: &str) -> Result<LocationValidation> {
        let node = self.get_node(id).await?;
        Ok(self.tracker().validate_location(&node).await)
    }

    /// Where to open a node: its recorded location, or where its code moved.
    /// Does not mutate.
    pub async fn navigate_to_node(&self, id: &str) -> Result<NavigationResult> {
        let node = self.get_node(id).await?;
        let result = self.tracker().navigate_to_node(&node).await;
        if !result.success {
            tracing::warn!(
                "Cannot navigate to node {}: {}",
                id,
                result.validation.reason.as_deref().unwrap_or("unknown reason")
            );
        }
        Ok(result)
    }

    /// Point a node at a new location and re-anchor it on the code there
    pub async fn relocate_node(&self, id: &str, file_path: &str, line_number: i64) -> Result<Node> {
        let file_path = validate_file_path(file_path)?;
        let line_number = coerce_line_number(line_number);

        let guard = self.graphs.write().await;
        let mut graph = writable_snapshot(&guard, id).await?;
        let node = find_node(&graph, id)?;

        let updated = self
            .tracker()
            .update_node_location(&node, &file_path, line_number)
            .await;
        apply_location(&mut graph, &updated)?;

        guard.commit(graph).await;
        Ok(updated)
    }

    /// Validate a node and, if its code was found elsewhere, move it there
    /// and clear its warning. `None` when there was nothing to commit.
    pub async fn accept_suggested_location(&self, id: &str) -> Result<Option<Node>> {
        let guard = self.graphs.write().await;
        let mut graph = writable_snapshot(&guard, id).await?;
        let node = find_node(&graph, id)?;

        let validation = self.tracker().validate_location(&node).await;
        let Some(suggested) = validation.suggested_location else {
            return Ok(None);
        };

        let updated = self
            .tracker()
            .update_node_location(&node, &suggested.file_path, suggested.line_number)
            .await;
        apply_location(&mut graph, &updated)?;
        tracing::info!(
            "Moved node {} from line {} to {} ({})",
            id,
            node.line_number,
            suggested.line_number,
            validation.confidence
        );

        guard.commit(graph).await;
        Ok(Some(updated))
    }

    //
    // SEARCH
    //

    pub async fn find_nodes(&self, query: &MatchQuery) -> Vec<MatchResult> {
        match self.snapshot().await {
            Some(graph) => self.matcher.find_nodes_intelligent(&graph, query),
            None => Vec::new(),
        }
    }

    pub async fn find_nodes_by_proximity(&self, file_path: &str, line_number: i64) -> Vec<MatchResult> {
        match self.snapshot().await {
            Some(graph) => self.matcher.find_nodes_by_proximity(
                &graph,
                file_path,
                coerce_line_number(line_number),
            ),
            None => Vec::new(),
        }
    }

    pub async fn find_related_nodes(&self, id: &str) -> Result<Vec<MatchResult>> {
        let graph = self.snapshot_containing(id).await?;
        Ok(self.matcher.find_related_nodes(&graph, id))
    }

    async fn snapshot(&self) -> Option<Graph> {
        self.graphs.current_graph().await
    }

    async fn snapshot_containing(&self, id: &str) -> Result<Graph> {
        match self.snapshot().await {
            Some(graph) if graph.contains(id) => Ok(graph),
            _ => Err(TrailError::node_not_found(id)),
        }
    }
}

/// Writable snapshot that must contain `id`
async fn writable_snapshot(guard: &GraphWriteGuard<'_>, id: &str) -> Result<Graph> {
    match guard.snapshot().await {
        Some(graph) if graph.contains(id) => Ok(graph),
        _ => Err(TrailError::node_not_found(id)),
    }
}

fn find_node(graph: &Graph, id: &str) -> Result<Node> {
    graph
        .get_node(id)
        .cloned()
        .ok_or_else(|| TrailError::node_not_found(id))
}

/// Copy the location, anchor and warning of `updated` into the graph
fn apply_location(graph: &mut Graph, updated: &Node) -> Result<()> {
    let node = graph.node_mut(&updated.id)?;
    node.set_location(updated.file_path.clone(), updated.line_number);
    node.set_code(updated.code_snippet.clone(), updated.code_hash.clone());
    node.validation_warning = updated.validation_warning.clone();
    Ok(())
}

/// With no graph open, a node lookup is a missing node rather than a
/// missing graph
fn not_found_as_node(err: TrailError, id: &str) -> TrailError {
    match err {
        TrailError::NotFound {
            entity: "Current graph",
            ..
        } => TrailError::node_not_found(id),
        other => other,
    }
}


// Tree fork and subtree deletion scenarios
#[cfg(test)]
#[path = "node_manager_fork_test.rs"]
mod node_manager_fork_test;
