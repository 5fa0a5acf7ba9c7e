//! Graph Manager - Graph Lifecycle and Exclusive Mutation
//!
//! This module owns the one in-memory "current" graph and everything about
//! its lifecycle:
//!
//! - create, load, save, delete, list, rename, close
//! - export and import (see [`graph_export`](crate::services::graph_export))
//! - the post-load location validation pass
//!
//! # Concurrency
//!
//! Every mutating call holds a per-manager write token (`tokio::sync::Mutex`)
//! for its whole snapshot -> mutate -> swap -> persist sequence, so two
//! mutations can never interleave and overwrite each other. The graph itself
//! sits behind an `RwLock`; read-only callers take a short read lock to clone
//! a snapshot and never wait on file I/O done by writers.
//!
//! Mutations run on a copy that is swapped in only on success, so a failing
//! mutation leaves the current graph untouched.
//!
//! # Persistence Failures
//!
//! Implicit saves after a mutation log a warning and carry on: the in-memory
//! graph stays authoritative. [`GraphManager::save_current_graph`] is the
//! explicit retry path and propagates errors. Load failures always propagate.

use crate::config::TrailConfig;
use crate::db::GraphStore;
use crate::models::{validate_name, Graph, GraphMetadata, LocationValidation};
use crate::services::graph_export::{export_graph, import_graph, ExportFormat};
use crate::services::{LocationTracker, Result, TrailError};
use crate::source::FileReader;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard, RwLock};

/// Validation outcome for one node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeValidationResult {
    pub node_id: String,
    pub node_name: String,
    pub validation: LocationValidation,
}

/// Summary of a location validation pass over a whole graph
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphValidationReport {
    /// Nodes checked
    pub checked: usize,
    /// Nodes whose recorded location is still right
    pub valid: usize,
    /// Invalid nodes with a suggested new location
    pub relocatable: usize,
    /// Invalid nodes without a suggestion
    pub failed: usize,
    pub results: Vec<NodeValidationResult>,
}

/// Owns the current graph and serializes every change to it
pub struct GraphManager {
    store: Arc<dyn GraphStore>,
    tracker: LocationTracker,
    config: TrailConfig,
    current: RwLock<Option<Graph>>,
    write_token: Mutex<()>,
}

/// Exclusive write access to the current graph.
///
/// Holding the guard keeps every other mutation waiting. Take a snapshot,
/// change it (awaiting file reads is fine), then [`commit`](Self::commit).
/// Dropping the guard without committing discards the changes.
pub struct GraphWriteGuard<'a> {
    manager: &'a GraphManager,
    _token: MutexGuard<'a, ()>,
}

impl GraphWriteGuard<'_> {
    /// Copy of the current graph, if one is open
    pub async fn snapshot(&self) -> Option<Graph> {
        self.manager.current.read().await.clone()
    }

    /// Copy of the current graph, failing when none is open
    pub async fn require_snapshot(&self) -> Result<Graph> {
        self.snapshot().await.ok_or_else(TrailError::no_current_graph)
    }

    /// Copy of the current graph, opening a new default-named one if needed.
    ///
    /// A newly created graph is not current until committed.
    pub async fn snapshot_or_create(&self) -> Graph {
        match self.snapshot().await {
            Some(graph) => graph,
            None => {
                tracing::info!(
                    "No current graph, creating '{}'",
                    self.manager.config.default_graph_name
                );
                Graph::new(self.manager.config.default_graph_name.clone())
            }
        }
    }

    /// Swap the graph in as current and persist it (non-fatal)
    pub async fn commit(self, graph: Graph) {
        self.manager.install(graph.clone()).await;
        self.manager.persist(&graph).await;
    }
}

impl GraphManager {
    pub fn new(store: Arc<dyn GraphStore>, reader: Arc<dyn FileReader>, config: TrailConfig) -> Self {
        let tracker = LocationTracker::new(reader, config.relocation.clone());
        Self {
            store,
            tracker,
            config,
            current: RwLock::new(None),
            write_token: Mutex::new(()),
        }
    }

    pub fn tracker(&self) -> &LocationTracker {
        &self.tracker
    }

    pub fn config(&self) -> &TrailConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn GraphStore> {
        &self.store
    }

    /// Acquire the exclusive write token
    pub async fn write(&self) -> GraphWriteGuard<'_> {
        GraphWriteGuard {
            manager: self,
            _token: self.write_token.lock().await,
        }
    }

    /// Apply a synchronous change to the current graph.
    ///
    /// Runs on a copy; the copy becomes current (and is persisted) only if
    /// `f` succeeds. Fails when no graph is open.
    pub async fn mutate_current<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Graph) -> Result<T>,
    {
        let guard = self.write().await;
        let mut graph = guard.require_snapshot().await?;
        let value = f(&mut graph)?;
        guard.commit(graph).await;
        Ok(value)
    }

    //
    // LIFECYCLE
    //

    /// Create an empty graph and make it current
    pub async fn create_graph(&self, name: &str) -> Result<Graph> {
        let name = validate_name(name, self.config.max_name_length)?;
        let guard = self.write().await;

        let graph = Graph::new(name);
        tracing::info!("Created graph '{}' ({})", graph.name, graph.id);
        guard.commit(graph.clone()).await;
        Ok(graph)
    }

    /// Load a stored graph, validate its node locations, and make it current.
    ///
    /// Load errors propagate: there is no fallback graph.
    pub async fn load_graph(&self, id: &str) -> Result<Graph> {
        let (graph, _) = self.load_graph_with_report(id).await?;
        Ok(graph)
    }

    /// Same as [`load_graph`](Self::load_graph), also returning the report
    /// of the validation pass run on load
    pub async fn load_graph_with_report(&self, id: &str) -> Result<(Graph, GraphValidationReport)> {
        let guard = self.write().await;

        let mut graph = self.store.load(id).await?;
        let report = self.validate_graph(&mut graph).await;
        tracing::info!(
            "Loaded graph '{}' ({}): {} node(s), {} valid, {} relocatable, {} failed",
            graph.name,
            graph.id,
            report.checked,
            report.valid,
            report.relocatable,
            report.failed
        );

        guard.commit(graph.clone()).await;
        Ok((graph, report))
    }

    /// Re-run the location validation pass over the current graph
    pub async fn validate_current_graph(&self) -> Result<GraphValidationReport> {
        let guard = self.write().await;
        let mut graph = guard.require_snapshot().await?;

        let report = self.validate_graph(&mut graph).await;
        guard.commit(graph).await;
        Ok(report)
    }

    /// Persist the current graph, propagating failures
    pub async fn save_current_graph(&self) -> Result<()> {
        let _guard = self.write().await;
        let graph = self
            .current
            .read()
            .await
            .clone()
            .ok_or_else(TrailError::no_current_graph)?;

        self.store.save(&graph).await?;
        tracing::debug!("Saved graph {}", graph.id);
        Ok(())
    }

    /// Delete a stored graph. Closes it when it is the current one.
    pub async fn delete_graph(&self, id: &str) -> Result<bool> {
        let _guard = self.write().await;

        let existed = self.store.delete(id).await?;
        let mut current = self.current.write().await;
        if current.as_ref().is_some_and(|g| g.id == id) {
            *current = None;
        }

        tracing::info!("Deleted graph {} (existed: {})", id, existed);
        Ok(existed)
    }

    pub async fn list_graphs(&self) -> Result<Vec<GraphMetadata>> {
        Ok(self.store.list().await?)
    }

    /// Snapshot of the current graph
    pub async fn current_graph(&self) -> Option<Graph> {
        self.current.read().await.clone()
    }

    pub async fn current_graph_id(&self) -> Option<String> {
        self.current.read().await.as_ref().map(|g| g.id.clone())
    }

    pub async fn rename_current_graph(&self, name: &str) -> Result<Graph> {
        let name = validate_name(name, self.config.max_name_length)?;
        self.mutate_current(|graph| {
            graph.name = name;
            graph.touch();
            Ok(graph.clone())
        })
        .await
    }

    /// Drop the in-memory graph. It must already be durable.
    pub async fn close_current_graph(&self) {
        let _guard = self.write().await;
        if let Some(graph) = self.current.write().await.take() {
            tracing::debug!("Closed graph {}", graph.id);
        }
    }

    //
    // EXPORT / IMPORT
    //

    pub async fn export_current_graph(&self, format: ExportFormat) -> Result<String> {
        let graph = self
            .current_graph()
            .await
            .ok_or_else(TrailError::no_current_graph)?;
        export_graph(&graph, format)
    }

    /// Import exported content as a new graph with fresh IDs and make it current
    pub async fn import_graph(&self, content: &str) -> Result<Graph> {
        let graph = import_graph(content)?;
        let guard = self.write().await;

        tracing::info!(
            "Imported graph '{}' ({}) with {} node(s)",
            graph.name,
            graph.id,
            graph.node_count()
        );
        guard.commit(graph.clone()).await;
        Ok(graph)
    }

    //
    // INTERNALS
    //

    async fn install(&self, graph: Graph) {
        *self.current.write().await = Some(graph);
    }

    /// Save, logging instead of failing
    async fn persist(&self, graph: &Graph) {
        if let Err(e) = self.store.save(graph).await {
            tracing::warn!("Failed to save graph {}: {}", graph.id, e);
        }
    }

    /// Check every node's location and record the outcome in its
    /// `validation_warning`. Nodes whose warning does not change are left
    /// untouched.
    async fn validate_graph(&self, graph: &mut Graph) -> GraphValidationReport {
        let mut report = GraphValidationReport::default();

        let mut nodes: Vec<_> = graph.nodes().cloned().collect();
        nodes.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));

        for node in nodes {
            let validation = self.tracker.validate_location(&node).await;

            let warning = if validation.is_valid {
                report.valid += 1;
                None
            } else {
                let reason = validation
                    .reason
                    .clone()
                    .unwrap_or_else(|| "Location could not be verified".to_string());
                match &validation.suggested_location {
                    Some(suggested) => {
                        report.relocatable += 1;
                        Some(format!("{} (suggested line {})", reason, suggested.line_number))
                    }
                    None => {
                        report.failed += 1;
                        Some(reason)
                    }
                }
            };

            if warning != node.validation_warning {
                if let Some(warning) = &warning {
                    tracing::warn!("Node '{}' ({}): {}", node.name, node.id, warning);
                }
                if let Ok(target) = graph.node_mut(&node.id) {
                    target.validation_warning = warning;
                    target.touch();
                }
            }

            report.checked += 1;
            report.results.push(NodeValidationResult {
                node_id: node.id,
                node_name: node.name,
                validation,
            });
        }

        report
    }
}
