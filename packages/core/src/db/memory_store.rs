//! In-memory GraphStore for tests and hosts that keep graphs elsewhere

use crate::db::graph_store::sort_metadata;
use crate::db::{GraphStore, StorageError};
use crate::models::{Graph, GraphMetadata};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Keeps graphs in a shared map. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    graphs: Arc<RwLock<HashMap<String, Graph>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored graphs
    pub async fn len(&self) -> usize {
        self.graphs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.graphs.read().await.is_empty()
    }
}

#[async_trait]
impl GraphStore for MemoryStore {
    async fn save(&self, graph: &Graph) -> Result<(), StorageError> {
        self.graphs
            .write()
            .await
            .insert(graph.id.clone(), graph.clone());
        Ok(())
    }

    async fn load(&self, id: &str) -> Result<Graph, StorageError> {
        self.graphs
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::graph_not_found(id))
    }

    async fn delete(&self, id: &str) -> Result<bool, StorageError> {
        Ok(self.graphs.write().await.remove(id).is_some())
    }

    async fn list(&self) -> Result<Vec<GraphMetadata>, StorageError> {
        let mut items: Vec<GraphMetadata> = self
            .graphs
            .read()
            .await
            .values()
            .map(Graph::metadata)
            .collect();
        sort_metadata(&mut items);
        Ok(items)
    }
}
