//! JSON file store: one pretty-printed `<graph-id>.json` per graph

use crate::db::graph_store::sort_metadata;
use crate::db::{GraphStore, StorageError};
use crate::models::{Graph, GraphMetadata};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use uuid::Uuid;

const GRAPH_FILE_EXTENSION: &str = "json";

/// Stores each graph as a JSON file inside a directory.
///
/// Writes go to a temporary sibling file that is then renamed over the
/// target, so an interrupted save never leaves a truncated graph behind.
/// The directory is created on first save.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file a graph is stored in.
    ///
    /// Only UUIDs are accepted so an ID can never escape the directory.
    fn graph_path(&self, id: &str) -> Result<PathBuf, StorageError> {
        Uuid::parse_str(id).map_err(|_| StorageError::invalid_graph_id(id))?;
        Ok(self.dir.join(format!("{}.{}", id, GRAPH_FILE_EXTENSION)))
    }

    async fn read_graph(path: &Path, id: &str) -> Result<Graph, StorageError> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::graph_not_found(id));
            }
            Err(e) => return Err(StorageError::io(path, e)),
        };

        serde_json::from_str(&content).map_err(|e| StorageError::serialization(id, e))
    }
}

#[async_trait]
impl GraphStore for JsonFileStore {
    async fn save(&self, graph: &Graph) -> Result<(), StorageError> {
        let path = self.graph_path(&graph.id)?;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| StorageError::io(&self.dir, e))?;

        let json = serde_json::to_string_pretty(graph)
            .map_err(|e| StorageError::serialization(&graph.id, e))?;

        let tmp_path = path.with_extension(format!("{}.tmp", GRAPH_FILE_EXTENSION));
        tokio::fs::write(&tmp_path, json)
            .await
            .map_err(|e| StorageError::io(&tmp_path, e))?;
        tokio::fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| StorageError::io(&path, e))?;

        tracing::debug!("Saved graph {} to {}", graph.id, path.display());
        Ok(())
    }

    async fn load(&self, id: &str) -> Result<Graph, StorageError> {
        let path = self.graph_path(id)?;
        Self::read_graph(&path, id).await
    }

    async fn delete(&self, id: &str) -> Result<bool, StorageError> {
        let path = self.graph_path(id)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::io(&path, e)),
        }
    }

    async fn list(&self) -> Result<Vec<GraphMetadata>, StorageError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            // Nothing saved yet
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::io(&self.dir, e)),
        };

        let mut items = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StorageError::io(&self.dir, e))?
        {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(GRAPH_FILE_EXTENSION) {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };

            match Self::read_graph(&path, id).await {
                Ok(graph) => items.push(graph.metadata()),
                Err(e) => tracing::warn!("Skipping unreadable graph file {}: {}", path.display(), e),
            }
        }

        sort_metadata(&mut items);
        Ok(items)
    }
}
