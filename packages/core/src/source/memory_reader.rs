//! In-memory FileReader for tests and hosts that serve editor buffers

use crate::source::file_reader::split_lines;
use crate::source::{FileReadError, FileReader};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Path -> content map. Clones share the same files.
#[derive(Debug, Clone, Default)]
pub struct InMemoryFileReader {
    files: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemoryFileReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a file
    pub async fn insert_file(&self, path: impl Into<String>, content: impl Into<String>) {
        self.files.write().await.insert(path.into(), content.into());
    }

    /// Remove a file; returns whether it existed
    pub async fn remove_file(&self, path: &str) -> bool {
        self.files.write().await.remove(path).is_some()
    }
}

#[async_trait]
impl FileReader for InMemoryFileReader {
    async fn read_lines(&self, path: &str) -> Result<Vec<String>, FileReadError> {
        self.files
            .read()
            .await
            .get(path)
            .map(|content| split_lines(content))
            .ok_or_else(|| FileReadError::not_found(path))
    }
}
