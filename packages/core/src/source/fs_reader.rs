//! Filesystem-backed FileReader

use crate::source::file_reader::split_lines;
use crate::source::{FileReadError, FileReader};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Reads files from disk with `tokio::fs`.
///
/// Relative paths resolve against the workspace root when one is set, and
/// against the process working directory otherwise.
#[derive(Debug, Clone, Default)]
pub struct FsFileReader {
    workspace_root: Option<PathBuf>,
}

impl FsFileReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative paths against `root`
    pub fn with_workspace_root(root: impl Into<PathBuf>) -> Self {
        Self {
            workspace_root: Some(root.into()),
        }
    }

    pub fn resolve(&self, path: &str) -> PathBuf {
        let candidate = Path::new(path);
        match &self.workspace_root {
            Some(root) if candidate.is_relative() => root.join(candidate),
            _ => candidate.to_path_buf(),
        }
    }
}

#[async_trait]
impl FileReader for FsFileReader {
    async fn read_lines(&self, path: &str) -> Result<Vec<String>, FileReadError> {
        let resolved = self.resolve(path);
        match tokio::fs::read_to_string(&resolved).await {
            Ok(content) => Ok(split_lines(&content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(FileReadError::not_found(path)),
            Err(e) => Err(FileReadError::Io {
                path: resolved,
                source: e,
            }),
        }
    }
}
