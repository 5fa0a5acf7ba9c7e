//! File Read Error Types

use std::path::PathBuf;
use thiserror::Error;

/// Failures reading source files
///
/// `NotFound` is kept separate from other I/O failures because relocation
/// short-circuits on it: there is nothing to search in a file that is gone.
#[derive(Error, Debug)]
pub enum FileReadError {
    /// The file does not exist (or is not visible to the reader)
    #[error("File not found: {path}")]
    NotFound { path: String },

    /// The requested line lies past the end of the file
    #[error("Line {line} exceeds file length ({line_count} lines) in {path}")]
    LineOutOfRange {
        path: String,
        line: u32,
        line_count: usize,
    },

    /// Any other I/O failure
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FileReadError {
    /// Create a not found error
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Create a line out of range error
    pub fn line_out_of_range(path: impl Into<String>, line: u32, line_count: usize) -> Self {
        Self::LineOutOfRange {
            path: path.into(),
            line,
            line_count,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
