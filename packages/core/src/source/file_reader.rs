//! FileReader Trait - Source File Access
//!
//! Location tracking needs to read specific lines of source files. Instead of
//! reaching into a host editor API at each call site, the tracker and the
//! node manager receive a `FileReader` at construction.
//!
//! # Design Decisions
//!
//! 1. **Async-First**: Hosts may serve file content from disk, an editor
//!    buffer or a remote workspace
//! 2. **One Required Method**: Implementations only provide `read_lines`;
//!    single-line and range reads are derived from it
//! 3. **Typed Failures**: `FileReadError::NotFound` is distinct from other
//!    I/O errors so relocation can stop early

use crate::source::FileReadError;
use async_trait::async_trait;

/// Abstraction over reading source file content line by line
///
/// Line numbers are 1-based everywhere in this trait.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; readers are shared through
/// `Arc<dyn FileReader>` across async tasks.
///
/// # Examples
///
/// ```rust
/// use codetrail_core::source::{FileReader, InMemoryFileReader};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let reader = InMemoryFileReader::new();
/// reader.insert_file("src/lib.rs", "mod a;\nmod b;\n").await;
///
/// assert_eq!(reader.read_line("src/lib.rs", 2).await?, "mod b;");
/// assert_eq!(reader.line_count("src/lib.rs").await?, 2);
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait FileReader: Send + Sync {
    /// Read every line of a file, without line terminators
    async fn read_lines(&self, path: &str) -> Result<Vec<String>, FileReadError>;

    /// Read one line
    ///
    /// # Errors
    ///
    /// - `NotFound` if the file does not exist
    /// - `LineOutOfRange` if `line` is 0 or past the last line
    async fn read_line(&self, path: &str, line: u32) -> Result<String, FileReadError> {
        let lines = self.read_lines(path).await?;
        line_at(&lines, path, line).map(str::to_string)
    }

    /// Read the inclusive range `start..=end`, joined with `\n`
    ///
    /// `end` is clamped to the last line; `start` must exist.
    async fn read_range(&self, path: &str, start: u32, end: u32) -> Result<String, FileReadError> {
        let lines = self.read_lines(path).await?;
        line_at(&lines, path, start)?;

        let from = start as usize - 1;
        let to = (end.max(start) as usize).min(lines.len());
        Ok(lines[from..to].join("\n"))
    }

    /// Number of lines in a file
    async fn line_count(&self, path: &str) -> Result<usize, FileReadError> {
        Ok(self.read_lines(path).await?.len())
    }
}

/// Split file content into lines, dropping `\n` / `\r\n` terminators
pub fn split_lines(content: &str) -> Vec<String> {
    content.lines().map(str::to_string).collect()
}

fn line_at<'a>(lines: &'a [String], path: &str, line: u32) -> Result<&'a str, FileReadError> {
    if line == 0 || line as usize > lines.len() {
        return Err(FileReadError::line_out_of_range(path, line, lines.len()));
    }
    Ok(&lines[line as usize - 1])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::InMemoryFileReader;

    async fn reader() -> InMemoryFileReader {
        let reader = InMemoryFileReader::new();
        reader
            .insert_file("a.rs", "line one\r\nline two\nline three\n")
            .await;
        reader
    }

    #[tokio::test]
    async fn test_read_line() {
        let reader = reader().await;
        assert_eq!(reader.read_line("a.rs", 1).await.unwrap(), "line one");
        assert_eq!(reader.read_line("a.rs", 3).await.unwrap(), "line three");
    }

    #[tokio::test]
    async fn test_read_line_out_of_range() {
        let reader = reader().await;
        let err = reader.read_line("a.rs", 4).await.unwrap_err();
        assert!(matches!(
            err,
            FileReadError::LineOutOfRange {
                line: 4,
                line_count: 3,
                ..
            }
        ));
        assert!(reader.read_line("a.rs", 0).await.is_err());
    }

    #[tokio::test]
    async fn test_read_range_clamps_end() {
        let reader = reader().await;
        assert_eq!(
            reader.read_range("a.rs", 2, 10).await.unwrap(),
            "line two\nline three"
        );
        assert_eq!(reader.read_range("a.rs", 2, 1).await.unwrap(), "line two");
    }

    #[tokio::test]
    async fn test_missing_file() {
        let reader = reader().await;
        let err = reader.read_line("missing.rs", 1).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
