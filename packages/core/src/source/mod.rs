//! Source File Access
//!
//! The core never touches an editor API directly. It reads source lines
//! through the [`FileReader`] trait:
//!
//! - [`FsFileReader`] - reads from disk, optionally relative to a workspace root
//! - [`InMemoryFileReader`] - serves content from memory (tests, editor buffers)

mod error;
mod file_reader;
mod fs_reader;
mod memory_reader;

pub use error::FileReadError;
pub use file_reader::{split_lines, FileReader};
pub use fs_reader::FsFileReader;
pub use memory_reader::InMemoryFileReader;
