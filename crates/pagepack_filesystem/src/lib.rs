//! Abstraction of the file system used by the concatenation pipeline.
//!
//! The merge worker only ever needs a handful of operations on the bundle
//! directory: existence checks, whole-file reads, create-if-absent and
//! append. Production code uses `OsFileSystem`; tests use
//! `InMemoryFileSystem`.

use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

pub mod file_reader;
pub mod in_memory_file_system;
pub mod os_file_system;

pub use file_reader::{FileReader, FileReaderError, FileReaderRef, HttpFileReader, MockFileReader};
pub use in_memory_file_system::InMemoryFileSystem;
pub use os_file_system::OsFileSystem;

pub type FileSystemRef = Arc<dyn FileSystem + Send + Sync>;

pub trait FileSystem {
  fn exists(&self, path: &Path) -> bool;

  fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

  /// Create `path` with `contents`, creating parent directories as needed.
  /// Fails if the file already exists; the bundle files this pipeline writes
  /// are create-once, append-after.
  fn create_file(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

  fn append(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

  /// Overwrite an existing file in place (lazy re-minification).
  fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

  fn delete_file(&self, path: &Path) -> io::Result<()>;

  fn file_size(&self, path: &Path) -> io::Result<u64>;
}

/// Joins the bundle directory layout: `<root>/<subdir>/<file_name>`.
pub fn build_path(root: &Path, subdir: &str, file_name: &str) -> PathBuf {
  root.join(subdir).join(file_name)
}
