use std::collections::HashMap;
use std::io;
use std::path::Path;
use std::path::PathBuf;

use parking_lot::RwLock;

/// In memory implementation of the `FileSystem` trait, for testing purposes.
#[derive(Debug, Default)]
pub struct InMemoryFileSystem {
  files: RwLock<HashMap<PathBuf, Vec<u8>>>,
}

impl InMemoryFileSystem {
  pub fn new() -> Self {
    Self::default()
  }
}

impl crate::FileSystem for InMemoryFileSystem {
  fn exists(&self, path: &Path) -> bool {
    self.files.read().contains_key(path)
  }

  fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
    self
      .files
      .read()
      .get(path)
      .cloned()
      .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("{path:?} not found")))
  }

  fn create_file(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut files = self.files.write();
    if files.contains_key(path) {
      return Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("{path:?} already exists"),
      ));
    }
    files.insert(path.to_path_buf(), contents.to_vec());
    Ok(())
  }

  fn append(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut files = self.files.write();
    let file = files
      .get_mut(path)
      .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("{path:?} not found")))?;
    file.extend_from_slice(contents);
    Ok(())
  }

  fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
    self.files.write().insert(path.to_path_buf(), contents.to_vec());
    Ok(())
  }

  fn delete_file(&self, path: &Path) -> io::Result<()> {
    self
      .files
      .write()
      .remove(path)
      .map(|_| ())
      .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("{path:?} not found")))
  }

  fn file_size(&self, path: &Path) -> io::Result<u64> {
    self
      .files
      .read()
      .get(path)
      .map(|contents| contents.len() as u64)
      .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("{path:?} not found")))
  }
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use super::*;
  use crate::FileSystem;

  #[test]
  fn append_requires_the_file_to_exist() {
    let fs = InMemoryFileSystem::new();
    let path = Path::new("/out/concatenated/a.css");

    assert!(fs.append(path, b"a{}").is_err());

    fs.create_file(path, b"a{}").unwrap();
    fs.append(path, b"\nb{}").unwrap();
    assert_eq!(fs.read(path).unwrap(), b"a{}\nb{}");
  }

  #[test]
  fn write_overwrites_in_place() {
    let fs = InMemoryFileSystem::new();
    let path = Path::new("/out/concatenated/a.css");

    fs.create_file(path, b"original").unwrap();
    fs.write(path, b"minified").unwrap();
    assert_eq!(fs.read(path).unwrap(), b"minified");
  }
}
