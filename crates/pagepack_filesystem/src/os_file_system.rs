use std::fs;
use std::fs::OpenOptions;
use std::io;
use std::io::Write as _;
use std::path::Path;

use crate::FileSystem;

/// `FileSystem` implementation backed by `std::fs`.
#[derive(Clone, Debug, Default)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
  fn exists(&self, path: &Path) -> bool {
    path.exists()
  }

  fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
    fs::read(path)
  }

  fn create_file(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent)?;
    }

    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    file.write_all(contents)
  }

  fn append(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut file = OpenOptions::new().append(true).open(path)?;
    file.write_all(contents)
  }

  fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)
  }

  fn delete_file(&self, path: &Path) -> io::Result<()> {
    fs::remove_file(path)
  }

  fn file_size(&self, path: &Path) -> io::Result<u64> {
    Ok(fs::metadata(path)?.len())
  }
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use super::*;

  #[test]
  fn create_then_append_builds_up_a_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("concatenated").join("bundle.css");
    let fs = OsFileSystem;

    fs.create_file(&path, b"a{}").unwrap();
    fs.append(&path, b"\nb{}").unwrap();

    assert_eq!(fs.read(&path).unwrap(), b"a{}\nb{}");
    assert_eq!(fs.file_size(&path).unwrap(), 7);
  }

  #[test]
  fn create_file_refuses_to_clobber() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bundle.js");
    let fs = OsFileSystem;

    fs.create_file(&path, b"first").unwrap();
    assert!(fs.create_file(&path, b"second").is_err());
    assert_eq!(fs.read(&path).unwrap(), b"first");
  }

  #[test]
  fn delete_removes_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bundle.js");
    let fs = OsFileSystem;

    fs.create_file(&path, b"x").unwrap();
    fs.delete_file(&path).unwrap();
    assert!(!fs.exists(&path));
  }
}
