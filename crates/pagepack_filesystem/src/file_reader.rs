use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use mockall::automock;
use url::Url;

use crate::FileSystemRef;

#[derive(Debug, thiserror::Error)]
pub enum FileReaderError {
  #[error("Failed to read {uri}: {source}")]
  Io {
    uri: String,
    #[source]
    source: std::io::Error,
  },
  #[error("Failed to fetch {uri}: {source}")]
  Http {
    uri: String,
    #[source]
    source: reqwest::Error,
  },
  #[error("Fetch of {uri} returned status {status}")]
  Status { uri: String, status: u16 },
}

/// Reads the bytes of one resource URI, transparently supporting both
/// local paths (resolved against the document root) and network fetches.
#[automock]
pub trait FileReader {
  fn read_remote(&self, uri: &str) -> Result<Vec<u8>, FileReaderError>;
}

pub type FileReaderRef = Arc<dyn FileReader + Send + Sync>;

pub struct HttpFileReader {
  file_system: FileSystemRef,
  document_root: PathBuf,
  client: reqwest::blocking::Client,
}

impl HttpFileReader {
  pub fn new(file_system: FileSystemRef, document_root: PathBuf) -> Self {
    let client = reqwest::blocking::Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .unwrap_or_default();

    Self {
      file_system,
      document_root,
      client,
    }
  }

  fn resolve_local(&self, uri: &str) -> PathBuf {
    // Strip the query string; "/js/app.js?v=3" is still /js/app.js on disk.
    let path = uri.split(['?', '#']).next().unwrap_or(uri);
    self.document_root.join(path.trim_start_matches('/'))
  }
}

impl FileReader for HttpFileReader {
  #[tracing::instrument(level = "debug", skip(self))]
  fn read_remote(&self, uri: &str) -> Result<Vec<u8>, FileReaderError> {
    if let Ok(url) = Url::parse(uri) {
      if matches!(url.scheme(), "http" | "https") {
        let response = self
          .client
          .get(url)
          .send()
          .map_err(|source| FileReaderError::Http {
            uri: uri.to_string(),
            source,
          })?;

        let status = response.status();
        if !status.is_success() {
          return Err(FileReaderError::Status {
            uri: uri.to_string(),
            status: status.as_u16(),
          });
        }

        let bytes = response.bytes().map_err(|source| FileReaderError::Http {
          uri: uri.to_string(),
          source,
        })?;
        return Ok(bytes.to_vec());
      }
    }

    let path = self.resolve_local(uri);
    self
      .file_system
      .read(&path)
      .map_err(|source| FileReaderError::Io {
        uri: uri.to_string(),
        source,
      })
  }
}

/// Discovery-time size probe; failures are not fatal to scanning.
pub fn resource_size(reader: &dyn FileReader, uri: &str) -> Option<u64> {
  match reader.read_remote(uri) {
    Ok(bytes) => Some(bytes.len() as u64),
    Err(error) => {
      tracing::debug!(%uri, %error, "Unable to size resource");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use super::*;
  use crate::{FileSystem, InMemoryFileSystem};

  fn reader_with(files: &[(&str, &[u8])]) -> HttpFileReader {
    let fs = InMemoryFileSystem::new();
    for (path, contents) in files {
      fs.create_file(Path::new(path), contents).unwrap();
    }
    HttpFileReader::new(Arc::new(fs), PathBuf::from("/var/www"))
  }

  #[test]
  fn root_relative_uris_resolve_against_the_document_root() {
    let reader = reader_with(&[("/var/www/js/app.js", b"var x = 1;")]);
    assert_eq!(reader.read_remote("/js/app.js").unwrap(), b"var x = 1;");
  }

  #[test]
  fn query_strings_are_stripped_before_resolving() {
    let reader = reader_with(&[("/var/www/css/main.css", b"a{}")]);
    assert_eq!(reader.read_remote("/css/main.css?v=3").unwrap(), b"a{}");
  }

  #[test]
  fn missing_local_files_surface_io_errors() {
    let reader = reader_with(&[]);
    let error = reader.read_remote("/js/missing.js").unwrap_err();
    assert!(matches!(error, FileReaderError::Io { .. }));
  }

  #[test]
  fn resource_size_swallows_failures() {
    let reader = reader_with(&[("/var/www/js/app.js", b"12345")]);
    assert_eq!(resource_size(&reader, "/js/app.js"), Some(5));
    assert_eq!(resource_size(&reader, "/js/missing.js"), None);
  }
}
