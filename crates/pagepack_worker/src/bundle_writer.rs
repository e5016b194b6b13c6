use std::io;
use std::path::Path;
use std::path::PathBuf;

use pagepack_core::config::{bundle_file_name, BUNDLE_SUBDIR};
use pagepack_core::types::AssetKind;
use pagepack_filesystem::{build_path, FileSystemRef};
use pagepack_js_analyzer::ChunkValue;

/// Writes the bundle file formats.
///
/// Stylesheet bundles are raw chunk bytes joined by a newline, in discovery
/// order, with no wrapper. Script bundles populate a global namespace with
/// `chunks[kind][uri]` entries as each payload completes; `append_trailer`
/// adds the `runChunk` lookup function exactly once at the end.
pub struct BundleWriter {
  file_system: FileSystemRef,
  output_root: PathBuf,
}

const JS_HEADER: &str = "var pagepack = globalThis.pagepack = globalThis.pagepack || {};\n\
pagepack.chunks = pagepack.chunks || {};\n\
pagepack.chunks[\"js\"] = pagepack.chunks[\"js\"] || {};\n";

const JS_TRAILER: &str = "pagepack.runChunk = function (uri, kind) {\n\
  var chunk = (pagepack.chunks[kind] || {})[uri];\n\
  if (chunk === undefined) {\n\
    if (typeof console !== \"undefined\") console.warn(\"pagepack: unknown chunk \" + uri);\n\
    return;\n\
  }\n\
  if (typeof chunk === \"function\") {\n\
    chunk();\n\
  } else {\n\
    (0, eval)(atob(chunk));\n\
  }\n\
};\n";

impl BundleWriter {
  pub fn new(file_system: FileSystemRef, output_root: PathBuf) -> Self {
    Self {
      file_system,
      output_root,
    }
  }

  pub fn bundle_path(&self, aggregated_hash: &str, kind: AssetKind) -> PathBuf {
    build_path(
      &self.output_root,
      BUNDLE_SUBDIR,
      &bundle_file_name(aggregated_hash, kind),
    )
  }

  pub fn bundle_size(&self, aggregated_hash: &str, kind: AssetKind) -> io::Result<u64> {
    self
      .file_system
      .file_size(&self.bundle_path(aggregated_hash, kind))
  }

  pub fn read_bundle(&self, aggregated_hash: &str, kind: AssetKind) -> io::Result<Vec<u8>> {
    self.file_system.read(&self.bundle_path(aggregated_hash, kind))
  }

  /// Overwrite a bundle in place (lazy re-minification).
  pub fn rewrite_bundle(
    &self,
    aggregated_hash: &str,
    kind: AssetKind,
    contents: &[u8],
  ) -> io::Result<()> {
    self
      .file_system
      .write(&self.bundle_path(aggregated_hash, kind), contents)
  }

  pub fn append_stylesheet_chunk(&self, aggregated_hash: &str, bytes: &[u8]) -> io::Result<()> {
    let path = self.bundle_path(aggregated_hash, AssetKind::Stylesheet);
    if !self.file_system.exists(&path) {
      return self.file_system.create_file(&path, bytes);
    }

    let mut chunk = Vec::with_capacity(bytes.len() + 1);
    chunk.push(b'\n');
    chunk.extend_from_slice(bytes);
    self.file_system.append(&path, &chunk)
  }

  pub fn append_script_chunk(
    &self,
    aggregated_hash: &str,
    uri: &str,
    chunk: &ChunkValue,
  ) -> io::Result<()> {
    let path = self.bundle_path(aggregated_hash, AssetKind::Script);
    self.ensure_script_bundle(&path)?;

    let assignment = format!(
      "pagepack.chunks[\"js\"][\"{}\"] = {};\n",
      escape_js_string(uri),
      chunk.render()
    );
    self.file_system.append(&path, assignment.as_bytes())
  }

  /// Appends the runtime-loader trailer. Invoked once, when the last batch
  /// of a chain drains.
  pub fn append_script_trailer(&self, aggregated_hash: &str) -> io::Result<()> {
    let path = self.bundle_path(aggregated_hash, AssetKind::Script);
    self.ensure_script_bundle(&path)?;
    self.file_system.append(&path, JS_TRAILER.as_bytes())
  }

  fn ensure_script_bundle(&self, path: &Path) -> io::Result<()> {
    if !self.file_system.exists(path) {
      self.file_system.create_file(path, JS_HEADER.as_bytes())?;
    }
    Ok(())
  }
}

fn escape_js_string(value: &str) -> String {
  value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use pretty_assertions::assert_eq;

  use pagepack_filesystem::InMemoryFileSystem;

  use super::*;

  fn writer() -> BundleWriter {
    BundleWriter::new(Arc::new(InMemoryFileSystem::new()), PathBuf::from("/out"))
  }

  #[test]
  fn bundle_path_follows_the_layout() {
    let writer = writer();
    assert_eq!(
      writer.bundle_path("0123456789abcdef", AssetKind::Stylesheet),
      PathBuf::from("/out/concatenated/0123456789abcdef.css")
    );
  }

  #[test]
  fn stylesheet_chunks_are_newline_separated_raw_bytes() {
    let writer = writer();
    writer.append_stylesheet_chunk("aaa", b"a { color: red; }").unwrap();
    writer.append_stylesheet_chunk("aaa", b"b { color: blue; }").unwrap();

    assert_eq!(
      writer.read_bundle("aaa", AssetKind::Stylesheet).unwrap(),
      b"a { color: red; }\nb { color: blue; }"
    );
  }

  #[test]
  fn script_bundle_gets_header_chunks_and_trailer() {
    let writer = writer();
    writer
      .append_script_chunk(
        "bbb",
        "/js/a.js",
        &ChunkValue::Function(String::from("function () {\n(function(){})();\n}")),
      )
      .unwrap();
    writer
      .append_script_chunk("bbb", "/js/b.js", &ChunkValue::Base64(String::from("dmFyIHg7")))
      .unwrap();
    writer.append_script_trailer("bbb").unwrap();

    let bundle = String::from_utf8(writer.read_bundle("bbb", AssetKind::Script).unwrap()).unwrap();

    assert!(bundle.starts_with("var pagepack = globalThis.pagepack"));
    assert!(bundle.contains("pagepack.chunks[\"js\"][\"/js/a.js\"] = function () {"));
    assert!(bundle.contains("pagepack.chunks[\"js\"][\"/js/b.js\"] = \"dmFyIHg7\";"));
    assert!(bundle.trim_end().ends_with("};"));
    assert!(bundle.contains("pagepack.runChunk = function (uri, kind)"));
    // Trailer must come after every chunk assignment.
    assert!(bundle.rfind("pagepack.runChunk").unwrap() > bundle.rfind("/js/b.js").unwrap());
  }

  #[test]
  fn uris_are_escaped_in_chunk_keys() {
    let writer = writer();
    writer
      .append_script_chunk("ccc", "/js/a\"b.js", &ChunkValue::Base64(String::from("eA==")))
      .unwrap();

    let bundle = String::from_utf8(writer.read_bundle("ccc", AssetKind::Script).unwrap()).unwrap();
    assert!(bundle.contains("pagepack.chunks[\"js\"][\"/js/a\\\"b.js\"]"));
  }
}
