use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::iife::{is_program_an_iife, AnalyzerError, SourceKind};

/// The embeddable form of one script chunk inside a js bundle.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ChunkValue {
  /// Safe to run from the shared bundle scope: embedded as a zero-argument
  /// function literal.
  Function(String),
  /// Relies on global-scope semantics: embedded as an opaque base64 string,
  /// decoded and evaluated at the original invocation point.
  Base64(String),
}

impl ChunkValue {
  /// Renders the right-hand side of the `chunks[kind][uri] = ...` assignment.
  pub fn render(&self) -> String {
    match self {
      ChunkValue::Function(function) => function.clone(),
      ChunkValue::Base64(encoded) => format!("\"{encoded}\""),
    }
  }
}

/// Classifies `source` and produces its embeddable chunk value.
pub fn transform_chunk(source: &str, kind: SourceKind) -> Result<ChunkValue, AnalyzerError> {
  if is_program_an_iife(source, kind)? {
    tracing::debug!(bytes = source.len(), "Script is an IIFE, embedding as function chunk");
    Ok(ChunkValue::Function(format!("function () {{\n{source}\n}}")))
  } else {
    tracing::debug!(bytes = source.len(), "Script relies on global scope, embedding as base64");
    Ok(ChunkValue::Base64(STANDARD.encode(source)))
  }
}
