use std::sync::Arc;

use mockall::automock;

use crate::types::AssetKind;

/// Pluggable minification seam. The algorithms themselves live outside this
/// pipeline; cache hits lazily re-minify an existing bundle through this
/// trait when minification is enabled.
#[automock]
pub trait Minifier {
  fn minify(&self, kind: AssetKind, code: &[u8]) -> anyhow::Result<Vec<u8>>;
}

pub type MinifierRef = Arc<dyn Minifier + Send + Sync>;

/// Default implementation that passes bytes through untouched.
#[derive(Debug, Default)]
pub struct NoopMinifier;

impl Minifier for NoopMinifier {
  fn minify(&self, _kind: AssetKind, code: &[u8]) -> anyhow::Result<Vec<u8>> {
    Ok(code.to_vec())
  }
}
