use std::collections::HashMap;
use std::path::PathBuf;

use regex::Regex;
use serde::Deserialize;
use serde::Serialize;

use crate::types::AssetKind;

/// Directory under the output root where every bundle file is written.
pub const BUNDLE_SUBDIR: &str = "concatenated";

/// One entry of the per-kind exclusion list.
///
/// `pattern` is either compared for literal equality with the raw tag URI or
/// treated as a regular expression searched against it.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ExclusionRule {
  pub pattern: String,
  pub is_regex: bool,
}

impl ExclusionRule {
  pub fn matches(&self, uri: &str) -> bool {
    if !self.is_regex {
      return self.pattern == uri;
    }

    match Regex::new(&self.pattern) {
      Ok(regex) => regex.is_match(uri),
      Err(error) => {
        tracing::warn!(pattern = %self.pattern, %error, "Invalid exclusion regex, ignoring rule");
        false
      }
    }
  }
}

/// Options for the concatenation pipeline.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct PagepackOptions {
  /// Base URL joined with the bundle's relative path to form its public URL.
  pub base_url: String,
  /// Filesystem root the bundle directory lives under.
  pub output_root: PathBuf,
  /// Directory the worker persists its queue and chain state into.
  pub state_dir: PathBuf,
  /// Whether bundles are lazily re-minified on cache hits.
  pub minify_enabled: bool,
  #[serde(default)]
  pub exclusions: HashMap<AssetKind, Vec<ExclusionRule>>,
}

impl PagepackOptions {
  pub fn exclusions_for(&self, kind: AssetKind) -> &[ExclusionRule] {
    self
      .exclusions
      .get(&kind)
      .map(|rules| rules.as_slice())
      .unwrap_or(&[])
  }

  pub fn is_excluded(&self, kind: AssetKind, uri: &str) -> bool {
    self
      .exclusions_for(kind)
      .iter()
      .any(|rule| rule.matches(uri))
  }
}

/// File name of the bundle for one aggregated hash.
pub fn bundle_file_name(aggregated_hash: &str, kind: AssetKind) -> String {
  format!("{}.{}", aggregated_hash, kind.extension())
}

/// Path of the bundle relative to both the output root and the base URL.
pub fn bundle_relative_path(aggregated_hash: &str, kind: AssetKind) -> String {
  format!("{}/{}", BUNDLE_SUBDIR, bundle_file_name(aggregated_hash, kind))
}

/// Public URL the rewritten tags point at.
pub fn bundle_public_url(base_url: &str, aggregated_hash: &str, kind: AssetKind) -> String {
  format!(
    "{}/{}",
    base_url.trim_end_matches('/'),
    bundle_relative_path(aggregated_hash, kind)
  )
}
