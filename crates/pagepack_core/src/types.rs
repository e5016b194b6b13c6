use std::collections::HashMap;
use std::fmt;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Deserialize;
use serde::Serialize;

/// The asset types the pipeline concatenates.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
  Script,
  Stylesheet,
}

impl AssetKind {
  pub fn extension(&self) -> &'static str {
    match self {
      AssetKind::Script => "js",
      AssetKind::Stylesheet => "css",
    }
  }
}

impl fmt::Display for AssetKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      AssetKind::Script => write!(f, "script"),
      AssetKind::Stylesheet => write!(f, "stylesheet"),
    }
  }
}

/// One resource discovered during pass 1. Per-request, never persisted.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AssetReference {
  pub uri: String,
  pub integrity: Option<String>,
  /// The tag's declared `type` attribute, e.g. `module`. Decides which
  /// grammar the safety analyzer parses a script with.
  pub declared_type: Option<String>,
}

/// Persisted metadata for one merged bundle, keyed by its aggregated hash.
///
/// Created at most once per hash (upsert) when the merge worker finishes its
/// first successful append, refreshed on later page visits and when
/// minification runs. Never deleted by this subsystem.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct BundleRecord {
  pub aggregated_hash: String,
  pub kind: AssetKind,
  pub bundle_uri: String,
  pub files_count: u32,
  pub original_size: u64,
  pub optimized_size: u64,
  pub is_minified: bool,
  pub created_at: u64,
  pub updated_at: u64,
}

impl BundleRecord {
  pub fn new(aggregated_hash: String, kind: AssetKind, bundle_uri: String) -> Self {
    let now = now_unix();
    Self {
      aggregated_hash,
      kind,
      bundle_uri,
      files_count: 0,
      original_size: 0,
      optimized_size: 0,
      is_minified: false,
      created_at: now,
      updated_at: now,
    }
  }

  /// Bytes saved by serving the optimized bundle instead of the originals.
  pub fn size_saved(&self) -> u64 {
    self.original_size.saturating_sub(self.optimized_size)
  }
}

/// Links a page to the bundle its resources of one kind ended up in.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PageMapping {
  pub page_hash: String,
  pub kind: AssetKind,
  pub aggregated_hash: String,
}

/// One queued unit of merge work.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct WorkPayload {
  pub resource_uri: String,
  pub integrity: Option<String>,
  pub declared_type: Option<String>,
  pub aggregated_hash: String,
  pub kind: AssetKind,
  pub origin_page_id: String,
}

/// An ordered list of payloads persisted atomically before dispatch.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Batch {
  pub id: String,
  pub chain_id: String,
  pub payloads: Vec<WorkPayload>,
  pub is_final: bool,
}

/// Cross-batch continuation context for one logical merge job.
///
/// Mutated by every task invocation and persisted alongside the queue so a
/// fresh process can resume where the previous one stopped; cleared when the
/// chain's final batch drains.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Chain {
  pub chain_id: String,
  pub per_kind_hash: HashMap<AssetKind, String>,
  pub origin_page_id: String,
}

pub fn now_unix() -> u64 {
  SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .map(|duration| duration.as_secs())
    .unwrap_or(0)
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use super::*;

  #[test]
  fn asset_kind_extensions() {
    assert_eq!(AssetKind::Script.extension(), "js");
    assert_eq!(AssetKind::Stylesheet.extension(), "css");
  }

  #[test]
  fn bundle_record_size_saved_never_underflows() {
    let mut record = BundleRecord::new(
      String::from("0123456789abcdef"),
      AssetKind::Stylesheet,
      String::from("https://cdn.example/concatenated/0123456789abcdef.css"),
    );
    record.original_size = 10;
    record.optimized_size = 25;
    assert_eq!(record.size_saved(), 0);
  }

  #[test]
  fn work_payload_round_trips_through_json() {
    let payload = WorkPayload {
      resource_uri: String::from("/js/app.js"),
      integrity: Some(String::from("sha256-abc")),
      declared_type: None,
      aggregated_hash: String::from("0123456789abcdef"),
      kind: AssetKind::Script,
      origin_page_id: String::from("page-1"),
    };

    let json = serde_json::to_string(&payload).unwrap();
    let parsed: WorkPayload = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, payload);
  }
}
