use std::sync::Arc;

use mockall::automock;

use pagepack_core::types::{AssetKind, BundleRecord, PageMapping};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
  #[error("Record store write failed: {0}")]
  WriteFailed(String),
}

/// CRUD over `BundleRecord` and `PageMapping`, plus the aggregate queries an
/// external admin surface reads. The backing store is a collaborator; this
/// crate ships an in-memory implementation and a mock.
#[automock]
pub trait RecordStore {
  fn get_record(&self, aggregated_hash: &str) -> Option<BundleRecord>;

  /// Insert-if-absent else update. At most one record exists per hash.
  fn upsert_record(&self, record: BundleRecord) -> Result<(), StoreError>;

  fn delete_record(&self, aggregated_hash: &str) -> bool;

  /// Paginated listing, newest first.
  fn list_records(&self, offset: usize, limit: usize) -> Vec<BundleRecord>;

  fn total_size_saved(&self) -> u64;

  fn total_files_count(&self) -> u64;

  fn get_page_mapping(&self, page_hash: &str, kind: AssetKind) -> Option<PageMapping>;

  fn upsert_page_mapping(&self, mapping: PageMapping) -> Result<(), StoreError>;
}

pub type RecordStoreRef = Arc<dyn RecordStore + Send + Sync>;
