use pagepack_core::types::BundleRecord;

use crate::record_store::{RecordStoreRef, StoreError};

/// Content-addressed view over the record store: one "bundle already built"
/// record per aggregated hash. Adds no logic beyond the upsert policy.
#[derive(Clone)]
pub struct BundleCache {
  store: RecordStoreRef,
}

impl BundleCache {
  pub fn new(store: RecordStoreRef) -> Self {
    Self { store }
  }

  pub fn has(&self, aggregated_hash: &str) -> bool {
    self.store.get_record(aggregated_hash).is_some()
  }

  pub fn get(&self, aggregated_hash: &str) -> Option<BundleRecord> {
    self.store.get_record(aggregated_hash)
  }

  pub fn upsert(&self, record: BundleRecord) -> Result<(), StoreError> {
    self.store.upsert_record(record)
  }

  pub fn delete_by_hash(&self, aggregated_hash: &str) -> bool {
    self.store.delete_record(aggregated_hash)
  }

  pub fn total_size_saved(&self) -> u64 {
    self.store.total_size_saved()
  }

  pub fn total_files_count(&self) -> u64 {
    self.store.total_files_count()
  }
}
