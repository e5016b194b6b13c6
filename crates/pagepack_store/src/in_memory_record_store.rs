use std::collections::HashMap;

use parking_lot::RwLock;

use pagepack_core::types::{now_unix, AssetKind, BundleRecord, PageMapping};

use crate::record_store::{RecordStore, StoreError};

/// In-memory `RecordStore`, used in tests and single-process deployments.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
  records: RwLock<HashMap<String, BundleRecord>>,
  mappings: RwLock<HashMap<(String, AssetKind), PageMapping>>,
}

impl InMemoryRecordStore {
  pub fn new() -> Self {
    Self::default()
  }
}

impl RecordStore for InMemoryRecordStore {
  fn get_record(&self, aggregated_hash: &str) -> Option<BundleRecord> {
    self.records.read().get(aggregated_hash).cloned()
  }

  fn upsert_record(&self, mut record: BundleRecord) -> Result<(), StoreError> {
    let mut records = self.records.write();
    if let Some(existing) = records.get(&record.aggregated_hash) {
      record.created_at = existing.created_at;
    }
    record.updated_at = now_unix();
    records.insert(record.aggregated_hash.clone(), record);
    Ok(())
  }

  fn delete_record(&self, aggregated_hash: &str) -> bool {
    self.records.write().remove(aggregated_hash).is_some()
  }

  fn list_records(&self, offset: usize, limit: usize) -> Vec<BundleRecord> {
    let records = self.records.read();
    let mut records: Vec<BundleRecord> = records.values().cloned().collect();
    records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    records.into_iter().skip(offset).take(limit).collect()
  }

  fn total_size_saved(&self) -> u64 {
    self
      .records
      .read()
      .values()
      .map(|record| record.size_saved())
      .sum()
  }

  fn total_files_count(&self) -> u64 {
    self
      .records
      .read()
      .values()
      .map(|record| u64::from(record.files_count))
      .sum()
  }

  fn get_page_mapping(&self, page_hash: &str, kind: AssetKind) -> Option<PageMapping> {
    self
      .mappings
      .read()
      .get(&(page_hash.to_string(), kind))
      .cloned()
  }

  fn upsert_page_mapping(&self, mapping: PageMapping) -> Result<(), StoreError> {
    self
      .mappings
      .write()
      .insert((mapping.page_hash.clone(), mapping.kind), mapping);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use super::*;

  fn record(hash: &str, original: u64, optimized: u64, files: u32) -> BundleRecord {
    let mut record = BundleRecord::new(
      hash.to_string(),
      AssetKind::Stylesheet,
      format!("https://cdn.example/concatenated/{hash}.css"),
    );
    record.original_size = original;
    record.optimized_size = optimized;
    record.files_count = files;
    record
  }

  #[test]
  fn upsert_is_insert_if_absent_else_update() {
    let store = InMemoryRecordStore::new();
    store.upsert_record(record("aaa", 100, 80, 2)).unwrap();
    store.upsert_record(record("aaa", 100, 60, 3)).unwrap();

    let stored = store.get_record("aaa").unwrap();
    assert_eq!(stored.files_count, 3);
    assert_eq!(stored.optimized_size, 60);
    assert_eq!(store.list_records(0, 10).len(), 1);
  }

  #[test]
  fn aggregates_sum_over_all_records() {
    let store = InMemoryRecordStore::new();
    store.upsert_record(record("aaa", 100, 80, 2)).unwrap();
    store.upsert_record(record("bbb", 50, 30, 4)).unwrap();

    assert_eq!(store.total_size_saved(), 40);
    assert_eq!(store.total_files_count(), 6);
  }

  #[test]
  fn page_mappings_are_keyed_by_page_and_kind() {
    let store = InMemoryRecordStore::new();
    store
      .upsert_page_mapping(PageMapping {
        page_hash: String::from("page"),
        kind: AssetKind::Script,
        aggregated_hash: String::from("aaa"),
      })
      .unwrap();

    assert!(store.get_page_mapping("page", AssetKind::Script).is_some());
    assert!(store.get_page_mapping("page", AssetKind::Stylesheet).is_none());
  }

  #[test]
  fn delete_reports_whether_a_record_existed() {
    let store = InMemoryRecordStore::new();
    store.upsert_record(record("aaa", 1, 1, 1)).unwrap();

    assert!(store.delete_record("aaa"));
    assert!(!store.delete_record("aaa"));
  }
}
