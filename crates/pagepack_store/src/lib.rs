pub mod bundle_cache;
pub mod in_memory_record_store;
pub mod record_store;

pub use bundle_cache::BundleCache;
pub use in_memory_record_store::InMemoryRecordStore;
pub use record_store::{MockRecordStore, RecordStore, RecordStoreRef, StoreError};
