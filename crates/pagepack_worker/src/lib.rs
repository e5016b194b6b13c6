pub mod bundle_writer;
pub mod merge_worker;
pub mod queue_store;
pub mod scheduler;

pub use bundle_writer::BundleWriter;
pub use merge_worker::{MergeWorker, WorkerError, WorkerState};
pub use queue_store::{
  InMemoryQueueStore, JsonFileQueueStore, MockQueueStore, QueueError, QueueStore, QueueStoreRef,
};
pub use scheduler::WorkerScheduler;
