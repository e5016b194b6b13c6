use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::Receiver;
use parking_lot::Mutex;

use pagepack_core::config::PagepackOptions;
use pagepack_core::scheduler::MergeScheduler;
use pagepack_core::types::{now_unix, AssetKind, WorkPayload};
use pagepack_filesystem::{FileReaderRef, FileSystemRef};
use pagepack_store::RecordStoreRef;

use crate::merge_worker::MergeWorker;
use crate::queue_store::QueueStoreRef;

/// `MergeScheduler` backed by real merge workers: one fresh worker per
/// scheduled chain and asset kind, dispatched fire-and-forget.
pub struct WorkerScheduler {
  options: PagepackOptions,
  queue: QueueStoreRef,
  reader: FileReaderRef,
  file_system: FileSystemRef,
  store: RecordStoreRef,
  active: Mutex<Vec<Arc<MergeWorker>>>,
  dispatched: Mutex<Vec<Receiver<()>>>,
  chain_sequence: AtomicU64,
}

impl WorkerScheduler {
  pub fn new(
    options: PagepackOptions,
    queue: QueueStoreRef,
    reader: FileReaderRef,
    file_system: FileSystemRef,
    store: RecordStoreRef,
  ) -> Self {
    Self {
      options,
      queue,
      reader,
      file_system,
      store,
      active: Mutex::new(Vec::new()),
      dispatched: Mutex::new(Vec::new()),
      chain_sequence: AtomicU64::new(0),
    }
  }

  /// Blocks until every dispatched worker run has drained. Used by tests and
  /// graceful shutdown; request handling never calls this.
  pub fn wait_idle(&self) {
    let receivers: Vec<Receiver<()>> = self.dispatched.lock().drain(..).collect();
    for receiver in receivers {
      let _ = receiver.recv();
    }
  }
}

impl MergeScheduler for WorkerScheduler {
  fn is_job_active(&self, aggregated_hash: &str) -> bool {
    let mut active = self.active.lock();
    active.retain(|worker| worker.is_active());
    active.iter().any(|worker| worker.handles_hash(aggregated_hash))
  }

  #[tracing::instrument(level = "debug", skip_all, fields(payloads = payloads.len()))]
  fn schedule(&self, payloads: Vec<WorkPayload>) -> anyhow::Result<()> {
    let mut by_kind: HashMap<AssetKind, Vec<WorkPayload>> = HashMap::new();
    for payload in payloads {
      by_kind.entry(payload.kind).or_default().push(payload);
    }

    for (kind, payloads) in by_kind {
      let sequence = self.chain_sequence.fetch_add(1, Ordering::SeqCst);
      let chain_id = format!("chain-{}-{:04}", now_unix(), sequence);

      let worker = Arc::new(MergeWorker::new(
        kind,
        chain_id,
        self.options.clone(),
        self.queue.clone(),
        self.reader.clone(),
        self.file_system.clone(),
        self.store.clone(),
      ));
      for payload in payloads {
        worker.enqueue(payload);
      }

      // save() before dispatch() is the durability boundary.
      worker.save(true)?;
      let done = worker.dispatch();

      self.active.lock().push(worker);
      self.dispatched.lock().push(done);
    }

    Ok(())
  }
}
