use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::Receiver;
use parking_lot::Mutex;

use pagepack_core::config::{bundle_public_url, PagepackOptions};
use pagepack_core::integrity;
use pagepack_core::types::{AssetKind, Batch, BundleRecord, Chain, WorkPayload};
use pagepack_filesystem::{FileReaderRef, FileSystemRef};
use pagepack_js_analyzer::{transform_chunk, SourceKind};
use pagepack_store::RecordStoreRef;

use crate::bundle_writer::BundleWriter;
use crate::queue_store::{QueueError, QueueStoreRef};

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
  #[error(transparent)]
  Queue(#[from] QueueError),
  #[error("Bundle output unavailable: {0}")]
  Output(#[from] std::io::Error),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WorkerState {
  Queued,
  Processing,
  Paused,
  Completed,
  Cancelled,
}

/// Durable, resumable merge job for one asset kind.
///
/// Work is made durable by `save` before `dispatch` ever runs: if the process
/// terminates in between, a later invocation picks the persisted batches up
/// from the queue store. Items are at-most-once — a failed fetch, integrity
/// mismatch or parse error drops that one item with a log line and the queue
/// moves on.
pub struct MergeWorker {
  kind: AssetKind,
  chain_id: String,
  options: PagepackOptions,
  queue: QueueStoreRef,
  reader: FileReaderRef,
  writer: BundleWriter,
  store: RecordStoreRef,
  state: Mutex<WorkerState>,
  pending: Mutex<Vec<WorkPayload>>,
  active_hashes: Mutex<HashSet<String>>,
  batch_sequence: AtomicU64,
}

impl MergeWorker {
  pub fn new(
    kind: AssetKind,
    chain_id: String,
    options: PagepackOptions,
    queue: QueueStoreRef,
    reader: FileReaderRef,
    file_system: FileSystemRef,
    store: RecordStoreRef,
  ) -> Self {
    let writer = BundleWriter::new(file_system, options.output_root.clone());
    Self {
      kind,
      chain_id,
      options,
      queue,
      reader,
      writer,
      store,
      state: Mutex::new(WorkerState::Queued),
      pending: Mutex::new(Vec::new()),
      active_hashes: Mutex::new(HashSet::new()),
      batch_sequence: AtomicU64::new(0),
    }
  }

  pub fn state(&self) -> WorkerState {
    *self.state.lock()
  }

  pub fn is_active(&self) -> bool {
    matches!(
      self.state(),
      WorkerState::Queued | WorkerState::Processing | WorkerState::Paused
    )
  }

  /// Whether this job is merging the given aggregated hash.
  pub fn handles_hash(&self, aggregated_hash: &str) -> bool {
    self.active_hashes.lock().contains(aggregated_hash)
  }

  pub fn enqueue(&self, payload: WorkPayload) {
    self.pending.lock().push(payload);
  }

  /// Persists the pending list as one batch. This is the durability
  /// boundary: once `save` returns, a process restart resumes from exactly
  /// this state.
  pub fn save(&self, is_final: bool) -> Result<Option<Batch>, WorkerError> {
    let payloads: Vec<WorkPayload> = self.pending.lock().drain(..).collect();
    if payloads.is_empty() {
      return Ok(None);
    }

    let sequence = self.batch_sequence.fetch_add(1, Ordering::SeqCst);
    let batch = Batch {
      id: format!("{}-{:08}", self.chain_id, sequence),
      chain_id: self.chain_id.clone(),
      payloads,
      is_final,
    };

    self.queue.save_batch(&batch)?;

    let mut active_hashes = self.active_hashes.lock();
    for payload in &batch.payloads {
      active_hashes.insert(payload.aggregated_hash.clone());
    }

    tracing::debug!(
      batch_id = %batch.id,
      payloads = batch.payloads.len(),
      is_final,
      "Persisted merge batch"
    );
    Ok(Some(batch))
  }

  /// Fire-and-forget asynchronous execution. The returned receiver fires
  /// once the dispatched run drains the queue or stops; callers are free to
  /// drop it.
  pub fn dispatch(self: &Arc<Self>) -> Receiver<()> {
    let (sender, receiver) = crossbeam_channel::bounded(1);
    let worker = Arc::clone(self);
    std::thread::spawn(move || {
      worker.run();
      let _ = sender.send(());
    });
    receiver
  }

  fn run(&self) {
    loop {
      match self.process_next_batch() {
        Ok(Some(_)) => {}
        Ok(None) => break,
        Err(error) => {
          tracing::error!(kind = %self.kind, %error, "Merge run aborted");
          break;
        }
      }
    }
  }

  /// Processes the oldest pending batch to completion, removing every item
  /// from the queue whether it succeeded or was dropped. There is no retry.
  #[tracing::instrument(level = "debug", skip(self), fields(kind = %self.kind))]
  pub fn process_next_batch(&self) -> Result<Option<Batch>, WorkerError> {
    if matches!(self.state(), WorkerState::Paused | WorkerState::Cancelled) {
      return Ok(None);
    }

    // Scoped to this worker's chain: the queue store is shared across every
    // concurrently dispatched worker.
    let Some(mut batch) = self.queue.peek_batch(&self.chain_id)? else {
      return Ok(None);
    };
    *self.state.lock() = WorkerState::Processing;

    while !batch.payloads.is_empty() {
      match self.state() {
        WorkerState::Paused => {
          tracing::info!(batch_id = %batch.id, "Merge paused, queued state kept");
          return Ok(None);
        }
        WorkerState::Cancelled => {
          tracing::info!(batch_id = %batch.id, "Merge cancelled, partial bundle left as-is");
          return Ok(None);
        }
        _ => {}
      }

      let payload = batch.payloads.remove(0);
      self.process_payload(&payload)?;
      // Success or failure, the item is gone from the persisted queue.
      self.queue.update_batch(&batch)?;
    }

    self.queue.remove_batch(&batch.id)?;

    if batch.is_final {
      self.complete()?;
    } else {
      *self.state.lock() = WorkerState::Queued;
    }

    Ok(Some(batch))
  }

  fn process_payload(&self, payload: &WorkPayload) -> Result<(), WorkerError> {
    let bytes = match self.reader.read_remote(&payload.resource_uri) {
      Ok(bytes) => bytes,
      Err(error) => {
        tracing::error!(uri = %payload.resource_uri, %error, "Fetch failed, dropping item");
        return Ok(());
      }
    };

    if !integrity::is_valid(&bytes, payload.integrity.as_deref()) {
      // is_valid already logged the mismatch.
      return Ok(());
    }

    self.update_chain(payload)?;

    match payload.kind {
      AssetKind::Stylesheet => {
        self
          .writer
          .append_stylesheet_chunk(&payload.aggregated_hash, &bytes)?;
      }
      AssetKind::Script => {
        let source = String::from_utf8_lossy(&bytes);
        let source_kind = SourceKind::from_declared_type(payload.declared_type.as_deref());
        let chunk = match transform_chunk(&source, source_kind) {
          Ok(chunk) => chunk,
          Err(error) => {
            tracing::error!(uri = %payload.resource_uri, %error, "Classification failed, dropping item");
            return Ok(());
          }
        };
        self
          .writer
          .append_script_chunk(&payload.aggregated_hash, &payload.resource_uri, &chunk)?;
      }
    }

    self.upsert_provisional_record(payload, bytes.len() as u64);
    Ok(())
  }

  /// Persists the chain accumulator alongside the chain id so it survives
  /// across invocations.
  fn update_chain(&self, payload: &WorkPayload) -> Result<(), WorkerError> {
    let mut chain = self
      .queue
      .load_chain(&self.chain_id)?
      .unwrap_or_else(|| Chain {
        chain_id: self.chain_id.clone(),
        ..Chain::default()
      });

    chain
      .per_kind_hash
      .insert(payload.kind, payload.aggregated_hash.clone());
    chain.origin_page_id = payload.origin_page_id.clone();

    self.queue.save_chain(&chain)?;
    Ok(())
  }

  fn upsert_provisional_record(&self, payload: &WorkPayload, original_len: u64) {
    let bundle_uri = bundle_public_url(
      &self.options.base_url,
      &payload.aggregated_hash,
      payload.kind,
    );

    let mut record = self
      .store
      .get_record(&payload.aggregated_hash)
      .unwrap_or_else(|| {
        BundleRecord::new(payload.aggregated_hash.clone(), payload.kind, bundle_uri.clone())
      });
    record.bundle_uri = bundle_uri;
    record.files_count += 1;
    record.original_size += original_len;
    record.optimized_size = self
      .writer
      .bundle_size(&payload.aggregated_hash, payload.kind)
      .unwrap_or(record.optimized_size);
    record.is_minified = false;

    // A failed write only degrades stats; the bundle file itself is fine.
    if let Err(error) = self.store.upsert_record(record) {
      tracing::error!(hash = %payload.aggregated_hash, %error, "Record store write failed");
    }
  }

  /// Invoked when the chain's final batch drains: appends the script
  /// runtime-loader trailer exactly once and clears the persisted chain.
  fn complete(&self) -> Result<(), WorkerError> {
    if self.kind == AssetKind::Script {
      if let Some(chain) = self.queue.load_chain(&self.chain_id)? {
        if let Some(aggregated_hash) = chain.per_kind_hash.get(&AssetKind::Script) {
          // Every item may have been dropped, in which case there is no
          // bundle file to close.
          if self.writer.bundle_size(aggregated_hash, AssetKind::Script).is_ok() {
            self.writer.append_script_trailer(aggregated_hash)?;
          }
        }
      }
    }

    self.queue.clear_chain(&self.chain_id)?;
    self.active_hashes.lock().clear();
    *self.state.lock() = WorkerState::Completed;
    tracing::info!(kind = %self.kind, chain_id = %self.chain_id, "Merge chain completed");
    Ok(())
  }

  /// Halts further batch processing without losing queued state.
  pub fn pause(&self) {
    let mut state = self.state.lock();
    if matches!(*state, WorkerState::Queued | WorkerState::Processing) {
      *state = WorkerState::Paused;
    }
  }

  pub fn resume(self: &Arc<Self>) -> Receiver<()> {
    {
      let mut state = self.state.lock();
      if *state == WorkerState::Paused {
        *state = WorkerState::Queued;
      }
    }
    self.dispatch()
  }

  /// Halts permanently. Partially written bundle files are left as-is; there
  /// is no compensating cleanup.
  pub fn cancel(&self) {
    *self.state.lock() = WorkerState::Cancelled;
  }
}
