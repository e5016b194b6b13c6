use std::path::PathBuf;
use std::sync::Arc;

use pagepack_core::config::PagepackOptions;
use pagepack_core::hash::page_hash;
use pagepack_core::minifier::{MinifierRef, NoopMinifier};
use pagepack_core::scheduler::MergeSchedulerRef;
use pagepack_core::types::{AssetKind, BundleRecord};
use pagepack_filesystem::{FileReaderRef, FileSystemRef, HttpFileReader, OsFileSystem};
use pagepack_scanner::{
  AssetProcessor, DocumentScanner, ProcessorCore, ScriptProcessor, StylesheetProcessor,
};
use pagepack_store::{InMemoryRecordStore, RecordStoreRef};
use pagepack_worker::{JsonFileQueueStore, QueueStoreRef, WorkerScheduler};

/// Aggregate counters for an admin or reporting surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagepackStats {
  pub total_size_saved: u64,
  pub total_files_count: u64,
}

/// The assembled pipeline: one of these per site, shared across requests.
///
/// `optimize_page` is the request-path entry point. It never blocks on merge
/// work and never fails a page: any pipeline error falls back to returning
/// the original markup unchanged.
pub struct Pagepack {
  options: PagepackOptions,
  store: RecordStoreRef,
  scheduler: Arc<WorkerScheduler>,
  file_system: FileSystemRef,
  minifier: MinifierRef,
}

impl Pagepack {
  /// Production wiring: real filesystem, HTTP/local resource reads resolved
  /// against `document_root`, and a JSON file queue under the state dir so
  /// pending merge work survives restarts.
  pub fn new(options: PagepackOptions, document_root: PathBuf) -> Self {
    let file_system: FileSystemRef = Arc::new(OsFileSystem);
    let reader: FileReaderRef = Arc::new(HttpFileReader::new(file_system.clone(), document_root));
    let queue: QueueStoreRef = Arc::new(JsonFileQueueStore::new(
      file_system.clone(),
      options.state_dir.clone(),
    ));
    let store: RecordStoreRef = Arc::new(InMemoryRecordStore::new());

    Self::with_components(options, file_system, reader, queue, store, Arc::new(NoopMinifier))
  }

  /// Wiring seam for tests and embedders that bring their own store, queue
  /// or minifier.
  pub fn with_components(
    options: PagepackOptions,
    file_system: FileSystemRef,
    reader: FileReaderRef,
    queue: QueueStoreRef,
    store: RecordStoreRef,
    minifier: MinifierRef,
  ) -> Self {
    let scheduler = Arc::new(WorkerScheduler::new(
      options.clone(),
      queue,
      reader,
      file_system.clone(),
      store.clone(),
    ));

    Self {
      options,
      store,
      scheduler,
      file_system,
      minifier,
    }
  }

  /// Scans one page and returns the rewritten markup. Returns the input
  /// unchanged when nothing is bundled yet or when scanning fails.
  #[tracing::instrument(level = "debug", skip(self, markup), fields(bytes = markup.len()))]
  pub fn optimize_page(&self, page_id: &str, markup: &[u8]) -> Vec<u8> {
    let mut scanner = DocumentScanner::new(self.processors(page_id));
    match scanner.scan(markup) {
      Ok(output) => output,
      Err(error) => {
        tracing::warn!(%page_id, %error, "Page scan failed, serving original markup");
        markup.to_vec()
      }
    }
  }

  fn processors(&self, page_id: &str) -> Vec<Box<dyn AssetProcessor>> {
    let scheduler: MergeSchedulerRef = self.scheduler.clone();
    let core = |kind: AssetKind| {
      ProcessorCore::new(
        kind,
        page_id.to_string(),
        self.options.clone(),
        self.store.clone(),
        scheduler.clone(),
        self.minifier.clone(),
        self.file_system.clone(),
      )
    };

    vec![
      Box::new(StylesheetProcessor::new(core(AssetKind::Stylesheet))),
      Box::new(ScriptProcessor::new(core(AssetKind::Script))),
    ]
  }

  pub fn stats(&self) -> PagepackStats {
    PagepackStats {
      total_size_saved: self.store.total_size_saved(),
      total_files_count: self.store.total_files_count(),
    }
  }

  pub fn list_records(&self, offset: usize, limit: usize) -> Vec<BundleRecord> {
    self.store.list_records(offset, limit)
  }

  /// Looks up the bundle a previously scanned page resolved to, without
  /// re-walking any markup. Fast path for cache-warming and reporting.
  pub fn bundle_for_page(&self, page_id: &str, kind: AssetKind) -> Option<BundleRecord> {
    let mapping = self.store.get_page_mapping(&page_hash(page_id), kind)?;
    self.store.get_record(&mapping.aggregated_hash)
  }

  /// Drains all dispatched merge work. Graceful-shutdown and test hook.
  pub fn wait_idle(&self) {
    self.scheduler.wait_idle();
  }
}
