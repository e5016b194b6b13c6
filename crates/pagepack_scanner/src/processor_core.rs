use pagepack_core::config::{bundle_file_name, PagepackOptions, BUNDLE_SUBDIR};
use pagepack_core::hash::{aggregated_hash, page_hash};
use pagepack_core::minifier::MinifierRef;
use pagepack_core::scheduler::MergeSchedulerRef;
use pagepack_core::types::{AssetKind, AssetReference, BundleRecord, PageMapping, WorkPayload};
use pagepack_filesystem::{build_path, FileSystemRef};
use pagepack_store::BundleCache;
use pagepack_store::RecordStoreRef;

/// The kind-independent half of an asset processor: reference collection,
/// exclusion filtering, aggregated hashing, cache consultation and merge
/// scheduling. The kind-specific processors own tag matching and rewriting
/// and delegate everything else here.
pub struct ProcessorCore {
  kind: AssetKind,
  page_id: String,
  options: PagepackOptions,
  cache: BundleCache,
  store: RecordStoreRef,
  scheduler: MergeSchedulerRef,
  minifier: MinifierRef,
  file_system: FileSystemRef,
  references: Vec<AssetReference>,
  bundle_url: Option<String>,
  first_rewritten: bool,
  rewritten_count: u32,
}

impl ProcessorCore {
  #[allow(clippy::too_many_arguments)]
  pub fn new(
    kind: AssetKind,
    page_id: String,
    options: PagepackOptions,
    store: RecordStoreRef,
    scheduler: MergeSchedulerRef,
    minifier: MinifierRef,
    file_system: FileSystemRef,
  ) -> Self {
    Self {
      kind,
      page_id,
      options,
      cache: BundleCache::new(store.clone()),
      store,
      scheduler,
      minifier,
      file_system,
      references: Vec::new(),
      bundle_url: None,
      first_rewritten: false,
      rewritten_count: 0,
    }
  }

  pub fn kind(&self) -> AssetKind {
    self.kind
  }

  /// Collects one discovered reference unless an exclusion rule matches.
  pub fn collect(&mut self, reference: AssetReference) {
    if self.options.is_excluded(self.kind, &reference.uri) {
      tracing::debug!(kind = %self.kind, uri = %reference.uri, "Excluded from concatenation");
      return;
    }
    self.references.push(reference);
  }

  pub fn is_collected(&self, uri: &str) -> bool {
    self.references.iter().any(|reference| reference.uri == uri)
  }

  /// The bundle URL tags are rewritten to, once a record is available.
  pub fn bundle_url(&self) -> Option<&str> {
    self.bundle_url.as_deref()
  }

  /// True exactly once, for the first rewritten occurrence.
  pub fn take_first_rewrite(&mut self) -> bool {
    let first = !self.first_rewritten;
    self.first_rewritten = true;
    self.rewritten_count += 1;
    first
  }

  pub fn log_postprocess_summary(&self) {
    if self.rewritten_count > 0 {
      tracing::debug!(
        kind = %self.kind,
        rewritten = self.rewritten_count,
        bundle_url = ?self.bundle_url,
        "Rewrote concatenated tags"
      );
    }
  }

  /// Pass-1 completion: hash the set, record the page mapping, then either
  /// refresh the existing record (hit) or schedule merge work (miss).
  pub fn complete(&mut self) -> anyhow::Result<()> {
    if self.references.is_empty() {
      return Ok(());
    }

    let uris: Vec<&str> = self
      .references
      .iter()
      .map(|reference| reference.uri.as_str())
      .collect();
    let hash = aggregated_hash(&uris);

    if let Err(error) = self.store.upsert_page_mapping(PageMapping {
      page_hash: page_hash(&self.page_id),
      kind: self.kind,
      aggregated_hash: hash.clone(),
    }) {
      tracing::error!(%error, "Page mapping write failed");
    }

    match self.cache.get(&hash) {
      Some(record) => self.refresh_record(record),
      None => self.schedule_merge(&hash)?,
    }

    Ok(())
  }

  fn refresh_record(&mut self, mut record: BundleRecord) {
    if self.options.minify_enabled && !record.is_minified {
      self.minify_bundle(&mut record);
    }

    record.files_count = self.references.len() as u32;
    if let Err(error) = self.cache.upsert(record.clone()) {
      // Stale stats are an acceptable degraded mode.
      tracing::error!(hash = %record.aggregated_hash, %error, "Record refresh failed");
    }

    self.bundle_url = Some(record.bundle_uri);
  }

  /// Lazy re-minification of an already-built bundle, in place.
  fn minify_bundle(&self, record: &mut BundleRecord) {
    let path = build_path(
      &self.options.output_root,
      BUNDLE_SUBDIR,
      &bundle_file_name(&record.aggregated_hash, self.kind),
    );

    let contents = match self.file_system.read(&path) {
      Ok(contents) => contents,
      Err(error) => {
        tracing::warn!(?path, %error, "Cannot read bundle for minification");
        return;
      }
    };

    let minified = match self.minifier.minify(self.kind, &contents) {
      Ok(minified) => minified,
      Err(error) => {
        tracing::warn!(?path, %error, "Minification failed, keeping bundle as-is");
        return;
      }
    };

    if let Err(error) = self.file_system.write(&path, &minified) {
      tracing::warn!(?path, %error, "Cannot rewrite minified bundle");
      return;
    }

    record.optimized_size = minified.len() as u64;
    record.is_minified = true;
  }

  fn schedule_merge(&mut self, hash: &str) -> anyhow::Result<()> {
    if self.scheduler.is_job_active(hash) {
      // Best-effort duplicate guard; see MergeScheduler.
      tracing::debug!(kind = %self.kind, %hash, "Merge already scheduled, skipping");
      return Ok(());
    }

    let payloads: Vec<WorkPayload> = self
      .references
      .iter()
      .map(|reference| WorkPayload {
        resource_uri: reference.uri.clone(),
        integrity: reference.integrity.clone(),
        declared_type: reference.declared_type.clone(),
        aggregated_hash: hash.to_string(),
        kind: self.kind,
        origin_page_id: self.page_id.clone(),
      })
      .collect();

    tracing::info!(kind = %self.kind, %hash, payloads = payloads.len(), "Scheduling merge");
    self.scheduler.schedule(payloads)
  }
}

#[cfg(test)]
mod tests {
  use std::path::PathBuf;
  use std::sync::Arc;

  use pretty_assertions::assert_eq;

  use pagepack_core::config::ExclusionRule;
  use pagepack_core::minifier::NoopMinifier;
  use pagepack_core::scheduler::MockMergeScheduler;
  use pagepack_core::types::now_unix;
  use pagepack_filesystem::InMemoryFileSystem;
  use pagepack_store::{InMemoryRecordStore, RecordStore};

  use super::*;

  fn options() -> PagepackOptions {
    PagepackOptions {
      base_url: String::from("https://cdn.example"),
      output_root: PathBuf::from("/out"),
      state_dir: PathBuf::from("/state"),
      minify_enabled: false,
      exclusions: Default::default(),
    }
  }

  fn reference(uri: &str) -> AssetReference {
    AssetReference {
      uri: uri.to_string(),
      integrity: None,
      declared_type: None,
    }
  }

  fn core_with(
    options: PagepackOptions,
    store: Arc<InMemoryRecordStore>,
    scheduler: MockMergeScheduler,
  ) -> ProcessorCore {
    ProcessorCore::new(
      AssetKind::Stylesheet,
      String::from("page-1"),
      options,
      store,
      Arc::new(scheduler),
      Arc::new(NoopMinifier),
      Arc::new(InMemoryFileSystem::new()),
    )
  }

  #[test]
  fn empty_collection_is_a_no_op() {
    let scheduler = MockMergeScheduler::new();
    let mut core = core_with(options(), Arc::new(InMemoryRecordStore::new()), scheduler);
    core.complete().unwrap();
  }

  #[test]
  fn miss_schedules_one_payload_per_reference() {
    let mut scheduler = MockMergeScheduler::new();
    scheduler.expect_is_job_active().return_const(false);
    scheduler
      .expect_schedule()
      .withf(|payloads| payloads.len() == 2)
      .returning(|_| Ok(()));

    let mut core = core_with(options(), Arc::new(InMemoryRecordStore::new()), scheduler);
    core.collect(reference("/css/a.css"));
    core.collect(reference("/css/b.css"));
    core.complete().unwrap();

    // No bundle yet, so pass 2 leaves tags untouched.
    assert!(core.bundle_url().is_none());
  }

  #[test]
  fn active_job_suppresses_duplicate_scheduling() {
    let mut scheduler = MockMergeScheduler::new();
    scheduler.expect_is_job_active().return_const(true);
    scheduler.expect_schedule().never();

    let mut core = core_with(options(), Arc::new(InMemoryRecordStore::new()), scheduler);
    core.collect(reference("/css/a.css"));
    core.complete().unwrap();
  }

  #[test]
  fn hit_refreshes_files_count_and_exposes_the_bundle_url() {
    let store = Arc::new(InMemoryRecordStore::new());
    let hash = aggregated_hash(&["/css/a.css", "/css/b.css"]);
    let mut record = BundleRecord::new(
      hash.clone(),
      AssetKind::Stylesheet,
      format!("https://cdn.example/concatenated/{hash}.css"),
    );
    record.files_count = 1;
    store.upsert_record(record).unwrap();

    let mut scheduler = MockMergeScheduler::new();
    scheduler.expect_schedule().never();

    let mut core = core_with(options(), store.clone(), scheduler);
    core.collect(reference("/css/a.css"));
    core.collect(reference("/css/b.css"));
    core.complete().unwrap();

    assert_eq!(store.get_record(&hash).unwrap().files_count, 2);
    assert_eq!(
      core.bundle_url(),
      Some(format!("https://cdn.example/concatenated/{hash}.css").as_str())
    );
  }

  #[test]
  fn running_complete_twice_updates_rather_than_duplicates() {
    let store = Arc::new(InMemoryRecordStore::new());
    let hash = aggregated_hash(&["/css/a.css"]);
    let mut record = BundleRecord::new(
      hash.clone(),
      AssetKind::Stylesheet,
      format!("https://cdn.example/concatenated/{hash}.css"),
    );
    record.created_at = now_unix() - 100;
    store.upsert_record(record).unwrap();

    for _ in 0..2 {
      let mut scheduler = MockMergeScheduler::new();
      scheduler.expect_schedule().never();
      let mut core = core_with(options(), store.clone(), scheduler);
      core.collect(reference("/css/a.css"));
      core.complete().unwrap();
    }

    assert_eq!(store.list_records(0, 10).len(), 1);
  }

  #[test]
  fn excluded_references_are_not_collected() {
    let mut options = options();
    options.exclusions.insert(
      AssetKind::Stylesheet,
      vec![ExclusionRule {
        pattern: String::from(r"vendor/"),
        is_regex: true,
      }],
    );

    let mut scheduler = MockMergeScheduler::new();
    scheduler.expect_is_job_active().return_const(false);
    scheduler
      .expect_schedule()
      .withf(|payloads| payloads.len() == 1 && payloads[0].resource_uri == "/css/site.css")
      .returning(|_| Ok(()));

    let mut core = core_with(options, Arc::new(InMemoryRecordStore::new()), scheduler);
    core.collect(reference("/css/vendor/reset.css"));
    core.collect(reference("/css/site.css"));
    assert!(!core.is_collected("/css/vendor/reset.css"));
    core.complete().unwrap();
  }

  #[test]
  fn lazy_minification_rewrites_the_bundle_in_place() {
    use pagepack_core::minifier::Minifier;
    use pagepack_filesystem::FileSystem;

    struct UpperMinifier;
    impl Minifier for UpperMinifier {
      fn minify(&self, _kind: AssetKind, code: &[u8]) -> anyhow::Result<Vec<u8>> {
        Ok(code.to_ascii_uppercase())
      }
    }

    let store = Arc::new(InMemoryRecordStore::new());
    let file_system = Arc::new(InMemoryFileSystem::new());
    let hash = aggregated_hash(&["/css/a.css"]);
    let path = PathBuf::from(format!("/out/concatenated/{hash}.css"));
    file_system.create_file(&path, b"a { color: red; }").unwrap();

    let mut record = BundleRecord::new(
      hash.clone(),
      AssetKind::Stylesheet,
      format!("https://cdn.example/concatenated/{hash}.css"),
    );
    record.original_size = 17;
    record.optimized_size = 17;
    store.upsert_record(record).unwrap();

    let mut options = options();
    options.minify_enabled = true;

    let mut core = ProcessorCore::new(
      AssetKind::Stylesheet,
      String::from("page-1"),
      options,
      store.clone(),
      Arc::new(MockMergeScheduler::new()),
      Arc::new(UpperMinifier),
      file_system.clone(),
    );
    core.collect(reference("/css/a.css"));
    core.complete().unwrap();

    assert_eq!(file_system.read(&path).unwrap(), b"A { COLOR: RED; }");
    let record = store.get_record(&hash).unwrap();
    assert!(record.is_minified);
  }
}
