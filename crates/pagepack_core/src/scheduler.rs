use std::sync::Arc;

use mockall::automock;

use crate::types::WorkPayload;

/// Seam between the request-time asset processors and the out-of-band merge
/// worker. Implementations persist the payloads as one batch and trigger
/// asynchronous execution without blocking the caller.
#[automock]
pub trait MergeScheduler {
  /// Best-effort duplicate-scheduling guard. This is a check-then-act with
  /// no lock; concurrent first visits to the same page may both schedule,
  /// and the record-store upsert makes the duplicates converge.
  fn is_job_active(&self, aggregated_hash: &str) -> bool;

  /// Persist `payloads` as one batch and dispatch the worker.
  fn schedule(&self, payloads: Vec<WorkPayload>) -> anyhow::Result<()>;
}

pub type MergeSchedulerRef = Arc<dyn MergeScheduler + Send + Sync>;
