//! Page asset concatenation pipeline.
//!
//! Scans HTML documents for external stylesheet and script references,
//! concatenates each kind into a single content-addressed bundle through a
//! durable background worker, and rewrites the page to load the bundle
//! instead of the individual files.

pub mod pagepack;

pub use pagepack_core::config::{ExclusionRule, PagepackOptions};
pub use pagepack_core::types::{AssetKind, BundleRecord};

pub use crate::pagepack::{Pagepack, PagepackStats};

/// Plain stdout logging, for binaries and ad-hoc debugging. Library users
/// embedding the pipeline install their own subscriber instead.
pub fn init_tracing_subscriber() {
  let _ = tracing_subscriber::FmtSubscriber::builder()
    .with_max_level(tracing::Level::DEBUG)
    .try_init();
}
