use markup5ever_rcdom::Handle;

/// Per-asset-kind strategy plugged into the `DocumentScanner`.
///
/// Pass 1 walks every candidate tag through `process`, then `complete_process`
/// fires once per processor; pass 2 re-walks the same tags through
/// `postprocess`, then `complete_postprocess` fires once per processor.
pub trait AssetProcessor {
  /// Inspect one tag, collecting it if it belongs to this processor's kind
  /// and is not excluded. Must not perform I/O.
  fn process(&mut self, tag: &Handle);

  /// Hash the collected set, consult the cache and schedule merge work on a
  /// miss. The only pass-1 step that may touch collaborators.
  fn complete_process(&mut self) -> anyhow::Result<()>;

  /// Rewrite one tag if its URI was collected and a bundle is available.
  fn postprocess(&mut self, tag: &Handle);

  fn complete_postprocess(&mut self);
}
