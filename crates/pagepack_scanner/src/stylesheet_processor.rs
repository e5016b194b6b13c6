use markup5ever::{expanded_name, local_name, namespace_url, ns};
use markup5ever_rcdom::{Handle, NodeData};

use pagepack_core::types::AssetReference;

use crate::asset_processor::AssetProcessor;
use crate::attrs::Attrs;
use crate::processor_core::ProcessorCore;

/// Collects `<link rel="stylesheet" href="...">` tags and rewrites them to
/// the merged bundle on the second pass.
pub struct StylesheetProcessor {
  core: ProcessorCore,
}

impl StylesheetProcessor {
  pub fn new(core: ProcessorCore) -> Self {
    Self { core }
  }
}

impl AssetProcessor for StylesheetProcessor {
  fn process(&mut self, tag: &Handle) {
    let NodeData::Element { name, attrs, .. } = &tag.data else {
      return;
    };
    if name.expanded() != expanded_name!(html "link") {
      return;
    }

    let mut attrs = attrs.borrow_mut();
    let attrs = Attrs::new(&mut attrs);

    let is_stylesheet = attrs
      .get(expanded_name!("", "rel"))
      .is_some_and(|rel| rel.eq_ignore_ascii_case("stylesheet"));
    if !is_stylesheet {
      return;
    }

    let Some(href) = attrs.get(expanded_name!("", "href")) else {
      return;
    };

    self.core.collect(AssetReference {
      uri: href.to_string(),
      integrity: attrs
        .get(expanded_name!("", "integrity"))
        .map(|integrity| integrity.to_string()),
      declared_type: None,
    });
  }

  fn complete_process(&mut self) -> anyhow::Result<()> {
    self.core.complete()
  }

  fn postprocess(&mut self, tag: &Handle) {
    let NodeData::Element { name, attrs, .. } = &tag.data else {
      return;
    };
    if name.expanded() != expanded_name!(html "link") {
      return;
    }

    let Some(bundle_url) = self.core.bundle_url().map(str::to_string) else {
      // Bundle still being built; leave the tag untouched.
      return;
    };

    let mut attrs = attrs.borrow_mut();
    let mut attrs = Attrs::new(&mut attrs);

    let Some(href) = attrs.get(expanded_name!("", "href")).map(|href| href.to_string()) else {
      return;
    };
    if !self.core.is_collected(&href) {
      return;
    }

    if self.core.take_first_rewrite() {
      attrs.set(expanded_name!("", "href"), &bundle_url);
      attrs.delete(expanded_name!("", "integrity"));
    } else {
      // Kept in the document but marked non-applying, to preserve DOM
      // structure expectations of other code.
      attrs.set(expanded_name!("", "disabled"), "");
    }
  }

  fn complete_postprocess(&mut self) {
    self.core.log_postprocess_summary();
  }
}
