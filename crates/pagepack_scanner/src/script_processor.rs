use std::cell::RefCell;

use markup5ever::{expanded_name, local_name, namespace_url, ns};
use markup5ever_rcdom::{Handle, Node, NodeData};

use pagepack_core::types::AssetReference;

use crate::asset_processor::AssetProcessor;
use crate::attrs::Attrs;
use crate::processor_core::ProcessorCore;

/// Collects external `<script src="...">` tags and rewrites them to the
/// merged bundle on the second pass. The first occurrence becomes the bundle
/// loader; later ones are neutralized with `type="text/plain"` so the
/// browser keeps the elements but never executes them.
pub struct ScriptProcessor {
  core: ProcessorCore,
}

impl ScriptProcessor {
  pub fn new(core: ProcessorCore) -> Self {
    Self { core }
  }
}

fn is_executable_type(declared_type: Option<&str>) -> bool {
  match declared_type {
    None => true,
    Some(value) => matches!(
      value.to_ascii_lowercase().as_str(),
      "" | "text/javascript" | "application/javascript" | "module"
    ),
  }
}

fn run_chunk_marker(uri: &str) -> String {
  let mut escaped = String::with_capacity(uri.len());
  for character in uri.chars() {
    match character {
      '\\' => escaped.push_str("\\\\"),
      '"' => escaped.push_str("\\\""),
      '\n' => escaped.push_str("\\n"),
      '\r' => escaped.push_str("\\r"),
      other => escaped.push(other),
    }
  }
  format!("pagepack.runChunk(\"{escaped}\", \"js\");")
}

impl AssetProcessor for ScriptProcessor {
  fn process(&mut self, tag: &Handle) {
    let NodeData::Element { name, attrs, .. } = &tag.data else {
      return;
    };
    if name.expanded() != expanded_name!(html "script") {
      return;
    }

    let mut attrs = attrs.borrow_mut();
    let attrs = Attrs::new(&mut attrs);

    let Some(src) = attrs.get(expanded_name!("", "src")) else {
      // Inline scripts are left alone.
      return;
    };

    let declared_type = attrs
      .get(expanded_name!("", "type"))
      .map(|value| value.to_string());
    if !is_executable_type(declared_type.as_deref()) {
      return;
    }

    self.core.collect(AssetReference {
      uri: src.to_string(),
      integrity: attrs
        .get(expanded_name!("", "integrity"))
        .map(|integrity| integrity.to_string()),
      declared_type,
    });
  }

  fn complete_process(&mut self) -> anyhow::Result<()> {
    self.core.complete()
  }

  fn postprocess(&mut self, tag: &Handle) {
    let NodeData::Element { name, attrs, .. } = &tag.data else {
      return;
    };
    if name.expanded() != expanded_name!(html "script") {
      return;
    }

    let Some(bundle_url) = self.core.bundle_url().map(str::to_string) else {
      return;
    };

    let rewrite = {
      let mut attrs = attrs.borrow_mut();
      let mut attrs = Attrs::new(&mut attrs);

      let Some(src) = attrs.get(expanded_name!("", "src")).map(|src| src.to_string()) else {
        return;
      };
      if !self.core.is_collected(&src) {
        return;
      }

      if self.core.take_first_rewrite() {
        attrs.set(expanded_name!("", "src"), &bundle_url);
        attrs.delete(expanded_name!("", "integrity"));
        Some(src)
      } else {
        attrs.set(expanded_name!("", "type"), "text/plain");
        None
      }
    };

    if let Some(original_src) = rewrite {
      // The loader tag carries a marker body telling the runtime which chunk
      // this position originally executed.
      let marker = Node::new(NodeData::Text {
        contents: RefCell::new(run_chunk_marker(&original_src).as_str().into()),
      });
      let mut children = tag.children.borrow_mut();
      children.clear();
      children.push(marker);
    }
  }

  fn complete_postprocess(&mut self) {
    self.core.log_postprocess_summary();
  }
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use super::*;

  #[test]
  fn executable_type_detection() {
    assert!(is_executable_type(None));
    assert!(is_executable_type(Some("text/javascript")));
    assert!(is_executable_type(Some("Application/JavaScript")));
    assert!(is_executable_type(Some("module")));
    assert!(!is_executable_type(Some("text/plain")));
    assert!(!is_executable_type(Some("application/json")));
  }

  #[test]
  fn marker_escapes_quotes_and_backslashes() {
    assert_eq!(
      run_chunk_marker(r#"/js/a"b\c.js"#),
      r#"pagepack.runChunk("/js/a\"b\\c.js", "js");"#
    );
  }
}
