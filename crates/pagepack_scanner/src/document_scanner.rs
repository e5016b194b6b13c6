use std::io::BufReader;

use html5ever::serialize::SerializeOpts;
use html5ever::tendril::TendrilSink;
use html5ever::{serialize, ParseOpts};
use markup5ever::{expanded_name, local_name, namespace_url, ns};
use markup5ever_rcdom::{Handle, NodeData, RcDom, SerializableHandle};

use crate::asset_processor::AssetProcessor;
use crate::dom_visitor::{walk, DomTraversalOperation, DomVisitor};

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
  #[error("Failed to parse document: {0}")]
  Parse(std::io::Error),
  #[error("Failed to serialize document: {0}")]
  Serialize(std::io::Error),
  #[error(transparent)]
  Process(anyhow::Error),
}

/// Two-pass driver over one HTML document.
///
/// Pass 1 feeds every candidate tag to every processor and lets each
/// processor complete (hash, cache lookup, scheduling). Pass 2 re-walks the
/// same tags so processors whose bundle is available can rewrite them. The
/// document is serialized once, after both passes.
pub struct DocumentScanner {
  processors: Vec<Box<dyn AssetProcessor>>,
}

impl DocumentScanner {
  pub fn new(processors: Vec<Box<dyn AssetProcessor>>) -> Self {
    Self { processors }
  }

  pub fn scan(&mut self, markup: &[u8]) -> Result<Vec<u8>, ScanError> {
    let dom = parse_html(markup).map_err(ScanError::Parse)?;

    let mut collector = TagCollector::default();
    walk(dom.document.clone(), &mut collector);

    for tag in &collector.tags {
      for processor in &mut self.processors {
        processor.process(tag);
      }
    }
    for processor in &mut self.processors {
      processor.complete_process().map_err(ScanError::Process)?;
    }

    for tag in &collector.tags {
      for processor in &mut self.processors {
        processor.postprocess(tag);
      }
    }
    for processor in &mut self.processors {
      processor.complete_postprocess();
    }

    serialize_html(dom).map_err(ScanError::Serialize)
  }
}

/// Collects `<script>` and `<link>` handles in document order so both passes
/// see tags in the same sequence.
#[derive(Default)]
struct TagCollector {
  tags: Vec<Handle>,
}

impl DomVisitor for TagCollector {
  fn visit_node(&mut self, node: Handle) -> DomTraversalOperation {
    if let NodeData::Element { name, .. } = &node.data {
      let name = name.expanded();
      if name == expanded_name!(html "script") || name == expanded_name!(html "link") {
        self.tags.push(node.clone());
      }
    }
    DomTraversalOperation::Continue
  }
}

pub fn parse_html(bytes: &[u8]) -> Result<RcDom, std::io::Error> {
  let mut bytes = BufReader::new(bytes);
  let options = ParseOpts::default();
  let dom = RcDom::default();
  html5ever::parse_document(dom, options)
    .from_utf8()
    .read_from(&mut bytes)
}

pub fn serialize_html(dom: RcDom) -> Result<Vec<u8>, std::io::Error> {
  let document: SerializableHandle = dom.document.clone().into();
  let mut output_bytes = vec![];
  let options = SerializeOpts::default();
  serialize(&mut output_bytes, &document, options)?;
  Ok(output_bytes)
}
