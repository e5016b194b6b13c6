use markup5ever_rcdom::Handle;

#[derive(PartialEq, Eq)]
pub enum DomTraversalOperation {
  Continue,
  Stop,
}

pub trait DomVisitor {
  fn visit_node(&mut self, node: Handle) -> DomTraversalOperation;
}

/// Depth-first, left-to-right traversal, so visited elements come back in
/// document order.
pub fn walk(node: Handle, visitor: &mut impl DomVisitor) {
  let mut stack = vec![node];
  while let Some(node) = stack.pop() {
    let operation = visitor.visit_node(node.clone());
    if operation == DomTraversalOperation::Stop {
      break;
    }

    let children = node.children.borrow();
    for child in children.iter().rev() {
      stack.push(child.clone());
    }
  }
}
