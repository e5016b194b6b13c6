use swc_core::common::sync::Lrc;
use swc_core::common::{FileName, SourceMap};
use swc_core::ecma::ast::{Callee, Expr, Lit, ModuleItem, Program, Stmt, UnaryOp};
use swc_core::ecma::parser::lexer::Lexer;
use swc_core::ecma::parser::{Parser, StringInput, Syntax};

#[derive(Debug, thiserror::Error)]
pub enum AnalyzerError {
  #[error("Failed to parse script: {0}")]
  Parse(String),
}

/// The grammar a script body declares for itself.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SourceKind {
  Script,
  Module,
}

impl SourceKind {
  /// Maps a `<script type="...">` attribute value onto a grammar.
  pub fn from_declared_type(declared_type: Option<&str>) -> Self {
    match declared_type {
      Some("module") => SourceKind::Module,
      _ => SourceKind::Script,
    }
  }
}

/// Whether `source` consists of nothing but one immediately invoked function
/// expression (after its directive prologue).
///
/// IIFE programs create no top-level bindings, so their text can be wrapped
/// in a function and invoked from a shared execution context. Anything else
/// may rely on top-level `var`/function declarations becoming globals and
/// must instead be evaluated in the page's own global scope.
pub fn is_program_an_iife(source: &str, kind: SourceKind) -> Result<bool, AnalyzerError> {
  let program = parse(source, kind)?;

  let statements: Vec<&Stmt> = match &program {
    Program::Script(script) => script.body.iter().collect(),
    Program::Module(module) => {
      let mut statements = Vec::new();
      for item in &module.body {
        match item {
          ModuleItem::Stmt(statement) => statements.push(statement),
          // Import/export declarations are top-level bindings by definition.
          ModuleItem::ModuleDecl(_) => return Ok(false),
        }
      }
      statements
    }
  };

  let mut statements = statements
    .into_iter()
    .filter(|statement| !matches!(statement, Stmt::Empty(_)));

  // Skip the directive prologue ("use strict" and friends), then require
  // exactly one expression statement of IIFE shape.
  let mut first = statements.next();
  while let Some(statement) = first {
    if !is_directive(statement) {
      first = Some(statement);
      break;
    }
    first = statements.next();
  }

  let Some(first) = first else {
    return Ok(false);
  };
  if statements.next().is_some() {
    return Ok(false);
  }

  let Stmt::Expr(expression_statement) = first else {
    return Ok(false);
  };

  Ok(is_iife_expression(&expression_statement.expr))
}

fn parse(source: &str, kind: SourceKind) -> Result<Program, AnalyzerError> {
  let cm: Lrc<SourceMap> = Default::default();
  let fm = cm.new_source_file(FileName::Anon.into(), source.into());
  let lexer = Lexer::new(
    Syntax::Es(Default::default()),
    Default::default(),
    StringInput::from(&*fm),
    None,
  );
  let mut parser = Parser::new_from(lexer);

  let program = match kind {
    SourceKind::Script => parser.parse_script().map(Program::Script),
    SourceKind::Module => parser.parse_module().map(Program::Module),
  }
  .map_err(|error| AnalyzerError::Parse(error.kind().msg().to_string()))?;

  if let Some(error) = parser.take_errors().into_iter().next() {
    return Err(AnalyzerError::Parse(error.kind().msg().to_string()));
  }

  Ok(program)
}

fn is_directive(statement: &Stmt) -> bool {
  match statement {
    Stmt::Expr(expression_statement) => {
      matches!(&*expression_statement.expr, Expr::Lit(Lit::Str(_)))
    }
    _ => false,
  }
}

/// Unwraps parenthesization, the unary operators an IIFE is commonly forced
/// into expression position with, and sequence expressions (whose value is
/// their last element).
fn unwrap_expression(mut expression: &Expr) -> &Expr {
  loop {
    match expression {
      Expr::Paren(paren) => expression = &paren.expr,
      Expr::Unary(unary)
        if matches!(
          unary.op,
          UnaryOp::Bang | UnaryOp::Plus | UnaryOp::Minus | UnaryOp::Tilde | UnaryOp::Void
        ) =>
      {
        expression = &unary.arg
      }
      Expr::Seq(sequence) => match sequence.exprs.last() {
        Some(last) => expression = last,
        None => return expression,
      },
      _ => return expression,
    }
  }
}

/// A callee counts as a function if, after unwrapping, it is a function or
/// arrow expression, possibly behind a member access ((fn).call(...)).
fn callee_is_function(mut expression: &Expr) -> bool {
  loop {
    expression = unwrap_expression(expression);
    match expression {
      Expr::Fn(_) | Expr::Arrow(_) => return true,
      Expr::Member(member) => expression = &member.obj,
      _ => return false,
    }
  }
}

fn unwrap_parens(mut expression: &Expr) -> &Expr {
  while let Expr::Paren(paren) = expression {
    expression = &paren.expr;
  }
  expression
}

fn is_iife_expression(expression: &Expr) -> bool {
  match unwrap_expression(expression) {
    Expr::Call(call) => match &call.callee {
      Callee::Expr(callee) => callee_is_function(callee),
      _ => false,
    },
    // Arrow functions cannot follow `new`.
    Expr::New(new_expression) => matches!(unwrap_parens(&new_expression.callee), Expr::Fn(_)),
    _ => false,
  }
}
