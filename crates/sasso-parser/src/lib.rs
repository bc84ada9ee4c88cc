//! Sasso parser: converts SCSS source into an AST.

mod parse_at_rule;
mod parse_expr;
mod parse_stmt;
mod parser;

pub use parse_expr::{ExprParser, FlaggedValue};
pub use parser::{ParseResult, Parser};

use sasso_types::ast::Expr;
use sasso_types::{CompileError, ErrorCode, SourceFile, Span};

/// Parse a complete stylesheet, collecting errors instead of stopping at
/// the first one.
pub fn parse_stylesheet(source: &SourceFile) -> ParseResult {
    Parser::new(source).parse()
}

/// Parse a single SassScript expression. `origin` is where `text` starts in
/// `file`, so reported positions point into the enclosing source.
pub fn parse_expression(text: &str, file: &str, origin: Span) -> Result<Expr, CompileError> {
    ExprParser::parse_text(text, file, origin).map_err(|errors| {
        errors.errors.into_iter().next().unwrap_or_else(|| {
            CompileError::new(file, ErrorCode::EXPECTED_EXPRESSION, "Expected expression", origin, text)
        })
    })
}
