//! Shared types for the Sasso compiler.
//!
//! This crate defines the SCSS AST, source spans, the user-facing
//! compilation error and the error collection used by the parser.

mod error;
mod span;
pub mod ast;

pub use error::{CompileError, CompileErrors, ErrorCategory, ErrorCode, Severity, MAX_ERRORS};
pub use span::{SourceFile, Span};

/// Result type used throughout the Sasso compiler.
pub type Result<T> = std::result::Result<T, CompileError>;
