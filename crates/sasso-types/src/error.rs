use crate::Span;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Maximum number of syntax errors collected before the parser gives up.
pub const MAX_ERRORS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// Error category, determined by error code range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Syntax,
    Value,
    Name,
    Module,
    Control,
    User,
}

/// Numeric error code (E100–E699).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ErrorCode(pub u16);

impl ErrorCode {
    // ── Syntax errors (E100–E199) ──
    pub const UNEXPECTED_TOKEN: Self = Self(100);
    pub const UNCLOSED_BLOCK: Self = Self(101);
    pub const UNTERMINATED_STRING: Self = Self(102);
    pub const EXPECTED_EXPRESSION: Self = Self(103);
    pub const INVALID_AT_RULE: Self = Self(104);

    // ── Value errors (E200–E299) ──
    pub const TYPE_MISMATCH: Self = Self(200);
    pub const INCOMPATIBLE_UNITS: Self = Self(201);
    pub const UNDEFINED_OPERATION: Self = Self(202);
    pub const DIVISION_BY_ZERO: Self = Self(203);
    pub const INVALID_ARGUMENT: Self = Self(204);
    pub const WRONG_ARG_COUNT: Self = Self(205);

    // ── Name resolution errors (E300–E399) ──
    pub const UNDEFINED_VARIABLE: Self = Self(300);
    pub const UNDEFINED_MIXIN: Self = Self(301);
    pub const UNDEFINED_FUNCTION: Self = Self(302);
    pub const PROPERTY_NOT_FOUND: Self = Self(303);
    pub const INVALID_MODULE_REFERENCE: Self = Self(304);
    pub const INVALID_SELECTOR: Self = Self(305);

    // ── Module errors (E400–E499) ──
    pub const MODULE_NOT_FOUND: Self = Self(400);
    pub const INVALID_CONFIGURATION: Self = Self(401);

    // ── Control flow errors (E500–E599) ──
    pub const LOOP_LIMIT_EXCEEDED: Self = Self(500);
    pub const CALL_DEPTH_EXCEEDED: Self = Self(501);
    pub const INVALID_CONTEXT: Self = Self(502);
    pub const TOO_MANY_LOOP_VARIABLES: Self = Self(503);

    // ── User directives (E600–E699) ──
    pub const USER_ERROR: Self = Self(600);

    pub fn category(self) -> ErrorCategory {
        match self.0 {
            100..=199 => ErrorCategory::Syntax,
            200..=299 => ErrorCategory::Value,
            300..=399 => ErrorCategory::Name,
            400..=499 => ErrorCategory::Module,
            500..=599 => ErrorCategory::Control,
            _ => ErrorCategory::User,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Syntax => "syntax",
            Self::Value => "value",
            Self::Name => "name",
            Self::Module => "module",
            Self::Control => "control",
            Self::User => "user",
        };
        f.write_str(name)
    }
}

/// The single user-facing compilation failure.
///
/// Every error that aborts a compilation is reported through this type,
/// whatever stage produced it.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("{file}:{span}: {code} [{category}] {message}")]
pub struct CompileError {
    /// Stylesheet the error was raised in.
    pub file: String,
    pub code: ErrorCode,
    pub severity: Severity,
    /// Derived from `code`.
    pub category: ErrorCategory,
    pub message: String,
    #[serde(flatten)]
    pub span: Span,
    /// The offending source line, when known.
    pub source_line: String,
}

impl CompileError {
    pub fn new(
        file: impl Into<String>,
        code: ErrorCode,
        message: impl Into<String>,
        span: Span,
        source_line: impl Into<String>,
    ) -> Self {
        Self {
            file: file.into(),
            code,
            severity: Severity::Error,
            category: code.category(),
            message: message.into(),
            span,
            source_line: source_line.into(),
        }
    }

    /// An error without a meaningful location (e.g. a missing entry file).
    pub fn unlocated(file: impl Into<String>, code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(file, code, message, Span::point(1, 1), "")
    }
}

/// Errors collected by the parser before it gives up.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompileErrors {
    pub errors: Vec<CompileError>,
    pub total_errors: usize,
}

impl CompileErrors {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn has_errors(&self) -> bool {
        self.total_errors > 0
    }

    /// Add an error, respecting the [`MAX_ERRORS`] limit.
    pub fn push_error(&mut self, error: CompileError) {
        if self.errors.len() < MAX_ERRORS {
            self.errors.push(error);
        }
        self.total_errors += 1;
    }

    /// The first error collected, if any.
    pub fn first(&self) -> Option<&CompileError> {
        self.errors.first()
    }

    /// Consume the collection, yielding the first error if there was one.
    pub fn into_result(self) -> Result<(), CompileError> {
        match self.errors.into_iter().next() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_category() {
        assert_eq!(ErrorCode::UNEXPECTED_TOKEN.category(), ErrorCategory::Syntax);
        assert_eq!(ErrorCode::INCOMPATIBLE_UNITS.category(), ErrorCategory::Value);
        assert_eq!(ErrorCode::UNDEFINED_VARIABLE.category(), ErrorCategory::Name);
        assert_eq!(ErrorCode::MODULE_NOT_FOUND.category(), ErrorCategory::Module);
        assert_eq!(ErrorCode::LOOP_LIMIT_EXCEEDED.category(), ErrorCategory::Control);
        assert_eq!(ErrorCode::USER_ERROR.category(), ErrorCategory::User);
    }

    #[test]
    fn test_error_display() {
        let err = CompileError::new(
            "main.scss",
            ErrorCode::UNDEFINED_VARIABLE,
            "Undefined variable: $x",
            Span::new(3, 10, 3, 12),
            "  width: $x;",
        );
        assert_eq!(
            err.to_string(),
            "main.scss:3:10: E300 [name] Undefined variable: $x"
        );
    }

    #[test]
    fn test_error_json_uses_line_and_column() {
        let err = CompileError::new(
            "main.scss",
            ErrorCode::DIVISION_BY_ZERO,
            "Division by zero",
            Span::new(1, 2, 1, 9),
            "a: 1/0",
        );
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("\"line\":1"));
        assert!(json.contains("\"column\":2"));
        assert!(json.contains("\"end_column\":9"));
        assert!(json.contains("\"category\":\"value\""));
        let back: CompileError = serde_json::from_str(&json).unwrap();
        assert_eq!(back.code, ErrorCode::DIVISION_BY_ZERO);
    }

    #[test]
    fn test_compile_errors_max_limit() {
        let mut errs = CompileErrors::empty();
        for i in 0..25 {
            errs.push_error(CompileError::new(
                "a.scss",
                ErrorCode::UNEXPECTED_TOKEN,
                format!("error {i}"),
                Span::point(i + 1, 1),
                "",
            ));
        }
        assert_eq!(errs.errors.len(), MAX_ERRORS);
        assert_eq!(errs.total_errors, 25);
        assert_eq!(errs.first().map(|e| e.message.as_str()), Some("error 0"));
        assert!(errs.into_result().is_err());
    }
}
