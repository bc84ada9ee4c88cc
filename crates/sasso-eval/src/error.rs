//! Evaluation error types for the Sasso engine.

use sasso_types::{CompileError, ErrorCode, Span};
use thiserror::Error;

/// Evaluation error: undefined names, bad operations, user `@error`s,
/// resource limits and module failures.
#[derive(Debug, Clone, Error)]
pub enum EvalError {
    #[error("Undefined variable: ${0}")]
    UndefinedVariable(String),

    #[error("Undefined mixin: {0}")]
    UndefinedMixin(String),

    #[error("Undefined function: {0}")]
    UndefinedFunction(String),

    /// A namespace exists but has no member with this name.
    #[error("Property not found: {namespace}.{name}")]
    PropertyNotFound { namespace: String, name: String },

    /// `a.b.c`, `.b`, `a.` or an unknown namespace.
    #[error("Invalid module reference: {0}")]
    InvalidModuleReference(String),

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Incompatible units: {left} and {right}")]
    IncompatibleUnits { left: String, right: String },

    #[error("Undefined operation: {0}")]
    UndefinedOperation(String),

    #[error("{0}")]
    TypeMismatch(String),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    WrongArgCount(String),

    /// Raised by `@error`.
    #[error("{0}")]
    User(String),

    #[error("@while loop exceeded {0} iterations")]
    LoopLimit(usize),

    #[error("Maximum call depth of {0} exceeded")]
    CallDepth(usize),

    /// A statement that is not allowed where it appears.
    #[error("{0}")]
    InvalidContext(String),

    #[error("{0}")]
    InvalidSelector(String),

    #[error("@each accepts at most two variables, got {0}")]
    TooManyLoopVariables(usize),

    #[error("Can't find stylesheet to import: {0}")]
    ModuleNotFound(String),

    #[error("{0}")]
    InvalidConfiguration(String),

    /// A syntax error in a loaded or re-parsed source.
    #[error("{}", .0.message)]
    Parse(Box<CompileError>),

    /// An error with the location of the innermost statement that raised it.
    #[error("{error}")]
    Located {
        error: Box<EvalError>,
        file: String,
        span: Span,
    },
}

/// Result alias for evaluator operations.
pub type EvalResult<T> = Result<T, EvalError>;

impl EvalError {
    /// The user-facing error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::UndefinedVariable(_) => ErrorCode::UNDEFINED_VARIABLE,
            Self::UndefinedMixin(_) => ErrorCode::UNDEFINED_MIXIN,
            Self::UndefinedFunction(_) => ErrorCode::UNDEFINED_FUNCTION,
            Self::PropertyNotFound { .. } => ErrorCode::PROPERTY_NOT_FOUND,
            Self::InvalidModuleReference(_) => ErrorCode::INVALID_MODULE_REFERENCE,
            Self::DivisionByZero => ErrorCode::DIVISION_BY_ZERO,
            Self::IncompatibleUnits { .. } => ErrorCode::INCOMPATIBLE_UNITS,
            Self::UndefinedOperation(_) => ErrorCode::UNDEFINED_OPERATION,
            Self::TypeMismatch(_) => ErrorCode::TYPE_MISMATCH,
            Self::InvalidArgument(_) => ErrorCode::INVALID_ARGUMENT,
            Self::WrongArgCount(_) => ErrorCode::WRONG_ARG_COUNT,
            Self::User(_) => ErrorCode::USER_ERROR,
            Self::LoopLimit(_) => ErrorCode::LOOP_LIMIT_EXCEEDED,
            Self::CallDepth(_) => ErrorCode::CALL_DEPTH_EXCEEDED,
            Self::InvalidContext(_) => ErrorCode::INVALID_CONTEXT,
            Self::InvalidSelector(_) => ErrorCode::INVALID_SELECTOR,
            Self::TooManyLoopVariables(_) => ErrorCode::TOO_MANY_LOOP_VARIABLES,
            Self::ModuleNotFound(_) => ErrorCode::MODULE_NOT_FOUND,
            Self::InvalidConfiguration(_) => ErrorCode::INVALID_CONFIGURATION,
            Self::Parse(err) => err.code,
            Self::Located { error, .. } => error.code(),
        }
    }

    /// Attach a location unless a more specific one is already attached.
    pub fn at(self, file: &str, span: Span) -> Self {
        match self {
            Self::Located { .. } | Self::Parse(_) => self,
            other => Self::Located {
                error: Box::new(other),
                file: file.to_string(),
                span,
            },
        }
    }

    /// The error without its location wrapper.
    pub fn inner(&self) -> &EvalError {
        match self {
            Self::Located { error, .. } => error.inner(),
            other => other,
        }
    }

    /// Convert into the user-facing [`CompileError`]. `source_line` looks up
    /// the text of a line in a file.
    pub fn into_compile_error(
        self,
        default_file: &str,
        source_line: impl Fn(&str, u32) -> Option<String>,
    ) -> CompileError {
        let code = self.code();
        match self {
            Self::Parse(err) => *err,
            Self::Located { error, file, span } => {
                let line = source_line(&file, span.start_line).unwrap_or_default();
                CompileError::new(file, code, error.to_string(), span, line)
            }
            other => CompileError::unlocated(default_file, code, other.to_string()),
        }
    }
}

impl From<CompileError> for EvalError {
    fn from(err: CompileError) -> Self {
        Self::Parse(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_innermost_location_wins() {
        let err = EvalError::DivisionByZero
            .at("inner.scss", Span::point(3, 4))
            .at("outer.scss", Span::point(9, 1));
        let EvalError::Located { file, span, .. } = &err else {
            panic!("expected located error");
        };
        assert_eq!(file, "inner.scss");
        assert_eq!(span.start_line, 3);
        assert_eq!(err.code(), ErrorCode::DIVISION_BY_ZERO);
    }

    #[test]
    fn test_into_compile_error_fills_source_line() {
        let err = EvalError::UndefinedVariable("x".into()).at("a.scss", Span::point(2, 3));
        let compiled = err.into_compile_error("a.scss", |_, line| {
            (line == 2).then(|| "  width: $x;".to_string())
        });
        assert_eq!(compiled.code, ErrorCode::UNDEFINED_VARIABLE);
        assert_eq!(compiled.message, "Undefined variable: $x");
        assert_eq!(compiled.source_line, "  width: $x;");
    }
}
