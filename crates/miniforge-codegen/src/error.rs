//! Codegen error types.

use miniforge_types::Span;
use thiserror::Error;

/// Errors that can occur while generating output text.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodegenError {
    /// A tree construct has no emission in the active strategy.
    #[error("unsupported construct: {0}")]
    UnsupportedConstruct(String),

    /// An operator has no equivalent in the output language.
    #[error("unsupported operator '{operator}' at {span}")]
    UnsupportedOperator { operator: String, span: Span },

    /// An internal consistency check failed.
    #[error("internal codegen error: {0}")]
    Internal(String),
}

/// Codegen result type alias.
pub type CodegenResult<T> = Result<T, CodegenError>;
