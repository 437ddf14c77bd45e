//! Shared types for the miniforge compiler.
//!
//! This crate defines the syntax tree, source spans, diagnostics and
//! the per-file tree metadata consumed by every later compiler stage.

mod error;
mod span;
pub mod ast;

pub use error::{CompileErrors, ErrorCategory, ErrorCode, Severity, SyntaxError, MAX_ERRORS};
pub use span::{SourceFile, Span};

/// Result type used by the front end (lexer and parser).
pub type Result<T> = std::result::Result<T, SyntaxError>;
