//! Build errors: every failure carries the path it belongs to.

use miniforge_codegen::CodegenError;
use miniforge_types::{CompileErrors, Span};
use thiserror::Error;

/// What went wrong.
#[derive(Debug, Clone, Error)]
pub enum BuildErrorKind {
    /// A referenced file does not exist.
    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    /// `from` references `to`, which is still being resolved.
    #[error("circular dependency: {from} -> {to}")]
    CircularDependency { from: String, to: String },

    #[error("{0}")]
    Syntax(CompileErrors),

    /// The resource handler failed to read an existing file.
    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error(transparent)]
    Codegen(#[from] CodegenError),
}

/// A failure attributed to a file and, where known, a source range.
#[derive(Debug, Clone, Error)]
#[error("{target}{}: {kind}", position(.range))]
pub struct BuildError {
    pub target: String,
    pub range: Option<Span>,
    #[source]
    pub kind: BuildErrorKind,
}

impl BuildError {
    pub fn new(target: impl Into<String>, kind: BuildErrorKind) -> Self {
        Self {
            target: target.into(),
            range: None,
            kind,
        }
    }

    pub fn with_range(mut self, range: Span) -> Self {
        self.range = Some(range);
        self
    }

    pub fn not_found(target: impl Into<String>, missing: impl Into<String>) -> Self {
        Self::new(target, BuildErrorKind::ResourceNotFound(missing.into()))
    }

    /// Wrap parse diagnostics; the range is the first error's span.
    pub fn syntax(target: impl Into<String>, errors: CompileErrors) -> Self {
        let range = errors.first().map(|error| error.span);
        Self {
            target: target.into(),
            range,
            kind: BuildErrorKind::Syntax(errors),
        }
    }

    /// Wrap a generator failure, keeping the operator span if it has one.
    pub fn codegen(target: impl Into<String>, error: CodegenError) -> Self {
        let range = match &error {
            CodegenError::UnsupportedOperator { span, .. } => Some(*span),
            _ => None,
        };
        Self {
            target: target.into(),
            range,
            kind: BuildErrorKind::Codegen(error),
        }
    }
}

fn position(range: &Option<Span>) -> String {
    range.map(|span| format!(":{span}")).unwrap_or_default()
}

/// Result type of the compiler crate.
pub type BuildResult<T> = Result<T, BuildError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_and_without_range() {
        let err = BuildError::not_found("main.src", "lib.src");
        assert_eq!(err.to_string(), "main.src: resource not found: lib.src");

        let err = err.with_range(Span::new(3, 1, 3, 20));
        assert_eq!(err.to_string(), "main.src:3:1: resource not found: lib.src");
    }

    #[test]
    fn test_codegen_error_keeps_span() {
        let err = BuildError::codegen(
            "main.src",
            CodegenError::UnsupportedOperator {
                operator: "<<".into(),
                span: Span::new(2, 5, 2, 11),
            },
        );
        assert_eq!(err.range, Some(Span::new(2, 5, 2, 11)));
        assert!(matches!(err.kind, BuildErrorKind::Codegen(_)));
    }
}
