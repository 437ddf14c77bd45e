//! Core parser infrastructure: token cursor, error reporting, metadata
//! collection.

use std::collections::HashSet;

use miniforge_lexer::token::{Token, TokenKind};
use miniforge_types::ast::{Chunk, Comment, Literal, Reference, Scope};
use miniforge_types::{CompileErrors, ErrorCode, SourceFile, Span, SyntaxError};

/// Maximum expression nesting depth before the parser gives up.
pub(crate) const MAX_EXPR_DEPTH: u32 = 100;

/// The parser.
///
/// Consumes a token stream produced by the lexer and builds a [`Chunk`].
/// Collects errors and resumes at the next statement boundary.
pub struct Parser<'src> {
    /// The token stream.
    tokens: Vec<Token>,
    /// Current index into `tokens`.
    pos: usize,
    /// Source file for error context.
    source_file: &'src SourceFile,
    /// Collected errors.
    errors: CompileErrors,
    /// Current expression nesting depth.
    pub(crate) expr_depth: u32,
    /// Metadata collected while parsing.
    pub(crate) meta: Metadata,
}

/// Tree metadata gathered during the parse.
#[derive(Default)]
pub(crate) struct Metadata {
    pub(crate) imports: Vec<Reference>,
    pub(crate) includes: Vec<Reference>,
    pub(crate) injects: Vec<Reference>,
    pub(crate) native_imports: Vec<Reference>,
    pub(crate) literals: Vec<Literal>,
    scopes: Vec<Scope>,
    seen: Vec<HashSet<String>>,
    /// Indices into `scopes` of the scopes currently open.
    open: Vec<usize>,
}

impl Metadata {
    pub(crate) fn enter_scope(&mut self, span: Span) {
        self.open.push(self.scopes.len());
        self.scopes.push(Scope {
            identifiers: Vec::new(),
            span,
        });
        self.seen.push(HashSet::new());
    }

    pub(crate) fn exit_scope(&mut self, end: Span) {
        if let Some(idx) = self.open.pop() {
            if let Some(scope) = self.scopes.get_mut(idx) {
                scope.span = scope.span.merge(end);
            }
        }
    }

    /// Record an identifier in the innermost open scope.
    pub(crate) fn identifier(&mut self, name: &str) {
        let Some(&idx) = self.open.last() else {
            return;
        };
        if let (Some(scope), Some(seen)) = (self.scopes.get_mut(idx), self.seen.get_mut(idx)) {
            if seen.insert(name.to_string()) {
                scope.identifiers.push(name.to_string());
            }
        }
    }
}

/// Result of parsing.
pub struct ParseResult {
    pub chunk: Chunk,
    pub errors: CompileErrors,
}

impl<'src> Parser<'src> {
    /// Create a new parser from a token stream and source file.
    pub fn new(tokens: Vec<Token>, source_file: &'src SourceFile) -> Self {
        Self {
            tokens,
            pos: 0,
            source_file,
            errors: CompileErrors::empty(),
            expr_depth: 0,
            meta: Metadata::default(),
        }
    }

    // ── Token Cursor ──────────────────────────────────────────────────────────

    /// Returns the current token without advancing.
    pub(crate) fn peek(&self) -> &Token {
        const EOF: &Token = &Token {
            kind: TokenKind::Eof,
            span: Span {
                start_line: 0,
                start_col: 0,
                end_line: 0,
                end_col: 0,
                start_offset: 0,
                end_offset: 0,
            },
        };
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .unwrap_or(EOF)
    }

    /// Returns the kind of the current token.
    pub(crate) fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    /// Look ahead by `n` tokens from current position.
    pub(crate) fn look_ahead(&self, n: usize) -> &TokenKind {
        self.tokens
            .get(self.pos + n)
            .map(|t| &t.kind)
            .unwrap_or(&TokenKind::Eof)
    }

    /// Advance the cursor by one and return the consumed token.
    pub(crate) fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    /// Returns the previously consumed token's span.
    pub(crate) fn previous_span(&self) -> Span {
        self.pos
            .checked_sub(1)
            .and_then(|idx| self.tokens.get(idx))
            .map(|t| t.span)
            .unwrap_or_else(|| Span::point(1, 1))
    }

    /// Returns the previously consumed token's kind.
    pub(crate) fn previous_kind(&self) -> Option<&TokenKind> {
        self.pos
            .checked_sub(1)
            .and_then(|idx| self.tokens.get(idx))
            .map(|t| &t.kind)
    }

    /// Returns the span of the current token.
    pub(crate) fn current_span(&self) -> Span {
        self.peek().span
    }

    /// Returns `true` if the current token is `Eof`.
    pub(crate) fn at_end(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }

    /// Check if the current token matches the given kind exactly.
    pub(crate) fn check(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == kind
    }

    /// If the current token matches, advance and return `true`.
    pub(crate) fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Expect a specific token kind. Returns the token if matched, or emits an error.
    pub(crate) fn expect(&mut self, expected: &TokenKind) -> Option<Token> {
        if self.check(expected) {
            Some(self.advance())
        } else {
            self.error_at_current(
                ErrorCode::UNEXPECTED_TOKEN,
                format!("expected '{}', got '{}'", expected, self.peek_kind()),
            );
            None
        }
    }

    /// Expect an identifier token.
    pub(crate) fn expect_identifier(&mut self) -> Option<miniforge_types::ast::Ident> {
        match self.peek_kind().clone() {
            TokenKind::Identifier(name) => {
                let span = self.advance().span;
                Some(miniforge_types::ast::Ident::new(name, span))
            }
            _ => {
                self.error_at_current(
                    ErrorCode::UNEXPECTED_TOKEN,
                    format!("expected identifier, got '{}'", self.peek_kind()),
                );
                None
            }
        }
    }

    /// Expect a string literal token. Returns the string value.
    pub(crate) fn expect_string_literal(&mut self) -> Option<String> {
        match self.peek_kind().clone() {
            TokenKind::String { value, .. } => {
                self.advance();
                Some(value)
            }
            _ => {
                self.error_at_current(
                    ErrorCode::MALFORMED_DIRECTIVE,
                    format!("expected string literal, got '{}'", self.peek_kind()),
                );
                None
            }
        }
    }

    // ── Layout ────────────────────────────────────────────────────────────────

    /// Skip newlines where a line break is insignificant (inside brackets,
    /// after an operator or comma) and return the comments in between.
    pub(crate) fn take_continuation(&mut self) -> Vec<Comment> {
        let mut comments = Vec::new();
        loop {
            match self.peek_kind() {
                TokenKind::Newline => {}
                TokenKind::Comment(text) => comments.push(Comment {
                    text: text.clone(),
                    span: self.current_span(),
                }),
                _ => return comments,
            }
            self.advance();
        }
    }

    /// Skip blank statement separators (newlines and `;`).
    pub(crate) fn skip_separators(&mut self) {
        while matches!(self.peek_kind(), TokenKind::Newline | TokenKind::Semicolon) {
            self.advance();
        }
    }

    /// Require the end of a statement. Comments are left in place so the
    /// block loop can record them.
    pub(crate) fn expect_terminator(&mut self) -> bool {
        if self.peek_kind().is_terminator()
            || matches!(self.peek_kind(), TokenKind::End | TokenKind::Else)
            || matches!(self.previous_kind(), Some(TokenKind::Semicolon))
        {
            true
        } else {
            self.error_at_current(
                ErrorCode::UNEXPECTED_TOKEN,
                format!("expected end of statement, got '{}'", self.peek_kind()),
            );
            false
        }
    }

    // ── Error Reporting ───────────────────────────────────────────────────────

    /// Report an error at the current token position.
    pub(crate) fn error_at_current(&mut self, code: ErrorCode, message: impl Into<String>) {
        let span = self.current_span();
        self.error_at(code, message, span);
    }

    /// Report an error at a specific span.
    pub(crate) fn error_at(&mut self, code: ErrorCode, message: impl Into<String>, span: Span) {
        let source_line = self
            .source_file
            .line(span.start_line)
            .unwrap_or("")
            .to_string();
        let error = SyntaxError::new(&self.source_file.name, code, message, span, source_line);
        self.errors.push_error(error);
    }

    /// Returns `true` if we've hit the error limit and should stop.
    pub(crate) fn too_many_errors(&self) -> bool {
        self.errors.total_errors >= miniforge_types::MAX_ERRORS
    }

    /// Skip tokens until the next statement boundary.
    pub(crate) fn synchronize(&mut self) {
        while !self.at_end() {
            match self.peek_kind() {
                TokenKind::Newline | TokenKind::Semicolon => {
                    self.advance();
                    return;
                }
                TokenKind::Comment(_) => return,
                _ => {
                    self.advance();
                }
            }
        }
    }

    // ── Public API ────────────────────────────────────────────────────────────

    /// Parse the token stream into a [`Chunk`].
    pub fn parse(mut self) -> ParseResult {
        let start = self.current_span();
        self.meta.enter_scope(start);
        let body = self.parse_top_level();
        let end = self.current_span();
        self.meta.exit_scope(end);

        let meta = std::mem::take(&mut self.meta);
        let chunk = Chunk {
            body,
            imports: meta.imports,
            includes: meta.includes,
            injects: meta.injects,
            native_imports: meta.native_imports,
            literals: meta.literals,
            scopes: meta.scopes,
            span: start.merge(end),
        };
        ParseResult {
            chunk,
            errors: self.errors,
        }
    }
}
