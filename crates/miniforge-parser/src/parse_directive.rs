//! Build directives: `#import`, `#include`, `#debugger` as statements and
//! `#envar`, `#inject`, `#line`, `#filename` as expressions.

use miniforge_lexer::token::TokenKind;
use miniforge_types::ast::*;
use miniforge_types::ErrorCode;

use crate::parser::Parser;

/// Directives that produce a value and may appear inside expressions.
const EXPRESSION_DIRECTIVES: &[&str] = &["envar", "inject", "line", "filename"];

impl<'src> Parser<'src> {
    /// `true` when the current `#` introduces an expression directive.
    pub(crate) fn at_expression_directive(&self) -> bool {
        matches!(
            self.look_ahead(1),
            TokenKind::Identifier(name) if EXPRESSION_DIRECTIVES.contains(&name.as_str())
        )
    }

    /// Consume `#` and the directive name.
    fn directive_name(&mut self) -> Option<(String, miniforge_types::Span)> {
        let start = self.advance().span;
        match self.peek_kind().clone() {
            TokenKind::Identifier(name) => {
                self.advance();
                Some((name, start))
            }
            other => {
                self.error_at_current(
                    ErrorCode::MALFORMED_DIRECTIVE,
                    format!("expected directive name after '#', got '{other}'"),
                );
                None
            }
        }
    }

    /// `"#import" Identifier "from" String [";"]`, `"#include" String [";"]`,
    /// `"#debugger" [";"]`
    pub(crate) fn parse_directive_statement(&mut self) -> Option<Stmt> {
        let (name, start) = self.directive_name()?;
        match name.as_str() {
            "import" => {
                let ident = self.expect_identifier()?;
                match self.peek_kind() {
                    TokenKind::Identifier(word) if word == "from" => {
                        self.advance();
                    }
                    other => {
                        let message = format!("expected 'from' in '#import', got '{other}'");
                        self.error_at_current(ErrorCode::MALFORMED_DIRECTIVE, message);
                        return None;
                    }
                }
                let path = self.expect_string_literal()?;
                self.eat(&TokenKind::Semicolon);
                let span = start.merge(self.previous_span());
                self.meta.identifier(&ident.name);
                self.meta.imports.push(Reference {
                    path: path.clone(),
                    span,
                });
                Some(Stmt::Import(ImportDirective {
                    name: ident,
                    path,
                    span,
                }))
            }
            "include" => {
                let path = self.expect_string_literal()?;
                self.eat(&TokenKind::Semicolon);
                let span = start.merge(self.previous_span());
                self.meta.includes.push(Reference {
                    path: path.clone(),
                    span,
                });
                Some(Stmt::Include(IncludeDirective { path, span }))
            }
            "debugger" => {
                self.eat(&TokenKind::Semicolon);
                Some(Stmt::Debugger(start.merge(self.previous_span())))
            }
            other => {
                let span = start.merge(self.previous_span());
                self.error_at(
                    ErrorCode::UNKNOWN_DIRECTIVE,
                    format!("unknown directive '#{other}'"),
                    span,
                );
                None
            }
        }
    }

    /// `"#envar" Identifier [";"]`, `"#inject" String [";"]`, `"#line" [";"]`,
    /// `"#filename" [";"]`
    pub(crate) fn parse_directive_expression(&mut self) -> Option<Expr> {
        let (name, start) = self.directive_name()?;
        let kind = match name.as_str() {
            "envar" => ExprKind::Envar(self.expect_identifier()?.name),
            "inject" => {
                let path = self.expect_string_literal()?;
                let span = start.merge(self.previous_span());
                self.meta.injects.push(Reference {
                    path: path.clone(),
                    span,
                });
                ExprKind::Inject(path)
            }
            "line" => ExprKind::Line,
            "filename" => ExprKind::Filename,
            "import" | "include" | "debugger" => {
                self.error_at(
                    ErrorCode::MALFORMED_DIRECTIVE,
                    format!("'#{name}' cannot be used as a value"),
                    start.merge(self.previous_span()),
                );
                return None;
            }
            other => {
                self.error_at(
                    ErrorCode::UNKNOWN_DIRECTIVE,
                    format!("unknown directive '#{other}'"),
                    start.merge(self.previous_span()),
                );
                return None;
            }
        };
        self.eat(&TokenKind::Semicolon);
        Some(Expr::new(kind, start.merge(self.previous_span())))
    }
}
