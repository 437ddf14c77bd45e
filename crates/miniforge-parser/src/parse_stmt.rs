//! Statement parsing: blocks, control flow, assignments and calls.

use miniforge_lexer::token::TokenKind;
use miniforge_types::ast::*;
use miniforge_types::{ErrorCode, Span};

use crate::parse_expr::{attach_leading, split_trailing};
use crate::parser::Parser;

impl<'src> Parser<'src> {
    // ══════════════════════════════════════════════════════════════════════════
    // Blocks
    // ══════════════════════════════════════════════════════════════════════════

    /// Parse statements until end of input.
    pub(crate) fn parse_top_level(&mut self) -> Vec<Stmt> {
        let mut stmts = Vec::new();
        loop {
            self.skip_separators();
            if self.at_end() || self.too_many_errors() {
                break;
            }
            if matches!(self.peek_kind(), TokenKind::End | TokenKind::Else) {
                self.error_at_current(
                    ErrorCode::UNEXPECTED_TOKEN,
                    format!("unexpected '{}' outside of a block", self.peek_kind()),
                );
                self.advance();
                self.synchronize();
                continue;
            }
            if let Some(stmt) = self.parse_statement_line() {
                stmts.push(stmt);
            }
        }
        stmts
    }

    /// Parse statements until the current token is one of `closers`.
    ///
    /// The block span runs from the header to the closing keyword.
    pub(crate) fn parse_block(&mut self, closers: &[TokenKind]) -> Block {
        let start = self.previous_span();
        let mut stmts = Vec::new();
        loop {
            self.skip_separators();
            if self.at_end() || self.too_many_errors() || closers.contains(self.peek_kind()) {
                break;
            }
            if let Some(stmt) = self.parse_statement_line() {
                stmts.push(stmt);
            }
        }
        let end = self.current_span();
        Block {
            stmts,
            span: start.merge(end),
        }
    }

    /// Parse one statement plus its terminator, or a standalone comment.
    fn parse_statement_line(&mut self) -> Option<Stmt> {
        if let TokenKind::Comment(text) = self.peek_kind().clone() {
            let span = self.advance().span;
            return Some(Stmt::Comment(Comment { text, span }));
        }
        match self.parse_statement() {
            Some(stmt) if self.expect_terminator() => Some(stmt),
            _ => {
                self.synchronize();
                None
            }
        }
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Statements
    // ══════════════════════════════════════════════════════════════════════════

    /// Parse a single statement without its terminator.
    pub(crate) fn parse_statement(&mut self) -> Option<Stmt> {
        match self.peek_kind() {
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::Return => self.parse_return(),
            TokenKind::Break => Some(Stmt::Break(self.advance().span)),
            TokenKind::Continue => Some(Stmt::Continue(self.advance().span)),
            TokenKind::Hash if !self.at_expression_directive() => {
                self.parse_directive_statement()
            }
            _ => self.parse_expression_statement(),
        }
    }

    /// `true` when the current token ends a statement.
    pub(crate) fn at_statement_end(&self) -> bool {
        self.peek_kind().is_terminator()
            || matches!(self.peek_kind(), TokenKind::End | TokenKind::Else)
    }

    /// `"return" [ Expr ]`
    fn parse_return(&mut self) -> Option<Stmt> {
        let start = self.advance().span;
        if self.at_statement_end() {
            return Some(Stmt::Return(ReturnStmt {
                value: None,
                span: start,
            }));
        }
        let value = self.parse_expression()?;
        let span = start.merge(value.span);
        Some(Stmt::Return(ReturnStmt {
            value: Some(value),
            span,
        }))
    }

    /// Consume `end <keyword>` closing a block opened at `opener`.
    pub(crate) fn expect_block_end(&mut self, keyword: &TokenKind, opener: Span) -> Option<Span> {
        if !self.check(&TokenKind::End) {
            self.error_at_current(
                ErrorCode::UNCLOSED_BLOCK,
                format!(
                    "expected 'end {}' to close the block opened at line {}, got '{}'",
                    keyword,
                    opener.start_line,
                    self.peek_kind()
                ),
            );
            return None;
        }
        self.advance();
        let token = self.expect(keyword)?;
        Some(token.span)
    }

    // ── If ────────────────────────────────────────────────────────────────────

    /// `"if" Expr "then" ( Block { "else" "if" … } [ "else" Block ] "end" "if" | InlineBody )`
    fn parse_if(&mut self) -> Option<Stmt> {
        let start = self.advance().span;
        let condition = self.parse_expression()?;
        self.expect(&TokenKind::Then)?;

        if matches!(
            self.peek_kind(),
            TokenKind::Newline | TokenKind::Comment(_) | TokenKind::Eof
        ) {
            self.parse_if_block(start, condition)
        } else {
            self.parse_if_inline(start, condition)
        }
    }

    fn parse_if_block(&mut self, start: Span, condition: Expr) -> Option<Stmt> {
        let mut clauses = Vec::new();
        let mut clause_start = start;
        let mut condition = condition;
        let mut else_block = None;

        loop {
            let body = self.parse_block(&[TokenKind::Else, TokenKind::End]);
            clauses.push(IfClause {
                condition,
                span: clause_start.merge(body.span),
                body,
            });
            if !self.check(&TokenKind::Else) {
                break;
            }
            let else_span = self.advance().span;
            if self.eat(&TokenKind::If) {
                condition = self.parse_expression()?;
                self.expect(&TokenKind::Then)?;
                clause_start = else_span;
                continue;
            }
            else_block = Some(self.parse_block(&[TokenKind::End]));
            break;
        }

        let end = self.expect_block_end(&TokenKind::If, start)?;
        Some(Stmt::If(IfStmt {
            clauses,
            else_block,
            inline: false,
            span: start.merge(end),
        }))
    }

    fn parse_if_inline(&mut self, start: Span, condition: Expr) -> Option<Stmt> {
        let body = self.parse_inline_body()?;
        let mut clauses = vec![IfClause {
            condition,
            span: start.merge(body.span),
            body,
        }];
        let mut else_block = None;

        if self.eat(&TokenKind::Else) {
            let chained = self.check(&TokenKind::If);
            let body = self.parse_inline_body()?;
            let flatten = chained
                && matches!(body.stmts.as_slice(), [Stmt::If(nested)] if nested.inline);
            if flatten {
                // `else if …` continues the same statement
                if let Some(Stmt::If(nested)) = body.stmts.into_iter().next() {
                    clauses.extend(nested.clauses);
                    else_block = nested.else_block;
                }
            } else {
                else_block = Some(body);
            }
        }

        let end = match &else_block {
            Some(block) => block.span,
            None => clauses.last().map(|c| c.span).unwrap_or(start),
        };
        Some(Stmt::If(IfStmt {
            clauses,
            else_block,
            inline: true,
            span: start.merge(end),
        }))
    }

    /// A single statement used as the body of an inline `if`.
    fn parse_inline_body(&mut self) -> Option<Block> {
        let stmt = self.parse_statement()?;
        let span = stmt.span();
        Some(Block {
            stmts: vec![stmt],
            span,
        })
    }

    // ── Loops ─────────────────────────────────────────────────────────────────

    /// `"while" Expr Block "end" "while"`
    fn parse_while(&mut self) -> Option<Stmt> {
        let start = self.advance().span;
        let condition = self.parse_expression()?;
        let body = self.parse_block(&[TokenKind::End]);
        let end = self.expect_block_end(&TokenKind::While, start)?;
        Some(Stmt::While(WhileStmt {
            condition,
            body,
            span: start.merge(end),
        }))
    }

    /// `"for" Identifier "in" Expr Block "end" "for"`
    fn parse_for(&mut self) -> Option<Stmt> {
        let start = self.advance().span;
        let variable = self.expect_identifier()?;
        self.meta.identifier(&variable.name);
        self.expect(&TokenKind::In)?;
        let iterable = self.parse_expression()?;
        let body = self.parse_block(&[TokenKind::End]);
        let end = self.expect_block_end(&TokenKind::For, start)?;
        Some(Stmt::For(ForStmt {
            variable,
            iterable,
            body,
            span: start.merge(end),
        }))
    }

    // ── Assignment & Calls ────────────────────────────────────────────────────

    /// Assignment, call (with or without parentheses) or bare expression.
    fn parse_expression_statement(&mut self) -> Option<Stmt> {
        let expr = self.parse_expression()?;

        if let Some(op) = self.match_assign_op() {
            if !matches!(
                expr.kind,
                ExprKind::Identifier(_) | ExprKind::Member { .. } | ExprKind::Index { .. }
            ) {
                self.error_at(
                    ErrorCode::INVALID_ASSIGNMENT_TARGET,
                    "invalid assignment target",
                    expr.span,
                );
                return None;
            }
            self.advance();
            let value = self.parse_expression()?;
            let span = expr.span.merge(value.span);
            return Some(Stmt::Assign(AssignStmt {
                target: expr,
                op,
                value,
                span,
            }));
        }

        if matches!(expr.kind, ExprKind::Call { .. }) {
            let span = expr.span;
            return Some(Stmt::Call(CallStmt { call: expr, span }));
        }

        if self.starts_command_argument()
            && matches!(
                expr.kind,
                ExprKind::Identifier(_) | ExprKind::Member { .. } | ExprKind::Index { .. }
            )
        {
            return self.parse_command_call(expr);
        }

        let span = expr.span;
        Some(Stmt::Expr(ExprStmt { expr, span }))
    }

    /// `callee arg, arg, …` (call without parentheses)
    fn parse_command_call(&mut self, callee: Expr) -> Option<Stmt> {
        let mut args = vec![self.parse_expression()?];
        while self.eat(&TokenKind::Comma) {
            let mut comments = self.take_continuation();
            if let Some(prev) = args.last_mut() {
                comments = split_trailing(prev, comments);
            }
            let mut arg = self.parse_expression()?;
            attach_leading(&mut arg, comments);
            args.push(arg);
        }
        let end = args.last().map(|a| a.span).unwrap_or(callee.span);
        let span = callee.span.merge(end);
        let call = self.finish_call(callee, args, span);
        Some(Stmt::Call(CallStmt { call, span }))
    }

    /// Returns `Some(op)` for `=` (as `None`) and the compound operators.
    fn match_assign_op(&self) -> Option<Option<AssignOp>> {
        match self.peek_kind() {
            TokenKind::Eq => Some(None),
            TokenKind::PlusEq => Some(Some(AssignOp::Add)),
            TokenKind::MinusEq => Some(Some(AssignOp::Sub)),
            TokenKind::StarEq => Some(Some(AssignOp::Mul)),
            TokenKind::SlashEq => Some(Some(AssignOp::Div)),
            TokenKind::PercentEq => Some(Some(AssignOp::Mod)),
            TokenKind::CaretEq => Some(Some(AssignOp::Pow)),
            _ => None,
        }
    }

    /// Tokens that begin the first argument of a parenthesis-free call.
    fn starts_command_argument(&self) -> bool {
        matches!(
            self.peek_kind(),
            TokenKind::Number { .. }
                | TokenKind::String { .. }
                | TokenKind::True
                | TokenKind::False
                | TokenKind::Null
                | TokenKind::Identifier(_)
                | TokenKind::LBrace
                | TokenKind::Not
                | TokenKind::New
                | TokenKind::At
                | TokenKind::Function
                | TokenKind::Hash
        )
    }
}
