//! Expression parsing with full operator precedence.
//!
//! Precedence (lowest → highest):
//! 1. `function … end function`
//! 2. `or`
//! 3. `and`
//! 4. `not`
//! 5. `==`, `!=`, `<`, `>`, `<=`, `>=`, `isa` (left-associative chains)
//! 6. `|`
//! 7. `&`
//! 8. `<<`, `>>`, `>>>`
//! 9. `+`, `-`
//! 10. `*`, `/`, `%`
//! 11. unary `-`, `new`
//! 12. `^` (right-associative)
//! 13. `@`
//! 14. `.`, `[]`, `()`
//!
//! A line break is insignificant after a binary operator or a comma and
//! anywhere inside brackets. Comments found there are attached to the
//! nearest operand or item: a comment sharing the line of the item before
//! it trails that item, any other comment leads the item after it.

use miniforge_lexer::token::TokenKind;
use miniforge_types::ast::*;
use miniforge_types::ErrorCode;

use crate::parser::{Parser, MAX_EXPR_DEPTH};

impl<'src> Parser<'src> {
    // ══════════════════════════════════════════════════════════════════════════
    // Entry Point
    // ══════════════════════════════════════════════════════════════════════════

    /// Parse an expression.
    pub(crate) fn parse_expression(&mut self) -> Option<Expr> {
        self.nested(Self::parse_or)
    }

    /// Run `parse` one nesting level deeper, failing past [`MAX_EXPR_DEPTH`].
    fn nested(&mut self, parse: fn(&mut Self) -> Option<Expr>) -> Option<Expr> {
        self.expr_depth += 1;
        if self.expr_depth > MAX_EXPR_DEPTH {
            self.error_at_current(
                ErrorCode::NESTING_LIMIT_EXCEEDED,
                format!("maximum expression nesting depth is {MAX_EXPR_DEPTH}"),
            );
            self.expr_depth -= 1;
            return None;
        }
        let result = parse(self);
        self.expr_depth -= 1;
        result
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Precedence Chain
    // ══════════════════════════════════════════════════════════════════════════

    /// `OrExpr = AndExpr { "or" AndExpr }`
    fn parse_or(&mut self) -> Option<Expr> {
        let mut left = self.parse_and()?;
        while self.eat(&TokenKind::Or) {
            let comments = self.take_continuation();
            let mut right = self.parse_and()?;
            attach_leading(&mut right, comments);
            left = logical(left, LogicalOp::Or, right);
        }
        Some(left)
    }

    /// `AndExpr = NotExpr { "and" NotExpr }`
    fn parse_and(&mut self) -> Option<Expr> {
        let mut left = self.parse_not()?;
        while self.eat(&TokenKind::And) {
            let comments = self.take_continuation();
            let mut right = self.parse_not()?;
            attach_leading(&mut right, comments);
            left = logical(left, LogicalOp::And, right);
        }
        Some(left)
    }

    /// `NotExpr = "not" NotExpr | CompExpr`
    fn parse_not(&mut self) -> Option<Expr> {
        if self.check(&TokenKind::Not) {
            let start = self.advance().span;
            let operand = self.nested(Self::parse_not)?;
            let span = start.merge(operand.span);
            return Some(Expr::new(
                ExprKind::Unary {
                    op: UnaryOp::Not,
                    operand: Box::new(operand),
                },
                span,
            ));
        }
        self.parse_comparison()
    }

    /// `CompExpr = BitOrExpr { CompOp BitOrExpr }`
    fn parse_comparison(&mut self) -> Option<Expr> {
        let mut left = self.parse_bit_or()?;
        while let Some(op) = self.match_comparison_op() {
            self.advance();
            let comments = self.take_continuation();
            let mut right = self.parse_bit_or()?;
            attach_leading(&mut right, comments);
            let span = left.span.merge(right.span);
            left = Expr::new(
                ExprKind::Comparison {
                    left: Box::new(left),
                    op,
                    right: Box::new(right),
                },
                span,
            );
        }
        Some(left)
    }

    fn match_comparison_op(&self) -> Option<ComparisonOp> {
        match self.peek_kind() {
            TokenKind::EqEq => Some(ComparisonOp::Eq),
            TokenKind::BangEq => Some(ComparisonOp::NotEq),
            TokenKind::Less => Some(ComparisonOp::Less),
            TokenKind::Greater => Some(ComparisonOp::Greater),
            TokenKind::LessEq => Some(ComparisonOp::LessEq),
            TokenKind::GreaterEq => Some(ComparisonOp::GreaterEq),
            TokenKind::Isa => Some(ComparisonOp::Isa),
            _ => None,
        }
    }

    /// `BitOrExpr = BitAndExpr { "|" BitAndExpr }`
    fn parse_bit_or(&mut self) -> Option<Expr> {
        self.parse_binary_level(Self::parse_bit_and, |kind| match kind {
            TokenKind::Pipe => Some(BinaryOp::BitOr),
            _ => None,
        })
    }

    /// `BitAndExpr = ShiftExpr { "&" ShiftExpr }`
    fn parse_bit_and(&mut self) -> Option<Expr> {
        self.parse_binary_level(Self::parse_shift, |kind| match kind {
            TokenKind::Amp => Some(BinaryOp::BitAnd),
            _ => None,
        })
    }

    /// `ShiftExpr = AddExpr { ("<<" | ">>" | ">>>") AddExpr }`
    fn parse_shift(&mut self) -> Option<Expr> {
        self.parse_binary_level(Self::parse_add, |kind| match kind {
            TokenKind::ShiftLeft => Some(BinaryOp::ShiftLeft),
            TokenKind::ShiftRight => Some(BinaryOp::ShiftRight),
            TokenKind::UnsignedShiftRight => Some(BinaryOp::UnsignedShiftRight),
            _ => None,
        })
    }

    /// `AddExpr = MulExpr { ("+" | "-") MulExpr }`
    fn parse_add(&mut self) -> Option<Expr> {
        self.parse_binary_level(Self::parse_mul, |kind| match kind {
            TokenKind::Plus => Some(BinaryOp::Add),
            TokenKind::Minus => Some(BinaryOp::Sub),
            _ => None,
        })
    }

    /// `MulExpr = UnaryExpr { ("*" | "/" | "%") UnaryExpr }`
    fn parse_mul(&mut self) -> Option<Expr> {
        self.parse_binary_level(Self::parse_unary, |kind| match kind {
            TokenKind::Star => Some(BinaryOp::Mul),
            TokenKind::Slash => Some(BinaryOp::Div),
            TokenKind::Percent => Some(BinaryOp::Mod),
            _ => None,
        })
    }

    /// One left-associative binary level.
    fn parse_binary_level(
        &mut self,
        operand: fn(&mut Self) -> Option<Expr>,
        op_for: fn(&TokenKind) -> Option<BinaryOp>,
    ) -> Option<Expr> {
        let mut left = operand(self)?;
        while let Some(op) = op_for(self.peek_kind()) {
            self.advance();
            let comments = self.take_continuation();
            let mut right = operand(self)?;
            attach_leading(&mut right, comments);
            left = binary(left, op, right);
        }
        Some(left)
    }

    /// `UnaryExpr = ("-" | "new") UnaryExpr | PowerExpr`
    ///
    /// `-` directly applied to a number literal folds into the literal.
    fn parse_unary(&mut self) -> Option<Expr> {
        let op = match self.peek_kind() {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::New => UnaryOp::New,
            _ => return self.parse_power(),
        };
        let start = self.advance().span;
        let mut operand = self.nested(Self::parse_unary)?;
        let span = start.merge(operand.span);

        if op == UnaryOp::Neg {
            if let ExprKind::Literal(Literal::Number(number)) = &mut operand.kind {
                if !number.negated {
                    number.negated = true;
                    if let Some(Literal::Number(recorded)) = self.meta.literals.last_mut() {
                        recorded.negated = true;
                    }
                    operand.span = span;
                    return Some(operand);
                }
            }
        }

        Some(Expr::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            span,
        ))
    }

    /// `PowerExpr = AddressExpr [ "^" UnaryExpr ]`
    fn parse_power(&mut self) -> Option<Expr> {
        let left = self.parse_address()?;
        if self.eat(&TokenKind::Caret) {
            let comments = self.take_continuation();
            let mut right = self.nested(Self::parse_unary)?;
            attach_leading(&mut right, comments);
            return Some(binary(left, BinaryOp::Pow, right));
        }
        Some(left)
    }

    /// `AddressExpr = "@" AddressExpr | PostfixExpr`
    fn parse_address(&mut self) -> Option<Expr> {
        if self.check(&TokenKind::At) {
            let start = self.advance().span;
            let operand = self.nested(Self::parse_address)?;
            let span = start.merge(operand.span);
            return Some(Expr::new(
                ExprKind::Unary {
                    op: UnaryOp::AddressOf,
                    operand: Box::new(operand),
                },
                span,
            ));
        }
        self.parse_postfix()
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Postfix
    // ══════════════════════════════════════════════════════════════════════════

    /// `PostfixExpr = Primary { "." Identifier | "[" Index "]" | "(" Args ")" }`
    fn parse_postfix(&mut self) -> Option<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek_kind() {
                TokenKind::Dot => {
                    self.advance();
                    let member = self.expect_identifier()?;
                    let span = expr.span.merge(member.span);
                    expr = Expr::new(
                        ExprKind::Member {
                            base: Box::new(expr),
                            member,
                        },
                        span,
                    );
                }
                TokenKind::LBracket => {
                    self.advance();
                    expr = self.parse_index(expr)?;
                }
                TokenKind::LParen => {
                    self.advance();
                    let (args, inner) = self.parse_call_args()?;
                    let span = expr.span.merge(self.previous_span());
                    expr = self.finish_call(expr, args, span);
                    expr.comments.inner = inner;
                }
                _ => break,
            }
        }
        Some(expr)
    }

    /// `Index = Expr | [ Expr ] ":" [ Expr ]`, after the opening `[`.
    ///
    /// Comments with no bound to attach to stay on the slice node.
    fn parse_index(&mut self, base: Expr) -> Option<Expr> {
        let base_span = base.span;
        let mut loose = self.take_continuation();
        let mut start = if self.check(&TokenKind::Colon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        let after_start = self.take_continuation();
        if let Some(start) = &mut start {
            attach_leading(start, std::mem::take(&mut loose));
            start.comments.trailing.extend(after_start);
        } else {
            loose.extend(after_start);
        }

        let (kind, inner) = if self.eat(&TokenKind::Colon) {
            loose.extend(self.take_continuation());
            let mut end = if self.check(&TokenKind::RBracket) {
                None
            } else {
                Some(self.parse_expression()?)
            };
            let after_end = self.take_continuation();
            if let Some(end) = &mut end {
                attach_leading(end, std::mem::take(&mut loose));
                end.comments.trailing.extend(after_end);
            } else {
                loose.extend(after_end);
            }
            let kind = ExprKind::Slice {
                base: Box::new(base),
                start: start.map(Box::new),
                end: end.map(Box::new),
            };
            (kind, loose)
        } else if let Some(index) = start {
            let kind = ExprKind::Index {
                base: Box::new(base),
                index: Box::new(index),
            };
            (kind, loose)
        } else {
            self.error_at_current(ErrorCode::UNEXPECTED_TOKEN, "expected index expression");
            return None;
        };

        self.expect(&TokenKind::RBracket)?;
        let mut expr = Expr::new(kind, base_span.merge(self.previous_span()));
        expr.comments.inner = inner;
        Some(expr)
    }

    /// `Args = [ Expr { "," Expr } [ "," ] ]`, after the opening `(`.
    fn parse_call_args(&mut self) -> Option<(Vec<Expr>, Vec<Comment>)> {
        let args = self.parse_sequence(&TokenKind::RParen, Self::parse_expression)?;
        self.expect(&TokenKind::RParen)?;
        Some(args)
    }

    /// Comma-separated items up to `close`, which is left in place.
    ///
    /// Returns the items and the comments of an empty sequence.
    fn parse_sequence<T: SequenceItem>(
        &mut self,
        close: &TokenKind,
        item: fn(&mut Self) -> Option<T>,
    ) -> Option<(Vec<T>, Vec<Comment>)> {
        let mut items: Vec<T> = Vec::new();
        let mut pending = self.take_continuation();
        while !self.check(close) {
            let mut next = item(self)?;
            attach_leading(&mut next, std::mem::take(&mut pending));
            let mut trailing = self.take_continuation();
            let more = self.eat(&TokenKind::Comma);
            let after = self.take_continuation();
            if more && !self.check(close) {
                pending = split_trailing(&mut next, after);
            } else {
                trailing.extend(after);
            }
            next.item_comments_mut().trailing.extend(trailing);
            items.push(next);
            if !more {
                break;
            }
        }
        Some((items, pending))
    }

    /// Build a call node, recording `import_code("path")` references.
    pub(crate) fn finish_call(
        &mut self,
        callee: Expr,
        args: Vec<Expr>,
        span: miniforge_types::Span,
    ) -> Expr {
        if let (ExprKind::Identifier(name), [arg]) = (&callee.kind, args.as_slice()) {
            if name == "import_code" {
                if let ExprKind::Literal(Literal::String(path)) = &arg.kind {
                    self.meta.native_imports.push(Reference {
                        path: path.value.clone(),
                        span,
                    });
                }
            }
        }
        Expr::new(
            ExprKind::Call {
                callee: Box::new(callee),
                args,
            },
            span,
        )
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Primary Expressions
    // ══════════════════════════════════════════════════════════════════════════

    fn parse_primary(&mut self) -> Option<Expr> {
        let span = self.current_span();
        match self.peek_kind().clone() {
            TokenKind::Number { value, raw } => {
                self.advance();
                Some(self.literal(
                    Literal::Number(NumberLit {
                        value,
                        unsigned_raw: raw,
                        negated: false,
                    }),
                    span,
                ))
            }
            TokenKind::String { value, raw } => {
                self.advance();
                Some(self.literal(Literal::String(StringLit { value, raw }), span))
            }
            TokenKind::True => {
                self.advance();
                Some(self.literal(Literal::Bool(true), span))
            }
            TokenKind::False => {
                self.advance();
                Some(self.literal(Literal::Bool(false), span))
            }
            TokenKind::Null => {
                self.advance();
                Some(self.literal(Literal::Null, span))
            }
            TokenKind::Identifier(name) => {
                self.advance();
                self.meta.identifier(&name);
                Some(Expr::new(ExprKind::Identifier(name), span))
            }
            TokenKind::LParen => {
                self.advance();
                let leading = self.take_continuation();
                let mut inner = self.parse_expression()?;
                attach_leading(&mut inner, leading);
                let trailing = self.take_continuation();
                inner.comments.trailing.extend(trailing);
                self.expect(&TokenKind::RParen)?;
                Some(Expr::new(
                    ExprKind::Paren(Box::new(inner)),
                    span.merge(self.previous_span()),
                ))
            }
            TokenKind::LBracket => self.parse_list(),
            TokenKind::LBrace => self.parse_map(),
            TokenKind::Function => self.parse_function(),
            TokenKind::Hash => self.parse_directive_expression(),
            other => {
                self.error_at_current(
                    ErrorCode::UNEXPECTED_TOKEN,
                    format!("expected expression, got '{other}'"),
                );
                None
            }
        }
    }

    fn literal(&mut self, literal: Literal, span: miniforge_types::Span) -> Expr {
        self.meta.literals.push(literal.clone());
        Expr::new(ExprKind::Literal(literal), span)
    }

    /// `"[" [ Expr { "," Expr } [ "," ] ] "]"`
    fn parse_list(&mut self) -> Option<Expr> {
        let start = self.advance().span;
        let (items, inner) = self.parse_sequence(&TokenKind::RBracket, Self::parse_expression)?;
        self.expect(&TokenKind::RBracket)?;
        let mut list = Expr::new(ExprKind::List(items), start.merge(self.previous_span()));
        list.comments.inner = inner;
        Some(list)
    }

    /// `"{" [ Expr ":" Expr { "," Expr ":" Expr } [ "," ] ] "}"`
    fn parse_map(&mut self) -> Option<Expr> {
        let start = self.advance().span;
        let (entries, inner) = self.parse_sequence(&TokenKind::RBrace, Self::parse_map_entry)?;
        self.expect(&TokenKind::RBrace)?;
        let mut map = Expr::new(ExprKind::Map(entries), start.merge(self.previous_span()));
        map.comments.inner = inner;
        Some(map)
    }

    /// `Expr ":" Expr`. Comments around the colon trail the entry.
    fn parse_map_entry(&mut self) -> Option<MapEntry> {
        let key = self.parse_expression()?;
        let mut colon = self.take_continuation();
        self.expect(&TokenKind::Colon)?;
        colon.extend(self.take_continuation());
        let value = self.parse_expression()?;
        let span = key.span.merge(value.span);
        Some(MapEntry {
            key,
            value,
            span,
            comments: Comments {
                trailing: colon,
                ..Comments::default()
            },
        })
    }

    /// `"function" [ "(" Params ")" ] Block "end" "function"`
    fn parse_function(&mut self) -> Option<Expr> {
        let start = self.advance().span;
        self.meta.enter_scope(start);
        let result = self.parse_function_rest(start);
        let end = self.previous_span();
        self.meta.exit_scope(end);
        result
    }

    fn parse_function_rest(&mut self, start: miniforge_types::Span) -> Option<Expr> {
        let mut params = Vec::new();
        let mut inner = Vec::new();
        if self.eat(&TokenKind::LParen) {
            (params, inner) = self.parse_sequence(&TokenKind::RParen, Self::parse_param)?;
            self.expect(&TokenKind::RParen)?;
        }

        let body = self.parse_block(&[TokenKind::End]);
        let end = self.expect_block_end(&TokenKind::Function, start)?;
        let span = start.merge(end);
        let mut function = Expr::new(
            ExprKind::Function(Box::new(FunctionExpr { params, body, span })),
            span,
        );
        function.comments.inner = inner;
        Some(function)
    }

    /// `Identifier [ "=" Expr ]`
    fn parse_param(&mut self) -> Option<Param> {
        let name = self.expect_identifier()?;
        self.meta.identifier(&name.name);
        let default = if self.eat(&TokenKind::Eq) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        let span = match &default {
            Some(value) => name.span.merge(value.span),
            None => name.span,
        };
        Some(Param {
            name,
            default,
            span,
            comments: Comments::default(),
        })
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Node Builders
// ══════════════════════════════════════════════════════════════════════════════

/// Put `comments` before the comments already leading `item`.
pub(crate) fn attach_leading<T: SequenceItem>(item: &mut T, mut comments: Vec<Comment>) {
    if comments.is_empty() {
        return;
    }
    let leading = &mut item.item_comments_mut().leading;
    comments.append(leading);
    *leading = comments;
}

/// Move a comment sharing the last line of `prev` onto it and return the
/// comments left for the next item.
pub(crate) fn split_trailing<T: SequenceItem>(prev: &mut T, mut comments: Vec<Comment>) -> Vec<Comment> {
    let end_line = prev.item_span().end_line;
    if matches!(comments.first(), Some(first) if first.span.start_line == end_line) {
        let first = comments.remove(0);
        prev.item_comments_mut().trailing.push(first);
    }
    comments
}

fn binary(left: Expr, op: BinaryOp, right: Expr) -> Expr {
    let span = left.span.merge(right.span);
    Expr::new(
        ExprKind::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        },
        span,
    )
}

fn logical(left: Expr, op: LogicalOp, right: Expr) -> Expr {
    let span = left.span.merge(right.span);
    Expr::new(
        ExprKind::Logical {
            left: Box::new(left),
            op,
            right: Box::new(right),
        },
        span,
    )
}
