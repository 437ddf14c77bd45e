//! Reformatted strategy: canonical layout.
//!
//! Line breaks are re-derived instead of copied. Blocks are indented by
//! depth, blank lines between statements mirror the source, and
//! collections or argument lists break by item count. Items are
//! rendered once into scratch buffers; the sequence stays on one line
//! only when none of them contains a forced break. Comments inside
//! brackets put every item of the sequence on its own line.

use std::collections::HashSet;

use miniforge_types::ast::*;

use crate::buffer::{blank_lines, LineBuffer};
use crate::context::CompilationContext;
use crate::directives;
use crate::error::{CodegenError, CodegenResult};
use crate::graph::{ActiveModule, ModuleId};
use crate::CodeGenerator;

/// Lists and call argument lists longer than this break one per line.
const MAX_INLINE_ITEMS: usize = 3;
/// Maps with more entries than this break one per line.
const MAX_INLINE_ENTRIES: usize = 1;

/// Delimiters of a bracketed sequence. `padded` puts a space inside the
/// brackets when the sequence stays on one line.
#[derive(Clone, Copy)]
struct Brackets {
    open: &'static str,
    close: &'static str,
    padded: bool,
}

const LIST: Brackets = Brackets {
    open: "[",
    close: "]",
    padded: false,
};
const MAP: Brackets = Brackets {
    open: "{",
    close: "}",
    padded: true,
};
const ARGS: Brackets = Brackets {
    open: "(",
    close: ")",
    padded: false,
};

/// Reformatting code generator.
pub struct Reformatted<'a> {
    ctx: &'a CompilationContext,
    active: Option<ActiveModule<'a>>,
    buf: LineBuffer,
    depth: usize,
    indent: String,
    included: HashSet<ModuleId>,
    /// Cleared while emitting conditions, parameter defaults and index
    /// operands, where collections must stay on one line.
    multiline: bool,
}

impl<'a> Reformatted<'a> {
    pub fn new(ctx: &'a CompilationContext) -> Self {
        Self {
            ctx,
            active: None,
            buf: LineBuffer::new(),
            depth: 0,
            indent: ctx.options().mode_options.indentation_style.unit(),
            included: HashSet::new(),
            multiline: true,
        }
    }

    fn dev_mode(&self) -> bool {
        self.ctx.dev_mode()
    }

    fn indent(&mut self) {
        if self.depth > 0 {
            self.buf.text(self.indent.repeat(self.depth));
        }
    }

    /// Run `emit` with multi-line layout disabled.
    fn single_line<F>(&mut self, emit: F) -> CodegenResult<()>
    where
        F: FnOnce(&mut Self) -> CodegenResult<()>,
    {
        let outer = std::mem::replace(&mut self.multiline, false);
        let result = emit(self);
        self.multiline = outer;
        result
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Statements
    // ══════════════════════════════════════════════════════════════════════════

    /// Emit a statement list. `header` is the line the list opens on and
    /// `close` the line of the keyword that ends it.
    fn block(&mut self, stmts: &[Stmt], header: Option<u32>, close: Option<u32>) -> CodegenResult<()> {
        let mut prev = header;
        for stmt in stmts {
            let span = stmt.span();
            if let Stmt::Comment(comment) = stmt {
                if prev == Some(span.start_line) {
                    self.buf.comment(comment.text.as_str(), true);
                    self.buf.eol();
                    continue;
                }
            }
            if let Some(prev) = prev {
                for _ in 0..blank_lines(prev, span.start_line) {
                    self.buf.eol();
                }
            }
            self.statement(stmt)?;
            prev = Some(span.end_line);
        }
        if let (Some(prev), Some(close)) = (prev, close) {
            for _ in 0..blank_lines(prev, close) {
                self.buf.eol();
            }
        }
        Ok(())
    }

    fn nested(&mut self, block: &Block) -> CodegenResult<()> {
        self.depth += 1;
        let result = self.block(
            &block.stmts,
            Some(block.span.start_line),
            Some(block.span.end_line),
        );
        self.depth -= 1;
        result
    }

    fn statement(&mut self, stmt: &Stmt) -> CodegenResult<()> {
        if let Stmt::Include(include) = stmt {
            if let Some(module) = self.include_target(include) {
                return self.inline_module(module);
            }
        }
        self.indent();
        self.statement_body(stmt)?;
        self.buf.eol();
        Ok(())
    }

    fn statement_body(&mut self, stmt: &Stmt) -> CodegenResult<()> {
        match stmt {
            Stmt::Assign(assign) => {
                self.single_line(|g| g.expr(&assign.target))?;
                let op = assign.op.map_or("=", |op| op.as_str());
                self.buf.text(format!(" {op} "));
                self.expr(&assign.value)
            }
            Stmt::Call(call) => match &call.call.kind {
                ExprKind::Call { callee, args } if args.is_empty() => self.expr(callee),
                _ => self.expr(&call.call),
            },
            Stmt::Expr(stmt) => self.expr(&stmt.expr),
            Stmt::Return(ret) => {
                self.buf.text("return");
                if let Some(value) = &ret.value {
                    self.buf.text(" ");
                    self.expr(value)?;
                }
                Ok(())
            }
            Stmt::Break(_) => {
                self.buf.text("break");
                Ok(())
            }
            Stmt::Continue(_) => {
                self.buf.text("continue");
                Ok(())
            }
            Stmt::If(stmt) => self.if_stmt(stmt),
            Stmt::While(stmt) => {
                self.buf.text("while ");
                self.single_line(|g| g.expr(&stmt.condition))?;
                self.buf.eol();
                self.nested(&stmt.body)?;
                self.indent();
                self.buf.text("end while");
                Ok(())
            }
            Stmt::For(stmt) => {
                self.buf.text(format!("for {} in ", stmt.variable.name));
                self.single_line(|g| g.expr(&stmt.iterable))?;
                self.buf.eol();
                self.nested(&stmt.body)?;
                self.indent();
                self.buf.text("end for");
                Ok(())
            }
            Stmt::Comment(comment) => {
                self.buf.comment(comment.text.as_str(), false);
                Ok(())
            }
            Stmt::Import(import) => self.import(import),
            Stmt::Include(include) => {
                if self.include_target(include).is_none() {
                    self.buf.text(directives::include_directive(&include.path));
                }
                Ok(())
            }
            Stmt::Debugger(_) => {
                if self.dev_mode() {
                    self.buf.text(directives::DEBUGGER_DIRECTIVE);
                } else {
                    self.buf.comment("debugger", false);
                }
                Ok(())
            }
        }
    }

    /// Block and single-line `if` both render in block form.
    fn if_stmt(&mut self, stmt: &IfStmt) -> CodegenResult<()> {
        for (i, clause) in stmt.clauses.iter().enumerate() {
            if i > 0 {
                self.indent();
                self.buf.text("else if ");
            } else {
                self.buf.text("if ");
            }
            self.single_line(|g| g.expr(&clause.condition))?;
            self.buf.text(" then");
            self.buf.eol();
            self.if_body(&clause.body, stmt.inline)?;
        }
        if let Some(else_block) = &stmt.else_block {
            self.indent();
            self.buf.text("else");
            self.buf.eol();
            self.if_body(else_block, stmt.inline)?;
        }
        self.indent();
        self.buf.text("end if");
        Ok(())
    }

    fn if_body(&mut self, body: &Block, inline: bool) -> CodegenResult<()> {
        if !inline {
            return self.nested(body);
        }
        if body.stmts.len() != 1 {
            return Err(CodegenError::Internal(format!(
                "single-line if body with {} statements",
                body.stmts.len()
            )));
        }
        self.depth += 1;
        let result = self.block(&body.stmts, None, None);
        self.depth -= 1;
        result
    }

    // ── Modules ───────────────────────────────────────────────────────────────

    fn import(&mut self, import: &ImportDirective) -> CodegenResult<()> {
        let target = match self.active {
            Some(active) if !self.dev_mode() => active.import(&import.path),
            _ => None,
        };
        match target {
            Some(module) => {
                let namespace = self.ctx.module_namespace(module.path());
                self.buf.text(format!(
                    "{} = {}({})",
                    import.name.name,
                    self.ctx.runtime_name("__REQUIRE"),
                    quote(&namespace)
                ));
            }
            None => self
                .buf
                .text(directives::import_directive(&import.name.name, &import.path)),
        }
        Ok(())
    }

    fn include_target(&self, include: &IncludeDirective) -> Option<ActiveModule<'a>> {
        match self.active {
            Some(active) if !self.dev_mode() => active.include(&include.path),
            _ => None,
        }
    }

    fn inline_module(&mut self, module: ActiveModule<'a>) -> CodegenResult<()> {
        if !self.included.insert(module.id) {
            return Ok(());
        }
        let outer = self.active.replace(module);
        let result = self.block(&module.chunk().body, None, None);
        self.active = outer;
        result
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Expressions
    // ══════════════════════════════════════════════════════════════════════════

    fn expr(&mut self, expr: &Expr) -> CodegenResult<()> {
        match &expr.kind {
            ExprKind::Literal(literal) => self.buf.text(literal.raw()),
            ExprKind::List(items) => {
                return self.sequence(LIST, items, &expr.comments.inner, MAX_INLINE_ITEMS, |g, item| {
                    g.expr(item)
                });
            }
            ExprKind::Map(entries) => {
                let inner = &expr.comments.inner;
                return self.sequence(MAP, entries, inner, MAX_INLINE_ENTRIES, |g, entry| {
                    g.expr(&entry.key)?;
                    g.buf.text(": ");
                    g.expr(&entry.value)
                });
            }
            ExprKind::Identifier(name) => self.buf.text(name.as_str()),
            ExprKind::Member { base, member } => {
                self.expr(base)?;
                self.buf.text(format!(".{}", member.name));
            }
            ExprKind::Index { base, index } => {
                self.expr(base)?;
                if !index.comments.is_empty() || !expr.comments.inner.is_empty() {
                    self.buf.text("[");
                    self.buf.eol();
                    self.commented_part(index, "")?;
                    self.own_line_comments(&expr.comments.inner);
                    self.indent();
                    self.buf.text("]");
                    return Ok(());
                }
                self.buf.text("[");
                self.single_line(|g| g.expr(index))?;
                self.buf.text("]");
            }
            ExprKind::Slice { base, start, end } => {
                self.expr(base)?;
                let commented = [start, end]
                    .into_iter()
                    .flatten()
                    .any(|bound| !bound.comments.is_empty());
                if commented || !expr.comments.inner.is_empty() {
                    self.buf.text("[");
                    self.buf.eol();
                    if let Some(start) = start {
                        self.commented_part(start, "")?;
                    }
                    self.depth += 1;
                    self.indent();
                    self.depth -= 1;
                    self.buf.text(":");
                    self.buf.eol();
                    if let Some(end) = end {
                        self.commented_part(end, "")?;
                    }
                    self.own_line_comments(&expr.comments.inner);
                    self.indent();
                    self.buf.text("]");
                    return Ok(());
                }
                self.buf.text("[");
                self.single_line(|g| {
                    if let Some(start) = start {
                        g.expr(start)?;
                    }
                    g.buf.text(":");
                    if let Some(end) = end {
                        g.expr(end)?;
                    }
                    Ok(())
                })?;
                self.buf.text("]");
            }
            ExprKind::Call { callee, args } => {
                if let Some(path) = directives::native_import(self.ctx, self.active, callee, args) {
                    self.buf
                        .text(format!("{}({})", directives::NATIVE_IMPORT, quote(&path)));
                    return Ok(());
                }
                self.expr(callee)?;
                return self.sequence(ARGS, args, &expr.comments.inner, MAX_INLINE_ITEMS, |g, arg| {
                    g.expr(arg)
                });
            }
            ExprKind::Binary { left, op, right } => return self.binary(left, op.as_str(), right),
            ExprKind::Logical { left, op, right } => return self.binary(left, op.as_str(), right),
            ExprKind::Comparison { left, op, right } => {
                return self.binary(left, op.as_str(), right)
            }
            ExprKind::Unary { op, operand } => {
                self.buf.text(op.as_str());
                if op.is_keyword() {
                    self.buf.text(" ");
                }
                self.expr(operand)?;
            }
            ExprKind::Function(func) => return self.function(func, &expr.comments.inner),
            ExprKind::Paren(inner) if !inner.comments.is_empty() => {
                self.buf.text("(");
                self.buf.eol();
                self.commented_part(inner, "")?;
                self.indent();
                self.buf.text(")");
            }
            ExprKind::Paren(inner) => {
                if inner.is_atomic() && !self.ctx.options().mode_options.keep_redundant_parens {
                    return self.expr(inner);
                }
                self.buf.text("(");
                self.expr(inner)?;
                self.buf.text(")");
            }
            ExprKind::Envar(name) => {
                let text = if self.dev_mode() {
                    directives::envar_directive(name)
                } else {
                    directives::envar(self.ctx, name)
                };
                self.buf.text(text);
            }
            ExprKind::Inject(path) => {
                let text = if self.dev_mode() {
                    directives::inject_directive(path)
                } else {
                    directives::inject(self.active, path)
                };
                self.buf.text(text);
            }
            ExprKind::Line => {
                let text = if self.dev_mode() {
                    directives::LINE_DIRECTIVE.to_string()
                } else {
                    expr.span.start_line.to_string()
                };
                self.buf.text(text);
            }
            ExprKind::Filename => {
                let text = if self.dev_mode() {
                    directives::FILENAME_DIRECTIVE.to_string()
                } else {
                    directives::filename(self.active)
                };
                self.buf.text(text);
            }
        }
        Ok(())
    }

    /// `left op right`. Comments after the operator push the right
    /// operand onto its own line.
    fn binary(&mut self, left: &Expr, op: &str, right: &Expr) -> CodegenResult<()> {
        self.expr(left)?;
        if right.comments.leading.is_empty() {
            self.buf.text(format!(" {op} "));
            return self.expr(right);
        }
        self.buf.text(format!(" {op}"));
        self.depth += 1;
        for (i, comment) in right.comments.leading.iter().enumerate() {
            if i == 0 && comment.span.start_line == left.span.end_line {
                self.buf.comment(comment.text.as_str(), true);
            } else {
                self.buf.eol();
                self.indent();
                self.buf.comment(comment.text.as_str(), false);
            }
        }
        self.buf.eol();
        self.indent();
        let result = self.expr(right);
        self.depth -= 1;
        result
    }

    /// A bracketed, comma-separated sequence. Up to `max_inline` items
    /// stay on one line unless one of them renders with a line break;
    /// otherwise every item gets its own line and a trailing comma.
    ///
    /// Each item is rendered exactly once, into its own scratch buffer at
    /// the depth it takes in the broken layout. A rendering without line
    /// breaks has no indentation, so it serves both layouts.
    fn sequence<T: SequenceItem>(
        &mut self,
        brackets: Brackets,
        items: &[T],
        inner: &[Comment],
        max_inline: usize,
        emit: fn(&mut Self, &T) -> CodegenResult<()>,
    ) -> CodegenResult<()> {
        let pad = if brackets.padded { " " } else { "" };
        if items.is_empty() {
            self.buf.text(brackets.open);
            if !inner.is_empty() {
                self.buf.eol();
                self.own_line_comments(inner);
                self.indent();
            }
            self.buf.text(brackets.close);
            return Ok(());
        }
        let commented = items.iter().any(|item| !item.item_comments().is_empty());
        if !self.multiline && !commented {
            self.buf.text(format!("{}{pad}", brackets.open));
            self.inline_items(items, emit)?;
            self.buf.text(format!("{pad}{}", brackets.close));
            return Ok(());
        }

        self.depth += 1;
        let rendered: CodegenResult<Vec<LineBuffer>> = items
            .iter()
            .map(|item| self.scratch(|g| emit(g, item)))
            .collect();
        self.depth -= 1;
        let rendered = rendered?;

        if !commented && items.len() <= max_inline && !rendered.iter().any(LineBuffer::has_break) {
            self.buf.text(format!("{}{pad}", brackets.open));
            for (i, line) in rendered.into_iter().enumerate() {
                if i > 0 {
                    self.buf.text(", ");
                }
                self.buf.append(line);
            }
            self.buf.text(format!("{pad}{}", brackets.close));
            return Ok(());
        }

        self.buf.text(brackets.open);
        self.buf.eol();
        self.depth += 1;
        for (item, line) in items.iter().zip(rendered) {
            let comments = item.item_comments();
            for comment in &comments.leading {
                self.indent();
                self.buf.comment(comment.text.as_str(), false);
                self.buf.eol();
            }
            self.indent();
            self.buf.append(line);
            self.buf.text(",");
            self.trailing_comments(&comments.trailing, item.item_span().end_line);
            self.buf.eol();
        }
        self.depth -= 1;
        self.indent();
        self.buf.text(brackets.close);
        Ok(())
    }

    /// One expression on its own lines inside brackets, followed by `sep`
    /// and its comments. The bracket is already open on the line before.
    fn commented_part(&mut self, expr: &Expr, sep: &str) -> CodegenResult<()> {
        self.own_line_comments(&expr.comments.leading);
        self.depth += 1;
        self.indent();
        let result = self.expr(expr);
        if result.is_ok() {
            self.buf.text(sep);
            self.trailing_comments(&expr.comments.trailing, expr.span.end_line);
            self.buf.eol();
        }
        self.depth -= 1;
        result
    }

    /// Comments one level in, each on its own line.
    fn own_line_comments(&mut self, comments: &[Comment]) {
        self.depth += 1;
        for comment in comments {
            self.indent();
            self.buf.comment(comment.text.as_str(), false);
            self.buf.eol();
        }
        self.depth -= 1;
    }

    /// Comments after an item. The first continues the item's line when
    /// the source had it there; the rest go on their own lines.
    fn trailing_comments(&mut self, comments: &[Comment], end_line: u32) {
        for (i, comment) in comments.iter().enumerate() {
            if i == 0 && comment.span.start_line == end_line {
                self.buf.comment(comment.text.as_str(), true);
            } else {
                self.buf.eol();
                self.indent();
                self.buf.comment(comment.text.as_str(), false);
            }
        }
    }

    /// Run `emit` against an empty buffer and return what it wrote.
    fn scratch<F>(&mut self, emit: F) -> CodegenResult<LineBuffer>
    where
        F: FnOnce(&mut Self) -> CodegenResult<()>,
    {
        let outer = std::mem::take(&mut self.buf);
        let result = emit(self);
        let rendered = std::mem::replace(&mut self.buf, outer);
        result.map(|()| rendered)
    }

    fn inline_items<T>(
        &mut self,
        items: &[T],
        emit: fn(&mut Self, &T) -> CodegenResult<()>,
    ) -> CodegenResult<()> {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.buf.text(", ");
            }
            emit(self, item)?;
        }
        Ok(())
    }

    fn function(&mut self, func: &FunctionExpr, inner: &[Comment]) -> CodegenResult<()> {
        self.buf.text("function");
        let commented = func.params.iter().any(|param| !param.comments.is_empty());
        if commented || !inner.is_empty() {
            self.sequence(ARGS, &func.params, inner, usize::MAX, |g, param| {
                g.buf.text(param.name.name.as_str());
                if let Some(default) = &param.default {
                    g.buf.text(" = ");
                    g.single_line(|g| g.expr(default))?;
                }
                Ok(())
            })?;
        } else if !func.params.is_empty() {
            self.buf.text("(");
            for (i, param) in func.params.iter().enumerate() {
                if i > 0 {
                    self.buf.text(", ");
                }
                self.buf.text(param.name.name.as_str());
                if let Some(default) = &param.default {
                    self.buf.text(" = ");
                    self.single_line(|g| g.expr(default))?;
                }
            }
            self.buf.text(")");
        }
        self.buf.eol();
        let outer = std::mem::replace(&mut self.multiline, true);
        let result = self.nested(&func.body);
        self.multiline = outer;
        result?;
        self.indent();
        self.buf.text("end function");
        Ok(())
    }

    /// Start a new chunk. Include guards do not cross chunk boundaries.
    fn reset(&mut self, active: Option<ActiveModule<'a>>) {
        self.active = active;
        self.buf = LineBuffer::new();
        self.included.clear();
        self.depth = 0;
        self.multiline = true;
    }
}

impl<'a> CodeGenerator<'a> for Reformatted<'a> {
    fn transform(&mut self, chunk: &Chunk, active: Option<ActiveModule<'a>>) -> CodegenResult<String> {
        self.reset(active);
        self.block(&chunk.body, None, None)?;
        Ok(std::mem::take(&mut self.buf).join())
    }

    fn transform_module(
        &mut self,
        namespace: &str,
        chunk: &Chunk,
        active: ActiveModule<'a>,
    ) -> CodegenResult<String> {
        self.reset(Some(active));
        self.buf.text(format!(
            "{}[{}] = function({})",
            self.ctx.runtime_name("__MODULES"),
            quote(namespace),
            self.ctx.runtime_name("module")
        ));
        self.buf.eol();
        self.depth = 1;
        self.block(&chunk.body, None, None)?;
        self.depth = 0;
        self.buf.text("end function");
        Ok(std::mem::take(&mut self.buf).join())
    }
}
