//! Verbatim strategy: reproduces the source layout.
//!
//! Statements keep their lines, blank lines and comments; collections,
//! argument lists and operator chains break where the source broke them.
//! Comments inside brackets and after operators stay next to their item.

use std::collections::HashSet;

use miniforge_types::ast::*;

use crate::buffer::{blank_lines, LineBuffer};
use crate::context::CompilationContext;
use crate::directives;
use crate::error::{CodegenError, CodegenResult};
use crate::graph::{ActiveModule, ModuleId};
use crate::CodeGenerator;

/// Verbatim code generator.
pub struct Verbatim<'a> {
    ctx: &'a CompilationContext,
    active: Option<ActiveModule<'a>>,
    buf: LineBuffer,
    depth: usize,
    indent: String,
    included: HashSet<ModuleId>,
}

impl<'a> Verbatim<'a> {
    pub fn new(ctx: &'a CompilationContext) -> Self {
        Self {
            ctx,
            active: None,
            buf: LineBuffer::new(),
            depth: 0,
            indent: ctx.options().mode_options.indentation_style.unit(),
            included: HashSet::new(),
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
                self.expr(&assign.target)?;
                let op = assign.op.map_or("=", |op| op.as_str());
                self.buf.text(format!(" {op} "));
                self.expr(&assign.value)
            }
            Stmt::Call(call) => self.expr(&call.call),
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
            Stmt::If(stmt) if stmt.inline => self.inline_if(stmt),
            Stmt::If(stmt) => self.block_if(stmt),
            Stmt::While(stmt) => {
                self.buf.text("while ");
                self.expr(&stmt.condition)?;
                self.buf.eol();
                self.nested(&stmt.body)?;
                self.indent();
                self.buf.text("end while");
                Ok(())
            }
            Stmt::For(stmt) => {
                self.buf.text(format!("for {} in ", stmt.variable.name));
                self.expr(&stmt.iterable)?;
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

    fn block_if(&mut self, stmt: &IfStmt) -> CodegenResult<()> {
        for (i, clause) in stmt.clauses.iter().enumerate() {
            if i > 0 {
                self.indent();
                self.buf.text("else if ");
            } else {
                self.buf.text("if ");
            }
            self.expr(&clause.condition)?;
            self.buf.text(" then");
            self.buf.eol();
            self.nested(&clause.body)?;
        }
        if let Some(else_block) = &stmt.else_block {
            self.indent();
            self.buf.text("else");
            self.buf.eol();
            self.nested(else_block)?;
        }
        self.indent();
        self.buf.text("end if");
        Ok(())
    }

    fn inline_if(&mut self, stmt: &IfStmt) -> CodegenResult<()> {
        for (i, clause) in stmt.clauses.iter().enumerate() {
            self.buf.text(if i > 0 { " else if " } else { "if " });
            self.expr(&clause.condition)?;
            self.buf.text(" then ");
            self.inline_body(&clause.body)?;
        }
        if let Some(else_block) = &stmt.else_block {
            self.buf.text(" else ");
            self.inline_body(else_block)?;
        }
        Ok(())
    }

    fn inline_body(&mut self, block: &Block) -> CodegenResult<()> {
        match block.stmts.as_slice() {
            [stmt] => self.statement_body(stmt),
            _ => Err(CodegenError::Internal(format!(
                "single-line if body with {} statements",
                block.stmts.len()
            ))),
        }
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

    /// Inline an included module's statements, once per chunk.
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
                let lines = (expr.span.start_line, expr.span.end_line);
                return self.sequence(("[", "]"), items, lines, &expr.comments.inner, |g, item| {
                    g.expr(item)
                });
            }
            ExprKind::Map(entries) => {
                let lines = (expr.span.start_line, expr.span.end_line);
                return self.sequence(("{", "}"), entries, lines, &expr.comments.inner, |g, entry| {
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
                let lines = (base.span.end_line, expr.span.end_line);
                let index = std::slice::from_ref(&**index);
                return self.sequence(("[", "]"), index, lines, &expr.comments.inner, |g, index| {
                    g.expr(index)
                });
            }
            ExprKind::Slice { base, start, end } => {
                self.expr(base)?;
                self.buf.text("[");
                let mut cursor = Cursor::new(base.span.end_line);
                if let Some(start) = start {
                    self.part(&**start, &mut cursor, false, |g, start| g.expr(start))?;
                }
                self.buf.text(":");
                if let Some(end) = end {
                    self.part(&**end, &mut cursor, false, |g, end| g.expr(end))?;
                }
                self.flush_trailing(&mut cursor);
                self.attached_comments(&expr.comments.inner, &mut cursor);
                self.close("]", cursor, expr.span.end_line);
            }
            ExprKind::Call { callee, args } => {
                if let Some(path) = directives::native_import(self.ctx, self.active, callee, args) {
                    self.buf
                        .text(format!("{}({})", directives::NATIVE_IMPORT, quote(&path)));
                    return Ok(());
                }
                self.expr(callee)?;
                let lines = (callee.span.end_line, expr.span.end_line);
                return self.sequence(("(", ")"), args, lines, &expr.comments.inner, |g, arg| {
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
            ExprKind::Paren(inner) => {
                let lines = (expr.span.start_line, expr.span.end_line);
                let inner = std::slice::from_ref(&**inner);
                return self.sequence(("(", ")"), inner, lines, &[], |g, inner| g.expr(inner));
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

    /// `left op right`, breaking after the operator where the source did.
    fn binary(&mut self, left: &Expr, op: &str, right: &Expr) -> CodegenResult<()> {
        self.expr(left)?;
        self.buf.text(format!(" {op}"));
        if right.span.start_line > left.span.end_line {
            let mut cursor = Cursor::new(left.span.end_line);
            self.attached_comments(&right.comments.leading, &mut cursor);
            if !cursor.fresh {
                self.buf.eol();
            }
            self.depth += 1;
            self.indent();
            let result = self.expr(right);
            self.depth -= 1;
            return result;
        }
        self.buf.text(" ");
        self.expr(right)
    }

    /// A bracketed, comma-separated list whose items keep their source lines.
    /// `lines` are the lines of the opening and closing brackets.
    fn sequence<T: SequenceItem>(
        &mut self,
        (open, close): (&str, &str),
        items: &[T],
        lines: (u32, u32),
        inner: &[Comment],
        emit: fn(&mut Self, &T) -> CodegenResult<()>,
    ) -> CodegenResult<()> {
        self.buf.text(open);
        let mut cursor = Cursor::new(lines.0);
        if items.is_empty() {
            self.attached_comments(inner, &mut cursor);
        }
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.buf.text(",");
            }
            self.part(item, &mut cursor, i > 0, emit)?;
        }
        self.close(close, cursor, lines.1);
        Ok(())
    }

    /// One item between brackets with its comments. Trailing comments are
    /// held back until after the separator that follows the item.
    fn part<T: SequenceItem>(
        &mut self,
        item: &T,
        cursor: &mut Cursor,
        spaced: bool,
        emit: fn(&mut Self, &T) -> CodegenResult<()>,
    ) -> CodegenResult<()> {
        self.flush_trailing(cursor);
        let comments = item.item_comments();
        self.attached_comments(&comments.leading, cursor);
        let span = item.item_span();
        if cursor.fresh || span.start_line > cursor.line {
            if !cursor.fresh {
                self.buf.eol();
            }
            cursor.fresh = false;
            cursor.broken = true;
            self.indent_in();
        } else if spaced {
            self.buf.text(" ");
        }
        if cursor.broken {
            self.depth += 1;
        }
        let result = emit(self, item);
        if cursor.broken {
            self.depth -= 1;
        }
        result?;
        cursor.line = span.end_line;
        cursor.held = comments.trailing.clone();
        Ok(())
    }

    fn flush_trailing(&mut self, cursor: &mut Cursor) {
        let held = std::mem::take(&mut cursor.held);
        self.attached_comments(&held, cursor);
    }

    /// Own-line comments one level in. A comment on the cursor's line
    /// continues that line instead.
    fn attached_comments(&mut self, comments: &[Comment], cursor: &mut Cursor) {
        for comment in comments {
            if !cursor.fresh && comment.span.start_line == cursor.line {
                self.buf.comment(comment.text.as_str(), true);
            } else {
                if !cursor.fresh {
                    self.buf.eol();
                }
                self.indent_in();
                self.buf.comment(comment.text.as_str(), false);
            }
            self.buf.eol();
            cursor.fresh = true;
            cursor.line = comment.span.end_line;
        }
    }

    fn close(&mut self, close: &str, mut cursor: Cursor, close_line: u32) {
        self.flush_trailing(&mut cursor);
        if cursor.fresh {
            self.indent();
        } else if close_line > cursor.line {
            self.buf.eol();
            self.indent();
        }
        self.buf.text(close);
    }

    fn indent_in(&mut self) {
        self.depth += 1;
        self.indent();
        self.depth -= 1;
    }

    fn function(&mut self, func: &FunctionExpr, inner: &[Comment]) -> CodegenResult<()> {
        self.buf.text("function");
        if !func.params.is_empty() || !inner.is_empty() {
            let line = func.span.start_line;
            self.sequence(("(", ")"), &func.params, (line, line), inner, |g, param| {
                g.buf.text(param.name.name.as_str());
                if let Some(default) = &param.default {
                    g.buf.text(" = ");
                    g.expr(default)?;
                }
                Ok(())
            })?;
        }
        self.buf.eol();
        self.nested(&func.body)?;
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
    }
}

impl<'a> CodeGenerator<'a> for Verbatim<'a> {
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

/// Where emission stands inside a bracket pair.
#[derive(Debug)]
struct Cursor {
    /// Last source line emitted.
    line: u32,
    /// A comment just ended the output line.
    fresh: bool,
    /// An item was moved to its own line; later items nest one level in.
    broken: bool,
    /// Trailing comments of the last item, emitted after its separator.
    held: Vec<Comment>,
}

impl Cursor {
    fn new(line: u32) -> Self {
        Self {
            line,
            fresh: false,
            broken: false,
            held: Vec::new(),
        }
    }
}
