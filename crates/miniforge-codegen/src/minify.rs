//! Minified strategy: smallest equivalent output.
//!
//! Comments and debugger markers are dropped, identifiers are renamed when
//! obfuscating, repeated literals are replaced by their hoisted slot, and
//! `|` / `&` become `bitOr` / `bitAnd` calls.

use std::collections::HashSet;

use miniforge_types::ast::*;

use crate::buffer::LineBuffer;
use crate::context::CompilationContext;
use crate::directives;
use crate::error::{CodegenError, CodegenResult};
use crate::graph::{ActiveModule, ModuleId};
use crate::CodeGenerator;

/// Minifying code generator.
pub struct Minified<'a> {
    ctx: &'a CompilationContext,
    active: Option<ActiveModule<'a>>,
    buf: LineBuffer,
    included: HashSet<ModuleId>,
    /// Nesting of call argument lists and parameter defaults, where
    /// literals are emitted as written.
    literal_guard: usize,
}

impl<'a> Minified<'a> {
    pub fn new(ctx: &'a CompilationContext) -> Self {
        Self {
            ctx,
            active: None,
            buf: LineBuffer::new(),
            included: HashSet::new(),
            literal_guard: 0,
        }
    }

    fn dev_mode(&self) -> bool {
        self.ctx.dev_mode()
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Statements
    // ══════════════════════════════════════════════════════════════════════════

    fn block(&mut self, stmts: &[Stmt]) -> CodegenResult<()> {
        stmts.iter().try_for_each(|stmt| self.statement(stmt))
    }

    fn statement(&mut self, stmt: &Stmt) -> CodegenResult<()> {
        match stmt {
            Stmt::Comment(_) => return Ok(()),
            Stmt::Debugger(_) if !self.dev_mode() => return Ok(()),
            Stmt::Include(include) => {
                if let Some(module) = self.include_target(include) {
                    return self.inline_module(module);
                }
            }
            _ => {}
        }
        self.statement_body(stmt)?;
        self.buf.eol();
        Ok(())
    }

    fn statement_body(&mut self, stmt: &Stmt) -> CodegenResult<()> {
        match stmt {
            Stmt::Assign(assign) => {
                self.expr(&assign.target)?;
                self.buf.text(assign.op.map_or("=", |op| op.as_str()));
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
            Stmt::If(stmt) if stmt.inline => self.inline_if(stmt),
            Stmt::If(stmt) => self.block_if(stmt),
            Stmt::While(stmt) => {
                self.buf.text("while ");
                self.expr(&stmt.condition)?;
                self.buf.eol();
                self.block(&stmt.body.stmts)?;
                self.buf.text("end while");
                Ok(())
            }
            Stmt::For(stmt) => {
                self.buf.text(format!(
                    "for {} in ",
                    self.ctx.identifier(&stmt.variable.name)
                ));
                self.expr(&stmt.iterable)?;
                self.buf.eol();
                self.block(&stmt.body.stmts)?;
                self.buf.text("end for");
                Ok(())
            }
            // Only reached from a single-line `if` body.
            Stmt::Comment(_) => Ok(()),
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
                }
                Ok(())
            }
        }
    }

    fn block_if(&mut self, stmt: &IfStmt) -> CodegenResult<()> {
        for (i, clause) in stmt.clauses.iter().enumerate() {
            self.buf.text(if i > 0 { "else if " } else { "if " });
            self.expr(&clause.condition)?;
            self.buf.text(" then");
            self.buf.eol();
            self.block(&clause.body.stmts)?;
        }
        if let Some(else_block) = &stmt.else_block {
            self.buf.text("else");
            self.buf.eol();
            self.block(&else_block.stmts)?;
        }
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
                    "{}={}({})",
                    self.ctx.identifier(&import.name.name),
                    self.ctx.runtime_name("__REQUIRE"),
                    quote(&namespace)
                ));
            }
            None => self.buf.text(directives::import_directive(
                self.ctx.identifier(&import.name.name),
                &import.path,
            )),
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
        let result = self.block(&module.chunk().body);
        self.active = outer;
        result
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Expressions
    // ══════════════════════════════════════════════════════════════════════════

    fn expr(&mut self, expr: &Expr) -> CodegenResult<()> {
        match &expr.kind {
            ExprKind::Literal(literal) => {
                let hoisted = if self.literal_guard == 0 {
                    self.ctx.hoisted(literal)
                } else {
                    None
                };
                match hoisted {
                    Some(slot) => self.buf.text(slot),
                    None => self.buf.text(literal.raw()),
                }
            }
            ExprKind::List(items) => {
                self.buf.text("[");
                self.comma_separated(items)?;
                self.buf.text("]");
            }
            ExprKind::Map(entries) => {
                self.buf.text("{");
                for (i, entry) in entries.iter().enumerate() {
                    if i > 0 {
                        self.buf.text(",");
                    }
                    self.expr(&entry.key)?;
                    self.buf.text(":");
                    self.expr(&entry.value)?;
                }
                self.buf.text("}");
            }
            ExprKind::Identifier(name) => self.buf.text(self.ctx.identifier(name)),
            ExprKind::Member { base, member } => {
                self.expr(base)?;
                self.buf.text(format!(".{}", member.name));
            }
            ExprKind::Index { base, index } => {
                self.expr(base)?;
                self.buf.text("[");
                self.expr(index)?;
                self.buf.text("]");
            }
            ExprKind::Slice { base, start, end } => {
                self.expr(base)?;
                self.buf.text("[");
                if let Some(start) = start {
                    self.expr(start)?;
                }
                self.buf.text(":");
                if let Some(end) = end {
                    self.expr(end)?;
                }
                self.buf.text("]");
            }
            ExprKind::Call { callee, args } => {
                if let Some(path) = directives::native_import(self.ctx, self.active, callee, args) {
                    self.buf
                        .text(format!("{}({})", directives::NATIVE_IMPORT, quote(&path)));
                    return Ok(());
                }
                self.expr(callee)?;
                self.buf.text("(");
                self.literal_guard += 1;
                let result = self.comma_separated(args);
                self.literal_guard -= 1;
                result?;
                self.buf.text(")");
            }
            ExprKind::Binary { left, op, right } => return self.binary(expr, left, *op, right),
            ExprKind::Logical { left, op, right } => {
                self.expr(left)?;
                self.buf.text(format!(" {} ", op.as_str()));
                self.expr(right)?;
            }
            ExprKind::Comparison { left, op, right } => {
                self.expr(left)?;
                match op {
                    ComparisonOp::Isa => self.buf.text(" isa "),
                    op => self.buf.text(op.as_str()),
                }
                self.expr(right)?;
            }
            ExprKind::Unary { op, operand } => {
                self.buf.text(op.as_str());
                if op.is_keyword() {
                    self.buf.text(" ");
                }
                self.expr(operand)?;
            }
            ExprKind::Function(func) => return self.function(func),
            ExprKind::Paren(inner) => {
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

    fn binary(&mut self, expr: &Expr, left: &Expr, op: BinaryOp, right: &Expr) -> CodegenResult<()> {
        let call = match op {
            BinaryOp::BitOr => "bitOr",
            BinaryOp::BitAnd => "bitAnd",
            op if op.is_shift() => {
                return Err(CodegenError::UnsupportedOperator {
                    operator: op.as_str().to_string(),
                    span: expr.span,
                });
            }
            op => {
                self.expr(left)?;
                self.buf.text(op.as_str());
                return self.expr(right);
            }
        };
        self.buf.text(format!("{call}("));
        self.expr(left)?;
        self.buf.text(",");
        self.expr(right)?;
        self.buf.text(")");
        Ok(())
    }

    fn comma_separated(&mut self, items: &[Expr]) -> CodegenResult<()> {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.buf.text(",");
            }
            self.expr(item)?;
        }
        Ok(())
    }

    fn function(&mut self, func: &FunctionExpr) -> CodegenResult<()> {
        self.buf.text("function");
        if !func.params.is_empty() {
            self.buf.text("(");
            for (i, param) in func.params.iter().enumerate() {
                if i > 0 {
                    self.buf.text(",");
                }
                self.buf.text(self.ctx.identifier(&param.name.name));
                if let Some(default) = &param.default {
                    self.buf.text("=");
                    self.literal_guard += 1;
                    let result = self.expr(default);
                    self.literal_guard -= 1;
                    result?;
                }
            }
            self.buf.text(")");
        }
        self.buf.eol();
        self.block(&func.body.stmts)?;
        self.buf.text("end function");
        Ok(())
    }

    /// Start a new chunk. Include guards do not cross chunk boundaries.
    fn reset(&mut self, active: Option<ActiveModule<'a>>) {
        self.active = active;
        self.buf = LineBuffer::new();
        self.included.clear();
        self.literal_guard = 0;
    }
}

impl<'a> CodeGenerator<'a> for Minified<'a> {
    fn transform(&mut self, chunk: &Chunk, active: Option<ActiveModule<'a>>) -> CodegenResult<String> {
        self.reset(active);
        self.block(&chunk.body)?;
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
            "{}[{}]=function({})",
            self.ctx.runtime_name("__MODULES"),
            quote(namespace),
            self.ctx.runtime_name("module")
        ));
        self.buf.eol();
        self.block(&chunk.body)?;
        self.buf.text("end function");
        Ok(std::mem::take(&mut self.buf).join())
    }
}
