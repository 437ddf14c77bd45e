//! Syntax tree for the miniforge scripting language.
//!
//! Every node carries a [`Span`]; spans are only consulted for blank-line
//! and comment placement when output is re-laid out. Recursive variants
//! are boxed. Node order always follows source order.

use crate::Span;

// ══════════════════════════════════════════════════════════════════════════════
// Chunk (one parsed file)
// ══════════════════════════════════════════════════════════════════════════════

/// One parsed source file plus the metadata later stages need without
/// walking the tree again.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Chunk {
    pub body: Vec<Stmt>,
    /// `#import name from "path";` targets, in source order.
    pub imports: Vec<Reference>,
    /// `#include "path";` targets, in source order.
    pub includes: Vec<Reference>,
    /// `#inject "path";` targets, in source order.
    pub injects: Vec<Reference>,
    /// `import_code("path")` calls with a literal path, in source order.
    pub native_imports: Vec<Reference>,
    /// Every literal node, in source order.
    pub literals: Vec<Literal>,
    /// Lexical scopes: the top level first, then one per function literal.
    pub scopes: Vec<Scope>,
    pub span: Span,
}

impl Chunk {
    /// Iterate every identifier name of every scope, in scope order.
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.scopes
            .iter()
            .flat_map(|scope| scope.identifiers.iter().map(String::as_str))
    }
}

/// A file reference made by a directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// The path exactly as written in source.
    pub path: String,
    pub span: Span,
}

/// A lexical scope and the identifier names it mentions.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Scope {
    /// Distinct names in first-appearance order.
    pub identifiers: Vec<String>,
    pub span: Span,
}

// ══════════════════════════════════════════════════════════════════════════════
// Identifiers & Blocks
// ══════════════════════════════════════════════════════════════════════════════

/// A spanned identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

/// A statement list. The span ends on the line of the keyword that
/// closes the block (`end …`, `else`).
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

// ══════════════════════════════════════════════════════════════════════════════
// Statements
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `target = value`, `target += value`, …
    Assign(AssignStmt),
    /// `f(a, b)` or command form `f a, b`
    Call(CallStmt),
    /// A bare expression (`x`, `a.b`).
    Expr(ExprStmt),
    /// `return [value]`
    Return(ReturnStmt),
    /// `break`
    Break(Span),
    /// `continue`
    Continue(Span),
    /// `if … then … end if` and the single-line form
    If(IfStmt),
    /// `while cond … end while`
    While(WhileStmt),
    /// `for x in iterable … end for`
    For(ForStmt),
    /// `// text`
    Comment(Comment),
    /// `#import name from "path";`
    Import(ImportDirective),
    /// `#include "path";`
    Include(IncludeDirective),
    /// `#debugger;`
    Debugger(Span),
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::Assign(s) => s.span,
            Stmt::Call(s) => s.span,
            Stmt::Expr(s) => s.span,
            Stmt::Return(s) => s.span,
            Stmt::Break(span) | Stmt::Continue(span) | Stmt::Debugger(span) => *span,
            Stmt::If(s) => s.span,
            Stmt::While(s) => s.span,
            Stmt::For(s) => s.span,
            Stmt::Comment(s) => s.span,
            Stmt::Import(s) => s.span,
            Stmt::Include(s) => s.span,
        }
    }

    /// Stable variant name, used in diagnostics and structural comparisons.
    pub fn variant_name(&self) -> &'static str {
        match self {
            Stmt::Assign(_) => "Assign",
            Stmt::Call(_) => "Call",
            Stmt::Expr(_) => "Expr",
            Stmt::Return(_) => "Return",
            Stmt::Break(_) => "Break",
            Stmt::Continue(_) => "Continue",
            Stmt::If(_) => "If",
            Stmt::While(_) => "While",
            Stmt::For(_) => "For",
            Stmt::Comment(_) => "Comment",
            Stmt::Import(_) => "Import",
            Stmt::Include(_) => "Include",
            Stmt::Debugger(_) => "Debugger",
        }
    }
}

/// Compound assignment operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
}

impl AssignOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignOp::Add => "+=",
            AssignOp::Sub => "-=",
            AssignOp::Mul => "*=",
            AssignOp::Div => "/=",
            AssignOp::Mod => "%=",
            AssignOp::Pow => "^=",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssignStmt {
    pub target: Expr,
    /// `None` for plain `=`.
    pub op: Option<AssignOp>,
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallStmt {
    /// Always an [`ExprKind::Call`].
    pub call: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExprStmt {
    pub expr: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStmt {
    pub value: Option<Expr>,
    pub span: Span,
}

/// `if` with any number of `else if` clauses and an optional `else`.
#[derive(Debug, Clone, PartialEq)]
pub struct IfStmt {
    /// The `if` clause followed by every `else if` clause.
    pub clauses: Vec<IfClause>,
    pub else_block: Option<Block>,
    /// Written on a single line (`if c then a else b`).
    pub inline: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfClause {
    pub condition: Expr,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileStmt {
    pub condition: Expr,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForStmt {
    pub variable: Ident,
    pub iterable: Expr,
    pub body: Block,
    pub span: Span,
}

/// A line comment. `text` excludes the leading `//`.
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub text: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportDirective {
    pub name: Ident,
    pub path: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IncludeDirective {
    pub path: String,
    pub span: Span,
}

// ══════════════════════════════════════════════════════════════════════════════
// Expressions
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
    /// Comments around the expression where a line break is
    /// insignificant: inside brackets and after an operator.
    pub comments: Comments,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self {
            kind,
            span,
            comments: Comments::default(),
        }
    }

    /// Expressions that never need surrounding parentheses. A negated
    /// number literal is not atomic: `(-2)^2` differs from `-2^2`.
    pub fn is_atomic(&self) -> bool {
        if let ExprKind::Literal(Literal::Number(number)) = &self.kind {
            return !number.negated;
        }
        matches!(
            self.kind,
            ExprKind::Literal(_)
                | ExprKind::Identifier(_)
                | ExprKind::Member { .. }
                | ExprKind::Index { .. }
                | ExprKind::Slice { .. }
                | ExprKind::Call { .. }
                | ExprKind::List(_)
                | ExprKind::Map(_)
                | ExprKind::Paren(_)
                | ExprKind::Envar(_)
                | ExprKind::Inject(_)
                | ExprKind::Line
                | ExprKind::Filename
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    // ── Literals ──
    /// `42`, `"text"`, `true`, `null`
    Literal(Literal),
    /// `[a, b]`
    List(Vec<Expr>),
    /// `{ key: value }`
    Map(Vec<MapEntry>),

    // ── Names & access ──
    /// `name`
    Identifier(String),
    /// `base.member`
    Member { base: Box<Expr>, member: Ident },
    /// `base[index]`
    Index { base: Box<Expr>, index: Box<Expr> },
    /// `base[start:end]`
    Slice {
        base: Box<Expr>,
        start: Option<Box<Expr>>,
        end: Option<Box<Expr>>,
    },
    /// `callee(args...)`
    Call { callee: Box<Expr>, args: Vec<Expr> },

    // ── Operators ──
    /// Arithmetic and bitwise operators.
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    /// `and` / `or`
    Logical {
        left: Box<Expr>,
        op: LogicalOp,
        right: Box<Expr>,
    },
    /// `==`, `<`, `isa`, …
    Comparison {
        left: Box<Expr>,
        op: ComparisonOp,
        right: Box<Expr>,
    },
    /// `-x`, `not x`, `new x`, `@x`
    Unary { op: UnaryOp, operand: Box<Expr> },

    // ── Functions & grouping ──
    /// `function(params) … end function`
    Function(Box<FunctionExpr>),
    /// `(expr)`
    Paren(Box<Expr>),

    // ── Directives ──
    /// `#envar NAME;`
    Envar(String),
    /// `#inject "path";`
    Inject(String),
    /// `#line;`
    Line,
    /// `#filename;`
    Filename,
}

/// Literal constants.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(NumberLit),
    String(StringLit),
    Bool(bool),
    Null,
}

impl Literal {
    /// Source text of the literal.
    pub fn raw(&self) -> String {
        match self {
            Literal::Number(n) => n.raw(),
            Literal::String(s) => s.raw.clone(),
            Literal::Bool(true) => "true".to_string(),
            Literal::Bool(false) => "false".to_string(),
            Literal::Null => "null".to_string(),
        }
    }
}

/// A number literal. A unary minus applied directly to a literal is
/// folded into `negated`; `value` and `unsigned_raw` stay unsigned.
#[derive(Debug, Clone, PartialEq)]
pub struct NumberLit {
    pub value: f64,
    pub unsigned_raw: String,
    pub negated: bool,
}

impl NumberLit {
    pub fn raw(&self) -> String {
        if self.negated {
            format!("-{}", self.unsigned_raw)
        } else {
            self.unsigned_raw.clone()
        }
    }
}

/// A string literal. `raw` includes the quotes and doubled-quote escapes.
#[derive(Debug, Clone, PartialEq)]
pub struct StringLit {
    pub value: String,
    pub raw: String,
}

impl StringLit {
    /// Build a literal from its value, escaping embedded quotes.
    pub fn from_value(value: impl Into<String>) -> Self {
        let value = value.into();
        let raw = quote(&value);
        Self { value, raw }
    }
}

/// Quote a string for embedding in source, doubling every `"`.
pub fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapEntry {
    pub key: Expr,
    pub value: Expr,
    pub span: Span,
    /// Comments before the entry, and after it or around its `:`.
    pub comments: Comments,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionExpr {
    pub params: Vec<Param>,
    pub body: Block,
    pub span: Span,
}

/// A function parameter: `name` or `name = default`.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: Ident,
    pub default: Option<Expr>,
    pub span: Span,
    pub comments: Comments,
}

/// Line comments attached to a node that sits between brackets.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Comments {
    /// Own-line comments before the node.
    pub leading: Vec<Comment>,
    /// Comments after the node and its separator. Only the first one can
    /// share the node's last line.
    pub trailing: Vec<Comment>,
    /// Comments inside an empty bracket pair the node owns, as in `[ // todo ]`.
    pub inner: Vec<Comment>,
}

impl Comments {
    pub fn is_empty(&self) -> bool {
        self.leading.is_empty() && self.trailing.is_empty() && self.inner.is_empty()
    }
}

/// A node of a bracketed, comma-separated sequence.
pub trait SequenceItem {
    fn item_span(&self) -> Span;
    fn item_comments(&self) -> &Comments;
    fn item_comments_mut(&mut self) -> &mut Comments;
}

impl SequenceItem for Expr {
    fn item_span(&self) -> Span {
        self.span
    }

    fn item_comments(&self) -> &Comments {
        &self.comments
    }

    fn item_comments_mut(&mut self) -> &mut Comments {
        &mut self.comments
    }
}

impl SequenceItem for MapEntry {
    fn item_span(&self) -> Span {
        self.span
    }

    fn item_comments(&self) -> &Comments {
        &self.comments
    }

    fn item_comments_mut(&mut self) -> &mut Comments {
        &mut self.comments
    }
}

impl SequenceItem for Param {
    fn item_span(&self) -> Span {
        self.span
    }

    fn item_comments(&self) -> &Comments {
        &self.comments
    }

    fn item_comments_mut(&mut self) -> &mut Comments {
        &mut self.comments
    }
}

// ── Operators ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    BitOr,
    BitAnd,
    ShiftLeft,
    ShiftRight,
    UnsignedShiftRight,
}

impl BinaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "^",
            BinaryOp::BitOr => "|",
            BinaryOp::BitAnd => "&",
            BinaryOp::ShiftLeft => "<<",
            BinaryOp::ShiftRight => ">>",
            BinaryOp::UnsignedShiftRight => ">>>",
        }
    }

    pub fn is_shift(&self) -> bool {
        matches!(
            self,
            BinaryOp::ShiftLeft | BinaryOp::ShiftRight | BinaryOp::UnsignedShiftRight
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

impl LogicalOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalOp::And => "and",
            LogicalOp::Or => "or",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Eq,
    NotEq,
    Less,
    Greater,
    LessEq,
    GreaterEq,
    Isa,
}

impl ComparisonOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonOp::Eq => "==",
            ComparisonOp::NotEq => "!=",
            ComparisonOp::Less => "<",
            ComparisonOp::Greater => ">",
            ComparisonOp::LessEq => "<=",
            ComparisonOp::GreaterEq => ">=",
            ComparisonOp::Isa => "isa",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `-x`
    Neg,
    /// `not x`
    Not,
    /// `new x`
    New,
    /// `@x`
    AddressOf,
}

impl UnaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "not",
            UnaryOp::New => "new",
            UnaryOp::AddressOf => "@",
        }
    }

    /// Keyword operators need a space before their operand.
    pub fn is_keyword(&self) -> bool {
        matches!(self, UnaryOp::Not | UnaryOp::New)
    }
}
