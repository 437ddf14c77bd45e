//! miniforge parser: converts a token stream into a [`Chunk`].
//!
//! Besides the statement tree, the parser records the metadata later
//! stages consume without re-walking the tree: directive references,
//! literal nodes and per-scope identifier names.

mod parse_directive;
mod parse_expr;
mod parse_stmt;
mod parser;

pub use parser::{ParseResult, Parser};

use miniforge_lexer::Lexer;
use miniforge_types::ast::Chunk;
use miniforge_types::{CompileErrors, SourceFile};

/// Lex and parse `source`, failing with every collected diagnostic.
pub fn parse(source: &str, filename: &str) -> Result<Chunk, CompileErrors> {
    let sf = SourceFile::new(filename, source);
    let lexed = Lexer::new(&sf).lex();
    let mut errors = lexed.errors;
    let result = Parser::new(lexed.tokens, &sf).parse();
    errors.extend(result.errors);
    if errors.has_errors() {
        Err(errors)
    } else {
        Ok(result.chunk)
    }
}
