//! miniforge code generation: turns a parsed [`Chunk`] back into source
//! text.
//!
//! # Strategies
//!
//! All three strategies implement [`CodeGenerator`]:
//!
//! - [`Verbatim`] reproduces the source layout, comments included.
//! - [`Minified`] drops comments, renames identifiers, hoists repeated
//!   literals and rewrites bitwise operators into calls.
//! - [`Reformatted`] re-derives a canonical layout from node positions.
//!
//! # Naming
//!
//! Generators never allocate names. Every module id, identifier and
//! hoisted literal slot is seeded into the [`CompilationContext`] before
//! generation starts, so renaming is consistent across every module of
//! one compilation.
//!
//! # Modules
//!
//! A generator sees the rest of the program only through [`ModuleGraph`].
//! Imports resolve to module lookups, includes are inlined once per
//! rendered chunk, and injected files become string literals.

pub mod buffer;
pub mod context;
mod directives;
pub mod error;
pub mod graph;
pub mod literals;
pub mod minify;
pub mod namespace;
pub mod options;
pub mod reformat;
pub mod reserved;
pub mod verbatim;

pub use context::{CompilationContext, ImportPathRewriter};
pub use error::{CodegenError, CodegenResult};
pub use graph::{ActiveModule, ModuleGraph, ModuleId};
pub use literals::{LiteralInterner, LiteralRecord};
pub use minify::Minified;
pub use namespace::{NamespaceGenerator, DEFAULT_ALPHABET};
pub use options::{BuildMode, CompileOptions, IndentationStyle, ModeOptions};
pub use reformat::Reformatted;
pub use verbatim::Verbatim;

use miniforge_types::ast::Chunk;

/// Shared contract of the output strategies.
///
/// One instance renders one compiled output, a chunk per call. A module
/// included several times from one chunk is inlined the first time only;
/// every chunk inlines its own includes, since a registered module's
/// definitions are local to its module function.
pub trait CodeGenerator<'a> {
    /// Render `chunk` as top-level code. `active` is the module the chunk
    /// belongs to, if it came from a module graph.
    fn transform(&mut self, chunk: &Chunk, active: Option<ActiveModule<'a>>) -> CodegenResult<String>;

    /// Render `chunk` wrapped as the registered module `namespace`.
    fn transform_module(
        &mut self,
        namespace: &str,
        chunk: &Chunk,
        active: ActiveModule<'a>,
    ) -> CodegenResult<String>;
}

/// Create the generator for `mode`.
pub fn generator<'a>(mode: BuildMode, ctx: &'a CompilationContext) -> Box<dyn CodeGenerator<'a> + 'a> {
    tracing::trace!(?mode, "creating generator");
    match mode {
        BuildMode::Verbatim => Box::new(Verbatim::new(ctx)),
        BuildMode::Minified => Box::new(Minified::new(ctx)),
        BuildMode::Reformatted => Box::new(Reformatted::new(ctx)),
    }
}

/// Render a standalone chunk with the strategy selected by the context's
/// options. Imports and includes stay textual since there is no graph.
pub fn generate(ctx: &CompilationContext, chunk: &Chunk) -> CodegenResult<String> {
    let mode = ctx.options().mode;
    let output = generator(mode, ctx).transform(chunk, None)?;
    tracing::debug!(?mode, bytes = output.len(), "generated chunk");
    Ok(output)
}
