//! Output assembly for one compiled target.
//!
//! Seeding runs first and covers every module, so names and hoisted
//! literals are consistent across the whole output. Generation then
//! emits, in order: the hoisting preamble, the module runtime (only when
//! a module is imported), one registered chunk per imported module, and
//! the entry module's code.

use miniforge_codegen::{
    generator, ActiveModule, BuildMode, CompilationContext, CompileOptions, ImportPathRewriter,
    ModuleGraph, ModuleId,
};
use miniforge_types::ast::Chunk;
use tracing::{debug, info};

use crate::boilerplate::{self, HEADER_PATH};
use crate::dependency::DependencyGraph;
use crate::error::{BuildError, BuildResult};

/// Compiles one resolved graph into one output text.
pub struct Target<'g> {
    graph: &'g DependencyGraph,
    options: &'g CompileOptions,
    rewriter: Option<ImportPathRewriter>,
}

impl<'g> Target<'g> {
    pub fn new(graph: &'g DependencyGraph, options: &'g CompileOptions) -> Self {
        Self {
            graph,
            options,
            rewriter: None,
        }
    }

    pub fn with_import_path_rewriter(mut self, rewriter: Option<ImportPathRewriter>) -> Self {
        self.rewriter = rewriter;
        self
    }

    pub fn build(&self) -> BuildResult<String> {
        let graph = self.graph;
        let entry = graph.entry();
        let entry_path = graph.path(entry);
        let dev_mode = self.options.mode_options.dev_mode;

        let modules: Vec<ModuleId> = if dev_mode {
            Vec::new()
        } else {
            graph.imported_modules().collect()
        };
        let header = if modules.is_empty() {
            None
        } else {
            Some(boilerplate::header()?)
        };

        let ctx = self.context(header.as_ref());
        let mode = self.options.mode;
        let mut codegen = generator(mode, &ctx);
        let mut parts = Vec::new();

        if !dev_mode {
            parts.push(boilerplate::preamble(&ctx));
        }
        if let Some(header) = &header {
            parts.push(
                codegen
                    .transform(header, None)
                    .map_err(|e| BuildError::codegen(HEADER_PATH, e))?,
            );
        }
        for id in modules {
            let path = graph.path(id);
            let namespace = ctx.module_namespace(path);
            debug!(path, namespace = %namespace, "generating module");
            let chunk = codegen
                .transform_module(&namespace, graph.chunk(id), ActiveModule::new(graph, id))
                .map_err(|e| BuildError::codegen(path, e))?;
            parts.push(chunk);
        }
        debug!(path = entry_path, "generating entry");
        parts.push(
            codegen
                .transform(graph.chunk(entry), Some(ActiveModule::new(graph, entry)))
                .map_err(|e| BuildError::codegen(entry_path, e))?,
        );

        let separator = if mode == BuildMode::Minified { "\n" } else { "\n\n" };
        let output = parts
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(separator);
        info!(
            entry = entry_path,
            ?mode,
            modules = graph.len(),
            bytes = output.len(),
            "target built"
        );
        Ok(output)
    }

    /// Seed module ids, then identifiers, then literals, all in discovery
    /// order, and decide which literals are hoisted.
    fn context(&self, header: Option<&Chunk>) -> CompilationContext {
        let mut ctx = CompilationContext::new(self.options.clone());
        if let Some(rewriter) = &self.rewriter {
            ctx = ctx.with_import_path_rewriter(rewriter.clone());
        }
        for (_, node) in self.graph.modules() {
            ctx.seed_module(node.path());
        }
        if let Some(header) = header {
            ctx.seed_identifiers(header.identifiers());
        }
        for (_, node) in self.graph.modules() {
            ctx.seed_identifiers(node.chunk().identifiers());
        }
        for (_, node) in self.graph.modules() {
            ctx.seed_literals(&node.chunk().literals);
        }
        let hoisted = ctx.finalize_literals();
        debug!(
            modules = ctx.modules().len(),
            variables = ctx.variables().len(),
            literals = ctx.literals().len(),
            hoisted,
            "context seeded"
        );
        ctx
    }
}
