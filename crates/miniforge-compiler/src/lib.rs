//! miniforge compiler: turns a multi-file MiniScript program into
//! standalone outputs.
//!
//! ```text
//! entry → ResourceGraphLoader → DependencyGraph → Target → output text
//! ```
//!
//! [`compile_source`] compiles one self-contained source text.
//! [`Transpiler`] loads an entry file and everything it references
//! through a [`ResourceHandler`], then builds one output for the entry
//! and one per native import boundary.

pub mod boilerplate;
pub mod dependency;
pub mod error;
pub mod loader;
pub mod resource;
pub mod target;

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use tracing::{debug, info};

pub use dependency::{DependencyGraph, DependencyKind, DependencyNode};
pub use error::{BuildError, BuildErrorKind, BuildResult};
pub use loader::{LoadState, Resource, ResourceGraphLoader};
pub use miniforge_codegen::{
    BuildMode, CompileOptions, ImportPathRewriter, IndentationStyle, ModeOptions,
};
pub use resource::{FileSystemResourceHandler, MemoryResourceHandler, ResourceHandler};
pub use target::Target;

/// Compile a single source text. Directives that reference other files
/// are left unresolved.
pub fn compile_source(
    source: &str,
    filename: &str,
    options: &CompileOptions,
) -> BuildResult<String> {
    let chunk = miniforge_parser::parse(source, filename)
        .map_err(|errors| BuildError::syntax(filename, errors))?;
    let graph = DependencyGraph::single(filename, source, chunk);
    Target::new(&graph, options).build()
}

/// Multi-file compilation through a resource handler.
pub struct Transpiler {
    handler: Arc<dyn ResourceHandler>,
    options: CompileOptions,
    rewriter: Option<ImportPathRewriter>,
}

impl Transpiler {
    pub fn new(handler: Arc<dyn ResourceHandler>, options: CompileOptions) -> Self {
        Self {
            handler,
            options,
            rewriter: None,
        }
    }

    /// Rewrite native import paths in emitted `import_code(...)` calls.
    pub fn with_import_path_rewriter(mut self, rewriter: ImportPathRewriter) -> Self {
        self.rewriter = Some(rewriter);
        self
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Compile `entry`. The result maps each output's resolved path to its
    /// text: the entry first, then every native import target.
    pub async fn compile(&self, entry: &str) -> BuildResult<BTreeMap<String, String>> {
        let native_imports = self.options.native_imports && !self.options.mode_options.dev_mode;
        let loader = ResourceGraphLoader::new(Arc::clone(&self.handler), native_imports);
        let entry = loader.load(entry).await?;

        let mut outputs = BTreeMap::new();
        let mut pending = VecDeque::from([entry.clone()]);
        while let Some(path) = pending.pop_front() {
            if outputs.contains_key(&path) {
                continue;
            }
            let graph = DependencyGraph::resolve(&loader, &path)?;
            for target in graph.native_targets() {
                if !outputs.contains_key(target) {
                    debug!(from = %path, to = target, "native import boundary");
                    pending.push_back(target.to_string());
                }
            }
            let output = Target::new(&graph, &self.options)
                .with_import_path_rewriter(self.rewriter.clone())
                .build()?;
            outputs.insert(path, output);
        }

        info!(entry = %entry, outputs = outputs.len(), "compilation finished");
        Ok(outputs)
    }
}

impl std::fmt::Debug for Transpiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transpiler")
            .field("options", &self.options)
            .field("rewriter", &self.rewriter.is_some())
            .finish_non_exhaustive()
    }
}
