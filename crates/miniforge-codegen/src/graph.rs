//! The view of the module graph code generators resolve directives against.

use std::fmt;

use miniforge_types::ast::Chunk;

/// Index of a module in a [`ModuleGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(pub usize);

/// Resolved modules and their edges. References are looked up by the
/// path exactly as written in the referring module.
pub trait ModuleGraph {
    /// Resolved path of the module.
    fn path(&self, id: ModuleId) -> &str;

    fn chunk(&self, id: ModuleId) -> &Chunk;

    /// Target of `#import … from "path";` in module `id`.
    fn import(&self, id: ModuleId, path: &str) -> Option<ModuleId>;

    /// Target of `#include "path";` in module `id`.
    fn include(&self, id: ModuleId, path: &str) -> Option<ModuleId>;

    /// Text injected by `#inject "path";` in module `id`.
    fn injection(&self, id: ModuleId, path: &str) -> Option<&str>;

    /// Output path of the unit compiled for `import_code("path")` in
    /// module `id`.
    fn native_import(&self, id: ModuleId, path: &str) -> Option<&str>;
}

/// The module whose code is being generated.
#[derive(Clone, Copy)]
pub struct ActiveModule<'g> {
    pub graph: &'g dyn ModuleGraph,
    pub id: ModuleId,
}

impl<'g> ActiveModule<'g> {
    pub fn new(graph: &'g dyn ModuleGraph, id: ModuleId) -> Self {
        Self { graph, id }
    }

    pub fn path(&self) -> &'g str {
        self.graph.path(self.id)
    }

    pub fn chunk(&self) -> &'g Chunk {
        self.graph.chunk(self.id)
    }

    pub fn import(&self, path: &str) -> Option<ActiveModule<'g>> {
        self.graph
            .import(self.id, path)
            .map(|id| Self::new(self.graph, id))
    }

    pub fn include(&self, path: &str) -> Option<ActiveModule<'g>> {
        self.graph
            .include(self.id, path)
            .map(|id| Self::new(self.graph, id))
    }

    pub fn injection(&self, path: &str) -> Option<&'g str> {
        self.graph.injection(self.id, path)
    }

    pub fn native_import(&self, path: &str) -> Option<&'g str> {
        self.graph.native_import(self.id, path)
    }
}

impl fmt::Debug for ActiveModule<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveModule")
            .field("id", &self.id)
            .field("path", &self.path())
            .finish()
    }
}
