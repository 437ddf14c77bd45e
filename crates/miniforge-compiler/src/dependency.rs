//! Dependency resolution over loaded resources.
//!
//! Nodes live in an arena indexed by [`ModuleId`]; a path reached from
//! several modules resolves to one shared node. Resolution walks the
//! graph depth-first with an explicit stack of the paths being resolved,
//! and a reference back onto that stack is a circular dependency.

use std::collections::HashMap;
use std::sync::Arc;

use miniforge_codegen::{ModuleGraph, ModuleId};
use miniforge_types::ast::{Chunk, Reference};
use tracing::{debug, trace};

use crate::error::{BuildError, BuildErrorKind, BuildResult};
use crate::loader::{content_id, Resource, ResourceGraphLoader};

/// How a module was first reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyKind {
    Main,
    Import,
    Include,
}

/// One resolved module and its outgoing edges. Edge maps are keyed by
/// the reference exactly as written.
#[derive(Debug)]
pub struct DependencyNode {
    pub resource: Arc<Resource>,
    pub kind: DependencyKind,
    /// Reached through `#import` at least once, so it is emitted as a
    /// registered module.
    pub imported: bool,
    imports: HashMap<String, ModuleId>,
    includes: HashMap<String, ModuleId>,
    injections: HashMap<String, Arc<str>>,
    natives: HashMap<String, String>,
}

impl DependencyNode {
    fn new(resource: Arc<Resource>, kind: DependencyKind) -> Self {
        Self {
            resource,
            kind,
            imported: kind == DependencyKind::Import,
            imports: HashMap::new(),
            includes: HashMap::new(),
            injections: HashMap::new(),
            natives: HashMap::new(),
        }
    }

    pub fn path(&self) -> &str {
        &self.resource.path
    }

    /// Content hash of the module source.
    pub fn id(&self) -> &str {
        &self.resource.id
    }

    pub fn chunk(&self) -> &Chunk {
        &self.resource.chunk
    }
}

/// The resolved module graph of one compiled output.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    nodes: Vec<DependencyNode>,
    index: HashMap<String, ModuleId>,
}

impl DependencyGraph {
    /// Resolve the graph rooted at `entry` from already loaded resources.
    pub fn resolve(loader: &ResourceGraphLoader, entry: &str) -> BuildResult<Self> {
        let mut graph = Self::default();
        let mut stack = Vec::new();
        graph.visit(loader, entry, DependencyKind::Main, &mut stack)?;
        debug!(entry, modules = graph.nodes.len(), "dependency graph resolved");
        Ok(graph)
    }

    /// A graph of one module without resolved references.
    pub fn single(path: &str, source: &str, chunk: Chunk) -> Self {
        let resource = Resource {
            path: path.to_string(),
            id: content_id(source),
            source: source.to_string(),
            chunk,
        };
        let mut graph = Self::default();
        graph.index.insert(path.to_string(), ModuleId(0));
        graph
            .nodes
            .push(DependencyNode::new(Arc::new(resource), DependencyKind::Main));
        graph
    }

    pub fn entry(&self) -> ModuleId {
        ModuleId(0)
    }

    pub fn node(&self, id: ModuleId) -> Option<&DependencyNode> {
        self.nodes.get(id.0)
    }

    pub fn find(&self, path: &str) -> Option<ModuleId> {
        self.index.get(path).copied()
    }

    /// Every module in discovery order, the entry first.
    pub fn modules(&self) -> impl Iterator<Item = (ModuleId, &DependencyNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(idx, node)| (ModuleId(idx), node))
    }

    /// Modules emitted as registered module chunks, in discovery order.
    pub fn imported_modules(&self) -> impl Iterator<Item = ModuleId> + '_ {
        self.modules()
            .filter(|(id, node)| *id != self.entry() && node.imported)
            .map(|(id, _)| id)
    }

    /// Resolved paths of every native import target, first seen first.
    pub fn native_targets(&self) -> Vec<&str> {
        let mut targets: Vec<&str> = Vec::new();
        for node in &self.nodes {
            let mut own: Vec<&str> = node.natives.values().map(String::as_str).collect();
            own.sort_unstable();
            for target in own {
                if !targets.contains(&target) {
                    targets.push(target);
                }
            }
        }
        targets
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn visit(
        &mut self,
        loader: &ResourceGraphLoader,
        path: &str,
        kind: DependencyKind,
        stack: &mut Vec<String>,
    ) -> BuildResult<ModuleId> {
        let resource = loader
            .resource(path)
            .ok_or_else(|| BuildError::not_found(path, path))?;
        let id = ModuleId(self.nodes.len());
        trace!(path, ?kind, id = id.0, "resolving module");
        self.nodes
            .push(DependencyNode::new(Arc::clone(&resource), kind));
        self.index.insert(path.to_string(), id);
        stack.push(path.to_string());

        for (reference, edge) in module_references(&resource.chunk) {
            let target = resolved(loader, path, reference)?;
            let child = match self.index.get(&target) {
                Some(_) if stack.contains(&target) => {
                    return Err(BuildError::new(
                        path,
                        BuildErrorKind::CircularDependency {
                            from: path.to_string(),
                            to: target,
                        },
                    )
                    .with_range(reference.span));
                }
                Some(&child) => child,
                None => self.visit(loader, &target, edge, stack)?,
            };
            let node = &mut self.nodes[id.0];
            match edge {
                DependencyKind::Import => {
                    node.imports.insert(reference.path.clone(), child);
                    self.nodes[child.0].imported = true;
                }
                _ => {
                    node.includes.insert(reference.path.clone(), child);
                }
            }
        }

        for reference in &resource.chunk.injects {
            let target = resolved(loader, path, reference)?;
            let text = loader.text(&target).ok_or_else(|| {
                BuildError::not_found(path, target.clone()).with_range(reference.span)
            })?;
            self.nodes[id.0]
                .injections
                .insert(reference.path.clone(), text);
        }

        // Native import targets are only loaded when boundaries are enabled.
        for reference in &resource.chunk.native_imports {
            if let Some(target) = loader.resolved(path, &reference.path) {
                if loader.resource(&target).is_some() {
                    self.nodes[id.0]
                        .natives
                        .insert(reference.path.clone(), target);
                }
            }
        }

        stack.pop();
        Ok(id)
    }
}

/// Imports and includes in source order.
fn module_references(chunk: &Chunk) -> Vec<(&Reference, DependencyKind)> {
    let mut references: Vec<_> = chunk
        .imports
        .iter()
        .map(|reference| (reference, DependencyKind::Import))
        .chain(
            chunk
                .includes
                .iter()
                .map(|reference| (reference, DependencyKind::Include)),
        )
        .collect();
    references.sort_by_key(|(reference, _)| (reference.span.start_line, reference.span.start_col));
    references
}

fn resolved(loader: &ResourceGraphLoader, base: &str, reference: &Reference) -> BuildResult<String> {
    loader
        .resolved(base, &reference.path)
        .ok_or_else(|| BuildError::not_found(base, reference.path.clone()).with_range(reference.span))
}

impl ModuleGraph for DependencyGraph {
    fn path(&self, id: ModuleId) -> &str {
        self.nodes[id.0].path()
    }

    fn chunk(&self, id: ModuleId) -> &Chunk {
        self.nodes[id.0].chunk()
    }

    fn import(&self, id: ModuleId, path: &str) -> Option<ModuleId> {
        self.node(id)?.imports.get(path).copied()
    }

    fn include(&self, id: ModuleId, path: &str) -> Option<ModuleId> {
        self.node(id)?.includes.get(path).copied()
    }

    fn injection(&self, id: ModuleId, path: &str) -> Option<&str> {
        self.node(id)?.injections.get(path).map(|text| &**text)
    }

    fn native_import(&self, id: ModuleId, path: &str) -> Option<&str> {
        self.node(id)?.natives.get(path).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::MemoryResourceHandler;

    async fn graph(files: &[(&str, &str)]) -> BuildResult<DependencyGraph> {
        let handler = files
            .iter()
            .fold(MemoryResourceHandler::new(), |handler, (path, source)| {
                handler.with_file(*path, *source)
            });
        let loader = ResourceGraphLoader::new(Arc::new(handler), false);
        let entry = loader.load(files[0].0).await?;
        DependencyGraph::resolve(&loader, &entry)
    }

    #[tokio::test]
    async fn test_discovery_order_follows_source_order() {
        let graph = graph(&[
            ("main.src", "#include \"c.src\";\n#import b from \"b.src\";"),
            ("b.src", "module.exports = 1"),
            ("c.src", "c = 1"),
        ])
        .await
        .unwrap();
        let paths: Vec<&str> = graph.modules().map(|(_, node)| node.path()).collect();
        assert_eq!(paths, ["main.src", "c.src", "b.src"]);
        let imported: Vec<ModuleId> = graph.imported_modules().collect();
        assert_eq!(imported, [ModuleId(2)]);
        assert_eq!(graph.node(ModuleId(1)).map(|n| n.kind), Some(DependencyKind::Include));
    }

    #[tokio::test]
    async fn test_shared_dependency_is_one_node() {
        let graph = graph(&[
            ("main.src", "#import b from \"b.src\";\n#import c from \"c.src\";"),
            ("b.src", "#import d from \"d.src\";"),
            ("c.src", "#import d from \"d.src\";"),
            ("d.src", "module.exports = 4"),
        ])
        .await
        .unwrap();
        assert_eq!(graph.len(), 4);
        let d = graph.find("d.src").unwrap();
        let b = graph.find("b.src").unwrap();
        let c = graph.find("c.src").unwrap();
        assert_eq!(graph.import(b, "d.src"), Some(d));
        assert_eq!(graph.import(c, "d.src"), Some(d));
    }

    #[tokio::test]
    async fn test_included_then_imported_module_is_registered() {
        let graph = graph(&[
            ("main.src", "#include \"b.src\";\n#import b from \"b.src\";"),
            ("b.src", "x = 1"),
        ])
        .await
        .unwrap();
        let b = graph.find("b.src").unwrap();
        assert!(graph.node(b).unwrap().imported);
        assert_eq!(graph.include(graph.entry(), "b.src"), Some(b));
    }

    #[tokio::test]
    async fn test_cycle_names_both_ends() {
        let err = graph(&[
            ("a.src", "#include \"b.src\";"),
            ("b.src", "\n#import a from \"a.src\";"),
        ])
        .await
        .unwrap_err();
        assert_eq!(err.target, "b.src");
        assert_eq!(err.range.map(|span| span.start_line), Some(2));
        match err.kind {
            BuildErrorKind::CircularDependency { from, to } => {
                assert_eq!(from, "b.src");
                assert_eq!(to, "a.src");
            }
            other => panic!("expected a cycle, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_injections_and_content_ids() {
        let graph = graph(&[
            ("main.src", "x = #inject \"t.txt\";"),
            ("t.txt", "text"),
        ])
        .await
        .unwrap();
        let entry = graph.entry();
        assert_eq!(graph.injection(entry, "t.txt"), Some("text"));
        assert_eq!(graph.node(entry).unwrap().id(), content_id("x = #inject \"t.txt\";"));
    }

    #[test]
    fn test_single_module_graph() {
        let chunk = miniforge_parser::parse("x = 1", "one.src").unwrap();
        let graph = DependencyGraph::single("one.src", "x = 1", chunk);
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.path(graph.entry()), "one.src");
        assert_eq!(graph.imported_modules().count(), 0);
        assert!(graph.native_targets().is_empty());
    }
}
