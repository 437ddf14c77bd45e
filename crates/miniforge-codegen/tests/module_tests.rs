//! Generation against a module graph: imports, includes, injections and
//! module wrappers.

use std::collections::HashMap;

use miniforge_codegen::{
    generator, ActiveModule, BuildMode, CompilationContext, CompileOptions, ModuleGraph, ModuleId,
};
use miniforge_parser::parse;
use miniforge_types::ast::Chunk;

// ─────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────

/// Modules keyed by path; every reference resolves by exact path.
#[derive(Default)]
struct Graph {
    modules: Vec<(String, Chunk)>,
    injections: HashMap<String, String>,
    native: HashMap<String, String>,
}

impl Graph {
    fn add(&mut self, path: &str, source: &str) -> ModuleId {
        let chunk = parse(source, path).unwrap_or_else(|e| panic!("parse errors:\n{e}"));
        self.modules.push((path.to_string(), chunk));
        ModuleId(self.modules.len() - 1)
    }

    fn find(&self, path: &str) -> Option<ModuleId> {
        self.modules
            .iter()
            .position(|(p, _)| p == path)
            .map(ModuleId)
    }

    fn context(&self, options: CompileOptions) -> CompilationContext {
        let mut ctx = CompilationContext::new(options);
        for (path, _) in &self.modules {
            ctx.seed_module(path);
        }
        for (_, chunk) in &self.modules {
            ctx.seed_identifiers(chunk.identifiers());
        }
        for (_, chunk) in &self.modules {
            ctx.seed_literals(&chunk.literals);
        }
        ctx.finalize_literals();
        ctx
    }
}

impl ModuleGraph for Graph {
    fn path(&self, id: ModuleId) -> &str {
        &self.modules[id.0].0
    }

    fn chunk(&self, id: ModuleId) -> &Chunk {
        &self.modules[id.0].1
    }

    fn import(&self, _id: ModuleId, path: &str) -> Option<ModuleId> {
        self.find(path)
    }

    fn include(&self, _id: ModuleId, path: &str) -> Option<ModuleId> {
        self.find(path)
    }

    fn injection(&self, _id: ModuleId, path: &str) -> Option<&str> {
        self.injections.get(path).map(String::as_str)
    }

    fn native_import(&self, _id: ModuleId, path: &str) -> Option<&str> {
        self.native.get(path).map(String::as_str)
    }
}

fn sample() -> (Graph, ModuleId, ModuleId) {
    let mut graph = Graph::default();
    let main = graph.add(
        "main.src",
        "#import util from \"util.src\";\n#include \"shared.src\";\n#include \"shared.src\";\nmsg = #inject \"note.txt\";\nname = #filename;",
    );
    let util = graph.add("util.src", "module.exports = {\"answer\": 42}");
    graph.add("shared.src", "shared = 2");
    graph
        .injections
        .insert("note.txt".into(), "hello \"there\"".into());
    (graph, main, util)
}

// ─────────────────────────────────────────────────────────────────────
// Imports, includes, injections
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_verbatim_resolves_module_references() {
    let (graph, main, _) = sample();
    let ctx = graph.context(CompileOptions::default());
    let output = generator(BuildMode::Verbatim, &ctx)
        .transform(graph.chunk(main), Some(ActiveModule::new(&graph, main)))
        .unwrap();
    assert_eq!(
        output,
        "util = __REQUIRE(\"b\")\nshared = 2\nmsg = \"hello \"\"there\"\"\"\nname = \"main.src\""
    );
}

#[test]
fn test_include_is_inlined_once_per_chunk() {
    let (graph, main, _) = sample();
    let ctx = graph.context(CompileOptions::default());
    let mut gen = generator(BuildMode::Reformatted, &ctx);
    let active = Some(ActiveModule::new(&graph, main));
    let first = gen.transform(graph.chunk(main), active).unwrap();
    assert_eq!(first.matches("shared = 2").count(), 1);
    let second = gen.transform(graph.chunk(main), active).unwrap();
    assert_eq!(second, first);
}

#[test]
fn test_module_and_entry_each_inline_shared_include() {
    let mut graph = Graph::default();
    let main = graph.add("main.src", "#import lib from \"lib.src\";\n#include \"shared.src\";");
    let lib = graph.add("lib.src", "#include \"shared.src\";\nmodule.exports = shared");
    graph.add("shared.src", "shared = 2");
    let ctx = graph.context(CompileOptions::default());
    let namespace = ctx.module_namespace("lib.src");
    let mut gen = generator(BuildMode::Verbatim, &ctx);
    let module = gen
        .transform_module(&namespace, graph.chunk(lib), ActiveModule::new(&graph, lib))
        .unwrap();
    assert!(module.contains("\tshared = 2\n"), "{module}");
    let entry = gen
        .transform(graph.chunk(main), Some(ActiveModule::new(&graph, main)))
        .unwrap();
    assert_eq!(entry, "lib = __REQUIRE(\"b\")\nshared = 2");
}

#[test]
fn test_dev_mode_keeps_module_directives() {
    let (graph, main, _) = sample();
    let mut options = CompileOptions::with_mode(BuildMode::Minified);
    options.mode_options.dev_mode = true;
    let ctx = graph.context(options);
    let output = generator(BuildMode::Minified, &ctx)
        .transform(graph.chunk(main), Some(ActiveModule::new(&graph, main)))
        .unwrap();
    assert_eq!(
        output,
        "#import util from \"util.src\";\n#include \"shared.src\";\n#include \"shared.src\";\nmsg=#inject \"note.txt\";\nname=#filename;"
    );
}

#[test]
fn test_module_wrapper() {
    let (graph, _, util) = sample();
    let ctx = graph.context(CompileOptions::default());
    let namespace = ctx.module_namespace("util.src");
    let output = generator(BuildMode::Verbatim, &ctx)
        .transform_module(&namespace, graph.chunk(util), ActiveModule::new(&graph, util))
        .unwrap();
    assert_eq!(
        output,
        "__MODULES[\"b\"] = function(module)\n\tmodule.exports = {\"answer\": 42}\nend function"
    );
}

#[test]
fn test_minified_module_wrapper_uses_runtime_slots() {
    let (graph, main, util) = sample();
    let ctx = graph.context(CompileOptions {
        obfuscate: true,
        ..CompileOptions::with_mode(BuildMode::Minified)
    });
    let namespace = ctx.module_namespace("util.src");
    let mut gen = generator(BuildMode::Minified, &ctx);
    let module = gen
        .transform_module(&namespace, graph.chunk(util), ActiveModule::new(&graph, util))
        .unwrap();
    assert_eq!(module, "b[\"b\"]=function(d)\nd.exports={\"answer\":42}\nend function");

    let entry = gen
        .transform(graph.chunk(main), Some(ActiveModule::new(&graph, main)))
        .unwrap();
    assert!(entry.starts_with("e=a(\"b\")\n"), "{entry}");
}

#[test]
fn test_module_ids_can_be_paths() {
    let (graph, main, _) = sample();
    let mut options = CompileOptions::default();
    options.mode_options.disable_namespace_renaming = true;
    let ctx = graph.context(options);
    let output = generator(BuildMode::Verbatim, &ctx)
        .transform(graph.chunk(main), Some(ActiveModule::new(&graph, main)))
        .unwrap();
    assert!(output.starts_with("util = __REQUIRE(\"util.src\")"));
}

// ─────────────────────────────────────────────────────────────────────
// Native imports
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_native_import_path_is_rewritten() {
    let mut graph = Graph::default();
    let main = graph.add("main.src", "lib = import_code(\"lib.src\")");
    graph.native.insert("lib.src".into(), "/out/lib.src".into());

    let options = CompileOptions {
        native_imports: true,
        ..CompileOptions::default()
    };
    let ctx = graph
        .context(options)
        .with_import_path_rewriter(std::sync::Arc::new(|path: &str| path.replace(".src", ".ms")));
    let output = generator(BuildMode::Verbatim, &ctx)
        .transform(graph.chunk(main), Some(ActiveModule::new(&graph, main)))
        .unwrap();
    assert_eq!(output, "lib = import_code(\"/out/lib.ms\")");
}

#[test]
fn test_import_code_is_plain_call_when_disabled() {
    let mut graph = Graph::default();
    let main = graph.add("main.src", "lib = import_code(\"lib.src\")");
    graph.native.insert("lib.src".into(), "/out/lib.src".into());
    let ctx = graph.context(CompileOptions::default());
    let output = generator(BuildMode::Verbatim, &ctx)
        .transform(graph.chunk(main), Some(ActiveModule::new(&graph, main)))
        .unwrap();
    assert_eq!(output, "lib = import_code(\"lib.src\")");
}
