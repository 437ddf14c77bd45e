//! Per-compilation shared state.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use miniforge_types::ast::Literal;

use crate::literals::LiteralInterner;
use crate::namespace::NamespaceGenerator;
use crate::options::{BuildMode, CompileOptions};
use crate::reserved::{forbidden_names, is_intrinsic, RUNTIME_NAMES};

/// Rewrites the path of a native import in emitted code.
pub type ImportPathRewriter = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Everything one compilation shares across modules: two namespace
/// generators (module ids, variables), the literal interner and the
/// options.
///
/// Seeding (`seed_*`, [`finalize_literals`](Self::finalize_literals))
/// happens before any code is generated; generators only read.
pub struct CompilationContext {
    options: CompileOptions,
    modules: NamespaceGenerator,
    variables: NamespaceGenerator,
    literals: LiteralInterner,
    excluded: HashSet<String>,
    import_path_rewriter: Option<ImportPathRewriter>,
}

impl CompilationContext {
    pub fn new(options: CompileOptions) -> Self {
        let forbidden = forbidden_names(&options.excluded_identifiers);
        let variables = NamespaceGenerator::new(&options.alphabet, RUNTIME_NAMES, forbidden);
        let modules = NamespaceGenerator::new(&options.alphabet, &[], Vec::<String>::new());
        let literals = LiteralInterner::new(options.literal_threshold);
        let excluded = options.excluded_identifiers.iter().cloned().collect();
        Self {
            options,
            modules,
            variables,
            literals,
            excluded,
            import_path_rewriter: None,
        }
    }

    pub fn with_import_path_rewriter(mut self, rewriter: ImportPathRewriter) -> Self {
        self.import_path_rewriter = Some(rewriter);
        self
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    pub fn dev_mode(&self) -> bool {
        self.options.mode_options.dev_mode
    }

    /// Identifiers are replaced by generated names.
    pub fn renames_identifiers(&self) -> bool {
        self.options.mode == BuildMode::Minified && self.options.obfuscate && !self.dev_mode()
    }

    /// Repeated literals are replaced by generated globals.
    pub fn hoists_literals(&self) -> bool {
        self.options.mode == BuildMode::Minified
            && !self.options.mode_options.disable_literal_hoisting
            && !self.dev_mode()
    }

    // ── Seeding ───────────────────────────────────────────────────────────────

    /// Allocate a module id for the module at `path`.
    pub fn seed_module(&mut self, path: &str) {
        self.modules.create_namespace(path);
    }

    /// Register identifier names, in order. When renaming is off the names
    /// are kept away from generated literal slots instead.
    pub fn seed_identifiers<'n>(&mut self, names: impl IntoIterator<Item = &'n str>) {
        let renames = self.renames_identifiers();
        for name in names {
            if self.keeps_name(name) {
                continue;
            }
            if renames {
                self.variables.create_namespace(name);
            } else {
                self.variables.forbid(name);
            }
        }
    }

    pub fn seed_literals<'l>(&mut self, literals: impl IntoIterator<Item = &'l Literal>) {
        for literal in literals {
            self.literals.add(literal);
        }
    }

    /// Decide which literals are hoisted. Returns the number hoisted.
    pub fn finalize_literals(&mut self) -> usize {
        if !self.hoists_literals() {
            return 0;
        }
        self.literals.finalize(&mut self.variables)
    }

    // ── Lookups ───────────────────────────────────────────────────────────────

    /// The emitted spelling of an identifier.
    pub fn identifier<'s>(&'s self, name: &'s str) -> &'s str {
        if !self.renames_identifiers() || self.keeps_name(name) {
            return name;
        }
        self.variables.get(name).unwrap_or(name)
    }

    /// The emitted spelling of a module runtime name (`__REQUIRE`, …).
    pub fn runtime_name<'s>(&'s self, name: &'s str) -> &'s str {
        if self.renames_identifiers() {
            self.variables.get(name).unwrap_or(name)
        } else {
            name
        }
    }

    /// The id a module is registered under in emitted code.
    pub fn module_namespace(&self, path: &str) -> String {
        if self.options.mode_options.disable_namespace_renaming {
            return path.to_string();
        }
        self.modules.get(path).unwrap_or(path).to_string()
    }

    /// The slot replacing `literal`, when it is hoisted.
    pub fn hoisted(&self, literal: &Literal) -> Option<&str> {
        if !self.hoists_literals() {
            return None;
        }
        self.literals
            .get(literal)
            .and_then(|record| record.namespace.as_deref())
    }

    /// Hoisted `(slot, value)` pairs in allocation order.
    pub fn hoisted_literals(&self) -> Vec<(&str, &str)> {
        if !self.hoists_literals() {
            return Vec::new();
        }
        self.literals.hoisted().collect()
    }

    pub fn rewrite_import_path(&self, path: &str) -> String {
        match &self.import_path_rewriter {
            Some(rewrite) => rewrite(path),
            None => path.to_string(),
        }
    }

    pub fn variables(&self) -> &NamespaceGenerator {
        &self.variables
    }

    pub fn modules(&self) -> &NamespaceGenerator {
        &self.modules
    }

    pub fn literals(&self) -> &LiteralInterner {
        &self.literals
    }

    fn keeps_name(&self, name: &str) -> bool {
        is_intrinsic(name) || self.excluded.contains(name)
    }
}

impl fmt::Debug for CompilationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompilationContext")
            .field("options", &self.options)
            .field("modules", &self.modules.len())
            .field("variables", &self.variables.len())
            .field("literals", &self.literals.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use miniforge_types::ast::StringLit;

    fn minified(obfuscate: bool) -> CompilationContext {
        CompilationContext::new(CompileOptions {
            obfuscate,
            ..CompileOptions::with_mode(BuildMode::Minified)
        })
    }

    #[test]
    fn test_runtime_names_take_first_slots() {
        let ctx = minified(true);
        assert_eq!(ctx.runtime_name("__REQUIRE"), "a");
        assert_eq!(ctx.runtime_name("__MODULES"), "b");
        assert_eq!(ctx.runtime_name("__EXPORTED"), "c");
        assert_eq!(ctx.runtime_name("module"), "d");
    }

    #[test]
    fn test_renaming_skips_intrinsics_and_excluded() {
        let mut ctx = CompilationContext::new(CompileOptions {
            obfuscate: true,
            excluded_identifiers: vec!["keep".into()],
            ..CompileOptions::with_mode(BuildMode::Minified)
        });
        ctx.seed_identifiers(["counter", "print", "keep", "module"]);
        assert_eq!(ctx.identifier("counter"), "e");
        assert_eq!(ctx.identifier("print"), "print");
        assert_eq!(ctx.identifier("keep"), "keep");
        assert_eq!(ctx.identifier("module"), "d");
    }

    #[test]
    fn test_no_renaming_without_obfuscate() {
        let mut ctx = minified(false);
        ctx.seed_identifiers(["counter"]);
        assert_eq!(ctx.identifier("counter"), "counter");
        assert_eq!(ctx.runtime_name("__REQUIRE"), "__REQUIRE");
    }

    #[test]
    fn test_literal_slots_avoid_kept_identifiers() {
        let mut ctx = minified(false);
        ctx.seed_identifiers(["e", "f"]);
        let lit = Literal::String(StringLit::from_value("repeated"));
        ctx.seed_literals([&lit, &lit]);
        assert_eq!(ctx.finalize_literals(), 1);
        assert_eq!(ctx.hoisted(&lit), Some("g"));
    }

    #[test]
    fn test_hoisting_only_when_minifying() {
        let mut ctx = CompilationContext::new(CompileOptions::default());
        let lit = Literal::String(StringLit::from_value("repeated"));
        ctx.seed_literals([&lit, &lit]);
        assert_eq!(ctx.finalize_literals(), 0);
        assert_eq!(ctx.hoisted(&lit), None);
        assert!(ctx.hoisted_literals().is_empty());
    }

    #[test]
    fn test_module_namespace() {
        let mut ctx = CompilationContext::new(CompileOptions::default());
        ctx.seed_module("lib/a.src");
        assert_eq!(ctx.module_namespace("lib/a.src"), "a");

        let mut options = CompileOptions::default();
        options.mode_options.disable_namespace_renaming = true;
        let mut ctx = CompilationContext::new(options);
        ctx.seed_module("lib/a.src");
        assert_eq!(ctx.module_namespace("lib/a.src"), "lib/a.src");
    }

    #[test]
    fn test_import_path_rewriter() {
        let ctx = CompilationContext::new(CompileOptions::default())
            .with_import_path_rewriter(Arc::new(|path: &str| format!("/build{path}")));
        assert_eq!(ctx.rewrite_import_path("/lib/a.src"), "/build/lib/a.src");
    }
}
