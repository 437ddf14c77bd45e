//! Directive values shared by every strategy.

use miniforge_types::ast::{quote, Expr, ExprKind, Literal};

use crate::context::CompilationContext;
use crate::graph::ActiveModule;

/// Name of the native import call.
pub(crate) const NATIVE_IMPORT: &str = "import_code";

pub(crate) const NULL: &str = "null";

/// `#envar NAME;` outside dev mode: the configured value, quoted.
pub(crate) fn envar(ctx: &CompilationContext, name: &str) -> String {
    match ctx.options().environment_variables.get(name) {
        Some(value) => quote(value),
        None => NULL.to_string(),
    }
}

/// `#inject "path";` outside dev mode: the injected text, quoted.
pub(crate) fn inject(active: Option<ActiveModule<'_>>, path: &str) -> String {
    match active.and_then(|module| module.injection(path)) {
        Some(text) => quote(text),
        None => NULL.to_string(),
    }
}

/// `#filename;` outside dev mode.
pub(crate) fn filename(active: Option<ActiveModule<'_>>) -> String {
    match active {
        Some(module) => quote(module.path()),
        None => NULL.to_string(),
    }
}

// ── Textual forms (dev mode and unresolved references) ───────────────────────

pub(crate) fn envar_directive(name: &str) -> String {
    format!("#envar {name};")
}

pub(crate) fn inject_directive(path: &str) -> String {
    format!("#inject {};", quote(path))
}

pub(crate) fn import_directive(name: &str, path: &str) -> String {
    format!("#import {name} from {};", quote(path))
}

pub(crate) fn include_directive(path: &str) -> String {
    format!("#include {};", quote(path))
}

pub(crate) const LINE_DIRECTIVE: &str = "#line;";
pub(crate) const FILENAME_DIRECTIVE: &str = "#filename;";
pub(crate) const DEBUGGER_DIRECTIVE: &str = "#debugger;";

/// When `callee(args)` is a native import boundary, the path to emit.
pub(crate) fn native_import(
    ctx: &CompilationContext,
    active: Option<ActiveModule<'_>>,
    callee: &Expr,
    args: &[Expr],
) -> Option<String> {
    if !ctx.options().native_imports || ctx.dev_mode() {
        return None;
    }
    let ExprKind::Identifier(name) = &callee.kind else {
        return None;
    };
    let [arg] = args else {
        return None;
    };
    match &arg.kind {
        ExprKind::Literal(Literal::String(path)) if name == NATIVE_IMPORT => active
            .and_then(|module| module.native_import(&path.value))
            .map(|target| ctx.rewrite_import_path(target)),
        _ => None,
    }
}
