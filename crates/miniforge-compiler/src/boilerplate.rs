//! Module runtime emitted ahead of registered modules.

use miniforge_codegen::CompilationContext;
use miniforge_types::ast::Chunk;

use crate::error::{BuildError, BuildResult};

/// Pseudo path used when reporting errors in the runtime header.
pub const HEADER_PATH: &str = "<module runtime>";

/// `__REQUIRE(id)` runs the registered module function once, with a
/// fresh `module` map, and caches `module.exports`. The runtime names are
/// renamed with the rest of the program, so the header goes through the
/// active generator like any other chunk.
pub const HEADER_SOURCE: &str = r#"__MODULES = {}
__EXPORTED = {}
__REQUIRE = function(id)
	if not __EXPORTED.hasIndex(id) then
		module = {"exports": null}
		__MODULES[id](module)
		__EXPORTED[id] = module.exports
	end if
	return __EXPORTED[id]
end function"#;

/// The parsed runtime header.
pub fn header() -> BuildResult<Chunk> {
    miniforge_parser::parse(HEADER_SOURCE, HEADER_PATH)
        .map_err(|errors| BuildError::syntax(HEADER_PATH, errors))
}

/// One `slot=value` line per hoisted literal, in allocation order.
pub fn preamble(ctx: &CompilationContext) -> String {
    ctx.hoisted_literals()
        .into_iter()
        .map(|(slot, value)| format!("{slot}={value}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use miniforge_codegen::{BuildMode, CompileOptions};
    use miniforge_types::ast::{Literal, StringLit};

    #[test]
    fn test_header_parses() {
        let chunk = header().unwrap();
        assert_eq!(chunk.body.len(), 3);
        let names: Vec<&str> = chunk.identifiers().collect();
        assert!(names.contains(&"id"));
        assert!(names.contains(&"module"));
    }

    #[test]
    fn test_preamble_lists_hoisted_literals() {
        let mut ctx = CompilationContext::new(CompileOptions::with_mode(BuildMode::Minified));
        let a = Literal::String(StringLit::from_value("first"));
        let b = Literal::String(StringLit::from_value("second"));
        ctx.seed_literals([&a, &b, &a, &b]);
        ctx.finalize_literals();
        assert_eq!(preamble(&ctx), "e=\"first\"\nf=\"second\"");
    }
}
