//! Names the generators must never produce or rename.

use std::collections::HashSet;

use miniforge_lexer::ALL_KEYWORDS;

/// Runtime names used by the module bootstrap, created first in the
/// variable namespace.
pub const RUNTIME_NAMES: &[&str] = &["__REQUIRE", "__MODULES", "__EXPORTED", "module"];

/// Built-in functions, host API and implicit variables. Calls to these
/// resolve at runtime by name, so they keep their name in renamed output.
pub const INTRINSICS: &[&str] = &[
    // implicit variables
    "self",
    "super",
    "globals",
    "locals",
    "outer",
    "params",
    // core types
    "number",
    "string",
    "list",
    "map",
    "funcRef",
    // math
    "abs",
    "acos",
    "asin",
    "atan",
    "ceil",
    "cos",
    "floor",
    "log",
    "pi",
    "rnd",
    "round",
    "sign",
    "sin",
    "sqrt",
    "str",
    "tan",
    "val",
    "bitAnd",
    "bitOr",
    "bitXor",
    // strings & collections
    "char",
    "code",
    "hasIndex",
    "indexOf",
    "indexes",
    "insert",
    "join",
    "len",
    "lower",
    "pop",
    "pull",
    "push",
    "range",
    "remove",
    "replace",
    "reverse",
    "shuffle",
    "slice",
    "sort",
    "split",
    "sum",
    "to_int",
    "trim",
    "upper",
    "values",
    // system
    "print",
    "time",
    "wait",
    "yield",
    "exit",
    "typeof",
    "hash",
    "user_input",
    "include_lib",
    "import_code",
    "get_shell",
    "get_router",
    "get_switch",
    "active_user",
    "home_dir",
    "program_path",
    "current_path",
    "current_date",
    "parent_path",
    "is_valid_ip",
    "is_lan_ip",
    "nslookup",
    "whois",
    "format_columns",
    "clear_screen",
    "launch_path",
    "md5",
    "bitwise",
    "mail_login",
    "get_custom_object",
];

/// Every name that must never be generated: keywords, intrinsics and
/// runtime names, plus the caller's excluded identifiers.
pub fn forbidden_names<'a>(excluded: impl IntoIterator<Item = &'a String>) -> HashSet<String> {
    ALL_KEYWORDS
        .iter()
        .chain(INTRINSICS)
        .chain(RUNTIME_NAMES)
        .map(|name| name.to_string())
        .chain(excluded.into_iter().cloned())
        .collect()
}

/// `true` for names that keep their spelling in renamed output.
pub fn is_intrinsic(name: &str) -> bool {
    INTRINSICS.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forbidden_includes_keywords_and_excluded() {
        let excluded = vec!["keepMe".to_string()];
        let names = forbidden_names(&excluded);
        for name in ["if", "end", "print", "self", "__REQUIRE", "keepMe"] {
            assert!(names.contains(name), "{name} should be forbidden");
        }
        assert!(!names.contains("foo"));
    }
}
