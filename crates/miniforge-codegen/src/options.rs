//! Compilation options.
//!
//! All option types deserialize from camelCase JSON with every field
//! optional, so a partial config file is enough:
//!
//! ```json
//! { "mode": "minified", "obfuscate": true, "modeOptions": { "devMode": false } }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::namespace::DEFAULT_ALPHABET;

/// Output strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BuildMode {
    /// Reproduce the source layout.
    #[default]
    Verbatim,
    /// Smallest output: no comments, optional renaming, literal hoisting.
    Minified,
    /// Canonical layout.
    Reformatted,
}

/// Indentation used by the reformatting strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IndentationStyle {
    #[default]
    Tab,
    Spaces(u8),
}

impl IndentationStyle {
    /// The text of one indentation level.
    pub fn unit(&self) -> String {
        match self {
            IndentationStyle::Tab => "\t".to_string(),
            IndentationStyle::Spaces(n) => " ".repeat(usize::from(*n)),
        }
    }
}

/// Strategy-specific switches.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModeOptions {
    /// Never hoist repeated literals into generated globals.
    pub disable_literal_hoisting: bool,
    /// Use module paths as module ids instead of generated names.
    pub disable_namespace_renaming: bool,
    /// Keep parentheses around atomic expressions when reformatting.
    pub keep_redundant_parens: bool,
    pub indentation_style: IndentationStyle,
    /// Re-emit directives textually; emit no module runtime.
    pub dev_mode: bool,
}

/// Options for one compilation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompileOptions {
    /// Rename identifiers to generated short names (minified output only).
    pub obfuscate: bool,
    pub mode: BuildMode,
    pub mode_options: ModeOptions,
    /// Values for `#envar` directives.
    pub environment_variables: BTreeMap<String, String>,
    /// Identifiers that keep their name.
    pub excluded_identifiers: Vec<String>,
    /// Compile every `import_code("path")` target as its own output.
    pub native_imports: bool,
    /// Occurrences before a literal is hoisted.
    pub literal_threshold: usize,
    /// Characters generated names are built from.
    pub alphabet: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            obfuscate: false,
            mode: BuildMode::Verbatim,
            mode_options: ModeOptions::default(),
            environment_variables: BTreeMap::new(),
            excluded_identifiers: Vec::new(),
            native_imports: false,
            literal_threshold: 2,
            alphabet: DEFAULT_ALPHABET.to_string(),
        }
    }
}

impl CompileOptions {
    /// Options for the given mode, everything else default.
    pub fn with_mode(mode: BuildMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = CompileOptions::default();
        assert_eq!(options.mode, BuildMode::Verbatim);
        assert_eq!(options.literal_threshold, 2);
        assert_eq!(options.mode_options.indentation_style, IndentationStyle::Tab);
        assert!(!options.native_imports);
    }

    #[test]
    fn test_partial_json_config() {
        let json = r#"{
            "mode": "minified",
            "obfuscate": true,
            "modeOptions": { "disableLiteralHoisting": true, "indentationStyle": { "spaces": 2 } },
            "environmentVariables": { "HOME": "/root" },
            "excludedIdentifiers": ["keepMe"]
        }"#;
        let options: CompileOptions = serde_json::from_str(json).unwrap();
        assert_eq!(options.mode, BuildMode::Minified);
        assert!(options.obfuscate);
        assert!(options.mode_options.disable_literal_hoisting);
        assert_eq!(
            options.mode_options.indentation_style,
            IndentationStyle::Spaces(2)
        );
        assert_eq!(options.environment_variables["HOME"], "/root");
        assert_eq!(options.excluded_identifiers, vec!["keepMe"]);
        assert_eq!(options.literal_threshold, 2);
    }

    #[test]
    fn test_indentation_unit() {
        assert_eq!(IndentationStyle::Tab.unit(), "\t");
        assert_eq!(IndentationStyle::Spaces(4).unit(), "    ");
    }
}
