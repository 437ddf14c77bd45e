//! Property tests for name allocation.

use std::collections::HashSet;

use miniforge_codegen::{NamespaceGenerator, DEFAULT_ALPHABET};
use proptest::prelude::*;

const FORBIDDEN: &[&str] = &["b", "if", "end", "aa"];

proptest! {
    #[test]
    fn distinct_keys_get_distinct_allowed_names(
        keys in prop::collection::hash_set("[a-z_]{1,8}", 1..200)
    ) {
        let mut gen = NamespaceGenerator::new(DEFAULT_ALPHABET, &["__REQUIRE"], FORBIDDEN.iter().copied());
        let mut names = HashSet::new();
        for key in &keys {
            let name = gen.create_namespace(key).to_string();
            prop_assert!(!FORBIDDEN.contains(&name.as_str()));
            prop_assert!(names.insert(name));
        }
        prop_assert_eq!(names.len(), keys.len());
    }

    #[test]
    fn repeated_keys_keep_their_name(keys in prop::collection::vec("[a-z]{1,4}", 1..100)) {
        let mut gen = NamespaceGenerator::new(DEFAULT_ALPHABET, &[], Vec::<String>::new());
        let first: Vec<String> = keys.iter().map(|k| gen.create_namespace(k).to_string()).collect();
        for (key, name) in keys.iter().zip(&first) {
            prop_assert_eq!(gen.create_namespace(key), name.as_str());
            prop_assert_eq!(gen.get(key), Some(name.as_str()));
        }
    }

    #[test]
    fn names_never_start_with_a_digit(count in 1usize..300) {
        let mut gen = NamespaceGenerator::new("0123456789ab", &[], Vec::<String>::new());
        for i in 0..count {
            let name = gen.create_namespace(&format!("k{i}")).to_string();
            prop_assert!(!name.starts_with(|c: char| c.is_ascii_digit()), "{}", name);
        }
    }
}
