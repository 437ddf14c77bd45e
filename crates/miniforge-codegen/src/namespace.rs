//! Short, collision-free name allocation.

use std::collections::{HashMap, HashSet};

/// Default alphabet for generated names.
pub const DEFAULT_ALPHABET: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Maps keys (identifiers, module paths, literal keys) to generated names.
///
/// Names are produced in a fixed sequence over the alphabet: every name of
/// length one, then every name of length two, and so on. A candidate is
/// skipped when it is forbidden, already issued, or starts with a digit.
/// Output is deterministic for a fixed sequence of
/// [`create_namespace`](Self::create_namespace) calls.
#[derive(Debug, Clone)]
pub struct NamespaceGenerator {
    alphabet: Vec<char>,
    counter: u64,
    names: HashMap<String, String>,
    issued: HashSet<String>,
    forbidden: HashSet<String>,
}

impl NamespaceGenerator {
    /// Create a generator. `defaults` are allocated in order before any
    /// other key; `forbidden` names are never produced.
    pub fn new<I, S>(alphabet: &str, defaults: &[&str], forbidden: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut generator = Self {
            alphabet: normalize_alphabet(alphabet),
            counter: 0,
            names: HashMap::new(),
            issued: HashSet::new(),
            forbidden: forbidden.into_iter().map(Into::into).collect(),
        };
        for key in defaults {
            generator.create_namespace(key);
        }
        generator
    }

    /// Return the name for `key`, allocating the next free one if needed.
    pub fn create_namespace(&mut self, key: &str) -> &str {
        if !self.names.contains_key(key) {
            let name = self.next_name();
            self.issued.insert(name.clone());
            self.names.insert(key.to_string(), name);
        }
        self.names.get(key).map(String::as_str).unwrap_or_default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.names.get(key).map(String::as_str)
    }

    pub fn has(&self, key: &str) -> bool {
        self.names.contains_key(key)
    }

    /// Never produce `name` from now on.
    pub fn forbid(&mut self, name: impl Into<String>) {
        self.forbidden.insert(name.into());
    }

    /// Number of mapped keys.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    fn next_name(&mut self) -> String {
        loop {
            let candidate = encode(self.counter, &self.alphabet);
            self.counter += 1;
            let starts_with_digit = candidate.starts_with(|c: char| c.is_ascii_digit());
            if !starts_with_digit
                && !self.forbidden.contains(&candidate)
                && !self.issued.contains(&candidate)
            {
                return candidate;
            }
        }
    }
}

impl Default for NamespaceGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_ALPHABET, &[], Vec::<String>::new())
    }
}

/// Keep identifier characters, drop duplicates; fall back to the default
/// alphabet when no usable leading character remains.
fn normalize_alphabet(alphabet: &str) -> Vec<char> {
    let mut seen = HashSet::new();
    let chars: Vec<char> = alphabet
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .filter(|c| seen.insert(*c))
        .collect();
    if chars.iter().any(|c| !c.is_ascii_digit()) {
        chars
    } else {
        DEFAULT_ALPHABET.chars().collect()
    }
}

/// Bijective base-N encoding: `0 → a`, `N-1 → Z`, `N → aa`, …
fn encode(mut n: u64, alphabet: &[char]) -> String {
    let base = alphabet.len() as u64;
    let mut out = Vec::new();
    n += 1;
    while n > 0 {
        n -= 1;
        out.push(alphabet[(n % base) as usize]);
        n /= base;
    }
    out.iter().rev().collect()
}
