//! Literal deduplication and hoisting decisions.

use std::collections::HashMap;

use miniforge_types::ast::Literal;

use crate::namespace::NamespaceGenerator;

/// One distinct literal value.
#[derive(Debug, Clone, PartialEq)]
pub struct LiteralRecord {
    /// Source text of the first occurrence.
    pub value: String,
    pub count: usize,
    /// Generated global holding the value, when hoisted.
    pub namespace: Option<String>,
    hoistable: bool,
}

/// Counts literal occurrences by normalized value and assigns hoisted
/// slots once counting is done.
#[derive(Debug, Clone)]
pub struct LiteralInterner {
    records: Vec<LiteralRecord>,
    index: HashMap<String, usize>,
    threshold: usize,
}

impl LiteralInterner {
    pub fn new(threshold: usize) -> Self {
        Self {
            records: Vec::new(),
            index: HashMap::new(),
            threshold,
        }
    }

    /// Record one occurrence.
    pub fn add(&mut self, literal: &Literal) {
        let key = literal_key(literal);
        if let Some(&idx) = self.index.get(&key) {
            if let Some(record) = self.records.get_mut(idx) {
                record.count += 1;
            }
            return;
        }
        let value = literal.raw();
        let hoistable = !matches!(literal, Literal::Bool(_) | Literal::Null) && value.len() > 2;
        self.index.insert(key, self.records.len());
        self.records.push(LiteralRecord {
            value,
            count: 1,
            namespace: None,
            hoistable,
        });
    }

    pub fn get(&self, literal: &Literal) -> Option<&LiteralRecord> {
        self.index
            .get(&literal_key(literal))
            .and_then(|&idx| self.records.get(idx))
    }

    /// Allocate a slot for every literal worth hoisting, in first-appearance
    /// order. Returns the number of hoisted literals.
    pub fn finalize(&mut self, variables: &mut NamespaceGenerator) -> usize {
        let mut hoisted = 0;
        for (idx, record) in self.records.iter_mut().enumerate() {
            if record.namespace.is_none() && record.hoistable && record.count >= self.threshold {
                let key = format!("literal:{idx}");
                record.namespace = Some(variables.create_namespace(&key).to_string());
                hoisted += 1;
            }
        }
        hoisted
    }

    /// Hoisted `(name, value)` pairs in allocation order.
    pub fn hoisted(&self) -> impl Iterator<Item = (&str, &str)> {
        self.records.iter().filter_map(|record| {
            record
                .namespace
                .as_deref()
                .map(|name| (name, record.value.as_str()))
        })
    }

    /// Number of distinct literal values.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Deduplication key: raw text for strings, sign plus canonical value for
/// numbers.
fn literal_key(literal: &Literal) -> String {
    match literal {
        Literal::Number(number) => {
            let sign = if number.negated { '-' } else { '+' };
            format!("n{sign}{}", number.value)
        }
        Literal::String(string) => format!("s{}", string.raw),
        Literal::Bool(value) => format!("b{value}"),
        Literal::Null => "null".to_string(),
    }
}
