//! Row-level key lookup used for blocking.

use std::collections::{BTreeSet, HashMap};

use super::normalize::{normalize_key, tokenize};

/// Per-row keys of one table side, with exact and token lookups.
#[derive(Debug, Clone, Default)]
pub struct KeyBlockIndex {
    raw: Vec<String>,
    normalized: Vec<String>,
    tokens: Vec<BTreeSet<String>>,
    exact_rows: HashMap<String, Vec<usize>>,
    token_rows: HashMap<String, Vec<usize>>,
    prefix_rows: HashMap<String, Vec<usize>>,
}

/// Leading chars of a normalized key used as a second blocking key.
const PREFIX_LEN: usize = 3;

fn prefix(normalized: &str) -> Option<String> {
    let p: String = normalized.chars().take(PREFIX_LEN).collect();
    (!p.trim().is_empty()).then_some(p)
}

impl KeyBlockIndex {
    /// Index one key per row. Empty keys are kept positionally but never indexed.
    pub fn build(keys: &[String]) -> Self {
        let mut index = KeyBlockIndex {
            raw: keys.to_vec(),
            ..Default::default()
        };

        for (row, key) in keys.iter().enumerate() {
            let normalized = normalize_key(key);
            let tokens: BTreeSet<String> = tokenize(&normalized).into_iter().collect();

            if !key.is_empty() {
                index.exact_rows.entry(key.clone()).or_default().push(row);
            }
            for token in &tokens {
                index.token_rows.entry(token.clone()).or_default().push(row);
            }
            if let Some(p) = prefix(&normalized) {
                index.prefix_rows.entry(p).or_default().push(row);
            }

            index.normalized.push(normalized);
            index.tokens.push(tokens);
        }

        index
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn raw(&self, row: usize) -> &str {
        self.raw.get(row).map(|s| s.as_str()).unwrap_or("")
    }

    pub fn normalized(&self, row: usize) -> &str {
        self.normalized.get(row).map(|s| s.as_str()).unwrap_or("")
    }

    pub fn tokens(&self, row: usize) -> Option<&BTreeSet<String>> {
        self.tokens.get(row)
    }

    /// Rows whose raw key equals `key` exactly, ascending.
    pub fn rows_with_key(&self, key: &str) -> &[usize] {
        self.exact_rows.get(key).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Rows sharing at least one token with `tokens`, ascending.
    pub fn candidates<'a>(&self, tokens: impl IntoIterator<Item = &'a String>) -> BTreeSet<usize> {
        tokens
            .into_iter()
            .filter_map(|t| self.token_rows.get(t))
            .flatten()
            .copied()
            .collect()
    }

    /// Blocking candidates for a lookup key: shared token or shared leading chars.
    pub fn block(&self, normalized: &str, tokens: &BTreeSet<String>) -> BTreeSet<usize> {
        let mut rows = self.candidates(tokens);
        if let Some(found) = prefix(normalized).and_then(|p| self.prefix_rows.get(&p)) {
            rows.extend(found.iter().copied());
        }
        rows
    }
}
