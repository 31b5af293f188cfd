//! Key normalization and tokenization.

use once_cell::sync::Lazy;
use regex::Regex;

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\p{L}\p{N}\s]+").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Lowercase, strip punctuation, collapse whitespace.
///
/// `"  Los-Angeles, CA "` becomes `"los angeles ca"`.
pub fn normalize_key(value: &str) -> String {
    let lowered = value.to_lowercase();
    let stripped = NON_WORD.replace_all(&lowered, " ");
    WHITESPACE.replace_all(stripped.trim(), " ").into_owned()
}

/// Whitespace tokens of the normalized key.
pub fn tokenize(value: &str) -> Vec<String> {
    normalize_key(value)
        .split(' ')
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key("  Los-Angeles, CA "), "los angeles ca");
        assert_eq!(normalize_key("São  Paulo"), "são paulo");
        assert_eq!(normalize_key("!!!"), "");
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(tokenize("New York|NY"), vec!["new", "york", "ny"]);
        assert!(tokenize("  ").is_empty());
    }
}
