//! Ordering of search results.

use super::result::SearchResult;

/// Sort by descending score, keeping input order among equal scores, and keep
/// at most `limit` results.
pub fn rank(mut results: Vec<SearchResult>, limit: Option<usize>) -> Vec<SearchResult> {
    results.sort_by(|a, b| b.score().total_cmp(&a.score()));
    if let Some(limit) = limit {
        results.truncate(limit);
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::{IdentifierHit, VectorHit};

    fn hit(name: &str, score: f64) -> SearchResult {
        SearchResult::Identifier(IdentifierHit::new(name, vec![]).with_score(score))
    }

    #[test]
    fn test_rank_descending_and_stable() {
        let ranked = rank(
            vec![
                hit("a", 0.5),
                hit("b", 0.9),
                hit("c", 0.5),
                SearchResult::Vector(VectorHit::new("d", vec![]).with_score(0.7)),
            ],
            None,
        );
        let ids: Vec<String> = ranked.iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["identifier:b:", "vector:d", "identifier:a:", "identifier:c:"]);
    }

    #[test]
    fn test_rank_limit() {
        let ranked = rank(vec![hit("a", 0.1), hit("b", 0.2), hit("c", 0.3)], Some(2));
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].score(), 0.3);
    }
}
