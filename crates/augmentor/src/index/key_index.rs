//! Per-column identity fingerprints.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::normalize::{normalize_key, tokenize};
use crate::input::{Column, Table};

/// Identity fingerprint of one column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnFingerprint {
    /// Column position in the source table.
    pub column: usize,
    /// Column name.
    pub name: String,
    /// Distinct raw non-null values.
    pub unique_values: BTreeSet<String>,
    /// Distinct normalized values.
    pub normalized_values: BTreeSet<String>,
    /// Distinct tokens across all normalized values.
    pub tokens: BTreeSet<String>,
    /// Distinct entity identifiers, for entity-id columns only.
    pub entity_ids: Option<BTreeSet<String>>,
    /// Number of non-null cells.
    pub non_null: usize,
}

impl ColumnFingerprint {
    /// Fingerprint a single column.
    pub fn build(position: usize, column: &Column) -> Self {
        let mut fp = ColumnFingerprint {
            column: position,
            name: column.name().to_string(),
            ..Default::default()
        };

        for value in column.values.iter().filter(|v| !Table::is_null_value(v)) {
            fp.non_null += 1;
            if fp.unique_values.insert(value.clone()) {
                let normalized = normalize_key(value);
                fp.tokens.extend(tokenize(&normalized));
                if !normalized.is_empty() {
                    fp.normalized_values.insert(normalized);
                }
            }
        }

        if column.metadata.is_entity_id() {
            fp.entity_ids = Some(
                fp.unique_values
                    .iter()
                    .map(|v| v.trim().to_string())
                    .collect(),
            );
        }

        fp
    }

    /// Share of distinct non-null values among non-null cells.
    pub fn uniqueness(&self) -> f64 {
        if self.non_null == 0 {
            0.0
        } else {
            self.unique_values.len() as f64 / self.non_null as f64
        }
    }

    /// Fraction of this column's distinct keys that also appear in `other`.
    ///
    /// Entity-id columns compare identifiers exactly; everything else compares
    /// normalized values.
    pub fn overlap_ratio(&self, other: &ColumnFingerprint) -> f64 {
        let (mine, theirs) = match (&self.entity_ids, &other.entity_ids) {
            (Some(a), Some(b)) => (a, b),
            _ => (&self.normalized_values, &other.normalized_values),
        };
        if mine.is_empty() {
            return 0.0;
        }
        mine.intersection(theirs).count() as f64 / mine.len() as f64
    }

    /// Jaccard similarity of the two token sets.
    pub fn token_overlap(&self, other: &ColumnFingerprint) -> f64 {
        let union = self.tokens.union(&other.tokens).count();
        if union == 0 {
            return 0.0;
        }
        self.tokens.intersection(&other.tokens).count() as f64 / union as f64
    }
}

/// Fingerprints for every column of a table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnKeyIndex {
    fingerprints: Vec<ColumnFingerprint>,
}

impl ColumnKeyIndex {
    /// Build fingerprints for all columns.
    pub fn build(table: &Table) -> Self {
        Self {
            fingerprints: table
                .columns()
                .iter()
                .enumerate()
                .map(|(i, c)| ColumnFingerprint::build(i, c))
                .collect(),
        }
    }

    pub fn fingerprints(&self) -> &[ColumnFingerprint] {
        &self.fingerprints
    }

    pub fn fingerprint(&self, column: usize) -> Option<&ColumnFingerprint> {
        self.fingerprints.get(column)
    }

    /// Pick the `(left, right)` candidate pair whose keys overlap most.
    ///
    /// Ties resolve to the lowest left then right position. Returns `None` when
    /// either candidate list is empty or names no indexed column.
    pub fn best_pair(
        left: &ColumnKeyIndex,
        right: &ColumnKeyIndex,
        left_candidates: &[usize],
        right_candidates: &[usize],
    ) -> Option<(usize, usize, f64)> {
        let mut best: Option<(usize, usize, f64)> = None;
        for &l in left_candidates {
            let Some(lf) = left.fingerprint(l) else { continue };
            for &r in right_candidates {
                let Some(rf) = right.fingerprint(r) else { continue };
                let score = lf.overlap_ratio(rf);
                let better = match best {
                    None => true,
                    Some((bl, br, bs)) => score > bs || (score == bs && (l, r) < (bl, br)),
                };
                if better {
                    best = Some((l, r, score));
                }
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Parser;

    fn table(csv: &str) -> Table {
        Parser::new().parse_bytes(csv.as_bytes(), b',').unwrap()
    }

    #[test]
    fn test_fingerprint_sets() {
        let t = table("city\nLos Angeles\nlos angeles\nNYC\n\n");
        let index = ColumnKeyIndex::build(&t);
        let fp = index.fingerprint(0).unwrap();

        assert_eq!(fp.unique_values.len(), 3);
        assert_eq!(fp.normalized_values.len(), 2);
        assert!(fp.tokens.contains("angeles"));
        assert!(fp.entity_ids.is_none());
        assert_eq!(fp.non_null, 3);
    }

    #[test]
    fn test_entity_id_set() {
        let t = table("qnode\nQ65\nQ60\nQ65\n");
        let fp = ColumnKeyIndex::build(&t).fingerprint(0).cloned().unwrap();
        let ids = fp.entity_ids.unwrap();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains("Q60"));
    }

    #[test]
    fn test_overlap_ratio_and_best_pair() {
        let left = table("name,code\nLA,1\nNYC,2\nSF,3\n");
        let right = table("id,city\n9,la\n8,sf\n7,Boston\n");
        let li = ColumnKeyIndex::build(&left);
        let ri = ColumnKeyIndex::build(&right);

        let ratio = li.fingerprint(0).unwrap().overlap_ratio(ri.fingerprint(1).unwrap());
        assert!((ratio - 2.0 / 3.0).abs() < 1e-9);

        let (l, r, score) = ColumnKeyIndex::best_pair(&li, &ri, &[0, 1], &[0, 1]).unwrap();
        assert_eq!((l, r), (0, 1));
        assert!(score > 0.6);
    }

    #[test]
    fn test_best_pair_empty_candidates() {
        let t = table("a\n1\n");
        let index = ColumnKeyIndex::build(&t);
        assert!(ColumnKeyIndex::best_pair(&index, &index, &[], &[0]).is_none());
    }
}
