//! Reproducible serialization of a search result and its chosen join.

use serde::{Deserialize, Serialize};

use super::result::SearchResult;
use crate::error::{AugmentError, Result};
use crate::input::Table;
use crate::join::{JoinSpec, JoinSpecRecord};

/// Format marker written into every envelope.
pub const SERIALIZATION_FORMAT: &str = "augmentor";

/// Column names for each group of a join, for human inspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinColumnNames {
    pub left_names: Vec<Vec<String>>,
    pub right_names: Vec<Vec<String>>,
}

/// JSON envelope holding a search result and, optionally, its join spec.
///
/// Only column positions are persisted, never table contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedSearchResult {
    pub format: String,
    pub id: String,
    pub score: f64,
    pub result: SearchResult,
    pub augmentation: Option<JoinSpecRecord>,
    pub column_names: Option<JoinColumnNames>,
}

impl SerializedSearchResult {
    /// Capture `result` and the join it will use against `supplied`.
    ///
    /// Right-side names come from the result's column snapshot; positions it
    /// does not cover are written as `#<index>`.
    pub fn new(result: &SearchResult, supplied: &Table, join: Option<&JoinSpec>) -> Self {
        let snapshot = result.companion_snapshot().unwrap_or_default();
        let right_name = |i: usize| {
            snapshot
                .iter()
                .find(|(_, pos)| **pos == i)
                .map(|(name, _)| name.clone())
                .unwrap_or_else(|| format!("#{}", i))
        };
        let left_name = |i: usize| {
            supplied
                .column(i)
                .map(|c| c.name().to_string())
                .unwrap_or_else(|| format!("#{}", i))
        };

        let column_names = join.map(|spec| {
            let (left_names, right_names) = spec
                .column_number_pairs()
                .into_iter()
                .map(|(l, r)| {
                    (
                        l.into_iter().map(left_name).collect::<Vec<_>>(),
                        r.into_iter().map(right_name).collect::<Vec<_>>(),
                    )
                })
                .unzip();
            JoinColumnNames {
                left_names,
                right_names,
            }
        });

        Self {
            format: SERIALIZATION_FORMAT.to_string(),
            id: result.id(),
            score: result.score(),
            result: result.clone(),
            augmentation: join.map(JoinSpec::to_record),
            column_names,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse an envelope, rejecting ones written by another system.
    pub fn from_json(json: &str) -> Result<Self> {
        let envelope: SerializedSearchResult = serde_json::from_str(json)?;
        if envelope.format != SERIALIZATION_FORMAT {
            return Err(AugmentError::InvalidInput(format!(
                "unsupported search result format '{}'",
                envelope.format
            )));
        }
        Ok(envelope)
    }

    /// Restore the result and its join spec.
    pub fn deserialize(json: &str) -> Result<(SearchResult, Option<JoinSpec>)> {
        let envelope = Self::from_json(json)?;
        let join = envelope
            .augmentation
            .as_ref()
            .map(JoinSpec::from_record)
            .transpose()?;
        Ok((envelope.result, join))
    }
}

impl SearchResult {
    /// Serialize with an optional join spec into the JSON envelope.
    pub fn serialize(&self, supplied: &Table, join: Option<&JoinSpec>) -> Result<String> {
        SerializedSearchResult::new(self, supplied, join).to_json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Parser;
    use crate::provider::CompanionDescriptor;
    use crate::search::KeywordHit;

    fn table(csv: &str) -> Table {
        Parser::new().parse_bytes(csv.as_bytes(), b',').unwrap()
    }

    fn result() -> (SearchResult, Table) {
        let companion = table("pop,address\n1,LA\n");
        let hit = KeywordHit::new("ds-7", CompanionDescriptor::new("http://example.org/ds7.csv"))
            .with_relevance(1.5)
            .with_keys(["address"], ["city"])
            .with_snapshot_of(&companion);
        (SearchResult::Keyword(hit), companion)
    }

    #[test]
    fn test_round_trip_with_join() {
        let supplied = table("id,city\n1,LA\n");
        let (result, _) = result();
        let spec = result.resolve_join(&supplied, None).unwrap().remove(0);

        let json = result.serialize(&supplied, Some(&spec)).unwrap();
        let envelope = SerializedSearchResult::from_json(&json).unwrap();
        assert_eq!(envelope.id, "ds-7");
        assert_eq!(envelope.score, 1.5);
        assert_eq!(
            envelope.column_names.unwrap().right_names,
            vec![vec!["address".to_string()]]
        );

        let (restored, join) = SerializedSearchResult::deserialize(&json).unwrap();
        assert_eq!(restored, result);
        assert_eq!(join.unwrap().column_number_pairs(), spec.column_number_pairs());
    }

    #[test]
    fn test_round_trip_without_join() {
        let supplied = table("id,city\n1,LA\n");
        let (result, _) = result();
        let json = result.serialize(&supplied, None).unwrap();
        let (_, join) = SerializedSearchResult::deserialize(&json).unwrap();
        assert!(join.is_none());
    }

    #[test]
    fn test_foreign_format_rejected() {
        let supplied = table("id,city\n1,LA\n");
        let (result, _) = result();
        let mut envelope = SerializedSearchResult::new(&result, &supplied, None);
        envelope.format = "other".to_string();
        let json = envelope.to_json().unwrap();
        assert!(matches!(
            SerializedSearchResult::deserialize(&json),
            Err(AugmentError::InvalidInput(_))
        ));
    }
}
