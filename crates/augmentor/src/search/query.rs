//! Search queries and their generation from supplied data.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{AugmentError, Result};
use crate::index::tokenize;
use crate::input::Table;
use crate::temporal::{parse_time_column, Granularity, TimeRange};

/// Prefix marking a variable constraint as a time column.
pub const TIME_COLUMN_MARK: &str = "__time_column__";

/// Separator inside encoded time constraint keys and values.
const FIELD_SEPARATOR: &str = "____";

/// Default cap on distinct values sampled from one text column.
pub const MAX_ENTITIES_LENGTH: usize = 1000;

/// A required variable: a column name and the values it should contain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableConstraint {
    pub key: String,
    pub values: String,
}

impl VariableConstraint {
    pub fn new(key: impl Into<String>, values: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            values: values.into(),
        }
    }

    /// Encode a time column as `MARK____name` / `start____end____granularity`.
    pub fn temporal(column: &str, range: &TimeRange, granularity: Granularity) -> Self {
        Self {
            key: format!("{}{}{}", TIME_COLUMN_MARK, FIELD_SEPARATOR, column),
            values: [
                range.start.to_rfc3339(),
                range.end.to_rfc3339(),
                granularity.to_string(),
            ]
            .join(FIELD_SEPARATOR),
        }
    }

    pub fn is_temporal(&self) -> bool {
        self.key.starts_with(TIME_COLUMN_MARK)
    }

    /// Decode a time constraint into `(column, range, granularity)`.
    pub fn decode_temporal(&self) -> Result<Option<TemporalConstraint>> {
        if !self.is_temporal() {
            return Ok(None);
        }
        let column = self
            .key
            .strip_prefix(TIME_COLUMN_MARK)
            .and_then(|rest| rest.strip_prefix(FIELD_SEPARATOR))
            .filter(|name| !name.is_empty())
            .ok_or_else(|| {
                AugmentError::InvalidInput(format!("time constraint '{}' names no column", self.key))
            })?
            .to_string();
        let parts: Vec<&str> = self.values.split(FIELD_SEPARATOR).collect();
        let [start, end, granularity] = parts.as_slice() else {
            return Err(AugmentError::InvalidInput(format!(
                "malformed time constraint '{}'",
                self.values
            )));
        };
        Ok(Some(TemporalConstraint {
            column,
            range: TimeRange::parse(start, end)?,
            granularity: granularity.parse()?,
        }))
    }
}

/// A time window requested by a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalConstraint {
    /// Supplied column the window was taken from.
    pub column: String,
    pub range: TimeRange,
    pub granularity: Granularity,
}

/// Keywords plus required variables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatamartQuery {
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub variables: Vec<VariableConstraint>,
}

impl DatamartQuery {
    pub fn new(keywords: Vec<String>, variables: Vec<VariableConstraint>) -> Self {
        Self {
            keywords,
            variables,
        }
    }

    /// All decodable time constraints.
    pub fn temporal_constraints(&self) -> Result<Vec<TemporalConstraint>> {
        self.variables
            .iter()
            .filter_map(|v| v.decode_temporal().transpose())
            .collect()
    }

    /// Non-time variable names: the supplied columns a keyword hit matched on.
    pub fn variable_columns(&self) -> Vec<&str> {
        self.variables
            .iter()
            .filter(|v| !v.is_temporal())
            .map(|v| v.key.as_str())
            .collect()
    }

    /// Build a query from selected columns of the supplied data.
    ///
    /// Temporal columns become time constraints covering their values; a temporal
    /// column that fails to parse is handled as text. Text columns contribute the
    /// sorted distinct words of up to `max_entities` sampled distinct values.
    pub fn from_table(
        supplied: &Table,
        columns: &[usize],
        max_entities: usize,
        rng: &mut fastrand::Rng,
    ) -> Result<Self> {
        let mut query = DatamartQuery::default();

        for &index in columns {
            let column = supplied.column(index).ok_or_else(|| AugmentError::InvalidInput(
                format!("query column {} out of range", index),
            ))?;
            let name = column.name();

            if column.metadata.is_temporal() {
                match parse_time_column(&column.values) {
                    Ok(parsed) => {
                        let present: Vec<_> = parsed.into_iter().flatten().collect();
                        let granularity = column
                            .metadata
                            .time_granularity
                            .or_else(|| Granularity::detect(&present));
                        if let (Some(range), Some(granularity)) =
                            (TimeRange::covering(present), granularity)
                        {
                            let constraint = VariableConstraint::temporal(name, &range, granularity);
                            query.keywords.push(constraint.key.clone());
                            query.variables.push(constraint);
                        }
                        continue;
                    }
                    Err(e) => {
                        log::warn!("column '{}' treated as text for search: {}", name, e);
                    }
                }
            }

            let mut entities: Vec<&str> = column
                .values
                .iter()
                .map(|v| v.as_str())
                .filter(|v| !Table::is_null_value(v))
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
            if entities.len() > max_entities {
                entities = sample(entities, max_entities, rng);
            }
            let words: BTreeSet<String> = entities.iter().flat_map(|v| tokenize(v)).collect();
            query.keywords.push(name.to_string());
            query.variables.push(VariableConstraint::new(
                name,
                words.into_iter().collect::<Vec<_>>().join(" "),
            ));
        }

        Ok(query)
    }
}

/// Sample `k` items without replacement; output keeps the input order.
pub(crate) fn sample<T>(items: Vec<T>, k: usize, rng: &mut fastrand::Rng) -> Vec<T> {
    if items.len() <= k {
        return items;
    }
    let mut positions: Vec<usize> = (0..items.len()).collect();
    rng.shuffle(&mut positions);
    let keep: BTreeSet<usize> = positions.into_iter().take(k).collect();
    items
        .into_iter()
        .enumerate()
        .filter(|(i, _)| keep.contains(i))
        .map(|(_, item)| item)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Parser;

    fn table(csv: &str) -> Table {
        Parser::new().parse_bytes(csv.as_bytes(), b',').unwrap()
    }

    #[test]
    fn test_temporal_constraint_round_trip() {
        let range = TimeRange::parse("2020-01-01", "2020-12-31").unwrap();
        let v = VariableConstraint::temporal("date", &range, Granularity::Day);
        assert!(v.is_temporal());

        let decoded = v.decode_temporal().unwrap().unwrap();
        assert_eq!(decoded.column, "date");
        assert_eq!(decoded.range, range);
        assert_eq!(decoded.granularity, Granularity::Day);
    }

    #[test]
    fn test_malformed_time_constraint() {
        let v = VariableConstraint::new(format!("{}____date", TIME_COLUMN_MARK), "2020-01-01");
        assert!(v.decode_temporal().is_err());
        assert!(VariableConstraint::new("city", "la").decode_temporal().unwrap().is_none());
    }

    #[test]
    fn test_from_table() {
        let supplied = table("city,date\nLos Angeles,2020-01-05\nNew York,2020-03-09\nLos Angeles,\n");
        let mut rng = fastrand::Rng::with_seed(42);
        let query = DatamartQuery::from_table(&supplied, &[0, 1], 100, &mut rng).unwrap();

        assert_eq!(query.variables.len(), 2);
        assert_eq!(query.variables[0].values, "angeles los new york");
        assert_eq!(query.variable_columns(), vec!["city"]);

        let temporal = query.temporal_constraints().unwrap();
        assert_eq!(temporal.len(), 1);
        assert_eq!(temporal[0].granularity, Granularity::Day);
        assert_eq!(temporal[0].range, TimeRange::parse("2020-01-05", "2020-03-09").unwrap());
        assert_eq!(temporal[0].column, "date");
        assert!(supplied.column_index(&temporal[0].column).is_some());
    }

    #[test]
    fn test_time_column_name_with_underscores_survives() {
        let range = TimeRange::parse("2021-01-01", "2021-06-30").unwrap();
        for name in ["_date", "obs____month", "date_"] {
            let v = VariableConstraint::temporal(name, &range, Granularity::Month);
            assert_eq!(v.decode_temporal().unwrap().unwrap().column, name);
        }
        let bare = VariableConstraint::new(TIME_COLUMN_MARK, "2020-01-01____2020-02-01____day");
        assert!(matches!(bare.decode_temporal(), Err(AugmentError::InvalidInput(_))));
    }

    #[test]
    fn test_sampling_is_seeded() {
        let items: Vec<usize> = (0..50).collect();
        let a = sample(items.clone(), 5, &mut fastrand::Rng::with_seed(42));
        let b = sample(items, 5, &mut fastrand::Rng::with_seed(42));
        assert_eq!(a, b);
        assert_eq!(a.len(), 5);
        assert!(a.windows(2).all(|w| w[0] < w[1]));
    }
}
