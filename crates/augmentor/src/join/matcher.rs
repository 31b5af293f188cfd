//! Row-level record linkage between two tables.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::pairs::{CardinalityProfile, RowPairSet};
use super::similarity::key_similarity;
use super::spec::{ColumnDescriptor, ColumnGroup, JoinSpec};
use crate::error::{AugmentError, Result};
use crate::index::KeyBlockIndex;
use crate::input::{Column, Table};
use crate::schema::{ColumnMetadata, LogicalType, TableSide};
use crate::temporal::TemporalAligner;

/// How key values are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinMode {
    /// Exact for entity-id keys, fuzzy otherwise.
    #[default]
    Auto,
    /// Case-sensitive equality of raw key strings.
    Exact,
    /// Blocking plus similarity threshold over normalized keys.
    Fuzzy,
}

impl fmt::Display for JoinMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinMode::Auto => write!(f, "auto"),
            JoinMode::Exact => write!(f, "exact"),
            JoinMode::Fuzzy => write!(f, "fuzzy"),
        }
    }
}

impl FromStr for JoinMode {
    type Err = AugmentError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(JoinMode::Auto),
            "exact" | "identifier" => Ok(JoinMode::Exact),
            "fuzzy" | "text" => Ok(JoinMode::Fuzzy),
            other => Err(AugmentError::InvalidInput(format!(
                "unknown join mode '{}' (expected auto, exact or fuzzy)",
                other
            ))),
        }
    }
}

/// Row matcher configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Comparison mode.
    pub mode: JoinMode,
    /// Minimum similarity for a fuzzy match, in `[0, 1]`.
    pub similarity_threshold: f64,
    /// Separator placed between composite key components.
    pub key_delimiter: String,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            mode: JoinMode::Auto,
            similarity_threshold: 0.8,
            key_delimiter: "|".to_string(),
        }
    }
}

impl MatcherConfig {
    pub fn with_mode(mut self, mode: JoinMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    /// Reject thresholds outside `[0, 1]`.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(AugmentError::InvalidInput(format!(
                "similarity threshold {} is outside [0, 1]",
                self.similarity_threshold
            )));
        }
        Ok(())
    }
}

/// Summary of how well two tables matched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchQuality {
    /// Mode actually used for each group pair.
    pub modes: Vec<JoinMode>,
    /// Whether any group pair was aligned on time.
    pub temporal: bool,
    /// Left rows with at least one pair.
    pub matched_left_rows: usize,
    /// Total left rows.
    pub left_rows: usize,
    /// `matched_left_rows / left_rows`.
    pub coverage: f64,
    /// Mean similarity over all pairs (1.0 for exact pairs).
    pub mean_similarity: f64,
    /// Fan-out on both sides.
    pub profile: CardinalityProfile,
}

/// Result of [`RowMatcher::find_pairs`].
#[derive(Debug, Clone)]
pub struct MatchOutcome {
    /// One row per pair: `left_index, right_index, left_key, right_key, similarity`.
    pub preview: Table,
    pub pairs: RowPairSet,
    pub quality: MatchQuality,
}

/// Finds corresponding rows in two tables for a [`JoinSpec`].
#[derive(Debug, Clone, Default)]
pub struct RowMatcher {
    config: MatcherConfig,
    aligner: TemporalAligner,
}

/// Per-pair similarity, highest across group pairs.
type Scores = BTreeMap<(usize, usize), f64>;

impl RowMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: MatcherConfig) -> Self {
        Self {
            config,
            aligner: TemporalAligner::new(),
        }
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Pair rows of `left` and `right` on the key groups of `spec`.
    ///
    /// Each group pair is an alternative key; a row pair found by any group is kept.
    /// Pairs come out in ascending `(left, right)` order. Either table being empty
    /// yields an empty result rather than an error.
    pub fn find_pairs(&self, left: &Table, right: &Table, spec: &JoinSpec) -> Result<MatchOutcome> {
        self.config.validate()?;
        if spec.is_empty() {
            return Err(AugmentError::InvalidInput(
                "join spec has no column groups".to_string(),
            ));
        }
        for (l, r) in spec.pairs() {
            check_group(l, TableSide::Left, left)?;
            check_group(r, TableSide::Right, right)?;
        }

        let mut scores = Scores::new();
        let mut modes = Vec::with_capacity(spec.len());
        let mut temporal = false;

        if left.row_count() > 0 && right.row_count() > 0 {
            for (l, r) in spec.pairs() {
                let (mode, aligned, group_scores) = self.match_group(left, right, l, r)?;
                modes.push(mode);
                temporal |= aligned;
                for (pair, score) in group_scores {
                    let entry = scores.entry(pair).or_insert(score);
                    *entry = entry.max(score);
                }
            }
        }

        let pairs: RowPairSet = scores.keys().copied().collect();
        let quality = quality(&pairs, &scores, left.row_count(), modes, temporal);
        let preview = self.preview(left, right, spec, &scores)?;

        log::debug!(
            "matched {} of {} left rows ({} pairs)",
            quality.matched_left_rows,
            quality.left_rows,
            pairs.len()
        );

        Ok(MatchOutcome {
            preview,
            pairs,
            quality,
        })
    }

    fn match_group(
        &self,
        left: &Table,
        right: &Table,
        left_group: &ColumnGroup,
        right_group: &ColumnGroup,
    ) -> Result<(JoinMode, bool, Scores)> {
        let split = split_temporal(left, left_group).zip(split_temporal(right, right_group));

        if let Some(((lt, lk), (rt, rk))) = split {
            if lk.is_empty() == rk.is_empty() {
                match self.aligner.align_columns(left, lt.column, right, rt.column) {
                    Ok(time_pairs) => {
                        if lk.is_empty() {
                            let scores = time_pairs.iter().map(|p| (p, 1.0)).collect();
                            return Ok((JoinMode::Exact, true, scores));
                        }
                        let (mode, key_scores) = self.match_keys(left, right, &lk, &rk);
                        let key_pairs: RowPairSet = key_scores.keys().copied().collect();
                        let kept = self.aligner.combine_with_key_pairs(&key_pairs, &time_pairs);
                        let scores = key_scores
                            .into_iter()
                            .filter(|(p, _)| kept.contains(p.0, p.1))
                            .collect();
                        return Ok((mode, true, scores));
                    }
                    Err(AugmentError::Temporal(reason)) => {
                        log::warn!(
                            "time columns '{}'/'{}' treated as text: {}",
                            column_name(left, lt.column),
                            column_name(right, rt.column),
                            reason
                        );
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        let (mode, scores) = self.match_keys(left, right, left_group, right_group);
        Ok((mode, false, scores))
    }

    fn match_keys(
        &self,
        left: &Table,
        right: &Table,
        left_group: &[ColumnDescriptor],
        right_group: &[ColumnDescriptor],
    ) -> (JoinMode, Scores) {
        let mode = self.resolve_mode(left, right, left_group, right_group);
        let left_keys = composite_keys(left, left_group, &self.config.key_delimiter);
        let right_keys = composite_keys(right, right_group, &self.config.key_delimiter);
        let right_index = KeyBlockIndex::build(&right_keys);

        let scores = match mode {
            JoinMode::Fuzzy => {
                let components = ComponentKeys::build(left, right, left_group, right_group);
                self.fuzzy_pairs(&left_keys, &right_index, components.as_ref())
            }
            _ => exact_pairs(&left_keys, &right_index),
        };
        (mode, scores)
    }

    fn resolve_mode(
        &self,
        left: &Table,
        right: &Table,
        left_group: &[ColumnDescriptor],
        right_group: &[ColumnDescriptor],
    ) -> JoinMode {
        match self.config.mode {
            JoinMode::Auto => {
                let all_ids = |table: &Table, group: &[ColumnDescriptor]| {
                    group
                        .iter()
                        .all(|d| table.column(d.column).is_some_and(|c| c.metadata.is_entity_id()))
                };
                if all_ids(left, left_group) && all_ids(right, right_group) {
                    JoinMode::Exact
                } else {
                    JoinMode::Fuzzy
                }
            }
            mode => mode,
        }
    }

    /// For each left row keep every blocked candidate that ties the row's best score,
    /// provided the best reaches the threshold.
    ///
    /// With `components`, a candidate scores its weakest column rather than the
    /// concatenated key.
    fn fuzzy_pairs(
        &self,
        left_keys: &[String],
        right_index: &KeyBlockIndex,
        components: Option<&ComponentKeys>,
    ) -> Scores {
        let left_index = KeyBlockIndex::build(left_keys);
        let mut scores = Scores::new();

        for l in 0..left_index.len() {
            let normalized = left_index.normalized(l);
            let Some(tokens) = left_index.tokens(l) else { continue };
            if normalized.is_empty() {
                continue;
            }

            let mut best = f64::MIN;
            let mut hits: Vec<(usize, f64)> = Vec::new();
            for r in right_index.block(normalized, tokens) {
                let score = match components {
                    Some(components) => components.score(l, r),
                    None => {
                        let Some(r_tokens) = right_index.tokens(r) else { continue };
                        key_similarity(normalized, tokens, right_index.normalized(r), r_tokens)
                    }
                };
                if score > best {
                    best = score;
                }
                hits.push((r, score));
            }

            if best >= self.config.similarity_threshold {
                scores.extend(
                    hits.into_iter()
                        .filter(|&(_, s)| s >= best)
                        .map(|(r, s)| ((l, r), s)),
                );
            }
        }

        scores
    }

    fn preview(&self, left: &Table, right: &Table, spec: &JoinSpec, scores: &Scores) -> Result<Table> {
        let delimiter = &self.config.key_delimiter;
        let (left_keys, right_keys) = match spec.pairs().next() {
            Some((l, r)) => (
                composite_keys(left, l, delimiter),
                composite_keys(right, r, delimiter),
            ),
            None => (Vec::new(), Vec::new()),
        };

        let mut cols: [Vec<String>; 5] = Default::default();
        for (&(l, r), &score) in scores {
            cols[0].push(l.to_string());
            cols[1].push(r.to_string());
            cols[2].push(left_keys.get(l).cloned().unwrap_or_default());
            cols[3].push(right_keys.get(r).cloned().unwrap_or_default());
            cols[4].push(format!("{:.4}", score));
        }

        let [li, ri, lk, rk, sim] = cols;
        Table::new(vec![
            Column::new(ColumnMetadata::new("left_index").with_type(LogicalType::Integer), li),
            Column::new(ColumnMetadata::new("right_index").with_type(LogicalType::Integer), ri),
            Column::new(ColumnMetadata::new("left_key"), lk),
            Column::new(ColumnMetadata::new("right_key"), rk),
            Column::new(ColumnMetadata::new("similarity").with_type(LogicalType::Float), sim),
        ])
    }
}

/// Exact, case-sensitive equality; every left row pairs with every equal right row.
fn exact_pairs(left_keys: &[String], right_index: &KeyBlockIndex) -> Scores {
    let mut scores = Scores::new();
    for (l, key) in left_keys.iter().enumerate() {
        if key.is_empty() {
            continue;
        }
        for &r in right_index.rows_with_key(key) {
            scores.insert((l, r), 1.0);
        }
    }
    scores
}

/// Per-column keys of two equally wide composite groups.
struct ComponentKeys {
    left: Vec<KeyBlockIndex>,
    right: Vec<KeyBlockIndex>,
}

impl ComponentKeys {
    /// `None` unless both groups have the same number of columns, at least two.
    fn build(
        left: &Table,
        right: &Table,
        left_group: &[ColumnDescriptor],
        right_group: &[ColumnDescriptor],
    ) -> Option<Self> {
        if left_group.len() < 2 || left_group.len() != right_group.len() {
            return None;
        }
        let per_column = |table: &Table, group: &[ColumnDescriptor]| -> Vec<KeyBlockIndex> {
            group
                .iter()
                .map(|d| KeyBlockIndex::build(&composite_keys(table, std::slice::from_ref(d), "")))
                .collect()
        };
        Some(Self {
            left: per_column(left, left_group),
            right: per_column(right, right_group),
        })
    }

    /// Lowest component similarity of a row pair; a null component scores zero.
    fn score(&self, l: usize, r: usize) -> f64 {
        self.left
            .iter()
            .zip(&self.right)
            .map(|(li, ri)| {
                let (a, b) = (li.normalized(l), ri.normalized(r));
                match (li.tokens(l), ri.tokens(r)) {
                    (Some(a_tokens), Some(b_tokens)) if !a.is_empty() && !b.is_empty() => {
                        key_similarity(a, a_tokens, b, b_tokens)
                    }
                    _ => 0.0,
                }
            })
            .fold(1.0, f64::min)
    }
}

/// Per-row key for a column group: component cells joined by `delimiter`.
///
/// A row whose components are all null gets an empty key, which never matches.
fn composite_keys(table: &Table, group: &[ColumnDescriptor], delimiter: &str) -> Vec<String> {
    (0..table.row_count())
        .map(|row| {
            let parts: Vec<&str> = group
                .iter()
                .map(|d| table.get(row, d.column).unwrap_or("").trim())
                .collect();
            if parts.iter().all(|p| Table::is_null_value(p)) {
                String::new()
            } else {
                parts.join(delimiter)
            }
        })
        .collect()
}

/// Split a group into its first temporal column and the remaining key columns.
fn split_temporal(table: &Table, group: &[ColumnDescriptor]) -> Option<(ColumnDescriptor, Vec<ColumnDescriptor>)> {
    let position = group
        .iter()
        .position(|d| table.column(d.column).is_some_and(|c| c.metadata.is_temporal()))?;
    let mut rest = group.to_vec();
    let time = rest.remove(position);
    Some((time, rest))
}

fn check_group(group: &[ColumnDescriptor], side: TableSide, table: &Table) -> Result<()> {
    if group.is_empty() {
        return Err(AugmentError::InvalidInput(format!("empty {} column group", side)));
    }
    for d in group {
        if d.side != side {
            return Err(AugmentError::InvalidInput(format!(
                "{} column {} placed in the {} group",
                d.side, d.column, side
            )));
        }
        if d.column >= table.column_count() {
            return Err(AugmentError::ColumnNotFound {
                column: format!("#{}", d.column),
                side,
            });
        }
    }
    Ok(())
}

fn column_name(table: &Table, column: usize) -> &str {
    table.column(column).map(|c| c.name()).unwrap_or("?")
}

fn quality(
    pairs: &RowPairSet,
    scores: &Scores,
    left_rows: usize,
    modes: Vec<JoinMode>,
    temporal: bool,
) -> MatchQuality {
    let matched_left_rows = pairs.left_indices().len();
    let mean_similarity = if scores.is_empty() {
        0.0
    } else {
        scores.values().sum::<f64>() / scores.len() as f64
    };
    MatchQuality {
        modes,
        temporal,
        matched_left_rows,
        left_rows,
        coverage: if left_rows == 0 {
            0.0
        } else {
            matched_left_rows as f64 / left_rows as f64
        },
        mean_similarity,
        profile: pairs.profile(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Parser;
    use crate::schema::SemanticTag;

    fn table(csv: &str) -> Table {
        Parser::new().parse_bytes(csv.as_bytes(), b',').unwrap()
    }

    fn exact() -> RowMatcher {
        RowMatcher::with_config(MatcherConfig::default().with_mode(JoinMode::Exact))
    }

    fn pairs_of(outcome: &MatchOutcome) -> Vec<(usize, usize)> {
        outcome.pairs.iter().collect()
    }

    // ===== Exact mode =====

    #[test]
    fn test_exact_mode_cross_product_within_key() {
        let left = table("city\nLA\nNYC\nLA\n");
        let right = table("address\nLA\nSF\nNYC\n");
        let outcome = exact().find_pairs(&left, &right, &JoinSpec::single(0, 0)).unwrap();
        assert_eq!(pairs_of(&outcome), vec![(0, 0), (1, 2), (2, 0)]);
        assert_eq!(outcome.quality.coverage, 1.0);
        assert_eq!(outcome.preview.row_count(), 3);
    }

    #[test]
    fn test_exact_mode_is_case_sensitive() {
        let left = table("k\nla\n");
        let right = table("k\nLA\n");
        let outcome = exact().find_pairs(&left, &right, &JoinSpec::single(0, 0)).unwrap();
        assert!(outcome.pairs.is_empty());
    }

    #[test]
    fn test_auto_uses_exact_for_entity_ids() {
        let left = table("q\nQ1\nQ2\n");
        let right = table("q,v\nQ2,x\nQ3,y\n");
        let outcome = RowMatcher::new()
            .find_pairs(&left, &right, &JoinSpec::single(0, 0))
            .unwrap();
        assert_eq!(outcome.quality.modes, vec![JoinMode::Exact]);
        assert_eq!(pairs_of(&outcome), vec![(1, 0)]);
    }

    // ===== Fuzzy mode =====

    #[test]
    fn test_fuzzy_mode_normalizes_and_thresholds() {
        let left = table("city\nLos Angeles\nnew york\nChicagoo\nAustin\n");
        let right = table("name\nNew York\nlos-angeles\nChicago\nBoston\n");
        let outcome = RowMatcher::new()
            .find_pairs(&left, &right, &JoinSpec::single(0, 0))
            .unwrap();
        assert_eq!(pairs_of(&outcome), vec![(0, 1), (1, 0), (2, 2)]);
        assert_eq!(outcome.quality.modes, vec![JoinMode::Fuzzy]);
    }

    #[test]
    fn test_fuzzy_ties_keep_all_best_candidates() {
        let left = table("k\nspringfield\n");
        let right = table("k\nSpringfield\nSPRINGFIELD\nShelbyville\n");
        let outcome = RowMatcher::new()
            .find_pairs(&left, &right, &JoinSpec::single(0, 0))
            .unwrap();
        assert_eq!(pairs_of(&outcome), vec![(0, 0), (0, 1)]);
    }

    #[test]
    fn test_fuzzy_is_deterministic() {
        let left = table("k\nalpha beta\nbeta\ngamma\n");
        let right = table("k\nbeta alpha\nalpha\nbeta\ngama\n");
        let matcher = RowMatcher::new();
        let spec = JoinSpec::single(0, 0);
        let a = matcher.find_pairs(&left, &right, &spec).unwrap();
        let b = matcher.find_pairs(&left, &right, &spec).unwrap();
        assert_eq!(
            serde_json::to_string(&a.pairs).unwrap(),
            serde_json::to_string(&b.pairs).unwrap()
        );
    }

    // ===== Composite keys =====

    #[test]
    fn test_composite_key_requires_full_match() {
        let left = table("city,state\nSpringfield,IL\nSpringfield,MA\n");
        let right = table("city,state,pop\nSpringfield,MA,1\nSpringfield,IL,2\n");
        let spec = JoinSpec::new(
            vec![vec![ColumnDescriptor::left(0), ColumnDescriptor::left(1)]],
            vec![vec![ColumnDescriptor::right(0), ColumnDescriptor::right(1)]],
        );
        let outcome = exact().find_pairs(&left, &right, &spec).unwrap();
        assert_eq!(pairs_of(&outcome), vec![(0, 1), (1, 0)]);
    }

    #[test]
    fn test_fuzzy_composite_key_scores_each_column() {
        let left = table("city,state\nSpringfield,IL\nSpringfeld,IL\nShelbyville,MA\n");
        let right = table("city,state,pop\nSpringfield,MA,1\nSpringfield,IL,2\n");
        let spec = JoinSpec::new(
            vec![vec![ColumnDescriptor::left(0), ColumnDescriptor::left(1)]],
            vec![vec![ColumnDescriptor::right(0), ColumnDescriptor::right(1)]],
        );
        let outcome = RowMatcher::new().find_pairs(&left, &right, &spec).unwrap();
        assert_eq!(outcome.quality.modes, vec![JoinMode::Fuzzy]);
        // The shared city never carries a mismatched state.
        assert_eq!(pairs_of(&outcome), vec![(0, 1), (1, 1)]);
    }

    #[test]
    fn test_composite_left_against_single_right_column() {
        let left = table("city,state\nAustin,TX\n");
        let right = table("address\n\"Austin, TX\"\n");
        let spec = JoinSpec::new(
            vec![vec![ColumnDescriptor::left(0), ColumnDescriptor::left(1)]],
            vec![vec![ColumnDescriptor::right(0)]],
        );
        let outcome = RowMatcher::new().find_pairs(&left, &right, &spec).unwrap();
        assert_eq!(pairs_of(&outcome), vec![(0, 0)]);
    }

    // ===== Temporal composition =====

    #[test]
    fn test_time_and_key_composite() {
        let left = table("date,city\n2020-01-15,LA\n2020-02-15,LA\n");
        let right = table("month,city,v\n2020-02,LA,x\n2020-01,LA,y\n");
        let spec = JoinSpec::new(
            vec![vec![ColumnDescriptor::left(0), ColumnDescriptor::left(1)]],
            vec![vec![ColumnDescriptor::right(0), ColumnDescriptor::right(1)]],
        );
        let outcome = exact().find_pairs(&left, &right, &spec).unwrap();
        assert!(outcome.quality.temporal);
        assert_eq!(pairs_of(&outcome), vec![(0, 1), (1, 0)]);
    }

    fn tag_temporal(t: Table) -> Table {
        let column = t.column(0).unwrap();
        let meta = column.metadata.clone().with_tag(SemanticTag::Temporal);
        Table::new(vec![Column::new(meta, column.values.clone())]).unwrap()
    }

    #[test]
    fn test_unparseable_time_falls_back_to_text() {
        let left = tag_temporal(table("when\nsoon\nlater\n"));
        let right = tag_temporal(table("when\n2020-01-01\nlater\n"));
        let outcome = exact().find_pairs(&left, &right, &JoinSpec::single(0, 0)).unwrap();
        assert!(!outcome.quality.temporal);
        assert_eq!(pairs_of(&outcome), vec![(1, 1)]);
    }

    // ===== Edge cases =====

    #[test]
    fn test_empty_tables_give_empty_pairs() {
        let left = table("k\n");
        let right = table("k\nLA\n");
        let outcome = exact().find_pairs(&left, &right, &JoinSpec::single(0, 0)).unwrap();
        assert!(outcome.pairs.is_empty());
        assert_eq!(outcome.preview.row_count(), 0);
    }

    #[test]
    fn test_null_keys_never_match() {
        let left = table("k,x\n,1\nNA,2\n");
        let right = table("k\n\nNA\n");
        let outcome = exact().find_pairs(&left, &right, &JoinSpec::single(0, 0)).unwrap();
        assert!(outcome.pairs.is_empty());
    }

    #[test]
    fn test_out_of_range_column_is_not_found() {
        let left = table("k\nLA\n");
        let right = table("k\nLA\n");
        let result = exact().find_pairs(&left, &right, &JoinSpec::single(0, 3));
        assert!(matches!(
            result,
            Err(AugmentError::ColumnNotFound { side: TableSide::Right, .. })
        ));
    }

    #[test]
    fn test_join_mode_parsing() {
        assert_eq!("EXACT".parse::<JoinMode>().unwrap(), JoinMode::Exact);
        assert!(matches!(
            "sideways".parse::<JoinMode>(),
            Err(AugmentError::InvalidInput(_))
        ));
    }
}
