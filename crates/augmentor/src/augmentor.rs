//! Main Augmentor struct and public API.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::error::{AugmentError, Result};
use crate::index::ColumnKeyIndex;
use crate::input::{Parser, ParserConfig, SourceMetadata, Table};
use crate::join::{CardinalityGuard, JoinSpec, MatcherConfig, RowMatcher, DEFAULT_CARDINALITY_RATIO};
use crate::merge::{AugmentMerger, MergedTable};
use crate::provider::{
    cache_key, Collaborators, CompanionSource, EmbeddingSource, EntityPropertySource, GeoEntityResolver,
    ResultCache,
};
use crate::search::{
    discover_geospatial_results, discover_identifier_results, discover_vector_results, rank,
    DiscoveryConfig, SearchResult,
};

/// Configuration for augmentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AugmentConfig {
    /// Parser configuration for local inputs.
    pub parser: ParserConfig,
    /// Row matcher configuration.
    pub matcher: MatcherConfig,
    /// Fan-out ratio for the n-to-m guard.
    pub cardinality_ratio: f64,
    /// Consult and fill the result cache when one is attached.
    pub use_cache: bool,
    /// Wall-clock budget per augmentation (None = unlimited).
    pub time_budget_ms: Option<u64>,
    pub discovery: DiscoveryConfig,
    /// Seed for entity sampling.
    pub seed: u64,
}

impl Default for AugmentConfig {
    fn default() -> Self {
        Self {
            parser: ParserConfig::default(),
            matcher: MatcherConfig::default(),
            cardinality_ratio: DEFAULT_CARDINALITY_RATIO,
            use_cache: true,
            time_budget_ms: None,
            discovery: DiscoveryConfig::default(),
            seed: 42,
        }
    }
}

impl AugmentConfig {
    /// Load from a JSON file; missing fields take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| AugmentError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: AugmentConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.matcher.validate()?;
        CardinalityGuard::with_ratio(self.cardinality_ratio)?;
        Ok(())
    }

    pub fn with_matcher(mut self, matcher: MatcherConfig) -> Self {
        self.matcher = matcher;
        self
    }

    pub fn with_cardinality_ratio(mut self, ratio: f64) -> Self {
        self.cardinality_ratio = ratio;
        self
    }

    pub fn with_time_budget_ms(mut self, budget_ms: u64) -> Self {
        self.time_budget_ms = Some(budget_ms);
        self
    }

    pub fn with_use_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// What the cache holds for one (supplied table, search result) key.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum CachedAugmentation {
    Success { merged: MergedTable },
    Failure { message: String },
}

/// Outcome of one candidate in [`Augmentor::augment_each`].
#[derive(Debug)]
pub struct CandidateOutcome {
    pub id: String,
    pub score: f64,
    pub outcome: Result<MergedTable>,
}

/// The main augmentation engine.
pub struct Augmentor {
    config: AugmentConfig,
    parser: Parser,
    matcher: RowMatcher,
    guard: CardinalityGuard,
    merger: AugmentMerger,
    collaborators: Collaborators,
}

impl Augmentor {
    /// Create an Augmentor with default configuration and no collaborators.
    pub fn new() -> Self {
        let config = AugmentConfig::default();
        Self {
            parser: Parser::with_config(config.parser.clone()),
            matcher: RowMatcher::with_config(config.matcher.clone()),
            guard: CardinalityGuard::new(),
            merger: AugmentMerger::new(),
            collaborators: Collaborators::default(),
            config,
        }
    }

    /// Create an Augmentor with custom configuration.
    pub fn with_config(config: AugmentConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            parser: Parser::with_config(config.parser.clone()),
            matcher: RowMatcher::with_config(config.matcher.clone()),
            guard: CardinalityGuard::with_ratio(config.cardinality_ratio)?,
            merger: AugmentMerger::new(),
            collaborators: Collaborators::default(),
            config,
        })
    }

    pub fn with_companions(mut self, source: impl CompanionSource + 'static) -> Self {
        self.collaborators.companions = Some(Arc::new(source));
        self
    }

    pub fn with_properties(mut self, source: impl EntityPropertySource + 'static) -> Self {
        self.collaborators.properties = Some(Arc::new(source));
        self
    }

    pub fn with_embeddings(mut self, source: impl EmbeddingSource + 'static) -> Self {
        self.collaborators.embeddings = Some(Arc::new(source));
        self
    }

    pub fn with_geo(mut self, resolver: impl GeoEntityResolver + 'static) -> Self {
        self.collaborators.geo = Some(Arc::new(resolver));
        self
    }

    pub fn with_cache(mut self, cache: impl ResultCache + 'static) -> Self {
        self.collaborators.cache = Some(Arc::new(cache));
        self
    }

    /// Replace all collaborators at once (shared between augmentors).
    pub fn with_collaborators(mut self, collaborators: Collaborators) -> Self {
        self.collaborators = collaborators;
        self
    }

    pub fn config(&self) -> &AugmentConfig {
        &self.config
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    /// Read a local supplied table with the configured parser.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<(Table, SourceMetadata)> {
        self.parser.parse_file(path)
    }

    /// Identifier, vector and geospatial candidates for `supplied`, ranked.
    ///
    /// Each backend runs only when its collaborator is attached.
    pub fn discover(&self, supplied: &Table) -> Result<Vec<SearchResult>> {
        let mut rng = fastrand::Rng::with_seed(self.config.seed);
        let mut results = Vec::new();

        if let Some(source) = self.collaborators.properties.as_deref() {
            results.extend(discover_identifier_results(
                supplied,
                source,
                &self.config.discovery,
                &mut rng,
            )?);
        }
        if self.collaborators.embeddings.is_some() {
            results.extend(discover_vector_results(supplied, &self.config.discovery));
        }
        if self.collaborators.geo.is_some() {
            results.extend(discover_geospatial_results(supplied, &self.config.discovery));
        }

        log::info!("discovered {} candidates", results.len());
        Ok(rank(results, None))
    }

    /// Augment `supplied` with the companion data behind `result`.
    ///
    /// Consults the cache first; a failure recorded there is raised again
    /// without recomputing. Timeouts are never cached.
    pub fn augment(&self, supplied: &Table, result: &SearchResult) -> Result<MergedTable> {
        let key = match self.collaborators.cache() {
            Some(_) if self.config.use_cache => Some(cache_key(&(supplied.content_hash(), result))?),
            _ => None,
        };

        if let Some(key) = &key {
            if let Some(cached) = self.cache_lookup(key)? {
                log::info!("cache hit for {}", result.id());
                return match cached {
                    CachedAugmentation::Success { merged } => Ok(merged),
                    CachedAugmentation::Failure { message } => Err(AugmentError::Cache(format!(
                        "augmentation of {} failed previously: {}",
                        result.id(),
                        message
                    ))),
                };
            }
            log::debug!("cache miss for {}", result.id());
        }

        let outcome = self.run(supplied, result, None);

        if let Some(key) = &key {
            self.cache_store(key, &outcome);
        }
        outcome
    }

    /// Augment with a previously serialized join spec instead of resolving one.
    pub fn augment_with_join(
        &self,
        supplied: &Table,
        result: &SearchResult,
        spec: &JoinSpec,
    ) -> Result<MergedTable> {
        self.run(supplied, result, Some(spec))
    }

    /// Evaluate every candidate independently; one failure never stops the rest.
    pub fn augment_each(&self, supplied: &Table, results: &[SearchResult]) -> Vec<CandidateOutcome> {
        results
            .iter()
            .map(|result| {
                let outcome = self.augment(supplied, result);
                if let Err(e) = &outcome {
                    log::warn!("candidate {} failed: {}", result.id(), e);
                }
                CandidateOutcome {
                    id: result.id(),
                    score: result.score(),
                    outcome,
                }
            })
            .collect()
    }

    fn run(&self, supplied: &Table, result: &SearchResult, fixed: Option<&JoinSpec>) -> Result<MergedTable> {
        let started = Instant::now();

        if let SearchResult::Identifier(hit) = result {
            if supplied.column_index(&hit.target_column).is_none() {
                return hit.placeholder(supplied);
            }
        }

        let prepared = result.prepare_supplied(supplied, &self.collaborators)?;
        self.check_budget("prepare", started)?;

        let companion = result.download(&prepared, &self.collaborators)?;
        self.check_budget("download", started)?;

        let spec = match fixed {
            Some(spec) => spec.clone(),
            None => {
                let specs = result.resolve_join(&prepared, Some(&companion))?;
                self.choose_spec(&prepared, &companion, specs)?
            }
        };
        self.check_budget("resolve", started)?;

        let outcome = self.matcher.find_pairs(&prepared, &companion, &spec)?;
        log::info!(
            "{}: {} pairs, {} shape, coverage {:.3}",
            result.id(),
            outcome.pairs.len(),
            outcome.quality.profile.shape(),
            outcome.quality.coverage
        );
        self.check_budget("match", started)?;

        self.guard.check(&outcome.pairs, prepared.row_count())?;

        let options = result.merge_options(&companion, &spec);
        let merged = self.merger.merge(&prepared, &companion, &outcome.pairs, &options)?;
        self.check_budget("merge", started)?;
        Ok(merged)
    }

    /// Pick one spec: the only one, the best-overlapping one, or a fallback pair
    /// found by key overlap when nothing was declared.
    fn choose_spec(&self, left: &Table, right: &Table, mut specs: Vec<JoinSpec>) -> Result<JoinSpec> {
        let left_index = ColumnKeyIndex::build(left);
        let right_index = ColumnKeyIndex::build(right);

        match specs.len() {
            0 => {
                let left_all: Vec<usize> = (0..left.column_count()).collect();
                let right_all: Vec<usize> = (0..right.column_count()).collect();
                match ColumnKeyIndex::best_pair(&left_index, &right_index, &left_all, &right_all) {
                    Some((l, r, score)) if score > 0.0 => {
                        log::info!(
                            "no declared keys; joining '{}' to '{}' by overlap {:.3}",
                            left.column(l).map(|c| c.name()).unwrap_or_default(),
                            right.column(r).map(|c| c.name()).unwrap_or_default(),
                            score
                        );
                        Ok(JoinSpec::single(l, r))
                    }
                    _ => Err(AugmentError::NoJoinCandidate(
                        "no declared keys and no overlapping columns".to_string(),
                    )),
                }
            }
            1 => Ok(specs.remove(0)),
            n => {
                log::warn!("{} join specs resolved; using the one with the best key overlap", n);
                let overlap = |spec: &JoinSpec| -> f64 {
                    let scores: Vec<f64> = spec
                        .pairs()
                        .filter_map(|(l, r)| {
                            let lf = left_index.fingerprint(l.last()?.column)?;
                            let rf = right_index.fingerprint(r.last()?.column)?;
                            Some(lf.overlap_ratio(rf))
                        })
                        .collect();
                    if scores.is_empty() {
                        0.0
                    } else {
                        scores.iter().sum::<f64>() / scores.len() as f64
                    }
                };
                let mut best = 0;
                let mut best_score = f64::NEG_INFINITY;
                for (i, spec) in specs.iter().enumerate() {
                    let score = overlap(spec);
                    if score > best_score {
                        best = i;
                        best_score = score;
                    }
                }
                Ok(specs.swap_remove(best))
            }
        }
    }

    /// The budget is spent once elapsed time reaches it, so a zero budget fails at the
    /// first stage boundary.
    fn check_budget(&self, stage: &str, started: Instant) -> Result<()> {
        let elapsed = started.elapsed();
        log::debug!("stage {} done after {:?}", stage, elapsed);
        match self.config.time_budget_ms {
            Some(budget_ms) if elapsed.as_millis() >= u128::from(budget_ms) => Err(AugmentError::Timeout {
                stage: stage.to_string(),
                budget_ms,
            }),
            _ => Ok(()),
        }
    }

    fn cache_lookup(&self, key: &str) -> Result<Option<CachedAugmentation>> {
        let Some(cache) = self.collaborators.cache() else {
            return Ok(None);
        };
        match cache.cache_get(key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn cache_store(&self, key: &str, outcome: &Result<MergedTable>) {
        let Some(cache) = self.collaborators.cache() else { return };
        let entry = match outcome {
            Ok(merged) => CachedAugmentation::Success { merged: merged.clone() },
            Err(AugmentError::Timeout { .. }) => return,
            Err(e) => CachedAugmentation::Failure { message: e.to_string() },
        };
        let stored = serde_json::to_vec(&entry)
            .map_err(AugmentError::from)
            .and_then(|bytes| cache.cache_put(key, &bytes));
        match stored {
            Ok(true) => log::debug!("cached augmentation under {}", key),
            Ok(false) => log::debug!("cache declined {}", key),
            Err(e) => log::warn!("failed to cache augmentation: {}", e),
        }
    }
}

impl Default for Augmentor {
    fn default() -> Self {
        Self::new()
    }
}
