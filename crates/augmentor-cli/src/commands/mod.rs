//! CLI command implementations.

pub mod augment;
pub mod hints;
pub mod score;

use augmentor::{
    AugmentConfig, CandidateJoinResolver, CardinalityGuard, CompanionView, DeclaredKeyMapping, JoinMode,
    JoinSpec, MatchOutcome, Parser, RowMatcher, SourceMetadata, Table,
};

use crate::cli::JoinArgs;

/// Tables, resolved join and match result shared by `augment` and `hints`.
pub struct Plan {
    pub config: AugmentConfig,
    pub left: Table,
    pub left_source: SourceMetadata,
    pub right: Table,
    pub right_source: SourceMetadata,
    pub spec: JoinSpec,
    pub outcome: MatchOutcome,
}

/// Load both tables, resolve the declared keys and find row pairs.
pub fn plan(args: &JoinArgs) -> Result<Plan, Box<dyn std::error::Error>> {
    let config = load_config(args)?;

    for path in [&args.left, &args.right] {
        if !path.exists() {
            return Err(format!("File not found: {}", path.display()).into());
        }
    }
    check_key_counts(args.left_keys.len(), args.right_keys.len())?;

    let parser = Parser::with_config(config.parser.clone());
    let (left, left_source) = parser.parse_file(&args.left)?;
    let (right, right_source) = parser.parse_file(&args.right)?;

    let mapping = DeclaredKeyMapping::new(args.right_keys.clone(), args.left_keys.clone());
    let resolver = CandidateJoinResolver::new();
    let view = CompanionView::Live(&right);
    let specs = match (&args.left_time, &args.right_time) {
        (Some(lt), Some(rt)) => resolver.resolve_temporal(&left, view, &mapping, lt, rt)?,
        _ => resolver.resolve(&left, view, &mapping)?,
    };
    let spec = specs
        .into_iter()
        .next()
        .ok_or("No join could be resolved from the given keys")?;

    let matcher = RowMatcher::with_config(config.matcher.clone());
    let outcome = matcher.find_pairs(&left, &right, &spec)?;

    Ok(Plan {
        config,
        left,
        left_source,
        right,
        right_source,
        spec,
        outcome,
    })
}

/// Keys pair positionally, except that one right key may serve every left key.
fn check_key_counts(left: usize, right: usize) -> Result<(), String> {
    if right == 1 || left == right {
        return Ok(());
    }
    Err(format!(
        "--left-key given {} times but --right-key {} times (use one --right-key or match the count)",
        left, right
    ))
}

/// Configuration from `--config`, with command-line flags taking precedence.
fn load_config(args: &JoinArgs) -> Result<AugmentConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => AugmentConfig::from_file(path)?,
        None => AugmentConfig::default(),
    };
    if let Some(mode) = &args.mode {
        config.matcher.mode = mode.parse::<JoinMode>()?;
    }
    if let Some(threshold) = args.threshold {
        config.matcher.similarity_threshold = threshold;
    }
    if let Some(ratio) = args.ratio {
        config.cardinality_ratio = ratio;
    }
    config.validate()?;
    Ok(config)
}

impl Plan {
    pub fn guard(&self) -> Result<CardinalityGuard, Box<dyn std::error::Error>> {
        Ok(CardinalityGuard::with_ratio(self.config.cardinality_ratio)?)
    }

    /// Column names of each group pair, left then right.
    pub fn group_names(&self) -> Vec<(Vec<String>, Vec<String>)> {
        let names = |table: &Table, cols: Vec<usize>| -> Vec<String> {
            cols.into_iter()
                .map(|c| {
                    table
                        .column(c)
                        .map(|col| col.name().to_string())
                        .unwrap_or_else(|| format!("#{}", c))
                })
                .collect()
        };
        self.spec
            .column_number_pairs()
            .into_iter()
            .map(|(l, r)| (names(&self.left, l), names(&self.right, r)))
            .collect()
    }
}
