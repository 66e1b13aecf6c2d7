//! Global feature importances aggregated over every split of an ensemble.

use std::fmt;

use rayon::prelude::*;
use sylva_tree::{NodeKind, ParsedTree};
use tracing::{debug, instrument};

use crate::ensemble::Ensemble;
use crate::error::ExplainError;
use crate::features::{FeatureIndex, FeatureNames};
use crate::top::FeatureWeight;

/// Method label attached to importance explanations.
pub const FEATURE_IMPORTANCES: &str = "feature importances";

/// What a split contributes to its feature's importance.
///
/// Matches XGBoost's `importance_type`. `Gain` and `Cover` need a dump
/// written with statistics (`with_stats=True`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportanceType {
    /// Number of splits on the feature.
    #[default]
    Weight,
    /// Mean loss reduction of the splits on the feature.
    Gain,
    /// Mean cover of the splits on the feature.
    Cover,
}

impl fmt::Display for ImportanceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Weight => write!(f, "weight"),
            Self::Gain => write!(f, "gain"),
            Self::Cover => write!(f, "cover"),
        }
    }
}

/// Normalized importances, largest first.
///
/// Values of all features sum to 1 (unless no split exists); only the kept
/// ones are listed and `remaining` counts the other non-zero features.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize)]
pub struct FeatureImportances {
    /// Kept features, descending by importance.
    pub importances: Vec<FeatureWeight>,
    /// Number of non-zero features left out.
    pub remaining: usize,
}

/// Per-feature split count and statistic sum of one tree.
struct SplitTotals {
    counts: Vec<usize>,
    sums: Vec<f64>,
}

/// Compute normalized feature importances of `ensemble`.
///
/// Splits are tallied per feature across every tree. `Weight` scores a
/// feature by its split count, `Gain` and `Cover` by the mean statistic of
/// its splits. Scores are then divided by their total. `top` keeps the `k`
/// largest positive scores (ties keep the lower feature index first);
/// `None` keeps all of them.
///
/// # Errors
///
/// | Variant | When |
/// |---|---|
/// | [`ExplainError::Importance`] | a split names an unknown feature or lacks the requested statistic |
#[instrument(skip(ensemble, names), fields(n_trees = ensemble.n_trees()))]
pub fn feature_importances(
    ensemble: &Ensemble,
    names: &FeatureNames,
    importance_type: ImportanceType,
    top: Option<usize>,
) -> Result<FeatureImportances, ExplainError> {
    let per_tree: Vec<Result<SplitTotals, ExplainError>> = ensemble
        .trees()
        .par_iter()
        .enumerate()
        .map(|(tree_index, tree)| {
            tree_totals(tree, names, importance_type).map_err(|e| ExplainError::Importance {
                tree_index,
                source: Box::new(e),
            })
        })
        .collect();

    let n_features = names.len();
    let mut counts = vec![0usize; n_features];
    let mut sums = vec![0.0f64; n_features];
    for totals in per_tree {
        let totals = totals?;
        counts.iter_mut().zip(&totals.counts).for_each(|(c, t)| *c += t);
        sums.iter_mut().zip(&totals.sums).for_each(|(s, t)| *s += t);
    }

    let mut scores: Vec<f64> = counts
        .iter()
        .zip(&sums)
        .map(|(&count, &sum)| match importance_type {
            ImportanceType::Weight => count as f64,
            ImportanceType::Gain | ImportanceType::Cover if count > 0 => sum / count as f64,
            ImportanceType::Gain | ImportanceType::Cover => 0.0,
        })
        .collect();
    let total: f64 = scores.iter().sum();
    if total > 0.0 {
        scores.iter_mut().for_each(|v| *v /= total);
    }

    let mut ranked: Vec<(usize, f64)> = scores
        .into_iter()
        .enumerate()
        .filter(|&(_, v)| v > 0.0)
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    let n_keep = top.map_or(ranked.len(), |k| k.min(ranked.len()));
    let remaining = ranked.len() - n_keep;

    let importances: Vec<FeatureWeight> = ranked
        .into_iter()
        .take(n_keep)
        .map(|(i, weight)| FeatureWeight {
            feature: names.name(FeatureIndex::new(i)).to_string(),
            weight,
        })
        .collect();

    debug!(
        %importance_type,
        n_kept = importances.len(),
        remaining,
        "feature importances computed"
    );
    Ok(FeatureImportances {
        importances,
        remaining,
    })
}

fn tree_totals(
    tree: &ParsedTree,
    names: &FeatureNames,
    importance_type: ImportanceType,
) -> Result<SplitTotals, ExplainError> {
    let mut totals = SplitTotals {
        counts: vec![0; names.len()],
        sums: vec![0.0; names.len()],
    };
    for node in tree.nodes() {
        let NodeKind::Split { feature, .. } = node.kind() else {
            continue;
        };
        let slot = names.lookup(feature)?.index();
        let stat = match importance_type {
            ImportanceType::Weight => Some(0.0),
            ImportanceType::Gain => node.stats().gain,
            ImportanceType::Cover => node.stats().cover,
        };
        let Some(stat) = stat else {
            return Err(ExplainError::MissingSplitStat {
                node_id: node.id().value(),
                stat: importance_type.to_string(),
            });
        };
        totals.counts[slot] += 1;
        totals.sums[slot] += stat;
    }
    Ok(totals)
}
