//! Ensemble parsing and per-class aggregation of tree contributions.

use std::fmt;

use rayon::prelude::*;
use sylva_tree::{NodeId, NodeKind, ParsedTree};
use tracing::{debug, info, instrument};

use crate::contribution::Contribution;
use crate::decompose::decompose;
use crate::error::ExplainError;
use crate::features::{FeatureNames, positional_index};

/// Learning task of a boosted ensemble, which fixes how trees group into classes.
///
/// XGBoost lays out multiclass boosters round by round, but the flat dump
/// list handed to [`Ensemble::parse`] is expected grouped by class: the
/// first `n_trees / n_classes` dumps score class 0, the next block class 1,
/// and so on. [`group_by_class`] converts the native order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum EnsembleKind {
    /// One output; every tree contributes to it.
    Regression,
    /// Two classes scored by one margin; every tree contributes to it.
    Binary,
    /// One tree block per class.
    Multiclass {
        /// Number of classes, at least 2.
        n_classes: usize,
    },
}

impl EnsembleKind {
    /// Create a multiclass kind.
    ///
    /// # Errors
    ///
    /// Returns [`ExplainError::InvalidClassCount`] if `n_classes < 2`.
    pub fn multiclass(n_classes: usize) -> Result<Self, ExplainError> {
        if n_classes < 2 {
            return Err(ExplainError::InvalidClassCount { n_classes });
        }
        Ok(Self::Multiclass { n_classes })
    }

    /// Return the number of tree groups (margins) this kind produces.
    #[must_use]
    pub fn n_groups(self) -> usize {
        match self {
            Self::Regression | Self::Binary => 1,
            Self::Multiclass { n_classes } => n_classes,
        }
    }
}

impl fmt::Display for EnsembleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Regression => write!(f, "regression"),
            Self::Binary => write!(f, "binary"),
            Self::Multiclass { n_classes } => write!(f, "multiclass ({n_classes} classes)"),
        }
    }
}

/// A parsed boosted ensemble ready to explain predictions.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Ensemble {
    pub(crate) kind: EnsembleKind,
    pub(crate) trees: Vec<ParsedTree>,
    pub(crate) n_estimators_per_class: usize,
}

impl Ensemble {
    /// Parse and index every tree dump in parallel.
    ///
    /// # Errors
    ///
    /// | Variant | When |
    /// |---|---|
    /// | [`ExplainError::EmptyEnsemble`]     | `dumps` is empty |
    /// | [`ExplainError::UnevenClassGroups`] | tree count not a multiple of the class count |
    /// | [`ExplainError::Dump`]              | a dump fails to parse (lowest failing index wins) |
    #[instrument(skip(dumps), fields(n_trees = dumps.len()))]
    pub fn parse<S: AsRef<str> + Sync>(
        dumps: &[S],
        kind: EnsembleKind,
    ) -> Result<Self, ExplainError> {
        if dumps.is_empty() {
            return Err(ExplainError::EmptyEnsemble);
        }
        let n_groups = kind.n_groups();
        if dumps.len() % n_groups != 0 {
            return Err(ExplainError::UnevenClassGroups {
                n_trees: dumps.len(),
                n_classes: n_groups,
            });
        }

        let trees = parse_trees(dumps)?;
        let n_estimators_per_class = trees.len() / n_groups;

        info!(
            %kind,
            n_trees = trees.len(),
            n_estimators_per_class,
            n_nodes = trees.iter().map(ParsedTree::n_nodes).sum::<usize>(),
            "ensemble parsed"
        );

        Ok(Self {
            kind,
            trees,
            n_estimators_per_class,
        })
    }

    /// Decompose one example's prediction into per-class contributions.
    ///
    /// `leaf_ids[i]` is the leaf that tree `i` routed the example to, as
    /// reported by the booster's leaf-prediction mode. Returns one
    /// [`Contribution`] per class; regression and binary ensembles yield one.
    ///
    /// # Errors
    ///
    /// | Variant | When |
    /// |---|---|
    /// | [`ExplainError::ShapeMismatch`] | `leaf_ids.len()` differs from the tree count |
    /// | [`ExplainError::Decompose`]     | a leaf or feature is unknown to its tree |
    pub fn explain(
        &self,
        leaf_ids: &[NodeId],
        names: &FeatureNames,
    ) -> Result<Vec<Contribution>, ExplainError> {
        check_shape(self.trees.len(), leaf_ids.len())?;
        aggregate_groups(&self.trees, leaf_ids, self.n_estimators_per_class, names)
    }

    /// Decompose many examples in parallel, one leaf row per example.
    ///
    /// # Errors
    ///
    /// Same as [`Ensemble::explain`]; the lowest failing row wins.
    #[instrument(skip_all, fields(n_rows = rows.len(), n_trees = self.trees.len()))]
    pub fn explain_batch(
        &self,
        rows: &[Vec<NodeId>],
        names: &FeatureNames,
    ) -> Result<Vec<Vec<Contribution>>, ExplainError> {
        let results: Vec<Result<Vec<Contribution>, ExplainError>> = rows
            .par_iter()
            .map(|leaf_ids| self.explain(leaf_ids, names))
            .collect();
        let out: Vec<Vec<Contribution>> = results.into_iter().collect::<Result<_, _>>()?;
        debug!(n_rows = out.len(), "batch explained");
        Ok(out)
    }

    /// Return the learning task.
    #[must_use]
    pub fn kind(&self) -> EnsembleKind {
        self.kind
    }

    /// Return every tree in dump order.
    #[must_use]
    pub fn trees(&self) -> &[ParsedTree] {
        &self.trees
    }

    /// Return the number of trees.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Return the number of trees that score each class.
    #[must_use]
    pub fn n_estimators_per_class(&self) -> usize {
        self.n_estimators_per_class
    }

    /// Return the trees that score class `class`.
    ///
    /// # Panics
    ///
    /// Panics if `class >= self.kind().n_groups()`.
    #[must_use]
    pub fn class_trees(&self, class: usize) -> &[ParsedTree] {
        let start = class * self.n_estimators_per_class;
        &self.trees[start..start + self.n_estimators_per_class]
    }

    /// Return the smallest feature count that covers every positional
    /// `f<N>` split token, or 0 if no split uses one.
    #[must_use]
    pub fn positional_feature_count(&self) -> usize {
        self.trees
            .iter()
            .flat_map(|tree| tree.nodes())
            .filter_map(|node| match node.kind() {
                NodeKind::Split { feature, .. } => positional_index(feature),
                NodeKind::Leaf { .. } => None,
            })
            .max()
            .map_or(0, |max| max + 1)
    }
}

/// Parse raw dumps and decompose one example in a single call.
///
/// Trees are grouped into consecutive blocks of `n_estimators_per_class`;
/// each block yields one [`Contribution`]. Every shape check runs before
/// any dump is parsed.
///
/// # Errors
///
/// | Variant | When |
/// |---|---|
/// | [`ExplainError::ShapeMismatch`]         | `dumps` and `leaf_ids` differ in length |
/// | [`ExplainError::EmptyEnsemble`]         | `dumps` is empty |
/// | [`ExplainError::InvalidEstimatorCount`] | `n_estimators_per_class` is zero |
/// | [`ExplainError::IndivisibleEnsemble`]   | tree count not a multiple of `n_estimators_per_class` |
/// | [`ExplainError::Dump`]                  | a dump fails to parse |
/// | [`ExplainError::Decompose`]             | a leaf or feature is unknown to its tree |
#[instrument(skip(dumps, leaf_ids, names), fields(n_trees = dumps.len()))]
pub fn explain_dumps<S: AsRef<str> + Sync>(
    dumps: &[S],
    leaf_ids: &[NodeId],
    n_estimators_per_class: usize,
    names: &FeatureNames,
) -> Result<Vec<Contribution>, ExplainError> {
    check_shape(dumps.len(), leaf_ids.len())?;
    if dumps.is_empty() {
        return Err(ExplainError::EmptyEnsemble);
    }
    if n_estimators_per_class == 0 {
        return Err(ExplainError::InvalidEstimatorCount);
    }
    if dumps.len() % n_estimators_per_class != 0 {
        return Err(ExplainError::IndivisibleEnsemble {
            n_trees: dumps.len(),
            n_estimators_per_class,
        });
    }

    let trees = parse_trees(dumps)?;
    aggregate_groups(&trees, leaf_ids, n_estimators_per_class, names)
}

/// Reorder a round-major multiclass list into class-grouped blocks.
///
/// XGBoost emits one tree per class each boosting round, so item `i` of
/// its dump list (and column `i` of its leaf predictions) belongs to class
/// `i % n_classes`. The result lists class 0's items first, in round order,
/// then class 1's, and so on.
///
/// # Errors
///
/// | Variant | When |
/// |---|---|
/// | [`ExplainError::InvalidClassCount`] | `n_classes < 2` |
/// | [`ExplainError::UnevenClassGroups`] | `items.len()` not a multiple of `n_classes` |
pub fn group_by_class<T: Clone>(items: &[T], n_classes: usize) -> Result<Vec<T>, ExplainError> {
    if n_classes < 2 {
        return Err(ExplainError::InvalidClassCount { n_classes });
    }
    if items.len() % n_classes != 0 {
        return Err(ExplainError::UnevenClassGroups {
            n_trees: items.len(),
            n_classes,
        });
    }
    Ok((0..n_classes)
        .flat_map(|class| items.iter().skip(class).step_by(n_classes).cloned())
        .collect())
}

fn check_shape(n_trees: usize, n_leaves: usize) -> Result<(), ExplainError> {
    if n_trees != n_leaves {
        return Err(ExplainError::ShapeMismatch { n_trees, n_leaves });
    }
    Ok(())
}

/// Parse dumps in parallel, reporting the lowest-indexed failure.
fn parse_trees<S: AsRef<str> + Sync>(dumps: &[S]) -> Result<Vec<ParsedTree>, ExplainError> {
    let parsed: Vec<Result<ParsedTree, ExplainError>> = dumps
        .par_iter()
        .enumerate()
        .map(|(tree_index, dump)| {
            ParsedTree::parse(dump.as_ref())
                .map_err(|source| ExplainError::Dump { tree_index, source })
        })
        .collect();
    parsed.into_iter().collect()
}

/// Sum per-tree contributions within each block of `group_size` trees.
///
/// Blocks run in parallel; trees inside a block are summed in dump order so
/// results do not depend on the thread count.
fn aggregate_groups(
    trees: &[ParsedTree],
    leaf_ids: &[NodeId],
    group_size: usize,
    names: &FeatureNames,
) -> Result<Vec<Contribution>, ExplainError> {
    let per_class: Vec<Result<Contribution, ExplainError>> = trees
        .par_chunks(group_size)
        .zip(leaf_ids.par_chunks(group_size))
        .enumerate()
        .map(|(class, (group, leaves))| {
            let mut total = Contribution::zero(names.len());
            for (offset, (tree, &leaf_id)) in group.iter().zip(leaves).enumerate() {
                let contribution = decompose(tree, leaf_id, names).map_err(|source| {
                    ExplainError::Decompose {
                        tree_index: class * group_size + offset,
                        source: Box::new(source),
                    }
                })?;
                total += &contribution;
            }
            Ok(total)
        })
        .collect();
    per_class.into_iter().collect()
}
