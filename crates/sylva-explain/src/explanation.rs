//! Per-target explanations built from ensemble contributions.

use sylva_tree::NodeId;
use tracing::{debug, instrument};

use crate::contribution::Contribution;
use crate::ensemble::{Ensemble, EnsembleKind};
use crate::error::ExplainError;
use crate::features::FeatureNames;
use crate::importance::{FEATURE_IMPORTANCES, FeatureImportances, ImportanceType, feature_importances};
use crate::top::{Top, TopFeatures, top_features};

/// Method label attached to every explanation.
pub const DECISION_PATHS: &str = "decision paths";

/// Explanation of one target (class or regression output).
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct TargetExplanation {
    /// Display name of the target.
    pub target: String,
    /// Raw margin of the target, before any link function.
    pub score: f64,
    /// Strongest contributions, bias included.
    pub feature_weights: TopFeatures,
}

/// Explanation of one prediction, or of the ensemble as a whole.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Explanation {
    /// Short description of the explained model.
    pub estimator: String,
    /// How the weights were computed.
    pub method: String,
    /// How to read the values, when they need it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// One entry per target; a single entry for regression and binary
    /// models, none for importance explanations.
    pub targets: Vec<TargetExplanation>,
    /// Global importances, set by [`ExplainConfig::explain_weights`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_importances: Option<FeatureImportances>,
}

/// Configuration for building [`Explanation`]s.
///
/// Construct via [`ExplainConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter      | Default                                |
/// |----------------|----------------------------------------|
/// | `top`          | `Top::All`                             |
/// | `target_names` | `"y"`, `"1"` or class indices by kind  |
/// | `estimator`    | derived from the ensemble kind and size |
#[derive(Debug, Clone, Default)]
pub struct ExplainConfig {
    pub(crate) top: Top,
    pub(crate) target_names: Option<Vec<String>>,
    pub(crate) estimator: Option<String>,
}

impl ExplainConfig {
    /// Create a config with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // --- Setters ---

    /// Set how many features each target keeps.
    #[must_use]
    pub fn with_top(mut self, top: Top) -> Self {
        self.top = top;
        self
    }

    /// Set target display names.
    ///
    /// Regression takes one name, binary takes both class names (the
    /// positive class is the second), multiclass takes one per class.
    #[must_use]
    pub fn with_target_names(mut self, target_names: Vec<String>) -> Self {
        self.target_names = Some(target_names);
        self
    }

    /// Set the estimator description.
    #[must_use]
    pub fn with_estimator(mut self, estimator: impl Into<String>) -> Self {
        self.estimator = Some(estimator.into());
        self
    }

    // --- Getters ---

    /// Return the feature selection.
    #[must_use]
    pub fn top(&self) -> Top {
        self.top
    }

    /// Return the configured target names, if any.
    #[must_use]
    pub fn target_names(&self) -> Option<&[String]> {
        self.target_names.as_deref()
    }

    // --- Explain ---

    /// Explain one example routed through `ensemble`.
    ///
    /// # Errors
    ///
    /// | Variant | When |
    /// |---|---|
    /// | [`ExplainError::TargetNameMismatch`] | configured target names do not fit the kind |
    /// | any error of [`Ensemble::explain`]   | decomposition failed |
    #[instrument(skip_all, fields(kind = %ensemble.kind(), n_trees = ensemble.n_trees()))]
    pub fn explain(
        &self,
        ensemble: &Ensemble,
        leaf_ids: &[NodeId],
        names: &FeatureNames,
    ) -> Result<Explanation, ExplainError> {
        let targets = self.resolve_targets(ensemble.kind())?;
        let contributions = ensemble.explain(leaf_ids, names)?;
        let estimator = self.estimator_for(ensemble);
        Ok(self.assemble(estimator, targets, contributions, names))
    }

    /// Explain many examples in parallel.
    ///
    /// # Errors
    ///
    /// Same as [`ExplainConfig::explain`]; the lowest failing row wins.
    pub fn explain_batch(
        &self,
        ensemble: &Ensemble,
        rows: &[Vec<NodeId>],
        names: &FeatureNames,
    ) -> Result<Vec<Explanation>, ExplainError> {
        let targets = self.resolve_targets(ensemble.kind())?;
        let estimator = self.estimator_for(ensemble);
        let batch = ensemble.explain_batch(rows, names)?;
        Ok(batch
            .into_iter()
            .map(|contributions| {
                self.assemble(estimator.clone(), targets.clone(), contributions, names)
            })
            .collect())
    }

    /// Explain the ensemble as a whole by its normalized feature importances.
    ///
    /// `Top::Abs(k)` and `Top::Split { pos: k, .. }` keep the `k` most
    /// important features; `Top::All` keeps every used feature.
    ///
    /// # Errors
    ///
    /// Any error of [`feature_importances`].
    #[instrument(skip_all, fields(kind = %ensemble.kind(), %importance_type))]
    pub fn explain_weights(
        &self,
        ensemble: &Ensemble,
        names: &FeatureNames,
        importance_type: ImportanceType,
    ) -> Result<Explanation, ExplainError> {
        let top = match self.top {
            Top::All => None,
            Top::Abs(k) | Top::Split { pos: k, .. } => Some(k),
        };
        let importances = feature_importances(ensemble, names, importance_type, top)?;
        Ok(Explanation {
            estimator: self.estimator_for(ensemble),
            method: FEATURE_IMPORTANCES.to_string(),
            description: Some(format!(
                "XGBoost feature importances by {importance_type}; values are numbers 0 <= x <= 1; all values sum to 1."
            )),
            targets: Vec::new(),
            feature_importances: Some(importances),
        })
    }

    fn estimator_for(&self, ensemble: &Ensemble) -> String {
        self.estimator.clone().unwrap_or_else(|| {
            format!("{} tree ensemble ({} trees)", ensemble.kind(), ensemble.n_trees())
        })
    }

    fn assemble(
        &self,
        estimator: String,
        targets: Vec<String>,
        contributions: Vec<Contribution>,
        names: &FeatureNames,
    ) -> Explanation {
        let targets: Vec<TargetExplanation> = targets
            .into_iter()
            .zip(contributions)
            .map(|(target, contribution)| TargetExplanation {
                target,
                score: contribution.score,
                feature_weights: top_features(&contribution.weights, names, self.top),
            })
            .collect();
        debug!(n_targets = targets.len(), "explanation assembled");
        Explanation {
            estimator,
            method: DECISION_PATHS.to_string(),
            description: None,
            targets,
            feature_importances: None,
        }
    }

    /// Resolve one display name per contribution the kind produces.
    fn resolve_targets(&self, kind: EnsembleKind) -> Result<Vec<String>, ExplainError> {
        let Some(names) = &self.target_names else {
            return Ok(match kind {
                EnsembleKind::Regression => vec!["y".to_string()],
                EnsembleKind::Binary => vec!["1".to_string()],
                EnsembleKind::Multiclass { n_classes } => {
                    (0..n_classes).map(|c| c.to_string()).collect()
                }
            });
        };
        let expected = match kind {
            EnsembleKind::Regression => 1,
            EnsembleKind::Binary => 2,
            EnsembleKind::Multiclass { n_classes } => n_classes,
        };
        if names.len() != expected {
            return Err(ExplainError::TargetNameMismatch {
                expected,
                got: names.len(),
            });
        }
        Ok(match kind {
            // The single binary margin scores the positive class.
            EnsembleKind::Binary => vec![names[1].clone()],
            _ => names.clone(),
        })
    }
}
