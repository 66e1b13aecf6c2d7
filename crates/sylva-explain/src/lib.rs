//! Decision-path explanations for boosted tree ensembles.
//!
//! Decomposes a prediction into per-feature contributions by walking each
//! tree's root-to-leaf path and crediting every change in the mean subtree
//! value to the feature that split there. Per-tree contributions are summed
//! per class. Ensembles parse in parallel via rayon and can be compiled to
//! a bincode file for reuse. Split counts and dump statistics also give
//! normalized global feature importances.

mod cache;
mod contribution;
mod decompose;
mod ensemble;
mod error;
mod explanation;
mod features;
mod importance;
mod serialize;
mod top;

pub use cache::{EnsembleCache, EnsembleKey};
pub use contribution::{Contribution, ContributionVector};
pub use decompose::decompose;
pub use ensemble::{Ensemble, EnsembleKind, explain_dumps, group_by_class};
pub use error::ExplainError;
pub use explanation::{DECISION_PATHS, ExplainConfig, Explanation, TargetExplanation};
pub use features::{DEFAULT_BIAS_NAME, FeatureIndex, FeatureNames};
pub use importance::{FEATURE_IMPORTANCES, FeatureImportances, ImportanceType, feature_importances};
pub use sylva_tree::{NodeId, ParsedTree};
pub use top::{FeatureWeight, Top, TopFeatures, top_features};
