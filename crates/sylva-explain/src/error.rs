use std::path::PathBuf;

use sylva_tree::DumpError;

/// Errors from decomposing predictions of a tree ensemble.
#[derive(Debug, thiserror::Error)]
pub enum ExplainError {
    /// Returned when one tree dump of an ensemble fails to parse.
    #[error("failed to parse dump of tree {tree_index}")]
    Dump {
        /// Zero-based position of the tree in the flat dump list.
        tree_index: usize,
        /// The underlying parse error.
        source: DumpError,
    },

    /// Returned when decomposing one tree of an ensemble fails.
    #[error("failed to decompose tree {tree_index}")]
    Decompose {
        /// Zero-based position of the tree in the flat dump list.
        tree_index: usize,
        /// The underlying decomposition error.
        source: Box<ExplainError>,
    },

    /// Returned when tallying the splits of one tree for importances fails.
    #[error("failed to compute importances of tree {tree_index}")]
    Importance {
        /// Zero-based position of the tree in the flat dump list.
        tree_index: usize,
        /// The underlying error.
        source: Box<ExplainError>,
    },

    /// Returned when a split lacks the statistic an importance type needs.
    #[error("split node {node_id} has no {stat} statistic; dump the model with stats")]
    MissingSplitStat {
        /// Id of the split node.
        node_id: u32,
        /// Name of the missing statistic.
        stat: String,
    },

    /// Returned when the number of dumps and leaf assignments differ.
    #[error("ensemble has {n_trees} trees but {n_leaves} leaf assignments")]
    ShapeMismatch {
        /// Number of tree dumps.
        n_trees: usize,
        /// Number of leaf assignments.
        n_leaves: usize,
    },

    /// Returned when an ensemble contains no trees.
    #[error("ensemble contains no trees")]
    EmptyEnsemble,

    /// Returned when the per-class estimator count is zero.
    #[error("n_estimators_per_class must be at least 1")]
    InvalidEstimatorCount,

    /// Returned when the tree count is not a multiple of the per-class estimator count.
    #[error("{n_trees} trees cannot be split into groups of {n_estimators_per_class}")]
    IndivisibleEnsemble {
        /// Number of trees in the ensemble.
        n_trees: usize,
        /// Requested trees per class.
        n_estimators_per_class: usize,
    },

    /// Returned when the tree count is not a multiple of the class count.
    #[error("{n_trees} trees cannot be split evenly across {n_classes} classes")]
    UnevenClassGroups {
        /// Number of trees in the ensemble.
        n_trees: usize,
        /// Number of classes of the multiclass ensemble.
        n_classes: usize,
    },

    /// Returned when a multiclass ensemble is declared with fewer than two classes.
    #[error("multiclass ensembles need at least 2 classes, got {n_classes}")]
    InvalidClassCount {
        /// The invalid class count.
        n_classes: usize,
    },

    /// Returned when a leaf assignment names a node that is not a leaf of its tree.
    #[error("node {leaf_id} is not a leaf of the tree")]
    UnknownLeaf {
        /// The requested leaf id.
        leaf_id: u32,
    },

    /// Returned when a split references a feature absent from the name mapping.
    #[error("split feature {token:?} has no index in the feature names")]
    UnknownFeature {
        /// The raw split-feature token from the dump.
        token: String,
    },

    /// Returned when the same feature name appears twice.
    #[error("duplicate feature name {name:?}")]
    DuplicateFeatureName {
        /// The repeated name.
        name: String,
    },

    /// Returned when the number of target names does not fit the ensemble kind.
    #[error("expected {expected} target names, got {got}")]
    TargetNameMismatch {
        /// Number of names the ensemble kind needs.
        expected: usize,
        /// Number of names supplied.
        got: usize,
    },

    /// Returned when ensemble serialization fails.
    #[error("failed to serialize ensemble")]
    SerializeModel {
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when ensemble deserialization fails.
    #[error("failed to deserialize ensemble from {path}")]
    DeserializeModel {
        /// Path to the file that could not be deserialized.
        path: PathBuf,
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when writing the ensemble file fails.
    #[error("failed to write ensemble to {path}")]
    WriteModel {
        /// Path to the file that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when reading the ensemble file fails.
    #[error("failed to read ensemble from {path}")]
    ReadModel {
        /// Path to the file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when a decoded ensemble is structurally inconsistent.
    #[error("corrupt ensemble in {path}: {reason}")]
    CorruptModel {
        /// Path to the file holding the inconsistent ensemble.
        path: PathBuf,
        /// Which consistency check failed.
        reason: String,
    },

    /// Returned when loading an ensemble with an incompatible format version.
    #[error("incompatible ensemble version in {path}: expected {expected}, found {found}")]
    IncompatibleModelVersion {
        /// The format version this build expects.
        expected: u32,
        /// The format version found in the file.
        found: u32,
        /// Path to the file with the incompatible version.
        path: PathBuf,
    },
}
