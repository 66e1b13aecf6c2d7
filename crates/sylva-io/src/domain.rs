//! Domain types for sylva-io.

use sylva_explain::NodeId;

use crate::IoError;

/// An example identifier from the first column of a leaf matrix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SampleId(String);

impl SampleId {
    /// Create a sample ID from a non-empty string.
    pub(crate) fn new(id: String) -> Self {
        debug_assert!(!id.is_empty(), "sample ID must not be empty");
        Self(id)
    }

    /// Return the sample ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SampleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated experiment name for output file naming.
///
/// Must match `[a-zA-Z0-9_-]+`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentName(String);

impl ExperimentName {
    /// Parse and validate an experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidExperimentName`] if the name is empty or
    /// contains characters outside `[a-zA-Z0-9_-]`.
    pub fn new(name: String) -> Result<Self, IoError> {
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(IoError::InvalidExperimentName { name });
        }
        Ok(Self(name))
    }

    /// Return the experiment name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ExperimentName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Leaf assignments of many examples, one row per example.
///
/// Produced by [`LeafReader`](crate::LeafReader). `rows[i][t]` is the leaf
/// tree `t` routed sample `sample_ids[i]` to.
#[derive(Debug)]
pub struct LeafTable {
    sample_ids: Vec<SampleId>,
    tree_columns: Vec<String>,
    rows: Vec<Vec<NodeId>>,
}

impl LeafTable {
    pub(crate) fn new(
        sample_ids: Vec<SampleId>,
        tree_columns: Vec<String>,
        rows: Vec<Vec<NodeId>>,
    ) -> Self {
        Self {
            sample_ids,
            tree_columns,
            rows,
        }
    }

    /// Return the sample IDs in file order.
    #[must_use]
    pub fn sample_ids(&self) -> &[SampleId] {
        &self.sample_ids
    }

    /// Return the tree column headers.
    #[must_use]
    pub fn tree_columns(&self) -> &[String] {
        &self.tree_columns
    }

    /// Return every leaf row in file order.
    #[must_use]
    pub fn rows(&self) -> &[Vec<NodeId>] {
        &self.rows
    }

    /// Return one sample's ID and leaf row, or `None` if the sample is absent.
    #[must_use]
    pub fn row(&self, sample_id: &str) -> Option<(&SampleId, &[NodeId])> {
        self.sample_ids
            .iter()
            .position(|id| id.as_str() == sample_id)
            .map(|i| (&self.sample_ids[i], self.rows[i].as_slice()))
    }

    /// Return the number of samples.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.sample_ids.len()
    }

    /// Return the number of trees per row.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.tree_columns.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_id_as_str_returns_inner() {
        let id = SampleId::new("row-17".to_string());
        assert_eq!(id.as_str(), "row-17");
        assert_eq!(id.to_string(), "row-17");
    }

    #[test]
    fn experiment_name_valid() {
        let name = ExperimentName::new("churn-model_v2".to_string());
        assert!(name.is_ok());
        assert_eq!(name.unwrap().as_str(), "churn-model_v2");
    }

    #[test]
    fn experiment_name_rejects_empty() {
        let name = ExperimentName::new(String::new());
        assert!(matches!(name, Err(IoError::InvalidExperimentName { .. })));
    }

    #[test]
    fn experiment_name_rejects_special_chars() {
        let name = ExperimentName::new("../escape".to_string());
        assert!(matches!(name, Err(IoError::InvalidExperimentName { .. })));
    }

    #[test]
    fn leaf_table_row_lookup() {
        let table = LeafTable::new(
            vec![SampleId::new("a".into()), SampleId::new("b".into())],
            vec!["t0".into(), "t1".into()],
            vec![
                vec![NodeId::new(1), NodeId::new(3)],
                vec![NodeId::new(2), NodeId::new(4)],
            ],
        );
        assert_eq!(table.n_samples(), 2);
        assert_eq!(table.n_trees(), 2);
        let (id, row) = table.row("b").unwrap();
        assert_eq!(id.as_str(), "b");
        assert_eq!(row, &[NodeId::new(2), NodeId::new(4)][..]);
        assert!(table.row("c").is_none());
    }
}
