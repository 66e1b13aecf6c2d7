//! Compiled-ensemble serialization via bincode.

use std::path::Path;

use tracing::{debug, info, instrument};

use crate::ensemble::{Ensemble, EnsembleKind};
use crate::error::ExplainError;

/// Current binary format version.
const FORMAT_VERSION: u32 = 1;

/// Versioned envelope for a compiled ensemble.
#[derive(serde::Serialize, serde::Deserialize)]
struct ModelEnvelope {
    /// Format version for compatibility checking.
    format_version: u32,
    /// Learning task of the ensemble.
    kind: EnsembleKind,
    /// Number of trees in the ensemble.
    n_trees: usize,
    /// The parsed and indexed ensemble.
    ensemble: Ensemble,
}

impl Ensemble {
    /// Save the parsed ensemble to a binary file.
    ///
    /// Loading it back skips dump parsing entirely.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ExplainError::SerializeModel`] | bincode encoding failed |
    /// | [`ExplainError::WriteModel`]     | file write failed |
    #[instrument(skip(self), fields(path = %path.as_ref().display()))]
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ExplainError> {
        let path = path.as_ref();

        let envelope = ModelEnvelope {
            format_version: FORMAT_VERSION,
            kind: self.kind,
            n_trees: self.trees.len(),
            ensemble: self.clone(),
        };

        let bytes = bincode::serialize(&envelope)
            .map_err(|e| ExplainError::SerializeModel { source: e })?;

        std::fs::write(path, &bytes).map_err(|e| ExplainError::WriteModel {
            path: path.to_path_buf(),
            source: e,
        })?;

        info!(
            size_bytes = bytes.len(),
            n_trees = self.trees.len(),
            "ensemble saved"
        );

        Ok(())
    }

    /// Load an ensemble saved by [`Ensemble::save`].
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ExplainError::ReadModel`]                | file read failed |
    /// | [`ExplainError::DeserializeModel`]         | bincode decoding failed |
    /// | [`ExplainError::IncompatibleModelVersion`] | format version mismatch |
    /// | [`ExplainError::CorruptModel`]             | tree grouping or header disagrees with the trees |
    #[instrument(fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ExplainError> {
        let path = path.as_ref();

        let bytes = std::fs::read(path).map_err(|e| ExplainError::ReadModel {
            path: path.to_path_buf(),
            source: e,
        })?;

        let envelope: ModelEnvelope =
            bincode::deserialize(&bytes).map_err(|e| ExplainError::DeserializeModel {
                path: path.to_path_buf(),
                source: e,
            })?;

        if envelope.format_version != FORMAT_VERSION {
            return Err(ExplainError::IncompatibleModelVersion {
                expected: FORMAT_VERSION,
                found: envelope.format_version,
                path: path.to_path_buf(),
            });
        }

        if let Some(reason) = inconsistency(&envelope) {
            return Err(ExplainError::CorruptModel {
                path: path.to_path_buf(),
                reason,
            });
        }

        debug!(
            kind = %envelope.kind,
            n_trees = envelope.n_trees,
            "ensemble loaded"
        );

        Ok(envelope.ensemble)
    }
}

/// Describe the first structural inconsistency of a decoded envelope.
fn inconsistency(envelope: &ModelEnvelope) -> Option<String> {
    let ensemble = &envelope.ensemble;
    let n_trees = ensemble.trees.len();
    if envelope.kind != ensemble.kind {
        return Some(format!(
            "header kind {} differs from ensemble kind {}",
            envelope.kind, ensemble.kind
        ));
    }
    if envelope.n_trees != n_trees {
        return Some(format!(
            "header declares {} trees, ensemble holds {n_trees}",
            envelope.n_trees
        ));
    }
    if ensemble.n_estimators_per_class == 0 {
        return Some("zero trees per class".to_string());
    }
    let expected = ensemble.n_estimators_per_class * ensemble.kind.n_groups();
    if n_trees != expected {
        return Some(format!(
            "{n_trees} trees do not fill {} groups of {}",
            ensemble.kind.n_groups(),
            ensemble.n_estimators_per_class
        ));
    }
    None
}
