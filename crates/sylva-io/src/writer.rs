//! JSON writer for explanation results.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use sylva_explain::Explanation;
use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::{ExperimentName, SampleId};

/// Writes explanations to JSON files.
///
/// Creates the output directory on construction if it does not exist.
/// Output files are named `{experiment}_explain.json`.
pub struct ExplanationWriter {
    output_dir: PathBuf,
    experiment: ExperimentName,
}

impl ExplanationWriter {
    /// Create a new writer targeting the given directory and experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %output_dir.display(), experiment = %experiment))]
    pub fn new(output_dir: &Path, experiment: ExperimentName) -> Result<Self, IoError> {
        fs::create_dir_all(output_dir).map_err(|e| IoError::OutputDirCreate {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        debug!("output directory ready");
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            experiment,
        })
    }

    /// Write one explanation per sample to `{experiment}_explain.json`.
    ///
    /// Returns the path written.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::EncodeJson`] | the artifact cannot be encoded |
    /// | [`IoError::WriteFile`]  | the file cannot be written |
    #[instrument(skip_all, fields(n_samples = explanations.len()))]
    pub fn write_explanations(
        &self,
        explanations: &[(&SampleId, &Explanation)],
    ) -> Result<PathBuf, IoError> {
        let path = self.explain_path();

        let artifact = ExplainArtifact {
            experiment: self.experiment.as_str(),
            n_samples: explanations.len(),
            explanations: explanations
                .iter()
                .map(|&(sample_id, explanation)| SampleEntry {
                    sample_id: sample_id.as_str(),
                    explanation,
                })
                .collect(),
        };

        let json = serde_json::to_string_pretty(&artifact).map_err(|e| IoError::EncodeJson {
            path: path.clone(),
            source: e,
        })?;
        fs::write(&path, &json).map_err(|e| IoError::WriteFile {
            path: path.clone(),
            source: e,
        })?;

        info!(path = %path.display(), "explanations written");
        Ok(path)
    }

    /// Return the path of the explanation artifact.
    ///
    /// Does not write anything; just computes `{output_dir}/{experiment}_explain.json`.
    #[must_use]
    pub fn explain_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}_explain.json", self.experiment.as_str()))
    }
}

// --- Shadow structs for JSON serialization ---

#[derive(Serialize)]
struct ExplainArtifact<'a> {
    experiment: &'a str,
    n_samples: usize,
    explanations: Vec<SampleEntry<'a>>,
}

#[derive(Serialize)]
struct SampleEntry<'a> {
    sample_id: &'a str,
    #[serde(flatten)]
    explanation: &'a Explanation,
}
