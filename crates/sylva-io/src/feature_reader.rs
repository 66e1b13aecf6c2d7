//! Plain-text feature-name list reader.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{info, instrument};

use crate::IoError;

/// Reads ordered feature names, one per line.
///
/// Line `i` (ignoring blank lines) names feature `i`, i.e. the positional
/// split token `f<i>`. Surrounding whitespace is trimmed.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`]         | File doesn't exist or is unreadable |
/// | [`IoError::DuplicateFeatureName`] | A name appears twice |
/// | [`IoError::EmptyFeatureList`]     | No names in the file |
pub struct FeatureNameReader {
    path: PathBuf,
}

impl FeatureNameReader {
    /// Create a new reader for the given file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Read and validate the list.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<Vec<String>, IoError> {
        let text = std::fs::read_to_string(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        let mut names = Vec::new();
        let mut seen: HashMap<&str, usize> = HashMap::new();
        for (i, raw) in text.lines().enumerate() {
            let name = raw.trim();
            if name.is_empty() {
                continue;
            }
            let line_number = i + 1;
            if let Some(&first_line) = seen.get(name) {
                return Err(IoError::DuplicateFeatureName {
                    path: self.path.clone(),
                    name: name.to_string(),
                    first_line,
                    line_number,
                });
            }
            seen.insert(name, line_number);
            names.push(name.to_string());
        }

        if names.is_empty() {
            return Err(IoError::EmptyFeatureList {
                path: self.path.clone(),
            });
        }

        info!(n_features = names.len(), "feature names loaded");
        Ok(names)
    }
}
