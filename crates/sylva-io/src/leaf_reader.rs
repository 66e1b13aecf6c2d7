//! CSV leaf-assignment reader with full input validation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use sylva_explain::NodeId;
use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::{LeafTable, SampleId};

/// Reads per-example leaf assignments from a CSV file.
///
/// Expected CSV format:
/// - Header row required (first column is the sample ID, remaining columns are trees in dump order)
/// - `sample_id,t0,t1,...,tn`
/// - One row per example, all rows must have the same number of columns
///
/// Cells hold leaf ids as written by a booster's leaf-prediction mode.
/// Integral floats such as `7.0` or `7.000000e+00` are accepted because
/// leaf matrices are often saved through float arrays.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`]          | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`]              | Malformed CSV record |
/// | [`IoError::NoTreeColumns`]         | Header has only the sample column |
/// | [`IoError::EmptyDataset`]          | Zero data rows after header |
/// | [`IoError::InconsistentRowLength`] | Row has different column count than header |
/// | [`IoError::EmptySampleId`]         | Sample ID cell is empty |
/// | [`IoError::InvalidLeafId`]         | Cell is not a non-negative integer |
/// | [`IoError::DuplicateSampleId`]     | Same sample ID appears twice |
pub struct LeafReader {
    path: PathBuf,
}

impl LeafReader {
    /// Create a new reader for the given CSV file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Read and validate the CSV file, returning a [`LeafTable`].
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<LeafTable, IoError> {
        let file = std::fs::File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        // flexible(true) so that InconsistentRowLength fires instead of a
        // low-level CsvParse error.
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let header = rdr.headers().map_err(|e| self.csv_error(e))?;
        let expected_cols = header.len();
        if expected_cols < 2 {
            return Err(IoError::NoTreeColumns {
                path: self.path.clone(),
            });
        }
        let tree_columns: Vec<String> = header.iter().skip(1).map(str::to_string).collect();
        debug!(n_trees = tree_columns.len(), "read CSV header");

        let mut sample_ids = Vec::new();
        let mut rows = Vec::new();
        let mut seen: HashMap<String, usize> = HashMap::new();

        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| self.csv_error(e))?;

            let sample_id = record.get(0).unwrap_or("").trim().to_string();
            if record.len() != expected_cols {
                return Err(IoError::InconsistentRowLength {
                    path: self.path.clone(),
                    row_index,
                    sample_id,
                    expected: expected_cols,
                    got: record.len(),
                });
            }
            if sample_id.is_empty() {
                return Err(IoError::EmptySampleId {
                    path: self.path.clone(),
                    row_index,
                });
            }
            if let Some(&first_row) = seen.get(&sample_id) {
                return Err(IoError::DuplicateSampleId {
                    path: self.path.clone(),
                    sample_id,
                    first_row,
                    second_row: row_index,
                });
            }
            seen.insert(sample_id.clone(), row_index);

            let mut leaves = Vec::with_capacity(expected_cols - 1);
            for (tree_index, raw) in record.iter().skip(1).enumerate() {
                let leaf = parse_leaf_id(raw).ok_or_else(|| IoError::InvalidLeafId {
                    path: self.path.clone(),
                    row_index,
                    tree_index,
                    raw: raw.to_string(),
                })?;
                leaves.push(leaf);
            }

            sample_ids.push(SampleId::new(sample_id));
            rows.push(leaves);
        }

        if sample_ids.is_empty() {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }

        info!(
            n_samples = sample_ids.len(),
            n_trees = tree_columns.len(),
            "leaf assignments loaded"
        );

        Ok(LeafTable::new(sample_ids, tree_columns, rows))
    }

    fn csv_error(&self, e: csv::Error) -> IoError {
        IoError::CsvParse {
            path: self.path.clone(),
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        }
    }
}

/// Parse a leaf id cell: a `u32`, or a float with no fractional part.
fn parse_leaf_id(raw: &str) -> Option<NodeId> {
    let raw = raw.trim();
    if let Ok(id) = raw.parse::<u32>() {
        return Some(NodeId::new(id));
    }
    let value: f64 = raw.parse().ok()?;
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= f64::from(u32::MAX) {
        return Some(NodeId::new(value as u32));
    }
    None
}
