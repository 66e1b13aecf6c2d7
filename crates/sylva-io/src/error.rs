//! I/O error types for sylva-io.

use std::path::PathBuf;

/// Errors from reading model dumps, leaf matrices and feature lists, and
/// from writing explanations.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Returned when the input file does not exist or is unreadable.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the CSV parser encounters a malformed record.
    #[error("CSV parse error in {path} at byte offset {offset}")]
    CsvParse {
        /// Path to the CSV file.
        path: PathBuf,
        /// Byte offset where the error occurred.
        offset: u64,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Returned when a JSON dump file is not an array of strings.
    #[error("JSON parse error in {path}")]
    JsonParse {
        /// Path to the JSON file.
        path: PathBuf,
        /// Underlying JSON error.
        source: serde_json::Error,
    },

    /// Returned when a CSV file has a header but zero data rows.
    #[error("empty dataset (no data rows) in {path}")]
    EmptyDataset {
        /// Path to the CSV file.
        path: PathBuf,
    },

    /// Returned when a leaf matrix has a sample column but no tree columns.
    #[error("no tree columns in {path}")]
    NoTreeColumns {
        /// Path to the CSV file.
        path: PathBuf,
    },

    /// Returned when a data row has a different number of columns than the header.
    #[error("inconsistent row length in {path}: row {row_index} (sample {sample_id}) has {got} columns, expected {expected}")]
    InconsistentRowLength {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// Sample ID of the offending row.
        sample_id: String,
        /// Expected number of columns (from header).
        expected: usize,
        /// Actual number of columns in this row.
        got: usize,
    },

    /// Returned when a leaf cell is not a non-negative integer.
    #[error("invalid leaf id in {path}: row {row_index}, tree {tree_index}, raw value \"{raw}\"")]
    InvalidLeafId {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// Zero-based tree column (excluding the sample column).
        tree_index: usize,
        /// The raw cell text.
        raw: String,
    },

    /// Returned when the same sample ID appears more than once.
    #[error("duplicate sample ID \"{sample_id}\" in {path}: first at row {first_row}, again at row {second_row}")]
    DuplicateSampleId {
        /// Path to the CSV file.
        path: PathBuf,
        /// The duplicated sample ID.
        sample_id: String,
        /// Zero-based row index of the first occurrence.
        first_row: usize,
        /// Zero-based row index of the second occurrence.
        second_row: usize,
    },

    /// Returned when a sample ID cell is empty.
    #[error("empty sample ID in {path} at row {row_index}")]
    EmptySampleId {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
    },

    /// Returned when a text dump has content before its first `booster[0]:` header.
    #[error("expected a booster header in {path} at line {line_number}")]
    MissingBoosterHeader {
        /// Path to the dump file.
        path: PathBuf,
        /// One-based line number of the stray content.
        line_number: usize,
    },

    /// Returned when booster headers are not numbered 0, 1, 2, ... in order.
    #[error("booster header out of order in {path} at line {line_number}: expected booster[{expected}], found booster[{found}]")]
    BoosterOutOfOrder {
        /// Path to the dump file.
        path: PathBuf,
        /// One-based line number of the header.
        line_number: usize,
        /// The index that should come next.
        expected: usize,
        /// The index found in the header.
        found: usize,
    },

    /// Returned when a dump file contains no trees.
    #[error("no trees in {path}")]
    EmptyModel {
        /// Path to the dump file.
        path: PathBuf,
    },

    /// Returned when a feature list contains no names.
    #[error("no feature names in {path}")]
    EmptyFeatureList {
        /// Path to the feature list.
        path: PathBuf,
    },

    /// Returned when a feature list repeats a name.
    #[error("duplicate feature name \"{name}\" in {path}: first at line {first_line}, again at line {line_number}")]
    DuplicateFeatureName {
        /// Path to the feature list.
        path: PathBuf,
        /// The repeated name.
        name: String,
        /// One-based line of the first occurrence.
        first_line: usize,
        /// One-based line of the repeat.
        line_number: usize,
    },

    /// Returned when the experiment name contains characters outside `[a-zA-Z0-9_-]`.
    #[error("invalid experiment name \"{name}\": must match [a-zA-Z0-9_-]+")]
    InvalidExperimentName {
        /// The invalid name.
        name: String,
    },

    /// Returned when the output directory cannot be created.
    #[error("cannot create output directory {path}")]
    OutputDirCreate {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when an artifact cannot be encoded as JSON.
    #[error("cannot encode {path} as JSON")]
    EncodeJson {
        /// Path of the artifact being written.
        path: PathBuf,
        /// Underlying JSON error.
        source: serde_json::Error,
    },

    /// Returned when a result file cannot be written.
    #[error("cannot write file {path}")]
    WriteFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}
