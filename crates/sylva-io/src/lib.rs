//! File I/O, validation, and rendering for the sylva pipeline.

mod domain;
mod dump_reader;
mod error;
mod feature_reader;
mod format;
mod leaf_reader;
mod writer;

pub use domain::{ExperimentName, LeafTable, SampleId};
pub use dump_reader::DumpReader;
pub use error::IoError;
pub use feature_reader::FeatureNameReader;
pub use format::format_as_text;
pub use leaf_reader::LeafReader;
pub use writer::ExplanationWriter;
