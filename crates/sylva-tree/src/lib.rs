//! XGBoost text tree dumps: parse, index, aggregate.
//!
//! Turns one tree of a `Booster.get_dump()` listing into an arena-backed
//! [`DumpTree`], then indexes it into a [`ParsedTree`] carrying bottom-up
//! aggregate values, parent links and a leaf lookup table. Pure data
//! transformation, no I/O.

mod error;
mod node;
mod parse;
mod tree;

pub use error::DumpError;
pub use node::{NodeId, NodeIndex, NodeKind, NodeStats, TreeNode};
pub use parse::{DEFAULT_INDENT, DumpParser, parse_dump};
pub use tree::{DumpTree, ParsedTree};
