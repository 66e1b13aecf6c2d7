//! Error types for tree dump parsing.

/// Errors from parsing a single tree dump.
///
/// Every variant that concerns a specific line carries its one-based
/// `line_number` within the dump text.
#[derive(Debug, thiserror::Error)]
pub enum DumpError {
    /// Returned when the dump contains no node lines at all.
    #[error("tree dump contains no nodes")]
    EmptyDump,

    /// Returned when a line is neither a branch nor a leaf declaration.
    #[error("line {line_number} in unexpected format: {line:?}")]
    MalformedLine {
        /// One-based line number within the dump.
        line_number: usize,
        /// The offending line, verbatim.
        line: String,
    },

    /// Returned when a line is nested more than one level below the current path.
    #[error("unexpected dump structure at line {line_number}: depth {depth}, at most {max_depth} allowed")]
    UnexpectedDepth {
        /// One-based line number within the dump.
        line_number: usize,
        /// Depth read from the line's indentation.
        depth: usize,
        /// Deepest level the line could legally have.
        max_depth: usize,
    },

    /// Returned when a second depth-0 line appears after the root.
    #[error("unexpected second root node at line {line_number}")]
    SecondRoot {
        /// One-based line number within the dump.
        line_number: usize,
    },

    /// Returned when a line is nested under a leaf.
    #[error("line {line_number} is nested under leaf node {parent_id}")]
    ChildOfLeaf {
        /// One-based line number within the dump.
        line_number: usize,
        /// Id of the leaf the line would have been attached to.
        parent_id: u32,
    },

    /// Returned when the same node id is declared twice within one tree.
    #[error("node id {node_id} declared at line {first_line} and again at line {line_number}")]
    DuplicateNodeId {
        /// The repeated node id.
        node_id: u32,
        /// Line of the first declaration.
        first_line: usize,
        /// Line of the repeated declaration.
        line_number: usize,
    },

    /// Returned when a branch node has no child lines beneath it.
    #[error("branch node {node_id} has no children")]
    ChildlessBranch {
        /// Id of the childless branch.
        node_id: u32,
    },
}
