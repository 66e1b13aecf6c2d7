use std::fmt;

/// Node identifier as written in the dump (the `<id>:` line prefix).
///
/// Unique within one tree. Leaf assignments produced by the booster refer
/// to leaves by this id.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    serde::Serialize, serde::Deserialize,
)]
pub struct NodeId(u32);

impl NodeId {
    /// Wrap a raw node id.
    #[must_use]
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Return the raw node id.
    #[must_use]
    pub fn value(self) -> u32 {
        self.0
    }
}

impl From<u32> for NodeId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position of a node in a tree's `Vec<TreeNode>` arena.
///
/// Distinct from [`NodeId`]: ids come from the dump, indices from parse order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    serde::Serialize, serde::Deserialize,
)]
pub struct NodeIndex(usize);

impl NodeIndex {
    /// Create a node index from a zero-based arena position.
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the zero-based arena position.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Training statistics emitted by `get_dump(with_stats=True)`.
///
/// Both fields are absent for plain dumps. Leaves only ever carry `cover`.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct NodeStats {
    /// Loss reduction of the split.
    pub gain: Option<f64>,
    /// Sum of hessians of the training rows that reached the node.
    pub cover: Option<f64>,
}

/// Payload of a tree node.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum NodeKind {
    /// A decision node: `[<feature><op><condition>] yes=..,no=..,missing=..`.
    Split {
        /// Raw split-feature token, e.g. `f3` or a trained feature name.
        feature: String,
        /// Split threshold.
        condition: f64,
        /// Child taken when the condition holds.
        yes: NodeId,
        /// Child taken when the condition fails.
        no: NodeId,
        /// Child taken when the feature value is missing.
        missing: NodeId,
    },
    /// A terminal node carrying the raw margin contribution.
    Leaf {
        /// Leaf output before any link function.
        value: f64,
    },
}

/// One node of a parsed tree.
///
/// Children are owned by the tree arena and referenced by [`NodeIndex`],
/// in the order their lines appeared in the dump.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TreeNode {
    pub(crate) id: NodeId,
    pub(crate) depth: usize,
    pub(crate) kind: NodeKind,
    pub(crate) stats: NodeStats,
    pub(crate) children: Vec<NodeIndex>,
}

impl TreeNode {
    pub(crate) fn new(id: NodeId, depth: usize, kind: NodeKind, stats: NodeStats) -> Self {
        Self {
            id,
            depth,
            kind,
            stats,
            children: Vec::new(),
        }
    }

    /// Return the node id from the dump.
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Return the nesting depth (root is 0).
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Return the node payload.
    #[must_use]
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Return the optional training statistics.
    #[must_use]
    pub fn stats(&self) -> NodeStats {
        self.stats
    }

    /// Return the arena indices of this node's children.
    #[must_use]
    pub fn children(&self) -> &[NodeIndex] {
        &self.children
    }

    /// Return `true` if this node is a leaf.
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf { .. })
    }

    /// Return the split-feature token, or `None` for leaves.
    #[must_use]
    pub fn split_feature(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Split { feature, .. } => Some(feature),
            NodeKind::Leaf { .. } => None,
        }
    }

    /// Return the leaf value, or `None` for split nodes.
    #[must_use]
    pub fn leaf_value(&self) -> Option<f64> {
        match self.kind {
            NodeKind::Leaf { value } => Some(value),
            NodeKind::Split { .. } => None,
        }
    }
}
