use std::collections::BTreeMap;

use crate::error::DumpError;
use crate::node::{NodeId, NodeIndex, NodeKind, TreeNode};
use crate::parse::parse_dump;

/// A tree exactly as read from its dump, before indexing.
///
/// Stored as an arena-based `Vec<TreeNode>` in dump order: the root is
/// index 0 and every child follows its parent.
#[derive(Debug, Clone, PartialEq)]
pub struct DumpTree {
    pub(crate) nodes: Vec<TreeNode>,
}

impl DumpTree {
    /// Return the arena index of the root node.
    #[must_use]
    pub fn root(&self) -> NodeIndex {
        NodeIndex::new(0)
    }

    /// Borrow the node at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` does not belong to this tree.
    #[must_use]
    pub fn node(&self, index: NodeIndex) -> &TreeNode {
        &self.nodes[index.index()]
    }

    /// Return all nodes in dump order.
    #[must_use]
    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    /// Return the arena index of the node with the given dump id.
    #[must_use]
    pub fn find(&self, id: NodeId) -> Option<NodeIndex> {
        self.nodes
            .iter()
            .position(|n| n.id == id)
            .map(NodeIndex::new)
    }

    /// Return the total number of nodes (splits and leaves).
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Return the number of leaf nodes.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Return the depth of the deepest node. A single-leaf tree has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.nodes.iter().map(|n| n.depth).max().unwrap_or(0)
    }
}

/// A tree with aggregate values, parent links and a leaf index.
///
/// Built once from a [`DumpTree`] by [`ParsedTree::index`]; immutable
/// afterwards. Parent links are arena indices, never owning references,
/// so ownership stays strictly root to leaves.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ParsedTree {
    nodes: Vec<TreeNode>,
    aggregates: Vec<f64>,
    parents: Vec<Option<NodeIndex>>,
    leaves: BTreeMap<NodeId, NodeIndex>,
}

impl ParsedTree {
    /// Parse one tree dump and index it.
    ///
    /// # Errors
    ///
    /// Returns any [`DumpError`] raised by [`parse_dump`].
    pub fn parse(text: &str) -> Result<Self, DumpError> {
        Ok(Self::index(parse_dump(text)?))
    }

    /// Compute aggregates bottom-up, link parents and build the leaf index.
    ///
    /// A leaf's aggregate is its own value; a split's aggregate is the mean
    /// of its children's aggregates, however many children it has.
    #[must_use]
    pub fn index(tree: DumpTree) -> Self {
        let nodes = tree.nodes;
        let n = nodes.len();
        let mut aggregates = vec![0.0f64; n];
        let mut parents: Vec<Option<NodeIndex>> = vec![None; n];
        let mut leaves = BTreeMap::new();

        // Children always sit after their parent in the arena, so a reverse
        // sweep is a post-order traversal.
        for (i, node) in nodes.iter().enumerate().rev() {
            aggregates[i] = match node.kind {
                NodeKind::Leaf { value } => {
                    leaves.insert(node.id, NodeIndex::new(i));
                    value
                }
                NodeKind::Split { .. } => {
                    let mut sum = 0.0;
                    for &child in &node.children {
                        debug_assert!(child.index() > i, "child precedes its parent");
                        parents[child.index()] = Some(NodeIndex::new(i));
                        sum += aggregates[child.index()];
                    }
                    sum / node.children.len() as f64
                }
            };
        }

        Self {
            nodes,
            aggregates,
            parents,
            leaves,
        }
    }

    /// Return the arena index of the root node.
    #[must_use]
    pub fn root(&self) -> NodeIndex {
        NodeIndex::new(0)
    }

    /// Borrow the node at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` does not belong to this tree.
    #[must_use]
    pub fn node(&self, index: NodeIndex) -> &TreeNode {
        &self.nodes[index.index()]
    }

    /// Return all nodes in dump order.
    #[must_use]
    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    /// Return the aggregate value of the node at `index`.
    #[must_use]
    pub fn aggregate_value(&self, index: NodeIndex) -> f64 {
        self.aggregates[index.index()]
    }

    /// Return the parent of the node at `index`, `None` for the root.
    #[must_use]
    pub fn parent(&self, index: NodeIndex) -> Option<NodeIndex> {
        self.parents[index.index()]
    }

    /// Look up a leaf by its dump id. Split ids are not in the index.
    #[must_use]
    pub fn leaf(&self, id: NodeId) -> Option<NodeIndex> {
        self.leaves.get(&id).copied()
    }

    /// Iterate over all leaf ids in ascending order.
    pub fn leaf_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.leaves.keys().copied()
    }

    /// Return the arena index of the node with the given dump id.
    #[must_use]
    pub fn find(&self, id: NodeId) -> Option<NodeIndex> {
        self.nodes
            .iter()
            .position(|n| n.id == id)
            .map(NodeIndex::new)
    }

    /// Return the path from the root down to `index`, both ends included.
    #[must_use]
    pub fn path_to(&self, index: NodeIndex) -> Vec<NodeIndex> {
        let mut path = vec![index];
        let mut current = index;
        while let Some(parent) = self.parent(current) {
            path.push(parent);
            current = parent;
        }
        path.reverse();
        path
    }

    /// Return the total number of nodes (splits and leaves).
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Return the number of leaf nodes.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.leaves.len()
    }

    /// Return the depth of the deepest node. A single-leaf tree has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.nodes.iter().map(|n| n.depth).max().unwrap_or(0)
    }
}

impl From<DumpTree> for ParsedTree {
    fn from(tree: DumpTree) -> Self {
        Self::index(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::DumpParser;

    const STUMP: &str = "0:[f0<0.5] yes=1,no=2,missing=1\n\t1:leaf=-0.2\n\t2:leaf=0.4\n";

    // Unbalanced on purpose: the root mean differs from the mean of all leaves.
    const LOPSIDED: &str = "\
0:[f0<1] yes=1,no=2,missing=1
\t1:[f1<2] yes=3,no=4,missing=3
\t\t3:leaf=1.0
\t\t4:leaf=3.0
\t2:leaf=-2.0
";

    fn index_of(tree: &ParsedTree, id: u32) -> NodeIndex {
        tree.find(NodeId::new(id)).unwrap()
    }

    #[test]
    fn stump_aggregates() {
        let tree = ParsedTree::parse(STUMP).unwrap();
        assert!((tree.aggregate_value(tree.root()) - 0.1).abs() < 1e-12);
        assert!((tree.aggregate_value(index_of(&tree, 1)) + 0.2).abs() < 1e-12);
        assert!((tree.aggregate_value(index_of(&tree, 2)) - 0.4).abs() < 1e-12);
    }

    #[test]
    fn aggregate_is_mean_of_child_aggregates() {
        let tree = ParsedTree::parse(LOPSIDED).unwrap();
        let one = index_of(&tree, 1);
        assert!((tree.aggregate_value(one) - 2.0).abs() < 1e-12);
        // mean(2.0, -2.0), not mean(1.0, 3.0, -2.0)
        assert!(tree.aggregate_value(tree.root()).abs() < 1e-12);
    }

    #[test]
    fn parents_are_linked() {
        let tree = ParsedTree::parse(LOPSIDED).unwrap();
        assert_eq!(tree.parent(tree.root()), None);
        assert_eq!(tree.parent(index_of(&tree, 1)), Some(tree.root()));
        assert_eq!(tree.parent(index_of(&tree, 4)), Some(index_of(&tree, 1)));
        assert_eq!(tree.parent(index_of(&tree, 2)), Some(tree.root()));
    }

    #[test]
    fn leaf_index_covers_leaves_only() {
        let tree = ParsedTree::parse(LOPSIDED).unwrap();
        let ids: Vec<u32> = tree.leaf_ids().map(NodeId::value).collect();
        assert_eq!(ids, vec![2, 3, 4]);
        assert_eq!(tree.n_leaves(), 3);
        assert!(tree.leaf(NodeId::new(1)).is_none());
        assert!(tree.leaf(NodeId::new(99)).is_none());
        assert_eq!(tree.leaf(NodeId::new(3)), Some(index_of(&tree, 3)));
    }

    #[test]
    fn path_runs_root_to_leaf() {
        let tree = ParsedTree::parse(LOPSIDED).unwrap();
        let ids: Vec<u32> = tree
            .path_to(index_of(&tree, 4))
            .into_iter()
            .map(|i| tree.node(i).id().value())
            .collect();
        assert_eq!(ids, vec![0, 1, 4]);
        assert_eq!(tree.path_to(tree.root()), vec![tree.root()]);
    }

    #[test]
    fn single_child_branch_takes_child_value() {
        let dump = "0:[f0<1] yes=1,no=1,missing=1\n\t1:leaf=0.5\n";
        let tree = ParsedTree::parse(dump).unwrap();
        assert!((tree.aggregate_value(tree.root()) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn three_children_are_averaged() {
        let dump = "0:[f0<1] yes=1,no=2,missing=3\n\t1:leaf=1\n\t2:leaf=2\n\t3:leaf=6\n";
        let tree = ParsedTree::parse(dump).unwrap();
        assert!((tree.aggregate_value(tree.root()) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn single_leaf_tree_is_its_own_root() {
        let tree = ParsedTree::parse("0:leaf=-1.5\n").unwrap();
        assert_eq!(tree.leaf(NodeId::new(0)), Some(tree.root()));
        assert!((tree.aggregate_value(tree.root()) + 1.5).abs() < 1e-12);
        assert_eq!(tree.depth(), 0);
    }

    #[test]
    fn from_dump_tree_matches_parse() {
        let dump = DumpParser::new().parse(LOPSIDED).unwrap();
        assert_eq!(dump.n_leaves(), 3);
        assert_eq!(dump.depth(), 2);
        let tree = ParsedTree::from(dump);
        assert_eq!(tree.n_nodes(), 5);
        assert_eq!(tree.depth(), 2);
    }
}
