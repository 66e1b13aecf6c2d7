//! Line-oriented parser for XGBoost text tree dumps.
//!
//! One dump line per node, depth-first, children indented one marker
//! deeper than their parent:
//!
//! ```text
//! 0:[f0<0.5] yes=1,no=2,missing=1
//! 	1:leaf=-0.2
//! 	2:leaf=0.4
//! ```

use std::collections::HashMap;

use tracing::debug;

use crate::error::DumpError;
use crate::node::{NodeId, NodeIndex, NodeKind, NodeStats, TreeNode};
use crate::tree::DumpTree;

/// Indentation marker written by XGBoost: one tab per level.
pub const DEFAULT_INDENT: char = '\t';

/// Characters accepted as the comparison operator of a split condition.
const COMPARISON_OPS: [char; 3] = ['<', '>', '='];

/// Parser for the text dump of a single tree.
///
/// Construct via [`DumpParser::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter | Default |
/// |-----------|---------|
/// | `indent`  | `'\t'`  |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DumpParser {
    indent: char,
}

impl DumpParser {
    /// Create a parser with the default tab indentation.
    #[must_use]
    pub fn new() -> Self {
        Self {
            indent: DEFAULT_INDENT,
        }
    }

    /// Set the character whose repetition count encodes node depth.
    #[must_use]
    pub fn with_indent(mut self, indent: char) -> Self {
        self.indent = indent;
        self
    }

    /// Return the indentation marker.
    #[must_use]
    pub fn indent(&self) -> char {
        self.indent
    }

    /// Parse the text of one tree into an arena-backed [`DumpTree`].
    ///
    /// Empty lines are skipped. The root is always arena index 0 and nodes
    /// are stored in dump (pre-)order, so every child sits after its parent.
    ///
    /// # Errors
    ///
    /// | Variant | When |
    /// |---|---|
    /// | [`DumpError::MalformedLine`]    | a line is neither a branch nor a leaf |
    /// | [`DumpError::UnexpectedDepth`]  | a line is nested more than one level below the current path |
    /// | [`DumpError::SecondRoot`]       | a depth-0 line follows the root |
    /// | [`DumpError::ChildOfLeaf`]      | a line is nested under a leaf |
    /// | [`DumpError::DuplicateNodeId`]  | a node id is declared twice |
    /// | [`DumpError::ChildlessBranch`]  | a branch has no child lines |
    /// | [`DumpError::EmptyDump`]        | there are no node lines |
    pub fn parse(&self, text: &str) -> Result<DumpTree, DumpError> {
        let mut nodes: Vec<TreeNode> = Vec::new();
        let mut stack: Vec<NodeIndex> = Vec::new();
        let mut first_seen: HashMap<NodeId, usize> = HashMap::new();

        for (line_index, line) in text.lines().enumerate() {
            if line.is_empty() {
                continue;
            }
            let line_number = line_index + 1;

            let (depth, node) = self.parse_line(line).ok_or_else(|| DumpError::MalformedLine {
                line_number,
                line: line.to_string(),
            })?;

            if depth == 0 {
                if !stack.is_empty() {
                    return Err(DumpError::SecondRoot { line_number });
                }
            } else if depth > stack.len() {
                return Err(DumpError::UnexpectedDepth {
                    line_number,
                    depth,
                    max_depth: stack.len(),
                });
            }

            if let Some(&first_line) = first_seen.get(&node.id) {
                return Err(DumpError::DuplicateNodeId {
                    node_id: node.id.value(),
                    first_line,
                    line_number,
                });
            }
            first_seen.insert(node.id, line_number);

            let index = NodeIndex::new(nodes.len());
            if depth > 0 {
                // Close every subtree deeper than the new node's parent.
                stack.truncate(depth);
                let parent = &mut nodes[stack[depth - 1].index()];
                if parent.is_leaf() {
                    return Err(DumpError::ChildOfLeaf {
                        line_number,
                        parent_id: parent.id.value(),
                    });
                }
                parent.children.push(index);
            }
            nodes.push(node);
            stack.push(index);
        }

        if nodes.is_empty() {
            return Err(DumpError::EmptyDump);
        }
        if let Some(node) = nodes.iter().find(|n| !n.is_leaf() && n.children.is_empty()) {
            return Err(DumpError::ChildlessBranch {
                node_id: node.id.value(),
            });
        }

        debug!(n_nodes = nodes.len(), "tree dump parsed");
        Ok(DumpTree { nodes })
    }

    /// Split one non-empty line into its depth and node, or `None` if it
    /// matches neither line shape.
    fn parse_line(&self, line: &str) -> Option<(usize, TreeNode)> {
        let body = line.trim_start_matches(self.indent);
        let depth = (line.len() - body.len()) / self.indent.len_utf8();

        let (id, content) = body.split_once(':')?;
        let id = parse_node_id(id)?;
        let (kind, stats) = if let Some(leaf) = content.strip_prefix("leaf=") {
            parse_leaf(leaf)?
        } else if let Some(split) = content.strip_prefix('[') {
            parse_split(split)?
        } else {
            return None;
        };

        Some((depth, TreeNode::new(id, depth, kind, stats)))
    }
}

impl Default for DumpParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse one tree dump with the default (tab) indentation.
///
/// # Errors
///
/// See [`DumpParser::parse`].
pub fn parse_dump(text: &str) -> Result<DumpTree, DumpError> {
    DumpParser::new().parse(text)
}

/// `<value>[,cover=<f64>]`
fn parse_leaf(text: &str) -> Option<(NodeKind, NodeStats)> {
    let mut fields = text.split(',');
    let value: f64 = fields.next()?.parse().ok()?;

    let mut stats = NodeStats::default();
    for field in fields {
        let (key, raw) = field.split_once('=')?;
        match key {
            "cover" if stats.cover.is_none() => stats.cover = Some(raw.parse().ok()?),
            _ => return None,
        }
    }

    Some((NodeKind::Leaf { value }, stats))
}

/// `<feature><op><threshold>] yes=<id>,no=<id>,missing=<id>[,gain=<f64>][,cover=<f64>]`
///
/// The leading `[` has already been stripped.
fn parse_split(text: &str) -> Option<(NodeKind, NodeStats)> {
    let (condition, branches) = text.split_once(']')?;

    // XGBoost rejects `[`, `]` and `<` in feature names, so the first
    // comparison character ends the feature token.
    let op_at = condition.find(COMPARISON_OPS)?;
    if op_at == 0 {
        return None;
    }
    let (feature, rest) = condition.split_at(op_at);
    let mut rest = rest.chars();
    rest.next()?;
    let threshold: f64 = rest.as_str().parse().ok()?;

    let mut fields = branches.strip_prefix(' ')?.split(',');
    let yes = parse_branch_target(fields.next()?, "yes")?;
    let no = parse_branch_target(fields.next()?, "no")?;
    let missing = parse_branch_target(fields.next()?, "missing")?;

    let mut stats = NodeStats::default();
    for field in fields {
        let (key, raw) = field.split_once('=')?;
        let value: f64 = raw.parse().ok()?;
        match key {
            "gain" if stats.gain.is_none() => stats.gain = Some(value),
            "cover" if stats.cover.is_none() => stats.cover = Some(value),
            _ => return None,
        }
    }

    let kind = NodeKind::Split {
        feature: feature.to_string(),
        condition: threshold,
        yes,
        no,
        missing,
    };
    Some((kind, stats))
}

/// `<key>=<id>`
fn parse_branch_target(field: &str, key: &str) -> Option<NodeId> {
    parse_node_id(field.strip_prefix(key)?.strip_prefix('=')?)
}

/// Unsigned decimal digits only; `u32::from_str` alone would accept a `+` sign.
fn parse_node_id(text: &str) -> Option<NodeId> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok().map(NodeId::new)
}


#[cfg(test)]
mod tests {
    use super::*;

    const STUMP: &str = "0:[f0<0.5] yes=1,no=2,missing=1\n\t1:leaf=-0.2\n\t2:leaf=0.4\n";

    const DEEP: &str = "\
0:[f1<2.5] yes=1,no=2,missing=2
\t1:[f0<0.5] yes=3,no=4,missing=3
\t\t3:leaf=0.1
\t\t4:leaf=0.3
\t2:[f2<-1] yes=5,no=6,missing=6
\t\t5:leaf=-0.4
\t\t6:[f0<1e-3] yes=7,no=8,missing=7
\t\t\t7:leaf=0.05
\t\t\t8:leaf=0.25
";

    #[test]
    fn parse_stump() {
        let tree = parse_dump(STUMP).unwrap();
        assert_eq!(tree.n_nodes(), 3);

        let root = tree.node(tree.root());
        assert_eq!(root.id(), NodeId::new(0));
        assert_eq!(root.depth(), 0);
        match root.kind() {
            NodeKind::Split {
                feature,
                condition,
                yes,
                no,
                missing,
            } => {
                assert_eq!(feature, "f0");
                assert!((condition - 0.5).abs() < f64::EPSILON);
                assert_eq!(*yes, NodeId::new(1));
                assert_eq!(*no, NodeId::new(2));
                assert_eq!(*missing, NodeId::new(1));
            }
            NodeKind::Leaf { .. } => panic!("root should be a split"),
        }

        let children: Vec<_> = root
            .children()
            .iter()
            .map(|&c| tree.node(c).id().value())
            .collect();
        assert_eq!(children, vec![1, 2]);
        assert_eq!(tree.node(root.children()[1]).leaf_value(), Some(0.4));
    }

    #[test]
    fn parse_deep_tree_preserves_structure() {
        let tree = parse_dump(DEEP).unwrap();
        assert_eq!(tree.n_nodes(), 9);
        assert_eq!(tree.n_leaves(), 5);
        assert_eq!(tree.depth(), 3);

        let six = tree.find(NodeId::new(6)).unwrap();
        let grand: Vec<_> = tree
            .node(six)
            .children()
            .iter()
            .map(|&c| tree.node(c).id().value())
            .collect();
        assert_eq!(grand, vec![7, 8]);
    }

    #[test]
    fn scientific_and_negative_thresholds() {
        let tree = parse_dump(DEEP).unwrap();
        let two = tree.node(tree.find(NodeId::new(2)).unwrap());
        let six = tree.node(tree.find(NodeId::new(6)).unwrap());
        assert!(matches!(two.kind(), NodeKind::Split { condition, .. } if (*condition + 1.0).abs() < 1e-12));
        assert!(matches!(six.kind(), NodeKind::Split { condition, .. } if (*condition - 1e-3).abs() < 1e-12));
    }

    #[test]
    fn stats_are_parsed() {
        let dump = "0:[age<30] yes=1,no=2,missing=1,gain=12.5,cover=100\n\t1:leaf=0.1,cover=40\n\t2:leaf=-0.1,cover=60\n";
        let tree = parse_dump(dump).unwrap();
        let root = tree.node(tree.root());
        assert_eq!(root.stats().gain, Some(12.5));
        assert_eq!(root.stats().cover, Some(100.0));
        assert_eq!(root.split_feature(), Some("age"));
        let leaf = tree.node(root.children()[0]);
        assert_eq!(leaf.stats().cover, Some(40.0));
        assert_eq!(leaf.stats().gain, None);
    }

    #[test]
    fn operator_is_a_single_character() {
        let dump = "0:[x_1>=3] yes=1,no=2,missing=2\n\t1:leaf=1\n\t2:leaf=2\n";
        assert!(parse_dump(dump).is_err());

        let dump = "0:[x_1>3] yes=1,no=2,missing=2\n\t1:leaf=1\n\t2:leaf=2\n";
        let tree = parse_dump(dump).unwrap();
        assert_eq!(tree.node(tree.root()).split_feature(), Some("x_1"));
    }

    #[test]
    fn feature_names_with_punctuation() {
        for feature in ["petal.length", "sepal-width", "age (yrs)", "x_1"] {
            let dump = format!(
                "0:[{feature}<2.45] yes=1,no=2,missing=1\n\t1:leaf=-0.2\n\t2:leaf=0.4\n"
            );
            let tree = parse_dump(&dump).unwrap();
            let root = tree.node(tree.root());
            assert_eq!(root.split_feature(), Some(feature));
            assert!(matches!(root.kind(), NodeKind::Split { condition, .. } if (*condition - 2.45).abs() < 1e-12));
        }
    }

    #[test]
    fn dashed_feature_with_negative_threshold() {
        let dump = "0:[sepal-width<-3] yes=1,no=2,missing=1\n\t1:leaf=-0.2\n\t2:leaf=0.4\n";
        let tree = parse_dump(dump).unwrap();
        let root = tree.node(tree.root());
        assert_eq!(root.split_feature(), Some("sepal-width"));
        assert!(matches!(root.kind(), NodeKind::Split { condition, .. } if (*condition + 3.0).abs() < 1e-12));
    }

    #[test]
    fn error_condition_without_operator() {
        let dump = "0:[petal.length] yes=1,no=2,missing=1\n\t1:leaf=-0.2\n\t2:leaf=0.4\n";
        assert!(matches!(
            parse_dump(dump),
            Err(DumpError::MalformedLine { line_number: 1, .. })
        ));
    }

    #[test]
    fn blank_lines_and_crlf_are_tolerated() {
        let dump = "0:[f0<0.5] yes=1,no=2,missing=1\r\n\r\n\t1:leaf=-0.2\r\n\t2:leaf=0.4\r\n\n";
        assert_eq!(parse_dump(dump).unwrap(), parse_dump(STUMP).unwrap());
    }

    #[test]
    fn custom_indent_marker() {
        let dump = STUMP.replace('\t', " ");
        let tree = DumpParser::new().with_indent(' ').parse(&dump).unwrap();
        assert_eq!(tree, parse_dump(STUMP).unwrap());
        assert_eq!(DumpParser::default().indent(), DEFAULT_INDENT);
    }

    #[test]
    fn reparse_is_identical() {
        assert_eq!(parse_dump(DEEP).unwrap(), parse_dump(DEEP).unwrap());
    }

    #[test]
    fn single_leaf_tree() {
        let tree = parse_dump("0:leaf=0.75\n").unwrap();
        assert_eq!(tree.n_nodes(), 1);
        assert_eq!(tree.node(tree.root()).leaf_value(), Some(0.75));
    }

    // --- Rejections ---

    #[test]
    fn error_missing_closing_bracket() {
        let dump = "0:[f0<0.5 yes=1,no=2,missing=1\n\t1:leaf=-0.2\n\t2:leaf=0.4\n";
        let err = parse_dump(dump).unwrap_err();
        assert!(matches!(err, DumpError::MalformedLine { line_number: 1, .. }));
    }

    #[test]
    fn error_missing_opening_bracket() {
        let dump = "0:f0<0.5] yes=1,no=2,missing=1\n";
        assert!(matches!(
            parse_dump(dump),
            Err(DumpError::MalformedLine { line_number: 1, .. })
        ));
    }

    #[test]
    fn error_malformed_leaf_reports_line() {
        let dump = "0:[f0<0.5] yes=1,no=2,missing=1\n\t1:leaf=abc\n\t2:leaf=0.4\n";
        match parse_dump(dump).unwrap_err() {
            DumpError::MalformedLine { line_number, line } => {
                assert_eq!(line_number, 2);
                assert_eq!(line, "\t1:leaf=abc");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn error_unknown_stat_key() {
        let dump = "0:leaf=0.1,weight=3\n";
        assert!(matches!(parse_dump(dump), Err(DumpError::MalformedLine { .. })));
    }

    #[test]
    fn error_signed_node_id() {
        assert!(matches!(
            parse_dump("+0:leaf=0.1\n"),
            Err(DumpError::MalformedLine { .. })
        ));
    }

    #[test]
    fn error_depth_jump_of_two() {
        let dump = "0:[f0<0.5] yes=1,no=2,missing=1\n\t\t\t1:leaf=-0.2\n\t2:leaf=0.4\n";
        let err = parse_dump(dump).unwrap_err();
        assert!(matches!(
            err,
            DumpError::UnexpectedDepth {
                line_number: 2,
                depth: 3,
                max_depth: 1,
            }
        ));
    }

    #[test]
    fn error_indented_first_line() {
        assert!(matches!(
            parse_dump("\t0:leaf=0.1\n"),
            Err(DumpError::UnexpectedDepth { depth: 1, max_depth: 0, .. })
        ));
    }

    #[test]
    fn error_second_root() {
        let dump = "0:[f0<0.5] yes=1,no=2,missing=1\n\t1:leaf=-0.2\n\t2:leaf=0.4\n3:leaf=1\n";
        assert!(matches!(
            parse_dump(dump),
            Err(DumpError::SecondRoot { line_number: 4 })
        ));
    }

    #[test]
    fn error_unindented_children() {
        let dump = "0:[f0<0.5] yes=1,no=2,missing=1\n1:leaf=-0.2\n2:leaf=0.4\n";
        assert!(matches!(
            parse_dump(dump),
            Err(DumpError::SecondRoot { line_number: 2 })
        ));
    }

    #[test]
    fn error_child_of_leaf() {
        let dump = "0:[f0<0.5] yes=1,no=2,missing=1\n\t1:leaf=-0.2\n\t\t3:leaf=0.1\n";
        assert!(matches!(
            parse_dump(dump),
            Err(DumpError::ChildOfLeaf { line_number: 3, parent_id: 1 })
        ));
    }

    #[test]
    fn error_duplicate_node_id() {
        let dump = "0:[f0<0.5] yes=1,no=2,missing=1\n\t1:leaf=-0.2\n\t1:leaf=0.4\n";
        assert!(matches!(
            parse_dump(dump),
            Err(DumpError::DuplicateNodeId {
                node_id: 1,
                first_line: 2,
                line_number: 3,
            })
        ));
    }

    #[test]
    fn error_childless_branch() {
        let dump = "0:[f0<0.5] yes=1,no=2,missing=1\n";
        assert!(matches!(
            parse_dump(dump),
            Err(DumpError::ChildlessBranch { node_id: 0 })
        ));
    }

    #[test]
    fn error_empty_dump() {
        assert!(matches!(parse_dump(""), Err(DumpError::EmptyDump)));
        assert!(matches!(parse_dump("\n\n"), Err(DumpError::EmptyDump)));
    }

    #[test]
    fn error_display_names_line() {
        let err = parse_dump("garbage\n").unwrap_err();
        assert_eq!(err.to_string(), "line 1 in unexpected format: \"garbage\"");
    }
}
