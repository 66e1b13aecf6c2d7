//! Decision-path decomposition of a single tree's output.

use sylva_tree::{NodeId, ParsedTree};

use crate::contribution::Contribution;
use crate::error::ExplainError;
use crate::features::FeatureNames;

/// Split one tree's output for one example into per-feature contributions.
///
/// Walks the root-to-leaf path of `leaf_id`. Each step from a split to its
/// child credits `child.aggregate - split.aggregate` to the split's feature;
/// the root aggregate goes to the bias slot. The deltas telescope, so the
/// weights always sum to the leaf value.
///
/// `leaf_id` is the leaf the booster itself routed the example to. Splits
/// are not re-evaluated here, which is why `missing` branch ids play no part.
///
/// # Errors
///
/// | Variant | When |
/// |---|---|
/// | [`ExplainError::UnknownLeaf`]    | `leaf_id` is not a leaf of `tree` |
/// | [`ExplainError::UnknownFeature`] | a split on the path has an unmapped feature token |
pub fn decompose(
    tree: &ParsedTree,
    leaf_id: NodeId,
    names: &FeatureNames,
) -> Result<Contribution, ExplainError> {
    let leaf = tree.leaf(leaf_id).ok_or(ExplainError::UnknownLeaf {
        leaf_id: leaf_id.value(),
    })?;
    let Some(score) = tree.node(leaf).leaf_value() else {
        unreachable!("leaf index only holds leaves");
    };

    let mut weights = names.zeros();
    let path = tree.path_to(leaf);
    for step in path.windows(2) {
        let (parent, child) = (step[0], step[1]);
        let Some(token) = tree.node(parent).split_feature() else {
            unreachable!("only split nodes have children");
        };
        let feature = names.lookup(token)?;
        weights.add(
            feature,
            tree.aggregate_value(child) - tree.aggregate_value(parent),
        );
    }
    weights.add(names.bias(), tree.aggregate_value(tree.root()));

    Ok(Contribution { score, weights })
}
