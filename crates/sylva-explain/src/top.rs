//! Selection of the strongest positive and negative contributions.

use crate::contribution::ContributionVector;
use crate::features::{FeatureIndex, FeatureNames};

/// How many features to keep when summarizing a contribution vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Top {
    /// Keep every non-zero feature.
    #[default]
    All,
    /// Keep the `k` largest by absolute weight, then split by sign.
    Abs(usize),
    /// Keep up to `pos` positive and `neg` negative features independently.
    Split {
        /// Maximum positive features.
        pos: usize,
        /// Maximum negative features.
        neg: usize,
    },
}

/// A named feature weight.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct FeatureWeight {
    /// Display name; the bias slot uses the bias name.
    pub feature: String,
    /// Contribution to the score.
    pub weight: f64,
}

/// The kept features of one target, split by sign.
///
/// `pos` is ordered by descending weight and `neg` by ascending weight, so
/// both start with the strongest contribution. Zero weights never appear.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize)]
pub struct TopFeatures {
    /// Positive contributions, strongest first.
    pub pos: Vec<FeatureWeight>,
    /// Negative contributions, strongest first.
    pub neg: Vec<FeatureWeight>,
    /// Number of positive features left out.
    pub pos_remaining: usize,
    /// Number of negative features left out.
    pub neg_remaining: usize,
}

/// Select the strongest contributions of `weights`, bias slot included.
#[must_use]
pub fn top_features(weights: &ContributionVector, names: &FeatureNames, top: Top) -> TopFeatures {
    let mut pos: Vec<(usize, f64)> = Vec::new();
    let mut neg: Vec<(usize, f64)> = Vec::new();
    for (i, &w) in weights.as_slice().iter().enumerate() {
        if w > 0.0 {
            pos.push((i, w));
        } else if w < 0.0 {
            neg.push((i, w));
        }
    }
    // Stable sorts keep slot order among ties.
    pos.sort_by(|a, b| b.1.total_cmp(&a.1));
    neg.sort_by(|a, b| a.1.total_cmp(&b.1));

    let (n_pos, n_neg) = match top {
        Top::All => (pos.len(), neg.len()),
        Top::Split { pos: p, neg: n } => (p.min(pos.len()), n.min(neg.len())),
        Top::Abs(k) => split_abs(&pos, &neg, k),
    };

    let name = |(i, w): (usize, f64)| FeatureWeight {
        feature: names.name(FeatureIndex::new(i)).to_string(),
        weight: w,
    };
    TopFeatures {
        pos_remaining: pos.len() - n_pos,
        neg_remaining: neg.len() - n_neg,
        pos: pos.into_iter().take(n_pos).map(name).collect(),
        neg: neg.into_iter().take(n_neg).map(name).collect(),
    }
}

/// Count how many of the `k` largest absolute weights fall on each side.
///
/// Both lists are sorted strongest first, so this is a merge of two sorted
/// sequences by magnitude. Ties go to the lower slot index.
fn split_abs(pos: &[(usize, f64)], neg: &[(usize, f64)], k: usize) -> (usize, usize) {
    let (mut p, mut n) = (0, 0);
    while p + n < k && (p < pos.len() || n < neg.len()) {
        let take_pos = match (pos.get(p), neg.get(n)) {
            (Some(a), Some(b)) => a.1 > -b.1 || (a.1 == -b.1 && a.0 < b.0),
            (Some(_), None) => true,
            _ => false,
        };
        if take_pos {
            p += 1;
        } else {
            n += 1;
        }
    }
    (p, n)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector(values: &[f64]) -> ContributionVector {
        let mut v = ContributionVector::zeros(values.len() - 1);
        for (i, &w) in values.iter().enumerate() {
            v.add(FeatureIndex::new(i), w);
        }
        v
    }

    fn feature_names(tf: &[FeatureWeight]) -> Vec<&str> {
        tf.iter().map(|f| f.feature.as_str()).collect()
    }

    #[test]
    fn all_keeps_every_non_zero() {
        let v = vector(&[0.5, 0.0, -0.25, 1.0, -2.0]);
        let names = FeatureNames::positional(4);
        let top = top_features(&v, &names, Top::All);
        assert_eq!(feature_names(&top.pos), ["f3", "f0"]);
        assert_eq!(feature_names(&top.neg), ["<BIAS>", "f2"]);
        assert_eq!(top.pos_remaining, 0);
        assert_eq!(top.neg_remaining, 0);
    }

    #[test]
    fn abs_takes_largest_magnitudes() {
        let v = vector(&[0.5, 0.1, -0.25, 1.0, -2.0]);
        let names = FeatureNames::positional(4);
        let top = top_features(&v, &names, Top::Abs(3));
        assert_eq!(feature_names(&top.pos), ["f3", "f0"]);
        assert_eq!(feature_names(&top.neg), ["<BIAS>"]);
        assert_eq!(top.pos_remaining, 1);
        assert_eq!(top.neg_remaining, 1);
    }

    #[test]
    fn abs_zero_keeps_nothing() {
        let v = vector(&[0.5, -0.5]);
        let names = FeatureNames::positional(1);
        let top = top_features(&v, &names, Top::Abs(0));
        assert!(top.pos.is_empty() && top.neg.is_empty());
        assert_eq!((top.pos_remaining, top.neg_remaining), (1, 1));
    }

    #[test]
    fn abs_larger_than_vector() {
        let v = vector(&[0.5, -0.5, 0.0]);
        let names = FeatureNames::positional(2);
        let top = top_features(&v, &names, Top::Abs(10));
        assert_eq!(top.pos.len() + top.neg.len(), 2);
    }

    #[test]
    fn abs_tie_prefers_lower_slot() {
        let v = vector(&[-1.0, 1.0, 0.0]);
        let names = FeatureNames::positional(2);
        let top = top_features(&v, &names, Top::Abs(1));
        assert_eq!(feature_names(&top.neg), ["f0"]);
        assert!(top.pos.is_empty());
    }

    #[test]
    fn split_limits_each_side() {
        let v = vector(&[0.5, 0.1, -0.25, 1.0, -2.0]);
        let names = FeatureNames::positional(4);
        let top = top_features(&v, &names, Top::Split { pos: 1, neg: 5 });
        assert_eq!(feature_names(&top.pos), ["f3"]);
        assert_eq!(feature_names(&top.neg), ["<BIAS>", "f2"]);
        assert_eq!(top.pos_remaining, 2);
        assert_eq!(top.neg_remaining, 0);
    }

    #[test]
    fn weights_carry_through() {
        let v = vector(&[0.3, 0.1]);
        let names = FeatureNames::positional(1);
        let top = top_features(&v, &names, Top::All);
        assert_eq!(top.pos[0].weight, 0.3);
        assert_eq!(top.pos[1].feature, "<BIAS>");
    }
}
