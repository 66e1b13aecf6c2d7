//! Per-feature contribution vectors.

use std::ops::AddAssign;

use crate::features::FeatureIndex;

/// Dense per-feature contributions with one trailing bias slot.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ContributionVector {
    weights: Vec<f64>,
}

impl ContributionVector {
    /// Create an all-zero vector for `n_features` features plus the bias slot.
    #[must_use]
    pub fn zeros(n_features: usize) -> Self {
        Self {
            weights: vec![0.0; n_features + 1],
        }
    }

    /// Return the number of real features.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.weights.len() - 1
    }

    /// Return the contribution of one slot.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    #[must_use]
    pub fn get(&self, index: FeatureIndex) -> f64 {
        self.weights[index.index()]
    }

    /// Return the bias contribution.
    #[must_use]
    pub fn bias(&self) -> f64 {
        self.weights[self.weights.len() - 1]
    }

    /// Return the real feature contributions, bias excluded.
    #[must_use]
    pub fn features(&self) -> &[f64] {
        &self.weights[..self.weights.len() - 1]
    }

    /// Return every slot, bias last.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.weights
    }

    /// Return the sum of every slot, bias included.
    #[must_use]
    pub fn sum(&self) -> f64 {
        self.weights.iter().sum()
    }

    /// Consume the vector and return its slots, bias last.
    #[must_use]
    pub fn into_vec(self) -> Vec<f64> {
        self.weights
    }

    pub(crate) fn add(&mut self, index: FeatureIndex, delta: f64) {
        self.weights[index.index()] += delta;
    }
}

impl AddAssign<&ContributionVector> for ContributionVector {
    fn add_assign(&mut self, rhs: &ContributionVector) {
        debug_assert_eq!(self.weights.len(), rhs.weights.len());
        for (w, r) in self.weights.iter_mut().zip(&rhs.weights) {
            *w += r;
        }
    }
}

/// One tree's (or one class's) share of a prediction.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Contribution {
    /// Raw margin: the leaf value, or the sum of leaf values over a class.
    pub score: f64,
    /// Per-feature decomposition of `score`.
    pub weights: ContributionVector,
}

impl Contribution {
    /// Create a zero contribution for `n_features` features.
    #[must_use]
    pub fn zero(n_features: usize) -> Self {
        Self {
            score: 0.0,
            weights: ContributionVector::zeros(n_features),
        }
    }
}

impl AddAssign<&Contribution> for Contribution {
    fn add_assign(&mut self, rhs: &Contribution) {
        self.score += rhs.score;
        self.weights += &rhs.weights;
    }
}
