//! Feature-name mapping with an explicit bias slot.

use std::collections::HashMap;
use std::fmt;

use crate::contribution::ContributionVector;
use crate::error::ExplainError;

/// Display name of the bias slot unless overridden.
pub const DEFAULT_BIAS_NAME: &str = "<BIAS>";

/// Zero-based position in a [`ContributionVector`].
///
/// Positions `0..n_features` are real features; position `n_features` is
/// the bias slot returned by [`FeatureNames::bias`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FeatureIndex(usize);

impl FeatureIndex {
    /// Create a feature index from a zero-based position.
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    /// Return the zero-based position.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for FeatureIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ordered feature names plus a reserved bias slot.
///
/// Split tokens resolve by exact name first. Tokens of XGBoost's positional
/// form `f<N>` fall back to position `N`, so dumps of models trained without
/// feature names still map onto caller-supplied names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureNames {
    names: Vec<String>,
    lookup: HashMap<String, usize>,
    bias_name: String,
}

impl FeatureNames {
    /// Build a mapping from ordered feature names.
    ///
    /// # Errors
    ///
    /// Returns [`ExplainError::DuplicateFeatureName`] if a name repeats.
    pub fn new(names: Vec<String>) -> Result<Self, ExplainError> {
        let mut lookup = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            if lookup.insert(name.clone(), i).is_some() {
                return Err(ExplainError::DuplicateFeatureName { name: name.clone() });
            }
        }
        Ok(Self {
            names,
            lookup,
            bias_name: DEFAULT_BIAS_NAME.to_string(),
        })
    }

    /// Build XGBoost's default names `f0..f{n_features - 1}`.
    #[must_use]
    pub fn positional(n_features: usize) -> Self {
        let names: Vec<String> = (0..n_features).map(|i| format!("f{i}")).collect();
        let lookup = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        Self {
            names,
            lookup,
            bias_name: DEFAULT_BIAS_NAME.to_string(),
        }
    }

    /// Set the display name of the bias slot.
    #[must_use]
    pub fn with_bias_name(mut self, bias_name: impl Into<String>) -> Self {
        self.bias_name = bias_name.into();
        self
    }

    /// Return the number of real features (the bias slot excluded).
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Return `true` if there are no real features.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Return the length of a contribution vector: features plus bias.
    #[must_use]
    pub fn n_slots(&self) -> usize {
        self.names.len() + 1
    }

    /// Return the reserved bias slot. Never collides with a feature.
    #[must_use]
    pub fn bias(&self) -> FeatureIndex {
        FeatureIndex::new(self.names.len())
    }

    /// Return the display name of the bias slot.
    #[must_use]
    pub fn bias_name(&self) -> &str {
        &self.bias_name
    }

    /// Return the real feature names in order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Return the display name of a slot, including the bias slot.
    ///
    /// # Panics
    ///
    /// Panics if `index` is beyond the bias slot.
    #[must_use]
    pub fn name(&self, index: FeatureIndex) -> &str {
        if index == self.bias() {
            &self.bias_name
        } else {
            &self.names[index.index()]
        }
    }

    /// Resolve a raw split-feature token, or `None` if it is unmapped.
    #[must_use]
    pub fn get(&self, token: &str) -> Option<FeatureIndex> {
        if let Some(&i) = self.lookup.get(token) {
            return Some(FeatureIndex::new(i));
        }
        positional_index(token)
            .filter(|&i| i < self.names.len())
            .map(FeatureIndex::new)
    }

    /// Resolve a raw split-feature token.
    ///
    /// # Errors
    ///
    /// Returns [`ExplainError::UnknownFeature`] if the token is unmapped.
    pub fn lookup(&self, token: &str) -> Result<FeatureIndex, ExplainError> {
        self.get(token).ok_or_else(|| ExplainError::UnknownFeature {
            token: token.to_string(),
        })
    }

    /// Return an all-zero contribution vector sized for this mapping.
    #[must_use]
    pub fn zeros(&self) -> ContributionVector {
        ContributionVector::zeros(self.names.len())
    }
}

/// Parse XGBoost's positional token `f<N>`.
pub(crate) fn positional_index(token: &str) -> Option<usize> {
    let digits = token.strip_prefix('f')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
