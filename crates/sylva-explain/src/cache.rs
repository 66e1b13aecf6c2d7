//! Reuse of parsed ensembles across explain calls.

use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;

use tracing::debug;

use crate::ensemble::{Ensemble, EnsembleKind};
use crate::error::ExplainError;

/// Content fingerprint of a dump list plus its ensemble kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EnsembleKey(u64);

impl EnsembleKey {
    /// Fingerprint `dumps` and `kind`.
    #[must_use]
    pub fn of<S: AsRef<str>>(dumps: &[S], kind: EnsembleKind) -> Self {
        let mut hasher = DefaultHasher::new();
        kind.hash(&mut hasher);
        dumps.len().hash(&mut hasher);
        for dump in dumps {
            dump.as_ref().hash(&mut hasher);
        }
        Self(hasher.finish())
    }
}

struct Entry {
    dumps: Vec<String>,
    kind: EnsembleKind,
    ensemble: Arc<Ensemble>,
}

impl Entry {
    fn matches<S: AsRef<str>>(&self, dumps: &[S], kind: EnsembleKind) -> bool {
        self.kind == kind
            && self.dumps.len() == dumps.len()
            && self.dumps.iter().zip(dumps).all(|(a, b)| a == b.as_ref())
    }
}

/// Memoizes [`Ensemble::parse`] by dump content.
///
/// Repeated explain calls against the same booster parse it once. Hits are
/// confirmed against the stored dump text, so a fingerprint collision only
/// costs a re-parse.
#[derive(Default)]
pub struct EnsembleCache {
    entries: HashMap<EnsembleKey, Entry>,
    hits: usize,
    misses: usize,
}

impl EnsembleCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached ensemble for `dumps`, parsing it on first use.
    ///
    /// # Errors
    ///
    /// Any error of [`Ensemble::parse`]. Failures are not cached.
    pub fn get_or_parse<S: AsRef<str> + Sync>(
        &mut self,
        dumps: &[S],
        kind: EnsembleKind,
    ) -> Result<Arc<Ensemble>, ExplainError> {
        let key = EnsembleKey::of(dumps, kind);
        if let Some(entry) = self.entries.get(&key)
            && entry.matches(dumps, kind)
        {
            self.hits += 1;
            debug!(hits = self.hits, "ensemble cache hit");
            return Ok(Arc::clone(&entry.ensemble));
        }

        let ensemble = Arc::new(Ensemble::parse(dumps, kind)?);
        self.misses += 1;
        debug!(misses = self.misses, "ensemble cache miss");
        self.entries.insert(
            key,
            Entry {
                dumps: dumps.iter().map(|d| d.as_ref().to_string()).collect(),
                kind,
                ensemble: Arc::clone(&ensemble),
            },
        );
        Ok(ensemble)
    }

    /// Return the number of cached ensembles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Return `true` if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Return the number of lookups served from the cache.
    #[must_use]
    pub fn hits(&self) -> usize {
        self.hits
    }

    /// Return the number of lookups that had to parse.
    #[must_use]
    pub fn misses(&self) -> usize {
        self.misses
    }

    /// Drop every cached ensemble. Counters are kept.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl std::fmt::Debug for EnsembleCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnsembleCache")
            .field("len", &self.entries.len())
            .field("hits", &self.hits)
            .field("misses", &self.misses)
            .finish()
    }
}
