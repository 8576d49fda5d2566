//! Preload tuning.

use std::env;

use crate::filter::FilterValue;

/// Variable bounding the number of keys per IN clause.
pub const MAX_IN_CLAUSE_VAR: &str = "TALLY_MAX_IN_CLAUSE";

/// Settings shared by the association and count preloaders.
///
/// ```rust
/// use tally_query::{FilterValue, PreloadConfig};
///
/// let config = PreloadConfig::new().max_in_clause_len(2);
/// let keys: Vec<FilterValue> = vec![1i64.into(), 2i64.into(), 3i64.into()];
/// assert_eq!(config.batches(&keys).count(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreloadConfig {
    /// Maximum keys per `IN (...)` list. `None` sends every key at once.
    pub max_in_clause_len: Option<usize>,
}

impl PreloadConfig {
    /// Create a config with no batching.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound each IN clause to `len` keys. Zero disables batching.
    pub fn max_in_clause_len(mut self, len: usize) -> Self {
        self.max_in_clause_len = (len > 0).then_some(len);
        self
    }

    /// Load from `TALLY_MAX_IN_CLAUSE`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load through an arbitrary variable lookup.
    ///
    /// Missing, zero, and unparsable values all mean unbounded.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let max_in_clause_len = lookup(MAX_IN_CLAUSE_VAR)
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .filter(|len| *len > 0);
        Self { max_in_clause_len }
    }

    /// Split keys into IN-clause sized batches.
    pub fn batches<'k>(&self, keys: &'k [FilterValue]) -> std::slice::Chunks<'k, FilterValue> {
        let size = self.max_in_clause_len.unwrap_or(keys.len()).max(1);
        keys.chunks(size)
    }
}
