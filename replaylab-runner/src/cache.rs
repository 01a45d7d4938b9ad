//! Memoized search results keyed by full parameter combination.
//!
//! The key is the canonical rendering of a normalized [`ParamSet`], so two
//! combinations hit the same slot exactly when every name and value agrees.
//! A short blake3 digest of that key serves as a stable combination id in
//! exports and logs.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::metrics::PerformanceStats;
use crate::params::{ParamSet, ParamSetExt};

/// Content hash of a combination key (first 8 bytes of blake3, hex).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComboId(String);

impl ComboId {
    pub fn of(params: &ParamSet) -> Self {
        Self::from_key(&params.canonical_key())
    }

    pub fn from_key(key: &str) -> Self {
        let hash = blake3::hash(key.as_bytes());
        let hex: String = hash.as_bytes()[..8]
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect();
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ComboId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One evaluated combination. `stats` is `None` when the run closed no trades.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedResult {
    pub id: ComboId,
    pub params: ParamSet,
    pub stats: Option<PerformanceStats>,
}

/// Write-once cache of search results.
#[derive(Debug, Clone, Default)]
pub struct ResultCache {
    entries: HashMap<String, CachedResult>,
    hits: usize,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a combination, counting the hit.
    pub fn get(&mut self, params: &ParamSet) -> Option<&CachedResult> {
        let hit = self.entries.get(&params.canonical_key());
        if hit.is_some() {
            self.hits += 1;
        }
        hit
    }

    /// Store a result. An existing entry is kept; returns whether the
    /// combination was new.
    pub fn put(&mut self, params: ParamSet, stats: Option<PerformanceStats>) -> bool {
        let key = params.canonical_key();
        if self.entries.contains_key(&key) {
            return false;
        }
        let id = ComboId::from_key(&key);
        self.entries.insert(key, CachedResult { id, params, stats });
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> usize {
        self.hits
    }
}
