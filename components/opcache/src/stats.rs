//! Cache statistics for a code unit
//!
//! Counts hits, misses and fill outcomes per instruction kind.

use serde::{Deserialize, Serialize};

use crate::adaptive::SiteKind;
use crate::record::FillOutcome;

/// Counters for one instruction kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindStats {
    /// Lookups answered from the cache
    pub hits: u64,
    /// Lookups that went through full resolution
    pub misses: u64,
    /// Payloads installed
    pub fills: u64,
    /// Misses whose result had no cacheable form
    pub uncacheable: u64,
    /// Fills that followed a mode switch
    pub switches: u64,
    /// Sites disabled
    pub disables: u64,
}

impl KindStats {
    /// Fraction of lookups answered from the cache
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Statistics for every instruction kind of a code unit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Global loads
    pub global: KindStats,
    /// Attribute loads
    pub load_attr: KindStats,
    /// Method loads
    pub load_method: KindStats,
    /// Attribute stores
    pub store_attr: KindStats,
}

impl CacheStats {
    /// Create zeroed statistics
    pub fn new() -> Self {
        Self::default()
    }

    /// Counters for one kind
    pub fn kind(&self, kind: SiteKind) -> &KindStats {
        match kind {
            SiteKind::Global => &self.global,
            SiteKind::LoadAttr => &self.load_attr,
            SiteKind::LoadMethod => &self.load_method,
            SiteKind::StoreAttr => &self.store_attr,
        }
    }

    fn kind_mut(&mut self, kind: SiteKind) -> &mut KindStats {
        match kind {
            SiteKind::Global => &mut self.global,
            SiteKind::LoadAttr => &mut self.load_attr,
            SiteKind::LoadMethod => &mut self.load_method,
            SiteKind::StoreAttr => &mut self.store_attr,
        }
    }

    /// Record a cache hit
    pub fn record_hit(&mut self, kind: SiteKind) {
        self.kind_mut(kind).hits += 1;
    }

    /// Record a miss that was not followed by a fill attempt
    pub fn record_miss(&mut self, kind: SiteKind) {
        self.kind_mut(kind).misses += 1;
    }

    /// Record a miss and what the fill did
    pub fn record_fill(&mut self, kind: SiteKind, outcome: FillOutcome) {
        let stats = self.kind_mut(kind);
        stats.misses += 1;
        match outcome {
            FillOutcome::Filled(_) => stats.fills += 1,
            FillOutcome::Switched(_) => {
                stats.fills += 1;
                stats.switches += 1;
            }
            FillOutcome::Uncacheable => stats.uncacheable += 1,
            FillOutcome::Disabled => stats.disables += 1,
        }
    }

    /// Hits across all kinds
    pub fn total_hits(&self) -> u64 {
        self.global.hits + self.load_attr.hits + self.load_method.hits + self.store_attr.hits
    }

    /// Misses across all kinds
    pub fn total_misses(&self) -> u64 {
        self.global.misses + self.load_attr.misses + self.load_method.misses + self.store_attr.misses
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Clear all counters
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
