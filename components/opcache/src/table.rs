//! Per-code-unit cache table.
//!
//! A code unit gets one record per instrumented instruction. The records
//! are only allocated once the unit has run `activation_runs` times; before
//! that every operation goes straight to full resolution.

use core_types::{MethodLookup, NamespaceId, RuntimeHost, RuntimeResult, Value};
use tracing::debug;

use crate::adaptive::{AdaptivePolicy, SiteKind};
use crate::config::CacheConfig;
use crate::ops::{self, Observation};
use crate::record::CallSiteCache;
use crate::stats::CacheStats;

pub(crate) fn observe(stats: &mut CacheStats, kind: SiteKind, observation: Observation) {
    match observation {
        Observation::Hit => stats.record_hit(kind),
        Observation::Miss => stats.record_miss(kind),
        Observation::Fill(outcome) => stats.record_fill(kind, outcome),
    }
}

/// Cache records of one code unit, with activation and statistics.
///
/// # Example
///
/// ```
/// use opcache::{CacheConfig, CodeCaches};
///
/// let mut caches = CodeCaches::new(4, CacheConfig { activation_runs: 2, ..CacheConfig::default() });
/// assert!(!caches.record_run());
/// assert!(caches.record_run());
/// assert!(caches.is_active());
/// assert!(caches.site(3).is_some());
/// ```
#[derive(Debug, Clone)]
pub struct CodeCaches {
    config: CacheConfig,
    policy: AdaptivePolicy,
    site_count: usize,
    sites: Vec<CallSiteCache>,
    active: bool,
    runs: u32,
    stats: CacheStats,
}

impl CodeCaches {
    /// Table for a code unit with `site_count` instrumented instructions
    pub fn new(site_count: usize, config: CacheConfig) -> Self {
        let policy = config.policy();
        let mut caches = CodeCaches {
            config,
            policy,
            site_count,
            sites: Vec::new(),
            active: false,
            runs: 0,
            stats: CacheStats::new(),
        };
        if caches.config.activation_runs == 0 {
            caches.activate();
        }
        caches
    }

    /// Count one execution of the code unit; returns whether the records
    /// are allocated.
    pub fn record_run(&mut self) -> bool {
        if self.is_active() {
            return true;
        }
        self.runs = self.runs.saturating_add(1);
        if self.runs >= self.config.activation_runs {
            self.activate();
        }
        self.is_active()
    }

    /// Allocate the records now
    pub fn activate(&mut self) {
        if self.is_active() {
            return;
        }
        debug!(sites = self.site_count, runs = self.runs, "activating call-site caches");
        self.sites = vec![CallSiteCache::new(); self.site_count];
        self.active = true;
    }

    /// Whether the records are allocated
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Number of instrumented instructions
    pub fn site_count(&self) -> usize {
        self.site_count
    }

    /// Executions counted so far
    pub fn runs(&self) -> u32 {
        self.runs
    }

    /// Record of one instruction, once active
    pub fn site(&self, index: usize) -> Option<&CallSiteCache> {
        self.sites.get(index)
    }

    /// Mutable record of one instruction, once active
    pub fn site_mut(&mut self, index: usize) -> Option<&mut CallSiteCache> {
        self.sites.get_mut(index)
    }

    /// Configuration
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Statistics
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Global name load at instruction `site`
    pub fn load_global<H: RuntimeHost + ?Sized>(
        &mut self,
        site: usize,
        host: &H,
        name: &str,
        globals: NamespaceId,
        builtins: NamespaceId,
    ) -> RuntimeResult<Value> {
        let Some(record) = self.sites.get_mut(site) else {
            return host.resolve_global(name, globals, builtins).map(|lookup| lookup.value);
        };
        let (result, observation) = ops::load_global(record, &self.policy, host, name, globals, builtins);
        observe(&mut self.stats, SiteKind::Global, observation);
        result
    }

    /// Attribute load at instruction `site`
    pub fn load_attr<H: RuntimeHost + ?Sized>(
        &mut self,
        site: usize,
        host: &H,
        obj: &Value,
        name: &str,
    ) -> RuntimeResult<Value> {
        let Some(record) = self.sites.get_mut(site) else {
            return host.resolve_attribute(obj, name);
        };
        let (result, observation) = ops::load_attr(record, &self.policy, host, obj, name);
        observe(&mut self.stats, SiteKind::LoadAttr, observation);
        result
    }

    /// Method load at instruction `site`
    pub fn load_method<H: RuntimeHost + ?Sized>(
        &mut self,
        site: usize,
        host: &H,
        obj: &Value,
        name: &str,
    ) -> RuntimeResult<MethodLookup> {
        let Some(record) = self.sites.get_mut(site) else {
            return host.resolve_method(obj, name);
        };
        let (result, observation) = ops::load_method(record, &self.policy, host, obj, name);
        observe(&mut self.stats, SiteKind::LoadMethod, observation);
        result
    }

    /// Attribute store at instruction `site`
    pub fn store_attr<H: RuntimeHost + ?Sized>(
        &mut self,
        site: usize,
        host: &mut H,
        obj: &Value,
        name: &str,
        value: Value,
    ) -> RuntimeResult<()> {
        let Some(record) = self.sites.get_mut(site) else {
            return host.store_attribute(obj, name, value);
        };
        let enabled = self.config.store_cache;
        let (result, observation) = ops::store_attr(record, &self.policy, enabled, host, obj, name, value);
        observe(&mut self.stats, SiteKind::StoreAttr, observation);
        result
    }
}
