//! Cache table shared between threads running the same code unit.
//!
//! Each record sits behind its own lock. A thread that finds the record
//! locked does not wait: it resolves fully and leaves the record alone, so
//! a reader never sees a half-written payload.

use std::sync::atomic::{AtomicU64, Ordering};

use core_types::{MethodLookup, NamespaceId, RuntimeHost, RuntimeResult, Value};
use parking_lot::Mutex;

use crate::adaptive::AdaptivePolicy;
use crate::config::CacheConfig;
use crate::ops::{self, Observation};
use crate::record::CallSiteCache;

/// Thread-safe variant of [`crate::CodeCaches`], always active
#[derive(Debug)]
pub struct SharedCodeCaches {
    config: CacheConfig,
    policy: AdaptivePolicy,
    sites: Vec<Mutex<CallSiteCache>>,
    hits: AtomicU64,
    misses: AtomicU64,
    contended: AtomicU64,
}

/// Counters of a [`SharedCodeCaches`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SharedStats {
    /// Lookups answered from the cache
    pub hits: u64,
    /// Lookups that went through full resolution, contended ones included
    pub misses: u64,
    /// Lookups that found their record locked
    pub contended: u64,
}

impl SharedCodeCaches {
    /// Shared table with `site_count` records
    pub fn new(site_count: usize, config: CacheConfig) -> Self {
        let policy = config.policy();
        SharedCodeCaches {
            config,
            policy,
            sites: (0..site_count).map(|_| Mutex::new(CallSiteCache::new())).collect(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            contended: AtomicU64::new(0),
        }
    }

    /// Number of records
    pub fn site_count(&self) -> usize {
        self.sites.len()
    }

    /// Configuration
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Copy of one record, waiting for its lock
    pub fn snapshot(&self, site: usize) -> Option<CallSiteCache> {
        self.sites.get(site).map(|record| record.lock().clone())
    }

    /// Current counters
    pub fn stats(&self) -> SharedStats {
        SharedStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            contended: self.contended.load(Ordering::Relaxed),
        }
    }

    fn observe(&self, observation: Observation) {
        let counter = match observation {
            Observation::Hit => &self.hits,
            Observation::Miss | Observation::Fill(_) => &self.misses,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn bypass(&self) {
        self.contended.fetch_add(1, Ordering::Relaxed);
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Global name load at instruction `site`
    pub fn load_global<H: RuntimeHost + ?Sized>(
        &self,
        site: usize,
        host: &H,
        name: &str,
        globals: NamespaceId,
        builtins: NamespaceId,
    ) -> RuntimeResult<Value> {
        let Some(mut record) = self.sites.get(site).and_then(|r| r.try_lock()) else {
            self.bypass();
            return host.resolve_global(name, globals, builtins).map(|lookup| lookup.value);
        };
        let (result, observation) = ops::load_global(&mut record, &self.policy, host, name, globals, builtins);
        self.observe(observation);
        result
    }

    /// Attribute load at instruction `site`
    pub fn load_attr<H: RuntimeHost + ?Sized>(
        &self,
        site: usize,
        host: &H,
        obj: &Value,
        name: &str,
    ) -> RuntimeResult<Value> {
        let Some(mut record) = self.sites.get(site).and_then(|r| r.try_lock()) else {
            self.bypass();
            return host.resolve_attribute(obj, name);
        };
        let (result, observation) = ops::load_attr(&mut record, &self.policy, host, obj, name);
        self.observe(observation);
        result
    }

    /// Method load at instruction `site`
    pub fn load_method<H: RuntimeHost + ?Sized>(
        &self,
        site: usize,
        host: &H,
        obj: &Value,
        name: &str,
    ) -> RuntimeResult<MethodLookup> {
        let Some(mut record) = self.sites.get(site).and_then(|r| r.try_lock()) else {
            self.bypass();
            return host.resolve_method(obj, name);
        };
        let (result, observation) = ops::load_method(&mut record, &self.policy, host, obj, name);
        self.observe(observation);
        result
    }

    /// Attribute store at instruction `site`
    pub fn store_attr<H: RuntimeHost + ?Sized>(
        &self,
        site: usize,
        host: &mut H,
        obj: &Value,
        name: &str,
        value: Value,
    ) -> RuntimeResult<()> {
        let Some(mut record) = self.sites.get(site).and_then(|r| r.try_lock()) else {
            self.bypass();
            return host.store_attribute(obj, name, value);
        };
        let enabled = self.config.store_cache;
        let (result, observation) = ops::store_attr(&mut record, &self.policy, enabled, host, obj, name, value);
        self.observe(observation);
        result
    }
}
