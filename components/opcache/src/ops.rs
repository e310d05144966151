//! Probe, resolve, fill: the per-instruction flow shared by the cache
//! tables.

use core_types::{MethodLookup, NamespaceId, RuntimeHost, RuntimeResult, Value};

use crate::adaptive::AdaptivePolicy;
use crate::attr::{fill_attr, try_cached_attr};
use crate::global::{fill_global, try_cached_global};
use crate::method::{fill_method, try_cached_method};
use crate::record::{CallSiteCache, FillOutcome};
use crate::store::{fill_store, try_cached_store};

/// What happened at the site during one instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Observation {
    /// Answered from the cache
    Hit,
    /// Fully resolved without a fill attempt
    Miss,
    /// Fully resolved, then filled
    Fill(FillOutcome),
}

pub(crate) fn load_global<H: RuntimeHost + ?Sized>(
    site: &mut CallSiteCache,
    policy: &AdaptivePolicy,
    host: &H,
    name: &str,
    globals: NamespaceId,
    builtins: NamespaceId,
) -> (RuntimeResult<Value>, Observation) {
    if let Some(value) = try_cached_global(site, host, name, globals, builtins) {
        return (Ok(value), Observation::Hit);
    }
    let lookup = match host.resolve_global(name, globals, builtins) {
        Ok(lookup) => lookup,
        Err(err) => return (Err(err), Observation::Miss),
    };
    if site.is_disabled() {
        return (Ok(lookup.value), Observation::Miss);
    }
    let outcome = fill_global(site, host, globals, builtins, &lookup, policy);
    (Ok(lookup.value), Observation::Fill(outcome))
}

pub(crate) fn load_attr<H: RuntimeHost + ?Sized>(
    site: &mut CallSiteCache,
    policy: &AdaptivePolicy,
    host: &H,
    obj: &Value,
    name: &str,
) -> (RuntimeResult<Value>, Observation) {
    if let Some(result) = try_cached_attr(site, host, obj, name) {
        return (result, Observation::Hit);
    }
    let value = match host.resolve_attribute(obj, name) {
        Ok(value) => value,
        Err(err) => return (Err(err), Observation::Miss),
    };
    if site.is_disabled() {
        return (Ok(value), Observation::Miss);
    }
    let outcome = fill_attr(site, host, obj, name, policy);
    (Ok(value), Observation::Fill(outcome))
}

pub(crate) fn load_method<H: RuntimeHost + ?Sized>(
    site: &mut CallSiteCache,
    policy: &AdaptivePolicy,
    host: &H,
    obj: &Value,
    name: &str,
) -> (RuntimeResult<MethodLookup>, Observation) {
    if let Some(result) = try_cached_method(site, host, obj, name) {
        return (result, Observation::Hit);
    }
    let lookup = match host.resolve_method(obj, name) {
        Ok(lookup) => lookup,
        Err(err) => return (Err(err), Observation::Miss),
    };
    if site.is_disabled() {
        return (Ok(lookup), Observation::Miss);
    }
    let outcome = fill_method(site, host, obj, name, policy);
    (Ok(lookup), Observation::Fill(outcome))
}

pub(crate) fn store_attr<H: RuntimeHost + ?Sized>(
    site: &mut CallSiteCache,
    policy: &AdaptivePolicy,
    enabled: bool,
    host: &mut H,
    obj: &Value,
    name: &str,
    value: Value,
) -> (RuntimeResult<()>, Observation) {
    if enabled && try_cached_store(site, host, obj, &value) {
        return (Ok(()), Observation::Hit);
    }
    if let Err(err) = host.store_attribute(obj, name, value) {
        return (Err(err), Observation::Miss);
    }
    if !enabled || site.is_disabled() {
        return (Ok(()), Observation::Miss);
    }
    let outcome = fill_store(site, &*host, obj, name, policy);
    (Ok(()), Observation::Fill(outcome))
}
