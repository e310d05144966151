//! Method load cache.
//!
//! Shares the attribute record. A function read from the type is handed out
//! unbound, so the call can pass the receiver as its first argument without
//! allocating a bound method.

use core_types::{MethodLookup, RuntimeHost, RuntimeResult, Value};

use crate::adaptive::{AdaptivePolicy, SiteKind};
use crate::attr::fill_attr_site;
use crate::record::{CacheEntry, CallSiteCache, FillOutcome};

/// Returns the cached method lookup, or `None` on a miss.
pub fn try_cached_method<H: RuntimeHost + ?Sized>(
    site: &mut CallSiteCache,
    host: &H,
    obj: &Value,
    name: &str,
) -> Option<RuntimeResult<MethodLookup>> {
    let CacheEntry::Attr(entry) = &site.entry else {
        return None;
    };
    let result = entry.probe(host, obj, name, true)?;
    site.hit();
    Some(result)
}

/// Records a successful full method resolution of `name` on `obj`.
pub fn fill_method<H: RuntimeHost + ?Sized>(
    site: &mut CallSiteCache,
    host: &H,
    obj: &Value,
    name: &str,
    policy: &AdaptivePolicy,
) -> FillOutcome {
    fill_attr_site(SiteKind::LoadMethod, site, host, obj, name, policy)
}
