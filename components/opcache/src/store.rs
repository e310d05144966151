//! Attribute store cache for split layouts.
//!
//! A hit overwrites an existing value of a split instance in place. Adding
//! a new key or converting the layout always goes through the full store.

use core_types::{AttrKind, RuntimeHost, StorageShape, Value, VersionTag};

use crate::adaptive::{AdaptivePolicy, SiteKind};
use crate::record::{CacheEntry, CallSiteCache, FillOutcome};

/// Store payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreEntry {
    /// Receiver type stamp at fill time
    pub type_version: VersionTag,
    /// Key table stamp at fill time
    pub keys_version: VersionTag,
    /// Position of the name in the key table
    pub index: usize,
}

const _: () = assert!(std::mem::size_of::<StoreEntry>() <= 32);

/// Performs the store through the cache. Returns `false` on a miss, in
/// which case nothing was written.
pub fn try_cached_store<H: RuntimeHost + ?Sized>(
    site: &mut CallSiteCache,
    host: &mut H,
    obj: &Value,
    value: &Value,
) -> bool {
    let CacheEntry::Store(entry) = site.entry else {
        return false;
    };
    let (Some(id), Some(ty)) = (obj.as_object(), host.type_of(obj)) else {
        return false;
    };
    if host.type_version(ty) != entry.type_version {
        return false;
    }
    let StorageShape::Split { keys, .. } = host.instance_storage(id) else {
        return false;
    };
    if host.keys_version(keys) != entry.keys_version {
        return false;
    }
    if !host.split_replace(id, entry.index, value.clone()) {
        return false;
    }
    site.hit();
    true
}

fn build_entry<H: RuntimeHost + ?Sized>(host: &H, obj: &Value, name: &str) -> Option<StoreEntry> {
    let id = obj.as_object()?;
    let ty = host.type_of(obj)?;
    if let Some(attr) = host.lookup_type_attr(ty, name) {
        if matches!(
            host.classify_attr(&attr),
            AttrKind::DataDescriptor { .. } | AttrKind::Slot { .. }
        ) {
            return None;
        }
    }
    let StorageShape::Split { keys, .. } = host.instance_storage(id) else {
        return None;
    };
    let index = host.keys_index(keys, name)?;
    host.split_value(id, index)?;
    Some(StoreEntry {
        type_version: host.type_version(ty),
        keys_version: host.keys_version(keys),
        index,
    })
}

/// Records a successful full store of `name` on `obj`.
///
/// Only stores that left the instance split with the name in its key
/// table are cacheable.
pub fn fill_store<H: RuntimeHost + ?Sized>(
    site: &mut CallSiteCache,
    host: &H,
    obj: &Value,
    name: &str,
    policy: &AdaptivePolicy,
) -> FillOutcome {
    let ticket = site.begin_fill(SiteKind::StoreAttr, policy);
    let entry = ticket
        .and_then(|_| build_entry(host, obj, name))
        .map(CacheEntry::Store);
    site.finish_fill(SiteKind::StoreAttr, ticket, entry)
}
