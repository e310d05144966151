//! Global resolution cache.
//!
//! Value form: where the binding sits (an entry index of the primary or the
//! fallback table) plus the stamp of the primary namespace and, when the
//! name came from the fallback namespace, the fallback's stamp as well. Any
//! key added to or removed from the primary namespace bumps its stamp, so a
//! new primary binding shadowing a cached fallback binding is always seen.
//!
//! Index form: the entry index of the name inside the primary table plus
//! the table's capacity. Survives rebinding; a resize or a different key at
//! that index is a miss.

use core_types::{GlobalLookup, GlobalOrigin, NamespaceId, RuntimeHost, Value, VersionTag};

use crate::adaptive::{AdaptivePolicy, SiteKind};
use crate::record::{CacheEntry, CallSiteCache, FillOutcome};

/// What the value form knows about the fallback namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackGuard {
    /// Found in the primary namespace; the fallback is irrelevant
    Ignored,
    /// Found in the fallback namespace at this stamp
    Version(VersionTag),
}

/// Global cache payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalEntry {
    /// Binding guarded by namespace stamps
    Value {
        /// Entry index of the name, in the fallback table when `fallback`
        /// is a version and in the primary table otherwise
        index: u32,
        /// Primary namespace stamp at fill time
        globals_version: VersionTag,
        /// Fallback guard
        fallback: FallbackGuard,
    },
    /// Cached table position
    Index {
        /// Primary table capacity at fill time
        capacity: u32,
        /// Entry index of the name
        index: u32,
    },
}

const _: () = assert!(std::mem::size_of::<GlobalEntry>() <= 32);

impl GlobalEntry {
    fn probe<H: RuntimeHost + ?Sized>(
        &self,
        host: &H,
        name: &str,
        globals: NamespaceId,
        builtins: NamespaceId,
    ) -> Option<Value> {
        match *self {
            GlobalEntry::Value {
                index,
                globals_version,
                fallback,
            } => {
                if host.namespace_version(globals) != globals_version {
                    return None;
                }
                let ns = match fallback {
                    FallbackGuard::Ignored => globals,
                    FallbackGuard::Version(v) => {
                        if host.namespace_version(builtins) != v {
                            return None;
                        }
                        builtins
                    }
                };
                host.namespace_entry(ns, index as usize, name)
            }
            GlobalEntry::Index { capacity, index } => {
                if host.namespace_capacity(globals) != capacity as usize {
                    return None;
                }
                host.namespace_entry(globals, index as usize, name)
            }
        }
    }
}

/// Returns the cached binding of `name`, or `None` on a miss.
///
/// A miss leaves the record untouched; the caller resolves fully and then
/// calls [`fill_global`].
pub fn try_cached_global<H: RuntimeHost + ?Sized>(
    site: &mut CallSiteCache,
    host: &H,
    name: &str,
    globals: NamespaceId,
    builtins: NamespaceId,
) -> Option<Value> {
    let CacheEntry::Global(entry) = &site.entry else {
        return None;
    };
    let value = entry.probe(host, name, globals, builtins)?;
    site.hit();
    Some(value)
}

/// Records the outcome of a full global resolution at `site`.
///
/// Must be called right after `lookup` was produced, with no intervening
/// namespace mutation.
pub fn fill_global<H: RuntimeHost + ?Sized>(
    site: &mut CallSiteCache,
    host: &H,
    globals: NamespaceId,
    builtins: NamespaceId,
    lookup: &GlobalLookup,
    policy: &AdaptivePolicy,
) -> FillOutcome {
    let ticket = site.begin_fill(SiteKind::Global, policy);
    let entry = ticket.and_then(|ticket| {
        let entry = match lookup.origin {
            GlobalOrigin::Primary { index } if ticket.escalated => GlobalEntry::Index {
                capacity: u32::try_from(host.namespace_capacity(globals)).ok()?,
                index: u32::try_from(index).ok()?,
            },
            GlobalOrigin::Primary { index } => GlobalEntry::Value {
                index: u32::try_from(index).ok()?,
                globals_version: host.namespace_version(globals),
                fallback: FallbackGuard::Ignored,
            },
            GlobalOrigin::Fallback { index } => GlobalEntry::Value {
                index: u32::try_from(index).ok()?,
                globals_version: host.namespace_version(globals),
                fallback: FallbackGuard::Version(host.namespace_version(builtins)),
            },
        };
        Some(CacheEntry::Global(entry))
    });
    site.finish_fill(SiteKind::Global, ticket, entry)
}
