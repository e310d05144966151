//! Attribute load cache.
//!
//! Every entry is guarded by the stamp of the receiver's type. The strategy
//! adds whatever else must hold for the cached answer to still be the one
//! full resolution would give.
//!
//! Strategies are picked by inspecting the host at fill time, never from
//! the resolved value itself, so results produced by a `__getattr__` hook
//! are never cached.

use core_types::{
    AttrKind, DescriptorId, MethodLookup, ObjectId, RuntimeHost, RuntimeResult, StorageShape,
    TypeAttrRef, TypeId, Value, VersionTag,
};

use crate::adaptive::{AdaptivePolicy, SiteKind};
use crate::record::{CacheEntry, CallSiteCache, FillOutcome};

/// Where an instance-value entry re-reads its answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    /// Entry index in the instance's generic dict
    Instance {
        /// Entry index
        index: u32,
    },
    /// Attribute of the receiver's type
    Type(TypeAttrRef),
}

/// How a cached attribute is produced on a hit.
///
/// Entries hold handles into host tables, never values; a hit re-reads the
/// handle once every guard has matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrStrategy {
    /// Value guarded by the instance dict stamp ([`VersionTag::UNSET`] for
    /// instances without a dict)
    InstanceValue {
        /// Where the value lives
        source: ValueSource,
        /// Instance dict stamp at fill time
        dict_version: VersionTag,
    },
    /// Position in the shared key table of a split instance
    SplitIndex {
        /// Position of the name
        index: u32,
        /// Key table stamp at fill time
        keys_version: VersionTag,
    },
    /// Data descriptor found on the type
    DataDescriptor {
        /// Descriptor to invoke
        descr: DescriptorId,
        /// The descriptor's own type
        descr_class: TypeId,
        /// Stamp of the descriptor's type at fill time
        class_version: VersionTag,
    },
    /// Type attribute of a split instance whose key table lacks the name
    TypeValueSplit {
        /// Where the attribute lives
        attr: TypeAttrRef,
        /// Key table stamp at fill time
        keys_version: VersionTag,
    },
    /// Entry index in a generic instance dict
    ByteOffset {
        /// Dict capacity at fill time
        capacity: u32,
        /// Entry index
        index: u32,
    },
    /// Fixed slot
    SlotOffset {
        /// Slot index
        slot: u32,
    },
}

/// Attribute (or method) load payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttrEntry {
    /// Receiver type stamp at fill time
    pub type_version: VersionTag,
    /// Strategy
    pub strategy: AttrStrategy,
}

const _: () = assert!(std::mem::size_of::<AttrEntry>() <= 32);

// A function found on the type is handed out unbound to method loads and
// bound to the receiver for attribute loads.
fn type_value(value: Value, obj: ObjectId, method: bool) -> MethodLookup {
    match value {
        Value::Function(function) if method => MethodLookup {
            value: Value::Function(function),
            unbound: true,
        },
        Value::Function(function) => MethodLookup {
            value: Value::BoundMethod {
                function,
                receiver: obj,
            },
            unbound: false,
        },
        value => MethodLookup {
            value,
            unbound: false,
        },
    }
}

fn dict_version_of(storage: StorageShape) -> VersionTag {
    match storage {
        StorageShape::NoDict => VersionTag::UNSET,
        StorageShape::Split { dict_version, .. } | StorageShape::Generic { dict_version, .. } => dict_version,
    }
}

impl AttrEntry {
    /// Replays the cached lookup. `None` is a miss; `Some(Err(_))` is a
    /// descriptor getter failure, which is the program's own error.
    pub(crate) fn probe<H: RuntimeHost + ?Sized>(
        &self,
        host: &H,
        obj: &Value,
        name: &str,
        method: bool,
    ) -> Option<RuntimeResult<MethodLookup>> {
        let id = obj.as_object()?;
        let ty = host.type_of(obj)?;
        if host.type_version(ty) != self.type_version {
            return None;
        }

        let plain = |value: Value| -> Option<RuntimeResult<MethodLookup>> {
            Some(Ok(MethodLookup {
                value,
                unbound: false,
            }))
        };
        let from_type = |attr: TypeAttrRef| -> Option<RuntimeResult<MethodLookup>> {
            Some(Ok(type_value(host.type_attr_at(attr, name)?, id, method)))
        };

        match self.strategy {
            AttrStrategy::InstanceValue {
                source,
                dict_version,
            } => {
                if dict_version_of(host.instance_storage(id)) != dict_version {
                    return None;
                }
                match source {
                    ValueSource::Instance { index } => plain(host.dict_entry(id, index as usize, name)?),
                    ValueSource::Type(attr) => from_type(attr),
                }
            }
            AttrStrategy::SplitIndex {
                index,
                keys_version,
            } => match host.instance_storage(id) {
                StorageShape::Split { keys, .. } if host.keys_version(keys) == keys_version => {
                    // Stamps are never reused, so the table is the one seen at fill time.
                    debug_assert_eq!(host.keys_index(keys, name), Some(index as usize));
                    plain(host.split_value(id, index as usize)?)
                }
                _ => None,
            },
            AttrStrategy::DataDescriptor {
                descr,
                descr_class,
                class_version,
            } => {
                if host.type_version(descr_class) != class_version {
                    return None;
                }
                Some(host.descriptor_get(descr, id).map(|value| MethodLookup {
                    value,
                    unbound: false,
                }))
            }
            AttrStrategy::TypeValueSplit { attr, keys_version } => match host.instance_storage(id) {
                StorageShape::Split { keys, .. } if host.keys_version(keys) == keys_version => {
                    debug_assert!(host.keys_index(keys, name).is_none());
                    from_type(attr)
                }
                _ => None,
            },
            AttrStrategy::ByteOffset { capacity, index } => match host.instance_storage(id) {
                StorageShape::Generic { capacity: current, .. } if current == capacity as usize => {
                    plain(host.dict_entry(id, index as usize, name)?)
                }
                _ => None,
            },
            AttrStrategy::SlotOffset { slot } => plain(host.slot_value(id, slot as usize)?),
        }
    }
}

/// Picks a strategy for `name` on `obj` from the host's current state.
/// `None` when the storage shape has no cacheable form.
fn select_strategy<H: RuntimeHost + ?Sized>(
    host: &H,
    id: ObjectId,
    name: &str,
    type_attr: Option<(TypeAttrRef, AttrKind)>,
    escalated: bool,
) -> Option<AttrStrategy> {
    match type_attr.map(|(_, kind)| kind) {
        Some(AttrKind::Slot { index, .. }) => {
            return Some(AttrStrategy::SlotOffset {
                slot: u32::try_from(index).ok()?,
            });
        }
        Some(AttrKind::DataDescriptor { descr, class }) => {
            return Some(AttrStrategy::DataDescriptor {
                descr,
                descr_class: class,
                class_version: host.type_version(class),
            });
        }
        _ => {}
    }

    let attr = type_attr.map(|(attr, _)| attr);
    match host.instance_storage(id) {
        StorageShape::NoDict => attr.map(|attr| AttrStrategy::InstanceValue {
            source: ValueSource::Type(attr),
            dict_version: VersionTag::UNSET,
        }),
        StorageShape::Split { keys, dict_version } => match host.keys_index(keys, name) {
            Some(index) if host.split_value(id, index).is_some() => Some(AttrStrategy::SplitIndex {
                index: u32::try_from(index).ok()?,
                keys_version: host.keys_version(keys),
            }),
            Some(_) => attr.map(|attr| AttrStrategy::InstanceValue {
                source: ValueSource::Type(attr),
                dict_version,
            }),
            None => attr.map(|attr| AttrStrategy::TypeValueSplit {
                attr,
                keys_version: host.keys_version(keys),
            }),
        },
        StorageShape::Generic {
            dict_version,
            capacity,
        } => match host.dict_find(id, name) {
            Some(index) if escalated => Some(AttrStrategy::ByteOffset {
                capacity: u32::try_from(capacity).ok()?,
                index: u32::try_from(index).ok()?,
            }),
            Some(index) => Some(AttrStrategy::InstanceValue {
                source: ValueSource::Instance {
                    index: u32::try_from(index).ok()?,
                },
                dict_version,
            }),
            None => attr.map(|attr| AttrStrategy::InstanceValue {
                source: ValueSource::Type(attr),
                dict_version,
            }),
        },
    }
}

pub(crate) fn build_entry<H: RuntimeHost + ?Sized>(
    host: &H,
    obj: &Value,
    name: &str,
    escalated: bool,
) -> Option<AttrEntry> {
    let id = obj.as_object()?;
    let ty = host.type_of(obj)?;
    let type_version = host.type_version(ty);
    let type_attr = host
        .find_type_attr(ty, name)
        .map(|(attr, value)| (attr, host.classify_attr(&value)));

    let strategy = select_strategy(host, id, name, type_attr, escalated)?;
    Some(AttrEntry {
        type_version,
        strategy,
    })
}

pub(crate) fn fill_attr_site<H: RuntimeHost + ?Sized>(
    kind: SiteKind,
    site: &mut CallSiteCache,
    host: &H,
    obj: &Value,
    name: &str,
    policy: &AdaptivePolicy,
) -> FillOutcome {
    let ticket = site.begin_fill(kind, policy);
    let entry = ticket
        .and_then(|ticket| build_entry(host, obj, name, ticket.escalated))
        .map(CacheEntry::Attr);
    site.finish_fill(kind, ticket, entry)
}

/// Returns the cached attribute, or `None` on a miss.
pub fn try_cached_attr<H: RuntimeHost + ?Sized>(
    site: &mut CallSiteCache,
    host: &H,
    obj: &Value,
    name: &str,
) -> Option<RuntimeResult<Value>> {
    let CacheEntry::Attr(entry) = &site.entry else {
        return None;
    };
    let result = entry.probe(host, obj, name, false)?;
    site.hit();
    Some(result.map(|lookup| lookup.value))
}

/// Records a successful full attribute resolution of `name` on `obj`.
///
/// Call right after resolution, before anything else mutates the host.
pub fn fill_attr<H: RuntimeHost + ?Sized>(
    site: &mut CallSiteCache,
    host: &H,
    obj: &Value,
    name: &str,
    policy: &AdaptivePolicy,
) -> FillOutcome {
    fill_attr_site(SiteKind::LoadAttr, site, host, obj, name, policy)
}
