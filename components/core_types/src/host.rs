//! Capabilities the inline caches consume from the surrounding runtime.
//!
//! The caches never walk a type hierarchy or probe a hash table themselves.
//! They read version stamps and a few layout facts through [`RuntimeHost`],
//! and delegate every miss to the full-resolution entry points.

use crate::{
    DescriptorId, FunctionId, KeysId, NamespaceId, ObjectId, RuntimeResult, TypeId, Value,
    VersionTag,
};

/// Where a global name was found by full resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalOrigin {
    /// Primary (module) namespace, at this entry index of its table
    Primary {
        /// Entry index inside the namespace table
        index: usize,
    },
    /// Fallback (builtins) namespace, at this entry index of its table
    Fallback {
        /// Entry index inside the namespace table
        index: usize,
    },
}

/// Position of an attribute in the own dict of a type on some MRO.
///
/// A handle, not a value: it is re-read through
/// [`RuntimeHost::type_attr_at`] and only meaningful while the stamp of the
/// type it was found through is unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeAttrRef {
    /// Type whose own dict holds the attribute
    pub owner: TypeId,
    /// Entry index in that dict
    pub index: u32,
}

/// Outcome of a full global lookup
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalLookup {
    /// The bound value
    pub value: Value,
    /// Which namespace held it
    pub origin: GlobalOrigin,
}

/// Outcome of a full method lookup
#[derive(Debug, Clone, PartialEq)]
pub struct MethodLookup {
    /// Resolved callable
    pub value: Value,
    /// True when `value` is a plain function that must receive the
    /// receiver as its first argument
    pub unbound: bool,
}

/// How an attribute found on a type behaves under the descriptor protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrKind {
    /// Ordinary value, returned as is
    Plain,
    /// Function; bound to the receiver on attribute access
    Method(FunctionId),
    /// Computed data descriptor (takes precedence over the instance dict)
    DataDescriptor {
        /// The descriptor object
        descr: DescriptorId,
        /// The descriptor's own type
        class: TypeId,
    },
    /// Fixed slot member declared by the type
    Slot {
        /// The member descriptor
        descr: DescriptorId,
        /// Slot index in the instance's slot array
        index: usize,
    },
}

/// Storage shape of an instance's attribute dict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageShape {
    /// Instance has no dict (fixed slots only)
    NoDict,
    /// Values array over a shared key table
    Split {
        /// The shared key table
        keys: KeysId,
        /// Stamp of this instance's dict
        dict_version: VersionTag,
    },
    /// Private hash table
    Generic {
        /// Stamp of this instance's dict
        dict_version: VersionTag,
        /// Number of buckets in the table
        capacity: usize,
    },
}

/// Runtime capabilities used by the caches.
///
/// Introspection methods must be cheap: each is O(1) or a single hash probe.
pub trait RuntimeHost {
    /// Current stamp of a namespace
    fn namespace_version(&self, ns: NamespaceId) -> VersionTag;
    /// Bucket count of a namespace table
    fn namespace_capacity(&self, ns: NamespaceId) -> usize;
    /// Value at `index` of the namespace entry array if that entry still
    /// holds `name`
    fn namespace_entry(&self, ns: NamespaceId, index: usize, name: &str) -> Option<Value>;

    /// Type of a value, when it is an instance
    fn type_of(&self, value: &Value) -> Option<TypeId>;
    /// Current stamp of a type
    fn type_version(&self, ty: TypeId) -> VersionTag;
    /// Attribute lookup along the type's MRO, without descriptor calls
    fn lookup_type_attr(&self, ty: TypeId, name: &str) -> Option<Value>;
    /// Like [`RuntimeHost::lookup_type_attr`], also reporting where the
    /// attribute lives
    fn find_type_attr(&self, ty: TypeId, name: &str) -> Option<(TypeAttrRef, Value)>;
    /// Value behind `attr` if that entry still holds `name`
    fn type_attr_at(&self, attr: TypeAttrRef, name: &str) -> Option<Value>;
    /// Descriptor classification of a type attribute
    fn classify_attr(&self, attr: &Value) -> AttrKind;
    /// Invoke a data descriptor's getter for `obj`
    fn descriptor_get(&self, descr: DescriptorId, obj: ObjectId) -> RuntimeResult<Value>;

    /// Storage shape of an instance's dict
    fn instance_storage(&self, obj: ObjectId) -> StorageShape;
    /// Current stamp of a shared key table
    fn keys_version(&self, keys: KeysId) -> VersionTag;
    /// Position of `name` in a shared key table
    fn keys_index(&self, keys: KeysId, name: &str) -> Option<usize>;
    /// Value at `index` of a split instance's values array
    fn split_value(&self, obj: ObjectId, index: usize) -> Option<Value>;
    /// Overwrite an existing value of a split instance; false if absent
    fn split_replace(&mut self, obj: ObjectId, index: usize, value: Value) -> bool;
    /// Entry index of `name` in a generic instance dict
    fn dict_find(&self, obj: ObjectId, name: &str) -> Option<usize>;
    /// Value at `index` of a generic instance dict if it still holds `name`
    fn dict_entry(&self, obj: ObjectId, index: usize, name: &str) -> Option<Value>;
    /// Value of a fixed slot, `None` when unset
    fn slot_value(&self, obj: ObjectId, slot: usize) -> Option<Value>;

    /// Full two-namespace global lookup
    fn resolve_global(
        &self,
        name: &str,
        globals: NamespaceId,
        builtins: NamespaceId,
    ) -> RuntimeResult<GlobalLookup>;
    /// Full attribute resolution
    fn resolve_attribute(&self, obj: &Value, name: &str) -> RuntimeResult<Value>;
    /// Full method resolution with unbound detection
    fn resolve_method(&self, obj: &Value, name: &str) -> RuntimeResult<MethodLookup>;
    /// Full attribute store; may extend a shared layout
    fn store_attribute(&mut self, obj: &Value, name: &str, value: Value) -> RuntimeResult<()>;
}
