//! Instance representation.
//!
//! An instance stores its attributes in one of three ways: a split dict over
//! its type's shared keys, a private generic dict, or no dict at all (fixed
//! slots only).

use core_types::{KeysId, TypeId, Value, VersionTag};

use crate::Namespace;

/// Attribute dict of an instance
#[derive(Debug, Clone)]
pub enum InstanceDict {
    /// Values for a prefix of a shared key table
    Split {
        /// The shared key table
        keys: KeysId,
        /// `values[i]` belongs to key `i`
        values: Vec<Value>,
        /// Stamp of this dict, bumped on every write
        version: VersionTag,
    },
    /// Private hash table
    Generic(Namespace),
}

impl InstanceDict {
    /// Creates an empty split dict over `keys`.
    pub fn split(keys: KeysId) -> Self {
        InstanceDict::Split {
            keys,
            values: Vec::new(),
            version: VersionTag::next(),
        }
    }

    /// Current stamp of this dict
    pub fn version(&self) -> VersionTag {
        match self {
            InstanceDict::Split { version, .. } => *version,
            InstanceDict::Generic(ns) => ns.version(),
        }
    }

    /// Whether the dict uses a shared key table
    pub fn is_split(&self) -> bool {
        matches!(self, InstanceDict::Split { .. })
    }
}

/// Instance object with dict- and slot-based attribute storage
#[derive(Debug, Clone)]
pub struct Instance {
    /// The instance's type
    pub class: TypeId,
    /// Attribute dict, absent for slot-only types
    pub dict: Option<InstanceDict>,
    /// Fixed slots declared by the type, `None` when unset
    pub slots: Vec<Option<Value>>,
}

impl Instance {
    /// Creates an instance of `class`.
    pub fn new(class: TypeId, dict: Option<InstanceDict>, slot_count: usize) -> Self {
        Instance {
            class,
            dict,
            slots: vec![None; slot_count],
        }
    }
}
