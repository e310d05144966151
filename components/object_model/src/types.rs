//! Type objects, functions and descriptors.

use std::fmt;
use std::sync::Arc;

use core_types::{FunctionId, KeysId, RuntimeResult, TypeId, Value, VersionTag};

use crate::{Heap, Namespace};

/// Native function body: receives the heap and the positional arguments
pub type NativeFn = Arc<dyn Fn(&Heap, &[Value]) -> RuntimeResult<Value> + Send + Sync>;

/// Callable stored on the heap
#[derive(Clone)]
pub struct Function {
    /// Function name
    pub name: Arc<str>,
    /// Implementation
    pub body: NativeFn,
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function").field("name", &self.name).finish()
    }
}

/// Behavior of a data descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptorKind {
    /// Read-only computed attribute; the getter receives the instance
    Property {
        /// Getter function
        getter: FunctionId,
    },
    /// Fixed slot declared by a type
    Member {
        /// Slot name
        name: Arc<str>,
        /// Index into the instance's slot array
        slot: usize,
    },
}

/// Data descriptor object
#[derive(Debug, Clone)]
pub struct Descriptor {
    /// What the descriptor does
    pub kind: DescriptorKind,
    /// The descriptor's own type
    pub class: TypeId,
}

/// Options for creating a type
#[derive(Debug, Clone)]
pub struct TypeSpec {
    /// Fixed slot names declared by this type
    pub slots: Vec<String>,
    /// Whether instances carry an attribute dict
    pub instance_dict: bool,
    /// Whether instance dicts share one key table
    pub split_layout: bool,
}

impl TypeSpec {
    /// Slot-only instances, no dict
    pub fn with_slots(slots: &[&str]) -> Self {
        TypeSpec {
            slots: slots.iter().map(|s| s.to_string()).collect(),
            instance_dict: false,
            split_layout: false,
        }
    }

    /// Instances with private generic dicts
    pub fn generic_dict() -> Self {
        TypeSpec {
            split_layout: false,
            ..TypeSpec::default()
        }
    }
}

impl Default for TypeSpec {
    fn default() -> Self {
        TypeSpec {
            slots: Vec::new(),
            instance_dict: true,
            split_layout: true,
        }
    }
}

/// Type object
#[derive(Debug, Clone)]
pub struct TypeObject {
    /// Type name
    pub name: Arc<str>,
    /// Direct bases
    pub bases: Vec<TypeId>,
    /// Method resolution order, starting with the type itself
    pub mro: Vec<TypeId>,
    /// Attributes defined directly on the type
    pub dict: Namespace,
    /// Stamp; changes when this type or any type in its MRO is modified
    pub version: VersionTag,
    /// Direct subclasses
    pub subclasses: Vec<TypeId>,
    /// Shared key table for new instances, if the type still uses one
    pub shared_keys: Option<KeysId>,
    /// Total fixed slots, including inherited ones
    pub slot_count: usize,
    /// Nearest type in the MRO that declared slots (`object` if none)
    pub layout_owner: TypeId,
    /// Whether instances carry an attribute dict
    pub instance_dict: bool,
}
