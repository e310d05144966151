//! Runtime value representation.
//!
//! Values are small and cheap to clone. Heap entities (instances, types,
//! functions, descriptors) are referenced by id, never owned, so a value
//! held by a cache entry is a non-owning reference into the heap.

use std::fmt;
use std::sync::Arc;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl $name {
            /// Index of the entity in its heap table
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

entity_id!(
    /// Identifies an instance object on the heap
    ObjectId
);
entity_id!(
    /// Identifies a type object on the heap
    TypeId
);
entity_id!(
    /// Identifies a function object on the heap
    FunctionId
);
entity_id!(
    /// Identifies a descriptor (property or slot member) on the heap
    DescriptorId
);
entity_id!(
    /// Identifies a namespace (globals, builtins, or a detached dict)
    NamespaceId
);
entity_id!(
    /// Identifies a shared split-layout key table
    KeysId
);

/// Represents any runtime value.
///
/// # Examples
///
/// ```
/// use core_types::{ObjectId, Value};
///
/// let n = Value::Int(42);
/// let obj = Value::Object(ObjectId(0));
///
/// assert!(n.is_truthy());
/// assert_eq!(obj.as_object(), Some(ObjectId(0)));
/// assert_eq!(Value::str("x"), Value::str("x"));
/// ```
#[derive(Debug, Clone)]
pub enum Value {
    /// The none singleton
    None,
    /// Boolean
    Bool(bool),
    /// Machine integer
    Int(i64),
    /// Double-precision float
    Float(f64),
    /// Immutable string
    Str(Arc<str>),
    /// Instance object
    Object(ObjectId),
    /// Type object
    Type(TypeId),
    /// Plain function (a method descriptor when stored on a type)
    Function(FunctionId),
    /// Function bound to a receiver
    BoundMethod {
        /// The underlying function
        function: FunctionId,
        /// The receiver passed as first argument
        receiver: ObjectId,
    },
    /// Data descriptor object
    Descriptor(DescriptorId),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            // Bitwise so that NaN compares equal to itself when checking
            // cached results against uncached ones.
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Type(a), Value::Type(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => a == b,
            (
                Value::BoundMethod {
                    function: fa,
                    receiver: ra,
                },
                Value::BoundMethod {
                    function: fb,
                    receiver: rb,
                },
            ) => fa == fb && ra == rb,
            (Value::Descriptor(a), Value::Descriptor(b)) => a == b,
            _ => false,
        }
    }
}

impl Value {
    /// Build a string value
    pub fn str(s: &str) -> Self {
        Value::Str(Arc::from(s))
    }

    /// Returns the object id if this value is an instance
    pub fn as_object(&self) -> Option<ObjectId> {
        match self {
            Value::Object(id) => Some(*id),
            _ => None,
        }
    }

    /// Returns the function id if this value is a plain function
    pub fn as_function(&self) -> Option<FunctionId> {
        match self {
            Value::Function(id) => Some(*id),
            _ => None,
        }
    }

    /// Truthiness
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(n) => *n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
            Value::Object(_)
            | Value::Type(_)
            | Value::Function(_)
            | Value::BoundMethod { .. }
            | Value::Descriptor(_) => true,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Bool(b) => write!(f, "{}", if *b { "True" } else { "False" }),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", n),
            Value::Str(s) => write!(f, "{}", s),
            Value::Object(id) => write!(f, "<object #{}>", id.0),
            Value::Type(id) => write!(f, "<type #{}>", id.0),
            Value::Function(id) => write!(f, "<function #{}>", id.0),
            Value::BoundMethod { function, receiver } => {
                write!(f, "<bound method #{} of object #{}>", function.0, receiver.0)
            }
            Value::Descriptor(id) => write!(f, "<descriptor #{}>", id.0),
        }
    }
}
