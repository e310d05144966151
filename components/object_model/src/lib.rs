//! Object Model - the runtime the inline caches run against
//!
//! This component provides:
//! - Versioned hash-table namespaces (globals, builtins, dicts)
//! - Shared split-layout key tables
//! - Type objects with C3 MRO, functions, properties and slot members
//! - Instances with split, generic or no attribute dicts
//! - Full resolution of globals, attributes and methods, and attribute stores
//! - A [`core_types::RuntimeHost`] implementation over the [`Heap`]

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod heap;
mod host;
pub mod namespace;
pub mod object;
pub mod shared_keys;
pub mod types;

// Re-export main types
pub use heap::{Heap, GETATTR_HOOK};
pub use namespace::Namespace;
pub use object::{Instance, InstanceDict};
pub use shared_keys::{SharedKeys, MAX_SHARED_KEYS};
pub use types::{Descriptor, DescriptorKind, Function, NativeFn, TypeObject, TypeSpec};
