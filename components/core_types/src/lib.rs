//! Core value types, version stamps and the runtime host interface.
//!
//! This crate provides the foundational types shared by the object model
//! and the inline caches.
//!
//! # Overview
//!
//! - [`Value`] - Runtime values; heap entities are referenced by id
//! - [`VersionTag`] - Monotonic stamps attached to mutable structures
//! - [`RuntimeError`] - Errors observable by the running program
//! - [`RuntimeHost`] - What the caches need from the runtime
//!
//! # Examples
//!
//! ```
//! use core_types::{RuntimeError, Value, VersionTag};
//!
//! let v = Value::Int(42);
//! assert!(v.is_truthy());
//!
//! let before = VersionTag::next();
//! assert!(VersionTag::next() > before);
//!
//! let err = RuntimeError::attribute_error("Point", "z");
//! assert!(err.to_string().contains("no attribute"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod error;
mod host;
mod value;
mod version;

pub use error::{RuntimeError, RuntimeResult};
pub use host::{
    AttrKind, GlobalLookup, GlobalOrigin, MethodLookup, RuntimeHost, StorageShape, TypeAttrRef,
};
pub use value::{DescriptorId, FunctionId, KeysId, NamespaceId, ObjectId, TypeId, Value};
pub use version::VersionTag;
