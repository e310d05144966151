//! Program-level runtime errors.
//!
//! These are raised by full resolution. The cache layer passes them through
//! untouched; it never manufactures one of its own.

use thiserror::Error;

/// An error observable by the running program.
///
/// # Examples
///
/// ```
/// use core_types::RuntimeError;
///
/// let err = RuntimeError::name_error("x");
/// assert_eq!(err.to_string(), "name 'x' is not defined");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// Global name not bound in either namespace
    #[error("name '{name}' is not defined")]
    NameError {
        /// The unresolved name
        name: String,
    },
    /// Attribute absent on the object and its type
    #[error("'{type_name}' object has no attribute '{name}'")]
    AttributeError {
        /// Name of the receiver's type
        type_name: String,
        /// The unresolved attribute
        name: String,
    },
    /// Write to a read-only data descriptor
    #[error("can't set attribute '{name}'")]
    ReadOnlyAttribute {
        /// The attribute written to
        name: String,
    },
    /// Operation applied to a value of the wrong kind
    #[error("{message}")]
    TypeError {
        /// Human-readable message
        message: String,
    },
}

impl RuntimeError {
    /// `NameError` for `name`
    pub fn name_error(name: &str) -> Self {
        RuntimeError::NameError {
            name: name.to_string(),
        }
    }

    /// `AttributeError` for `name` on an object of type `type_name`
    pub fn attribute_error(type_name: &str, name: &str) -> Self {
        RuntimeError::AttributeError {
            type_name: type_name.to_string(),
            name: name.to_string(),
        }
    }

    /// `TypeError` with a message
    pub fn type_error(message: impl Into<String>) -> Self {
        RuntimeError::TypeError {
            message: message.into(),
        }
    }
}

/// Result alias for runtime operations
pub type RuntimeResult<T> = Result<T, RuntimeError>;
