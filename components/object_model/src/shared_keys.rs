//! Shared key tables for split-layout instance dicts.
//!
//! Instances of one type share a single append-only key table and each
//! instance stores only a values array, so sibling instances resolve an
//! attribute name to the same index.

use std::sync::Arc;

use core_types::VersionTag;

/// Largest number of keys a shared table may hold
pub const MAX_SHARED_KEYS: usize = 30;

/// Append-only key-to-index table shared by all instances of a type.
///
/// # Example
///
/// ```
/// use object_model::SharedKeys;
///
/// let mut keys = SharedKeys::new();
/// let before = keys.version();
/// assert_eq!(keys.append("x"), Some(0));
/// assert_eq!(keys.append("y"), Some(1));
///
/// assert_eq!(keys.index_of("y"), Some(1));
/// assert!(keys.version() > before);
/// ```
#[derive(Debug, Clone)]
pub struct SharedKeys {
    keys: Vec<Arc<str>>,
    version: VersionTag,
}

impl SharedKeys {
    /// Creates an empty key table.
    pub fn new() -> Self {
        SharedKeys {
            keys: Vec::new(),
            version: VersionTag::next(),
        }
    }

    /// Current stamp; changes on every append
    pub fn version(&self) -> VersionTag {
        self.version
    }

    /// Position of `name`
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.keys.iter().position(|k| k.as_ref() == name)
    }

    /// Key at `index`
    pub fn key(&self, index: usize) -> Option<&str> {
        self.keys.get(index).map(|k| k.as_ref())
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the table has no keys
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Whether another key can be appended
    pub fn is_full(&self) -> bool {
        self.keys.len() >= MAX_SHARED_KEYS
    }

    /// Appends `name`, returning its index, or `None` if the table is full.
    ///
    /// Callers must check that `name` is absent.
    pub fn append(&mut self, name: &str) -> Option<usize> {
        debug_assert!(self.index_of(name).is_none());
        if self.is_full() {
            return None;
        }
        self.keys.push(Arc::from(name));
        self.version = VersionTag::next();
        Some(self.keys.len() - 1)
    }
}

impl Default for SharedKeys {
    fn default() -> Self {
        Self::new()
    }
}
