//! Versioned hash-table namespaces.
//!
//! Used for globals, builtins, type dicts and generic instance dicts. The
//! table keeps entries in insertion order behind an open-addressing bucket
//! array, so an entry index stays stable until the table is resized. Every
//! write takes a fresh version stamp.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use ahash::AHasher;
use core_types::{Value, VersionTag};

/// Smallest bucket count of a table
pub const MIN_CAPACITY: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bucket {
    Empty,
    Dummy,
    Entry(u32),
}

#[derive(Debug, Clone)]
struct Entry {
    key: Option<Arc<str>>,
    hash: u64,
    value: Option<Value>,
}

fn hash_name(name: &str) -> u64 {
    let mut hasher = AHasher::default();
    name.hash(&mut hasher);
    hasher.finish()
}

fn usable(capacity: usize) -> usize {
    capacity * 2 / 3
}

/// Name-to-value table with a version stamp.
///
/// # Example
///
/// ```
/// use core_types::Value;
/// use object_model::Namespace;
///
/// let mut ns = Namespace::new();
/// let before = ns.version();
/// ns.insert("x", Value::Int(1));
///
/// assert!(ns.version() > before);
/// assert_eq!(ns.get("x"), Some(&Value::Int(1)));
/// let (index, _) = ns.find("x").unwrap();
/// assert_eq!(ns.entry_at(index, "x"), Some(&Value::Int(1)));
/// ```
#[derive(Debug, Clone)]
pub struct Namespace {
    buckets: Vec<Bucket>,
    entries: Vec<Entry>,
    len: usize,
    version: VersionTag,
}

impl Namespace {
    /// Creates an empty namespace with the minimum capacity.
    pub fn new() -> Self {
        Self::with_capacity(MIN_CAPACITY)
    }

    fn with_capacity(capacity: usize) -> Self {
        debug_assert!(capacity.is_power_of_two());
        Namespace {
            buckets: vec![Bucket::Empty; capacity],
            entries: Vec::with_capacity(usable(capacity)),
            len: 0,
            version: VersionTag::next(),
        }
    }

    /// Current version stamp
    pub fn version(&self) -> VersionTag {
        self.version
    }

    /// Number of buckets
    pub fn capacity(&self) -> usize {
        self.buckets.len()
    }

    /// Number of live names
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether no names are bound
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn probe(&self, name: &str, hash: u64) -> Option<usize> {
        let mask = self.buckets.len() - 1;
        let mut i = hash as usize & mask;
        for _ in 0..self.buckets.len() {
            match self.buckets[i] {
                Bucket::Empty => return None,
                Bucket::Dummy => {}
                Bucket::Entry(e) => {
                    let entry = &self.entries[e as usize];
                    if entry.hash == hash && entry.key.as_deref() == Some(name) {
                        return Some(i);
                    }
                }
            }
            i = (i + 1) & mask;
        }
        None
    }

    fn free_bucket(&self, hash: u64) -> usize {
        let mask = self.buckets.len() - 1;
        let mut i = hash as usize & mask;
        while let Bucket::Entry(_) = self.buckets[i] {
            i = (i + 1) & mask;
        }
        i
    }

    /// Looks up `name`, returning its entry index and value.
    pub fn find(&self, name: &str) -> Option<(usize, &Value)> {
        let bucket = self.probe(name, hash_name(name))?;
        match self.buckets[bucket] {
            Bucket::Entry(e) => {
                let e = e as usize;
                self.entries[e].value.as_ref().map(|v| (e, v))
            }
            _ => None,
        }
    }

    /// Looks up `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.find(name).map(|(_, v)| v)
    }

    /// Whether `name` is bound
    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Value at entry `index`, only if that entry still holds `name`.
    pub fn entry_at(&self, index: usize, name: &str) -> Option<&Value> {
        let entry = self.entries.get(index)?;
        if entry.key.as_deref() != Some(name) {
            return None;
        }
        entry.value.as_ref()
    }

    /// Binds `name`, returning the entry index it now occupies.
    pub fn insert(&mut self, name: &str, value: Value) -> usize {
        let hash = hash_name(name);
        self.version = VersionTag::next();

        if let Some(bucket) = self.probe(name, hash) {
            if let Bucket::Entry(e) = self.buckets[bucket] {
                self.entries[e as usize].value = Some(value);
                return e as usize;
            }
        }

        if self.entries.len() >= usable(self.buckets.len()) {
            self.resize();
        }

        let index = self.entries.len();
        let bucket = self.free_bucket(hash);
        self.entries.push(Entry {
            key: Some(Arc::from(name)),
            hash,
            value: Some(value),
        });
        self.buckets[bucket] = Bucket::Entry(index as u32);
        self.len += 1;
        index
    }

    /// Unbinds `name`, returning the old value.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let bucket = self.probe(name, hash_name(name))?;
        let Bucket::Entry(e) = self.buckets[bucket] else {
            return None;
        };
        self.buckets[bucket] = Bucket::Dummy;
        let entry = &mut self.entries[e as usize];
        entry.key = None;
        self.len -= 1;
        self.version = VersionTag::next();
        entry.value.take()
    }

    /// Live bindings in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().filter_map(|e| match (&e.key, &e.value) {
            (Some(k), Some(v)) => Some((k.as_ref(), v)),
            _ => None,
        })
    }

    // Compacts entries into a table sized for three times the live count.
    // Entry indices change.
    fn resize(&mut self) {
        let mut capacity = (self.len * 3).next_power_of_two().max(MIN_CAPACITY);
        while usable(capacity) <= self.len {
            capacity *= 2;
        }

        let live: Vec<Entry> = self
            .entries
            .drain(..)
            .filter(|e| e.key.is_some() && e.value.is_some())
            .collect();

        self.buckets = vec![Bucket::Empty; capacity];
        self.entries = Vec::with_capacity(usable(capacity));
        for entry in live {
            let bucket = self.free_bucket(entry.hash);
            self.buckets[bucket] = Bucket::Entry(self.entries.len() as u32);
            self.entries.push(entry);
        }
    }
}

impl Default for Namespace {
    fn default() -> Self {
        Self::new()
    }
}
