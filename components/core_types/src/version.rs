//! Version stamps for mutable runtime structures.
//!
//! Every namespace, type, shared key table and instance dict carries a
//! stamp. Owners take a fresh stamp from the process-wide allocator on
//! each structural change, so two equal observations certify that no
//! change happened in between. Stamps are unique across all owners.

use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_VERSION: AtomicU64 = AtomicU64::new(1);

/// Generation counter attached to a mutable structure.
///
/// # Examples
///
/// ```
/// use core_types::VersionTag;
///
/// let a = VersionTag::next();
/// let b = VersionTag::next();
/// assert!(b > a);
/// assert!(a.is_valid());
/// assert!(!VersionTag::UNSET.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VersionTag(u64);

impl VersionTag {
    /// Never handed out by the allocator
    pub const UNSET: VersionTag = VersionTag(0);

    /// Allocate a fresh stamp, strictly greater than every stamp before it
    pub fn next() -> Self {
        // AcqRel pairs the stamp with the structural update published
        // alongside it.
        let raw = NEXT_VERSION.fetch_add(1, Ordering::AcqRel);
        debug_assert!(raw != u64::MAX, "version stamp allocator wrapped");
        VersionTag(raw)
    }

    /// Whether this stamp came from the allocator
    pub fn is_valid(self) -> bool {
        self.0 != 0
    }

    /// Raw counter value
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl Default for VersionTag {
    fn default() -> Self {
        VersionTag::next()
    }
}
