//! Per-call-site cache record.
//!
//! Every instrumented instruction owns one [`CallSiteCache`]. Its payload is
//! a tagged [`CacheEntry`] whose variant names the active strategy; the
//! adaptive bookkeeping sits next to it.

use tracing::trace;

use crate::adaptive::{AdaptivePolicy, AdaptiveState, MissAction, SiteKind, SiteState};
use crate::attr::{AttrEntry, AttrStrategy};
use crate::global::GlobalEntry;
use crate::store::StoreEntry;

/// Cached payload of a call site
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CacheEntry {
    /// Nothing cached
    #[default]
    Empty,
    /// Global name load
    Global(GlobalEntry),
    /// Attribute or method load
    Attr(AttrEntry),
    /// Attribute store into a split layout
    Store(StoreEntry),
}

/// Name of the strategy a site currently uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyTag {
    /// Nothing cached
    None,
    /// Global value with namespace stamps
    GlobalValue,
    /// Global entry index with table capacity
    GlobalIndex,
    /// Attribute value guarded by the instance dict stamp
    InstanceValue,
    /// Position in a shared key table
    SplitIndex,
    /// Data descriptor on the type
    DataDescriptor,
    /// Type attribute known to be absent from the split layout
    TypeValueSplit,
    /// Entry index in a generic instance dict
    ByteOffset,
    /// Fixed slot
    SlotOffset,
    /// Store into a split layout position
    SplitStore,
}

impl CacheEntry {
    /// Strategy tag of this payload
    pub fn strategy(&self) -> StrategyTag {
        match self {
            CacheEntry::Empty => StrategyTag::None,
            CacheEntry::Global(GlobalEntry::Value { .. }) => StrategyTag::GlobalValue,
            CacheEntry::Global(GlobalEntry::Index { .. }) => StrategyTag::GlobalIndex,
            CacheEntry::Attr(entry) => match entry.strategy {
                AttrStrategy::InstanceValue { .. } => StrategyTag::InstanceValue,
                AttrStrategy::SplitIndex { .. } => StrategyTag::SplitIndex,
                AttrStrategy::DataDescriptor { .. } => StrategyTag::DataDescriptor,
                AttrStrategy::TypeValueSplit { .. } => StrategyTag::TypeValueSplit,
                AttrStrategy::ByteOffset { .. } => StrategyTag::ByteOffset,
                AttrStrategy::SlotOffset { .. } => StrategyTag::SlotOffset,
            },
            CacheEntry::Store(_) => StrategyTag::SplitStore,
        }
    }
}

/// Result of trying to fill a site after a miss
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillOutcome {
    /// Cached with this strategy
    Filled(StrategyTag),
    /// Cached with this strategy after a mode switch
    Switched(StrategyTag),
    /// The resolved result has no cacheable form; the site keeps its state
    Uncacheable,
    /// The site is (now) disabled
    Disabled,
}

/// Fill permission handed to the per-kind fill routines
#[derive(Debug, Clone, Copy)]
pub(crate) struct FillTicket {
    /// Fill in the alternate mode
    pub escalated: bool,
    /// The miss caused a mode switch
    pub switched: bool,
}

/// Cache record for one instrumented instruction.
///
/// Entries do not store the looked-up name: a record must only ever be
/// probed with the name of the instruction it belongs to.
///
/// # Example
///
/// ```
/// use opcache::{CallSiteCache, SiteState, StrategyTag};
///
/// let site = CallSiteCache::new();
/// assert_eq!(site.state(), SiteState::Cold);
/// assert_eq!(site.strategy(), StrategyTag::None);
/// assert!(!site.is_optimized());
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CallSiteCache {
    pub(crate) entry: CacheEntry,
    pub(crate) adaptive: AdaptiveState,
}

impl CallSiteCache {
    /// Cold, empty record
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached payload
    pub fn entry(&self) -> &CacheEntry {
        &self.entry
    }

    /// Active strategy
    pub fn strategy(&self) -> StrategyTag {
        self.entry.strategy()
    }

    /// Adaptive bookkeeping
    pub fn adaptive(&self) -> &AdaptiveState {
        &self.adaptive
    }

    /// Lifecycle state
    pub fn state(&self) -> SiteState {
        self.adaptive.state()
    }

    /// Whether the site has been filled and not disabled
    pub fn is_optimized(&self) -> bool {
        self.adaptive.state() == SiteState::Optimized
    }

    /// Whether caching has been given up at this site
    pub fn is_disabled(&self) -> bool {
        self.adaptive.state() == SiteState::Disabled
    }

    /// Consecutive misses
    pub fn failure_count(&self) -> u8 {
        self.adaptive.failure_count()
    }

    pub(crate) fn hit(&mut self) {
        self.adaptive.record_hit();
    }

    /// Charges the miss to the adaptive state and returns whether (and
    /// how) the site may be filled.
    pub(crate) fn begin_fill(&mut self, kind: SiteKind, policy: &AdaptivePolicy) -> Option<FillTicket> {
        let action = self.adaptive.record_miss(kind, policy);
        if action == MissAction::Disable {
            self.entry = CacheEntry::Empty;
            return None;
        }
        Some(FillTicket {
            escalated: self.adaptive.escalated(),
            switched: action == MissAction::Switch,
        })
    }

    /// Installs a payload, or reports why none was installed.
    pub(crate) fn finish_fill(&mut self, kind: SiteKind, ticket: Option<FillTicket>, entry: Option<CacheEntry>) -> FillOutcome {
        let Some(ticket) = ticket else {
            return FillOutcome::Disabled;
        };
        match entry {
            Some(entry) => {
                let tag = entry.strategy();
                self.entry = entry;
                self.adaptive.record_fill();
                trace!(?kind, strategy = ?tag, "call site filled");
                if ticket.switched {
                    FillOutcome::Switched(tag)
                } else {
                    FillOutcome::Filled(tag)
                }
            }
            None => {
                trace!(?kind, "result not cacheable");
                FillOutcome::Uncacheable
            }
        }
    }
}
