//! Per-site adaptive state machine.
//!
//! A site starts `Cold`, becomes `Optimized` on its first successful fill
//! and counts consecutive misses from then on. Each time the failure budget
//! (`failure_threshold` misses in a row) is exhausted, [`transition`] decides
//! what the site does next. The whole decision table lives in that one
//! function.
//!
//! | kind              | mode        | budget exhausted                        |
//! |-------------------|-------------|-----------------------------------------|
//! | global            | value       | switch to index form                    |
//! | global            | index       | switch back, or disable after too many  |
//! | load attr/method  | normal      | switch to robust forms (byte offset)    |
//! | load attr/method  | escalated   | refill                                  |
//! | store attr        | -           | refill, or disable after too many       |

use tracing::debug;

/// Which instruction a call site belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SiteKind {
    /// Global name load
    Global,
    /// Attribute load
    LoadAttr,
    /// Method load for `obj.method(...)`
    LoadMethod,
    /// Attribute store
    StoreAttr,
}

/// Lifecycle state of a call site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SiteState {
    /// Never filled
    #[default]
    Cold,
    /// Holds (or has held) a cached result
    Optimized,
    /// Caching given up for the rest of the code unit's lifetime
    Disabled,
}

/// What to do after a miss at an optimized site
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissAction {
    /// Fill again in the current mode
    Refill,
    /// Flip to the alternate mode, then fill
    Switch,
    /// Stop caching at this site
    Disable,
}

/// Thresholds driving the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdaptivePolicy {
    /// Consecutive misses that exhaust a site's failure budget
    pub failure_threshold: u8,
    /// Exhausted budgets tolerated before a global index site or a store
    /// site is disabled
    pub max_switches: u8,
    /// Whether global sites may use the index form
    pub global_index_mode: bool,
}

impl Default for AdaptivePolicy {
    fn default() -> Self {
        AdaptivePolicy {
            failure_threshold: 2,
            max_switches: 4,
            global_index_mode: true,
        }
    }
}

/// Decision taken when a site's failure budget is exhausted for the
/// `rounds`-th time.
pub fn transition(kind: SiteKind, escalated: bool, rounds: u8, policy: &AdaptivePolicy) -> MissAction {
    match kind {
        SiteKind::LoadAttr | SiteKind::LoadMethod => {
            if escalated {
                MissAction::Refill
            } else {
                MissAction::Switch
            }
        }
        SiteKind::Global => {
            if !policy.global_index_mode {
                MissAction::Refill
            } else if escalated && rounds > policy.max_switches {
                MissAction::Disable
            } else {
                MissAction::Switch
            }
        }
        SiteKind::StoreAttr => {
            if rounds > policy.max_switches {
                MissAction::Disable
            } else {
                MissAction::Refill
            }
        }
    }
}

/// Adaptive bookkeeping carried by every call-site record.
///
/// Misses are counted in rounds. When `failure_count` reaches the policy
/// threshold the round ends: `rounds` goes up by one, the transition is
/// applied and the count restarts from zero. A site therefore needs a full
/// threshold of fresh misses after a switch before it can switch again.
///
/// # Example
///
/// ```
/// use opcache::{AdaptivePolicy, AdaptiveState, MissAction, SiteKind, SiteState};
///
/// let policy = AdaptivePolicy::default();
/// let mut state = AdaptiveState::new();
/// state.record_fill();
/// assert_eq!(state.state(), SiteState::Optimized);
///
/// assert_eq!(state.record_miss(SiteKind::LoadAttr, &policy), MissAction::Refill);
/// assert_eq!(state.record_miss(SiteKind::LoadAttr, &policy), MissAction::Switch);
/// assert!(state.escalated());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AdaptiveState {
    state: SiteState,
    failure_count: u8,
    rounds: u8,
    escalated: bool,
}

impl AdaptiveState {
    /// Cold site
    pub fn new() -> Self {
        Self::default()
    }

    /// Current lifecycle state
    pub fn state(&self) -> SiteState {
        self.state
    }

    /// Consecutive misses since the last hit or exhausted budget
    pub fn failure_count(&self) -> u8 {
        self.failure_count
    }

    /// Number of exhausted failure budgets
    pub fn rounds(&self) -> u8 {
        self.rounds
    }

    /// Whether the site runs in its alternate mode (index form for globals,
    /// robust forms for attribute loads)
    pub fn escalated(&self) -> bool {
        self.escalated
    }

    /// A hit clears the failure count.
    pub fn record_hit(&mut self) {
        self.failure_count = 0;
    }

    /// A successful fill makes a cold site optimized.
    pub fn record_fill(&mut self) {
        if self.state == SiteState::Cold {
            self.state = SiteState::Optimized;
        }
    }

    /// Counts a miss at an optimized site and applies the transition.
    ///
    /// Cold sites are not charged: their misses are just first fills.
    pub fn record_miss(&mut self, kind: SiteKind, policy: &AdaptivePolicy) -> MissAction {
        match self.state {
            SiteState::Disabled => return MissAction::Disable,
            SiteState::Cold => return MissAction::Refill,
            SiteState::Optimized => {}
        }

        self.failure_count = self.failure_count.saturating_add(1);
        if self.failure_count < policy.failure_threshold.max(1) {
            return MissAction::Refill;
        }

        self.failure_count = 0;
        self.rounds = self.rounds.saturating_add(1);
        let action = transition(kind, self.escalated, self.rounds, policy);
        match action {
            MissAction::Refill => {}
            MissAction::Switch => {
                self.escalated = !self.escalated;
                debug!(?kind, escalated = self.escalated, rounds = self.rounds, "call site switched strategy");
            }
            MissAction::Disable => {
                self.state = SiteState::Disabled;
                debug!(?kind, rounds = self.rounds, "call site disabled");
            }
        }
        action
    }
}
