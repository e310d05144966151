//! Opcache - per-call-site inline caches for global, attribute and method
//! lookups and attribute stores
//!
//! This component provides:
//! - Global resolution cache (value form and table-index form)
//! - Attribute load cache with six strategies guarded by version stamps
//! - Method load cache returning unshadowed functions unbound
//! - Attribute store cache for split layouts
//! - An adaptive state machine that switches or disables failing sites
//! - Per-code-unit tables, lazily activated, plus a thread-shared variant
//!
//! The caches read the runtime only through [`core_types::RuntimeHost`].
//! A hit always equals what full resolution would return at that moment.
//!
//! # Examples
//!
//! ```
//! use opcache::{CacheConfig, CodeCaches, StrategyTag};
//! use object_model::Heap;
//!
//! let mut heap = Heap::new();
//! let globals = heap.new_namespace();
//! let builtins = heap.new_namespace();
//! heap.set_name(globals, "x", core_types::Value::Int(1));
//!
//! let mut caches = CodeCaches::new(1, CacheConfig::eager());
//! assert_eq!(caches.load_global(0, &heap, "x", globals, builtins).unwrap(), core_types::Value::Int(1));
//! assert_eq!(caches.site(0).unwrap().strategy(), StrategyTag::GlobalValue);
//! assert_eq!(caches.load_global(0, &heap, "x", globals, builtins).unwrap(), core_types::Value::Int(1));
//! assert_eq!(caches.stats().global.hits, 1);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod adaptive;
pub mod attr;
pub mod config;
pub mod global;
pub mod method;
mod ops;
pub mod record;
pub mod shared;
pub mod stats;
pub mod store;
pub mod table;

pub use adaptive::{transition, AdaptivePolicy, AdaptiveState, MissAction, SiteKind, SiteState};
pub use attr::{fill_attr, try_cached_attr, AttrEntry, AttrStrategy};
pub use config::{CacheConfig, ConfigError};
pub use global::{fill_global, try_cached_global, FallbackGuard, GlobalEntry};
pub use method::{fill_method, try_cached_method};
pub use record::{CacheEntry, CallSiteCache, FillOutcome, StrategyTag};
pub use shared::{SharedCodeCaches, SharedStats};
pub use stats::{CacheStats, KindStats};
pub use store::{fill_store, try_cached_store, StoreEntry};
pub use table::CodeCaches;
