//! # Two-tier response cache
//!
//! Time-bounded caching that keeps the pipeline from calling the weather
//! provider or the insight generator more often than it needs to.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`TtlCache`] | Mutex-guarded key → value map with per-entry expiry and lazy eviction |
//! | [`CacheTier`] | A named `TtlCache` with a fixed TTL, hit/miss counters and a single-flight gate |
//! | [`CacheKey`] | Deterministic keys: `weather:{city}:{units}` and `insight:{city}:{hash}` |
//! | [`CacheStats`] | `{ size, keys }` snapshot reported by `/cache/stats` |
//!
//! ## Example
//!
//! ```rust
//! use std::time::Duration;
//! use weather_insights::cache::TtlCache;
//!
//! let cache = TtlCache::new();
//! cache.set("weather:london:metric", 15.2_f64, Duration::from_secs(600));
//! assert_eq!(cache.get("weather:london:metric"), Some(15.2));
//! assert_eq!(cache.stats().size, 1);
//! ```
//!
//! The two tiers are independent: evicting or refetching a weather entry
//! never touches the insight tier, and vice versa.

mod backend;
mod key;
mod manager;

pub use backend::{CacheStats, TtlCache};
pub use key::{normalize_city, stable_hash, CacheKey, HashFields};
pub use manager::{CacheConfig, CacheCounters, CacheTier};
