//! Cache module for storing the raw data payload on disk
//!
//! This module provides a single-slot store that persists the last fetched
//! payload with its write time, so a restart within the expiry window skips
//! the network entirely. Corrupt entries are treated as a miss.

mod store;

pub use store::{default_cache_dir, CacheEntry, CacheStore, DEFAULT_CACHE_KEY, DEFAULT_EXPIRY_DAYS};
