//! In-memory snapshot caching.
//!
//! This module provides the `SnapshotCache` for holding the most recently
//! fetched value per key. Each entry carries its own expiry; expired entries
//! are swept lazily by the owning manager before reads, so there is no
//! background timer.

pub mod snapshot;

pub use snapshot::{CacheEntry, SnapshotCache};
