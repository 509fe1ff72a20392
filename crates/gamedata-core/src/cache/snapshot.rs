use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::clock::{Clock, SystemClock};

#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub cached_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl<V> CacheEntry<V> {
    fn new(value: V, now: DateTime<Utc>, ttl: Duration) -> Self {
        // Durations past chrono's range saturate to "never expires"
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self {
            value,
            cached_at: now,
            expires_at,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    pub fn age_minutes(&self, now: DateTime<Utc>) -> i64 {
        (now - self.cached_at).num_minutes()
    }

    pub fn age_display(&self, now: DateTime<Utc>) -> String {
        let minutes = self.age_minutes(now);
        if minutes < 1 {
            // Also covers clock skew
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            let hours = minutes / 60;
            if minutes % 60 >= 30 {
                format!("{}h ago", hours + 1)
            } else {
                format!("{}h ago", hours)
            }
        } else {
            let days = minutes / 1440;
            if (minutes % 1440) / 60 >= 12 {
                format!("{}d ago", days + 1)
            } else {
                format!("{}d ago", days)
            }
        }
    }
}

/// Keyed store of the most recently fetched value per key, with expiry.
///
/// None of the operations fail: a missing or expired key is simply absent.
pub struct SnapshotCache<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    clock: Arc<dyn Clock>,
}

impl<K, V> SnapshotCache<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: HashMap::new(),
            clock,
        }
    }

    /// Fresh value for `key`, if any.
    pub fn get(&self, key: &K) -> Option<&V> {
        self.entry(key).map(|entry| &entry.value)
    }

    /// Fresh entry for `key`, including its timestamps.
    pub fn entry(&self, key: &K) -> Option<&CacheEntry<V>> {
        let now = self.clock.now();
        self.entries
            .get(key)
            .filter(|entry| !entry.is_expired(now))
    }

    pub fn put(&mut self, key: K, value: V, ttl: Duration) {
        let entry = CacheEntry::new(value, self.clock.now(), ttl);
        self.entries.insert(key, entry);
    }

    pub fn has(&self, key: &K) -> bool {
        self.entry(key).is_some()
    }

    /// Remove every expired entry. Returns how many were removed.
    pub fn evict_expired(&mut self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        let evicted = before - self.entries.len();
        if evicted > 0 {
            debug!(evicted = evicted, remaining = self.entries.len(), "Evicted expired cache entries");
        }
        evicted
    }

    /// Drop the entry for `key` regardless of freshness.
    pub fn invalidate(&mut self, key: &K) -> Option<V> {
        self.entries.remove(key).map(|entry| entry.value)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

impl<K: Eq + Hash, V> Default for SnapshotCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn cache_with_clock() -> (SnapshotCache<u64, &'static str>, ManualClock) {
        let clock = ManualClock::default();
        let cache = SnapshotCache::with_clock(Arc::new(clock.clone()));
        (cache, clock)
    }

    #[test]
    fn test_put_then_get_within_ttl() {
        let (mut cache, clock) = cache_with_clock();
        cache.put(1, "one", Duration::from_secs(60));

        assert_eq!(cache.get(&1), Some(&"one"));
        assert!(cache.has(&1));

        clock.advance(chrono::Duration::seconds(59));
        assert_eq!(cache.get(&1), Some(&"one"));
    }

    #[test]
    fn test_expired_entry_is_absent() {
        let (mut cache, clock) = cache_with_clock();
        cache.put(1, "one", Duration::from_secs(60));

        clock.advance(chrono::Duration::seconds(61));
        assert_eq!(cache.get(&1), None);
        assert!(!cache.has(&1));
        // Still stored until swept
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_evict_expired_is_idempotent() {
        let (mut cache, clock) = cache_with_clock();
        cache.put(1, "short", Duration::from_secs(10));
        cache.put(2, "long", Duration::from_secs(600));

        clock.advance(chrono::Duration::seconds(11));
        assert_eq!(cache.evict_expired(), 1);
        assert_eq!(cache.evict_expired(), 0);
        assert_eq!(cache.len(), 1);
        assert!(cache.has(&2));
    }

    #[test]
    fn test_put_overwrites_and_resets_expiry() {
        let (mut cache, clock) = cache_with_clock();
        cache.put(1, "old", Duration::from_secs(10));
        clock.advance(chrono::Duration::seconds(8));
        cache.put(1, "new", Duration::from_secs(10));
        clock.advance(chrono::Duration::seconds(8));

        assert_eq!(cache.get(&1), Some(&"new"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_invalidate_and_clear() {
        let (mut cache, _clock) = cache_with_clock();
        cache.put(1, "one", Duration::from_secs(10));
        cache.put(2, "two", Duration::from_secs(10));

        assert_eq!(cache.invalidate(&1), Some("one"));
        assert_eq!(cache.invalidate(&1), None);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_huge_ttl_saturates() {
        let (mut cache, _clock) = cache_with_clock();
        cache.put(1, "forever", Duration::from_secs(u64::MAX));
        assert!(cache.has(&1));
    }

    #[test]
    fn test_age_display() {
        let now = Utc::now();
        let entry = CacheEntry::new((), now, Duration::from_secs(60));
        assert_eq!(entry.age_display(now), "just now");
        assert_eq!(entry.age_display(now + chrono::Duration::minutes(5)), "5m ago");
        assert_eq!(entry.age_display(now + chrono::Duration::minutes(95)), "2h ago");
        assert_eq!(entry.age_display(now + chrono::Duration::hours(25)), "1d ago");
        // Clock skew
        assert_eq!(entry.age_display(now - chrono::Duration::minutes(5)), "just now");
    }
}
