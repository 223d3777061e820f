//! Expiring counter storage.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

use super::clock::{Clock, SystemClock};
use super::counter::CounterEntry;
use crate::error::Result;

/// Trait for expiring key-value counter stores.
///
/// A key whose TTL has elapsed reads as absent, which callers treat as a
/// count of zero. Implementations must make `get` and `set` atomic per key.
///
/// The provided `increment` and `increment_if_below` are composed from `get`
/// and `set` and are therefore not atomic across concurrent callers. Stores
/// that can do better should override them with a single critical section.
pub trait CounterStore: Send + Sync {
    /// Read the current value for `key`, or `None` if absent or expired.
    fn get(&self, key: &str) -> Result<Option<u64>>;

    /// Overwrite the value for `key` and reset its TTL.
    fn set(&self, key: &str, value: u64, ttl: Duration) -> Result<()>;

    /// Add one to the value for `key`, resetting its TTL.
    ///
    /// Returns the new value.
    fn increment(&self, key: &str, ttl: Duration) -> Result<u64> {
        let count = self.get(key)?.unwrap_or(0) + 1;
        self.set(key, count, ttl)?;
        Ok(count)
    }

    /// Add one to the value for `key` only if it is currently below `max`.
    ///
    /// Returns the new value, or `None` when the value was already at or
    /// above `max` (in which case nothing is written).
    fn increment_if_below(&self, key: &str, max: u64, ttl: Duration) -> Result<Option<u64>> {
        let current = self.get(key)?.unwrap_or(0);
        if current >= max {
            return Ok(None);
        }
        let count = current + 1;
        self.set(key, count, ttl)?;
        Ok(Some(count))
    }

    /// Drop entries whose TTL has elapsed, returning how many were removed.
    ///
    /// Expired entries already read as absent, so this only reclaims memory.
    fn purge_expired(&self) -> usize {
        0
    }
}

impl<S: CounterStore + ?Sized> CounterStore for Arc<S> {
    fn get(&self, key: &str) -> Result<Option<u64>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: u64, ttl: Duration) -> Result<()> {
        (**self).set(key, value, ttl)
    }

    fn increment(&self, key: &str, ttl: Duration) -> Result<u64> {
        (**self).increment(key, ttl)
    }

    fn increment_if_below(&self, key: &str, max: u64, ttl: Duration) -> Result<Option<u64>> {
        (**self).increment_if_below(key, max, ttl)
    }

    fn purge_expired(&self) -> usize {
        (**self).purge_expired()
    }
}

/// In-process counter store.
///
/// Entries live in a sharded concurrent map; each key's read-modify-write
/// runs under that key's shard lock. Expiry is evaluated lazily against the
/// store's clock on every access.
pub struct MemoryStore {
    entries: DashMap<String, CounterEntry>,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    /// Create an empty store using the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty store that reads time from `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }

    /// Number of entries held, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CounterStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<u64>> {
        let now = self.clock.now();
        Ok(self
            .entries
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.count))
    }

    fn set(&self, key: &str, value: u64, ttl: Duration) -> Result<()> {
        let now = self.clock.now();
        self.entries
            .insert(key.to_string(), CounterEntry::new(value, now, ttl));
        Ok(())
    }

    fn increment(&self, key: &str, ttl: Duration) -> Result<u64> {
        let now = self.clock.now();
        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| CounterEntry::new(0, now, ttl));

        let count = entry.live_count(now) + 1;
        *entry = CounterEntry::new(count, now, ttl);
        Ok(count)
    }

    fn increment_if_below(&self, key: &str, max: u64, ttl: Duration) -> Result<Option<u64>> {
        let now = self.clock.now();
        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| CounterEntry::new(0, now, ttl));

        let current = entry.live_count(now);
        if current >= max {
            return Ok(None);
        }

        let count = current + 1;
        *entry = CounterEntry::new(count, now, ttl);
        Ok(Some(count))
    }

    fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before.saturating_sub(self.entries.len());

        trace!(removed = removed, "Purged expired counters");
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ratelimit::clock::ManualClock;

    const WINDOW: Duration = Duration::from_secs(60);

    fn store_with_clock() -> (MemoryStore, ManualClock) {
        let clock = ManualClock::new();
        (MemoryStore::with_clock(Arc::new(clock.clone())), clock)
    }

    #[test]
    fn test_get_absent_key() {
        let store = MemoryStore::new();
        assert_eq!(store.get("missing").unwrap(), None);
    }

    #[test]
    fn test_set_overwrites_and_resets_ttl() {
        let (store, clock) = store_with_clock();

        store.set("a", 4, WINDOW).unwrap();
        clock.advance(Duration::from_secs(50));
        store.set("a", 7, WINDOW).unwrap();
        clock.advance(Duration::from_secs(50));

        assert_eq!(store.get("a").unwrap(), Some(7));
    }

    #[test]
    fn test_entry_reads_absent_after_ttl() {
        let (store, clock) = store_with_clock();

        store.set("a", 3, WINDOW).unwrap();
        clock.advance(Duration::from_secs(61));

        assert_eq!(store.get("a").unwrap(), None);
    }

    #[test]
    fn test_increment_restarts_after_expiry() {
        let (store, clock) = store_with_clock();

        assert_eq!(store.increment("a", WINDOW).unwrap(), 1);
        assert_eq!(store.increment("a", WINDOW).unwrap(), 2);

        clock.advance(Duration::from_secs(61));
        assert_eq!(store.increment("a", WINDOW).unwrap(), 1);
    }

    #[test]
    fn test_increment_if_below_stops_at_max() {
        let store = MemoryStore::new();

        assert_eq!(store.increment_if_below("a", 2, WINDOW).unwrap(), Some(1));
        assert_eq!(store.increment_if_below("a", 2, WINDOW).unwrap(), Some(2));
        assert_eq!(store.increment_if_below("a", 2, WINDOW).unwrap(), None);
        assert_eq!(store.get("a").unwrap(), Some(2));
    }

    #[test]
    fn test_purge_expired_only_removes_stale_entries() {
        let (store, clock) = store_with_clock();

        store.set("old", 1, Duration::from_secs(10)).unwrap();
        store.set("fresh", 1, WINDOW).unwrap();
        clock.advance(Duration::from_secs(30));

        assert_eq!(store.purge_expired(), 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("fresh").unwrap(), Some(1));
    }

    #[test]
    fn test_arc_store_delegates() {
        let store = Arc::new(MemoryStore::new());
        let shared: &dyn CounterStore = &store;

        shared.increment("a", WINDOW).unwrap();
        assert_eq!(store.get("a").unwrap(), Some(1));
    }
}
