//! Rate limit counter entry.

use std::time::{Duration, Instant};

/// A request count held in the counter store for one client.
///
/// The expiry is reset on every write, so the window re-anchors at each
/// admitted request rather than following wall-clock boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterEntry {
    /// Requests recorded since the entry was created
    pub count: u64,
    /// When the entry stops counting
    pub expires_at: Instant,
}

impl CounterEntry {
    /// Create an entry holding `count` that expires `ttl` after `now`.
    pub fn new(count: u64, now: Instant, ttl: Duration) -> Self {
        Self {
            count,
            expires_at: now + ttl,
        }
    }

    /// Whether the entry's TTL has elapsed at `now`.
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    /// The count as seen at `now`; an expired entry counts as zero.
    pub fn live_count(&self, now: Instant) -> u64 {
        if self.is_expired(now) {
            0
        } else {
            self.count
        }
    }

    /// Get the duration until the entry expires.
    pub fn duration_until_expiry(&self, now: Instant) -> Duration {
        self.expires_at.saturating_duration_since(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_live_within_ttl() {
        let now = Instant::now();
        let entry = CounterEntry::new(3, now, Duration::from_secs(60));

        assert!(!entry.is_expired(now));
        assert_eq!(entry.live_count(now + Duration::from_secs(59)), 3);
        assert_eq!(
            entry.duration_until_expiry(now + Duration::from_secs(20)),
            Duration::from_secs(40)
        );
    }

    #[test]
    fn test_entry_expires_at_ttl_boundary() {
        let now = Instant::now();
        let entry = CounterEntry::new(10, now, Duration::from_secs(60));

        assert!(entry.is_expired(now + Duration::from_secs(60)));
        assert_eq!(entry.live_count(now + Duration::from_secs(61)), 0);
        assert_eq!(
            entry.duration_until_expiry(now + Duration::from_secs(90)),
            Duration::ZERO
        );
    }
}
