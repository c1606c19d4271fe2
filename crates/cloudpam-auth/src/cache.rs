use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use cloudpam_context::Clock;
use parking_lot::RwLock;

/// Default active-user cache TTL (`spec.md` §5: "an active-user cache ... is a TTL map (30s
/// default) keyed by user_id to boolean active-status").
pub const DEFAULT_TTL_SECONDS: i64 = 30;

struct Entry {
    active: bool,
    cached_at: DateTime<Utc>,
}

/// Read-mostly TTL cache of `user_id -> is_active`, sitting in front of `Store::User.get` on the
/// dual-auth hot path (`spec.md` §5: "reads are lock-free under read-mostly assumption; writes on
/// miss take a short lock").
pub struct ActiveUserCache {
    clock: Arc<dyn Clock>,
    ttl: chrono::Duration,
    entries: RwLock<HashMap<i64, Entry>>,
}

impl ActiveUserCache {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, ttl: chrono::Duration) -> Self {
        Self {
            clock,
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn with_default_ttl(clock: Arc<dyn Clock>) -> Self {
        Self::new(clock, chrono::Duration::seconds(DEFAULT_TTL_SECONDS))
    }

    /// Returns the cached status if present and unexpired, `None` on a miss or stale entry.
    #[must_use]
    pub fn get(&self, user_id: i64) -> Option<bool> {
        let entries = self.entries.read();
        let entry = entries.get(&user_id)?;
        if self.clock.now() - entry.cached_at > self.ttl {
            return None;
        }
        Some(entry.active)
    }

    pub fn put(&self, user_id: i64, active: bool) {
        let mut entries = self.entries.write();
        entries.insert(
            user_id,
            Entry {
                active,
                cached_at: self.clock.now(),
            },
        );
    }

    pub fn invalidate(&self, user_id: i64) {
        self.entries.write().remove(&user_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudpam_context::FrozenClock;

    fn clock_at(iso: &str) -> Arc<FrozenClock> {
        let at = DateTime::parse_from_rfc3339(iso).unwrap().with_timezone(&Utc);
        Arc::new(FrozenClock::new(at))
    }

    fn as_dyn(clock: &Arc<FrozenClock>) -> Arc<dyn Clock> {
        clock.clone() as Arc<dyn Clock>
    }

    #[test]
    fn miss_returns_none() {
        let clock = clock_at("2026-01-01T00:00:00Z");
        let cache = ActiveUserCache::with_default_ttl(as_dyn(&clock));
        assert_eq!(cache.get(1), None);
    }

    #[test]
    fn fresh_entry_is_returned() {
        let clock = clock_at("2026-01-01T00:00:00Z");
        let cache = ActiveUserCache::with_default_ttl(as_dyn(&clock));
        cache.put(1, true);
        assert_eq!(cache.get(1), Some(true));
    }

    #[test]
    fn expired_entry_is_treated_as_a_miss() {
        let clock = clock_at("2026-01-01T00:00:00Z");
        let cache = ActiveUserCache::new(as_dyn(&clock), chrono::Duration::seconds(30));
        cache.put(1, true);
        clock.advance(chrono::Duration::seconds(31));
        assert_eq!(cache.get(1), None);
    }

    #[test]
    fn invalidate_clears_the_entry() {
        let clock = clock_at("2026-01-01T00:00:00Z");
        let cache = ActiveUserCache::with_default_ttl(as_dyn(&clock));
        cache.put(1, true);
        cache.invalidate(1);
        assert_eq!(cache.get(1), None);
    }
}
