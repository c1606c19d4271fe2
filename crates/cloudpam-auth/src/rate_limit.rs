use std::num::NonZeroU32;

use cloudpam_errors::{CoreError, CoreResult};
use dashmap::DashMap;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};

/// Contract an embedding transport layer calls before accepting a login attempt (`spec.md` §5:
/// "Per-IP login rate limit: N attempts/minute (config; default 5)"). The trait lets an embedder
/// swap in a distributed limiter without this crate depending on a transport framework.
pub trait LoginRateLimiter: Send + Sync {
    /// Returns `Ok(())` if `key` (typically a client IP) may proceed, `RateLimited` otherwise.
    fn check(&self, key: &str) -> CoreResult<()>;
}

/// Default attempts/minute per key (`spec.md` §5).
pub const DEFAULT_ATTEMPTS_PER_MINUTE: u32 = 5;

const DEFAULT_QUOTA_COUNT: NonZeroU32 = match NonZeroU32::new(DEFAULT_ATTEMPTS_PER_MINUTE) {
    Some(n) => n,
    None => panic!("DEFAULT_ATTEMPTS_PER_MINUTE must be nonzero"),
};

/// Per-key `governor` token bucket (`spec.md` §5: "per-key or per-IP global quota via token
/// bucket"), one [`DefaultDirectRateLimiter`] per key. Mirrors the teacher's api-gateway rate
/// limiter (a map of `RateLimiter::direct` buckets keyed by route), just keyed by login identity
/// instead of `(Method, path)`.
pub struct GovernorRateLimiter {
    quota: Quota,
    buckets: DashMap<String, DefaultDirectRateLimiter>,
}

impl GovernorRateLimiter {
    pub fn new(attempts_per_minute: u32) -> CoreResult<Self> {
        let count = NonZeroU32::new(attempts_per_minute)
            .ok_or_else(|| CoreError::validation("attempts_per_minute must be nonzero"))?;
        Ok(Self {
            quota: Quota::per_minute(count),
            buckets: DashMap::new(),
        })
    }

    #[must_use]
    pub fn with_default_rate() -> Self {
        Self {
            quota: Quota::per_minute(DEFAULT_QUOTA_COUNT),
            buckets: DashMap::new(),
        }
    }
}

impl LoginRateLimiter for GovernorRateLimiter {
    fn check(&self, key: &str) -> CoreResult<()> {
        let bucket = self
            .buckets
            .entry(key.to_owned())
            .or_insert_with(|| RateLimiter::direct(self.quota));
        bucket
            .check()
            .map(|_| ())
            .map_err(|_| CoreError::rate_limited(format!("login rate limit exceeded for {key}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_the_configured_burst() {
        let limiter = GovernorRateLimiter::new(5).unwrap();
        for _ in 0..5 {
            limiter.check("1.2.3.4").unwrap();
        }
        let err = limiter.check("1.2.3.4").unwrap_err();
        assert!(matches!(err.kind, cloudpam_errors::ErrorKind::RateLimited));
    }

    #[test]
    fn distinct_keys_have_independent_buckets() {
        let limiter = GovernorRateLimiter::new(1).unwrap();
        limiter.check("1.1.1.1").unwrap();
        limiter.check("2.2.2.2").unwrap();
    }

    #[test]
    fn zero_rate_is_rejected() {
        let err = GovernorRateLimiter::new(0).unwrap_err();
        assert!(matches!(err.kind, cloudpam_errors::ErrorKind::Validation));
    }
}
