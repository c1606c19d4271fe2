//! Principal resolution, credential hashing, role/scope authorization, and login rate limiting
//! (`spec.md` §4.7, C8).

mod cache;
mod credential;
mod rate_limit;
mod scope;
mod service;

pub use cache::{ActiveUserCache, DEFAULT_TTL_SECONDS};
pub use credential::{
    generate_api_key_secret, hash_secret, key_lookup_prefix, verify_secret, API_KEY_PREFIX,
};
pub use rate_limit::{GovernorRateLimiter, LoginRateLimiter, DEFAULT_ATTEMPTS_PER_MINUTE};
pub use scope::{check_elevation, required_tier};
pub use service::{AuthService, IssuedApiKey, NewApiKey, DEFAULT_SESSION_TTL_HOURS};
