use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use cloudpam_errors::{CoreError, CoreResult};
use rand::distr::{Alphanumeric, SampleString};

/// Prefix on every CloudPAM API key (`spec.md` §4.7: "Key text = `cpam_` + 24-40 bytes of base62
/// entropy").
pub const API_KEY_PREFIX: &str = "cpam_";

const SECRET_ENTROPY_LEN: usize = 32;
const LOOKUP_PREFIX_LEN: usize = 8;

/// Generates a fresh `cpam_`-prefixed API key secret.
#[must_use]
pub fn generate_api_key_secret() -> String {
    let entropy = Alphanumeric.sample_string(&mut rand::rng(), SECRET_ENTROPY_LEN);
    format!("{API_KEY_PREFIX}{entropy}")
}

/// First ~8 characters after the prefix, stored in the clear for O(1) lookup (`spec.md` §4.7).
#[must_use]
pub fn key_lookup_prefix(secret: &str) -> &str {
    let rest = secret.strip_prefix(API_KEY_PREFIX).unwrap_or(secret);
    &rest[..rest.len().min(LOOKUP_PREFIX_LEN)]
}

/// Argon2id-hashes a credential (API key secret or password) for storage.
pub fn hash_secret(secret: &str) -> CoreResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| CoreError::internal(format!("failed to hash credential: {e}")))
}

/// Constant-time verification of a presented secret against a stored Argon2id hash
/// (`spec.md` §4.7: "fetch candidate by prefix, then constant-time compare via Argon2id").
pub fn verify_secret(secret: &str, hash: &str) -> CoreResult<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| CoreError::internal(format!("stored credential hash is malformed: {e}")))?;
    Ok(Argon2::default()
        .verify_password(secret.as_bytes(), &parsed)
        .is_ok())
}
