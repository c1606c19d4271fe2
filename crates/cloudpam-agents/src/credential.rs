use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use cloudpam_errors::{CoreError, CoreResult};
use rand::distr::{Alphanumeric, SampleString};
use serde::{Deserialize, Serialize};

/// Prefix on every CloudPAM API key / bootstrap-derived secret (`spec.md` §4.5, §4.7).
pub const API_KEY_PREFIX: &str = "cpam_";

const SECRET_ENTROPY_LEN: usize = 32;

/// Generates `cpam_` + ≥24 bytes of base62 entropy (`spec.md` §4.5 provisioning, §4.7 key format).
#[must_use]
pub fn generate_api_key_secret() -> String {
    let entropy = Alphanumeric.sample_string(&mut rand::rng(), SECRET_ENTROPY_LEN);
    format!("{API_KEY_PREFIX}{entropy}")
}

/// First characters after the prefix, stored in the clear for O(1) key lookup
/// (`spec.md` §4.7: "store prefix ... in plaintext for lookup").
#[must_use]
pub fn key_lookup_prefix(secret: &str) -> &str {
    let rest = secret.strip_prefix(API_KEY_PREFIX).unwrap_or(secret);
    &rest[..rest.len().min(8)]
}

/// Argon2id-hashes a secret for storage. Never logged, never round-tripped.
pub fn hash_secret(secret: &str) -> CoreResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| CoreError::internal(format!("failed to hash credential: {e}")))
}

/// Constant-time verification of a presented secret against a stored Argon2id hash.
pub fn verify_secret(secret: &str, hash: &str) -> CoreResult<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| CoreError::internal(format!("stored credential hash is malformed: {e}")))?;
    Ok(Argon2::default()
        .verify_password(secret.as_bytes(), &parsed)
        .is_ok())
}

/// The one-shot payload an admin hands to an agent process (`spec.md` §4.5, §6.3, §GLOSSARY
/// "bootstrap token").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapBundle {
    pub agent_name: String,
    pub server_url: String,
    pub api_key_secret: String,
    pub account_id: i64,
}

impl BootstrapBundle {
    /// Encodes the bundle as base64(JSON), the format an agent ingests as a single env/CLI value.
    pub fn to_base64(&self) -> CoreResult<String> {
        let json = serde_json::to_vec(self)
            .map_err(|e| CoreError::internal(format!("failed to encode bootstrap bundle: {e}")))?;
        Ok(STANDARD.encode(json))
    }

    pub fn from_base64(encoded: &str) -> CoreResult<Self> {
        let bytes = STANDARD
            .decode(encoded)
            .map_err(|e| CoreError::validation(format!("bootstrap token is not valid base64: {e}")))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| CoreError::validation(format!("bootstrap token payload is malformed: {e}")))
    }
}

/// Digest of the full bundle bytes, used to key `BootstrapToken.token_hash` for one-shot lookup
/// by the `/register` handler (`spec.md` §4.5: "stored `token_hash = hash(token_bytes)`").
///
/// Deterministic (SHA-256, not Argon2id): the registration path must recompute this digest from
/// the presented bundle and look up the row by equality, which a salted hash cannot support. The
/// `api_key_secret` the bundle carries is separately Argon2id-hashed via [`hash_secret`].
#[must_use]
pub fn hash_bundle(encoded: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(encoded.as_bytes());
    format!("{digest:x}")
}
