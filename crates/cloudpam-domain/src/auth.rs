use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `spec.md` §3.1 `User.role`, §4.7 role→capability tiers (admin < operator < viewer < auditor
/// in descending privilege).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    Operator,
    Viewer,
    Auditor,
}

impl UserRole {
    /// Lower tier number outranks higher (`spec.md` §4.7): admin=10, operator=20, viewer=30,
    /// auditor=40.
    #[must_use]
    pub fn tier(self) -> u8 {
        match self {
            Self::Admin => 10,
            Self::Operator => 20,
            Self::Viewer => 30,
            Self::Auditor => 40,
        }
    }

    #[must_use]
    pub fn outranks(self, other: Self) -> bool {
        self.tier() <= other.tier()
    }
}

/// A human account (`spec.md` §3.1 `User`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub role: UserRole,
    pub password_hash: String,
    pub scopes: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub disabled_at: Option<DateTime<Utc>>,
}

impl User {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.disabled_at.is_none()
    }
}

/// Input to `Store::User.create` (`spec.md` §4.2 "User `username` ... unique among live rows").
#[derive(Debug, Clone)]
pub struct UserInput {
    pub username: String,
    pub role: UserRole,
    pub password_hash: String,
    pub scopes: Vec<String>,
}

impl UserInput {
    pub fn validate(&self) -> Result<(), cloudpam_errors::CoreError> {
        if self.username.trim().is_empty() {
            return Err(cloudpam_errors::CoreError::validation("username must not be empty"));
        }
        if self.password_hash.trim().is_empty() {
            return Err(cloudpam_errors::CoreError::validation("password_hash must not be empty"));
        }
        Ok(())
    }
}

/// A long-lived machine credential (`spec.md` §3.1 `ApiKey`, §4.7). Owned by exactly one of a
/// `User` (minted via `AuthService::create_api_key`) or a `DiscoveryAgent` (minted on
/// registration, `spec.md` §4.5 "associates `api_key_id`"); `owner_agent_id` is what ingest
/// authorization checks against the batch's `account_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKey {
    pub id: i64,
    pub owner_user_id: Option<i64>,
    pub owner_agent_id: Option<i64>,
    pub name: String,
    /// First characters after `cpam_`, stored in the clear for O(1) lookup (`spec.md` §4.7).
    pub prefix: String,
    /// Argon2id hash of the full secret.
    pub key_hash: String,
    pub scopes: Vec<String>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl ApiKey {
    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_none() && self.expires_at.is_none_or(|exp| now < exp)
    }
}

/// Input to `Store::ApiKey.create` (`spec.md` §4.7). Exactly one of `owner_user_id`/
/// `owner_agent_id` must be set; [`ApiKeyInput::validate`] enforces this.
#[derive(Debug, Clone)]
pub struct ApiKeyInput {
    pub owner_user_id: Option<i64>,
    pub owner_agent_id: Option<i64>,
    pub name: String,
    pub prefix: String,
    pub key_hash: String,
    pub scopes: Vec<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl ApiKeyInput {
    pub fn validate(&self) -> Result<(), cloudpam_errors::CoreError> {
        if self.owner_user_id.is_some() == self.owner_agent_id.is_some() {
            return Err(cloudpam_errors::CoreError::validation(
                "api key must have exactly one of owner_user_id, owner_agent_id",
            ));
        }
        Ok(())
    }
}

/// A short-lived interactive login (`spec.md` §3.1 `Session`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: uuid::Uuid,
    pub user_id: i64,
    pub scopes: Vec<String>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    #[must_use]
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Input to `Store::Session.create` (`spec.md` §4.7 "Session cookie").
#[derive(Debug, Clone)]
pub struct SessionInput {
    pub user_id: i64,
    pub scopes: Vec<String>,
    pub ttl: chrono::Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_outranks_operator() {
        assert!(UserRole::Admin.outranks(UserRole::Operator));
        assert!(!UserRole::Operator.outranks(UserRole::Admin));
    }

    #[test]
    fn role_outranks_itself() {
        assert!(UserRole::Viewer.outranks(UserRole::Viewer));
    }

    #[test]
    fn session_expiry_is_exclusive() {
        let now = Utc::now();
        let session = Session {
            id: uuid::Uuid::nil(),
            user_id: 1,
            scopes: vec![],
            issued_at: now,
            expires_at: now,
        };
        assert!(!session.is_valid(now));
    }
}
