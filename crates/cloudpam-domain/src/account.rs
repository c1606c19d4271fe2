use chrono::{DateTime, Utc};
use cloudpam_errors::CoreError;
use serde::{Deserialize, Serialize};

use crate::validate_name;

/// A billing/ownership boundary that pools can be attached to (`spec.md` §3.1 `Account`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    /// Stable external key, e.g. a cloud account number; unique across live accounts.
    pub key: String,
    pub name: String,
    pub provider: String,
    pub external_id: Option<String>,
    pub platform: Option<String>,
    pub tier: Option<String>,
    pub environment: Option<String>,
    pub regions: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Account {
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.deleted_at.is_none()
    }
}

/// Input to `Store::Account.create` (`spec.md` §4.3).
#[derive(Debug, Clone)]
pub struct AccountInput {
    pub key: String,
    pub name: String,
    pub provider: String,
    pub external_id: Option<String>,
    pub platform: Option<String>,
    pub tier: Option<String>,
    pub environment: Option<String>,
    pub regions: Vec<String>,
}

impl AccountInput {
    pub fn validate(&self) -> Result<(), CoreError> {
        validate_name(&self.name)?;
        if self.key.trim().is_empty() {
            return Err(CoreError::validation("account key must not be empty"));
        }
        if self.provider.trim().is_empty() {
            return Err(CoreError::validation("account provider must not be empty"));
        }
        Ok(())
    }
}

/// Patch for `Store::Account.update`. `key` is immutable post-creation: it is the stable
/// reference used by discovery ingest to re-identify an account across syncs.
#[derive(Debug, Clone, Default)]
pub struct AccountPatch {
    pub name: Option<String>,
    pub platform: Option<String>,
    pub tier: Option<String>,
    pub environment: Option<String>,
    pub regions: Option<Vec<String>>,
}

impl AccountPatch {
    pub fn validate(&self) -> Result<(), CoreError> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AccountInput {
        AccountInput {
            key: "acct-1".to_owned(),
            name: "Prod".to_owned(),
            provider: "aws".to_owned(),
            external_id: None,
            platform: None,
            tier: None,
            environment: Some("prod".to_owned()),
            regions: vec!["us-east-1".to_owned()],
        }
    }

    #[test]
    fn valid_input_passes() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn empty_key_is_rejected() {
        let mut input = sample();
        input.key = String::new();
        assert!(input.validate().is_err());
    }

    #[test]
    fn empty_provider_is_rejected() {
        let mut input = sample();
        input.provider = "  ".to_owned();
        assert!(input.validate().is_err());
    }
}
