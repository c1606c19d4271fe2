use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use cloudpam_cidr::Ipv4Prefix;
use cloudpam_errors::CoreError;
use serde::{Deserialize, Serialize};

use crate::validate_name;

/// `spec.md` §3.1 `Pool.type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolType {
    Supernet,
    Region,
    Environment,
    Vpc,
    Subnet,
}

impl PoolType {
    /// Types that are expected to carry children; used by the `EMPTY-001` compliance rule
    /// (`spec.md` §4.6.3).
    #[must_use]
    pub fn is_parent_capable(self) -> bool {
        !matches!(self, Self::Subnet)
    }
}

/// `spec.md` §3.1 `Pool.status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolStatus {
    Planned,
    Active,
    Deprecated,
}

/// `spec.md` §3.1 `Pool.source`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolSource {
    Manual,
    Discovered,
    Imported,
}

/// A named IPv4 CIDR block in the hierarchy (`spec.md` §3.1 `Pool`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pool {
    pub id: i64,
    pub name: String,
    pub cidr: Ipv4Prefix,
    /// Immutable after creation: see `spec.md` §4.2 `Pool.update` and §9's open question on
    /// reparenting.
    pub parent_id: Option<i64>,
    pub account_id: Option<i64>,
    pub pool_type: PoolType,
    pub status: PoolStatus,
    pub source: PoolSource,
    pub description: String,
    pub tags: BTreeMap<String, String>,
    /// Materialized ancestor chain, root-first, not including `id` itself. Store-maintained
    /// optimization for O(depth) ancestor/cascade queries (`spec.md` §6.4, §9); not part of the
    /// public create/update contract.
    pub ancestor_path: Vec<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Pool {
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.deleted_at.is_none()
    }
}

/// Input to `Store::Pool.create` (`spec.md` §4.2).
#[derive(Debug, Clone)]
pub struct PoolInput {
    pub name: String,
    pub cidr: Ipv4Prefix,
    pub parent_id: Option<i64>,
    pub account_id: Option<i64>,
    pub pool_type: PoolType,
    pub status: PoolStatus,
    /// `None` defaults to `Manual`, unless the caller is the discovery ingest reducer, which
    /// passes `Some(Discovered)` explicitly (`spec.md` §9 open question).
    pub source: Option<PoolSource>,
    pub description: String,
    pub tags: BTreeMap<String, String>,
}

impl PoolInput {
    /// Local, single-entity validation. Parent existence, containment, and sibling overlap are
    /// store-level checks that need the rest of the tree.
    pub fn validate(&self) -> Result<(), CoreError> {
        validate_name(&self.name)
    }

    #[must_use]
    pub fn source_or_default(&self) -> PoolSource {
        self.source.unwrap_or(PoolSource::Manual)
    }
}

/// Patch for `Store::Pool.update`. `cidr` and `parent_id` are deliberately absent: both are
/// immutable post-creation (`spec.md` §4.2).
#[derive(Debug, Clone, Default)]
pub struct PoolPatch {
    pub name: Option<String>,
    pub pool_type: Option<PoolType>,
    pub status: Option<PoolStatus>,
    pub description: Option<String>,
    pub tags: Option<BTreeMap<String, String>>,
    /// `None` = leave unchanged, `Some(None)` = clear the account link, `Some(Some(id))` = set.
    pub account_id: Option<Option<i64>>,
}

impl PoolPatch {
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

    fn sample_input() -> PoolInput {
        PoolInput {
            name: "root".to_owned(),
            cidr: Ipv4Prefix::parse("10.0.0.0/16").unwrap(),
            parent_id: None,
            account_id: Some(1),
            pool_type: PoolType::Supernet,
            status: PoolStatus::Active,
            source: None,
            description: String::new(),
            tags: BTreeMap::new(),
        }
    }

    #[test]
    fn source_defaults_to_manual() {
        assert_eq!(sample_input().source_or_default(), PoolSource::Manual);
    }

    #[test]
    fn empty_name_is_rejected() {
        let mut input = sample_input();
        input.name = "   ".to_owned();
        assert!(input.validate().is_err());
    }

    #[test]
    fn overlong_name_is_rejected() {
        let mut input = sample_input();
        input.name = "x".repeat(256);
        assert!(input.validate().is_err());
    }

    #[test]
    fn subnet_is_not_parent_capable() {
        assert!(!PoolType::Subnet.is_parent_capable());
        assert!(PoolType::Vpc.is_parent_capable());
    }
}
