use std::collections::HashMap;

use cloudpam_cidr::{is_rfc1918, prefix_overlaps};
use cloudpam_domain::Pool;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    /// Points subtracted from the overall health score per finding (`spec.md` §4.6.4).
    #[must_use]
    pub fn penalty(self) -> i64 {
        match self {
            Self::Error => 10,
            Self::Warning => 3,
            Self::Info => 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceFinding {
    pub pool_id: i64,
    pub rule_id: &'static str,
    pub severity: Severity,
    pub message: String,
}

/// Runs the five compliance rules of `spec.md` §4.6.3 over `pools`.
///
/// `EMPTY-001` needs to know whether a pool has live children, so `pools` must include each
/// checked pool's direct children for that rule to be meaningful — callers that want an accurate
/// verdict should pass a flattened hierarchy (parent + descendants), not an arbitrary subset.
#[must_use]
pub fn check_compliance(pools: &[Pool]) -> Vec<ComplianceFinding> {
    let mut findings = Vec::new();

    for i in 0..pools.len() {
        for j in (i + 1)..pools.len() {
            let a = &pools[i];
            let b = &pools[j];
            if a.is_live() && b.is_live() && a.parent_id == b.parent_id && prefix_overlaps(a.cidr, b.cidr) {
                findings.push(ComplianceFinding {
                    pool_id: a.id,
                    rule_id: "OVERLAP-001",
                    severity: Severity::Error,
                    message: format!("{} overlaps sibling pool {} ({})", a.cidr, b.id, b.cidr),
                });
                findings.push(ComplianceFinding {
                    pool_id: b.id,
                    rule_id: "OVERLAP-001",
                    severity: Severity::Error,
                    message: format!("{} overlaps sibling pool {} ({})", b.cidr, a.id, a.cidr),
                });
            }
        }
    }

    let mut live_child_counts: HashMap<i64, u32> = HashMap::new();
    for pool in pools {
        if pool.is_live() {
            if let Some(parent_id) = pool.parent_id {
                *live_child_counts.entry(parent_id).or_insert(0) += 1;
            }
        }
    }

    for pool in pools {
        if !pool.is_live() {
            continue;
        }

        if !is_rfc1918(pool.cidr) {
            findings.push(ComplianceFinding {
                pool_id: pool.id,
                rule_id: "RFC1918-001",
                severity: Severity::Warning,
                message: format!("{} is not fully inside RFC1918 private space", pool.cidr),
            });
        }

        if pool.pool_type.is_parent_capable() && live_child_counts.get(&pool.id).copied().unwrap_or(0) == 0 {
            findings.push(ComplianceFinding {
                pool_id: pool.id,
                rule_id: "EMPTY-001",
                severity: Severity::Warning,
                message: format!("{:?} pool {} has no live children", pool.pool_type, pool.id),
            });
        }

        if pool.name.trim().is_empty() {
            findings.push(ComplianceFinding {
                pool_id: pool.id,
                rule_id: "NAME-001",
                severity: Severity::Info,
                message: format!("pool {} has no name", pool.id),
            });
        }

        if pool.description.trim().is_empty() {
            findings.push(ComplianceFinding {
                pool_id: pool.id,
                rule_id: "NAME-002",
                severity: Severity::Info,
                message: format!("pool {} has no description", pool.id),
            });
        }
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use cloudpam_cidr::Ipv4Prefix;
    use cloudpam_domain::{PoolSource, PoolStatus, PoolType};
    use std::collections::BTreeMap;

    fn pool(id: i64, cidr: &str, parent_id: Option<i64>, pool_type: PoolType) -> Pool {
        Pool {
            id,
            name: "named".to_owned(),
            cidr: Ipv4Prefix::parse(cidr).unwrap(),
            parent_id,
            account_id: None,
            pool_type,
            status: PoolStatus::Active,
            source: PoolSource::Manual,
            description: "described".to_owned(),
            tags: BTreeMap::new(),
            ancestor_path: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        }
    }

    #[test]
    fn overlapping_siblings_are_flagged_on_both_sides() {
        let pools = vec![
            pool(1, "10.0.0.0/24", Some(0), PoolType::Subnet),
            pool(2, "10.0.0.128/25", Some(0), PoolType::Subnet),
        ];
        let findings = check_compliance(&pools);
        let overlap_ids: Vec<i64> = findings
            .iter()
            .filter(|f| f.rule_id == "OVERLAP-001")
            .map(|f| f.pool_id)
            .collect();
        assert_eq!(overlap_ids, vec![1, 2]);
    }

    #[test]
    fn public_cidr_triggers_rfc1918_warning() {
        let pools = vec![pool(1, "8.8.8.0/24", None, PoolType::Subnet)];
        let findings = check_compliance(&pools);
        assert!(findings.iter().any(|f| f.rule_id == "RFC1918-001" && f.severity == Severity::Warning));
    }

    #[test]
    fn childless_parent_capable_pool_triggers_empty_warning() {
        let pools = vec![pool(1, "10.0.0.0/16", None, PoolType::Supernet)];
        let findings = check_compliance(&pools);
        assert!(findings.iter().any(|f| f.rule_id == "EMPTY-001"));
    }

    #[test]
    fn parent_with_live_child_has_no_empty_warning() {
        let pools = vec![
            pool(1, "10.0.0.0/16", None, PoolType::Supernet),
            pool(2, "10.0.0.0/24", Some(1), PoolType::Subnet),
        ];
        let findings = check_compliance(&pools);
        assert!(!findings.iter().any(|f| f.rule_id == "EMPTY-001" && f.pool_id == 1));
    }

    #[test]
    fn leaf_subnet_is_never_flagged_empty() {
        let pools = vec![pool(1, "10.0.0.0/24", None, PoolType::Subnet)];
        let findings = check_compliance(&pools);
        assert!(!findings.iter().any(|f| f.rule_id == "EMPTY-001"));
    }

    #[test]
    fn missing_name_and_description_are_flagged() {
        let mut bare = pool(1, "10.0.0.0/24", None, PoolType::Subnet);
        bare.name = "  ".to_owned();
        bare.description = String::new();
        let findings = check_compliance(&[bare]);
        assert!(findings.iter().any(|f| f.rule_id == "NAME-001"));
        assert!(findings.iter().any(|f| f.rule_id == "NAME-002"));
    }

    #[test]
    fn deleted_pools_are_ignored() {
        let mut deleted = pool(1, "8.8.8.0/24", None, PoolType::Subnet);
        deleted.deleted_at = Some(Utc::now());
        assert!(check_compliance(&[deleted]).is_empty());
    }
}
