use std::collections::HashMap;
use std::sync::Arc;

use cloudpam_cidr::{prefix_overlaps, Ipv4Prefix};
use cloudpam_context::RequestContext;
use cloudpam_domain::{Pool, PoolInput, PoolStatus, PoolType};
use cloudpam_errors::{CoreError, CoreResult};
use cloudpam_store::{PoolRepository, Store};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// `spec.md` §4.6.5 blueprints: named hierarchy templates a strategy orders the levels of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Blueprint {
    EnterpriseMultiRegion,
    MediumOrg,
    SmallTeam,
}

/// `spec.md` §4.6.5 strategies: which dimension becomes the outermost split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    RegionFirst,
    EnvironmentFirst,
    AccountFirst,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaDimensions {
    pub regions: Vec<String>,
    pub environments: Vec<String>,
    pub accounts_per_env: u32,
    pub tiers: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaRequest {
    pub blueprint: Blueprint,
    pub strategy: Strategy,
    pub dimensions: SchemaDimensions,
    pub root_cidr: Ipv4Prefix,
}

/// One node of the blueprint's recursive subdivision (`spec.md` §4.6.5 `PlannedPool`).
/// `temp_id` is derived deterministically from the path of dimension values from the root, so
/// re-running `generate_schema` on the same request always produces the same ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedPool {
    pub temp_id: String,
    pub parent_temp_id: Option<String>,
    pub name: String,
    pub cidr: Ipv4Prefix,
    pub pool_type: PoolType,
}

struct Level {
    label: &'static str,
    names: Vec<String>,
    pool_type: PoolType,
}

fn ordered_level_labels(strategy: Strategy) -> [&'static str; 3] {
    match strategy {
        Strategy::RegionFirst => ["region", "environment", "account"],
        Strategy::EnvironmentFirst => ["environment", "region", "account"],
        Strategy::AccountFirst => ["account", "region", "environment"],
    }
}

fn blueprint_labels(blueprint: Blueprint) -> &'static [&'static str] {
    match blueprint {
        Blueprint::EnterpriseMultiRegion => &["region", "environment", "account"],
        Blueprint::MediumOrg => &["environment", "account"],
        Blueprint::SmallTeam => &["environment"],
    }
}

fn blueprint_root_name(blueprint: Blueprint) -> &'static str {
    match blueprint {
        Blueprint::EnterpriseMultiRegion => "enterprise",
        Blueprint::MediumOrg => "org",
        Blueprint::SmallTeam => "team",
    }
}

fn level_pool_type(label: &str) -> PoolType {
    match label {
        "region" => PoolType::Region,
        "environment" => PoolType::Environment,
        "account" => PoolType::Vpc,
        "tier" => PoolType::Subnet,
        _ => PoolType::Subnet,
    }
}

fn build_levels(req: &SchemaRequest) -> CoreResult<Vec<Level>> {
    let included = blueprint_labels(req.blueprint);
    let mut levels = Vec::new();
    for label in ordered_level_labels(req.strategy) {
        if !included.contains(&label) {
            continue;
        }
        let names = match label {
            "region" => req.dimensions.regions.clone(),
            "environment" => req.dimensions.environments.clone(),
            "account" => (1..=req.dimensions.accounts_per_env)
                .map(|n| format!("account-{n}"))
                .collect(),
            _ => unreachable!("label is drawn from ordered_level_labels"),
        };
        if names.is_empty() {
            return Err(CoreError::validation(format!(
                "blueprint/strategy requires a non-empty '{label}' dimension"
            )));
        }
        levels.push(Level {
            label,
            names,
            pool_type: level_pool_type(label),
        });
    }
    if !req.dimensions.tiers.is_empty() {
        levels.push(Level {
            label: "tier",
            names: req.dimensions.tiers.clone(),
            pool_type: PoolType::Subnet,
        });
    }
    Ok(levels)
}

fn ceil_log2(n: usize) -> u32 {
    if n <= 1 {
        0
    } else {
        (usize::BITS) - (n - 1).leading_zeros()
    }
}

/// Splits `parent` into exactly `count` equally sized children, in address order (`spec.md`
/// §4.6.5: "each child takes a prefix `parent.bits + ceil(log2(children))` bits").
fn split_into(parent: Ipv4Prefix, count: usize) -> CoreResult<Vec<Ipv4Prefix>> {
    let extra_bits = ceil_log2(count);
    let new_bits = u32::from(parent.bits()) + extra_bits;
    if new_bits > 32 {
        return Err(CoreError::validation(format!(
            "{parent} has no room for {count} children at this level"
        )));
    }
    #[allow(clippy::cast_possible_truncation)]
    let new_bits = new_bits as u8;
    let children: Vec<Ipv4Prefix> = cloudpam_cidr::Subdivide::new(parent, new_bits)
        .map_err(|e| CoreError::validation(e.to_string()))?
        .take(count)
        .collect();
    Ok(children)
}

/// Builds the planned pool tree for `req` (`spec.md` §4.6.5, generation steps 1-4). The returned
/// list is already parent-first: a node is always pushed before any of its children.
pub fn generate_schema(req: &SchemaRequest) -> CoreResult<Vec<PlannedPool>> {
    let levels = build_levels(req)?;
    let root_name = blueprint_root_name(req.blueprint).to_owned();
    let root_temp_id = "root".to_owned();

    let mut planned = vec![PlannedPool {
        temp_id: root_temp_id.clone(),
        parent_temp_id: None,
        name: root_name.clone(),
        cidr: req.root_cidr,
        pool_type: PoolType::Supernet,
    }];

    generate_level(&levels, 0, req.root_cidr, &root_temp_id, &root_name, &mut planned)?;
    Ok(planned)
}

fn generate_level(
    levels: &[Level],
    idx: usize,
    parent_cidr: Ipv4Prefix,
    parent_temp_id: &str,
    parent_name: &str,
    out: &mut Vec<PlannedPool>,
) -> CoreResult<()> {
    let Some(level) = levels.get(idx) else {
        return Ok(());
    };

    let children_cidrs = split_into(parent_cidr, level.names.len())?;
    for (name, cidr) in level.names.iter().zip(children_cidrs) {
        let temp_id = format!("{parent_temp_id}/{}:{name}", level.label);
        let display_name = format!("{parent_name} {name}");
        out.push(PlannedPool {
            temp_id: temp_id.clone(),
            parent_temp_id: Some(parent_temp_id.to_owned()),
            name: display_name.clone(),
            cidr,
            pool_type: level.pool_type,
        });
        generate_level(levels, idx + 1, cidr, &temp_id, &display_name, out)?;
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaConflict {
    pub temp_id: String,
    pub live_pool_id: i64,
    pub reason: String,
}

/// `schema.check` (`spec.md` §4.6.5): overlap of each planned CIDR against every live pool,
/// without mutating anything.
#[must_use]
pub fn check_conflicts(planned: &[PlannedPool], live_pools: &[Pool]) -> Vec<SchemaConflict> {
    let mut conflicts = Vec::new();
    for p in planned {
        for live in live_pools {
            if live.is_live() && prefix_overlaps(p.cidr, live.cidr) {
                conflicts.push(SchemaConflict {
                    temp_id: p.temp_id.clone(),
                    live_pool_id: live.id,
                    reason: format!("{} overlaps live pool {} ({})", p.cidr, live.id, live.cidr),
                });
            }
        }
    }
    conflicts
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaApplyResult {
    pub created: HashMap<String, i64>,
}

/// Wires [`generate_schema`]/[`check_conflicts`] to a live `Store` (`spec.md` §4.6.5).
pub struct SchemaService {
    store: Arc<dyn Store>,
}

impl SchemaService {
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    #[must_use]
    pub fn generate(&self, req: &SchemaRequest) -> CoreResult<Vec<PlannedPool>> {
        generate_schema(req)
    }

    /// `schema.check`: conflicts against all live pools in `account_id` (or every account if
    /// `None`). Read-only.
    pub async fn check(
        &self,
        ctx: &RequestContext,
        planned: &[PlannedPool],
        account_id: Option<i64>,
    ) -> CoreResult<Vec<SchemaConflict>> {
        let live = PoolRepository::list(self.store.as_ref(), ctx, account_id).await?;
        Ok(check_conflicts(planned, &live))
    }

    /// `schema.apply`: creates `planned` in the topological (parent-first) order it is already
    /// in. `InMemoryStore` has no multi-row transaction primitive, so atomicity is implemented as
    /// compensation: if any `create` fails, every pool created so far in this call is deleted
    /// again, children before parents, so `PoolRepository::delete`'s "no live children" guard
    /// never trips during rollback (`spec.md` §4.6.5 S5).
    pub async fn apply(&self, ctx: &RequestContext, planned: &[PlannedPool]) -> CoreResult<SchemaApplyResult> {
        let mut id_by_temp: HashMap<String, i64> = HashMap::new();
        let mut created_order: Vec<i64> = Vec::new();

        for p in planned {
            let parent_id = match &p.parent_temp_id {
                Some(parent_temp) => Some(*id_by_temp.get(parent_temp).ok_or_else(|| {
                    CoreError::internal(format!("planned pool {} has unknown parent {parent_temp}", p.temp_id))
                })?),
                None => None,
            };

            let input = PoolInput {
                name: p.name.clone(),
                cidr: p.cidr,
                parent_id,
                account_id: None,
                pool_type: p.pool_type,
                status: PoolStatus::Planned,
                source: None,
                description: String::new(),
                tags: std::collections::BTreeMap::new(),
            };

            match PoolRepository::create(self.store.as_ref(), ctx, input).await {
                Ok(pool) => {
                    id_by_temp.insert(p.temp_id.clone(), pool.id);
                    created_order.push(pool.id);
                }
                Err(err) => {
                    warn!(temp_id = %p.temp_id, error = %err, "schema apply failed, rolling back");
                    for id in created_order.iter().rev() {
                        let _ = PoolRepository::delete(self.store.as_ref(), ctx, *id).await;
                    }
                    return Err(err.context(format!("schema apply rolled back at {}", p.temp_id)));
                }
            }
        }

        Ok(SchemaApplyResult { created: id_by_temp })
    }
}
