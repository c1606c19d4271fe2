use async_trait::async_trait;
use cloudpam_cidr::{address_count, prefix_contains, prefix_overlaps};
use cloudpam_context::RequestContext;
use cloudpam_domain::{AuditOutcome, Pool, PoolInput, PoolPatch};
use cloudpam_errors::{CoreError, CoreResult};
use serde_json::json;
use tracing::info;

use crate::pool_repo::PoolRepository;
use crate::types::{PoolHierarchyNode, PoolStats, PoolWithStats};

use super::InMemoryStore;

impl InMemoryStore {
    fn live_pool(&self, id: i64) -> CoreResult<Pool> {
        self.pools
            .get(&id)
            .filter(|p| p.is_live())
            .map(|p| p.clone())
            .ok_or_else(|| CoreError::not_found(format!("pool {id} not found")))
    }

    fn live_siblings(&self, parent_id: Option<i64>, exclude: Option<i64>) -> Vec<Pool> {
        self.pools
            .iter()
            .filter(|p| p.is_live() && p.parent_id == parent_id && Some(p.id) != exclude)
            .map(|p| p.clone())
            .collect()
    }

    fn live_children_of(&self, parent_id: i64) -> Vec<Pool> {
        let mut children = self.live_siblings(Some(parent_id), None);
        children.sort_by_key(|p| p.id);
        children
    }

    fn descendant_ids(&self, root: i64) -> Vec<i64> {
        let mut out = Vec::new();
        let mut frontier = vec![root];
        while let Some(id) = frontier.pop() {
            for child in self.live_children_of(id) {
                out.push(child.id);
                frontier.push(child.id);
            }
        }
        out
    }

    fn stats_for(&self, pool: &Pool) -> PoolStats {
        let children = self.live_children_of(pool.id);
        let total_ips = address_count(pool.cidr.bits());
        let used_ips: u64 = children.iter().map(|c| address_count(c.cidr.bits())).sum();
        let utilization = if total_ips == 0 {
            0.0
        } else {
            (used_ips as f64 / total_ips as f64) * 100.0
        };
        PoolStats {
            total_ips,
            used_ips,
            direct_children: u32::try_from(children.len()).unwrap_or(u32::MAX),
            #[allow(clippy::cast_possible_truncation)]
            child_count: self.descendant_ids(pool.id).len() as u32,
            utilization,
        }
    }

    fn build_node(&self, pool: Pool) -> PoolHierarchyNode {
        let stats = self.stats_for(&pool);
        let children = self
            .live_children_of(pool.id)
            .into_iter()
            .map(|child| self.build_node(child))
            .collect();
        PoolHierarchyNode {
            pool,
            stats,
            children,
        }
    }
}

#[async_trait]
impl PoolRepository for InMemoryStore {
    async fn create(&self, ctx: &RequestContext, input: PoolInput) -> CoreResult<Pool> {
        input.validate()?;

        let mut ancestor_path = Vec::new();
        if let Some(parent_id) = input.parent_id {
            let parent = self.live_pool(parent_id)?;
            if !prefix_contains(parent.cidr, input.cidr) {
                return Err(CoreError::validation(format!(
                    "cidr {} does not lie inside parent pool {parent_id}'s cidr {}",
                    input.cidr, parent.cidr
                )));
            }
            ancestor_path = parent.ancestor_path.clone();
            ancestor_path.push(parent.id);
        }

        if let Some(account_id) = input.account_id {
            if self.accounts.get(&account_id).filter(|a| a.is_live()).is_none() {
                return Err(CoreError::validation(format!(
                    "account {account_id} does not exist or is deleted"
                )));
            }
        }

        for sibling in self.live_siblings(input.parent_id, None) {
            if prefix_overlaps(sibling.cidr, input.cidr) {
                return Err(CoreError::conflict(format!(
                    "cidr {} overlaps live sibling pool {} ({})",
                    input.cidr, sibling.id, sibling.cidr
                )));
            }
        }

        let now = self.now();
        let id = self.next_pool_id();
        let pool = Pool {
            id,
            name: input.name,
            cidr: input.cidr,
            parent_id: input.parent_id,
            account_id: input.account_id,
            pool_type: input.pool_type,
            status: input.status,
            source: input.source_or_default(),
            description: input.description,
            tags: input.tags,
            ancestor_path,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.pools.insert(id, pool.clone());
        info!(pool_id = pool.id, cidr = %pool.cidr, "pool created");
        self.audit(
            ctx,
            "pool.create",
            "pool",
            Some(pool.id.to_string()),
            AuditOutcome::Success,
            json!({"name": pool.name, "cidr": pool.cidr.to_string(), "parent_id": pool.parent_id}),
        )
        .await?;
        Ok(pool)
    }

    async fn update(&self, ctx: &RequestContext, id: i64, patch: PoolPatch) -> CoreResult<Pool> {
        patch.validate()?;
        let mut entry = self
            .pools
            .get_mut(&id)
            .filter(|p| p.is_live())
            .ok_or_else(|| CoreError::not_found(format!("pool {id} not found")))?;

        if let Some(account_id) = patch.account_id.flatten() {
            if self.accounts.get(&account_id).filter(|a| a.is_live()).is_none() {
                return Err(CoreError::validation(format!(
                    "account {account_id} does not exist or is deleted"
                )));
            }
        }

        if let Some(name) = patch.name {
            entry.name = name;
        }
        if let Some(pool_type) = patch.pool_type {
            entry.pool_type = pool_type;
        }
        if let Some(status) = patch.status {
            entry.status = status;
        }
        if let Some(description) = patch.description {
            entry.description = description;
        }
        if let Some(tags) = patch.tags {
            entry.tags = tags;
        }
        if let Some(account_id) = patch.account_id {
            entry.account_id = account_id;
        }
        entry.updated_at = self.now();
        let updated = entry.clone();
        drop(entry);
        info!(pool_id = updated.id, "pool updated");
        self.audit(
            ctx,
            "pool.update",
            "pool",
            Some(updated.id.to_string()),
            AuditOutcome::Success,
            json!({"name": updated.name, "status": updated.status}),
        )
        .await?;
        Ok(updated)
    }

    async fn delete(&self, ctx: &RequestContext, id: i64) -> CoreResult<()> {
        self.live_pool(id)?;
        if !self.live_children_of(id).is_empty() {
            return Err(CoreError::conflict(format!(
                "pool {id} has live children; use delete_cascade"
            )));
        }
        if let Some(mut entry) = self.pools.get_mut(&id) {
            entry.deleted_at = Some(self.now());
        }
        info!(pool_id = id, "pool deleted");
        self.audit(
            ctx,
            "pool.delete",
            "pool",
            Some(id.to_string()),
            AuditOutcome::Success,
            json!({}),
        )
        .await?;
        Ok(())
    }

    async fn delete_cascade(&self, ctx: &RequestContext, id: i64) -> CoreResult<Vec<i64>> {
        self.live_pool(id)?;
        let mut affected = self.descendant_ids(id);
        affected.push(id);
        let now = self.now();
        for pool_id in &affected {
            if let Some(mut entry) = self.pools.get_mut(pool_id) {
                entry.deleted_at = Some(now);
            }
        }
        info!(pool_id = id, affected = affected.len(), "pool cascade deleted");
        self.audit(
            ctx,
            "pool.delete_cascade",
            "pool",
            Some(id.to_string()),
            AuditOutcome::Success,
            json!({"affected": affected}),
        )
        .await?;
        Ok(affected)
    }

    async fn get(&self, _ctx: &RequestContext, id: i64) -> CoreResult<Pool> {
        self.live_pool(id)
    }

    async fn list(&self, _ctx: &RequestContext, account_id: Option<i64>) -> CoreResult<Vec<Pool>> {
        let mut pools: Vec<Pool> = self
            .pools
            .iter()
            .filter(|p| p.is_live() && account_id.is_none_or(|a| p.account_id == Some(a)))
            .map(|p| p.clone())
            .collect();
        pools.sort_by_key(|p| p.id);
        Ok(pools)
    }

    async fn get_with_stats(&self, _ctx: &RequestContext, id: i64) -> CoreResult<PoolWithStats> {
        let pool = self.live_pool(id)?;
        let stats = self.stats_for(&pool);
        Ok(PoolWithStats { pool, stats })
    }

    async fn get_hierarchy(
        &self,
        _ctx: &RequestContext,
        root: Option<i64>,
    ) -> CoreResult<Vec<PoolHierarchyNode>> {
        let roots: Vec<Pool> = match root {
            Some(id) => vec![self.live_pool(id)?],
            None => {
                let mut roots = self.live_siblings(None, None);
                roots.sort_by_key(|p| p.id);
                roots
            }
        };
        Ok(roots.into_iter().map(|pool| self.build_node(pool)).collect())
    }

    async fn get_children(&self, _ctx: &RequestContext, parent_id: i64) -> CoreResult<Vec<Pool>> {
        self.live_pool(parent_id)?;
        Ok(self.live_children_of(parent_id))
    }

    async fn calculate_utilization(&self, _ctx: &RequestContext, id: i64) -> CoreResult<PoolStats> {
        let pool = self.live_pool(id)?;
        Ok(self.stats_for(&pool))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_store;
    use cloudpam_cidr::Ipv4Prefix;
    use cloudpam_context::RequestContext;
    use cloudpam_domain::{PoolInput, PoolStatus, PoolType};
    use std::collections::BTreeMap;

    fn input(name: &str, cidr: &str, parent_id: Option<i64>) -> PoolInput {
        PoolInput {
            name: name.to_owned(),
            cidr: Ipv4Prefix::parse(cidr).unwrap(),
            parent_id,
            account_id: None,
            pool_type: PoolType::Subnet,
            status: PoolStatus::Active,
            source: None,
            description: String::new(),
            tags: BTreeMap::new(),
        }
    }

    #[tokio::test]
    async fn create_rejects_overlapping_siblings() {
        let store = test_store();
        let ctx = RequestContext::new(None);
        store.create(&ctx, input("root", "10.0.0.0/16", None)).await.unwrap();
        let root = store.list(&ctx, None).await.unwrap()[0].id;
        store
            .create(&ctx, input("web", "10.0.1.0/24", Some(root)))
            .await
            .unwrap();
        let dup = store.create(&ctx, input("dup", "10.0.1.0/25", Some(root))).await;
        assert!(dup.unwrap_err().is_conflict());
    }

    #[tokio::test]
    async fn create_rejects_child_outside_parent() {
        let store = test_store();
        let ctx = RequestContext::new(None);
        store.create(&ctx, input("root", "10.0.0.0/24", None)).await.unwrap();
        let root = store.list(&ctx, None).await.unwrap()[0].id;
        let err = store
            .create(&ctx, input("outside", "10.1.0.0/24", Some(root)))
            .await
            .unwrap_err();
        assert!(!err.is_conflict());
    }

    #[tokio::test]
    async fn stats_match_spec_scenario_s1() {
        let store = test_store();
        let ctx = RequestContext::new(None);
        store.create(&ctx, input("root", "10.0.0.0/16", None)).await.unwrap();
        let root = store.list(&ctx, None).await.unwrap()[0].id;
        store
            .create(&ctx, input("web", "10.0.1.0/24", Some(root)))
            .await
            .unwrap();
        store
            .create(&ctx, input("api", "10.0.2.0/24", Some(root)))
            .await
            .unwrap();

        let with_stats = store.get_with_stats(&ctx, root).await.unwrap();
        assert_eq!(with_stats.stats.total_ips, 65_536);
        assert_eq!(with_stats.stats.used_ips, 512);
        assert_eq!(with_stats.stats.direct_children, 2);
        assert!((with_stats.stats.utilization - 0.781_25).abs() < 1e-6);
    }

    #[tokio::test]
    async fn delete_refuses_when_children_live() {
        let store = test_store();
        let ctx = RequestContext::new(None);
        store.create(&ctx, input("root", "10.0.0.0/16", None)).await.unwrap();
        let root = store.list(&ctx, None).await.unwrap()[0].id;
        store
            .create(&ctx, input("web", "10.0.1.0/24", Some(root)))
            .await
            .unwrap();
        assert!(store.delete(&ctx, root).await.is_err());
    }

    #[tokio::test]
    async fn delete_cascade_removes_whole_subtree() {
        let store = test_store();
        let ctx = RequestContext::new(None);
        store.create(&ctx, input("root", "10.0.0.0/16", None)).await.unwrap();
        let root = store.list(&ctx, None).await.unwrap()[0].id;
        store
            .create(&ctx, input("web", "10.0.1.0/24", Some(root)))
            .await
            .unwrap();
        let affected = store.delete_cascade(&ctx, root).await.unwrap();
        assert_eq!(affected.len(), 2);
        assert!(store.get(&ctx, root).await.is_err());
    }
}
