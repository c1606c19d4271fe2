use async_trait::async_trait;
use cloudpam_context::RequestContext;
use cloudpam_domain::{Account, AccountInput, AccountPatch, AuditOutcome};
use cloudpam_errors::{CoreError, CoreResult};
use serde_json::json;
use tracing::info;

use crate::account_repo::AccountRepository;

use super::InMemoryStore;

impl InMemoryStore {
    fn live_account(&self, id: i64) -> CoreResult<Account> {
        self.accounts
            .get(&id)
            .filter(|a| a.is_live())
            .map(|a| a.clone())
            .ok_or_else(|| CoreError::not_found(format!("account {id} not found")))
    }
}

#[async_trait]
impl AccountRepository for InMemoryStore {
    async fn create(&self, ctx: &RequestContext, input: AccountInput) -> CoreResult<Account> {
        input.validate()?;
        if self
            .accounts
            .iter()
            .any(|a| a.is_live() && a.key == input.key)
        {
            return Err(CoreError::conflict(format!(
                "account key {} already in use",
                input.key
            )));
        }
        let now = self.now();
        let id = self.next_account_id();
        let account = Account {
            id,
            key: input.key,
            name: input.name,
            provider: input.provider,
            external_id: input.external_id,
            platform: input.platform,
            tier: input.tier,
            environment: input.environment,
            regions: input.regions,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.accounts.insert(id, account.clone());
        info!(account_id = account.id, key = %account.key, "account created");
        self.audit(
            ctx,
            "account.create",
            "account",
            Some(account.id.to_string()),
            AuditOutcome::Success,
            json!({"key": account.key, "name": account.name}),
        )
        .await?;
        Ok(account)
    }

    async fn update(
        &self,
        ctx: &RequestContext,
        id: i64,
        patch: AccountPatch,
    ) -> CoreResult<Account> {
        patch.validate()?;
        let mut entry = self
            .accounts
            .get_mut(&id)
            .filter(|a| a.is_live())
            .ok_or_else(|| CoreError::not_found(format!("account {id} not found")))?;
        if let Some(name) = patch.name {
            entry.name = name;
        }
        if let Some(platform) = patch.platform {
            entry.platform = Some(platform);
        }
        if let Some(tier) = patch.tier {
            entry.tier = Some(tier);
        }
        if let Some(environment) = patch.environment {
            entry.environment = Some(environment);
        }
        if let Some(regions) = patch.regions {
            entry.regions = regions;
        }
        entry.updated_at = self.now();
        let updated = entry.clone();
        drop(entry);
        info!(account_id = updated.id, "account updated");
        self.audit(
            ctx,
            "account.update",
            "account",
            Some(updated.id.to_string()),
            AuditOutcome::Success,
            json!({"name": updated.name}),
        )
        .await?;
        Ok(updated)
    }

    async fn delete(&self, ctx: &RequestContext, id: i64) -> CoreResult<()> {
        self.live_account(id)?;
        let has_live_pool = self
            .pools
            .iter()
            .any(|p| p.is_live() && p.account_id == Some(id));
        if has_live_pool {
            return Err(CoreError::conflict(format!(
                "account {id} has live pools; use delete_cascade"
            )));
        }
        if let Some(mut entry) = self.accounts.get_mut(&id) {
            entry.deleted_at = Some(self.now());
        }
        info!(account_id = id, "account deleted");
        self.audit(
            ctx,
            "account.delete",
            "account",
            Some(id.to_string()),
            AuditOutcome::Success,
            json!({}),
        )
        .await?;
        Ok(())
    }

    async fn delete_cascade(&self, ctx: &RequestContext, id: i64) -> CoreResult<Vec<i64>> {
        self.live_account(id)?;
        let roots: Vec<i64> = self
            .pools
            .iter()
            .filter(|p| p.is_live() && p.account_id == Some(id) && p.parent_id.is_none())
            .map(|p| p.id)
            .collect();
        let mut affected = Vec::new();
        for root in roots {
            affected.extend(
                cascade_delete_pool_subtree(self, ctx, root).await?,
            );
        }
        if let Some(mut entry) = self.accounts.get_mut(&id) {
            entry.deleted_at = Some(self.now());
        }
        info!(account_id = id, affected_pools = affected.len(), "account cascade deleted");
        self.audit(
            ctx,
            "account.delete_cascade",
            "account",
            Some(id.to_string()),
            AuditOutcome::Success,
            json!({"affected_pools": affected}),
        )
        .await?;
        Ok(affected)
    }

    async fn get(&self, _ctx: &RequestContext, id: i64) -> CoreResult<Account> {
        self.live_account(id)
    }

    async fn get_by_key(&self, _ctx: &RequestContext, key: &str) -> CoreResult<Account> {
        self.accounts
            .iter()
            .find(|a| a.is_live() && a.key == key)
            .map(|a| a.clone())
            .ok_or_else(|| CoreError::not_found(format!("account with key {key} not found")))
    }

    async fn list(&self, _ctx: &RequestContext) -> CoreResult<Vec<Account>> {
        let mut accounts: Vec<Account> = self
            .accounts
            .iter()
            .filter(|a| a.is_live())
            .map(|a| a.clone())
            .collect();
        accounts.sort_by_key(|a| a.id);
        Ok(accounts)
    }
}

/// Delegates to `PoolRepository::delete_cascade` without re-borrowing `self` mutably twice in
/// the same expression (`DashMap` iterators above must drop before this runs).
async fn cascade_delete_pool_subtree(
    store: &InMemoryStore,
    ctx: &RequestContext,
    root: i64,
) -> CoreResult<Vec<i64>> {
    use crate::pool_repo::PoolRepository;
    store.delete_cascade(ctx, root).await
}

#[cfg(test)]
mod tests {
    use super::super::test_store;
    use cloudpam_context::RequestContext;
    use cloudpam_domain::AccountInput;

    fn input(key: &str) -> AccountInput {
        AccountInput {
            key: key.to_owned(),
            name: "Prod".to_owned(),
            provider: "aws".to_owned(),
            external_id: None,
            platform: None,
            tier: None,
            environment: None,
            regions: vec![],
        }
    }

    #[tokio::test]
    async fn duplicate_key_is_rejected() {
        let store = test_store();
        let ctx = RequestContext::new(None);
        store.create(&ctx, input("aws:111")).await.unwrap();
        let err = store.create(&ctx, input("aws:111")).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn get_by_key_finds_live_account() {
        let store = test_store();
        let ctx = RequestContext::new(None);
        let created = store.create(&ctx, input("aws:111")).await.unwrap();
        let found = store.get_by_key(&ctx, "aws:111").await.unwrap();
        assert_eq!(found.id, created.id);
    }
}
