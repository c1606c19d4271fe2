use async_trait::async_trait;
use cloudpam_context::RequestContext;
use cloudpam_domain::{ApiKey, ApiKeyInput, AuditOutcome};
use cloudpam_errors::{CoreError, CoreResult};
use serde_json::json;
use tracing::info;

use crate::apikey_repo::ApiKeyRepository;

use super::InMemoryStore;

#[async_trait]
impl ApiKeyRepository for InMemoryStore {
    async fn create(&self, ctx: &RequestContext, input: ApiKeyInput) -> CoreResult<ApiKey> {
        input.validate()?;
        let id = self
            .next_api_key_id
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let key = ApiKey {
            id,
            owner_user_id: input.owner_user_id,
            owner_agent_id: input.owner_agent_id,
            name: input.name,
            prefix: input.prefix,
            key_hash: input.key_hash,
            scopes: input.scopes,
            last_used_at: None,
            created_at: self.now(),
            expires_at: input.expires_at,
            revoked_at: None,
        };
        self.api_keys.insert(id, key.clone());
        info!(api_key_id = key.id, owner_user_id = ?key.owner_user_id, owner_agent_id = ?key.owner_agent_id, "api key created");
        self.audit(
            ctx,
            "api_key.create",
            "api_key",
            Some(key.id.to_string()),
            AuditOutcome::Success,
            json!({
                "name": key.name,
                "owner_user_id": key.owner_user_id,
                "owner_agent_id": key.owner_agent_id,
                "scopes": key.scopes,
            }),
        )
        .await?;
        Ok(key)
    }

    async fn find_by_prefix(
        &self,
        _ctx: &RequestContext,
        prefix: &str,
    ) -> CoreResult<Vec<ApiKey>> {
        Ok(self
            .api_keys
            .iter()
            .filter(|k| k.prefix == prefix)
            .map(|k| k.clone())
            .collect())
    }

    async fn touch_last_used(&self, _ctx: &RequestContext, id: i64) -> CoreResult<ApiKey> {
        let mut entry = self
            .api_keys
            .get_mut(&id)
            .ok_or_else(|| CoreError::not_found(format!("api key {id} not found")))?;
        entry.last_used_at = Some(self.now());
        Ok(entry.clone())
    }

    async fn revoke(&self, ctx: &RequestContext, id: i64) -> CoreResult<ApiKey> {
        let mut entry = self
            .api_keys
            .get_mut(&id)
            .ok_or_else(|| CoreError::not_found(format!("api key {id} not found")))?;
        entry.revoked_at = Some(self.now());
        let revoked = entry.clone();
        drop(entry);
        info!(api_key_id = revoked.id, "api key revoked");
        self.audit(
            ctx,
            "api_key.revoke",
            "api_key",
            Some(revoked.id.to_string()),
            AuditOutcome::Success,
            json!({}),
        )
        .await?;
        Ok(revoked)
    }

    async fn list(
        &self,
        _ctx: &RequestContext,
        owner_user_id: Option<i64>,
    ) -> CoreResult<Vec<ApiKey>> {
        let mut keys: Vec<ApiKey> = self
            .api_keys
            .iter()
            .filter(|k| owner_user_id.is_none_or(|owner| k.owner_user_id == Some(owner)))
            .map(|k| k.clone())
            .collect();
        keys.sort_by_key(|k| k.id);
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_store;
    use cloudpam_context::RequestContext;
    use cloudpam_domain::ApiKeyInput;

    fn input() -> ApiKeyInput {
        ApiKeyInput {
            owner_user_id: Some(1),
            owner_agent_id: None,
            name: "ci".to_owned(),
            prefix: "ab12".to_owned(),
            key_hash: "hash".to_owned(),
            scopes: vec!["pools:read".to_owned()],
            expires_at: None,
        }
    }

    #[tokio::test]
    async fn find_by_prefix_returns_matching_candidates() {
        let store = test_store();
        let ctx = RequestContext::new(None);
        let created = store.create(&ctx, input()).await.unwrap();
        let found = store.find_by_prefix(&ctx, "ab12").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, created.id);
    }

    #[tokio::test]
    async fn revoked_key_is_no_longer_active() {
        let store = test_store();
        let ctx = RequestContext::new(None);
        let created = store.create(&ctx, input()).await.unwrap();
        let revoked = store.revoke(&ctx, created.id).await.unwrap();
        assert!(!revoked.is_active(store.now()));
    }

    #[tokio::test]
    async fn list_filters_by_owner() {
        let store = test_store();
        let ctx = RequestContext::new(None);
        store.create(&ctx, input()).await.unwrap();
        let mut other = input();
        other.owner_user_id = Some(2);
        store.create(&ctx, other).await.unwrap();
        let owned_by_1 = store.list(&ctx, Some(1)).await.unwrap();
        assert_eq!(owned_by_1.len(), 1);
        let all = store.list(&ctx, None).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn agent_scoped_key_cannot_also_have_a_user_owner() {
        let store = test_store();
        let ctx = RequestContext::new(None);
        let mut both = input();
        both.owner_agent_id = Some(9);
        let err = store.create(&ctx, both).await.unwrap_err();
        assert!(matches!(err.kind, cloudpam_errors::ErrorKind::Validation));
    }

    #[tokio::test]
    async fn key_with_no_owner_is_rejected() {
        let store = test_store();
        let ctx = RequestContext::new(None);
        let mut orphan = input();
        orphan.owner_user_id = None;
        let err = store.create(&ctx, orphan).await.unwrap_err();
        assert!(matches!(err.kind, cloudpam_errors::ErrorKind::Validation));
    }
}
