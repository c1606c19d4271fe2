use std::sync::Arc;

use chrono::Duration;
use cloudpam_context::{Principal, RequestContext};
use cloudpam_domain::{
    AgentApproval, AgentUpsertInput, ApiKeyInput, BootstrapToken, BootstrapTokenInput, DiscoveryAgent,
};
use cloudpam_errors::{CoreError, CoreResult};
use cloudpam_store::{AgentRepository, ApiKeyRepository, Store, TokenRepository};
use tracing::{info, warn};

use crate::credential::{generate_api_key_secret, hash_bundle, hash_secret, key_lookup_prefix, BootstrapBundle};

/// `Store::Token.create_bootstrap_token` plus the one-shot bundle the admin hands to the agent
/// process (`spec.md` §4.5 provisioning, §6.3).
#[derive(Debug, Clone)]
pub struct ProvisionedAgent {
    pub token: BootstrapToken,
    pub bundle_base64: String,
}

/// Scope an ingest request must carry; checked by the caller's auth layer before
/// [`AgentService::authorize_ingest`] runs the agent/account checks this crate owns.
pub const INGEST_SCOPE: &str = "discovery:write";

/// Orchestrates the agent lifecycle over a `Store` (`spec.md` §4.5, C6).
pub struct AgentService {
    store: Arc<dyn Store>,
}

impl AgentService {
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Admin operation: mints a bootstrap token and the base64 bundle derived from it
    /// (`spec.md` §4.5 "Provisioning").
    pub async fn provision(
        &self,
        ctx: &RequestContext,
        account_id: i64,
        issued_by: i64,
        agent_name: String,
        server_url: String,
        max_uses: u32,
        ttl: Duration,
    ) -> CoreResult<ProvisionedAgent> {
        let bundle = BootstrapBundle {
            agent_name,
            server_url,
            api_key_secret: generate_api_key_secret(),
            account_id,
        };
        let bundle_base64 = bundle.to_base64()?;
        let token_hash = hash_bundle(&bundle_base64);

        let token = self
            .store
            .create_bootstrap_token(
                ctx,
                BootstrapTokenInput {
                    account_id,
                    issued_by,
                    max_uses,
                    ttl,
                    token_hash,
                },
            )
            .await?;

        info!(token_id = token.id, account_id, "bootstrap token issued");
        Ok(ProvisionedAgent { token, bundle_base64 })
    }

    /// Agent operation: redeems a bootstrap bundle and upserts the `DiscoveryAgent` row
    /// (`spec.md` §4.5 "Registration"). On an agent's first registration this also persists the
    /// bundle's `api_key_secret` as a genuine agent-scoped `ApiKey` row, Argon2id-hashed the same
    /// way a user-minted key is, and links it via `DiscoveryAgent.api_key_id` so a later ingest
    /// request's resolved `Principal.owner_agent_id` actually points at a real credential
    /// (`spec.md` §4.5 "associates `api_key_id`"). Re-registration of an already-credentialed
    /// agent reuses the existing key instead of minting a second one.
    pub async fn register(
        &self,
        ctx: &RequestContext,
        bundle_base64: &str,
        agent_id: Option<i64>,
        version: Option<String>,
        hostname: Option<String>,
    ) -> CoreResult<DiscoveryAgent> {
        let bundle = BootstrapBundle::from_base64(bundle_base64)?;
        let token_hash = hash_bundle(bundle_base64);
        let token = self.store.get_by_hash(ctx, &token_hash).await?;

        if !token.is_usable(self.store.now()) {
            return Err(CoreError::forbidden("bootstrap token is expired, revoked, or exhausted"));
        }
        if token.account_id != bundle.account_id {
            return Err(CoreError::validation("bootstrap token does not match account"));
        }

        let existing_api_key_id = match agent_id {
            Some(id) => AgentRepository::get_agent(self.store.as_ref(), ctx, id)
                .await
                .ok()
                .and_then(|existing| existing.api_key_id),
            None => None,
        };

        let agent = self
            .store
            .upsert_agent(
                ctx,
                AgentUpsertInput {
                    id: agent_id,
                    name: bundle.agent_name,
                    account_id: bundle.account_id,
                    api_key_id: existing_api_key_id,
                    version,
                    hostname,
                },
            )
            .await?;

        let agent = if agent.api_key_id.is_none() {
            let key_hash = hash_secret(&bundle.api_key_secret)?;
            let prefix = key_lookup_prefix(&bundle.api_key_secret).to_owned();
            let issued_key = ApiKeyRepository::create(
                self.store.as_ref(),
                ctx,
                ApiKeyInput {
                    owner_user_id: None,
                    owner_agent_id: Some(agent.id),
                    name: format!("{}-agent-credential", agent.name),
                    prefix,
                    key_hash,
                    scopes: vec![INGEST_SCOPE.to_owned()],
                    expires_at: None,
                },
            )
            .await?;
            self.store
                .upsert_agent(
                    ctx,
                    AgentUpsertInput {
                        id: Some(agent.id),
                        name: agent.name.clone(),
                        account_id: agent.account_id,
                        api_key_id: Some(issued_key.id),
                        version: None,
                        hostname: None,
                    },
                )
                .await?
        } else {
            agent
        };
        self.store.increment_uses(ctx, token.id).await?;

        info!(agent_id = agent.id, account_id = agent.account_id, "agent registered");
        Ok(agent)
    }

    /// Agent operation: refreshes liveness (`spec.md` §4.5 "Heartbeat").
    pub async fn heartbeat(&self, ctx: &RequestContext, agent_id: i64) -> CoreResult<DiscoveryAgent> {
        self.store.touch_heartbeat(ctx, agent_id).await
    }

    /// Admin operation: approves or rejects a pending agent.
    pub async fn set_approval(
        &self,
        ctx: &RequestContext,
        agent_id: i64,
        approval: AgentApproval,
    ) -> CoreResult<DiscoveryAgent> {
        self.store.set_approval(ctx, agent_id, approval).await
    }

    /// Checks that the bearer key resolved to `principal` may push discovery data for
    /// `account_id` (`spec.md` §4.5 "Ingest authorization": "the bearer key's ... `owner_agent`
    /// (if agent-scoped) must be approved and match the `account_id`"). The agent identity comes
    /// from `principal.owner_agent_id`, set by `AuthService::resolve_api_key` when the presented
    /// key is agent-scoped, never from a caller-supplied id. The bearer key's scope itself is
    /// verified by the caller's auth layer; this only checks agent approval state and account
    /// ownership.
    pub async fn authorize_ingest(
        &self,
        ctx: &RequestContext,
        principal: &Principal,
        account_id: i64,
    ) -> CoreResult<DiscoveryAgent> {
        let agent_id = principal
            .owner_agent_id
            .ok_or_else(|| CoreError::forbidden("bearer key is not agent-scoped"))?;
        let agent = self.store.get_agent(ctx, agent_id).await?;
        if !agent.can_ingest() {
            warn!(agent_id, "ingest rejected: agent not approved");
            return Err(CoreError::forbidden("agent is not approved for ingest"));
        }
        if agent.account_id != account_id {
            warn!(agent_id, account_id, "ingest rejected: account mismatch");
            return Err(CoreError::forbidden("agent is not authorized for this account"));
        }
        Ok(agent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudpam_context::{ActorKind, Clock, SystemClock};
    use cloudpam_store::infra::in_memory::InMemoryStore;

    fn fixture_store() -> Arc<dyn Store> {
        Arc::new(InMemoryStore::new(Arc::new(SystemClock) as Arc<dyn Clock>))
    }

    fn ingest_principal(agent_id: i64) -> Principal {
        Principal {
            kind: ActorKind::Agent,
            id: agent_id,
            role: "agent".to_owned(),
            scopes: vec![INGEST_SCOPE.to_owned()],
            owner_agent_id: Some(agent_id),
        }
    }

    #[tokio::test]
    async fn provision_then_register_produces_pending_agent() {
        let store = fixture_store();
        let ctx = RequestContext::new(None);
        let service = AgentService::new(store);

        let provisioned = service
            .provision(
                &ctx,
                1,
                1,
                "agent-us-east-1".to_owned(),
                "https://cloudpam.example.com".to_owned(),
                1,
                Duration::hours(1),
            )
            .await
            .unwrap();

        let agent = service
            .register(&ctx, &provisioned.bundle_base64, None, None, None)
            .await
            .unwrap();
        assert_eq!(agent.approval, AgentApproval::Pending);
        assert!(!agent.can_ingest());
    }

    #[tokio::test]
    async fn redeeming_a_revoked_token_is_forbidden() {
        let store = fixture_store();
        let ctx = RequestContext::new(None);
        let service = AgentService::new(store.clone());

        let provisioned = service
            .provision(
                &ctx,
                1,
                1,
                "agent-us-east-1".to_owned(),
                "https://cloudpam.example.com".to_owned(),
                5,
                Duration::hours(1),
            )
            .await
            .unwrap();
        TokenRepository::revoke(store.as_ref(), &ctx, provisioned.token.id)
            .await
            .unwrap();

        let err = service
            .register(&ctx, &provisioned.bundle_base64, None, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err.kind, cloudpam_errors::ErrorKind::Forbidden));
    }

    #[tokio::test]
    async fn ingest_for_unapproved_agent_is_forbidden() {
        let store = fixture_store();
        let ctx = RequestContext::new(None);
        let service = AgentService::new(store);

        let provisioned = service
            .provision(
                &ctx,
                1,
                1,
                "agent-us-east-1".to_owned(),
                "https://cloudpam.example.com".to_owned(),
                1,
                Duration::hours(1),
            )
            .await
            .unwrap();
        let agent = service
            .register(&ctx, &provisioned.bundle_base64, None, None, None)
            .await
            .unwrap();

        let err = service
            .authorize_ingest(&ctx, &ingest_principal(agent.id), 1)
            .await
            .unwrap_err();
        assert!(matches!(err.kind, cloudpam_errors::ErrorKind::Forbidden));
    }

    #[tokio::test]
    async fn ingest_for_non_owned_account_is_forbidden_after_approval() {
        let store = fixture_store();
        let ctx = RequestContext::new(None);
        let service = AgentService::new(store);

        let provisioned = service
            .provision(
                &ctx,
                1,
                1,
                "agent-us-east-1".to_owned(),
                "https://cloudpam.example.com".to_owned(),
                1,
                Duration::hours(1),
            )
            .await
            .unwrap();
        let agent = service
            .register(&ctx, &provisioned.bundle_base64, None, None, None)
            .await
            .unwrap();
        service
            .set_approval(&ctx, agent.id, AgentApproval::Approved)
            .await
            .unwrap();

        let principal = ingest_principal(agent.id);
        let err = service
            .authorize_ingest(&ctx, &principal, 999)
            .await
            .unwrap_err();
        assert!(matches!(err.kind, cloudpam_errors::ErrorKind::Forbidden));

        let ok = service
            .authorize_ingest(&ctx, &principal, 1)
            .await
            .unwrap();
        assert!(ok.can_ingest());
    }

    #[tokio::test]
    async fn registration_persists_an_agent_scoped_api_key() {
        let store = fixture_store();
        let ctx = RequestContext::new(None);
        let service = AgentService::new(store.clone());

        let provisioned = service
            .provision(
                &ctx,
                1,
                1,
                "agent-us-east-1".to_owned(),
                "https://cloudpam.example.com".to_owned(),
                1,
                Duration::hours(1),
            )
            .await
            .unwrap();
        let agent = service
            .register(&ctx, &provisioned.bundle_base64, None, None, None)
            .await
            .unwrap();

        let api_key_id = agent.api_key_id.expect("registration should mint a credential");
        let keys = ApiKeyRepository::list(store.as_ref(), &ctx, None).await.unwrap();
        let minted = keys.into_iter().find(|k| k.id == api_key_id).unwrap();
        assert_eq!(minted.owner_agent_id, Some(agent.id));
        assert_eq!(minted.owner_user_id, None);
    }

    #[tokio::test]
    async fn authorize_ingest_rejects_a_non_agent_scoped_principal() {
        let store = fixture_store();
        let ctx = RequestContext::new(None);
        let service = AgentService::new(store);

        let principal = Principal {
            kind: ActorKind::ApiKey,
            id: 1,
            role: "operator".to_owned(),
            scopes: vec![INGEST_SCOPE.to_owned()],
            owner_agent_id: None,
        };
        let err = service
            .authorize_ingest(&ctx, &principal, 1)
            .await
            .unwrap_err();
        assert!(matches!(err.kind, cloudpam_errors::ErrorKind::Forbidden));
    }
}
