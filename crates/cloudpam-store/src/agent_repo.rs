use async_trait::async_trait;
use cloudpam_context::RequestContext;
use cloudpam_domain::{AgentApproval, AgentUpsertInput, BootstrapToken, BootstrapTokenInput, DiscoveryAgent};
use cloudpam_errors::CoreResult;

/// Persistence contract for `DiscoveryAgent` (`spec.md` §4.5).
#[async_trait]
pub trait AgentRepository: Send + Sync {
    async fn upsert_agent(
        &self,
        ctx: &RequestContext,
        input: AgentUpsertInput,
    ) -> CoreResult<DiscoveryAgent>;

    async fn get_agent(&self, ctx: &RequestContext, id: i64) -> CoreResult<DiscoveryAgent>;

    async fn list_agents(
        &self,
        ctx: &RequestContext,
        account_id: Option<i64>,
    ) -> CoreResult<Vec<DiscoveryAgent>>;

    async fn set_approval(
        &self,
        ctx: &RequestContext,
        id: i64,
        approval: AgentApproval,
    ) -> CoreResult<DiscoveryAgent>;

    async fn touch_heartbeat(&self, ctx: &RequestContext, id: i64) -> CoreResult<DiscoveryAgent>;
}

/// Persistence contract for `BootstrapToken` (`spec.md` §4.5 provisioning).
#[async_trait]
pub trait TokenRepository: Send + Sync {
    /// Persists a token row under a caller-supplied hash; the plaintext secret is never seen by
    /// the store (`spec.md` §4.5, generation owned by `cloudpam-agents`).
    async fn create_bootstrap_token(
        &self,
        ctx: &RequestContext,
        input: BootstrapTokenInput,
    ) -> CoreResult<BootstrapToken>;

    async fn get_by_hash(&self, ctx: &RequestContext, token_hash: &str) -> CoreResult<BootstrapToken>;

    async fn revoke(&self, ctx: &RequestContext, id: i64) -> CoreResult<BootstrapToken>;

    async fn increment_uses(&self, ctx: &RequestContext, id: i64) -> CoreResult<BootstrapToken>;

    async fn list(
        &self,
        ctx: &RequestContext,
        account_id: Option<i64>,
    ) -> CoreResult<Vec<BootstrapToken>>;
}
