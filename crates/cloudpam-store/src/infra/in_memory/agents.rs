use async_trait::async_trait;
use cloudpam_context::RequestContext;
use cloudpam_domain::{
    AgentApproval, AgentUpsertInput, AuditOutcome, BootstrapToken, BootstrapTokenInput,
    DiscoveryAgent,
};
use cloudpam_errors::{CoreError, CoreResult};
use serde_json::json;
use tracing::info;

use crate::agent_repo::{AgentRepository, TokenRepository};

use super::InMemoryStore;

#[async_trait]
impl AgentRepository for InMemoryStore {
    async fn upsert_agent(
        &self,
        ctx: &RequestContext,
        input: AgentUpsertInput,
    ) -> CoreResult<DiscoveryAgent> {
        let now = self.now();
        if let Some(id) = input.id {
            if let Some(mut entry) = self.agents.get_mut(&id) {
                entry.name = input.name;
                entry.api_key_id = input.api_key_id.or(entry.api_key_id);
                entry.version = input.version.or_else(|| entry.version.clone());
                entry.hostname = input.hostname.or_else(|| entry.hostname.clone());
                entry.last_seen_at = Some(now);
                let updated = entry.clone();
                drop(entry);
                info!(agent_id = updated.id, account_id = updated.account_id, "agent upserted");
                self.audit(
                    ctx,
                    "agent.upsert",
                    "agent",
                    Some(updated.id.to_string()),
                    AuditOutcome::Success,
                    json!({"name": updated.name, "account_id": updated.account_id}),
                )
                .await?;
                return Ok(updated);
            }
        }
        let id = self.next_agent_id();
        let agent = DiscoveryAgent {
            id,
            name: input.name,
            account_id: input.account_id,
            api_key_id: input.api_key_id,
            version: input.version,
            hostname: input.hostname,
            approval: AgentApproval::Pending,
            credential_hash: None,
            last_seen_at: Some(now),
            created_at: now,
        };
        self.agents.insert(id, agent.clone());
        info!(agent_id = agent.id, account_id = agent.account_id, "agent upserted");
        self.audit(
            ctx,
            "agent.upsert",
            "agent",
            Some(agent.id.to_string()),
            AuditOutcome::Success,
            json!({"name": agent.name, "account_id": agent.account_id}),
        )
        .await?;
        Ok(agent)
    }

    async fn get_agent(&self, _ctx: &RequestContext, id: i64) -> CoreResult<DiscoveryAgent> {
        self.agents
            .get(&id)
            .map(|a| a.clone())
            .ok_or_else(|| CoreError::not_found(format!("agent {id} not found")))
    }

    async fn list_agents(
        &self,
        _ctx: &RequestContext,
        account_id: Option<i64>,
    ) -> CoreResult<Vec<DiscoveryAgent>> {
        let mut agents: Vec<DiscoveryAgent> = self
            .agents
            .iter()
            .filter(|a| account_id.is_none_or(|acc| a.account_id == acc))
            .map(|a| a.clone())
            .collect();
        agents.sort_by_key(|a| a.id);
        Ok(agents)
    }

    async fn set_approval(
        &self,
        ctx: &RequestContext,
        id: i64,
        approval: AgentApproval,
    ) -> CoreResult<DiscoveryAgent> {
        let mut entry = self
            .agents
            .get_mut(&id)
            .ok_or_else(|| CoreError::not_found(format!("agent {id} not found")))?;
        entry.approval = approval;
        let updated = entry.clone();
        drop(entry);
        info!(agent_id = updated.id, approval = ?updated.approval, "agent approval changed");
        self.audit(
            ctx,
            "agent.set_approval",
            "agent",
            Some(updated.id.to_string()),
            AuditOutcome::Success,
            json!({"approval": updated.approval}),
        )
        .await?;
        Ok(updated)
    }

    async fn touch_heartbeat(&self, _ctx: &RequestContext, id: i64) -> CoreResult<DiscoveryAgent> {
        let mut entry = self
            .agents
            .get_mut(&id)
            .ok_or_else(|| CoreError::not_found(format!("agent {id} not found")))?;
        entry.last_seen_at = Some(self.now());
        Ok(entry.clone())
    }
}

#[async_trait]
impl TokenRepository for InMemoryStore {
    async fn create_bootstrap_token(
        &self,
        ctx: &RequestContext,
        input: BootstrapTokenInput,
    ) -> CoreResult<BootstrapToken> {
        let now = self.now();
        let id = self.next_token_id();
        let token = BootstrapToken {
            id,
            account_id: input.account_id,
            token_hash: input.token_hash,
            issued_by: input.issued_by,
            max_uses: input.max_uses,
            uses: 0,
            expires_at: now + input.ttl,
            revoked_at: None,
            created_at: now,
        };
        self.tokens.insert(id, token.clone());
        info!(token_id = token.id, account_id = token.account_id, "bootstrap token created");
        self.audit(
            ctx,
            "bootstrap_token.create",
            "bootstrap_token",
            Some(token.id.to_string()),
            AuditOutcome::Success,
            json!({"account_id": token.account_id, "issued_by": token.issued_by, "max_uses": token.max_uses}),
        )
        .await?;
        Ok(token)
    }

    async fn get_by_hash(&self, _ctx: &RequestContext, token_hash: &str) -> CoreResult<BootstrapToken> {
        self.tokens
            .iter()
            .find(|t| t.token_hash == token_hash)
            .map(|t| t.clone())
            .ok_or_else(|| CoreError::not_found("bootstrap token not found"))
    }

    async fn revoke(&self, ctx: &RequestContext, id: i64) -> CoreResult<BootstrapToken> {
        let mut entry = self
            .tokens
            .get_mut(&id)
            .ok_or_else(|| CoreError::not_found(format!("token {id} not found")))?;
        entry.revoked_at = Some(self.now());
        let revoked = entry.clone();
        drop(entry);
        info!(token_id = revoked.id, "bootstrap token revoked");
        self.audit(
            ctx,
            "bootstrap_token.revoke",
            "bootstrap_token",
            Some(revoked.id.to_string()),
            AuditOutcome::Success,
            json!({}),
        )
        .await?;
        Ok(revoked)
    }

    async fn increment_uses(&self, _ctx: &RequestContext, id: i64) -> CoreResult<BootstrapToken> {
        let mut entry = self
            .tokens
            .get_mut(&id)
            .ok_or_else(|| CoreError::not_found(format!("token {id} not found")))?;
        entry.uses += 1;
        Ok(entry.clone())
    }

    async fn list(
        &self,
        _ctx: &RequestContext,
        account_id: Option<i64>,
    ) -> CoreResult<Vec<BootstrapToken>> {
        let mut tokens: Vec<BootstrapToken> = self
            .tokens
            .iter()
            .filter(|t| account_id.is_none_or(|acc| t.account_id == acc))
            .map(|t| t.clone())
            .collect();
        tokens.sort_by_key(|t| t.id);
        Ok(tokens)
    }
}
