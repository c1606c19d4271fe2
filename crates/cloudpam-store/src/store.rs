use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cloudpam_errors::CoreResult;

use crate::account_repo::AccountRepository;
use crate::agent_repo::{AgentRepository, TokenRepository};
use crate::apikey_repo::ApiKeyRepository;
use crate::discovery_repo::DiscoveryRepository;
use crate::pool_repo::PoolRepository;
use crate::session_repo::SessionRepository;
use crate::settings_repo::SettingsRepository;
use crate::user_repo::UserRepository;
use crate::SearchRequest;
use crate::types::SearchResults;

/// Capability set implemented by every storage backend (`spec.md` §9: "Store is a capability
/// set; backends are variants, not a class hierarchy"). A backend implements each entity-scoped
/// repository trait plus this umbrella for cross-entity operations and lifecycle.
#[async_trait]
pub trait Store:
    PoolRepository
    + AccountRepository
    + DiscoveryRepository
    + AgentRepository
    + TokenRepository
    + SettingsRepository
    + UserRepository
    + ApiKeyRepository
    + SessionRepository
    + Send
    + Sync
{
    async fn search(
        &self,
        ctx: &cloudpam_context::RequestContext,
        req: SearchRequest,
    ) -> CoreResult<SearchResults>;

    /// Liveness probe used by the external `/readyz` contract (`spec.md` §6.1).
    async fn ping(&self) -> CoreResult<()>;

    /// Releases backend resources. Idempotent.
    async fn close(&self) -> CoreResult<()>;

    /// Exposes the backend's injected clock so callers compare against the same notion of "now"
    /// the store itself used to stamp rows (`spec.md` §9: "single clock abstraction").
    fn now(&self) -> DateTime<Utc>;
}
