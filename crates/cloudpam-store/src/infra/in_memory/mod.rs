//! In-memory `Store` backend: `DashMap`-keyed tables guarded individually, a `parking_lot::Mutex`
//! per account for ingest serialization, and monotonic id counters. Mirrors the synchronous,
//! lock-guarded-map shape of `InMemoryGtsRepository`, generalized to `async` because `Store`
//! calls model potential backend I/O (`spec.md` §5).

mod accounts;
mod agents;
mod api_keys;
mod discovery;
mod pools;
mod search;
mod sessions;
mod settings;
mod store_impl;
mod users;

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use cloudpam_audit::AuditSink;
use cloudpam_context::{Clock, RequestContext};
use cloudpam_domain::{
    Account, ApiKey, AuditOutcome, BootstrapToken, DiscoveredResource, DiscoveryAgent, Pool,
    Session, SyncJob, User,
};
use cloudpam_errors::CoreResult;
use dashmap::DashMap;
use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::Mutex as AsyncMutex;

pub struct InMemoryStore {
    clock: Arc<dyn Clock>,
    audit: Option<Arc<dyn AuditSink>>,

    next_pool_id: AtomicI64,
    next_account_id: AtomicI64,
    next_resource_id: AtomicI64,
    next_job_id: AtomicI64,
    next_agent_id: AtomicI64,
    next_token_id: AtomicI64,
    next_user_id: AtomicI64,
    next_api_key_id: AtomicI64,

    pub(crate) pools: DashMap<i64, Pool>,
    pub(crate) accounts: DashMap<i64, Account>,
    pub(crate) resources: DashMap<i64, DiscoveredResource>,
    /// `(account_id, external_id) -> resource id`, maintained alongside `resources`.
    pub(crate) resource_index: DashMap<(i64, String), i64>,
    pub(crate) sync_jobs: DashMap<i64, SyncJob>,
    pub(crate) agents: DashMap<i64, DiscoveryAgent>,
    pub(crate) tokens: DashMap<i64, BootstrapToken>,
    pub(crate) settings: RwLock<Value>,
    pub(crate) users: DashMap<i64, User>,
    pub(crate) api_keys: DashMap<i64, ApiKey>,
    pub(crate) sessions: DashMap<uuid::Uuid, Session>,

    /// Per-account ingest lock (`spec.md` §4.4 "Concurrency", §9).
    pub(crate) ingest_locks: DashMap<i64, Arc<AsyncMutex<()>>>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            audit: None,
            next_pool_id: AtomicI64::new(1),
            next_account_id: AtomicI64::new(1),
            next_resource_id: AtomicI64::new(1),
            next_job_id: AtomicI64::new(1),
            next_agent_id: AtomicI64::new(1),
            next_token_id: AtomicI64::new(1),
            next_user_id: AtomicI64::new(1),
            next_api_key_id: AtomicI64::new(1),
            pools: DashMap::new(),
            accounts: DashMap::new(),
            resources: DashMap::new(),
            resource_index: DashMap::new(),
            sync_jobs: DashMap::new(),
            agents: DashMap::new(),
            tokens: DashMap::new(),
            settings: RwLock::new(Value::Object(serde_json::Map::new())),
            users: DashMap::new(),
            api_keys: DashMap::new(),
            sessions: DashMap::new(),
            ingest_locks: DashMap::new(),
        }
    }

    /// Wires an audit sink so every mutating repository method emits one event to it
    /// (`spec.md` §4.8). Without one, mutations proceed with no audit trail, which is what
    /// tests that don't care about auditing get by default.
    #[must_use]
    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(sink);
        self
    }

    pub(crate) fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }

    /// Emits one audit event if a sink is configured. Emission failures surface as `Internal`
    /// rather than being swallowed (`spec.md` §4.8: "failures to write audit MUST NOT silently
    /// drop the event").
    pub(crate) async fn audit(
        &self,
        ctx: &RequestContext,
        action: &str,
        resource_type: &str,
        resource_id: Option<String>,
        outcome: AuditOutcome,
        detail: Value,
    ) -> CoreResult<()> {
        if let Some(sink) = &self.audit {
            sink.record(ctx, action, resource_type, resource_id, outcome, detail)
                .await?;
        }
        Ok(())
    }

    pub(crate) fn next_pool_id(&self) -> i64 {
        self.next_pool_id.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn next_account_id(&self) -> i64 {
        self.next_account_id.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn next_resource_id(&self) -> i64 {
        self.next_resource_id.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn next_job_id(&self) -> i64 {
        self.next_job_id.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn next_agent_id(&self) -> i64 {
        self.next_agent_id.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn next_token_id(&self) -> i64 {
        self.next_token_id.fetch_add(1, Ordering::Relaxed)
    }
}

#[cfg(test)]
pub(crate) fn test_store() -> InMemoryStore {
    InMemoryStore::new(Arc::new(cloudpam_context::SystemClock))
}
