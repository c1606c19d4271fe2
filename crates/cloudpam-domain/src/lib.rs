//! Typed entities for the CloudPAM inventory (`spec.md` §3, C2: "Domain model").
//!
//! Structural, local invariants (non-empty names, string length caps) live here as plain
//! validation functions. Invariants that need cross-entity or cross-request state (parent
//! existence, sibling overlap, referential integrity, soft-delete visibility) are enforced by
//! `cloudpam-store`, which is the only component that can see the whole persisted state at once.

mod account;
mod agent;
mod audit;
mod auth;
mod discovery;
mod pool;

pub use account::{Account, AccountInput, AccountPatch};
pub use agent::{AgentApproval, AgentUpsertInput, BootstrapToken, BootstrapTokenInput, DiscoveryAgent};
pub use audit::{AuditEvent, AuditOutcome};
pub use auth::{ApiKey, ApiKeyInput, Session, SessionInput, User, UserInput, UserRole};
pub use discovery::{
    DiscoveredResource, DiscoveredResourceInput, ResourceStatus, ResourceType, SyncJob,
    SyncJobPatch, SyncJobStatus, SyncSource,
};
pub use pool::{Pool, PoolInput, PoolPatch, PoolSource, PoolStatus, PoolType};

/// Maximum length for free-text name fields (`spec.md` §3.1: `name:string≤255`).
pub const MAX_NAME_LEN: usize = 255;

pub(crate) fn validate_name(name: &str) -> Result<(), cloudpam_errors::CoreError> {
    if name.trim().is_empty() {
        return Err(cloudpam_errors::CoreError::validation("name must not be empty"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(cloudpam_errors::CoreError::validation(format!(
            "name must be at most {MAX_NAME_LEN} characters"
        )));
    }
    Ok(())
}
