//! Storage contract (`spec.md` §3.2, §4.2, §9: "Store is a capability set; backends are
//! variants, not a class hierarchy"). This crate defines the entity-scoped repository traits,
//! the `Store` umbrella trait, and ships one backend (`infra::in_memory::InMemoryStore`).

mod account_repo;
mod agent_repo;
mod apikey_repo;
mod discovery_repo;
mod pool_repo;
mod session_repo;
mod settings_repo;
mod store;
mod types;
mod user_repo;

pub mod infra;

pub use account_repo::AccountRepository;
pub use agent_repo::{AgentRepository, TokenRepository};
pub use apikey_repo::ApiKeyRepository;
pub use discovery_repo::{DiscoveryRepository, UpsertOutcome};
pub use pool_repo::PoolRepository;
pub use session_repo::SessionRepository;
pub use settings_repo::SettingsRepository;
pub use store::Store;
pub use user_repo::UserRepository;
pub use types::{
    Page, PoolHierarchyNode, PoolStats, PoolWithStats, ResourceFilter, SearchEntityKind,
    SearchRequest, SearchResults, MAX_PAGE_SIZE,
};
