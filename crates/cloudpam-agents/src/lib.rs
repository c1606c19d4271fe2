//! Agent control plane (`spec.md` §4.5, C6): bootstrap-token provisioning, agent registration
//! and heartbeat, and the ingest-authorization check `cloudpam-discovery` callers run before
//! handing a batch to the reducer.

mod credential;
mod lifecycle;
mod service;

pub use credential::{
    generate_api_key_secret, hash_bundle, hash_secret, key_lookup_prefix, verify_secret,
    BootstrapBundle, API_KEY_PREFIX,
};
pub use lifecycle::{lifecycle_status, AgentLifecycleStatus, OFFLINE_AFTER, STALE_AFTER};
pub use service::{AgentService, ProvisionedAgent, INGEST_SCOPE};
