//! Discovery ingest reducer (`spec.md` §4.4, C5): funnels both server-initiated sync and
//! agent-pushed batches through one upsert/stale/SyncJob pipeline.

mod batch;
mod service;

pub use batch::{IngestBatch, IngestReport, IngestResourceInput};
pub use service::DiscoveryService;
