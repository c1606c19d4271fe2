use cloudpam_domain::{DiscoveredResourceInput, ResourceType, SyncSource};

/// One item in an ingest batch before validation (`spec.md` §4.4 step 2).
#[derive(Debug, Clone)]
pub struct IngestResourceInput {
    pub external_id: String,
    pub resource_type: ResourceType,
    pub cidr: Option<String>,
    pub name: Option<String>,
    pub region: Option<String>,
}

impl IngestResourceInput {
    pub(crate) fn validate(self) -> Result<DiscoveredResourceInput, cloudpam_errors::CoreError> {
        if self.external_id.trim().is_empty() {
            return Err(cloudpam_errors::CoreError::validation(
                "resource_id must not be empty",
            ));
        }
        let cidr = self
            .cidr
            .map(|s| cloudpam_cidr::Ipv4Prefix::parse_cidr_or_ip(&s))
            .transpose()
            .map_err(|e| cloudpam_errors::CoreError::validation_with_input(e.input, e.reason))?;
        Ok(DiscoveredResourceInput {
            external_id: self.external_id,
            resource_type: self.resource_type,
            cidr,
            name: self.name,
            region: self.region,
        })
    }
}

/// Input to `DiscoveryService::ingest` (`spec.md` §4.4: "Input to the reducer").
#[derive(Debug, Clone)]
pub struct IngestBatch {
    pub account_id: i64,
    pub source: SyncSource,
    pub agent_id: Option<i64>,
    pub resources: Vec<IngestResourceInput>,
}

/// `spec.md` §4.4 step 4: terminal `SyncJob` counters, mirrored back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub job_id: i64,
    pub resources_seen: u32,
    pub resources_created: u32,
    pub resources_updated: u32,
    pub resources_marked_stale: u32,
    pub failed: bool,
}
