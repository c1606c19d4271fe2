//! Gap analysis, fragmentation scoring, compliance rules, overall health reporting, and schema
//! planning (`spec.md` §4.6, C7). Every pure scoring rule lives in its own module and is wired to
//! a `Store` only inside [`AnalysisService`]/[`SchemaService`], mirroring `cloudpam-discovery`'s
//! split between `batch.rs`'s pure reducer and `service.rs`'s store-backed wiring.

mod compliance;
mod fragmentation;
mod gap;
mod planner;
mod report;

pub use compliance::{check_compliance, ComplianceFinding, Severity};
pub use fragmentation::{
    score_fragmentation, FragmentationCategory, FragmentationRecommendation, FragmentationReport,
    OVERSIZED_RATIO, SCATTER_FULL_SCORE_COUNT, SCATTER_SIZE_GAP_BITS, UNDERSIZED_UTILIZATION,
};
pub use gap::find_gaps;
pub use planner::{
    check_conflicts, generate_schema, Blueprint, PlannedPool, SchemaApplyResult, SchemaConflict,
    SchemaDimensions, SchemaRequest, SchemaService, Strategy,
};
pub use report::{AnalysisService, NetworkAnalysisReport, PoolFragmentation, PoolGapFinding};
