use std::sync::Arc;

use cloudpam_cidr::Ipv4Prefix;
use cloudpam_context::RequestContext;
use cloudpam_domain::Pool;
use cloudpam_errors::CoreResult;
use cloudpam_store::{PoolHierarchyNode, PoolRepository, PoolStats, Store};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::compliance::{check_compliance, ComplianceFinding};
use crate::fragmentation::{score_fragmentation, FragmentationReport};
use crate::gap::find_gaps;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolGapFinding {
    pub pool_id: i64,
    pub gaps: Vec<Ipv4Prefix>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolFragmentation {
    pub pool_id: i64,
    pub report: FragmentationReport,
}

/// `spec.md` §4.6.4 `NetworkAnalysisReport`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkAnalysisReport {
    pub health_score: u8,
    pub gaps: Vec<PoolGapFinding>,
    pub fragmentation: Vec<PoolFragmentation>,
    pub compliance: Vec<ComplianceFinding>,
}

/// Runs the analysis engine over a `Store` (`spec.md` C7, §4.6).
pub struct AnalysisService {
    store: Arc<dyn Store>,
}

impl AnalysisService {
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// `Analyze(request)`: composes gap analysis, fragmentation scoring, and compliance over the
    /// forest rooted at `root_pool_id` (every root-level pool if `None`), then derives a health
    /// score from the compliance findings alone (`spec.md` §4.6.4).
    pub async fn analyze(
        &self,
        ctx: &RequestContext,
        root_pool_id: Option<i64>,
    ) -> CoreResult<NetworkAnalysisReport> {
        let hierarchy = self.store.get_hierarchy(ctx, root_pool_id).await?;

        let mut pools = Vec::new();
        let mut gaps = Vec::new();
        let mut fragmentation = Vec::new();
        for node in &hierarchy {
            walk(node, &mut pools, &mut gaps, &mut fragmentation);
        }

        let compliance = check_compliance(&pools);
        let health_score = health_score(&compliance);
        debug!(
            pools = pools.len(),
            findings = compliance.len(),
            health_score,
            "completed network analysis"
        );

        Ok(NetworkAnalysisReport {
            health_score,
            gaps,
            fragmentation,
            compliance,
        })
    }

    /// `spec.md` §4.6.1` in isolation, for a single pool.
    pub async fn gap_analysis(&self, ctx: &RequestContext, pool_id: i64) -> CoreResult<Vec<Ipv4Prefix>> {
        let pool = PoolRepository::get(self.store.as_ref(), ctx, pool_id).await?;
        let children = self.store.get_children(ctx, pool_id).await?;
        Ok(find_gaps(pool.cidr, &children))
    }

    /// `spec.md` §4.6.2` in isolation, for a single pool.
    pub async fn fragmentation_score(
        &self,
        ctx: &RequestContext,
        pool_id: i64,
    ) -> CoreResult<FragmentationReport> {
        let pool = PoolRepository::get(self.store.as_ref(), ctx, pool_id).await?;
        let children = self.store.get_children(ctx, pool_id).await?;
        let mut pairs = Vec::with_capacity(children.len());
        for child in children {
            let stats = self.store.calculate_utilization(ctx, child.id).await?;
            pairs.push((child, stats));
        }
        Ok(score_fragmentation(&pool, &pairs))
    }
}

fn walk(
    node: &PoolHierarchyNode,
    pools: &mut Vec<Pool>,
    gaps: &mut Vec<PoolGapFinding>,
    fragmentation: &mut Vec<PoolFragmentation>,
) {
    pools.push(node.pool.clone());

    if node.pool.pool_type.is_parent_capable() {
        let children_pools: Vec<Pool> = node.children.iter().map(|c| c.pool.clone()).collect();
        gaps.push(PoolGapFinding {
            pool_id: node.pool.id,
            gaps: find_gaps(node.pool.cidr, &children_pools),
        });

        let pairs: Vec<(Pool, PoolStats)> = node
            .children
            .iter()
            .map(|c| (c.pool.clone(), c.stats))
            .collect();
        fragmentation.push(PoolFragmentation {
            pool_id: node.pool.id,
            report: score_fragmentation(&node.pool, &pairs),
        });
    }

    for child in &node.children {
        walk(child, pools, gaps, fragmentation);
    }
}

fn health_score(findings: &[ComplianceFinding]) -> u8 {
    let penalty: i64 = findings.iter().map(|f| f.severity.penalty()).sum();
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    {
        (100 - penalty).max(0) as u8
    }
}
