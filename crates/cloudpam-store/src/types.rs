use cloudpam_cidr::Ipv4Prefix;
use cloudpam_domain::{Account, Pool};

/// `spec.md` §4.3 `calculate_utilization`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoolStats {
    pub total_ips: u64,
    pub used_ips: u64,
    pub direct_children: u32,
    pub child_count: u32,
    pub utilization: f64,
}

#[derive(Debug, Clone)]
pub struct PoolWithStats {
    pub pool: Pool,
    pub stats: PoolStats,
}

/// A node of the forest returned by `PoolRepository::get_hierarchy` (`spec.md` §4.3).
#[derive(Debug, Clone)]
pub struct PoolHierarchyNode {
    pub pool: Pool,
    pub stats: PoolStats,
    pub children: Vec<PoolHierarchyNode>,
}

/// A capped page of results (`spec.md` §4.2 `Search`, §6.1 `page`/`page_size`).
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
}

/// Maximum rows any single `Page` may carry (`spec.md` §4.2: "Page size capped at 200").
pub const MAX_PAGE_SIZE: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchEntityKind {
    Pool,
    Account,
}

/// `spec.md` §4.2 `Search(req)`.
#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
    pub query: Option<String>,
    pub cidr_contains: Option<Ipv4Prefix>,
    pub cidr_within: Option<Ipv4Prefix>,
    pub types: Vec<SearchEntityKind>,
    pub page: usize,
    pub page_size: usize,
}

impl SearchRequest {
    #[must_use]
    pub fn normalized_page_size(&self) -> usize {
        if self.page_size == 0 {
            MAX_PAGE_SIZE
        } else {
            self.page_size.min(MAX_PAGE_SIZE)
        }
    }

    #[must_use]
    pub fn wants(&self, kind: SearchEntityKind) -> bool {
        self.types.is_empty() || self.types.contains(&kind)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SearchResults {
    pub pools: Vec<Pool>,
    pub accounts: Vec<Account>,
    pub total: usize,
}

/// `spec.md` §4.2 `Discovery.list_resources` filters.
#[derive(Debug, Clone, Default)]
pub struct ResourceFilter {
    pub resource_type: Option<cloudpam_domain::ResourceType>,
    pub status: Option<cloudpam_domain::ResourceStatus>,
    pub linked_only: Option<bool>,
}
