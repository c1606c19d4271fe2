use cloudpam_cidr::prefix_contains;
use cloudpam_domain::{Account, Pool};

use crate::types::{SearchEntityKind, SearchRequest, SearchResults};

use super::InMemoryStore;

impl InMemoryStore {
    /// `spec.md` §4.2 `Search(req)`: free-text substring plus structural CIDR filters, paged.
    pub(crate) fn search_impl(&self, req: &SearchRequest) -> SearchResults {
        let query = req.query.as_deref().map(str::to_lowercase);

        let mut pools: Vec<Pool> = if req.wants(SearchEntityKind::Pool) {
            self.pools
                .iter()
                .filter(|p| p.is_live())
                .filter(|p| pool_matches(p, query.as_deref(), req))
                .map(|p| p.clone())
                .collect()
        } else {
            Vec::new()
        };
        pools.sort_by_key(|p| p.id);

        let mut accounts: Vec<Account> = if req.wants(SearchEntityKind::Account) {
            self.accounts
                .iter()
                .filter(|a| a.is_live())
                .filter(|a| account_matches(a, query.as_deref()))
                .map(|a| a.clone())
                .collect()
        } else {
            Vec::new()
        };
        accounts.sort_by_key(|a| a.id);

        let total = pools.len() + accounts.len();
        let page_size = req.normalized_page_size();
        let start = req.page.saturating_mul(page_size);

        let (pools, accounts) = paginate(pools, accounts, start, page_size);
        SearchResults {
            pools,
            accounts,
            total,
        }
    }
}

fn pool_matches(pool: &Pool, query: Option<&str>, req: &SearchRequest) -> bool {
    if let Some(q) = query {
        let haystack = format!("{} {} {}", pool.name, pool.cidr, pool.description).to_lowercase();
        if !haystack.contains(q) {
            return false;
        }
    }
    if let Some(needle) = req.cidr_contains {
        if !prefix_contains(pool.cidr, needle) {
            return false;
        }
    }
    if let Some(container) = req.cidr_within {
        if !prefix_contains(container, pool.cidr) {
            return false;
        }
    }
    true
}

fn account_matches(account: &Account, query: Option<&str>) -> bool {
    match query {
        None => true,
        Some(q) => format!("{} {} {}", account.name, account.provider, account.key)
            .to_lowercase()
            .contains(q),
    }
}

/// Concatenates pools then accounts into one logical page (matching `spec.md`'s single `Search`
/// result across both entity kinds) and slices `[start, start+page_size)`.
fn paginate(pools: Vec<Pool>, accounts: Vec<Account>, start: usize, page_size: usize) -> (Vec<Pool>, Vec<Account>) {
    let pool_count = pools.len();
    let pool_start = start.min(pool_count);
    let pool_end = (start + page_size).min(pool_count);
    let page_pools = pools[pool_start..pool_end].to_vec();

    let remaining = page_size.saturating_sub(page_pools.len());
    let account_start = start.saturating_sub(pool_count).min(accounts.len());
    let account_end = (account_start + remaining).min(accounts.len());
    let page_accounts = accounts[account_start..account_end].to_vec();

    (page_pools, page_accounts)
}
