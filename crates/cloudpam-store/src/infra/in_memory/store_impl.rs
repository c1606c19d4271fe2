use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cloudpam_context::RequestContext;
use cloudpam_errors::CoreResult;

use crate::store::Store;
use crate::types::SearchResults;
use crate::SearchRequest;

use super::InMemoryStore;

#[async_trait]
impl Store for InMemoryStore {
    async fn search(&self, _ctx: &RequestContext, req: SearchRequest) -> CoreResult<SearchResults> {
        Ok(self.search_impl(&req))
    }

    async fn ping(&self) -> CoreResult<()> {
        Ok(())
    }

    async fn close(&self) -> CoreResult<()> {
        Ok(())
    }

    fn now(&self) -> DateTime<Utc> {
        InMemoryStore::now(self)
    }
}
