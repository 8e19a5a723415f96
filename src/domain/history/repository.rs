//! History source interface
//!
//! The data layer behind every history listing. Implementations decide
//! visibility for the caller in [`RequestContext`] and report unknown
//! pipelines as [`DomainError::NotFound`](crate::domain::DomainError).

use async_trait::async_trait;

use super::model::{HistoryRecord, HistoryScope, SortOrder};
use crate::domain::{DomainResult, RequestContext};

#[async_trait]
pub trait HistorySource: Send + Sync {
    /// Number of records matching `scope`.
    async fn fetch_total_count(&self, ctx: &RequestContext, scope: &HistoryScope)
        -> DomainResult<u64>;

    /// Up to `page_size` records of `scope` starting at `offset` in `order`.
    /// An offset past the end yields an empty page.
    async fn fetch_page(
        &self,
        ctx: &RequestContext,
        scope: &HistoryScope,
        offset: u64,
        page_size: u64,
        order: SortOrder,
    ) -> DomainResult<Vec<HistoryRecord>>;

    /// Counter of the newest run of `pipeline`, `None` if it never ran.
    async fn latest_pipeline_counter(
        &self,
        ctx: &RequestContext,
        pipeline: &str,
    ) -> DomainResult<Option<u64>>;
}
