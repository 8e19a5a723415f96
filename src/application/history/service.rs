//! History listing service
//!
//! Every history listing follows the same flow: count the records in scope,
//! build a [`Pagination`] from the requested offset, then fetch that page.
//! HTTP handlers stay thin and delegate here.

use std::sync::Arc;

use tracing::debug;

use crate::domain::{
    DomainError, DomainResult, HistoryKind, HistoryRecord, HistoryScope, HistorySource,
    RequestContext, SortOrder,
};
use crate::shared::Pagination;

/// Page sizes per listing and the largest page a caller may ask for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistorySettings {
    pub pipeline_page_size: u64,
    pub stage_page_size: u64,
    pub job_page_size: u64,
    pub agent_job_page_size: u64,
    pub max_page_size: u64,
}

impl HistorySettings {
    pub fn page_size_for(&self, kind: HistoryKind) -> u64 {
        match kind {
            HistoryKind::Pipeline => self.pipeline_page_size,
            HistoryKind::Stage => self.stage_page_size,
            HistoryKind::Job => self.job_page_size,
            HistoryKind::AgentJobs => self.agent_job_page_size,
        }
    }

    /// Rejects sizes above `max_page_size`. Sizes `<= 0` are left to
    /// [`Pagination`].
    fn check_page_size(&self, page_size: i64) -> DomainResult<()> {
        if matches!(u64::try_from(page_size), Ok(size) if size > self.max_page_size) {
            return Err(DomainError::InvalidArgument(format!(
                "page size may not exceed {}, got {}",
                self.max_page_size, page_size
            )));
        }
        Ok(())
    }
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            pipeline_page_size: 10,
            stage_page_size: 10,
            job_page_size: 10,
            agent_job_page_size: 10,
            max_page_size: 300,
        }
    }
}

/// One page of a history listing
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryPage {
    pub pagination: Pagination,
    pub records: Vec<HistoryRecord>,
}

pub struct HistoryService {
    source: Arc<dyn HistorySource>,
    settings: HistorySettings,
}

impl HistoryService {
    pub fn new(source: Arc<dyn HistorySource>, settings: HistorySettings) -> Self {
        Self { source, settings }
    }

    pub fn settings(&self) -> &HistorySettings {
        &self.settings
    }

    /// Page of `scope` starting at `offset`, sized by the listing's
    /// configured page size. Out-of-range offsets are clamped.
    pub async fn load(
        &self,
        ctx: &RequestContext,
        scope: &HistoryScope,
        offset: i64,
        order: SortOrder,
    ) -> DomainResult<HistoryPage> {
        let page_size =
            i64::try_from(self.settings.page_size_for(scope.kind())).unwrap_or(i64::MAX);
        let total = self.source.fetch_total_count(ctx, scope).await?;
        let pagination = Pagination::page_starting_at(offset, total, page_size)?;

        self.fetch(ctx, scope, pagination, order).await
    }

    /// Page of `scope` by one-based page number with a caller-chosen size.
    pub async fn load_page_number(
        &self,
        ctx: &RequestContext,
        scope: &HistoryScope,
        page_number: i64,
        page_size: i64,
        order: SortOrder,
    ) -> DomainResult<HistoryPage> {
        self.settings.check_page_size(page_size)?;
        let total = self.source.fetch_total_count(ctx, scope).await?;
        let pagination = Pagination::page_by_number(page_number, total, page_size)?;

        self.fetch(ctx, scope, pagination, order).await
    }

    /// Newest record of `scope`, if any.
    pub async fn latest(
        &self,
        ctx: &RequestContext,
        scope: &HistoryScope,
    ) -> DomainResult<Option<HistoryRecord>> {
        let page = Pagination::ONE_ITEM;
        let records = self
            .source
            .fetch_page(
                ctx,
                scope,
                page.offset(),
                page.page_size(),
                SortOrder::Descending,
            )
            .await?;
        Ok(records.into_iter().next())
    }

    /// One-based page on which pipeline run `counter` appears when the
    /// pipeline history is listed newest first with `page_size` per page.
    ///
    /// Counters are assumed to run `1..=latest` without gaps: the page is
    /// derived from `latest - counter`, not from the stored runs. When runs
    /// are missing, the result is the page the counter would occupy in a
    /// gap-free history.
    pub async fn page_number_for_counter(
        &self,
        ctx: &RequestContext,
        pipeline: &str,
        counter: u64,
        page_size: i64,
    ) -> DomainResult<u64> {
        self.settings.check_page_size(page_size)?;
        let latest = self
            .source
            .latest_pipeline_counter(ctx, pipeline)
            .await?
            .ok_or_else(|| DomainError::not_found("Pipeline", "name", pipeline))?;

        if counter == 0 || counter > latest {
            return Err(DomainError::InvalidArgument(format!(
                "counter {} is outside 1..={} for pipeline '{}'",
                counter, latest, pipeline
            )));
        }

        let offset = i64::try_from(latest - counter).unwrap_or(i64::MAX);
        let pagination = Pagination::page_starting_at(offset, latest, page_size)?;
        Ok(pagination.page_number())
    }

    async fn fetch(
        &self,
        ctx: &RequestContext,
        scope: &HistoryScope,
        pagination: Pagination,
        order: SortOrder,
    ) -> DomainResult<HistoryPage> {
        debug!(
            request_id = %ctx.request_id,
            user = %ctx.username,
            "Loading {} offset={} page_size={} total={}",
            scope,
            pagination.offset(),
            pagination.page_size(),
            pagination.total()
        );

        let records = if pagination.total() == 0 {
            Vec::new()
        } else {
            self.source
                .fetch_page(
                    ctx,
                    scope,
                    pagination.offset(),
                    pagination.page_size(),
                    order,
                )
                .await?
        };

        Ok(HistoryPage {
            pagination,
            records,
        })
    }
}
