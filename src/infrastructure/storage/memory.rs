//! In-memory history store
//!
//! Backs the history listings for development, demos and tests. Runs can be
//! recorded at runtime or loaded from a JSON seed file.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Deserialize;
use tracing::info;

use crate::domain::{
    DomainError, DomainResult, HistoryRecord, HistoryScope, HistorySource, PipelineRun,
    RequestContext, SortOrder,
};

/// Seed file layout
#[derive(Debug, Default, Deserialize)]
pub struct HistorySeed {
    #[serde(default)]
    pub pipelines: Vec<PipelineRun>,
    /// Pipeline name -> users allowed to view it. Pipelines not listed are
    /// visible to everyone.
    #[serde(default)]
    pub viewers: HashMap<String, Vec<String>>,
}

pub struct InMemoryHistoryStore {
    /// Runs per pipeline, ordered by counter
    runs: DashMap<String, Vec<PipelineRun>>,
    viewers: DashMap<String, HashSet<String>>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self {
            runs: DashMap::new(),
            viewers: DashMap::new(),
        }
    }

    pub fn from_seed(seed: HistorySeed) -> Self {
        let store = Self::new();
        for run in seed.pipelines {
            store.record_run(run);
        }
        for (pipeline, users) in seed.viewers {
            store.restrict_viewers(pipeline, users);
        }
        store
    }

    pub fn from_seed_file(path: &Path) -> DomainResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            DomainError::Storage(format!("Failed to read seed file {}: {}", path.display(), e))
        })?;
        let seed: HistorySeed = serde_json::from_str(&raw).map_err(|e| {
            DomainError::Storage(format!("Invalid seed file {}: {}", path.display(), e))
        })?;

        let store = Self::from_seed(seed);
        info!(
            "Loaded {} runs of {} pipelines from {}",
            store.run_count(),
            store.runs.len(),
            path.display()
        );
        Ok(store)
    }

    /// Adds a run, replacing any earlier run with the same counter.
    pub fn record_run(&self, run: PipelineRun) {
        let mut runs = self.runs.entry(run.name.clone()).or_default();
        match runs.binary_search_by_key(&run.counter, |r| r.counter) {
            Ok(idx) => runs[idx] = run,
            Err(idx) => runs.insert(idx, run),
        }
    }

    /// Limits who may view `pipeline`.
    pub fn restrict_viewers<I, S>(&self, pipeline: impl Into<String>, users: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.viewers
            .insert(pipeline.into(), users.into_iter().map(Into::into).collect());
    }

    pub fn run_count(&self) -> usize {
        self.runs.iter().map(|e| e.value().len()).sum()
    }

    fn can_view(&self, ctx: &RequestContext, pipeline: &str) -> bool {
        self.viewers
            .get(pipeline)
            .map_or(true, |users| users.contains(&ctx.username))
    }

    fn visible_runs(&self, ctx: &RequestContext, pipeline: &str) -> DomainResult<Vec<PipelineRun>> {
        let runs = self
            .runs
            .get(pipeline)
            .ok_or_else(|| DomainError::not_found("Pipeline", "name", pipeline))?;

        if !self.can_view(ctx, pipeline) {
            return Err(DomainError::Forbidden(format!(
                "User '{}' does not have view permission on pipeline '{}'",
                ctx.username, pipeline
            )));
        }

        Ok(runs.value().clone())
    }

    /// All records of `scope`, oldest first.
    fn collect(&self, ctx: &RequestContext, scope: &HistoryScope) -> DomainResult<Vec<HistoryRecord>> {
        let mut records: Vec<HistoryRecord> = match scope {
            HistoryScope::Pipeline { pipeline } => self
                .visible_runs(ctx, pipeline)?
                .into_iter()
                .map(HistoryRecord::Pipeline)
                .collect(),
            HistoryScope::Stage { pipeline, stage } => self
                .visible_runs(ctx, pipeline)?
                .into_iter()
                .flat_map(|run| {
                    let counter = run.counter;
                    let name = run.name;
                    run.stages
                        .into_iter()
                        .filter(|s| &s.name == stage)
                        .map(move |s| HistoryRecord::Stage {
                            pipeline_name: name.clone(),
                            pipeline_counter: counter,
                            stage: s,
                        })
                })
                .collect(),
            HistoryScope::Job {
                pipeline,
                stage,
                job,
            } => self
                .visible_runs(ctx, pipeline)?
                .into_iter()
                .flat_map(|run| job_records(run, |s, j| &s.name == stage && &j.name == job))
                .collect(),
            HistoryScope::AgentJobs { agent_uuid } => {
                let pipelines: Vec<String> = self
                    .runs
                    .iter()
                    .map(|e| e.key().clone())
                    .filter(|name| self.can_view(ctx, name))
                    .collect();

                let mut records = Vec::new();
                for pipeline in pipelines {
                    let runs = self
                        .runs
                        .get(&pipeline)
                        .map(|r| r.value().clone())
                        .unwrap_or_default();
                    for run in runs {
                        records.extend(job_records(run, |_, j| {
                            j.agent_uuid.as_deref() == Some(agent_uuid.as_str())
                        }));
                    }
                }
                records.sort_by(|a, b| {
                    a.scheduled_at()
                        .cmp(&b.scheduled_at())
                        .then_with(|| a.pipeline_name().cmp(b.pipeline_name()))
                        .then_with(|| a.sort_key().cmp(&b.sort_key()))
                });
                return Ok(records);
            }
        };

        records.sort_by_key(|r| r.sort_key());
        Ok(records)
    }
}

fn job_records<F>(run: PipelineRun, keep: F) -> Vec<HistoryRecord>
where
    F: Fn(&crate::domain::StageRun, &crate::domain::JobRun) -> bool,
{
    let mut records = Vec::new();
    for stage in &run.stages {
        for job in &stage.jobs {
            if keep(stage, job) {
                records.push(HistoryRecord::Job {
                    pipeline_name: run.name.clone(),
                    pipeline_counter: run.counter,
                    stage_name: stage.name.clone(),
                    stage_counter: stage.counter,
                    job: job.clone(),
                });
            }
        }
    }
    records
}

impl Default for InMemoryHistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HistorySource for InMemoryHistoryStore {
    async fn fetch_total_count(
        &self,
        ctx: &RequestContext,
        scope: &HistoryScope,
    ) -> DomainResult<u64> {
        Ok(self.collect(ctx, scope)?.len() as u64)
    }

    async fn fetch_page(
        &self,
        ctx: &RequestContext,
        scope: &HistoryScope,
        offset: u64,
        page_size: u64,
        order: SortOrder,
    ) -> DomainResult<Vec<HistoryRecord>> {
        let mut records = self.collect(ctx, scope)?;
        if order == SortOrder::Descending {
            records.reverse();
        }

        let skip = usize::try_from(offset).unwrap_or(usize::MAX);
        let take = usize::try_from(page_size).unwrap_or(usize::MAX);
        Ok(records.into_iter().skip(skip).take(take).collect())
    }

    async fn latest_pipeline_counter(
        &self,
        ctx: &RequestContext,
        pipeline: &str,
    ) -> DomainResult<Option<u64>> {
        if !self.runs.contains_key(pipeline) {
            return Ok(None);
        }
        Ok(self
            .visible_runs(ctx, pipeline)?
            .last()
            .map(|run| run.counter))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use chrono::{DateTime, Duration, TimeZone, Utc};

    use super::*;
    use crate::domain::{JobRun, RunResult, StageRun};

    fn at(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    fn run(pipeline: &str, counter: u64, agent: &str) -> PipelineRun {
        let t = at(counter as i64 * 10);
        PipelineRun::new(pipeline, counter, t).with_stage(
            StageRun::new("build", 1, t)
                .with_result(RunResult::Passed)
                .with_job(JobRun::new("compile", t).on_agent(agent)),
        )
    }

    fn store_with(pipeline: &str, runs: u64) -> InMemoryHistoryStore {
        let store = InMemoryHistoryStore::new();
        for counter in 1..=runs {
            store.record_run(run(pipeline, counter, "agent-1"));
        }
        store
    }

    fn counters(records: &[HistoryRecord]) -> Vec<u64> {
        records.iter().map(|r| r.sort_key().0).collect()
    }

    #[tokio::test]
    async fn pipeline_page_is_newest_first() {
        let store = store_with("up42", 7);
        let ctx = RequestContext::anonymous();
        let scope = HistoryScope::pipeline("up42");

        assert_eq!(store.fetch_total_count(&ctx, &scope).await.unwrap(), 7);

        let page = store
            .fetch_page(&ctx, &scope, 0, 3, SortOrder::Descending)
            .await
            .unwrap();
        assert_eq!(counters(&page), vec![7, 6, 5]);

        let page = store
            .fetch_page(&ctx, &scope, 1, 3, SortOrder::Descending)
            .await
            .unwrap();
        assert_eq!(counters(&page), vec![6, 5, 4]);

        let page = store
            .fetch_page(&ctx, &scope, 5, 3, SortOrder::Descending)
            .await
            .unwrap();
        assert_eq!(counters(&page), vec![2, 1]);
    }

    #[tokio::test]
    async fn ascending_order_is_oldest_first() {
        let store = store_with("up42", 4);
        let page = store
            .fetch_page(
                &RequestContext::anonymous(),
                &HistoryScope::pipeline("up42"),
                0,
                2,
                SortOrder::Ascending,
            )
            .await
            .unwrap();
        assert_eq!(counters(&page), vec![1, 2]);
    }

    #[tokio::test]
    async fn offset_past_end_gives_empty_page() {
        let store = store_with("up42", 7);
        let page = store
            .fetch_page(
                &RequestContext::anonymous(),
                &HistoryScope::pipeline("up42"),
                20,
                3,
                SortOrder::Descending,
            )
            .await
            .unwrap();
        assert!(page.is_empty());
    }

    #[tokio::test]
    async fn unknown_pipeline_is_not_found() {
        let store = InMemoryHistoryStore::new();
        let err = store
            .fetch_total_count(&RequestContext::anonymous(), &HistoryScope::pipeline("nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn stage_reruns_are_listed_separately() {
        let store = InMemoryHistoryStore::new();
        store.record_run(
            PipelineRun::new("up42", 1, at(0))
                .with_stage(StageRun::new("build", 1, at(0)).with_result(RunResult::Failed))
                .with_stage(StageRun::new("build", 2, at(5)).with_result(RunResult::Passed))
                .with_stage(StageRun::new("deploy", 1, at(6))),
        );
        store.record_run(
            PipelineRun::new("up42", 2, at(10)).with_stage(StageRun::new("build", 1, at(10))),
        );

        let page = store
            .fetch_page(
                &RequestContext::anonymous(),
                &HistoryScope::stage("up42", "build"),
                0,
                10,
                SortOrder::Descending,
            )
            .await
            .unwrap();
        let keys: Vec<(u64, u32)> = page.iter().map(|r| (r.sort_key().0, r.sort_key().1)).collect();
        assert_eq!(keys, vec![(2, 1), (1, 2), (1, 1)]);
    }

    #[tokio::test]
    async fn job_scope_matches_stage_and_job_names() {
        let store = store_with("up42", 3);
        store.record_run(
            PipelineRun::new("up42", 4, at(40)).with_stage(
                StageRun::new("build", 1, at(40)).with_job(JobRun::new("lint", at(40))),
            ),
        );
        let ctx = RequestContext::anonymous();

        let total = store
            .fetch_total_count(&ctx, &HistoryScope::job("up42", "build", "compile"))
            .await
            .unwrap();
        assert_eq!(total, 3);

        let total = store
            .fetch_total_count(&ctx, &HistoryScope::job("up42", "build", "lint"))
            .await
            .unwrap();
        assert_eq!(total, 1);
    }

    #[tokio::test]
    async fn agent_history_spans_pipelines_and_skips_hidden_ones() {
        let store = InMemoryHistoryStore::new();
        store.record_run(run("up42", 1, "agent-1"));
        store.record_run(run("up42", 2, "agent-2"));
        store.record_run(run("downstream", 1, "agent-1"));
        store.record_run(run("secret", 1, "agent-1"));
        store.restrict_viewers("secret", ["admin"]);

        let ctx = RequestContext::for_user("bob");
        let page = store
            .fetch_page(&ctx, &HistoryScope::agent_jobs("agent-1"), 0, 10, SortOrder::Ascending)
            .await
            .unwrap();
        let pipelines: Vec<&str> = page.iter().map(|r| r.pipeline_name()).collect();
        assert_eq!(pipelines, vec!["downstream", "up42"]);

        let admin = RequestContext::for_user("admin");
        let total = store
            .fetch_total_count(&admin, &HistoryScope::agent_jobs("agent-1"))
            .await
            .unwrap();
        assert_eq!(total, 3);
    }

    #[tokio::test]
    async fn restricted_pipeline_is_forbidden_for_other_users() {
        let store = store_with("secret", 2);
        store.restrict_viewers("secret", ["alice"]);

        let err = store
            .fetch_total_count(&RequestContext::for_user("bob"), &HistoryScope::pipeline("secret"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));

        let total = store
            .fetch_total_count(&RequestContext::for_user("alice"), &HistoryScope::pipeline("secret"))
            .await
            .unwrap();
        assert_eq!(total, 2);
    }

    #[tokio::test]
    async fn record_run_replaces_same_counter() {
        let store = store_with("up42", 2);
        store.record_run(PipelineRun::new("up42", 2, at(99)).triggered_by("changes"));
        assert_eq!(store.run_count(), 2);

        let latest = store
            .latest_pipeline_counter(&RequestContext::anonymous(), "up42")
            .await
            .unwrap();
        assert_eq!(latest, Some(2));
    }

    #[tokio::test]
    async fn latest_counter_of_unknown_pipeline_is_none() {
        let store = InMemoryHistoryStore::new();
        let latest = store
            .latest_pipeline_counter(&RequestContext::anonymous(), "nope")
            .await
            .unwrap();
        assert_eq!(latest, None);
    }

    #[test]
    fn loads_seed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "pipelines": [
                    {{"name": "up42", "counter": 1, "scheduled_at": "2024-03-01T10:00:00Z"}},
                    {{"name": "up42", "counter": 2, "scheduled_at": "2024-03-01T11:00:00Z"}}
                ],
                "viewers": {{"up42": ["alice"]}}
            }}"#
        )
        .unwrap();

        let store = InMemoryHistoryStore::from_seed_file(file.path()).unwrap();
        assert_eq!(store.run_count(), 2);
        assert!(store.can_view(&RequestContext::for_user("alice"), "up42"));
        assert!(!store.can_view(&RequestContext::for_user("bob"), "up42"));
    }

    #[test]
    fn malformed_seed_file_is_a_storage_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        let err = InMemoryHistoryStore::from_seed_file(file.path()).err().unwrap();
        assert!(matches!(err, DomainError::Storage(_)));
    }

    #[tokio::test]
    async fn bundled_fixture_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/seed.json");
        let store = InMemoryHistoryStore::from_seed_file(&path).unwrap();
        assert_eq!(store.run_count(), 28);

        let ctx = RequestContext::anonymous();
        let total = store
            .fetch_total_count(&ctx, &HistoryScope::pipeline("up42"))
            .await
            .unwrap();
        assert_eq!(total, 23);

        let err = store
            .fetch_total_count(&ctx, &HistoryScope::pipeline("deploy-prod"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
    }
}
