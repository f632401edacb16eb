//! Access counts from BigQuery job history.
//!
//! Counts how often each table was referenced by completed query jobs, using
//! the `INFORMATION_SCHEMA.JOBS_BY_PROJECT` view of the configured region.
//! Job history is only kept for a limited time (see
//! [`DEFAULT_RETENTION_DAYS`]); older windows silently return less data.

use super::source::{AccessCountSource, ProgressSink};
use crate::error::Result;
use crate::types::{AccessOrigin, AccessRecord, FilterCriteria};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Days of job history `INFORMATION_SCHEMA` keeps.
pub const DEFAULT_RETENTION_DAYS: u32 = 180;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One aggregated row of the jobs query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaStatsRow {
    pub project_id: String,
    pub dataset_id: String,
    pub table_id: String,
    pub access_count: u64,
}

/// Executes the jobs query against BigQuery.
#[async_trait]
pub trait JobsQueryRunner: Send + Sync {
    /// Runs `sql` and returns every result row.
    async fn run(&self, sql: &str) -> Result<Vec<SchemaStatsRow>>;
}

#[async_trait]
impl<T: JobsQueryRunner + ?Sized> JobsQueryRunner for Arc<T> {
    async fn run(&self, sql: &str) -> Result<Vec<SchemaStatsRow>> {
        (**self).run(sql).await
    }
}

/// Builds the per-table reference count query for `project_id`.
pub fn build_jobs_query(project_id: &str, criteria: &FilterCriteria, region: &str) -> String {
    let time_filter = match criteria.explicit_range() {
        Some((start, end)) => format!(
            "AND creation_time >= TIMESTAMP('{}')\n  AND creation_time < TIMESTAMP('{}')",
            start.format(TIMESTAMP_FORMAT),
            end.format(TIMESTAMP_FORMAT)
        ),
        None => format!(
            "AND creation_time >= TIMESTAMP_SUB(CURRENT_TIMESTAMP(), INTERVAL {} DAY)",
            criteria.days
        ),
    };

    let dataset_filter = criteria
        .dataset_filter
        .as_deref()
        .map(|dataset| format!("\n  AND ref.dataset_id = {}", string_literal(dataset)))
        .unwrap_or_default();

    let table_filter = criteria
        .table_pattern
        .as_deref()
        .map(|pattern| {
            format!(
                "\n  AND REGEXP_CONTAINS(ref.table_id, {})",
                string_literal(pattern)
            )
        })
        .unwrap_or_default();

    format!(
        "SELECT\n  ref.project_id,\n  ref.dataset_id,\n  ref.table_id,\n  COUNT(*) AS access_count\n\
         FROM `{project}.region-{region}.INFORMATION_SCHEMA.JOBS_BY_PROJECT`,\n\
         UNNEST(referenced_tables) AS ref\n\
         WHERE job_type = 'QUERY'\n  AND state = 'DONE'\n  {time_filter}{dataset_filter}{table_filter}\n\
         GROUP BY ref.project_id, ref.dataset_id, ref.table_id\n\
         ORDER BY access_count DESC",
        project = project_id.replace('`', ""),
        region = region.replace('`', ""),
    )
}

/// Quotes a GoogleSQL string literal.
fn string_literal(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// Converts query rows into records, reporting progress per row.
pub fn records_from_rows(
    rows: Vec<SchemaStatsRow>,
    progress: Option<&dyn ProgressSink>,
) -> Vec<AccessRecord> {
    let total = rows.len() as u64;

    rows.into_iter()
        .enumerate()
        .map(|(i, row)| {
            if let Some(sink) = progress {
                sink.report(i as u64 + 1, total, &format!("Processing row {}/{}", i + 1, total));
            }
            AccessRecord::new(
                row.project_id,
                row.dataset_id,
                row.table_id,
                row.access_count,
                AccessOrigin::SchemaStats,
            )
        })
        .collect()
}

/// [`AccessCountSource`] over `INFORMATION_SCHEMA.JOBS_BY_PROJECT`.
pub struct SchemaStatsSource<R> {
    runner: R,
    region: String,
}

impl<R: JobsQueryRunner> SchemaStatsSource<R> {
    pub fn new(runner: R, region: impl Into<String>) -> Self {
        Self {
            runner,
            region: region.into(),
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }
}

#[async_trait]
impl<R: JobsQueryRunner> AccessCountSource for SchemaStatsSource<R> {
    fn origin(&self) -> AccessOrigin {
        AccessOrigin::SchemaStats
    }

    async fn fetch(
        &self,
        project_id: &str,
        criteria: &FilterCriteria,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<Vec<AccessRecord>> {
        let sql = build_jobs_query(project_id, criteria, &self.region);
        debug!(project = project_id, region = %self.region, "Running jobs query");

        let rows = self.runner.run(&sql).await?;
        let records = records_from_rows(rows, progress);

        info!(
            project = project_id,
            tables = records.len(),
            "Fetched access counts from INFORMATION_SCHEMA"
        );
        Ok(records)
    }
}
