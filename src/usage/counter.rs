// Access Counting

use super::merge::{apply_threshold, merge};
use super::schema_stats::DEFAULT_RETENTION_DAYS;
use super::source::{AccessCountSource, ProgressReporter, ProgressSink, ScopedProgress};
use crate::error::Result;
use crate::observability::{record_origin_fetch, FetchOutcome};
use crate::types::{AccessOrigin, AccessRecord, FilterCriteria, SourceMode, UsageReport};
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

const PROGRESS_TOTAL: u64 = 100;

/// Runs access count fetches and reconciles their results
///
/// Single-origin runs fail fast. `Both` runs degrade a failed origin into a
/// warning and an empty contribution.
pub struct UsageCounter {
    schema_stats: Option<Arc<dyn AccessCountSource>>,
    audit_log: Option<Arc<dyn AccessCountSource>>,
    retention_days: u32,
}

impl UsageCounter {
    /// Creates a counter with no sources configured
    pub fn new() -> Self {
        Self {
            schema_stats: None,
            audit_log: None,
            retention_days: DEFAULT_RETENTION_DAYS,
        }
    }

    /// Registers a source under the origin it reports
    pub fn with_source(mut self, source: Arc<dyn AccessCountSource>) -> Self {
        match source.origin() {
            AccessOrigin::SchemaStats => self.schema_stats = Some(source),
            AccessOrigin::AuditLog => self.audit_log = Some(source),
        }
        self
    }

    /// Sets how many days of history the schema statistics origin keeps
    pub fn with_retention_days(mut self, days: u32) -> Self {
        self.retention_days = days;
        self
    }

    pub fn retention_days(&self) -> u32 {
        self.retention_days
    }

    fn source(&self, origin: AccessOrigin) -> Option<&Arc<dyn AccessCountSource>> {
        match origin {
            AccessOrigin::SchemaStats => self.schema_stats.as_ref(),
            AccessOrigin::AuditLog => self.audit_log.as_ref(),
        }
    }

    /// Counts table accesses in `project_id` using the origins `mode` selects
    ///
    /// Callers must check [`UsageReport::warnings`] even on success.
    pub async fn count_access(
        &self,
        project_id: &str,
        criteria: &FilterCriteria,
        mode: SourceMode,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<UsageReport> {
        criteria.validate()?;

        let mut warnings = Vec::new();
        let window = criteria.window_days();
        if window > i64::from(self.retention_days) {
            warnings.push(format!(
                "INFORMATION_SCHEMA keeps only {} days of job history; \
                 requested {} days, older data is not included",
                self.retention_days, window
            ));
        }

        info!(project = project_id, ?mode, days = window, "Counting table accesses");

        let reporter = ProgressReporter::new(progress, PROGRESS_TOTAL);
        let outcomes = match mode {
            SourceMode::Both => {
                let half = PROGRESS_TOTAL / 2;
                let schema_progress = reporter.scoped(AccessOrigin::SchemaStats.name(), 0, half);
                let audit_progress = reporter.scoped(AccessOrigin::AuditLog.name(), half, half);

                let (schema, audit) = tokio::join!(
                    self.fetch_origin(
                        AccessOrigin::SchemaStats,
                        project_id,
                        criteria,
                        &schema_progress
                    ),
                    self.fetch_origin(
                        AccessOrigin::AuditLog,
                        project_id,
                        criteria,
                        &audit_progress
                    ),
                );
                vec![(AccessOrigin::SchemaStats, schema), (AccessOrigin::AuditLog, audit)]
            }
            single => {
                let origin = single.origins()[0];
                let scope = reporter.scoped(origin.name(), 0, PROGRESS_TOTAL);
                let outcome = self.fetch_origin(origin, project_id, criteria, &scope).await;
                vec![(origin, outcome)]
            }
        };

        let mut raw: BTreeMap<AccessOrigin, Vec<AccessRecord>> = BTreeMap::new();
        for (origin, outcome) in outcomes {
            let records = match outcome {
                None => {
                    warn!(%origin, "No source configured for origin");
                    warnings.push(format!("No {} source configured; skipped", origin));
                    Vec::new()
                }
                Some(Ok(records)) => {
                    record_origin_fetch(origin, FetchOutcome::Success);
                    records
                }
                Some(Err(e)) if mode.is_single() || !e.is_source_failure() => {
                    record_origin_fetch(origin, FetchOutcome::Failed);
                    return Err(e);
                }
                Some(Err(e)) => {
                    warn!(%origin, error = %e, "Access count fetch failed, continuing without it");
                    record_origin_fetch(origin, FetchOutcome::Degraded);
                    warnings.push(format!("Failed to fetch access counts from {}: {}", origin, e));
                    Vec::new()
                }
            };
            raw.insert(origin, records);
        }

        let merged = merge(raw.values().map(Vec::as_slice));
        let merged_results = apply_threshold(&merged, criteria);
        let per_origin_results = raw
            .into_iter()
            .map(|(origin, records)| (origin, apply_threshold(&records, criteria)))
            .collect();

        reporter.report(PROGRESS_TOTAL, "Done");

        let (start_date, end_date) = criteria.effective_range(Utc::now())?;
        info!(
            project = project_id,
            tables = merged_results.len(),
            warnings = warnings.len(),
            "Access counting complete"
        );

        Ok(UsageReport {
            start_date,
            end_date,
            project_id: project_id.to_string(),
            per_origin_results,
            merged_results,
            warnings,
        })
    }

    /// Fetches one origin, `None` if no source is configured for it
    async fn fetch_origin(
        &self,
        origin: AccessOrigin,
        project_id: &str,
        criteria: &FilterCriteria,
        progress: &ScopedProgress<'_>,
    ) -> Option<Result<Vec<AccessRecord>>> {
        let source = self.source(origin)?;
        Some(source.fetch(project_id, criteria, progress.as_sink()).await)
    }
}

impl Default for UsageCounter {
    fn default() -> Self {
        Self::new()
    }
}
