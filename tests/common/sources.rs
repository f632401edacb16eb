// Scripted access count collaborators for usage integration tests

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tablescope::usage::{
    AccessCountSource, AuditLogReader, JobsQueryRunner, ProgressSink, SchemaStatsRow,
};
use tablescope::{AccessOrigin, AccessRecord, FilterCriteria, Result, TablescopeError};

/// Access count source that answers after an optional delay and records the
/// criteria it was called with.
pub struct ScriptedSource {
    origin: AccessOrigin,
    response: Mutex<Option<Result<Vec<AccessRecord>>>>,
    delay: Duration,
    seen: Mutex<Vec<FilterCriteria>>,
}

impl ScriptedSource {
    pub fn ok(origin: AccessOrigin, records: Vec<AccessRecord>) -> Self {
        Self::with_response(origin, Ok(records))
    }

    pub fn err(origin: AccessOrigin, error: TablescopeError) -> Self {
        Self::with_response(origin, Err(error))
    }

    fn with_response(origin: AccessOrigin, response: Result<Vec<AccessRecord>>) -> Self {
        Self {
            origin,
            response: Mutex::new(Some(response)),
            delay: Duration::ZERO,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn seen(&self) -> Vec<FilterCriteria> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl AccessCountSource for ScriptedSource {
    fn origin(&self) -> AccessOrigin {
        self.origin
    }

    async fn fetch(
        &self,
        _project_id: &str,
        criteria: &FilterCriteria,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<Vec<AccessRecord>> {
        self.seen.lock().unwrap().push(criteria.clone());

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let Some(sink) = progress {
            sink.report(1, 1, "scripted");
        }

        let response = self.response.lock().unwrap().take();
        response.unwrap_or_else(|| Err(TablescopeError::Internal("fetched twice".into())))
    }
}

/// Jobs query runner returning fixed rows
pub struct StaticJobsRunner {
    rows: Vec<SchemaStatsRow>,
    queries: Mutex<Vec<String>>,
}

impl StaticJobsRunner {
    pub fn new(rows: Vec<SchemaStatsRow>) -> Self {
        Self {
            rows,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobsQueryRunner for StaticJobsRunner {
    async fn run(&self, sql: &str) -> Result<Vec<SchemaStatsRow>> {
        self.queries.lock().unwrap().push(sql.to_string());
        Ok(self.rows.clone())
    }
}

/// Audit log reader that is rate limited a fixed number of times before
/// answering.
pub struct FlakyLogReader {
    rate_limited: AtomicUsize,
    resource_names: Vec<String>,
    calls: AtomicUsize,
}

impl FlakyLogReader {
    pub fn new(rate_limited: usize, resource_names: Vec<String>) -> Self {
        Self {
            rate_limited: AtomicUsize::new(rate_limited),
            resource_names,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuditLogReader for FlakyLogReader {
    async fn list_resource_names(&self, _project_id: &str, _filter: &str) -> Result<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let remaining = self.rate_limited.load(Ordering::SeqCst);
        if remaining > 0 {
            self.rate_limited.store(remaining - 1, Ordering::SeqCst);
            return Err(TablescopeError::RateLimited("ReadRequestsPerMinutePerProject".into()));
        }

        Ok(self.resource_names.clone())
    }
}

/// Resource name of a table as it appears in audit log entries
pub fn resource_name(project: &str, dataset: &str, table: &str) -> String {
    format!("projects/{}/datasets/{}/tables/{}", project, dataset, table)
}

pub fn row(project: &str, dataset: &str, table: &str, access_count: u64) -> SchemaStatsRow {
    SchemaStatsRow {
        project_id: project.to_string(),
        dataset_id: dataset.to_string(),
        table_id: table.to_string(),
        access_count,
    }
}
