//! Access counts from Cloud Audit Logs.
//!
//! Every `tableDataRead` entry in the project's Data Access audit log counts
//! as one access of the table named by its resource. Data Access logging is
//! opt-in, so an empty result usually means it was never enabled.

use super::source::{AccessCountSource, ProgressSink};
use crate::error::{Result, TablescopeError};
use crate::resilience::{RetryConfig, RetryExecutor};
use crate::types::{AccessOrigin, AccessRecord, FilterCriteria, TableIdentifier};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, warn};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Reads matching entries from Cloud Logging.
#[async_trait]
pub trait AuditLogReader: Send + Sync {
    /// Returns the resource name of every entry matching `filter`, one per
    /// entry. Entries without a resource name yield an empty string.
    async fn list_resource_names(&self, project_id: &str, filter: &str) -> Result<Vec<String>>;
}

#[async_trait]
impl<T: AuditLogReader + ?Sized> AuditLogReader for Arc<T> {
    async fn list_resource_names(&self, project_id: &str, filter: &str) -> Result<Vec<String>> {
        (**self).list_resource_names(project_id, filter).await
    }
}

/// Builds the Cloud Logging filter for table data reads in the window.
pub fn build_log_filter(criteria: &FilterCriteria, now: DateTime<Utc>) -> Result<String> {
    let mut filters = vec![
        r#"resource.type="bigquery_dataset""#.to_string(),
        "protoPayload.metadata.tableDataRead:*".to_string(),
    ];

    match criteria.explicit_range() {
        Some((start, end)) => {
            filters.push(format!(r#"timestamp>="{}""#, start.format(TIMESTAMP_FORMAT)));
            filters.push(format!(r#"timestamp<"{}""#, end.format(TIMESTAMP_FORMAT)));
        }
        None => {
            let start = criteria.window_start(now)?;
            filters.push(format!(r#"timestamp>="{}""#, start.format(TIMESTAMP_FORMAT)));
        }
    }

    Ok(filters.join(" AND "))
}

fn resource_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(
                r"projects/(?P<project_id>[^/]+)/datasets/(?P<dataset_id>[^/]+)/tables/(?P<table_id>[^/]+)",
            )
            .ok()
        })
        .as_ref()
}

/// Extracts the table from a `projects/P/datasets/D/tables/T` resource name.
pub fn parse_resource_name(resource_name: &str) -> Option<TableIdentifier> {
    let caps = resource_pattern()?.captures(resource_name)?;
    TableIdentifier::new(&caps["project_id"], &caps["dataset_id"], &caps["table_id"]).ok()
}

/// Counts accesses per table, most accessed first.
///
/// Tables with equal counts keep the order in which they were first seen.
pub fn aggregate_access_events<I>(tables: I) -> Vec<AccessRecord>
where
    I: IntoIterator<Item = TableIdentifier>,
{
    let mut index: HashMap<TableIdentifier, usize> = HashMap::new();
    let mut records: Vec<AccessRecord> = Vec::new();

    for table in tables {
        match index.get(&table) {
            Some(&slot) => records[slot].access_count += 1,
            None => {
                index.insert(table.clone(), records.len());
                records.push(AccessRecord::for_table(&table, 1, AccessOrigin::AuditLog));
            }
        }
    }

    records.sort_by(|a, b| b.access_count.cmp(&a.access_count));
    records
}

/// [`AccessCountSource`] over Cloud Audit Logs.
pub struct AuditLogSource<R> {
    reader: R,
    retry: RetryExecutor,
}

impl<R: AuditLogReader> AuditLogSource<R> {
    /// Creates a source retrying rate-limited reads with the default policy.
    pub fn new(reader: R) -> Self {
        Self::with_retry(reader, RetryConfig::default())
    }

    pub fn with_retry(reader: R, retry: RetryConfig) -> Self {
        Self {
            reader,
            retry: RetryExecutor::new(retry),
        }
    }

    async fn read_with_retry(&self, project_id: &str, filter: &str) -> Result<Vec<String>> {
        let attempts = self.retry.config().max_attempts;

        self.retry
            .execute_if(
                |e| matches!(e, TablescopeError::RateLimited(_)),
                || self.reader.list_resource_names(project_id, filter),
            )
            .await
            .map_err(|e| match e {
                TablescopeError::RateLimited(message) => TablescopeError::Network(format!(
                    "Cloud Logging quota still exhausted after {} attempts: {}",
                    attempts, message
                )),
                other => other,
            })
    }
}

#[async_trait]
impl<R: AuditLogReader> AccessCountSource for AuditLogSource<R> {
    fn origin(&self) -> AccessOrigin {
        AccessOrigin::AuditLog
    }

    async fn fetch(
        &self,
        project_id: &str,
        criteria: &FilterCriteria,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<Vec<AccessRecord>> {
        let matcher = criteria.matcher()?;
        let filter = build_log_filter(criteria, Utc::now())?;
        debug!(project = project_id, filter = %filter, "Reading audit log entries");

        let names = self.read_with_retry(project_id, &filter).await?;
        let total = names.len() as u64;
        let mut tables = Vec::new();

        for (i, name) in names.iter().enumerate() {
            match parse_resource_name(name) {
                Some(table) if matcher.matches(table.dataset_id(), table.table_id()) => {
                    tables.push(table)
                }
                Some(_) => {}
                None => debug!(resource = %name, "Skipping unparseable resource name"),
            }
            if let Some(sink) = progress {
                sink.report(
                    i as u64 + 1,
                    total,
                    &format!("Processing log entry {}/{}", i + 1, total),
                );
            }
        }

        if tables.is_empty() {
            warn!(
                project = project_id,
                "No table reads found in audit logs; Data Access audit logging may not be enabled"
            );
        }

        let records = aggregate_access_events(tables);
        info!(
            project = project_id,
            entries = total,
            tables = records.len(),
            "Fetched access counts from audit logs"
        );
        Ok(records)
    }
}
