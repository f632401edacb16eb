//! Core type definitions for tablescope.
//!
//! This module contains the data types shared by the lineage and usage
//! halves of the crate.
//!
//! # Key Types
//!
//! - [`TableIdentifier`]: a BigQuery table, identified by `project.dataset.table`
//! - [`LeafTable`]: a table with no downstream consumer in scope
//! - [`AccessRecord`]: an access count observed by one [`AccessOrigin`]
//! - [`FilterCriteria`]: time window and filters for access counting
//! - [`UsageReport`]: the reconciled result of an access count run
//!
//! # Examples
//!
//! ```rust
//! use tablescope::types::TableIdentifier;
//!
//! let table: TableIdentifier = "sales.raw.orders".parse().unwrap();
//! assert_eq!(table.fqn(), "sales.raw.orders");
//! assert_eq!(table.lineage_name(), "bigquery:sales.raw.orders");
//!
//! let sharded = TableIdentifier::parse_lineage_name("bigquery:sharded:sales.raw.events_").unwrap();
//! assert_eq!(sharded.table_id(), "events_");
//! assert!(TableIdentifier::parse_lineage_name("spanner:sales.raw.orders").is_none());
//! ```

use crate::error::{Result, TablescopeError};
use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

const LINEAGE_PREFIX: &str = "bigquery:";
const SHARDED_PREFIX: &str = "sharded:";

/// A BigQuery table.
///
/// Always three non-empty segments; equality and hashing use the triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "TableParts")]
pub struct TableIdentifier {
    project_id: String,
    dataset_id: String,
    table_id: String,
}

#[derive(Deserialize)]
struct TableParts {
    project_id: String,
    dataset_id: String,
    table_id: String,
}

impl TryFrom<TableParts> for TableIdentifier {
    type Error = TablescopeError;

    fn try_from(parts: TableParts) -> Result<Self> {
        TableIdentifier::new(parts.project_id, parts.dataset_id, parts.table_id)
    }
}

impl TableIdentifier {
    /// Creates a table identifier, rejecting empty or dotted segments.
    pub fn new(
        project_id: impl Into<String>,
        dataset_id: impl Into<String>,
        table_id: impl Into<String>,
    ) -> Result<Self> {
        let id = Self {
            project_id: project_id.into(),
            dataset_id: dataset_id.into(),
            table_id: table_id.into(),
        };

        for segment in [&id.project_id, &id.dataset_id, &id.table_id] {
            if segment.is_empty() || segment.contains('.') {
                return Err(TablescopeError::InvalidIdentifier(format!(
                    "{}.{}.{}",
                    id.project_id, id.dataset_id, id.table_id
                )));
            }
        }

        Ok(id)
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn dataset_id(&self) -> &str {
        &self.dataset_id
    }

    pub fn table_id(&self) -> &str {
        &self.table_id
    }

    /// Canonical `project.dataset.table` name, the identity and dedup key.
    pub fn fqn(&self) -> String {
        format!("{}.{}.{}", self.project_id, self.dataset_id, self.table_id)
    }

    /// Entity name used by the lineage service.
    pub fn lineage_name(&self) -> String {
        format!("{}{}", LINEAGE_PREFIX, self.fqn())
    }

    /// Parses a lineage entity name of the form
    /// `bigquery:[sharded:]project.dataset.table`.
    ///
    /// Returns `None` for anything that is not a three-segment BigQuery table,
    /// which is how non-table lineage entities get skipped.
    pub fn parse_lineage_name(name: &str) -> Option<Self> {
        let path = name.strip_prefix(LINEAGE_PREFIX)?;
        let path = path.strip_prefix(SHARDED_PREFIX).unwrap_or(path);
        path.parse().ok()
    }
}

impl fmt::Display for TableIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.project_id, self.dataset_id, self.table_id)
    }
}

impl std::str::FromStr for TableIdentifier {
    type Err = TablescopeError;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split('.').collect();
        match parts.as_slice() {
            [project, dataset, table] => TableIdentifier::new(*project, *dataset, *table),
            _ => Err(TablescopeError::InvalidIdentifier(s.to_string())),
        }
    }
}

/// A table with no downstream consumer inside the allowed project scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeafTable {
    /// The leaf table.
    pub table: TableIdentifier,
    /// Number of upstream tables, counted without project filtering.
    pub upstream_count: usize,
}

/// Where an access observation came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessOrigin {
    /// Job statistics from `INFORMATION_SCHEMA.JOBS_BY_PROJECT`.
    SchemaStats,
    /// `tableDataRead` entries from Cloud Audit Logs.
    AuditLog,
}

impl AccessOrigin {
    /// All origins in merge order.
    pub const ALL: [AccessOrigin; 2] = [AccessOrigin::SchemaStats, AccessOrigin::AuditLog];

    /// Get human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SchemaStats => "INFORMATION_SCHEMA",
            Self::AuditLog => "Audit Log",
        }
    }
}

impl fmt::Display for AccessOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Which origins an access count run consults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceMode {
    SchemaOnly,
    AuditOnly,
    #[default]
    Both,
}

impl SourceMode {
    /// Origins selected by this mode, in merge order.
    pub fn origins(&self) -> &'static [AccessOrigin] {
        match self {
            Self::SchemaOnly => &[AccessOrigin::SchemaStats],
            Self::AuditOnly => &[AccessOrigin::AuditLog],
            Self::Both => &AccessOrigin::ALL,
        }
    }

    /// Single-origin runs fail fast; `Both` degrades to warnings.
    pub fn is_single(&self) -> bool {
        !matches!(self, Self::Both)
    }
}

impl std::str::FromStr for SourceMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "schema" | "schema_only" | "info_schema" => Ok(Self::SchemaOnly),
            "audit" | "audit_only" | "audit_log" => Ok(Self::AuditOnly),
            "both" => Ok(Self::Both),
            _ => Err(format!("Unknown source mode: {}", s)),
        }
    }
}

/// Access count for one table as seen by one origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRecord {
    pub project_id: String,
    pub dataset_id: String,
    pub table_id: String,
    pub access_count: u64,
    pub origin: AccessOrigin,
}

impl AccessRecord {
    /// Creates a new access record.
    pub fn new(
        project_id: impl Into<String>,
        dataset_id: impl Into<String>,
        table_id: impl Into<String>,
        access_count: u64,
        origin: AccessOrigin,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            dataset_id: dataset_id.into(),
            table_id: table_id.into(),
            access_count,
            origin,
        }
    }

    /// Creates a record for a known table.
    pub fn for_table(table: &TableIdentifier, access_count: u64, origin: AccessOrigin) -> Self {
        Self::new(
            table.project_id(),
            table.dataset_id(),
            table.table_id(),
            access_count,
            origin,
        )
    }

    /// `project.dataset.table`, the merge key.
    pub fn full_path(&self) -> String {
        format!("{}.{}.{}", self.project_id, self.dataset_id, self.table_id)
    }
}

/// Time window and filters for an access count run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCriteria {
    /// Look-back window in days, used unless both explicit dates are set.
    pub days: u32,
    /// Explicit window start.
    pub start_date: Option<DateTime<Utc>>,
    /// Explicit window end.
    pub end_date: Option<DateTime<Utc>>,
    /// Only count tables in this dataset.
    pub dataset_filter: Option<String>,
    /// Only count tables whose id matches this regex.
    pub table_pattern: Option<String>,
    /// Drop records below this count after merging.
    pub min_access_count: u64,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            days: 30,
            start_date: None,
            end_date: None,
            dataset_filter: None,
            table_pattern: None,
            min_access_count: 0,
        }
    }
}

impl FilterCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_days(mut self, days: u32) -> Self {
        self.days = days;
        self
    }

    pub fn with_range(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.start_date = Some(start);
        self.end_date = Some(end);
        self
    }

    pub fn with_dataset(mut self, dataset: &str) -> Self {
        self.dataset_filter = Some(dataset.to_string());
        self
    }

    pub fn with_table_pattern(mut self, pattern: &str) -> Self {
        self.table_pattern = Some(pattern.to_string());
        self
    }

    pub fn with_min_access_count(mut self, min: u64) -> Self {
        self.min_access_count = min;
        self
    }

    /// The explicit range, only when both ends are set.
    pub fn explicit_range(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => Some((start, end)),
            _ => None,
        }
    }

    /// Effective `(start, end)` of the window relative to `now`.
    pub fn effective_range(&self, now: DateTime<Utc>) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
        match self.explicit_range() {
            Some(range) => Ok(range),
            None => Ok((self.window_start(now)?, now)),
        }
    }

    /// Start of the `days` look-back window ending at `now`.
    pub fn window_start(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        now.checked_sub_signed(Duration::days(i64::from(self.days)))
            .ok_or_else(|| {
                TablescopeError::InvalidCriteria(format!(
                    "days {} reaches past the earliest representable date",
                    self.days
                ))
            })
    }

    /// Length of the requested window in whole days.
    pub fn window_days(&self) -> i64 {
        match self.explicit_range() {
            Some((start, end)) => (end - start).num_days(),
            None => i64::from(self.days),
        }
    }

    /// Validate the criteria.
    pub fn validate(&self) -> Result<()> {
        if self.days == 0 {
            return Err(TablescopeError::InvalidCriteria(
                "days must be positive".to_string(),
            ));
        }

        match self.explicit_range() {
            Some((start, end)) if start > end => {
                return Err(TablescopeError::InvalidCriteria(format!(
                    "start_date {} is after end_date {}",
                    start, end
                )));
            }
            Some(_) => {}
            None => {
                self.window_start(Utc::now())?;
            }
        }

        self.matcher()?;
        Ok(())
    }

    /// Compile the dataset and table filters.
    pub fn matcher(&self) -> Result<RecordMatcher> {
        let table_pattern = self
            .table_pattern
            .as_deref()
            .map(Regex::new)
            .transpose()?;

        Ok(RecordMatcher {
            dataset: self.dataset_filter.clone(),
            table_pattern,
        })
    }
}

/// Compiled dataset/table filters of a [`FilterCriteria`].
#[derive(Debug, Clone)]
pub struct RecordMatcher {
    dataset: Option<String>,
    table_pattern: Option<Regex>,
}

impl RecordMatcher {
    /// Whether a table passes the filters. The table pattern is a substring
    /// search, not an anchored match.
    pub fn matches(&self, dataset_id: &str, table_id: &str) -> bool {
        if let Some(dataset) = &self.dataset {
            if dataset != dataset_id {
                return false;
            }
        }

        match &self.table_pattern {
            Some(pattern) => pattern.is_match(table_id),
            None => true,
        }
    }
}

/// Result of an access count run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageReport {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub project_id: String,
    /// Threshold-filtered records of each consulted origin.
    pub per_origin_results: BTreeMap<AccessOrigin, Vec<AccessRecord>>,
    /// One record per table, maximum count across origins, count descending.
    pub merged_results: Vec<AccessRecord>,
    /// Degradations the caller must look at even on success.
    pub warnings: Vec<String>,
}

impl UsageReport {
    /// Records of one origin, empty if it was not consulted.
    pub fn records_for(&self, origin: AccessOrigin) -> &[AccessRecord] {
        self.per_origin_results
            .get(&origin)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// True when the report may reflect partial data.
    pub fn is_degraded(&self) -> bool {
        !self.warnings.is_empty()
    }
}
