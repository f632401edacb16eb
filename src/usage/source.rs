// Access Count Sources

use crate::error::{ErrorKind, Result, TablescopeError};
use crate::types::{AccessOrigin, AccessRecord, FilterCriteria};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Observer for long-running fetches
///
/// Purely observational: implementations must not block or fail.
pub trait ProgressSink: Send + Sync {
    /// Reports `current` of `total` units done
    fn report(&self, current: u64, total: u64, message: &str);
}

impl<F> ProgressSink for F
where
    F: Fn(u64, u64, &str) + Send + Sync,
{
    fn report(&self, current: u64, total: u64, message: &str) {
        self(current, total, message)
    }
}

/// An origin of per-table access counts
#[async_trait]
pub trait AccessCountSource: Send + Sync {
    /// The origin stamped on every record this source returns
    fn origin(&self) -> AccessOrigin;

    /// Fetches access counts for `project_id` within the criteria window
    async fn fetch(
        &self,
        project_id: &str,
        criteria: &FilterCriteria,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<Vec<AccessRecord>>;
}

/// Fans per-origin progress into one overall stream
pub struct ProgressReporter<'a> {
    sink: Option<&'a dyn ProgressSink>,
    total: u64,
}

impl<'a> ProgressReporter<'a> {
    /// Creates a reporter spanning `total` overall units
    pub fn new(sink: Option<&'a dyn ProgressSink>, total: u64) -> Self {
        Self { sink, total }
    }

    pub fn is_active(&self) -> bool {
        self.sink.is_some()
    }

    /// Reports overall progress directly
    pub fn report(&self, current: u64, message: &str) {
        if let Some(sink) = self.sink {
            sink.report(current, self.total, message);
        }
    }

    /// Creates a sink for one origin occupying `weight` units from `offset`
    pub fn scoped(&self, label: &'static str, offset: u64, weight: u64) -> ScopedProgress<'a> {
        ScopedProgress {
            sink: self.sink,
            total: self.total,
            label,
            offset,
            weight,
        }
    }
}

/// A slice of a [`ProgressReporter`]'s range
pub struct ScopedProgress<'a> {
    sink: Option<&'a dyn ProgressSink>,
    total: u64,
    label: &'static str,
    offset: u64,
    weight: u64,
}

impl ScopedProgress<'_> {
    /// Maps origin-local progress onto the overall range
    pub fn scale(&self, current: u64, total: u64) -> u64 {
        if total == 0 {
            return self.offset;
        }
        let fraction = current.min(total) as f64 / total as f64;
        self.offset + (fraction * self.weight as f64) as u64
    }

    /// This scope as a sink, if anyone is listening
    pub fn as_sink(&self) -> Option<&dyn ProgressSink> {
        self.sink.map(|_| self as &dyn ProgressSink)
    }
}

impl ProgressSink for ScopedProgress<'_> {
    fn report(&self, current: u64, total: u64, message: &str) {
        if let Some(sink) = self.sink {
            let scaled = self.scale(current, total);
            sink.report(scaled, self.total, &format!("{}: {}", self.label, message));
        }
    }
}

/// Access count source backed by fixed records
///
/// Returns its records (filtered by dataset and table pattern) or a fixed
/// failure. Counts fetches so callers can assert on them.
pub struct MemoryAccessSource {
    origin: AccessOrigin,
    records: Vec<AccessRecord>,
    failure: Option<(ErrorKind, String)>,
    fetches: AtomicUsize,
}

impl MemoryAccessSource {
    /// Creates a source returning `records`
    pub fn new(origin: AccessOrigin, records: Vec<AccessRecord>) -> Self {
        Self {
            origin,
            records,
            failure: None,
            fetches: AtomicUsize::new(0),
        }
    }

    /// Creates a source whose every fetch fails with `kind`
    pub fn failing(origin: AccessOrigin, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            origin,
            records: Vec::new(),
            failure: Some((kind, message.into())),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Number of fetches so far
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn error(kind: ErrorKind, message: &str) -> TablescopeError {
        let message = message.to_string();
        match kind {
            ErrorKind::Retrieval => TablescopeError::retrieval("fetch", message),
            ErrorKind::Authentication => TablescopeError::Authentication(message),
            ErrorKind::Permission => TablescopeError::PermissionDenied(message),
            ErrorKind::Network => TablescopeError::Network(message),
            ErrorKind::Timeout => TablescopeError::Timeout(message),
            ErrorKind::Other => TablescopeError::Internal(message),
        }
    }
}

#[async_trait]
impl AccessCountSource for MemoryAccessSource {
    fn origin(&self) -> AccessOrigin {
        self.origin
    }

    async fn fetch(
        &self,
        _project_id: &str,
        criteria: &FilterCriteria,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<Vec<AccessRecord>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        if let Some((kind, message)) = &self.failure {
            return Err(Self::error(*kind, message));
        }

        let matcher = criteria.matcher()?;
        let total = self.records.len() as u64;
        let mut records = Vec::new();

        for (i, record) in self.records.iter().enumerate() {
            if matcher.matches(&record.dataset_id, &record.table_id) {
                records.push(record.clone());
            }
            if let Some(sink) = progress {
                sink.report(i as u64 + 1, total, &format!("Processing record {}/{}", i + 1, total));
            }
        }

        Ok(records)
    }
}
