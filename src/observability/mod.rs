//! Observability module for tablescope.
//!
//! Provides logging setup and the metrics emitted by lineage lookups and
//! access count fetches. No exporter is installed here; counters are no-ops
//! until the host application installs a `metrics` recorder.

use crate::config::ObservabilityConfig;
use crate::error::{Result, TablescopeError};
use crate::types::AccessOrigin;
use metrics::counter;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize logging.
pub fn init(config: &ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json())
            .try_init()
            .map_err(|e| TablescopeError::Internal(format!("Failed to init logging: {}", e)))?;
    } else {
        subscriber
            .with(fmt::layer())
            .try_init()
            .map_err(|e| TablescopeError::Internal(format!("Failed to init logging: {}", e)))?;
    }

    info!("Observability initialized");
    Ok(())
}

/// Direction of a lineage edge lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeDirection {
    Upstream,
    Downstream,
}

impl EdgeDirection {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Upstream => "upstream",
            Self::Downstream => "downstream",
        }
    }
}

/// Outcome of an origin fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Success,
    Degraded,
    Failed,
}

impl FetchOutcome {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Degraded => "degraded",
            Self::Failed => "failed",
        }
    }
}

/// Record a lineage edge lookup.
pub fn record_edge_lookup(direction: EdgeDirection) {
    counter!("tablescope_edge_lookups_total", "direction" => direction.name()).increment(1);
}

/// Record leaf tables produced by one resolution or traversal.
pub fn record_leaf_tables(count: usize) {
    counter!("tablescope_leaf_tables_total").increment(count as u64);
}

/// Record an access count fetch against one origin.
pub fn record_origin_fetch(origin: AccessOrigin, outcome: FetchOutcome) {
    let origin = match origin {
        AccessOrigin::SchemaStats => "schema_stats",
        AccessOrigin::AuditLog => "audit_log",
    };
    counter!(
        "tablescope_origin_fetches_total",
        "origin" => origin,
        "outcome" => outcome.name()
    )
    .increment(1);
}
