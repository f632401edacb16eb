//! Table access counting.
//!
//! Access counts come from two origins that observe overlapping windows with
//! different coverage:
//!
//! - **INFORMATION_SCHEMA** ([`SchemaStatsSource`]): references by completed
//!   query jobs, kept for a limited number of days
//! - **Audit Log** ([`AuditLogSource`]): `tableDataRead` entries, only present
//!   when Data Access logging is enabled
//!
//! [`UsageCounter`] fetches the selected origins and reconciles them with
//! [`merge`], which keeps the highest count seen for each table rather than
//! summing overlapping observations.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use tablescope::types::{AccessOrigin, AccessRecord, FilterCriteria, SourceMode};
//! use tablescope::usage::{MemoryAccessSource, UsageCounter};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let counter = UsageCounter::new()
//!     .with_source(Arc::new(MemoryAccessSource::new(
//!         AccessOrigin::SchemaStats,
//!         vec![AccessRecord::new("p", "d", "orders", 5, AccessOrigin::SchemaStats)],
//!     )))
//!     .with_source(Arc::new(MemoryAccessSource::new(
//!         AccessOrigin::AuditLog,
//!         vec![AccessRecord::new("p", "d", "orders", 9, AccessOrigin::AuditLog)],
//!     )));
//!
//! let report = counter
//!     .count_access("p", &FilterCriteria::default(), SourceMode::Both, None)
//!     .await
//!     .unwrap();
//! assert_eq!(report.merged_results[0].access_count, 9);
//! # }
//! ```

pub mod audit_log;
pub mod counter;
pub mod merge;
pub mod schema_stats;
pub mod source;

pub use audit_log::{AuditLogReader, AuditLogSource};
pub use counter::UsageCounter;
pub use merge::{apply_threshold, merge};
pub use schema_stats::{JobsQueryRunner, SchemaStatsRow, SchemaStatsSource};
pub use source::{
    AccessCountSource, MemoryAccessSource, ProgressReporter, ProgressSink, ScopedProgress,
};
