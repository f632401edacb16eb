//! Tablescope - find BigQuery tables nobody uses.
//!
//! Tablescope answers two questions about the tables of a BigQuery estate:
//! which tables have nothing built from them, and how often each table is
//! actually read.
//!
//! # Features
//!
//! - **Leaf discovery**: classify candidate tables, or walk lineage
//!   breadth-first from root tables, to find tables with no downstream
//!   consumer. Cycles in lineage are handled; each table is classified once.
//! - **Project scoping**: keep downstream exploration inside an allow-list of
//!   projects.
//! - **Access counting**: collect per-table access counts from
//!   `INFORMATION_SCHEMA` job history and Cloud Audit Logs, and reconcile
//!   them into one report.
//! - **Graceful degradation**: when both origins are consulted, one failing
//!   origin becomes a report warning instead of an error.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Tablescope                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  lineage: LeafResolver ── EdgeLookup (service | graph)      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  usage:   UsageCounter ── AccessCountSource                 │
//! │           (INFORMATION_SCHEMA | Audit Log) ── merge         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  config | error | observability | resilience                │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Network clients for the lineage, BigQuery and Cloud Logging APIs are
//! injected through [`lineage::EdgeLookup`], [`usage::JobsQueryRunner`] and
//! [`usage::AuditLogReader`].
//!
//! # Quick Start
//!
//! ```no_run
//! use tablescope::lineage::{LeafResolver, LineageGraph, ProjectScope};
//! use tablescope::TableIdentifier;
//!
//! #[tokio::main]
//! async fn main() -> tablescope::Result<()> {
//!     let graph = LineageGraph::from_json(
//!         r#"[{"source": "bigquery:p.raw.orders", "target": "bigquery:p.mart.daily"}]"#,
//!     )?;
//!     let resolver = LeafResolver::new(graph);
//!
//!     let roots = vec!["p.raw.orders".parse::<TableIdentifier>()?];
//!     for leaf in resolver.traverse_from_roots(&roots, &ProjectScope::only(["p"])).await? {
//!         println!("{} ({} upstream)", leaf.table, leaf.upstream_count);
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod types;

pub mod lineage;
pub mod observability;
pub mod resilience;
pub mod usage;

// Re-exports
pub use error::{Result, TablescopeError};
pub use types::*;
