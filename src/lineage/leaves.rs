// Leaf Table Discovery

use super::{EdgeLookup, ProjectScope};
use crate::error::Result;
use crate::observability::{record_edge_lookup, record_leaf_tables, EdgeDirection};
use crate::types::{LeafTable, TableIdentifier};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use tracing::{debug, info, warn};

/// Lineage of a single table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableLineage {
    /// The table
    pub table: TableIdentifier,
    /// Tables it is built from
    pub upstream: Vec<TableIdentifier>,
    /// Tables built from it
    pub downstream: Vec<TableIdentifier>,
    /// True when nothing is built from it
    pub is_leaf: bool,
}

/// Classifies tables as leaves using an [`EdgeLookup`].
///
/// All operations are fail-fast: the first lookup error aborts the call and
/// no partial result is returned.
pub struct LeafResolver<L> {
    lookup: L,
}

impl<L: EdgeLookup> LeafResolver<L> {
    /// Creates a resolver over an edge lookup
    pub fn new(lookup: L) -> Self {
        Self { lookup }
    }

    /// Gets the underlying lookup
    pub fn lookup(&self) -> &L {
        &self.lookup
    }

    /// Classifies each candidate independently; no multi-hop exploration.
    ///
    /// Downstream targets outside `scope` do not count against leaf status.
    /// Results follow input order.
    pub async fn resolve_leaves(
        &self,
        tables: &[TableIdentifier],
        scope: &ProjectScope,
    ) -> Result<Vec<LeafTable>> {
        if tables.is_empty() {
            return Ok(Vec::new());
        }

        info!(
            candidates = tables.len(),
            restricted = scope.is_restricted(),
            "Resolving leaf tables"
        );

        let mut leaves = Vec::new();
        for table in tables {
            if let Some(leaf) = self.classify(table, scope).await? {
                leaves.push(leaf);
            }
        }

        info!(
            leaves = leaves.len(),
            non_leaves = tables.len() - leaves.len(),
            "Leaf resolution complete"
        );
        record_leaf_tables(leaves.len());
        Ok(leaves)
    }

    /// Breadth-first walk downstream from `roots`, collecting every reachable leaf.
    ///
    /// Each table is classified once, at its first dequeue; later arrivals via
    /// other paths (including cycles) are discarded. Roots are always
    /// classified even when outside `scope`; only expansion targets are
    /// scoped. Results are in dequeue order.
    pub async fn traverse_from_roots(
        &self,
        roots: &[TableIdentifier],
        scope: &ProjectScope,
    ) -> Result<Vec<LeafTable>> {
        if roots.is_empty() {
            return Ok(Vec::new());
        }

        info!(
            roots = roots.len(),
            restricted = scope.is_restricted(),
            "Starting leaf traversal"
        );

        let mut visited: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<TableIdentifier> = roots.iter().cloned().collect();
        let mut leaves = Vec::new();

        while let Some(current) = queue.pop_front() {
            if !visited.insert(current.fqn()) {
                continue;
            }

            let downstream = scope.retain(self.downstream(&current).await?);

            if downstream.is_empty() {
                let upstream = self.upstream(&current).await?;
                debug!(table = %current, upstream = upstream.len(), "Leaf table");
                leaves.push(LeafTable {
                    table: current,
                    upstream_count: upstream.len(),
                });
            } else {
                debug!(table = %current, downstream = downstream.len(), "Expanding table");
                for next in downstream {
                    if !visited.contains(&next.fqn()) {
                        queue.push_back(next);
                    }
                }
            }
        }

        info!(
            visited = visited.len(),
            leaves = leaves.len(),
            "Leaf traversal complete"
        );
        record_leaf_tables(leaves.len());
        Ok(leaves)
    }

    /// Fetches both directions for one table, unscoped.
    pub async fn describe_table(&self, table: &TableIdentifier) -> Result<TableLineage> {
        let upstream = self.upstream(table).await?;
        let downstream = self.downstream(table).await?;
        let is_leaf = downstream.is_empty();

        Ok(TableLineage {
            table: table.clone(),
            upstream,
            downstream,
            is_leaf,
        })
    }

    async fn classify(
        &self,
        table: &TableIdentifier,
        scope: &ProjectScope,
    ) -> Result<Option<LeafTable>> {
        let downstream = scope.retain(self.downstream(table).await?);
        if !downstream.is_empty() {
            return Ok(None);
        }

        let upstream = self.upstream(table).await?;
        Ok(Some(LeafTable {
            table: table.clone(),
            upstream_count: upstream.len(),
        }))
    }

    async fn downstream(&self, table: &TableIdentifier) -> Result<Vec<TableIdentifier>> {
        record_edge_lookup(EdgeDirection::Downstream);
        self.lookup.downstream(table).await.map_err(|e| {
            warn!(table = %table, error = %e, "Downstream lookup failed");
            e
        })
    }

    async fn upstream(&self, table: &TableIdentifier) -> Result<Vec<TableIdentifier>> {
        record_edge_lookup(EdgeDirection::Upstream);
        self.lookup.upstream(table).await.map_err(|e| {
            warn!(table = %table, error = %e, "Upstream lookup failed");
            e
        })
    }
}
