//! Table lineage for tablescope
//!
//! Finds leaf tables, tables nothing downstream reads from:
//! - Edge lookups against a lineage backend ([`EdgeLookup`])
//! - Leaf classification of an explicit candidate set
//! - Breadth-first discovery of leaves reachable from root tables
//! - Project scoping of downstream exploration
//! - An in-memory lineage graph for offline analysis and tests

pub mod graph;
pub mod leaves;

pub use graph::{LineageGraph, LineageLink};
pub use leaves::{LeafResolver, TableLineage};

use crate::config::LineageConfig;
use crate::error::Result;
use crate::types::TableIdentifier;
use std::collections::HashSet;
use std::sync::Arc;

/// Source of lineage edges for a single table.
///
/// Implementations wrap the lineage service; errors should be
/// [`TablescopeError::Retrieval`](crate::error::TablescopeError::Retrieval).
#[async_trait::async_trait]
pub trait EdgeLookup: Send + Sync {
    /// Tables this table is built from.
    async fn upstream(&self, table: &TableIdentifier) -> Result<Vec<TableIdentifier>>;
    /// Tables built from this table.
    async fn downstream(&self, table: &TableIdentifier) -> Result<Vec<TableIdentifier>>;
}

#[async_trait::async_trait]
impl<T: EdgeLookup + ?Sized> EdgeLookup for Arc<T> {
    async fn upstream(&self, table: &TableIdentifier) -> Result<Vec<TableIdentifier>> {
        (**self).upstream(table).await
    }

    async fn downstream(&self, table: &TableIdentifier) -> Result<Vec<TableIdentifier>> {
        (**self).downstream(table).await
    }
}

/// Projects within which downstream exploration may continue.
///
/// Scoping only prunes expansion targets; the table being classified is
/// never filtered out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectScope {
    allowed: Option<HashSet<String>>,
}

impl ProjectScope {
    /// Explore every project.
    pub fn unrestricted() -> Self {
        Self { allowed: None }
    }

    /// Explore only the given projects. An empty list means unrestricted.
    pub fn only<I, S>(projects: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let allowed: HashSet<String> = projects.into_iter().map(Into::into).collect();
        if allowed.is_empty() {
            Self::unrestricted()
        } else {
            Self {
                allowed: Some(allowed),
            }
        }
    }

    pub fn is_restricted(&self) -> bool {
        self.allowed.is_some()
    }

    /// Whether exploration may continue into this table.
    pub fn permits(&self, table: &TableIdentifier) -> bool {
        match &self.allowed {
            Some(allowed) => allowed.contains(table.project_id()),
            None => true,
        }
    }

    /// Drop tables outside the scope, keeping order.
    pub fn retain(&self, mut tables: Vec<TableIdentifier>) -> Vec<TableIdentifier> {
        if self.is_restricted() {
            tables.retain(|t| self.permits(t));
        }
        tables
    }
}

impl From<&LineageConfig> for ProjectScope {
    fn from(config: &LineageConfig) -> Self {
        ProjectScope::only(config.allowed_projects.iter().cloned())
    }
}
