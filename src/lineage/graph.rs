// In-memory Lineage Graph

use super::EdgeLookup;
use crate::error::Result;
use crate::types::TableIdentifier;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Lineage link between two entities, as exported by the lineage service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageLink {
    /// Source entity name (e.g. `bigquery:project.dataset.table`)
    pub source: String,
    /// Target entity name
    pub target: String,
}

impl LineageLink {
    /// Creates a link between two tables
    pub fn between(source: &TableIdentifier, target: &TableIdentifier) -> Self {
        Self {
            source: source.lineage_name(),
            target: target.lineage_name(),
        }
    }
}

/// Table-level lineage graph
///
/// Serves edge lookups from memory. Tables the graph has never seen have no
/// edges.
pub struct LineageGraph {
    /// Outgoing links: fqn -> downstream tables
    outgoing: Arc<RwLock<HashMap<String, Vec<TableIdentifier>>>>,
    /// Incoming links: fqn -> upstream tables
    incoming: Arc<RwLock<HashMap<String, Vec<TableIdentifier>>>>,
}

impl LineageGraph {
    /// Creates an empty graph
    pub fn new() -> Self {
        Self::from_maps(HashMap::new(), HashMap::new())
    }

    fn from_maps(
        outgoing: HashMap<String, Vec<TableIdentifier>>,
        incoming: HashMap<String, Vec<TableIdentifier>>,
    ) -> Self {
        Self {
            outgoing: Arc::new(RwLock::new(outgoing)),
            incoming: Arc::new(RwLock::new(incoming)),
        }
    }

    /// Builds a graph from `(source, target)` table pairs
    pub fn from_edges<I>(edges: I) -> Self
    where
        I: IntoIterator<Item = (TableIdentifier, TableIdentifier)>,
    {
        let mut outgoing: HashMap<String, Vec<TableIdentifier>> = HashMap::new();
        let mut incoming: HashMap<String, Vec<TableIdentifier>> = HashMap::new();

        for (source, target) in edges {
            insert_edge(&mut outgoing, &mut incoming, source, target);
        }

        Self::from_maps(outgoing, incoming)
    }

    /// Builds a graph from exported lineage links
    ///
    /// Links whose endpoints are not BigQuery tables are skipped.
    pub fn from_links<'a, I>(links: I) -> Self
    where
        I: IntoIterator<Item = &'a LineageLink>,
    {
        let edges = links.into_iter().filter_map(|link| {
            let source = TableIdentifier::parse_lineage_name(&link.source);
            let target = TableIdentifier::parse_lineage_name(&link.target);
            match (source, target) {
                (Some(source), Some(target)) => Some((source, target)),
                _ => {
                    debug!(
                        source = %link.source,
                        target = %link.target,
                        "Skipping non-table lineage link"
                    );
                    None
                }
            }
        });
        Self::from_edges(edges)
    }

    /// Parses a JSON array of `{"source": .., "target": ..}` links
    pub fn from_json(json: &str) -> Result<Self> {
        let links: Vec<LineageLink> = serde_json::from_str(json)?;
        Ok(Self::from_links(&links))
    }

    /// Adds a link. Returns false if it was already present.
    pub async fn add_edge(&self, source: TableIdentifier, target: TableIdentifier) -> bool {
        let mut outgoing = self.outgoing.write().await;
        let mut incoming = self.incoming.write().await;
        insert_edge(&mut outgoing, &mut incoming, source, target)
    }

    /// Removes a link. Returns false if it was not present.
    pub async fn remove_edge(&self, source: &TableIdentifier, target: &TableIdentifier) -> bool {
        let mut outgoing = self.outgoing.write().await;
        let mut incoming = self.incoming.write().await;

        let removed = match outgoing.get_mut(&source.fqn()) {
            Some(targets) => {
                let before = targets.len();
                targets.retain(|t| t != target);
                targets.len() != before
            }
            None => false,
        };

        if removed {
            if let Some(sources) = incoming.get_mut(&target.fqn()) {
                sources.retain(|s| s != source);
            }
        }

        removed
    }

    /// Gets edge count
    pub async fn edge_count(&self) -> usize {
        self.outgoing.read().await.values().map(Vec::len).sum()
    }

    /// Gets the number of distinct tables with at least one link
    pub async fn table_count(&self) -> usize {
        let outgoing = self.outgoing.read().await;
        let incoming = self.incoming.read().await;

        let mut names: Vec<&String> = outgoing
            .iter()
            .chain(incoming.iter())
            .filter(|(_, tables)| !tables.is_empty())
            .map(|(name, _)| name)
            .collect();
        names.sort();
        names.dedup();
        names.len()
    }
}

impl Default for LineageGraph {
    fn default() -> Self {
        Self::new()
    }
}

fn insert_edge(
    outgoing: &mut HashMap<String, Vec<TableIdentifier>>,
    incoming: &mut HashMap<String, Vec<TableIdentifier>>,
    source: TableIdentifier,
    target: TableIdentifier,
) -> bool {
    let targets = outgoing.entry(source.fqn()).or_default();
    if targets.contains(&target) {
        return false;
    }
    targets.push(target.clone());
    incoming.entry(target.fqn()).or_default().push(source);
    true
}

#[async_trait::async_trait]
impl EdgeLookup for LineageGraph {
    async fn upstream(&self, table: &TableIdentifier) -> Result<Vec<TableIdentifier>> {
        let incoming = self.incoming.read().await;
        Ok(incoming.get(&table.fqn()).cloned().unwrap_or_default())
    }

    async fn downstream(&self, table: &TableIdentifier) -> Result<Vec<TableIdentifier>> {
        let outgoing = self.outgoing.read().await;
        Ok(outgoing.get(&table.fqn()).cloned().unwrap_or_default())
    }
}
