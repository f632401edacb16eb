// Recording edge lookup for lineage integration tests

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use tablescope::lineage::EdgeLookup;
use tablescope::{Result, TableIdentifier, TablescopeError};

/// Direction of a recorded lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Call {
    Upstream,
    Downstream,
}

/// Edge lookup over a fixed edge list that records every call and can be
/// told to fail for specific tables.
#[derive(Default)]
pub struct RecordingLookup {
    downstream: HashMap<String, Vec<TableIdentifier>>,
    upstream: HashMap<String, Vec<TableIdentifier>>,
    failures: HashSet<(Call, String)>,
    calls: Mutex<Vec<(Call, String)>>,
}

impl RecordingLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a lookup from `source -> target` fqn pairs
    pub fn from_edges(edges: &[(&str, &str)]) -> Self {
        let mut lookup = Self::new();
        for (source, target) in edges {
            lookup = lookup.with_edge(source, target);
        }
        lookup
    }

    pub fn with_edge(mut self, source: &str, target: &str) -> Self {
        let source_id = super::table(source);
        let target_id = super::table(target);
        self.downstream
            .entry(source.to_string())
            .or_default()
            .push(target_id);
        self.upstream
            .entry(target.to_string())
            .or_default()
            .push(source_id);
        self
    }

    /// Makes lookups of `table` in `direction` fail
    pub fn failing_on(mut self, direction: Call, table: &str) -> Self {
        self.failures.insert((direction, table.to_string()));
        self
    }

    pub fn calls(&self) -> Vec<(Call, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_in(&self, direction: Call) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|(d, _)| *d == direction)
            .map(|(_, table)| table)
            .collect()
    }

    fn answer(&self, direction: Call, table: &TableIdentifier) -> Result<Vec<TableIdentifier>> {
        let fqn = table.fqn();
        self.calls.lock().unwrap().push((direction, fqn.clone()));

        if self.failures.contains(&(direction, fqn.clone())) {
            return Err(TablescopeError::retrieval(
                format!("{:?}", direction).to_lowercase(),
                format!("injected failure for {}", fqn),
            ));
        }

        let edges = match direction {
            Call::Upstream => &self.upstream,
            Call::Downstream => &self.downstream,
        };
        Ok(edges.get(&fqn).cloned().unwrap_or_default())
    }
}

#[async_trait::async_trait]
impl EdgeLookup for RecordingLookup {
    async fn upstream(&self, table: &TableIdentifier) -> Result<Vec<TableIdentifier>> {
        self.answer(Call::Upstream, table)
    }

    async fn downstream(&self, table: &TableIdentifier) -> Result<Vec<TableIdentifier>> {
        self.answer(Call::Downstream, table)
    }
}
