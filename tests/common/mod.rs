//! Common test utilities for integration tests.

pub mod assertions;
pub mod fixtures;
pub mod lookup;
pub mod sources;

use tablescope::TableIdentifier;

// Re-export common types
pub use assertions::*;
pub use fixtures::*;
pub use lookup::*;
pub use sources::*;

/// Parses a `project.dataset.table` name.
pub fn table(fqn: &str) -> TableIdentifier {
    fqn.parse()
        .unwrap_or_else(|e| panic!("bad table name {}: {}", fqn, e))
}

pub fn tables(fqns: &[&str]) -> Vec<TableIdentifier> {
    fqns.iter().map(|fqn| table(fqn)).collect()
}
