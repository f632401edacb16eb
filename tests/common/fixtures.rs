// Test fixtures and data generators for integration tests

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tablescope::{AccessOrigin, AccessRecord};

/// Deterministic random data generator for reproducible tests
pub struct TestDataGenerator {
    rng: StdRng,
}

impl TestDataGenerator {
    /// Creates a new generator with a fixed seed for reproducibility
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Table names `p{0..projects}.d.t{0..tables}`, spread over projects
    pub fn table_names(&mut self, projects: usize, tables: usize) -> Vec<String> {
        (0..tables)
            .map(|i| format!("p{}.d.t{}", self.rng.gen_range(0..projects.max(1)), i))
            .collect()
    }

    /// Random lineage edges between `tables`; cycles and self-loops included
    pub fn edges(&mut self, tables: &[String], count: usize) -> Vec<(String, String)> {
        if tables.is_empty() {
            return Vec::new();
        }
        (0..count)
            .map(|_| {
                let source = &tables[self.rng.gen_range(0..tables.len())];
                let target = &tables[self.rng.gen_range(0..tables.len())];
                (source.clone(), target.clone())
            })
            .collect()
    }

    /// Random access records for `tables`, some tables repeated
    pub fn records(
        &mut self,
        tables: &[&str],
        count: usize,
        origin: AccessOrigin,
    ) -> Vec<AccessRecord> {
        if tables.is_empty() {
            return Vec::new();
        }
        (0..count)
            .map(|_| {
                let table = tables[self.rng.gen_range(0..tables.len())];
                AccessRecord::new("p", "d", table, self.rng.gen_range(0..100), origin)
            })
            .collect()
    }
}

impl Default for TestDataGenerator {
    fn default() -> Self {
        Self::new(42)
    }
}

/// Standard lineage shapes
pub mod shapes {
    /// raw.events -> stage.events -> mart.daily
    pub const CHAIN: &[(&str, &str)] = &[
        ("p.raw.events", "p.stage.events"),
        ("p.stage.events", "p.mart.daily"),
    ];

    /// a -> b -> c -> a
    pub const CYCLE: &[(&str, &str)] = &[
        ("p.d.a", "p.d.b"),
        ("p.d.b", "p.d.c"),
        ("p.d.c", "p.d.a"),
    ];

    /// a -> {b, c} -> d
    pub const DIAMOND: &[(&str, &str)] = &[
        ("p.d.a", "p.d.b"),
        ("p.d.a", "p.d.c"),
        ("p.d.b", "p.d.d"),
        ("p.d.c", "p.d.d"),
    ];

    /// Crosses from p1 into p2 at stage
    pub const CROSS_PROJECT: &[(&str, &str)] = &[
        ("p1.raw.orders", "p1.stage.orders"),
        ("p1.stage.orders", "p2.mart.orders"),
        ("p1.raw.orders", "p1.mart.orders"),
        ("p2.mart.orders", "p2.report.weekly"),
    ];
}

pub fn schema(table: &str, count: u64) -> AccessRecord {
    AccessRecord::new("p", "d", table, count, AccessOrigin::SchemaStats)
}

pub fn audit(table: &str, count: u64) -> AccessRecord {
    AccessRecord::new("p", "d", table, count, AccessOrigin::AuditLog)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic_generation() {
        let mut gen1 = TestDataGenerator::new(42);
        let mut gen2 = TestDataGenerator::new(42);

        let tables1 = gen1.table_names(3, 10);
        let tables2 = gen2.table_names(3, 10);
        assert_eq!(tables1, tables2);
        assert_eq!(gen1.edges(&tables1, 20), gen2.edges(&tables2, 20));
    }

    #[test]
    fn test_records_use_given_tables() {
        let mut gen = TestDataGenerator::default();
        let records = gen.records(&["a", "b"], 10, AccessOrigin::AuditLog);
        assert_eq!(records.len(), 10);
        assert!(records.iter().all(|r| r.table_id == "a" || r.table_id == "b"));
    }
}
