// Custom test assertions for leaf and usage results

use std::collections::HashSet;
use tablescope::{AccessRecord, LeafTable, UsageReport};

/// Assertion result for detailed error messages
#[derive(Debug)]
pub struct AssertionResult {
    pub passed: bool,
    pub message: String,
    pub expected: Option<String>,
    pub actual: Option<String>,
}

impl AssertionResult {
    pub fn pass() -> Self {
        Self {
            passed: true,
            message: String::new(),
            expected: None,
            actual: None,
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            passed: false,
            message: message.into(),
            expected: None,
            actual: None,
        }
    }

    pub fn with_expected(mut self, expected: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self
    }

    pub fn with_actual(mut self, actual: impl Into<String>) -> Self {
        self.actual = Some(actual.into());
        self
    }

    pub fn assert(self) {
        if !self.passed {
            let mut msg = self.message;
            if let Some(expected) = self.expected {
                msg.push_str(&format!("\n  expected: {}", expected));
            }
            if let Some(actual) = self.actual {
                msg.push_str(&format!("\n  actual: {}", actual));
            }
            panic!("{}", msg);
        }
    }
}

/// Leaves must equal `(fqn, upstream_count)` pairs, in order
pub fn assert_leaves(actual: &[LeafTable], expected: &[(&str, usize)]) -> AssertionResult {
    let actual: Vec<(String, usize)> = actual
        .iter()
        .map(|leaf| (leaf.table.fqn(), leaf.upstream_count))
        .collect();
    let expected: Vec<(String, usize)> = expected
        .iter()
        .map(|(fqn, count)| (fqn.to_string(), *count))
        .collect();

    if actual == expected {
        AssertionResult::pass()
    } else {
        AssertionResult::fail("Leaf tables differ")
            .with_expected(format!("{:?}", expected))
            .with_actual(format!("{:?}", actual))
    }
}

/// Records must be sorted by access count, highest first
pub fn assert_sorted_desc(records: &[AccessRecord]) -> AssertionResult {
    match records
        .windows(2)
        .position(|w| w[0].access_count < w[1].access_count)
    {
        None => AssertionResult::pass(),
        Some(i) => AssertionResult::fail(format!("Records out of order at index {}", i + 1))
            .with_expected(format!("<= {}", records[i].access_count))
            .with_actual(records[i + 1].access_count.to_string()),
    }
}

/// Every table must appear at most once
pub fn assert_unique_tables(records: &[AccessRecord]) -> AssertionResult {
    let mut seen = HashSet::new();
    for record in records {
        if !seen.insert(record.full_path()) {
            return AssertionResult::fail(format!("Duplicate table {}", record.full_path()));
        }
    }
    AssertionResult::pass()
}

/// Some warning of the report must contain `substring`
pub fn assert_warning_contains(report: &UsageReport, substring: &str) -> AssertionResult {
    if report.warnings.iter().any(|w| w.contains(substring)) {
        AssertionResult::pass()
    } else {
        AssertionResult::fail("No matching warning")
            .with_expected(format!("contains '{}'", substring))
            .with_actual(format!("{:?}", report.warnings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tablescope::AccessOrigin;

    fn record(table: &str, count: u64) -> AccessRecord {
        AccessRecord::new("p", "d", table, count, AccessOrigin::SchemaStats)
    }

    #[test]
    fn test_sorted_desc() {
        assert!(assert_sorted_desc(&[record("a", 3), record("b", 3), record("c", 1)]).passed);
        assert!(!assert_sorted_desc(&[record("a", 1), record("b", 3)]).passed);
        assert!(assert_sorted_desc(&[]).passed);
    }

    #[test]
    fn test_unique_tables() {
        assert!(assert_unique_tables(&[record("a", 1), record("b", 1)]).passed);
        assert!(!assert_unique_tables(&[record("a", 1), record("a", 2)]).passed);
    }
}
