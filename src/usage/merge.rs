//! Reconciliation of per-origin access counts.

use crate::types::{AccessRecord, FilterCriteria};
use std::collections::HashMap;

/// Merges per-origin record lists into one record per table.
///
/// Lists are consumed in the order given. A record replaces the one already
/// held for its table only when its count is strictly greater, so ties keep
/// the first-seen record. The result is sorted by count descending; the sort
/// is stable, so equal counts stay in first-seen order.
pub fn merge<'a, I>(per_origin: I) -> Vec<AccessRecord>
where
    I: IntoIterator<Item = &'a [AccessRecord]>,
{
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut merged: Vec<AccessRecord> = Vec::new();

    for records in per_origin {
        for record in records {
            match index.get(&record.full_path()) {
                Some(&slot) => {
                    if record.access_count > merged[slot].access_count {
                        merged[slot] = record.clone();
                    }
                }
                None => {
                    index.insert(record.full_path(), merged.len());
                    merged.push(record.clone());
                }
            }
        }
    }

    merged.sort_by(|a, b| b.access_count.cmp(&a.access_count));
    merged
}

/// Keeps records with at least `criteria.min_access_count` accesses, in order.
pub fn apply_threshold(records: &[AccessRecord], criteria: &FilterCriteria) -> Vec<AccessRecord> {
    records
        .iter()
        .filter(|record| record.access_count >= criteria.min_access_count)
        .cloned()
        .collect()
}
