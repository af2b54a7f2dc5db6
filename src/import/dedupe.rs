use std::collections::HashSet;

use crate::models::Transaction;

/// Result of splitting a staged batch against already-imported keys.
/// Source order is preserved within each subset.
#[derive(Debug, Default)]
pub struct Partitioned {
    pub new: Vec<Transaction>,
    pub duplicates: Vec<Transaction>,
}

/// Partition a batch into rows to insert and rows already present.
/// One hash-set probe per row. Repeats of a key within the batch itself
/// also land in `duplicates`: the key scheme collapses identical rows,
/// and the store's unique index must never see the same key twice.
pub fn partition_duplicates(batch: Vec<Transaction>, existing: &HashSet<String>) -> Partitioned {
    let mut parts = Partitioned::default();
    let mut seen: HashSet<String> = HashSet::new();

    for txn in batch {
        if existing.contains(&txn.imported_id) || !seen.insert(txn.imported_id.clone()) {
            parts.duplicates.push(txn);
        } else {
            parts.new.push(txn);
        }
    }
    parts
}

#[cfg(test)]
#[path = "dedupe_tests.rs"]
mod tests;
