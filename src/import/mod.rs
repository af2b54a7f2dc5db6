mod convert;
mod dedupe;
mod transform;

pub use convert::{convert, BankFormat, CanonicalRow, ConvertOutcome};
pub use dedupe::{partition_duplicates, Partitioned};
pub use transform::{imported_id, stage_rows};

use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::db::RecordStore;
use crate::errors::{FormatError, ImportError};
use crate::models::{ImportSession, Transaction};
use crate::rules;

/// Counters reported by one pipeline run. `total` is every row the
/// converter produced; `dropped` counts rows lost to bad dates/amounts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportStats {
    pub total: usize,
    pub imported: usize,
    pub duplicates: usize,
    pub categorized: usize,
    pub dropped: usize,
}

/// Run the full pipeline: convert, stage, dedupe, persist atomically,
/// then optionally categorize the fresh rows.
///
/// Row-quality problems only reduce the counters; the call fails only
/// for structural reasons (unreadable file, missing columns, store
/// failure), and a failure commits nothing.
pub fn import_transactions<S: RecordStore>(
    store: &mut S,
    path: &Path,
    account_id: i64,
    format: BankFormat,
    auto_apply_rules: bool,
) -> Result<ImportStats, ImportError> {
    let outcome = convert::convert(path, format)?;
    debug!(
        format = format.as_str(),
        rows = outcome.rows.len(),
        dropped = outcome.dropped,
        "converted input file"
    );

    let staged = transform::stage_rows(outcome.rows, account_id);
    let existing = store.existing_imported_ids(account_id)?;
    let parts = dedupe::partition_duplicates(staged, &existing);
    let total = parts.new.len() + parts.duplicates.len();

    let mut session = ImportSession::new(file_name(path), account_id, format.as_str());
    session.total_count = total as i64;
    session.imported_count = parts.new.len() as i64;
    session.duplicate_count = parts.duplicates.len() as i64;
    session.file_hash = file_sha256(path).map_err(|source| FormatError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    // Rows and the audit record land together or not at all. A session
    // row is written even when every row was a duplicate.
    let session_id = store.insert_import_batch(&session, &parts.new)?;

    let mut categorized = 0;
    if auto_apply_rules {
        let fresh: Vec<Transaction> = store
            .uncategorized_transactions(Some(account_id))?
            .into_iter()
            .filter(|t| t.import_session_id == Some(session_id))
            .collect();
        categorized = rules::apply_rules_to(store, &fresh)?;
        if categorized > 0 {
            store.finalize_session_categorized(session_id, categorized as i64)?;
        }
    }

    let stats = ImportStats {
        total,
        imported: parts.new.len(),
        duplicates: parts.duplicates.len(),
        categorized,
        dropped: outcome.dropped,
    };
    info!(
        session = session_id,
        total = stats.total,
        imported = stats.imported,
        duplicates = stats.duplicates,
        categorized = stats.categorized,
        "import complete"
    );
    Ok(stats)
}

/// Steps 1-3 of the pipeline without persistence: the staged rows and
/// how many of them the store already has, for confirmation flows.
pub fn preview_import<S: RecordStore>(
    store: &S,
    path: &Path,
    account_id: i64,
    format: BankFormat,
) -> Result<(Vec<Transaction>, usize), ImportError> {
    let outcome = convert::convert(path, format)?;
    let staged = transform::stage_rows(outcome.rows, account_id);
    let existing = store.existing_imported_ids(account_id)?;
    let duplicates = dedupe::partition_duplicates(staged.clone(), &existing)
        .duplicates
        .len();
    Ok((staged, duplicates))
}

/// SHA-256 fingerprint of the source file, stored on the session so a
/// re-upload of the identical file can be flagged before parsing.
pub fn file_sha256(path: &Path) -> std::io::Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
