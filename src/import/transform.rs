use chrono::NaiveDate;
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};

use super::convert::CanonicalRow;
use crate::models::Transaction;

/// Duplicate-detection key: a deterministic function of the immutable
/// transaction content (account, date, payee, amount). Re-importing the
/// same logical row from any file yields the same key. Two genuinely
/// distinct rows sharing all four fields collapse to one key; the
/// source exports carry no sequence number to tell them apart.
pub fn imported_id(account_id: i64, date: NaiveDate, payee: &str, amount: &Decimal) -> String {
    let data = format!("{account_id}_{date}_{amount}_{payee}");
    let digest = Sha256::digest(data.as_bytes());
    format!("{date}_{amount}_{}", hex::encode(&digest[..4]))
}

/// Attach account identity and the duplicate key to canonical rows.
/// The import-session id is stamped by the store when the batch lands.
pub fn stage_rows(rows: Vec<CanonicalRow>, account_id: i64) -> Vec<Transaction> {
    rows.into_iter()
        .map(|row| {
            let key = imported_id(account_id, row.date, &row.payee, &row.amount);
            Transaction {
                id: None,
                account_id,
                date: row.date,
                payee: row.payee,
                notes: row.notes,
                amount: row.amount,
                category: None,
                is_categorized: false,
                is_transfer: false,
                transfer_account_id: None,
                imported_id: key,
                import_session_id: None,
            }
        })
        .collect()
}

#[cfg(test)]
#[path = "transform_tests.rs"]
mod tests;
