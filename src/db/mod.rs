mod schema;

use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;

use chrono::NaiveDate;
use rusqlite::{params, Connection, Row};
use rust_decimal::Decimal;
use tracing::debug;

use crate::errors::StoreError;
use crate::models::{Account, ImportSession, Rule, Transaction};

/// The record-store operations the pipeline and rule engine consume.
///
/// Any store providing these is interchangeable: `Database` is the
/// SQLite-backed one, tests substitute in-memory doubles.
/// `active_rules_by_priority` must return rules sorted by descending
/// priority with stored insertion order preserved on ties.
pub trait RecordStore {
    /// Persist the batch plus its session record as one atomic unit and
    /// return the session id. Either everything lands or nothing does,
    /// which is what makes a failed import safe to retry.
    fn insert_import_batch(
        &mut self,
        session: &ImportSession,
        rows: &[Transaction],
    ) -> Result<i64, StoreError>;

    fn existing_imported_ids(&self, account_id: i64) -> Result<HashSet<String>, StoreError>;

    fn uncategorized_transactions(
        &self,
        account_id: Option<i64>,
    ) -> Result<Vec<Transaction>, StoreError>;

    /// Sets the category and the categorized flag together; an empty
    /// category uncategorizes.
    fn update_transaction_category(
        &mut self,
        transaction_id: i64,
        category: &str,
    ) -> Result<(), StoreError>;

    fn mark_transfer(
        &mut self,
        transaction_id: i64,
        transfer_account_id: i64,
    ) -> Result<(), StoreError>;

    fn active_rules_by_priority(&self) -> Result<Vec<Rule>, StoreError>;

    /// Write the final auto-categorized count onto a session. The one
    /// permitted mutation of a session record, and only during the
    /// pipeline run that created it.
    fn finalize_session_categorized(
        &mut self,
        session_id: i64,
        categorized: i64,
    ) -> Result<(), StoreError>;
}

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        let mut db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        let mut db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&mut self) -> Result<(), StoreError> {
        let has_version_table: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
            [],
            |row| row.get(0),
        )?;

        if !has_version_table {
            self.conn.execute_batch(schema::SCHEMA_V1)?;
            self.conn.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                params![schema::CURRENT_VERSION],
            )?;
            return Ok(());
        }

        let current: i32 = self
            .conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .unwrap_or(0);

        for &(from_version, sql) in schema::MIGRATIONS {
            if current <= from_version {
                self.conn.execute_batch(sql)?;
            }
        }

        if current < schema::CURRENT_VERSION {
            self.conn.execute(
                "UPDATE schema_version SET version = ?1",
                params![schema::CURRENT_VERSION],
            )?;
        }

        Ok(())
    }

    // ── Accounts ──────────────────────────────────────────────

    pub fn insert_account(&self, account: &Account) -> Result<i64, StoreError> {
        self.conn.execute(
            "INSERT INTO accounts (name, bank, currency, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                account.name,
                account.bank,
                account.currency,
                account.created_at
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    // ── Transactions ──────────────────────────────────────────

    pub fn insert_transaction(&self, txn: &Transaction) -> Result<i64, StoreError> {
        self.conn.execute(
            "INSERT INTO transactions (account_id, date, payee, notes, amount, category,
                                       is_categorized, is_transfer, transfer_account_id,
                                       imported_id, import_session_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                txn.account_id,
                txn.date.format("%Y-%m-%d").to_string(),
                txn.payee,
                txn.notes,
                txn.amount.to_string(),
                txn.category,
                txn.category.as_deref().is_some_and(|c| !c.is_empty()),
                txn.is_transfer,
                txn.transfer_account_id,
                txn.imported_id,
                txn.import_session_id,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn transactions(&self, account_id: Option<i64>) -> Result<Vec<Transaction>, StoreError> {
        let (sql, args): (&str, Vec<i64>) = match account_id {
            Some(id) => (
                "SELECT id, account_id, date, payee, notes, amount, category, is_categorized,
                        is_transfer, transfer_account_id, imported_id, import_session_id
                 FROM transactions WHERE account_id = ?1 ORDER BY date DESC, id DESC",
                vec![id],
            ),
            None => (
                "SELECT id, account_id, date, payee, notes, amount, category, is_categorized,
                        is_transfer, transfer_account_id, imported_id, import_session_id
                 FROM transactions ORDER BY date DESC, id DESC",
                vec![],
            ),
        };
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(args), read_transaction)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn transaction_by_id(&self, id: i64) -> Result<Option<Transaction>, StoreError> {
        let result = self.conn.query_row(
            "SELECT id, account_id, date, payee, notes, amount, category, is_categorized,
                    is_transfer, transfer_account_id, imported_id, import_session_id
             FROM transactions WHERE id = ?1",
            params![id],
            read_transaction,
        );
        match result {
            Ok(t) => Ok(Some(t)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    // ── Rules ─────────────────────────────────────────────────

    pub fn insert_rule(&self, rule: &Rule) -> Result<i64, StoreError> {
        self.conn.execute(
            "INSERT INTO rules (name, priority, is_active, match_mode, conditions, actions)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                rule.name,
                rule.priority,
                rule.is_active,
                rule.match_mode.as_str(),
                serde_json::to_string(&rule.conditions).unwrap_or_else(|_| "[]".into()),
                serde_json::to_string(&rule.actions).unwrap_or_else(|_| "[]".into()),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn update_rule(&self, rule_id: i64, rule: &Rule) -> Result<(), StoreError> {
        self.conn.execute(
            "UPDATE rules SET name = ?1, priority = ?2, is_active = ?3, match_mode = ?4,
                              conditions = ?5, actions = ?6
             WHERE id = ?7",
            params![
                rule.name,
                rule.priority,
                rule.is_active,
                rule.match_mode.as_str(),
                serde_json::to_string(&rule.conditions).unwrap_or_else(|_| "[]".into()),
                serde_json::to_string(&rule.actions).unwrap_or_else(|_| "[]".into()),
                rule_id,
            ],
        )?;
        Ok(())
    }

    pub fn delete_rule(&self, rule_id: i64) -> Result<(), StoreError> {
        self.conn
            .execute("DELETE FROM rules WHERE id = ?1", params![rule_id])?;
        Ok(())
    }

    pub fn rules(&self, active_only: bool) -> Result<Vec<Rule>, StoreError> {
        let sql = if active_only {
            "SELECT id, name, priority, is_active, match_mode, conditions, actions
             FROM rules WHERE is_active = 1 ORDER BY priority DESC, id"
        } else {
            "SELECT id, name, priority, is_active, match_mode, conditions, actions
             FROM rules ORDER BY priority DESC, id"
        };
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map([], read_rule)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    // ── Import history ────────────────────────────────────────

    pub fn import_sessions(
        &self,
        account_id: Option<i64>,
        limit: usize,
    ) -> Result<Vec<ImportSession>, StoreError> {
        let (sql, args): (&str, Vec<i64>) = match account_id {
            Some(id) => (
                "SELECT id, filename, account_id, bank_format, imported_at, total_count,
                        imported_count, duplicate_count, categorized_count, file_hash
                 FROM import_sessions WHERE account_id = ?1
                 ORDER BY imported_at DESC, id DESC LIMIT ?2",
                vec![id, limit as i64],
            ),
            None => (
                "SELECT id, filename, account_id, bank_format, imported_at, total_count,
                        imported_count, duplicate_count, categorized_count, file_hash
                 FROM import_sessions ORDER BY imported_at DESC, id DESC LIMIT ?1",
                vec![limit as i64],
            ),
        };
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(args), read_session)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn import_session_by_id(&self, id: i64) -> Result<Option<ImportSession>, StoreError> {
        let result = self.conn.query_row(
            "SELECT id, filename, account_id, bank_format, imported_at, total_count,
                    imported_count, duplicate_count, categorized_count, file_hash
             FROM import_sessions WHERE id = ?1",
            params![id],
            read_session,
        );
        match result {
            Ok(s) => Ok(Some(s)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn transactions_for_session(
        &self,
        session_id: i64,
    ) -> Result<Vec<Transaction>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, account_id, date, payee, notes, amount, category, is_categorized,
                    is_transfer, transfer_account_id, imported_id, import_session_id
             FROM transactions WHERE import_session_id = ?1 ORDER BY date, id",
        )?;
        let rows = stmt.query_map(params![session_id], read_transaction)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Sessions that imported a byte-identical file, newest first. Lets
    /// callers warn before re-importing the same export.
    pub fn find_sessions_by_file_hash(
        &self,
        file_hash: &str,
    ) -> Result<Vec<ImportSession>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, filename, account_id, bank_format, imported_at, total_count,
                    imported_count, duplicate_count, categorized_count, file_hash
             FROM import_sessions WHERE file_hash = ?1 ORDER BY imported_at DESC, id DESC",
        )?;
        let rows = stmt.query_map(params![file_hash], read_session)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Remove a session record, unlinking its transactions rather than
    /// cascading into them.
    pub fn delete_import_session(&mut self, session_id: i64) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "UPDATE transactions SET import_session_id = NULL WHERE import_session_id = ?1",
            params![session_id],
        )?;
        tx.execute(
            "DELETE FROM import_sessions WHERE id = ?1",
            params![session_id],
        )?;
        tx.commit()?;
        Ok(())
    }
}

impl RecordStore for Database {
    fn insert_import_batch(
        &mut self,
        session: &ImportSession,
        rows: &[Transaction],
    ) -> Result<i64, StoreError> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO import_sessions (filename, account_id, bank_format, imported_at,
                                          total_count, imported_count, duplicate_count,
                                          categorized_count, file_hash)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                session.filename,
                session.account_id,
                session.bank_format,
                session.imported_at,
                session.total_count,
                session.imported_count,
                session.duplicate_count,
                session.categorized_count,
                session.file_hash,
            ],
        )?;
        let session_id = tx.last_insert_rowid();

        for txn in rows {
            tx.execute(
                "INSERT INTO transactions (account_id, date, payee, notes, amount, category,
                                           is_categorized, is_transfer, transfer_account_id,
                                           imported_id, import_session_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    txn.account_id,
                    txn.date.format("%Y-%m-%d").to_string(),
                    txn.payee,
                    txn.notes,
                    txn.amount.to_string(),
                    txn.category,
                    txn.category.as_deref().is_some_and(|c| !c.is_empty()),
                    txn.is_transfer,
                    txn.transfer_account_id,
                    txn.imported_id,
                    session_id,
                ],
            )?;
        }
        tx.commit()?;
        debug!(session = session_id, rows = rows.len(), "batch committed");
        Ok(session_id)
    }

    fn existing_imported_ids(&self, account_id: i64) -> Result<HashSet<String>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT imported_id FROM transactions WHERE account_id = ?1 AND imported_id != ''",
        )?;
        let rows = stmt.query_map(params![account_id], |row| row.get::<_, String>(0))?;
        Ok(rows.collect::<Result<HashSet<_>, _>>()?)
    }

    fn uncategorized_transactions(
        &self,
        account_id: Option<i64>,
    ) -> Result<Vec<Transaction>, StoreError> {
        let (sql, args): (&str, Vec<i64>) = match account_id {
            Some(id) => (
                "SELECT id, account_id, date, payee, notes, amount, category, is_categorized,
                        is_transfer, transfer_account_id, imported_id, import_session_id
                 FROM transactions WHERE is_categorized = 0 AND account_id = ?1
                 ORDER BY date, id",
                vec![id],
            ),
            None => (
                "SELECT id, account_id, date, payee, notes, amount, category, is_categorized,
                        is_transfer, transfer_account_id, imported_id, import_session_id
                 FROM transactions WHERE is_categorized = 0 ORDER BY date, id",
                vec![],
            ),
        };
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(args), read_transaction)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn update_transaction_category(
        &mut self,
        transaction_id: i64,
        category: &str,
    ) -> Result<(), StoreError> {
        if category.is_empty() {
            self.conn.execute(
                "UPDATE transactions SET category = NULL, is_categorized = 0 WHERE id = ?1",
                params![transaction_id],
            )?;
        } else {
            self.conn.execute(
                "UPDATE transactions SET category = ?1, is_categorized = 1 WHERE id = ?2",
                params![category, transaction_id],
            )?;
        }
        Ok(())
    }

    fn mark_transfer(
        &mut self,
        transaction_id: i64,
        transfer_account_id: i64,
    ) -> Result<(), StoreError> {
        self.conn.execute(
            "UPDATE transactions SET is_transfer = 1, transfer_account_id = ?1 WHERE id = ?2",
            params![transfer_account_id, transaction_id],
        )?;
        Ok(())
    }

    fn active_rules_by_priority(&self) -> Result<Vec<Rule>, StoreError> {
        self.rules(true)
    }

    fn finalize_session_categorized(
        &mut self,
        session_id: i64,
        categorized: i64,
    ) -> Result<(), StoreError> {
        self.conn.execute(
            "UPDATE import_sessions SET categorized_count = ?1 WHERE id = ?2",
            params![categorized, session_id],
        )?;
        Ok(())
    }
}

fn read_transaction(row: &Row<'_>) -> rusqlite::Result<Transaction> {
    let date_str: String = row.get(2)?;
    let amount_str: String = row.get(5)?;
    Ok(Transaction {
        id: Some(row.get(0)?),
        account_id: row.get(1)?,
        date: NaiveDate::parse_from_str(&date_str, "%Y-%m-%d").unwrap_or(NaiveDate::MIN),
        payee: row.get(3)?,
        notes: row.get(4)?,
        amount: Decimal::from_str(&amount_str).unwrap_or_default(),
        category: row.get(6)?,
        is_categorized: row.get(7)?,
        is_transfer: row.get(8)?,
        transfer_account_id: row.get(9)?,
        imported_id: row.get(10)?,
        import_session_id: row.get(11)?,
    })
}

fn read_session(row: &Row<'_>) -> rusqlite::Result<ImportSession> {
    Ok(ImportSession {
        id: Some(row.get(0)?),
        filename: row.get(1)?,
        account_id: row.get(2)?,
        bank_format: row.get(3)?,
        imported_at: row.get(4)?,
        total_count: row.get(5)?,
        imported_count: row.get(6)?,
        duplicate_count: row.get(7)?,
        categorized_count: row.get(8)?,
        file_hash: row.get(9)?,
    })
}

fn read_rule(row: &Row<'_>) -> rusqlite::Result<Rule> {
    let match_mode: String = row.get(4)?;
    let conditions: String = row.get(5)?;
    let actions: String = row.get(6)?;
    Ok(Rule {
        id: Some(row.get(0)?),
        name: row.get(1)?,
        priority: row.get(2)?,
        is_active: row.get(3)?,
        match_mode: crate::models::MatchMode::parse(&match_mode),
        // Malformed JSON leaves the rule inert rather than failing the query.
        conditions: serde_json::from_str(&conditions).unwrap_or_default(),
        actions: serde_json::from_str(&actions).unwrap_or_default(),
    })
}
