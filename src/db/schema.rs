pub(crate) const SCHEMA_V1: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS accounts (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    name       TEXT NOT NULL,
    bank       TEXT NOT NULL DEFAULT '',
    currency   TEXT NOT NULL DEFAULT 'EUR',
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS import_sessions (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    filename          TEXT NOT NULL,
    account_id        INTEGER NOT NULL REFERENCES accounts(id),
    bank_format       TEXT NOT NULL,
    imported_at       TEXT NOT NULL,
    total_count       INTEGER NOT NULL DEFAULT 0,
    imported_count    INTEGER NOT NULL DEFAULT 0,
    duplicate_count   INTEGER NOT NULL DEFAULT 0,
    categorized_count INTEGER NOT NULL DEFAULT 0,
    file_hash         TEXT NOT NULL DEFAULT ''
);

CREATE TABLE IF NOT EXISTS transactions (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    account_id          INTEGER NOT NULL REFERENCES accounts(id),
    date                TEXT NOT NULL,
    payee               TEXT NOT NULL,
    notes               TEXT NOT NULL DEFAULT '',
    amount              TEXT NOT NULL,
    category            TEXT,
    is_categorized      BOOLEAN NOT NULL DEFAULT 0,
    is_transfer         BOOLEAN NOT NULL DEFAULT 0,
    transfer_account_id INTEGER REFERENCES accounts(id),
    imported_id         TEXT NOT NULL DEFAULT '',
    import_session_id   INTEGER REFERENCES import_sessions(id)
);

CREATE INDEX IF NOT EXISTS idx_transactions_date ON transactions(date);
CREATE INDEX IF NOT EXISTS idx_transactions_account ON transactions(account_id);
CREATE INDEX IF NOT EXISTS idx_transactions_session ON transactions(import_session_id);
CREATE UNIQUE INDEX IF NOT EXISTS idx_transactions_imported_id
    ON transactions(account_id, imported_id) WHERE imported_id != '';

CREATE TABLE IF NOT EXISTS rules (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    name       TEXT NOT NULL,
    priority   INTEGER NOT NULL DEFAULT 0,
    is_active  BOOLEAN NOT NULL DEFAULT 1,
    match_mode TEXT NOT NULL DEFAULT 'any',
    conditions TEXT NOT NULL DEFAULT '[]',
    actions    TEXT NOT NULL DEFAULT '[]'
);

CREATE INDEX IF NOT EXISTS idx_sessions_account ON import_sessions(account_id);
CREATE INDEX IF NOT EXISTS idx_sessions_file_hash ON import_sessions(file_hash);
"#;

pub(crate) const CURRENT_VERSION: i32 = 1;

/// Migrations from version N to N+1.
/// Each entry is (from_version, sql).
pub(crate) const MIGRATIONS: &[(i32, &str)] = &[];
