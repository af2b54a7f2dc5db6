//! Bank-export import pipeline with duplicate detection and rule-based
//! auto-categorization.
//!
//! A raw export file goes through a fixed sequence: a bank format
//! converter normalizes it into canonical `date,payee,notes,amount`
//! rows, the transformer stamps account identity and a deterministic
//! duplicate key, the detector splits the batch against what the store
//! already holds, and the surviving rows are persisted atomically
//! together with an audit session record. Optionally the rule engine
//! then categorizes the fresh rows: active rules ordered by priority,
//! AND/OR condition combination, first match wins.
//!
//! The UI, account management, and reporting around this live in the
//! host application; this crate only needs something implementing
//! [`db::RecordStore`], and ships the SQLite-backed [`db::Database`].

pub mod config;
pub mod db;
pub mod errors;
pub mod import;
pub mod models;
pub mod rules;

pub use config::Config;
pub use db::{Database, RecordStore};
pub use errors::{FormatError, ImportError, StoreError};
pub use import::{import_transactions, preview_import, BankFormat, ImportStats};
pub use models::{ImportSession, MatchMode, Rule, RuleAction, RuleCondition, RuleField, RuleOp, Transaction};
pub use rules::{apply_rules_to_uncategorized, evaluate_condition, evaluate_rule, test_rule};
