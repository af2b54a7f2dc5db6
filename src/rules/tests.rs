#![allow(clippy::unwrap_used)]

use super::*;
use crate::models::ImportSession;
use chrono::NaiveDate;
use rust_decimal_macros::dec;
use std::collections::HashSet;

/// Minimal in-memory stand-in for the SQLite store; anything providing
/// the `RecordStore` operations is interchangeable with it.
#[derive(Default)]
struct MemoryStore {
    transactions: Vec<Transaction>,
    rules: Vec<Rule>,
    sessions: Vec<ImportSession>,
}

impl RecordStore for MemoryStore {
    fn insert_import_batch(
        &mut self,
        session: &ImportSession,
        rows: &[Transaction],
    ) -> Result<i64, crate::errors::StoreError> {
        let session_id = self.sessions.len() as i64 + 1;
        let mut session = session.clone();
        session.id = Some(session_id);
        self.sessions.push(session);
        for row in rows {
            let mut row = row.clone();
            row.id = Some(self.transactions.len() as i64 + 1);
            row.import_session_id = Some(session_id);
            self.transactions.push(row);
        }
        Ok(session_id)
    }

    fn existing_imported_ids(
        &self,
        account_id: i64,
    ) -> Result<HashSet<String>, crate::errors::StoreError> {
        Ok(self
            .transactions
            .iter()
            .filter(|t| t.account_id == account_id && !t.imported_id.is_empty())
            .map(|t| t.imported_id.clone())
            .collect())
    }

    fn uncategorized_transactions(
        &self,
        account_id: Option<i64>,
    ) -> Result<Vec<Transaction>, crate::errors::StoreError> {
        Ok(self
            .transactions
            .iter()
            .filter(|t| !t.is_categorized)
            .filter(|t| account_id.is_none_or(|id| t.account_id == id))
            .cloned()
            .collect())
    }

    fn update_transaction_category(
        &mut self,
        transaction_id: i64,
        category: &str,
    ) -> Result<(), crate::errors::StoreError> {
        if let Some(txn) = self
            .transactions
            .iter_mut()
            .find(|t| t.id == Some(transaction_id))
        {
            if category.is_empty() {
                txn.category = None;
                txn.is_categorized = false;
            } else {
                txn.category = Some(category.to_string());
                txn.is_categorized = true;
            }
        }
        Ok(())
    }

    fn mark_transfer(
        &mut self,
        transaction_id: i64,
        transfer_account_id: i64,
    ) -> Result<(), crate::errors::StoreError> {
        if let Some(txn) = self
            .transactions
            .iter_mut()
            .find(|t| t.id == Some(transaction_id))
        {
            txn.is_transfer = true;
            txn.transfer_account_id = Some(transfer_account_id);
        }
        Ok(())
    }

    fn active_rules_by_priority(&self) -> Result<Vec<Rule>, crate::errors::StoreError> {
        let mut active: Vec<Rule> = self.rules.iter().filter(|r| r.is_active).cloned().collect();
        // Stable: ties keep insertion order.
        active.sort_by(|a, b| b.priority.cmp(&a.priority));
        Ok(active)
    }

    fn finalize_session_categorized(
        &mut self,
        session_id: i64,
        categorized: i64,
    ) -> Result<(), crate::errors::StoreError> {
        if let Some(session) = self.sessions.iter_mut().find(|s| s.id == Some(session_id)) {
            session.categorized_count = categorized;
        }
        Ok(())
    }
}

fn make_txn(id: i64, payee: &str, amount: rust_decimal::Decimal) -> Transaction {
    Transaction {
        id: Some(id),
        account_id: 1,
        date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
        payee: payee.into(),
        notes: String::new(),
        amount,
        category: None,
        is_categorized: false,
        is_transfer: false,
        transfer_account_id: None,
        imported_id: format!("key-{id}"),
        import_session_id: None,
    }
}

fn make_rule(name: &str, priority: i32, mode: MatchMode, conditions: Vec<RuleCondition>) -> Rule {
    Rule {
        id: None,
        name: name.into(),
        priority,
        is_active: true,
        match_mode: mode,
        conditions,
        actions: vec![RuleAction::SetCategory(name.to_string())],
    }
}

fn payee_contains(value: &str) -> RuleCondition {
    RuleCondition::new(RuleField::Payee, RuleOp::Contains, value)
}

fn amount_less_than(value: &str) -> RuleCondition {
    RuleCondition::new(RuleField::Amount, RuleOp::LessThan, value)
}

// ── evaluate_rule ─────────────────────────────────────────────

#[test]
fn test_empty_conditions_never_match() {
    let rule = make_rule("inert", 100, MatchMode::Any, vec![]);
    assert!(!evaluate_rule(&rule, &make_txn(1, "anything", dec!(-1))));
    let rule = make_rule("inert", 100, MatchMode::All, vec![]);
    assert!(!evaluate_rule(&rule, &make_txn(1, "anything", dec!(-1))));
}

#[test]
fn test_all_mode_is_conjunction() {
    let txn = make_txn(1, "Grocery Store", dec!(-45.50));
    let c1 = payee_contains("Grocery");
    let c2 = amount_less_than("-40");
    for (a, b) in [(c1.clone(), c2.clone()), (c2, c1)] {
        let rule = make_rule("r", 0, MatchMode::All, vec![a.clone(), b.clone()]);
        let expected = evaluate_condition(&a, &txn) && evaluate_condition(&b, &txn);
        assert_eq!(evaluate_rule(&rule, &txn), expected);
    }
}

#[test]
fn test_all_mode_fails_on_one_false() {
    let txn = make_txn(1, "Grocery Store", dec!(-45.50));
    let rule = make_rule(
        "r",
        0,
        MatchMode::All,
        vec![payee_contains("Grocery"), amount_less_than("-100")],
    );
    assert!(!evaluate_rule(&rule, &txn));
}

#[test]
fn test_any_mode_is_disjunction() {
    let txn = make_txn(1, "Grocery Store", dec!(-45.50));
    let rule = make_rule(
        "r",
        0,
        MatchMode::Any,
        vec![payee_contains("no-match"), amount_less_than("-40")],
    );
    assert!(evaluate_rule(&rule, &txn));
    let rule = make_rule(
        "r",
        0,
        MatchMode::Any,
        vec![payee_contains("no-match"), amount_less_than("-100")],
    );
    assert!(!evaluate_rule(&rule, &txn));
}

// ── apply_rules_to ────────────────────────────────────────────

#[test]
fn test_first_match_wins_by_priority() {
    let mut store = MemoryStore::default();
    store.transactions.push(make_txn(1, "Grocery Store", dec!(-45.50)));
    store
        .rules
        .push(make_rule("Low", 5, MatchMode::Any, vec![payee_contains("Grocery")]));
    store
        .rules
        .push(make_rule("High", 10, MatchMode::Any, vec![payee_contains("Grocery")]));

    let pending = store.uncategorized_transactions(None).unwrap();
    let count = apply_rules_to(&mut store, &pending).unwrap();
    assert_eq!(count, 1);
    assert_eq!(store.transactions[0].category.as_deref(), Some("High"));
}

#[test]
fn test_priority_tie_keeps_insertion_order() {
    let mut store = MemoryStore::default();
    store.transactions.push(make_txn(1, "Grocery Store", dec!(-45.50)));
    store
        .rules
        .push(make_rule("First", 5, MatchMode::Any, vec![payee_contains("Grocery")]));
    store
        .rules
        .push(make_rule("Second", 5, MatchMode::Any, vec![payee_contains("Grocery")]));

    let pending = store.uncategorized_transactions(None).unwrap();
    apply_rules_to(&mut store, &pending).unwrap();
    assert_eq!(store.transactions[0].category.as_deref(), Some("First"));
}

#[test]
fn test_unmatched_transaction_left_unchanged() {
    let mut store = MemoryStore::default();
    store.transactions.push(make_txn(1, "Salary", dec!(3000.00)));
    store
        .rules
        .push(make_rule("Groceries", 10, MatchMode::Any, vec![payee_contains("Grocery")]));

    let pending = store.uncategorized_transactions(None).unwrap();
    let count = apply_rules_to(&mut store, &pending).unwrap();
    assert_eq!(count, 0);
    assert!(store.transactions[0].category.is_none());
    assert!(!store.transactions[0].is_categorized);
}

#[test]
fn test_inactive_rules_skipped() {
    let mut store = MemoryStore::default();
    store.transactions.push(make_txn(1, "Grocery Store", dec!(-45.50)));
    let mut rule = make_rule("Groceries", 10, MatchMode::Any, vec![payee_contains("Grocery")]);
    rule.is_active = false;
    store.rules.push(rule);

    let pending = store.uncategorized_transactions(None).unwrap();
    assert_eq!(apply_rules_to(&mut store, &pending).unwrap(), 0);
}

#[test]
fn test_actions_apply_in_listed_order() {
    let mut store = MemoryStore::default();
    store.transactions.push(make_txn(1, "Grocery Store", dec!(-45.50)));
    let mut rule = make_rule("r", 0, MatchMode::Any, vec![payee_contains("Grocery")]);
    rule.actions = vec![
        RuleAction::SetCategory("First".into()),
        RuleAction::SetCategory("Second".into()),
    ];
    store.rules.push(rule);

    let pending = store.uncategorized_transactions(None).unwrap();
    let count = apply_rules_to(&mut store, &pending).unwrap();
    // One transaction categorized, last action's value sticks.
    assert_eq!(count, 1);
    assert_eq!(store.transactions[0].category.as_deref(), Some("Second"));
}

#[test]
fn test_mark_transfer_action() {
    let mut store = MemoryStore::default();
    store.transactions.push(make_txn(1, "Transfer to savings", dec!(-500.00)));
    let mut rule = make_rule("transfer", 0, MatchMode::Any, vec![payee_contains("Transfer")]);
    rule.actions = vec![RuleAction::MarkTransfer(2)];
    store.rules.push(rule);

    let pending = store.uncategorized_transactions(None).unwrap();
    let count = apply_rules_to(&mut store, &pending).unwrap();
    // Transfer marking alone is not categorization.
    assert_eq!(count, 0);
    assert!(store.transactions[0].is_transfer);
    assert_eq!(store.transactions[0].transfer_account_id, Some(2));
}

#[test]
fn test_apply_rules_to_uncategorized_scopes_by_account() {
    let mut store = MemoryStore::default();
    let mut other = make_txn(1, "Grocery Store", dec!(-45.50));
    other.account_id = 2;
    store.transactions.push(other);
    store.transactions.push({
        let mut t = make_txn(2, "Grocery Store", dec!(-45.50));
        t.account_id = 1;
        t
    });
    store
        .rules
        .push(make_rule("Groceries", 10, MatchMode::Any, vec![payee_contains("Grocery")]));

    let count = apply_rules_to_uncategorized(&mut store, Some(1)).unwrap();
    assert_eq!(count, 1);
    assert!(store.transactions[0].category.is_none());
    assert_eq!(store.transactions[1].category.as_deref(), Some("Groceries"));
}

// ── test_rule (dry run) ───────────────────────────────────────

#[test]
fn test_dry_run_reports_matches_without_mutating() {
    let sample = vec![
        make_txn(1, "Grocery Store", dec!(-45.50)),
        make_txn(2, "Salary", dec!(3000.00)),
    ];
    let rule = make_rule("Groceries", 10, MatchMode::Any, vec![payee_contains("Grocery")]);

    let matched = test_rule(&rule, &sample);
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].payee, "Grocery Store");
    assert!(sample.iter().all(|t| t.category.is_none()));
}

#[test]
fn test_count_matching() {
    let sample = vec![
        make_txn(1, "Grocery Store", dec!(-45.50)),
        make_txn(2, "Grocery Market", dec!(-12.00)),
        make_txn(3, "Salary", dec!(3000.00)),
    ];
    let rule = make_rule("Groceries", 10, MatchMode::Any, vec![payee_contains("Grocery")]);
    assert_eq!(count_matching(&rule, &sample), 2);
}

// ── rule_from_transaction ─────────────────────────────────────

#[test]
fn test_rule_from_categorized_transaction() {
    let mut txn = make_txn(1, "REWE Markt", dec!(-45.50));
    txn.category = Some("Groceries".into());
    let rule = rule_from_transaction(&txn, "rewe", 5).unwrap();
    assert_eq!(rule.priority, 5);
    assert_eq!(rule.conditions.len(), 1);
    assert_eq!(rule.conditions[0].value, "REWE Markt");
    assert_eq!(rule.actions, vec![RuleAction::SetCategory("Groceries".into())]);
}

#[test]
fn test_rule_from_uncategorized_transaction_is_none() {
    let txn = make_txn(1, "REWE Markt", dec!(-45.50));
    assert!(rule_from_transaction(&txn, "rewe", 5).is_none());
}
