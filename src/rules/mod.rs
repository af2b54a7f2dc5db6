mod condition;

pub use condition::evaluate_condition;

use tracing::debug;

use crate::db::RecordStore;
use crate::errors::StoreError;
use crate::models::{MatchMode, Rule, RuleAction, RuleCondition, RuleField, RuleOp, Transaction};

/// Does the transaction satisfy the rule's combined conditions?
///
/// `All` is a short-circuit AND, `Any` a short-circuit OR. A rule with
/// no conditions never matches; an empty list is inert, not vacuously
/// true, so it cannot silently override every other rule.
pub fn evaluate_rule(rule: &Rule, txn: &Transaction) -> bool {
    if rule.conditions.is_empty() {
        return false;
    }
    match rule.match_mode {
        MatchMode::All => rule
            .conditions
            .iter()
            .all(|c| evaluate_condition(c, txn)),
        MatchMode::Any => rule
            .conditions
            .iter()
            .any(|c| evaluate_condition(c, txn)),
    }
}

/// Scan the active rules over the given transactions, applying the
/// first matching rule's actions to each. Returns how many transactions
/// received a category.
///
/// The scan order is the store's: priority descending, insertion order
/// on ties. It must stay sequential; first-match-wins depends on it.
pub fn apply_rules_to<S: RecordStore>(
    store: &mut S,
    transactions: &[Transaction],
) -> Result<usize, StoreError> {
    let rules = store.active_rules_by_priority()?;
    if rules.is_empty() {
        return Ok(0);
    }

    let mut categorized = 0;
    for txn in transactions {
        let Some(txn_id) = txn.id else { continue };
        for rule in &rules {
            if evaluate_rule(rule, txn) {
                debug!(rule = %rule.name, txn = txn_id, "rule matched");
                if apply_actions(store, rule, txn_id)? {
                    categorized += 1;
                }
                break;
            }
        }
    }
    Ok(categorized)
}

/// Apply the active rules to every stored uncategorized transaction,
/// optionally limited to one account.
pub fn apply_rules_to_uncategorized<S: RecordStore>(
    store: &mut S,
    account_id: Option<i64>,
) -> Result<usize, StoreError> {
    let pending = store.uncategorized_transactions(account_id)?;
    apply_rules_to(store, &pending)
}

/// Dry run: which of the sample would this rule match? Reuses the live
/// evaluator, mutates nothing.
pub fn test_rule(rule: &Rule, sample: &[Transaction]) -> Vec<Transaction> {
    sample
        .iter()
        .filter(|txn| evaluate_rule(rule, txn))
        .cloned()
        .collect()
}

pub fn count_matching(rule: &Rule, sample: &[Transaction]) -> usize {
    sample.iter().filter(|txn| evaluate_rule(rule, txn)).count()
}

/// Build a payee-contains rule out of an already-categorized
/// transaction. Returns `None` when the transaction has no category to
/// copy.
pub fn rule_from_transaction(txn: &Transaction, name: &str, priority: i32) -> Option<Rule> {
    let category = txn.category.as_deref().filter(|c| !c.is_empty())?;
    Some(Rule {
        id: None,
        name: name.to_string(),
        priority,
        is_active: true,
        match_mode: MatchMode::Any,
        conditions: vec![RuleCondition::new(
            RuleField::Payee,
            RuleOp::Contains,
            txn.payee.clone(),
        )],
        actions: vec![RuleAction::SetCategory(category.to_string())],
    })
}

/// Returns true when an action assigned a category.
fn apply_actions<S: RecordStore>(
    store: &mut S,
    rule: &Rule,
    txn_id: i64,
) -> Result<bool, StoreError> {
    let mut categorized = false;
    for action in &rule.actions {
        match action {
            RuleAction::SetCategory(category) => {
                store.update_transaction_category(txn_id, category)?;
                categorized = true;
            }
            RuleAction::MarkTransfer(account_id) => {
                store.mark_transfer(txn_id, *account_id)?;
            }
        }
    }
    Ok(categorized)
}

#[cfg(test)]
mod tests;
