use std::str::FromStr;

use rust_decimal::Decimal;

use crate::models::{RuleCondition, RuleField, RuleOp, Transaction};

/// Evaluate one condition against one transaction.
///
/// Pure and total: type mismatches (a numeric comparison against text)
/// are non-matches, never errors. String fields compare
/// case-insensitively; `amount` compares numerically.
pub fn evaluate_condition(cond: &RuleCondition, txn: &Transaction) -> bool {
    match cond.op {
        RuleOp::Contains => field_text(cond.field, txn)
            .to_lowercase()
            .contains(&cond.value.to_lowercase()),
        RuleOp::Equals => match cond.field {
            RuleField::Amount => match Decimal::from_str(cond.value.trim()) {
                Ok(value) => txn.amount == value,
                Err(_) => false,
            },
            _ => field_text(cond.field, txn).to_lowercase() == cond.value.to_lowercase(),
        },
        RuleOp::LessThan => compare_numeric(cond, txn, |field, value| field < value),
        RuleOp::GreaterThan => compare_numeric(cond, txn, |field, value| field > value),
    }
}

fn field_text(field: RuleField, txn: &Transaction) -> String {
    match field {
        RuleField::Payee => txn.payee.clone(),
        RuleField::Notes => txn.notes.clone(),
        RuleField::Category => txn.category_label().to_string(),
        RuleField::Amount => txn.amount.to_string(),
    }
}

fn compare_numeric(
    cond: &RuleCondition,
    txn: &Transaction,
    cmp: impl Fn(Decimal, Decimal) -> bool,
) -> bool {
    let field_value = match cond.field {
        RuleField::Amount => txn.amount,
        // Text fields join the comparison only when they happen to hold
        // a number; anything else is a non-match.
        _ => match Decimal::from_str(field_text(cond.field, txn).trim()) {
            Ok(v) => v,
            Err(_) => return false,
        },
    };
    match Decimal::from_str(cond.value.trim()) {
        Ok(value) => cmp(field_value, value),
        Err(_) => false,
    }
}

#[cfg(test)]
#[path = "condition_tests.rs"]
mod tests;
