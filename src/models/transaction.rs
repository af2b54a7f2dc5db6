use chrono::NaiveDate;
use rust_decimal::Decimal;

/// One financial movement. Expenses are negative, income positive.
#[derive(Debug, Clone)]
pub struct Transaction {
    pub id: Option<i64>,
    pub account_id: i64,
    pub date: NaiveDate,
    pub payee: String,
    pub notes: String,
    pub amount: Decimal,
    pub category: Option<String>,
    pub is_categorized: bool,
    pub is_transfer: bool,
    pub transfer_account_id: Option<i64>,
    /// Deterministic duplicate-detection key; empty for manual entries.
    pub imported_id: String,
    pub import_session_id: Option<i64>,
}

impl Transaction {
    pub fn is_income(&self) -> bool {
        self.amount > Decimal::ZERO
    }

    pub fn is_expense(&self) -> bool {
        self.amount < Decimal::ZERO
    }

    pub fn abs_amount(&self) -> Decimal {
        self.amount.abs()
    }

    /// Category label, empty when uncategorized.
    pub fn category_label(&self) -> &str {
        self.category.as_deref().unwrap_or("")
    }
}
