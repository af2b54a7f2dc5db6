mod account;
mod import_session;
mod rule;
mod transaction;

pub use account::Account;
pub use import_session::ImportSession;
pub use rule::{MatchMode, Rule, RuleAction, RuleCondition, RuleField, RuleOp};
pub use transaction::Transaction;
