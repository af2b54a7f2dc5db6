use serde::{Deserialize, Serialize};

/// How a rule combines its conditions: `All` = AND, `Any` = OR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    All,
    Any,
}

impl MatchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Any => "any",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "all" => Self::All,
            _ => Self::Any,
        }
    }
}

impl std::fmt::Display for MatchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleField {
    Payee,
    Amount,
    Notes,
    Category,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleOp {
    #[serde(rename = "contains")]
    Contains,
    #[serde(rename = "equals")]
    Equals,
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = ">")]
    GreaterThan,
}

/// One predicate: field selector, operator, comparison value.
/// Plain data; evaluation lives in `rules::condition`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleCondition {
    pub field: RuleField,
    #[serde(rename = "operator")]
    pub op: RuleOp,
    pub value: String,
}

impl RuleCondition {
    pub fn new(field: RuleField, op: RuleOp, value: impl Into<String>) -> Self {
        Self {
            field,
            op,
            value: value.into(),
        }
    }
}

/// One effect descriptor. New effects are added as variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action_type", content = "value", rename_all = "snake_case")]
pub enum RuleAction {
    SetCategory(String),
    MarkTransfer(i64),
}

/// A categorization directive. Higher priority runs first.
#[derive(Debug, Clone)]
pub struct Rule {
    pub id: Option<i64>,
    pub name: String,
    pub priority: i32,
    pub is_active: bool,
    pub match_mode: MatchMode,
    pub conditions: Vec<RuleCondition>,
    pub actions: Vec<RuleAction>,
}

impl Rule {
    /// Payee-contains rule that assigns a category. The common case.
    pub fn new_contains(name: impl Into<String>, pattern: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            priority: 0,
            is_active: true,
            match_mode: MatchMode::Any,
            conditions: vec![RuleCondition::new(RuleField::Payee, RuleOp::Contains, pattern)],
            actions: vec![RuleAction::SetCategory(category.into())],
        }
    }
}
