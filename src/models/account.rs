/// Owner row for transactions. Account management itself lives outside
/// this crate; this is just enough for the foreign key to be real.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: Option<i64>,
    pub name: String,
    pub bank: String,
    pub currency: String,
    pub created_at: String,
}

impl Account {
    pub fn new(name: impl Into<String>, bank: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            bank: bank.into(),
            currency: "EUR".to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}
