/// Audit record of one import run. Written even when zero rows import;
/// counters are finalized with the batch and never touched afterwards.
#[derive(Debug, Clone)]
pub struct ImportSession {
    pub id: Option<i64>,
    pub filename: String,
    pub account_id: i64,
    pub bank_format: String,
    pub imported_at: String,
    pub total_count: i64,
    pub imported_count: i64,
    pub duplicate_count: i64,
    pub categorized_count: i64,
    pub file_hash: String,
}

impl ImportSession {
    pub fn new(filename: impl Into<String>, account_id: i64, bank_format: impl Into<String>) -> Self {
        Self {
            id: None,
            filename: filename.into(),
            account_id,
            bank_format: bank_format.into(),
            imported_at: chrono::Utc::now().to_rfc3339(),
            total_count: 0,
            imported_count: 0,
            duplicate_count: 0,
            categorized_count: 0,
            file_hash: String::new(),
        }
    }
}
