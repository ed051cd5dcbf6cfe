use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRecord {
    pub user_id: String,
    pub lesson_id: i64,
    pub completed: bool,
    pub completed_at: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionResponse {
    pub lesson_id: i64,
    pub completed_at: String,
    /// False when the lesson was already complete and nothing was written.
    pub newly_completed: bool,
}
