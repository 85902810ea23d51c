use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionDifficulty {
    Easy,
    Medium,
    Hard,
}

/// A question-bank entry as consumed by the weighted sampler. The stem
/// and options are opaque to this service; only the subject/topic tags
/// and the id (for deduplication) matter here.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct QuestionRecord {
    pub id: String,
    pub subject: String,
    pub topic: String,
    pub difficulty: QuestionDifficulty,
    pub content: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// One fetch against the question bank: a subject, an optional topic
/// filter, and how many questions to pull.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct QuestionRequest {
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    pub count: u32,
}
