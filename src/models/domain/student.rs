use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StudentStatus {
    Pending,
    Approved,
    Rejected,
}

/// An institution-scoped student record, resolved from the platform
/// user id. Only approved students count toward institution analytics.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Student {
    pub id: String,
    pub user_id: String,
    pub institution_id: String,
    pub full_name: String,
    pub status: StudentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}
