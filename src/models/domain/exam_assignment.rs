use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stored assignment state. Only `Pending -> Completed` is ever written;
/// `Expired` is derived at read time from the deadline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentStatus {
    Pending,
    Completed,
    Expired,
}

/// A record that a specific student owes a response to a specific
/// template instance (exam date plus optional entry deadline).
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ExamAssignment {
    pub id: String,
    pub institution_id: String,
    pub template_id: String,
    pub student_id: String,
    pub user_id: String,
    pub exam_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
    pub status: AssignmentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl ExamAssignment {
    pub fn new(
        institution_id: &str,
        template_id: &str,
        student_id: &str,
        user_id: &str,
        exam_date: NaiveDate,
        deadline: Option<DateTime<Utc>>,
        assigned_by: &str,
    ) -> Self {
        ExamAssignment {
            id: Uuid::new_v4().to_string(),
            institution_id: institution_id.to_string(),
            template_id: template_id.to_string(),
            student_id: student_id.to_string(),
            user_id: user_id.to_string(),
            exam_date,
            deadline,
            status: AssignmentStatus::Pending,
            assigned_by: Some(assigned_by.to_string()),
            created_at: Some(Utc::now()),
        }
    }

    /// Read-time status: a pending assignment whose deadline has passed
    /// classifies as expired without a stored transition.
    pub fn effective_status(&self, now: DateTime<Utc>) -> AssignmentStatus {
        match (self.status, self.deadline) {
            (AssignmentStatus::Pending, Some(deadline)) if deadline < now => {
                AssignmentStatus::Expired
            }
            (status, _) => status,
        }
    }
}
