use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::models::domain::exam_assignment::{AssignmentStatus, ExamAssignment};

/// Outcome of a batch operation: per-row failures never abort the rest
/// of the batch, they accumulate here.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BulkOutcome {
    pub success_count: usize,
    pub failed_count: usize,
    pub errors: Vec<String>,
}

impl BulkOutcome {
    pub fn record_error(&mut self, message: String) {
        self.failed_count += 1;
        self.errors.push(message);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicPerformance {
    pub subject: String,
    pub topic: String,
    pub total_questions: u32,
    pub correct_count: u32,
    pub wrong_count: u32,
    pub empty_count: u32,
    pub success_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectPerformance {
    pub subject: String,
    pub total_questions: u32,
    pub correct_count: u32,
    pub wrong_count: u32,
    pub empty_count: u32,
    pub net_score: f64,
    pub correct_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassComparison {
    pub class_average: f64,
    pub rank: usize,
    pub class_size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improving,
    Stable,
    Declining,
}

/// Everything the result-detail view needs for one sitting: stored
/// aggregates, the topic breakdown, weak topics, how the student placed
/// against the class, and their trend across past sittings.
#[derive(Debug, Clone, Serialize)]
pub struct ExamReport {
    pub result_id: String,
    pub template_id: String,
    pub exam_date: NaiveDate,
    pub correct_count: u32,
    pub wrong_count: u32,
    pub empty_count: u32,
    pub net_score: f64,
    pub topic_performances: Vec<TopicPerformance>,
    pub weak_topics: Vec<TopicPerformance>,
    pub class_comparison: ClassComparison,
    pub trend: Trend,
    pub previous_net_scores: Vec<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssignmentView {
    pub id: String,
    pub institution_id: String,
    pub template_id: String,
    pub user_id: String,
    pub exam_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
    pub status: AssignmentStatus,
    pub has_submitted: bool,
}

impl AssignmentView {
    pub fn from_assignment(
        assignment: &ExamAssignment,
        has_submitted: bool,
        now: DateTime<Utc>,
    ) -> Self {
        AssignmentView {
            id: assignment.id.clone(),
            institution_id: assignment.institution_id.clone(),
            template_id: assignment.template_id.clone(),
            user_id: assignment.user_id.clone(),
            exam_date: assignment.exam_date,
            deadline: assignment.deadline,
            status: assignment.effective_status(now),
            has_submitted,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceTrend {
    pub date: NaiveDate,
    pub average_net: f64,
    pub total_exams: usize,
    pub students_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentAnalytics {
    pub user_id: String,
    pub full_name: String,
    pub total_exams: usize,
    pub average_net: f64,
    pub correct_rate: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_exam_date: Option<NaiveDate>,
    pub trend: Trend,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsSummary {
    pub total_students: u64,
    pub total_exams_completed: usize,
    pub average_net: f64,
    pub active_students_this_week: usize,
    pub completion_rate: f64,
}
