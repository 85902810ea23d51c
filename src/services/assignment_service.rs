use std::sync::Arc;

use chrono::Utc;
use validator::Validate;

use crate::errors::{AppError, AppResult};
use crate::models::domain::exam_assignment::AssignmentStatus;
use crate::models::domain::{ExamAssignment, ExamResult};
use crate::models::dto::request::{AssignExamRequest, SubmitAnswersRequest};
use crate::models::dto::response::{AssignmentView, BulkOutcome};
use crate::repositories::{AssignmentRepository, ResultRepository, StudentRepository, TemplateRepository};
use crate::services::scoring_service::ScoringService;

pub struct AssignmentService {
    assignments: Arc<dyn AssignmentRepository>,
    results: Arc<dyn ResultRepository>,
    templates: Arc<dyn TemplateRepository>,
    students: Arc<dyn StudentRepository>,
}

impl AssignmentService {
    pub fn new(
        assignments: Arc<dyn AssignmentRepository>,
        results: Arc<dyn ResultRepository>,
        templates: Arc<dyn TemplateRepository>,
        students: Arc<dyn StudentRepository>,
    ) -> Self {
        Self {
            assignments,
            results,
            templates,
            students,
        }
    }

    /// Create one pending assignment per resolvable student. Identity
    /// failures are isolated per row, same as bulk ingestion.
    pub async fn assign_to_students(&self, request: AssignExamRequest) -> AppResult<BulkOutcome> {
        request.validate()?;

        let template = self
            .templates
            .find_by_id(&request.template_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Template with id '{}' not found",
                    request.template_id
                ))
            })?;

        let mut outcome = BulkOutcome::default();
        let mut staged: Vec<ExamAssignment> = Vec::with_capacity(request.student_user_ids.len());

        for user_id in &request.student_user_ids {
            match self
                .students
                .find_by_user_id(&request.institution_id, user_id)
                .await?
            {
                Some(student) => {
                    staged.push(ExamAssignment::new(
                        &request.institution_id,
                        &template.id,
                        &student.id,
                        user_id,
                        request.exam_date,
                        request.deadline,
                        &request.assigned_by,
                    ));
                }
                None => {
                    outcome.record_error(format!("{}: student record not found", user_id));
                }
            }
        }

        outcome.success_count = self.assignments.insert_many(staged).await?;

        log::info!(
            "Assigned template '{}' to {} students ({} failed)",
            template.id,
            outcome.success_count,
            outcome.failed_count
        );

        Ok(outcome)
    }

    /// Self-service submission. The result insert comes first and is
    /// idempotent through the unique assignment index; the status flip
    /// is a conditional update, so concurrent submitters and retries
    /// after a partial failure both resolve to a single stored result.
    pub async fn submit_answers(
        &self,
        assignment_id: &str,
        request: SubmitAnswersRequest,
    ) -> AppResult<ExamResult> {
        let assignment = self
            .assignments
            .find_by_id(assignment_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Assignment with id '{}' not found",
                    assignment_id
                ))
            })?;

        if assignment.user_id != request.user_id {
            return Err(AppError::Forbidden(
                "assignment belongs to another student".to_string(),
            ));
        }

        let now = Utc::now();
        match assignment.effective_status(now) {
            AssignmentStatus::Completed => {
                return Err(AppError::AlreadySubmitted(format!(
                    "assignment '{}' already has a submission",
                    assignment_id
                )));
            }
            AssignmentStatus::Expired => {
                return Err(AppError::ValidationError(format!(
                    "assignment '{}' deadline has passed",
                    assignment_id
                )));
            }
            AssignmentStatus::Pending => {}
        }

        let template = self
            .templates
            .find_by_id(&assignment.template_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Template with id '{}' not found",
                    assignment.template_id
                ))
            })?;

        if !template.has_answer_key() {
            return Err(AppError::MissingAnswerKey(format!(
                "template '{}' has no answer key",
                template.id
            )));
        }

        let answers = request.parse_answers()?;
        let scored = ScoringService::score_answers(&template, &answers)?;
        let result = ScoringService::build_result(
            scored,
            &assignment.institution_id,
            &template.id,
            &assignment.student_id,
            &assignment.user_id,
            assignment.exam_date,
            Some(assignment.id.clone()),
            Some(assignment.user_id.clone()),
        );

        let result = match self.results.create_submission(result).await {
            Ok(result) => result,
            Err(err @ AppError::AlreadySubmitted(_)) => {
                // A previous attempt inserted the result but may have
                // died before the status flip; heal it before rejecting.
                self.assignments.complete_if_pending(assignment_id).await?;
                return Err(err);
            }
            Err(err) => return Err(err),
        };

        let flipped = self.assignments.complete_if_pending(assignment_id).await?;
        if !flipped {
            log::warn!(
                "Assignment '{}' was not pending after result insert",
                assignment_id
            );
        }

        Ok(result)
    }

    /// Assignments for the student's dashboard, each annotated with a
    /// derived `has_submitted` and the lazily-expired status.
    pub async fn list_for_student(&self, user_id: &str) -> AppResult<Vec<AssignmentView>> {
        let assignments = self.assignments.list_by_user(user_id).await?;
        let now = Utc::now();

        let mut views = Vec::with_capacity(assignments.len());
        for assignment in &assignments {
            let has_submitted = self.results.exists_for_assignment(&assignment.id).await?;
            views.push(AssignmentView::from_assignment(assignment, has_submitted, now));
        }

        Ok(views)
    }
}
