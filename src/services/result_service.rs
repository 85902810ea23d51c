use std::sync::Arc;

use validator::Validate;

use crate::errors::{AppError, AppResult};
use crate::models::domain::ExamResult;
use crate::models::dto::request::{BulkResultsRequest, ResultListQuery};
use crate::models::dto::response::BulkOutcome;
use crate::repositories::{ResultFilter, ResultRepository, StudentRepository, TemplateRepository};
use crate::services::scoring_service::ScoringService;

pub struct ResultService {
    templates: Arc<dyn TemplateRepository>,
    results: Arc<dyn ResultRepository>,
    students: Arc<dyn StudentRepository>,
}

impl ResultService {
    pub fn new(
        templates: Arc<dyn TemplateRepository>,
        results: Arc<dyn ResultRepository>,
        students: Arc<dyn StudentRepository>,
    ) -> Self {
        Self {
            templates,
            results,
            students,
        }
    }

    /// Score and persist a class-wide batch of answer sets. A missing
    /// template or answer key fails the whole batch; a row whose
    /// student cannot be resolved or whose answers do not parse is
    /// reported and skipped without aborting the rest.
    pub async fn create_bulk_results(
        &self,
        request: BulkResultsRequest,
    ) -> AppResult<BulkOutcome> {
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

        if !template.has_answer_key() {
            return Err(AppError::MissingAnswerKey(format!(
                "template '{}' has no answer key",
                template.id
            )));
        }

        let mut outcome = BulkOutcome::default();
        let mut staged: Vec<ExamResult> = Vec::with_capacity(request.results.len());

        for entry in &request.results {
            let student = match self
                .students
                .find_by_user_id(&request.institution_id, &entry.student_user_id)
                .await?
            {
                Some(student) => student,
                None => {
                    outcome.record_error(format!(
                        "{}: student record not found",
                        entry.student_name
                    ));
                    continue;
                }
            };

            let answers = match entry.parse_answers() {
                Ok(answers) => answers,
                Err(message) => {
                    outcome.record_error(message);
                    continue;
                }
            };

            let scored = ScoringService::score_answers(&template, &answers)?;
            staged.push(ScoringService::build_result(
                scored,
                &request.institution_id,
                &template.id,
                &student.id,
                &entry.student_user_id,
                request.exam_date,
                None,
                Some(request.created_by.clone()),
            ));
        }

        outcome.success_count = self.results.insert_many(staged).await?;

        log::info!(
            "Bulk result ingestion for template '{}': {} scored, {} failed",
            template.id,
            outcome.success_count,
            outcome.failed_count
        );

        Ok(outcome)
    }

    pub async fn list_results(&self, query: &ResultListQuery) -> AppResult<Vec<ExamResult>> {
        self.results
            .list(&ResultFilter {
                institution_id: query.institution_id.clone(),
                user_id: query.user_id.clone(),
                template_id: query.template_id.clone(),
                exam_date: query.exam_date,
                date_start: query.date_start,
                date_end: query.date_end,
            })
            .await
    }

    pub async fn delete_result(&self, id: &str) -> AppResult<()> {
        self.results.delete(id).await
    }
}
