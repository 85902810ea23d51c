use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use validator::Validate;

use crate::errors::{AppError, AppResult};
use crate::models::domain::exam_result::QuestionNumber;
use crate::models::domain::{ExamTemplate, QuestionMapping};
use crate::models::dto::request::{parse_answer_key, CreateTemplateRequest, UpdateAnswerKeyRequest};
use crate::repositories::TemplateRepository;

pub struct TemplateService {
    repository: Arc<dyn TemplateRepository>,
}

impl TemplateService {
    pub fn new(repository: Arc<dyn TemplateRepository>) -> Self {
        Self { repository }
    }

    pub async fn create_template(
        &self,
        request: CreateTemplateRequest,
    ) -> AppResult<ExamTemplate> {
        request.validate()?;

        if request.total_questions == 0 {
            return Err(AppError::ValidationError(
                "total_questions must be at least 1".to_string(),
            ));
        }

        let mapping = Self::validate_mapping(&request)?;

        let answer_key = match &request.answer_key {
            Some(raw) => parse_answer_key(raw)?,
            None => BTreeMap::new(),
        };

        let template = ExamTemplate::new(
            &request.name,
            request.publisher.clone(),
            &request.exam_type,
            request.exam_number,
            request.total_questions,
            mapping,
            answer_key,
            request.is_public.unwrap_or(false),
            request.institution_id.clone(),
            request.created_by.clone(),
        );

        log::info!(
            "Creating exam template '{}' ({} questions, key {})",
            template.name,
            template.total_questions,
            if template.has_answer_key() { "present" } else { "pending" }
        );

        self.repository.create(template).await
    }

    pub async fn get_template(&self, id: &str) -> AppResult<ExamTemplate> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Template with id '{}' not found", id)))
    }

    pub async fn list_templates(
        &self,
        institution_id: Option<&str>,
        exam_type: Option<&str>,
    ) -> AppResult<Vec<ExamTemplate>> {
        self.repository.list(institution_id, exam_type).await
    }

    /// Wholesale replacement of the stored key, not a merge.
    pub async fn update_answer_key(
        &self,
        template_id: &str,
        request: UpdateAnswerKeyRequest,
    ) -> AppResult<ExamTemplate> {
        let answer_key = parse_answer_key(&request.answer_key)?;
        self.repository
            .update_answer_key(template_id, &answer_key)
            .await
    }

    pub async fn delete_template(&self, id: &str) -> AppResult<()> {
        self.repository.delete(id).await
    }

    /// Question numbers must exactly cover `1..=total_questions` with no
    /// duplicates, and every entry needs a subject and a topic.
    fn validate_mapping(request: &CreateTemplateRequest) -> AppResult<Vec<QuestionMapping>> {
        if request.question_mapping.len() != request.total_questions as usize {
            return Err(AppError::ValidationError(format!(
                "question_mapping has {} entries for {} questions",
                request.question_mapping.len(),
                request.total_questions
            )));
        }

        let mut seen = HashSet::new();
        let mut mapping = Vec::with_capacity(request.question_mapping.len());

        for entry in &request.question_mapping {
            if entry.subject.trim().is_empty() || entry.topic.trim().is_empty() {
                return Err(AppError::ValidationError(format!(
                    "question {} is missing a subject or topic",
                    entry.question_number
                )));
            }

            if entry.question_number < 1 || entry.question_number > request.total_questions {
                return Err(AppError::ValidationError(format!(
                    "question number {} is outside 1..={}",
                    entry.question_number, request.total_questions
                )));
            }

            if !seen.insert(entry.question_number) {
                return Err(AppError::ValidationError(format!(
                    "duplicate question number {}",
                    entry.question_number
                )));
            }

            mapping.push(QuestionMapping {
                question_number: QuestionNumber(entry.question_number),
                subject: entry.subject.trim().to_string(),
                topic: entry.topic.trim().to_string(),
            });
        }

        Ok(mapping)
    }
}
