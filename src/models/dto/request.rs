use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::errors::{AppError, AppResult};
use crate::models::domain::exam_result::{AnswerChoice, QuestionNumber};

#[derive(Debug, Clone, Deserialize)]
pub struct QuestionMappingInput {
    pub question_number: u32,
    pub subject: String,
    pub topic: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTemplateRequest {
    #[validate(length(min = 1, max = 150))]
    pub name: String,

    pub publisher: Option<String>,

    #[validate(length(min = 1, max = 20))]
    pub exam_type: String,

    pub exam_number: Option<i32>,

    pub total_questions: u32,

    pub question_mapping: Vec<QuestionMappingInput>,

    /// Raw labels, normalized via [`parse_answer_key`] before storage.
    pub answer_key: Option<BTreeMap<QuestionNumber, String>>,

    pub is_public: Option<bool>,

    pub institution_id: Option<String>,

    pub created_by: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateAnswerKeyRequest {
    pub answer_key: BTreeMap<QuestionNumber, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TemplateListQuery {
    pub institution_id: Option<String>,
    pub exam_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BulkResultEntry {
    pub student_user_id: String,
    pub student_name: String,
    pub answers: BTreeMap<QuestionNumber, String>,
}

impl BulkResultEntry {
    /// Normalizes one row's raw labels. Returns a human-readable error
    /// so a bad row can be reported without aborting the batch.
    pub fn parse_answers(&self) -> Result<BTreeMap<QuestionNumber, AnswerChoice>, String> {
        let mut parsed = BTreeMap::new();
        for (number, label) in &self.answers {
            match AnswerChoice::parse_label(label) {
                Some(choice) => {
                    parsed.insert(*number, choice);
                }
                None => {
                    return Err(format!(
                        "{}: invalid answer '{}' for question {}",
                        self.student_name, label, number
                    ));
                }
            }
        }
        Ok(parsed)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct BulkResultsRequest {
    #[validate(length(min = 1))]
    pub institution_id: String,

    #[validate(length(min = 1))]
    pub template_id: String,

    pub exam_date: NaiveDate,

    #[validate(length(min = 1))]
    pub results: Vec<BulkResultEntry>,

    #[validate(length(min = 1))]
    pub created_by: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AssignExamRequest {
    #[validate(length(min = 1))]
    pub institution_id: String,

    #[validate(length(min = 1))]
    pub template_id: String,

    #[validate(length(min = 1))]
    pub student_user_ids: Vec<String>,

    pub exam_date: NaiveDate,

    pub deadline: Option<DateTime<Utc>>,

    #[validate(length(min = 1))]
    pub assigned_by: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitAnswersRequest {
    pub user_id: String,
    pub answers: BTreeMap<QuestionNumber, String>,
}

impl SubmitAnswersRequest {
    pub fn parse_answers(&self) -> AppResult<BTreeMap<QuestionNumber, AnswerChoice>> {
        let mut parsed = BTreeMap::new();
        for (number, label) in &self.answers {
            let choice = AnswerChoice::parse_label(label).ok_or_else(|| {
                AppError::ValidationError(format!(
                    "invalid answer '{}' for question {}",
                    label, number
                ))
            })?;
            parsed.insert(*number, choice);
        }
        Ok(parsed)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResultListQuery {
    pub institution_id: String,
    pub user_id: Option<String>,
    pub template_id: Option<String>,
    pub exam_date: Option<NaiveDate>,
    pub date_start: Option<NaiveDate>,
    pub date_end: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalyticsQuery {
    pub institution_id: String,
    pub date_start: Option<NaiveDate>,
    pub date_end: Option<NaiveDate>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct WeightedQuestionQuery {
    #[validate(length(min = 1))]
    pub subject: String,

    #[validate(range(min = 1, max = 200))]
    pub count: u32,
}

/// Normalizes a caller-supplied answer key. Only real option labels are
/// accepted; the empty sentinel has no meaning inside a key.
pub fn parse_answer_key(
    raw: &BTreeMap<QuestionNumber, String>,
) -> AppResult<BTreeMap<QuestionNumber, AnswerChoice>> {
    let mut key = BTreeMap::new();
    for (number, label) in raw {
        match AnswerChoice::parse_label(label) {
            Some(choice) if !choice.is_empty() => {
                key.insert(*number, choice);
            }
            _ => {
                return Err(AppError::ValidationError(format!(
                    "invalid answer key label '{}' for question {}",
                    label, number
                )));
            }
        }
    }
    Ok(key)
}
