use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::domain::exam_result::{AnswerChoice, QuestionNumber};

/// Maps one question number to the subject and topic it examines.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct QuestionMapping {
    pub question_number: QuestionNumber,
    pub subject: String,
    pub topic: String,
}

/// A reusable paper-exam definition: how many questions, what each one
/// covers, and the correct-answer key. Created by an administrator;
/// only the answer key and metadata are mutated afterwards.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ExamTemplate {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    pub exam_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exam_number: Option<i32>,
    pub total_questions: u32,
    pub question_mapping: Vec<QuestionMapping>,
    /// Empty until the key is entered; scoring cannot run before then.
    #[serde(default)]
    pub answer_key: BTreeMap<QuestionNumber, AnswerChoice>,
    pub is_public: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub institution_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ExamTemplate {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: &str,
        publisher: Option<String>,
        exam_type: &str,
        exam_number: Option<i32>,
        total_questions: u32,
        question_mapping: Vec<QuestionMapping>,
        answer_key: BTreeMap<QuestionNumber, AnswerChoice>,
        is_public: bool,
        institution_id: Option<String>,
        created_by: Option<String>,
    ) -> Self {
        ExamTemplate {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            publisher,
            exam_type: exam_type.to_string(),
            exam_number,
            total_questions,
            question_mapping,
            answer_key,
            is_public,
            institution_id,
            created_by,
            created_at: Some(Utc::now()),
            updated_at: Some(Utc::now()),
        }
    }

    pub fn has_answer_key(&self) -> bool {
        !self.answer_key.is_empty()
    }

    /// Looks up the subject/topic pair for a question number. Unmapped
    /// numbers return `None` and are skipped during aggregation.
    pub fn mapping_for(&self, question_number: QuestionNumber) -> Option<&QuestionMapping> {
        self.question_mapping
            .iter()
            .find(|m| m.question_number == question_number)
    }
}
