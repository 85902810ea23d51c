use std::collections::BTreeMap;

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::models::domain::exam_result::{AnswerChoice, AnswerRecord, QuestionNumber};
use crate::models::domain::{ExamResult, ExamTemplate};

/// Output of scoring one answer set against a template's answer key.
#[derive(Clone, Debug, PartialEq)]
pub struct ScoredAnswers {
    pub answers: BTreeMap<QuestionNumber, AnswerRecord>,
    pub correct_count: u32,
    pub wrong_count: u32,
    pub empty_count: u32,
    pub net_score: f64,
}

pub struct ScoringService;

impl ScoringService {
    /// Score a student's raw answers against the template's answer key.
    ///
    /// Pure and deterministic. Every question `1..=total_questions` is
    /// classified exactly once: the empty sentinel (and any question the
    /// student supplied no entry for) counts as empty; an exact match
    /// with the key counts as correct; everything else, including
    /// questions the key has no entry for, counts as wrong. Entries
    /// outside the template's range are ignored.
    pub fn score_answers(
        template: &ExamTemplate,
        answers: &BTreeMap<QuestionNumber, AnswerChoice>,
    ) -> AppResult<ScoredAnswers> {
        if !template.has_answer_key() {
            return Err(AppError::MissingAnswerKey(format!(
                "template '{}' has no answer key",
                template.id
            )));
        }

        let mut records = BTreeMap::new();
        let mut correct_count: u32 = 0;
        let mut wrong_count: u32 = 0;
        let mut empty_count: u32 = 0;

        for number in 1..=template.total_questions {
            let number = QuestionNumber(number);
            let answer = answers.get(&number).copied().unwrap_or(AnswerChoice::Empty);

            let is_correct = if answer.is_empty() {
                empty_count += 1;
                false
            } else if template.answer_key.get(&number) == Some(&answer) {
                correct_count += 1;
                true
            } else {
                wrong_count += 1;
                false
            };

            records.insert(number, AnswerRecord { answer, is_correct });
        }

        // Four wrong answers cancel one correct answer; no floor at zero.
        let net_score = correct_count as f64 - wrong_count as f64 / 4.0;

        Ok(ScoredAnswers {
            answers: records,
            correct_count,
            wrong_count,
            empty_count,
            net_score,
        })
    }

    /// Assemble a persistable result from a scoring pass. The scaled
    /// `score` is external policy and stays unset here.
    #[allow(clippy::too_many_arguments)]
    pub fn build_result(
        scored: ScoredAnswers,
        institution_id: &str,
        template_id: &str,
        student_id: &str,
        user_id: &str,
        exam_date: NaiveDate,
        assignment_id: Option<String>,
        created_by: Option<String>,
    ) -> ExamResult {
        ExamResult {
            id: Uuid::new_v4().to_string(),
            institution_id: institution_id.to_string(),
            template_id: template_id.to_string(),
            student_id: student_id.to_string(),
            user_id: user_id.to_string(),
            exam_date,
            answers: scored.answers,
            correct_count: scored.correct_count,
            wrong_count: scored.wrong_count,
            empty_count: scored.empty_count,
            net_score: scored.net_score,
            score: None,
            assignment_id,
            created_by,
            created_at: Some(Utc::now()),
        }
    }
}
