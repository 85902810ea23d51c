pub mod fixtures {
    use std::collections::BTreeMap;

    use chrono::NaiveDate;

    use crate::models::domain::exam_result::{AnswerChoice, AnswerRecord, QuestionNumber};
    use crate::models::domain::{ExamResult, ExamTemplate, QuestionMapping};

    /// Template whose questions all map to `Matematik`, with the given
    /// answer-key entries. Pass an empty slice for a pending key.
    pub fn template_with_key(total_questions: u32, key: &[(u32, &str)]) -> ExamTemplate {
        let mapping = (1..=total_questions)
            .map(|number| QuestionMapping {
                question_number: QuestionNumber(number),
                subject: "Matematik".to_string(),
                topic: if number % 2 == 0 { "Cebir" } else { "Sayılar" }.to_string(),
            })
            .collect();

        let answer_key = key
            .iter()
            .map(|(number, label)| {
                (
                    QuestionNumber(*number),
                    AnswerChoice::parse_label(label).expect("fixture labels are valid"),
                )
            })
            .collect();

        ExamTemplate::new(
            "TYT Deneme 1",
            Some("Genel".to_string()),
            "TYT",
            Some(1),
            total_questions,
            mapping,
            answer_key,
            true,
            None,
            Some("admin-1".to_string()),
        )
    }

    pub fn answers_from(entries: &[(u32, &str)]) -> BTreeMap<QuestionNumber, AnswerChoice> {
        entries
            .iter()
            .map(|(number, label)| {
                (
                    QuestionNumber(*number),
                    AnswerChoice::parse_label(label).expect("fixture labels are valid"),
                )
            })
            .collect()
    }

    /// A stored result with the given per-question records and
    /// aggregates derived from them.
    pub fn result_with_answers(
        template: &ExamTemplate,
        user_id: &str,
        exam_date: NaiveDate,
        entries: &[(u32, &str, bool)],
    ) -> ExamResult {
        let answers: BTreeMap<QuestionNumber, AnswerRecord> = entries
            .iter()
            .map(|(number, label, is_correct)| {
                (
                    QuestionNumber(*number),
                    AnswerRecord {
                        answer: AnswerChoice::parse_label(label).expect("fixture labels are valid"),
                        is_correct: *is_correct,
                    },
                )
            })
            .collect();

        let correct_count = answers.values().filter(|r| r.is_correct).count() as u32;
        let empty_count = answers.values().filter(|r| r.answer.is_empty()).count() as u32;
        let wrong_count = answers.len() as u32 - correct_count - empty_count;

        ExamResult {
            id: format!("result-{}-{}", user_id, exam_date),
            institution_id: "inst-1".to_string(),
            template_id: template.id.clone(),
            student_id: format!("student-{}", user_id),
            user_id: user_id.to_string(),
            exam_date,
            answers,
            correct_count,
            wrong_count,
            empty_count,
            net_score: correct_count as f64 - wrong_count as f64 / 4.0,
            score: None,
            assignment_id: None,
            created_by: Some("admin-1".to_string()),
            created_at: Some(chrono::Utc::now()),
        }
    }
}
