use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use tokio::sync::RwLock;

use sinav_server::{
    errors::{AppError, AppResult},
    models::domain::{
        exam_assignment::AssignmentStatus,
        exam_result::{AnswerChoice, QuestionNumber},
        question::QuestionDifficulty,
        student::StudentStatus,
        ExamAssignment, ExamResult, ExamTemplate, QuestionMapping, QuestionRecord,
        QuestionRequest, Student,
    },
    models::dto::request::{
        AssignExamRequest, BulkResultEntry, BulkResultsRequest, SubmitAnswersRequest,
    },
    models::dto::response::Trend,
    repositories::{
        AssignmentRepository, QuestionBankRepository, ResultFilter, ResultRepository,
        StudentRepository, TemplateRepository,
    },
    services::{
        subject_weights::TopicWeightTable, AnalyticsService, AssignmentService,
        QuestionSamplerService, ResultService, ScoringService,
    },
};

struct InMemoryTemplateRepository {
    templates: Arc<RwLock<HashMap<String, ExamTemplate>>>,
}

impl InMemoryTemplateRepository {
    fn new() -> Self {
        Self {
            templates: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl TemplateRepository for InMemoryTemplateRepository {
    async fn create(&self, template: ExamTemplate) -> AppResult<ExamTemplate> {
        let mut templates = self.templates.write().await;
        if templates.contains_key(&template.id) {
            return Err(AppError::AlreadyExists(format!(
                "Template with id '{}' already exists",
                template.id
            )));
        }
        templates.insert(template.id.clone(), template.clone());
        Ok(template)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<ExamTemplate>> {
        let templates = self.templates.read().await;
        Ok(templates.get(id).cloned())
    }

    async fn list(
        &self,
        institution_id: Option<&str>,
        exam_type: Option<&str>,
    ) -> AppResult<Vec<ExamTemplate>> {
        let templates = self.templates.read().await;
        let mut items: Vec<_> = templates
            .values()
            .filter(|t| match institution_id {
                Some(institution_id) => {
                    t.is_public || t.institution_id.as_deref() == Some(institution_id)
                }
                None => true,
            })
            .filter(|t| match exam_type {
                Some(exam_type) => t.exam_type == exam_type,
                None => true,
            })
            .cloned()
            .collect();
        items.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(items)
    }

    async fn update_answer_key(
        &self,
        id: &str,
        answer_key: &BTreeMap<QuestionNumber, AnswerChoice>,
    ) -> AppResult<ExamTemplate> {
        let mut templates = self.templates.write().await;
        let template = templates
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("Template with id '{}' not found", id)))?;
        template.answer_key = answer_key.clone();
        template.updated_at = Some(Utc::now());
        Ok(template.clone())
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        let mut templates = self.templates.write().await;
        if templates.remove(id).is_none() {
            return Err(AppError::NotFound(format!(
                "Template with id '{}' not found",
                id
            )));
        }
        Ok(())
    }
}

struct InMemoryResultRepository {
    results: Arc<RwLock<HashMap<String, ExamResult>>>,
}

impl InMemoryResultRepository {
    fn new() -> Self {
        Self {
            results: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl ResultRepository for InMemoryResultRepository {
    async fn insert_many(&self, results: Vec<ExamResult>) -> AppResult<usize> {
        let mut stored = self.results.write().await;
        let count = results.len();
        for result in results {
            stored.insert(result.id.clone(), result);
        }
        Ok(count)
    }

    async fn create_submission(&self, result: ExamResult) -> AppResult<ExamResult> {
        let mut stored = self.results.write().await;

        // Mirrors the unique sparse index on assignment_id.
        if let Some(assignment_id) = &result.assignment_id {
            let duplicate = stored
                .values()
                .any(|r| r.assignment_id.as_deref() == Some(assignment_id));
            if duplicate {
                return Err(AppError::AlreadySubmitted(format!(
                    "a result already exists for assignment '{}'",
                    assignment_id
                )));
            }
        }

        stored.insert(result.id.clone(), result.clone());
        Ok(result)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<ExamResult>> {
        let results = self.results.read().await;
        Ok(results.get(id).cloned())
    }

    async fn list(&self, filter: &ResultFilter) -> AppResult<Vec<ExamResult>> {
        let results = self.results.read().await;
        let mut items: Vec<_> = results
            .values()
            .filter(|r| r.institution_id == filter.institution_id)
            .filter(|r| match &filter.user_id {
                Some(user_id) => &r.user_id == user_id,
                None => true,
            })
            .filter(|r| match &filter.template_id {
                Some(template_id) => &r.template_id == template_id,
                None => true,
            })
            .filter(|r| match &filter.exam_date {
                Some(exam_date) => &r.exam_date == exam_date,
                None => true,
            })
            .filter(|r| match &filter.date_start {
                Some(start) => &r.exam_date >= start,
                None => true,
            })
            .filter(|r| match &filter.date_end {
                Some(end) => &r.exam_date <= end,
                None => true,
            })
            .cloned()
            .collect();
        items.sort_by(|a, b| b.exam_date.cmp(&a.exam_date).then_with(|| a.id.cmp(&b.id)));
        Ok(items)
    }

    async fn exists_for_assignment(&self, assignment_id: &str) -> AppResult<bool> {
        let results = self.results.read().await;
        Ok(results
            .values()
            .any(|r| r.assignment_id.as_deref() == Some(assignment_id)))
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        let mut results = self.results.write().await;
        if results.remove(id).is_none() {
            return Err(AppError::NotFound(format!(
                "Result with id '{}' not found",
                id
            )));
        }
        Ok(())
    }
}

struct InMemoryAssignmentRepository {
    assignments: Arc<RwLock<HashMap<String, ExamAssignment>>>,
}

impl InMemoryAssignmentRepository {
    fn new() -> Self {
        Self {
            assignments: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl AssignmentRepository for InMemoryAssignmentRepository {
    async fn insert_many(&self, assignments: Vec<ExamAssignment>) -> AppResult<usize> {
        let mut stored = self.assignments.write().await;
        let count = assignments.len();
        for assignment in assignments {
            stored.insert(assignment.id.clone(), assignment);
        }
        Ok(count)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<ExamAssignment>> {
        let assignments = self.assignments.read().await;
        Ok(assignments.get(id).cloned())
    }

    async fn list_by_user(&self, user_id: &str) -> AppResult<Vec<ExamAssignment>> {
        let assignments = self.assignments.read().await;
        let mut items: Vec<_> = assignments
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| b.exam_date.cmp(&a.exam_date).then_with(|| a.id.cmp(&b.id)));
        Ok(items)
    }

    async fn complete_if_pending(&self, id: &str) -> AppResult<bool> {
        let mut assignments = self.assignments.write().await;
        match assignments.get_mut(id) {
            Some(assignment) if assignment.status == AssignmentStatus::Pending => {
                assignment.status = AssignmentStatus::Completed;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

struct InMemoryStudentRepository {
    students: Vec<Student>,
}

impl InMemoryStudentRepository {
    fn with_students(students: Vec<Student>) -> Self {
        Self { students }
    }
}

#[async_trait]
impl StudentRepository for InMemoryStudentRepository {
    async fn find_by_user_id(
        &self,
        institution_id: &str,
        user_id: &str,
    ) -> AppResult<Option<Student>> {
        Ok(self
            .students
            .iter()
            .find(|s| s.institution_id == institution_id && s.user_id == user_id)
            .cloned())
    }

    async fn list_approved(&self, institution_id: &str) -> AppResult<Vec<Student>> {
        Ok(self
            .students
            .iter()
            .filter(|s| s.institution_id == institution_id && s.status == StudentStatus::Approved)
            .cloned()
            .collect())
    }

    async fn count_approved(&self, institution_id: &str) -> AppResult<u64> {
        Ok(self.list_approved(institution_id).await?.len() as u64)
    }
}

struct InMemoryQuestionBankRepository {
    questions: Vec<QuestionRecord>,
}

impl InMemoryQuestionBankRepository {
    fn with_questions(questions: Vec<QuestionRecord>) -> Self {
        Self { questions }
    }
}

#[async_trait]
impl QuestionBankRepository for InMemoryQuestionBankRepository {
    async fn fetch(&self, request: &QuestionRequest) -> AppResult<Vec<QuestionRecord>> {
        Ok(self
            .questions
            .iter()
            .filter(|q| q.subject == request.subject)
            .filter(|q| match &request.topic {
                Some(topic) => &q.topic == topic,
                None => true,
            })
            .take(request.count as usize)
            .cloned()
            .collect())
    }
}

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
}

fn make_template(id: &str, total_questions: u32, with_key: bool) -> ExamTemplate {
    let mapping = (1..=total_questions)
        .map(|number| QuestionMapping {
            question_number: QuestionNumber(number),
            subject: "Matematik".to_string(),
            topic: if number % 2 == 0 { "Cebir" } else { "Sayılar" }.to_string(),
        })
        .collect();

    let answer_key = if with_key {
        (1..=total_questions)
            .map(|number| (QuestionNumber(number), AnswerChoice::A))
            .collect()
    } else {
        BTreeMap::new()
    };

    let mut template = ExamTemplate::new(
        "TYT Deneme",
        Some("Genel".to_string()),
        "TYT",
        Some(1),
        total_questions,
        mapping,
        answer_key,
        false,
        Some("inst-1".to_string()),
        Some("admin-1".to_string()),
    );
    template.id = id.to_string();
    template
}

fn make_student(user_id: &str, full_name: &str) -> Student {
    Student {
        id: format!("student-{}", user_id),
        user_id: user_id.to_string(),
        institution_id: "inst-1".to_string(),
        full_name: full_name.to_string(),
        status: StudentStatus::Approved,
        created_at: Some(Utc::now()),
    }
}

fn make_question(id: &str, subject: &str, topic: &str) -> QuestionRecord {
    QuestionRecord {
        id: id.to_string(),
        subject: subject.to_string(),
        topic: topic.to_string(),
        difficulty: QuestionDifficulty::Medium,
        content: serde_json::json!({"stem": id}),
        created_at: Some(Utc::now()),
    }
}

fn raw_answers(entries: &[(u32, &str)]) -> BTreeMap<QuestionNumber, String> {
    entries
        .iter()
        .map(|(number, label)| (QuestionNumber(*number), label.to_string()))
        .collect()
}

fn typed_answers(entries: &[(u32, &str)]) -> BTreeMap<QuestionNumber, AnswerChoice> {
    entries
        .iter()
        .map(|(number, label)| {
            (
                QuestionNumber(*number),
                AnswerChoice::parse_label(label).expect("valid fixture label"),
            )
        })
        .collect()
}

fn make_net_result(id: &str, user_id: &str, template_id: &str, day: u32, net: f64) -> ExamResult {
    ExamResult {
        id: id.to_string(),
        institution_id: "inst-1".to_string(),
        template_id: template_id.to_string(),
        student_id: format!("student-{}", user_id),
        user_id: user_id.to_string(),
        exam_date: date(day),
        answers: BTreeMap::new(),
        correct_count: net.max(0.0) as u32,
        wrong_count: 0,
        empty_count: 0,
        net_score: net,
        score: None,
        assignment_id: None,
        created_by: Some("admin-1".to_string()),
        created_at: Some(Utc::now()),
    }
}

#[tokio::test]
async fn template_repository_crud_and_filters() {
    let repo = InMemoryTemplateRepository::new();

    let mut public_template = make_template("template-1", 4, true);
    public_template.is_public = true;
    public_template.institution_id = None;
    repo.create(public_template).await.expect("create public");

    repo.create(make_template("template-2", 4, true))
        .await
        .expect("create private");

    let mut other_institution = make_template("template-3", 4, true);
    other_institution.institution_id = Some("inst-2".to_string());
    repo.create(other_institution).await.expect("create other");

    let duplicate = repo.create(make_template("template-1", 4, true)).await;
    assert!(matches!(duplicate, Err(AppError::AlreadyExists(_))));

    // Public plus the institution's own, not another institution's.
    let visible = repo.list(Some("inst-1"), None).await.expect("list");
    let ids: Vec<_> = visible.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["template-1", "template-2"]);

    let by_type = repo.list(Some("inst-1"), Some("LGS")).await.expect("list");
    assert!(by_type.is_empty());

    let mut new_key = BTreeMap::new();
    new_key.insert(QuestionNumber(1), AnswerChoice::E);
    let updated = repo
        .update_answer_key("template-2", &new_key)
        .await
        .expect("key update");
    assert_eq!(updated.answer_key.len(), 1);
    assert_eq!(updated.answer_key[&QuestionNumber(1)], AnswerChoice::E);

    let missing = repo.update_answer_key("template-9", &new_key).await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));

    repo.delete("template-1").await.expect("delete");
    let missing_delete = repo.delete("template-1").await;
    assert!(matches!(missing_delete, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn bulk_ingestion_isolates_row_failures() {
    let templates = Arc::new(InMemoryTemplateRepository::new());
    let results = Arc::new(InMemoryResultRepository::new());
    let students = Arc::new(InMemoryStudentRepository::with_students(vec![
        make_student("user-1", "Ayşe Yılmaz"),
        make_student("user-3", "Ali Demir"),
    ]));

    templates
        .create(make_template("template-1", 4, true))
        .await
        .expect("create template");

    let service = ResultService::new(templates.clone(), results.clone(), students);

    let request = BulkResultsRequest {
        institution_id: "inst-1".to_string(),
        template_id: "template-1".to_string(),
        exam_date: date(14),
        results: vec![
            BulkResultEntry {
                student_user_id: "user-1".to_string(),
                student_name: "Ayşe Yılmaz".to_string(),
                answers: raw_answers(&[(1, "A"), (2, "X"), (3, "B"), (4, "A")]),
            },
            BulkResultEntry {
                student_user_id: "user-2".to_string(),
                student_name: "Mehmet Kaya".to_string(),
                answers: raw_answers(&[(1, "A"), (2, "A"), (3, "A"), (4, "A")]),
            },
            BulkResultEntry {
                student_user_id: "user-3".to_string(),
                student_name: "Ali Demir".to_string(),
                answers: raw_answers(&[(1, "B"), (2, "B"), (3, "B"), (4, "B")]),
            },
        ],
        created_by: "admin-1".to_string(),
    };

    let outcome = service.create_bulk_results(request).await.expect("bulk");

    assert_eq!(outcome.success_count, 2);
    assert_eq!(outcome.failed_count, 1);
    assert_eq!(outcome.errors.len(), 1);
    assert!(outcome.errors[0].contains("Mehmet Kaya"));

    let stored = results
        .list(&ResultFilter {
            institution_id: "inst-1".to_string(),
            ..Default::default()
        })
        .await
        .expect("list");
    assert_eq!(stored.len(), 2);

    // Key is all A: first row scores 2 correct, 1 wrong, 1 empty.
    let first = stored
        .iter()
        .find(|r| r.user_id == "user-1")
        .expect("user-1 stored");
    assert_eq!(first.correct_count, 2);
    assert_eq!(first.wrong_count, 1);
    assert_eq!(first.empty_count, 1);
    assert_eq!(first.net_score, 1.75);

    let second = stored
        .iter()
        .find(|r| r.user_id == "user-3")
        .expect("user-3 stored");
    assert_eq!(second.net_score, -1.0);
}

#[tokio::test]
async fn bulk_ingestion_fails_whole_batch_without_template_or_key() {
    let templates = Arc::new(InMemoryTemplateRepository::new());
    let results = Arc::new(InMemoryResultRepository::new());
    let students = Arc::new(InMemoryStudentRepository::with_students(vec![make_student(
        "user-1",
        "Ayşe Yılmaz",
    )]));

    templates
        .create(make_template("template-pending", 4, false))
        .await
        .expect("create template");

    let service = ResultService::new(templates, results.clone(), students);

    let entry = BulkResultEntry {
        student_user_id: "user-1".to_string(),
        student_name: "Ayşe Yılmaz".to_string(),
        answers: raw_answers(&[(1, "A")]),
    };

    let missing_template = service
        .create_bulk_results(BulkResultsRequest {
            institution_id: "inst-1".to_string(),
            template_id: "template-9".to_string(),
            exam_date: date(14),
            results: vec![entry.clone()],
            created_by: "admin-1".to_string(),
        })
        .await;
    assert!(matches!(missing_template, Err(AppError::NotFound(_))));

    let missing_key = service
        .create_bulk_results(BulkResultsRequest {
            institution_id: "inst-1".to_string(),
            template_id: "template-pending".to_string(),
            exam_date: date(14),
            results: vec![entry],
            created_by: "admin-1".to_string(),
        })
        .await;
    assert!(matches!(missing_key, Err(AppError::MissingAnswerKey(_))));

    let stored = results
        .list(&ResultFilter {
            institution_id: "inst-1".to_string(),
            ..Default::default()
        })
        .await
        .expect("list");
    assert!(stored.is_empty());
}

#[tokio::test]
async fn bulk_ingestion_reports_unparsable_rows() {
    let templates = Arc::new(InMemoryTemplateRepository::new());
    let results = Arc::new(InMemoryResultRepository::new());
    let students = Arc::new(InMemoryStudentRepository::with_students(vec![
        make_student("user-1", "Ayşe Yılmaz"),
        make_student("user-2", "Mehmet Kaya"),
    ]));

    templates
        .create(make_template("template-1", 2, true))
        .await
        .expect("create template");

    let service = ResultService::new(templates, results.clone(), students);

    let outcome = service
        .create_bulk_results(BulkResultsRequest {
            institution_id: "inst-1".to_string(),
            template_id: "template-1".to_string(),
            exam_date: date(14),
            results: vec![
                BulkResultEntry {
                    student_user_id: "user-1".to_string(),
                    student_name: "Ayşe Yılmaz".to_string(),
                    answers: raw_answers(&[(1, "A"), (2, "F")]),
                },
                BulkResultEntry {
                    student_user_id: "user-2".to_string(),
                    student_name: "Mehmet Kaya".to_string(),
                    answers: raw_answers(&[(1, "A"), (2, "B")]),
                },
            ],
            created_by: "admin-1".to_string(),
        })
        .await
        .expect("bulk");

    assert_eq!(outcome.success_count, 1);
    assert_eq!(outcome.failed_count, 1);
    assert!(outcome.errors[0].contains("Ayşe Yılmaz"));
}

#[tokio::test]
async fn assignment_workflow_submission_and_double_submit() {
    let templates = Arc::new(InMemoryTemplateRepository::new());
    let results = Arc::new(InMemoryResultRepository::new());
    let assignments = Arc::new(InMemoryAssignmentRepository::new());
    let students = Arc::new(InMemoryStudentRepository::with_students(vec![
        make_student("user-1", "Ayşe Yılmaz"),
        make_student("user-2", "Mehmet Kaya"),
    ]));

    templates
        .create(make_template("template-1", 4, true))
        .await
        .expect("create template");

    let service = AssignmentService::new(
        assignments.clone(),
        results.clone(),
        templates.clone(),
        students.clone(),
    );

    let outcome = service
        .assign_to_students(AssignExamRequest {
            institution_id: "inst-1".to_string(),
            template_id: "template-1".to_string(),
            student_user_ids: vec![
                "user-1".to_string(),
                "user-2".to_string(),
                "user-9".to_string(),
            ],
            exam_date: date(14),
            deadline: Some(Utc::now() + Duration::days(7)),
            assigned_by: "admin-1".to_string(),
        })
        .await
        .expect("assign");

    assert_eq!(outcome.success_count, 2);
    assert_eq!(outcome.failed_count, 1);
    assert!(outcome.errors[0].contains("user-9"));

    let views = service.list_for_student("user-1").await.expect("list");
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].status, AssignmentStatus::Pending);
    assert!(!views[0].has_submitted);

    let assignment_id = views[0].id.clone();

    // Wrong student gets a forbidden, unknown id a not-found.
    let forbidden = service
        .submit_answers(
            &assignment_id,
            SubmitAnswersRequest {
                user_id: "user-2".to_string(),
                answers: raw_answers(&[(1, "A")]),
            },
        )
        .await;
    assert!(matches!(forbidden, Err(AppError::Forbidden(_))));

    let missing = service
        .submit_answers(
            "assignment-9",
            SubmitAnswersRequest {
                user_id: "user-1".to_string(),
                answers: raw_answers(&[(1, "A")]),
            },
        )
        .await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));

    let result = service
        .submit_answers(
            &assignment_id,
            SubmitAnswersRequest {
                user_id: "user-1".to_string(),
                answers: raw_answers(&[(1, "A"), (2, "X"), (3, "B"), (4, "A")]),
            },
        )
        .await
        .expect("submit");

    assert_eq!(result.correct_count, 2);
    assert_eq!(result.wrong_count, 1);
    assert_eq!(result.empty_count, 1);
    assert_eq!(result.net_score, 1.75);
    assert_eq!(result.assignment_id.as_deref(), Some(assignment_id.as_str()));

    let views = service.list_for_student("user-1").await.expect("list");
    assert_eq!(views[0].status, AssignmentStatus::Completed);
    assert!(views[0].has_submitted);

    let second = service
        .submit_answers(
            &assignment_id,
            SubmitAnswersRequest {
                user_id: "user-1".to_string(),
                answers: raw_answers(&[(1, "A")]),
            },
        )
        .await;
    assert!(matches!(second, Err(AppError::AlreadySubmitted(_))));

    let stored = results
        .list(&ResultFilter {
            institution_id: "inst-1".to_string(),
            user_id: Some("user-1".to_string()),
            ..Default::default()
        })
        .await
        .expect("list");
    assert_eq!(stored.len(), 1);
}

#[tokio::test]
async fn submission_rejects_pending_key_and_expired_deadline() {
    let templates = Arc::new(InMemoryTemplateRepository::new());
    let results = Arc::new(InMemoryResultRepository::new());
    let assignments = Arc::new(InMemoryAssignmentRepository::new());
    let students = Arc::new(InMemoryStudentRepository::with_students(vec![make_student(
        "user-1",
        "Ayşe Yılmaz",
    )]));

    templates
        .create(make_template("template-pending", 4, false))
        .await
        .expect("create template");

    let service = AssignmentService::new(
        assignments.clone(),
        results,
        templates.clone(),
        students,
    );

    let pending_key = ExamAssignment::new(
        "inst-1",
        "template-pending",
        "student-user-1",
        "user-1",
        date(14),
        None,
        "admin-1",
    );
    let pending_key_id = pending_key.id.clone();

    let mut expired = ExamAssignment::new(
        "inst-1",
        "template-pending",
        "student-user-1",
        "user-1",
        date(14),
        Some(Utc::now() - Duration::days(1)),
        "admin-1",
    );
    expired.id = "assignment-expired".to_string();

    assignments
        .insert_many(vec![pending_key, expired])
        .await
        .expect("seed assignments");

    let missing_key = service
        .submit_answers(
            &pending_key_id,
            SubmitAnswersRequest {
                user_id: "user-1".to_string(),
                answers: raw_answers(&[(1, "A")]),
            },
        )
        .await;
    assert!(matches!(missing_key, Err(AppError::MissingAnswerKey(_))));

    let past_deadline = service
        .submit_answers(
            "assignment-expired",
            SubmitAnswersRequest {
                user_id: "user-1".to_string(),
                answers: raw_answers(&[(1, "A")]),
            },
        )
        .await;
    assert!(matches!(past_deadline, Err(AppError::ValidationError(_))));
}

#[tokio::test]
async fn duplicate_submission_heals_unflipped_status() {
    let templates = Arc::new(InMemoryTemplateRepository::new());
    let results = Arc::new(InMemoryResultRepository::new());
    let assignments = Arc::new(InMemoryAssignmentRepository::new());
    let students = Arc::new(InMemoryStudentRepository::with_students(vec![make_student(
        "user-1",
        "Ayşe Yılmaz",
    )]));

    let template = make_template("template-1", 2, true);
    templates.create(template.clone()).await.expect("create");

    let assignment = ExamAssignment::new(
        "inst-1",
        "template-1",
        "student-user-1",
        "user-1",
        date(14),
        None,
        "admin-1",
    );
    let assignment_id = assignment.id.clone();
    assignments
        .insert_many(vec![assignment])
        .await
        .expect("seed");

    // Simulate a crash after the result insert but before the status
    // flip: the result exists while the assignment is still pending.
    let scored =
        ScoringService::score_answers(&template, &typed_answers(&[(1, "A"), (2, "A")]))
            .expect("score");
    let orphan = ScoringService::build_result(
        scored,
        "inst-1",
        "template-1",
        "student-user-1",
        "user-1",
        date(14),
        Some(assignment_id.clone()),
        Some("user-1".to_string()),
    );
    results.create_submission(orphan).await.expect("seed result");

    let service = AssignmentService::new(
        assignments.clone(),
        results.clone(),
        templates,
        students,
    );

    let retry = service
        .submit_answers(
            &assignment_id,
            SubmitAnswersRequest {
                user_id: "user-1".to_string(),
                answers: raw_answers(&[(1, "A"), (2, "A")]),
            },
        )
        .await;
    assert!(matches!(retry, Err(AppError::AlreadySubmitted(_))));

    // The retry healed the stored status.
    let healed = assignments
        .find_by_id(&assignment_id)
        .await
        .expect("find")
        .expect("assignment exists");
    assert_eq!(healed.status, AssignmentStatus::Completed);
}

#[tokio::test]
async fn exam_report_compares_class_and_classifies_trend() {
    let templates = Arc::new(InMemoryTemplateRepository::new());
    let results = Arc::new(InMemoryResultRepository::new());
    let students = Arc::new(InMemoryStudentRepository::with_students(vec![make_student(
        "user-1",
        "Ayşe Yılmaz",
    )]));

    let template = make_template("template-7", 4, true);
    templates.create(template.clone()).await.expect("create");

    // Class of five on the same template and date; user-3 leads.
    let class_nets = [
        ("user-1", 10.0),
        ("user-2", 8.0),
        ("user-3", 12.0),
        ("user-4", 6.0),
        ("user-5", 9.0),
    ];
    for (user, net) in class_nets {
        let mut result = make_net_result(
            &format!("result-{}-class", user),
            user,
            "template-7",
            20,
            net,
        );
        if user == "user-3" {
            // The subject's answers feed the topic breakdown.
            let scored = ScoringService::score_answers(
                &template,
                &typed_answers(&[(1, "A"), (2, "B"), (3, "A"), (4, "C")]),
            )
            .expect("score");
            result.answers = scored.answers;
            result.correct_count = scored.correct_count;
            result.wrong_count = scored.wrong_count;
            result.empty_count = scored.empty_count;
        }
        results.insert_many(vec![result]).await.expect("seed");
    }

    // Six earlier sittings for user-3: recent mean 10 above previous.
    let history = [
        (11, 4.0),
        (12, 5.0),
        (13, 6.0),
        (14, 14.0),
        (15, 15.0),
        (16, 16.0),
    ];
    for (day, net) in history {
        results
            .insert_many(vec![make_net_result(
                &format!("result-user-3-{}", day),
                "user-3",
                "template-7",
                day,
                net,
            )])
            .await
            .expect("seed history");
    }

    let analytics = AnalyticsService::new(results.clone(), templates.clone(), students);
    let report = analytics
        .exam_report("result-user-3-class")
        .await
        .expect("report");

    assert_eq!(report.class_comparison.class_average, 9.0);
    assert_eq!(report.class_comparison.rank, 1);
    assert_eq!(report.class_comparison.class_size, 5);

    // Key is all A: questions 2 and 4 were wrong, Cebir is weak.
    assert_eq!(report.correct_count, 2);
    assert!(!report.topic_performances.is_empty());
    assert!(report
        .weak_topics
        .iter()
        .any(|t| t.topic == "Cebir" && t.success_rate < 60.0));

    // 7 sittings, the most recent three well above the three before.
    assert_eq!(report.previous_net_scores.len(), 7);
    assert_eq!(report.trend, Trend::Improving);
}

#[tokio::test]
async fn institution_summary_counts_students_and_completion() {
    let templates = Arc::new(InMemoryTemplateRepository::new());
    let results = Arc::new(InMemoryResultRepository::new());
    let students = Arc::new(InMemoryStudentRepository::with_students(vec![
        make_student("user-1", "Ayşe Yılmaz"),
        make_student("user-2", "Mehmet Kaya"),
        make_student("user-3", "Ali Demir"),
    ]));

    results
        .insert_many(vec![
            make_net_result("result-1", "user-1", "template-1", 10, 8.0),
            make_net_result("result-2", "user-1", "template-1", 12, 10.0),
            make_net_result("result-3", "user-2", "template-1", 12, 6.0),
        ])
        .await
        .expect("seed");

    let analytics = AnalyticsService::new(results, templates, students);
    let summary = analytics
        .institution_summary("inst-1", None, None)
        .await
        .expect("summary");

    assert_eq!(summary.total_students, 3);
    assert_eq!(summary.total_exams_completed, 3);
    assert_eq!(summary.average_net, 8.0);
    // Two of three approved students have at least one exam.
    assert_eq!(summary.completion_rate, 66.67);
    // Seeded results carry a fresh created_at.
    assert_eq!(summary.active_students_this_week, 2);
}

#[tokio::test]
async fn student_analytics_ranks_by_average_net() {
    let templates = Arc::new(InMemoryTemplateRepository::new());
    let results = Arc::new(InMemoryResultRepository::new());
    let students = Arc::new(InMemoryStudentRepository::with_students(vec![
        make_student("user-1", "Ayşe Yılmaz"),
        make_student("user-2", "Mehmet Kaya"),
    ]));

    results
        .insert_many(vec![
            make_net_result("result-1", "user-1", "template-1", 10, 4.0),
            make_net_result("result-2", "user-1", "template-1", 12, 6.0),
            make_net_result("result-3", "user-2", "template-1", 11, 12.0),
        ])
        .await
        .expect("seed");

    let analytics = AnalyticsService::new(results, templates, students);
    let ranking = analytics
        .student_analytics("inst-1", None, None, 50)
        .await
        .expect("analytics");

    assert_eq!(ranking.len(), 2);
    assert_eq!(ranking[0].user_id, "user-2");
    assert_eq!(ranking[0].average_net, 12.0);
    assert_eq!(ranking[0].total_exams, 1);
    assert_eq!(ranking[1].user_id, "user-1");
    assert_eq!(ranking[1].average_net, 5.0);
    assert_eq!(ranking[1].last_exam_date, Some(date(12)));
    assert_eq!(ranking[1].trend, Trend::Stable);
}

#[tokio::test]
async fn sampler_deduplicates_and_tops_up_short_topics() {
    // The heavily-weighted Sayılar topic has no questions at all, so
    // the unfiltered top-up fills the quota from the rest of the
    // subject without duplicating the Cebir batch.
    let bank = Arc::new(InMemoryQuestionBankRepository::with_questions(vec![
        make_question("q-a1", "Matematik", "Açılar"),
        make_question("q-a2", "Matematik", "Açılar"),
        make_question("q-a3", "Matematik", "Açılar"),
        make_question("q-c1", "Matematik", "Cebir"),
        make_question("q-c2", "Matematik", "Cebir"),
    ]));

    let weights = TopicWeightTable::from_entries(&[(
        "Matematik",
        &[("Sayılar", 60), ("Cebir", 40)],
    )]);

    let sampler = QuestionSamplerService::with_weights(bank, weights);
    let questions = sampler
        .fetch_weighted_subject_questions("Matematik", 5)
        .await
        .expect("fetch");

    assert_eq!(questions.len(), 5);

    let mut ids: Vec<_> = questions.iter().map(|q| q.id.as_str()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 5, "no duplicate questions");
}

#[tokio::test]
async fn sampler_returns_partial_set_when_bank_is_short() {
    let bank = Arc::new(InMemoryQuestionBankRepository::with_questions(vec![
        make_question("q-1", "Matematik", "Sayılar"),
        make_question("q-2", "Matematik", "Cebir"),
    ]));

    let sampler = QuestionSamplerService::new(bank);
    let questions = sampler
        .fetch_weighted_subject_questions("Matematik", 10)
        .await
        .expect("fetch");

    assert_eq!(questions.len(), 2);
}
