use std::sync::Arc;

use crate::{
    config::Config,
    db::Database,
    errors::AppResult,
    repositories::{
        MongoAssignmentRepository, MongoQuestionBankRepository, MongoResultRepository,
        MongoStudentRepository, MongoTemplateRepository,
    },
    services::{
        AnalyticsService, AssignmentService, QuestionSamplerService, ResultService,
        TemplateService,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub template_service: Arc<TemplateService>,
    pub result_service: Arc<ResultService>,
    pub assignment_service: Arc<AssignmentService>,
    pub analytics_service: Arc<AnalyticsService>,
    pub sampler_service: Arc<QuestionSamplerService>,
    pub config: Arc<Config>,
}

impl AppState {
    pub async fn new(config: Config) -> AppResult<Self> {
        let db = Database::connect(&config).await?;

        let template_repository = Arc::new(MongoTemplateRepository::new(&db));
        template_repository.ensure_indexes().await?;

        let result_repository = Arc::new(MongoResultRepository::new(&db));
        result_repository.ensure_indexes().await?;

        let assignment_repository = Arc::new(MongoAssignmentRepository::new(&db));
        assignment_repository.ensure_indexes().await?;

        let student_repository = Arc::new(MongoStudentRepository::new(&db));
        student_repository.ensure_indexes().await?;

        let question_repository = Arc::new(MongoQuestionBankRepository::new(&db));
        question_repository.ensure_indexes().await?;

        let template_service = Arc::new(TemplateService::new(template_repository.clone()));
        let result_service = Arc::new(ResultService::new(
            template_repository.clone(),
            result_repository.clone(),
            student_repository.clone(),
        ));
        let assignment_service = Arc::new(AssignmentService::new(
            assignment_repository,
            result_repository.clone(),
            template_repository.clone(),
            student_repository.clone(),
        ));
        let analytics_service = Arc::new(AnalyticsService::new(
            result_repository,
            template_repository,
            student_repository,
        ));
        let sampler_service = Arc::new(QuestionSamplerService::new(question_repository));

        Ok(Self {
            db,
            template_service,
            result_service,
            assignment_service,
            analytics_service,
            sampler_service,
            config: Arc::new(config),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_state_is_cloneable() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }
}
