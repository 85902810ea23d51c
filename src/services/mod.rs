pub mod analytics_service;
pub mod assignment_service;
pub mod question_sampler_service;
pub mod result_service;
pub mod scoring_service;
pub mod subject_weights;
pub mod template_service;

pub use analytics_service::AnalyticsService;
pub use assignment_service::AssignmentService;
pub use question_sampler_service::QuestionSamplerService;
pub use result_service::ResultService;
pub use scoring_service::{ScoredAnswers, ScoringService};
pub use template_service::TemplateService;
