pub mod analytics_handler;
pub mod assignment_handler;
pub mod health_handler;
pub mod question_handler;
pub mod result_handler;
pub mod template_handler;

pub use analytics_handler::{
    get_performance_trends, get_student_analytics, get_subject_performance, get_summary,
};
pub use assignment_handler::{assign_to_students, list_student_assignments, submit_answers};
pub use health_handler::health_check;
pub use question_handler::get_weighted_questions;
pub use result_handler::{create_bulk_results, delete_result, get_exam_report, list_results};
pub use template_handler::{
    create_template, delete_template, get_template, list_templates, update_answer_key,
};
