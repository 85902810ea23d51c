pub mod exam_assignment;
pub mod exam_result;
pub mod exam_template;
pub mod question;
pub mod student;

pub use exam_assignment::{AssignmentStatus, ExamAssignment};
pub use exam_result::{AnswerChoice, AnswerRecord, ExamResult, QuestionNumber};
pub use exam_template::{ExamTemplate, QuestionMapping};
pub use question::{QuestionRecord, QuestionRequest};
pub use student::{Student, StudentStatus};
