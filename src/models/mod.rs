//! 数据模型定义

pub mod assessments;
pub mod assignments;
pub mod comments;
pub mod notifications;
pub mod plagiarism;
pub mod submissions;
pub mod users;

pub use assignments::entities::Assignment;
pub use submissions::entities::{Submission, SubmissionType, WorkflowState};
