pub mod assessments;
pub mod comments;
pub mod history;
pub mod lifecycle;
pub mod notifications;
pub mod permissions;
pub mod plagiarism;
pub mod screenshots;
pub mod submissions;

pub use submissions::SubmissionService;
