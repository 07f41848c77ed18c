use super::SubmissionService;
use crate::errors::Result;

/// 作业中需要批改的提交数
pub async fn needs_grading_count(service: &SubmissionService, assignment_id: i64) -> Result<usize> {
    let submissions = service.store.list_assignment_submissions(assignment_id).await?;
    Ok(submissions.iter().filter(|s| s.needs_grading()).count())
}
