use chrono::Utc;
use tracing::info;

use super::{SaveOutcome, SubmissionService};
use crate::errors::Result;
use crate::models::submissions::entities::{Submission, WorkflowState};
use crate::models::submissions::requests::SubmitRequest;

pub async fn submit(service: &SubmissionService, req: SubmitRequest) -> Result<SaveOutcome> {
    let assignment = service.load_assignment(req.assignment_id).await?;

    let mut submission = match service
        .store
        .find_submission(assignment.id, req.user_id)
        .await?
    {
        Some(existing) => existing,
        None => Submission::new(assignment.id, req.user_id),
    };

    // 重新提交时内容整体替换，类型缺省时按新内容重新推断
    submission.group_id = req.group_id.or(submission.group_id);
    submission.submission_type = req.submission_type;
    submission.url = req.url;
    submission.body = req.body;
    submission.attachment_ids = req.attachment_ids;
    submission.quiz_submission_id = req.quiz_submission_id;
    submission.media_comment_id = req.media_comment_id;
    submission.media_comment_type = req.media_comment_type;
    submission.submitted_at = Some(Utc::now());
    submission.workflow_state = WorkflowState::Submitted;
    submission.grade_matches_current_submission = false;
    // 新内容需要重新截图
    submission.screenshot_attachment_id = None;
    submission.processed = false;
    submission.process_attempts = 0;

    let outcome = service.save(submission).await?;
    info!(
        "User {} submitted assignment {} (submission {}, attempt {})",
        outcome.submission.user_id,
        outcome.submission.assignment_id,
        outcome.submission.id,
        outcome.submission.attempt
    );
    Ok(outcome)
}
