use chrono::Utc;
use tracing::debug;

use super::SubmissionService;
use crate::errors::Result;
use crate::models::comments::entities::SubmissionComment;
use crate::models::comments::requests::AddCommentRequest;
use crate::models::users::entities::{Actor, Capability};
use crate::services::{comments, permissions};

pub async fn add_comment(
    service: &SubmissionService,
    actor: &Actor,
    submission_id: i64,
    mut req: AddCommentRequest,
) -> Result<Option<SubmissionComment>> {
    let mut submission = service.load_submission(submission_id).await?;
    let assignment = service
        .collaborators
        .assignments
        .get_assignment(submission.assignment_id)
        .await?;
    let now = Utc::now();
    permissions::ensure_right(
        actor,
        &submission,
        assignment.as_ref(),
        Capability::Comment,
        now,
    )?;

    if req.author_id.is_none() {
        req.author_id = Some(actor.user_id);
    }
    let comment_id = service.store.next_id().await?;
    let Some(comment) = comments::build_comment(&submission, &req, comment_id, now) else {
        debug!("Empty comment on submission {} ignored", submission.id);
        return Ok(None);
    };

    comments::attach_comment(&mut submission, comment.clone());
    service.save_without_broadcast(submission).await?;
    Ok(Some(comment))
}

pub async fn visible_comments(
    service: &SubmissionService,
    actor: Option<&Actor>,
    submission_id: i64,
) -> Result<Vec<SubmissionComment>> {
    let submission = service.load_submission(submission_id).await?;
    let assignment = service
        .collaborators
        .assignments
        .get_assignment(submission.assignment_id)
        .await?;
    Ok(
        comments::visible_comments(&submission, actor, assignment.as_ref(), Utc::now())
            .into_iter()
            .cloned()
            .collect(),
    )
}
