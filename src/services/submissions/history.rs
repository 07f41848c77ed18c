use chrono::Utc;

use super::SubmissionService;
use crate::errors::Result;
use crate::models::submissions::entities::Submission;
use crate::models::users::entities::{Actor, Capability};
use crate::services::history::{self as versions, VersionLog};
use crate::services::permissions;

/// 按提交时间升序的历史快照
pub async fn submission_history(
    service: &SubmissionService,
    actor: &Actor,
    submission_id: i64,
) -> Result<Vec<Submission>> {
    let submission = service.load_submission(submission_id).await?;
    let assignment = service
        .collaborators
        .assignments
        .get_assignment(submission.assignment_id)
        .await?;
    permissions::ensure_right(
        actor,
        &submission,
        assignment.as_ref(),
        Capability::Read,
        Utc::now(),
    )?;

    let log = VersionLog::from_versions(service.store.list_versions(submission.id).await?);
    Ok(versions::submission_history(&log))
}
