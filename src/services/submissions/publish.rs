use futures_util::future::try_join_all;
use tracing::{info, warn};

use super::{SaveOutcome, SubmissionService, save};
use crate::errors::Result;
use crate::services::notifications::BroadcastFlags;

pub async fn broadcast_group_submission(
    service: &SubmissionService,
    submission_id: i64,
) -> Result<SaveOutcome> {
    let submission = service.load_submission(submission_id).await?;
    let flags = BroadcastFlags {
        group_broadcast: true,
        ..Default::default()
    };
    save::save(service, submission, flags).await
}

/// 作业发布成绩：重新保存已评分的提交，触发成绩变更通知
pub async fn assignment_just_published(
    service: &SubmissionService,
    assignment_id: i64,
) -> Result<Vec<SaveOutcome>> {
    let assignment = service.load_assignment(assignment_id).await?;
    if !assignment.published {
        warn!("Assignment {} is not published, nothing to broadcast", assignment.id);
        return Ok(Vec::new());
    }

    let flags = BroadcastFlags {
        assignment_just_published: true,
        ..Default::default()
    };
    let submissions = service.store.list_assignment_submissions(assignment.id).await?;
    // 各提交互不相关，可以并发保存
    let saves = submissions
        .into_iter()
        .filter(|submission| submission.graded_at.is_some())
        .map(|mut submission| {
            submission.changed_since_publish = false;
            save::save(service, submission, flags)
        });
    let outcomes = try_join_all(saves).await?;
    info!(
        "Published grades for {} submission(s) of assignment {}",
        outcomes.len(),
        assignment.id
    );
    Ok(outcomes)
}
