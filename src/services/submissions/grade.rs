use chrono::Utc;
use tracing::info;

use super::{SaveOutcome, SubmissionService};
use crate::errors::{LifecycleError, Result};
use crate::models::submissions::requests::{GradeRequest, UpdateSubmissionRequest};
use crate::models::users::entities::{Actor, Capability};
use crate::services::permissions;

pub async fn grade(
    service: &SubmissionService,
    actor: &Actor,
    req: GradeRequest,
) -> Result<SaveOutcome> {
    let mut submission = service.load_submission(req.submission_id).await?;
    let assignment = service.load_assignment(submission.assignment_id).await?;
    permissions::ensure_right(
        actor,
        &submission,
        Some(&assignment),
        Capability::Grade,
        Utc::now(),
    )?;

    if req.clear {
        submission.score = None;
        submission.grade = None;
    } else {
        let score = match (req.score, req.grade.as_deref()) {
            (Some(score), _) => score,
            (None, Some(grade)) => assignment.grade_to_score(grade).ok_or_else(|| {
                LifecycleError::validation(format!(
                    "Grade {grade:?} is not valid for assignment {}",
                    assignment.id
                ))
            })?,
            (None, None) => {
                return Err(LifecycleError::validation(
                    "Either score or grade must be provided",
                ));
            }
        };
        if !score.is_finite() {
            return Err(LifecycleError::validation("Score must be a finite number"));
        }
        // 与已保存（已钳制）的分数比较前先钳制
        let score = assignment.clamp_score(score);
        if submission.score != Some(score) {
            // 等级由分数重新推导
            submission.grade = None;
        }
        submission.score = Some(score);
        if !assignment.derives_grade()
            && let Some(grade) = req.grade
        {
            submission.grade = Some(grade.trim().to_string());
        }
    }
    submission.grader_id = Some(actor.user_id);
    submission.grade_matches_current_submission = true;

    let outcome = service.save(submission).await?;
    info!(
        "User {} graded submission {}: score={:?}, grade={:?}",
        actor.user_id, outcome.submission.id, outcome.submission.score, outcome.submission.grade
    );
    Ok(outcome)
}

pub async fn update(
    service: &SubmissionService,
    actor: &Actor,
    submission_id: i64,
    req: UpdateSubmissionRequest,
) -> Result<SaveOutcome> {
    let mut submission = service.load_submission(submission_id).await?;
    let assignment = service
        .collaborators
        .assignments
        .get_assignment(submission.assignment_id)
        .await?;
    let granted = permissions::rights(actor, &submission, assignment.as_ref(), Utc::now());

    let grading_fields =
        req.workflow_state.is_some() || req.grade_matches_current_submission.is_some();
    if grading_fields && !granted.contains(&Capability::Grade) {
        return Err(LifecycleError::authorization(format!(
            "User {} may not change the grading state of submission {}",
            actor.user_id, submission.id
        )));
    }
    let media_fields = req.media_comment_id.is_some() || req.media_comment_type.is_some();
    if media_fields
        && !granted.contains(&Capability::Submit)
        && !granted.contains(&Capability::Grade)
    {
        return Err(LifecycleError::authorization(format!(
            "User {} may not change the media comment of submission {}",
            actor.user_id, submission.id
        )));
    }

    if let Some(state) = req.workflow_state {
        submission.workflow_state = state;
    }
    if let Some(matches) = req.grade_matches_current_submission {
        submission.grade_matches_current_submission = matches;
    }
    if let Some(media_id) = req.media_comment_id {
        submission.media_comment_id = Some(media_id);
    }
    if let Some(media_type) = req.media_comment_type {
        submission.media_comment_type = Some(media_type);
    }

    service.save(submission).await
}
