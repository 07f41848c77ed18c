use chrono::Utc;
use tracing::{error, info, warn};

use super::{SaveOutcome, SubmissionService};
use crate::errors::{LifecycleError, Result};
use crate::models::assignments::entities::Assignment;
use crate::models::submissions::entities::{Submission, SubmissionType};
use crate::queue::{Job, QueuedJob};
use crate::services::lifecycle::{self, BeforeSave, ResolvedLookups, SideEffect};
use crate::services::notifications::{self, BroadcastFlags, Transition};
use crate::services::plagiarism;

/// 保存前解析选课、测验作答和媒体对象；测验与媒体查询失败不阻止保存
async fn resolve_lookups(
    service: &SubmissionService,
    submission: &Submission,
    assignment: Option<&Assignment>,
) -> Result<ResolvedLookups> {
    let collaborators = &service.collaborators;

    // 没有作业上下文时无法校验选课
    let enrolled = match assignment {
        Some(assignment) => {
            collaborators
                .enrollments
                .is_student_enrolled(assignment.context_id, submission.user_id)
                .await?
        }
        None => true,
    };

    let mut quiz_attempt = None;
    if submission.submission_type == Some(SubmissionType::OnlineQuiz) {
        quiz_attempt = match collaborators.quiz_attempts.find_by_submission(submission.id).await {
            Ok(found) => found,
            Err(e) => {
                warn!("Quiz attempt lookup for submission {} failed: {}", submission.id, e);
                None
            }
        };
        if quiz_attempt.is_none()
            && let Some(quiz_id) = assignment.and_then(|a| a.quiz_id)
        {
            quiz_attempt = match collaborators
                .quiz_attempts
                .find_by_user_and_quiz(submission.user_id, quiz_id)
                .await
            {
                Ok(found) => found,
                Err(e) => {
                    warn!(
                        "Quiz attempt lookup for user {} on quiz {} failed: {}",
                        submission.user_id, quiz_id, e
                    );
                    None
                }
            };
        }
    }

    let mut media_object_id = None;
    if let Some(media_id) = submission
        .media_comment_id
        .as_deref()
        .filter(|id| !id.trim().is_empty())
    {
        media_object_id = match collaborators.media_objects.find_media_object(media_id).await {
            Ok(found) => found,
            Err(e) => {
                warn!("Media object lookup for {} failed: {}", media_id, e);
                None
            }
        };
    }

    Ok(ResolvedLookups {
        enrolled,
        quiz_attempt,
        media_object_id,
    })
}

pub async fn save(
    service: &SubmissionService,
    mut submission: Submission,
    broadcast: BroadcastFlags,
) -> Result<SaveOutcome> {
    let now = Utc::now();

    let previous = if submission.id > 0 {
        service.store.get_submission(submission.id).await?
    } else {
        None
    };
    if submission.id <= 0 {
        submission.id = service.store.next_id().await?;
    }

    let assignment = service
        .collaborators
        .assignments
        .get_assignment(submission.assignment_id)
        .await?;
    let lookups = resolve_lookups(service, &submission, assignment.as_ref()).await?;

    let BeforeSave {
        mut submission,
        flags,
    } = lifecycle::before_save(
        previous.as_ref(),
        submission,
        assignment.as_ref(),
        &lookups,
        &service.config.limits,
        now,
    )?;

    service
        .store
        .save_submission(&submission, flags.worth_versioning)
        .await?;
    info!(
        "Submission {} saved ({}, attempt {})",
        submission.id,
        submission.readable_state(),
        submission.attempt
    );

    let side_effects =
        lifecycle::collect_side_effects(&submission, assignment.as_ref(), &flags, now);
    let mut unqueued = Vec::new();
    let mut plagiarism_unqueued = false;
    for effect in &side_effects {
        if let Err(e) = service.queue.enqueue(QueuedJob::from(effect.clone())).await {
            error!(
                "Failed to queue side effect {:?} for submission {}: {}",
                effect, submission.id, e
            );
            match effect {
                SideEffect::SubmitForPlagiarismCheck { .. } => plagiarism_unqueued = true,
                _ => unqueued.push(e.to_string()),
            }
        }
    }
    // 送查任务丢失时把待查资源记为错误，避免永远停在 pending
    if plagiarism_unqueued {
        let marked = plagiarism::mark_submit_failed(&mut submission);
        warn!(
            "Plagiarism check for submission {} could not be queued, {} asset(s) marked as error",
            submission.id, marked
        );
        service.store.save_submission(&submission, true).await?;
    }

    let notifications = match assignment.as_ref() {
        Some(assignment) => notifications::evaluate(&Transition {
            previous: previous.as_ref(),
            current: &submission,
            assignment,
            flags: broadcast,
            now,
        }),
        None => Vec::new(),
    };
    for event in &notifications {
        let job = Job::DeliverNotification {
            event: event.clone(),
        };
        if let Err(e) = service.queue.enqueue(QueuedJob::now(job)).await {
            error!(
                "Failed to queue {} notification for submission {}: {}",
                event.kind, submission.id, e
            );
            unqueued.push(e.to_string());
        }
    }

    if !unqueued.is_empty() {
        return Err(LifecycleError::task_queue(format!(
            "Submission {} was saved but {} follow-up job(s) could not be queued: {}",
            submission.id,
            unqueued.len(),
            unqueued.join("; ")
        )));
    }

    Ok(SaveOutcome {
        submission,
        flags,
        side_effects,
        notifications,
    })
}
