//! 后台任务的执行
//!
//! 任务可能被重复投递，每个任务执行前都会重新读取提交并复查前置条件。

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, warn};

use super::SubmissionService;
use crate::errors::Result;
use crate::models::plagiarism::entities::CheckState;
use crate::models::submissions::entities::Submission;
use crate::models::users::entities::{Actor, Capability};
use crate::queue::{Job, JobHandler, QueuedJob};
use crate::services::plagiarism::{self, POLL_INTERVAL, PollDecision, PollStart, ReportAudience};
use crate::services::screenshots::{self, CAPTURE_RETRY_DELAY, CaptureStart};
use crate::services::permissions;

#[async_trait]
impl JobHandler for SubmissionService {
    async fn perform(&self, job: Job) -> Result<()> {
        let gradebook = &self.collaborators.gradebook;
        match job {
            Job::RecomputeFinalScore {
                user_id,
                context_id,
            } => gradebook.recompute_final_score(user_id, context_id).await,
            Job::RecordModuleProgress {
                user_id,
                assignment_id,
                progress,
            } => {
                gradebook
                    .record_module_progress(user_id, assignment_id, progress)
                    .await
            }
            Job::NotifyGraders { assignment_id } => gradebook.notify_graders(assignment_id).await,
            Job::PublishStreamItem {
                submission_id,
                user_id,
            } => gradebook.publish_stream_item(submission_id, user_id).await,
            Job::DeliverNotification { event } => {
                let delivered = self.dispatcher.dispatch(&event).await?;
                debug!(
                    "Notification {} for submission {} reached {} user(s)",
                    event.kind, event.submission_id, delivered
                );
                Ok(())
            }
            Job::SubmitForPlagiarismCheck {
                submission_id,
                content_attempt,
                attempt,
            } => submit_for_plagiarism_check(self, submission_id, content_attempt, attempt).await,
            Job::PollPlagiarism {
                submission_id,
                asset_string,
                content_attempt,
                attempt,
            } => {
                poll_plagiarism(self, submission_id, &asset_string, content_attempt, attempt).await
            }
            Job::CaptureScreenshot { submission_id } => {
                capture_screenshot(self, submission_id).await
            }
        }
    }
}

/// 重新读取提交；提交已删除或已重新送查时返回 None
async fn reload_for_attempt(
    service: &SubmissionService,
    submission_id: i64,
    content_attempt: i32,
) -> Result<Option<Submission>> {
    let Some(submission) = service.store.get_submission(submission_id).await? else {
        warn!("Submission {} vanished during plagiarism check", submission_id);
        return Ok(None);
    };
    if !plagiarism::is_current_attempt(&submission, content_attempt) {
        debug!(
            "Plagiarism job for attempt {} of submission {} is stale (now {:?})",
            content_attempt, submission_id, submission.plagiarism.last_processed_attempt
        );
        return Ok(None);
    }
    Ok(Some(submission))
}

async fn submit_for_plagiarism_check(
    service: &SubmissionService,
    submission_id: i64,
    content_attempt: i32,
    attempt: u32,
) -> Result<()> {
    if !service.config.plagiarism.enabled {
        debug!("Plagiarism checks disabled, skipped submission {}", submission_id);
        return Ok(());
    }
    let Some(submission) = reload_for_attempt(service, submission_id, content_attempt).await?
    else {
        return Ok(());
    };
    let Some(assignment) = service
        .collaborators
        .assignments
        .get_assignment(submission.assignment_id)
        .await?
    else {
        warn!(
            "Assignment {} missing, plagiarism submit for submission {} skipped",
            submission.assignment_id, submission_id
        );
        return Ok(());
    };
    let has_pending = submission
        .plagiarism
        .assets
        .values()
        .any(|asset| asset.state == CheckState::Pending);
    if !plagiarism::is_checkable(&submission, Some(&assignment)) || !has_pending {
        debug!("Nothing to send for submission {}", submission_id);
        return Ok(());
    }

    match service
        .collaborators
        .plagiarism
        .submit(&submission, &assignment)
        .await
    {
        Ok(assets) => {
            info!(
                "Submission {} accepted by plagiarism service ({} asset(s))",
                submission_id,
                assets.len()
            );
            for asset_string in assets {
                let job = Job::PollPlagiarism {
                    submission_id,
                    asset_string,
                    content_attempt,
                    attempt: 1,
                };
                service.queue.enqueue(QueuedJob::after(job, POLL_INTERVAL)).await?;
            }
            Ok(())
        }
        Err(e) if attempt < service.config.plagiarism.submit_max_attempts => {
            warn!(
                "Plagiarism submit for submission {} failed (attempt {}): {}",
                submission_id,
                attempt + 1,
                e
            );
            let job = Job::SubmitForPlagiarismCheck {
                submission_id,
                content_attempt,
                attempt: attempt + 1,
            };
            let delay = Duration::from_secs(service.config.plagiarism.submit_retry_delay_secs);
            service.queue.enqueue(QueuedJob::after(job, delay)).await
        }
        Err(e) => {
            let Some(mut current) =
                reload_for_attempt(service, submission_id, content_attempt).await?
            else {
                return Ok(());
            };
            let marked = plagiarism::mark_submit_failed(&mut current);
            warn!(
                "Plagiarism submit for submission {} gave up after {} attempt(s): {}; {} asset(s) marked as error",
                submission_id,
                attempt + 1,
                e,
                marked
            );
            service.save_without_broadcast(current).await?;
            Ok(())
        }
    }
}

async fn poll_plagiarism(
    service: &SubmissionService,
    submission_id: i64,
    asset_string: &str,
    content_attempt: i32,
    attempt: u32,
) -> Result<()> {
    let Some(mut submission) = reload_for_attempt(service, submission_id, content_attempt).await?
    else {
        return Ok(());
    };

    match plagiarism::begin_poll(submission.plagiarism.asset(asset_string), attempt) {
        PollStart::Skip => {
            debug!(
                "Poll {} for {} on submission {} is stale",
                attempt, asset_string, submission_id
            );
            return Ok(());
        }
        PollStart::Exhausted => {
            if let Some(asset) = submission.plagiarism.asset_mut(asset_string) {
                asset.mark_error();
            }
            service.save_without_broadcast(submission).await?;
            return Ok(());
        }
        PollStart::Poll => {}
    }

    let report = match service
        .collaborators
        .plagiarism
        .poll(&submission, asset_string)
        .await
    {
        Ok(report) => report,
        Err(e) => {
            warn!(
                "Plagiarism poll {} for {} on submission {} failed: {}",
                attempt, asset_string, submission_id, e
            );
            None
        }
    };
    let decision = plagiarism::finish_poll(attempt, report);

    // 轮询期间提交可能已被评分或重新提交，只把查重结果写回最新记录
    let Some(mut current) = reload_for_attempt(service, submission_id, content_attempt).await?
    else {
        return Ok(());
    };
    let Some(asset) = current.plagiarism.asset_mut(asset_string) else {
        return Ok(());
    };
    if plagiarism::begin_poll(Some(&*asset), attempt) == PollStart::Skip {
        return Ok(());
    }
    plagiarism::apply_poll(asset, &decision);
    service.save_without_broadcast(current).await?;

    match decision {
        PollDecision::Retry {
            next_attempt,
            delay,
        } => {
            let job = Job::PollPlagiarism {
                submission_id,
                asset_string: asset_string.to_string(),
                content_attempt,
                attempt: next_attempt,
            };
            service.queue.enqueue(QueuedJob::after(job, delay)).await
        }
        PollDecision::Scored(report) => {
            info!(
                "Similarity score {} recorded for {} on submission {}",
                report.similarity_score, asset_string, submission_id
            );
            Ok(())
        }
        PollDecision::Exhausted => {
            warn!(
                "No similarity report for {} on submission {} after {} poll(s)",
                asset_string,
                submission_id,
                plagiarism::MAX_STATUS_POLLS
            );
            Ok(())
        }
    }
}

async fn capture_screenshot(service: &SubmissionService, submission_id: i64) -> Result<()> {
    let Some(submission) = service.store.get_submission(submission_id).await? else {
        warn!("Submission {} vanished before screenshot capture", submission_id);
        return Ok(());
    };
    let capture = &service.collaborators.screenshots;
    let enabled = service.config.screenshot.enabled && capture.is_enabled();
    let max_attempts = service.config.screenshot.max_process_attempts;
    let max_url_length = service.config.limits.max_url_length;

    match screenshots::begin_capture(&submission, enabled, max_attempts) {
        CaptureStart::Disabled => {
            debug!("Screenshot capture disabled, skipped submission {}", submission_id);
            return Ok(());
        }
        CaptureStart::Skip => return Ok(()),
        CaptureStart::Capture => {}
    }

    let Some(url) = submission.full_url(max_url_length).map(str::to_string) else {
        return Ok(());
    };
    let result = capture.capture(&url).await;

    // 截图期间网址可能已改，改过的网址会另行排队截图
    let Some(mut current) = service.store.get_submission(submission_id).await? else {
        return Ok(());
    };
    if screenshots::begin_capture(&current, enabled, max_attempts) != CaptureStart::Capture
        || current.full_url(max_url_length) != Some(url.as_str())
    {
        debug!(
            "Submission {} changed during screenshot capture, result discarded",
            submission_id
        );
        return Ok(());
    }

    match result {
        Ok(attachment_id) => {
            screenshots::record_capture_success(&mut current, attachment_id);
            info!(
                "Screenshot {} attached to submission {}",
                attachment_id, submission_id
            );
            service.save_without_broadcast(current).await?;
            Ok(())
        }
        Err(e) => {
            let retry = screenshots::record_capture_failure(&mut current, max_attempts);
            warn!(
                "Screenshot of {} for submission {} failed (attempt {}): {}",
                url, submission_id, current.process_attempts, e
            );
            service.save_without_broadcast(current).await?;
            if retry {
                let job = Job::CaptureScreenshot { submission_id };
                service
                    .queue
                    .enqueue(QueuedJob::after(job, CAPTURE_RETRY_DELAY).low_priority())
                    .await?;
            }
            Ok(())
        }
    }
}

pub async fn plagiarism_report_url(
    service: &SubmissionService,
    actor: &Actor,
    submission_id: i64,
    asset_string: &str,
) -> Result<Option<String>> {
    let submission = service.load_submission(submission_id).await?;
    let scored = submission
        .plagiarism
        .asset(asset_string)
        .is_some_and(|asset| asset.similarity_score.is_some());
    if !scored {
        return Ok(None);
    }

    let assignment = service
        .collaborators
        .assignments
        .get_assignment(submission.assignment_id)
        .await?;
    let granted = permissions::rights(actor, &submission, assignment.as_ref(), Utc::now());
    let audience = if granted.contains(&Capability::Grade) {
        ReportAudience::Instructor
    } else if granted.contains(&Capability::ViewPlagiarismReport) {
        ReportAudience::Student
    } else {
        return Ok(None);
    };

    let client = &service.collaborators.plagiarism;
    Ok(match audience {
        ReportAudience::Instructor => client.instructor_report_url(&submission, asset_string),
        ReportAudience::Student => client.student_report_url(&submission, asset_string),
    })
}
