//! 内容相关的推导：提交类型、引用校验、提交时间、尝试次数、媒体评论、测验关联

use chrono::{DateTime, Utc};
use tracing::debug;

use super::ResolvedLookups;
use crate::config::LimitConfig;
use crate::errors::{LifecycleError, Result};
use crate::models::submissions::entities::{Submission, SubmissionType, WorkflowState};
use crate::utils::{normalize_url, validate_long_text, validate_url};

/// 校验网址与正文并推断提交类型
///
/// 超长网址整体转存到正文后截断；类型只在未设置时推断，优先级为
/// 网址 > 正文 > 附件。
pub fn normalize_single_submission(
    submission: &mut Submission,
    limits: &LimitConfig,
) -> Result<()> {
    if let Some(url) = submission.url.take() {
        let url = normalize_url(&url);
        if url.is_empty() {
            submission.url = None;
        } else {
            validate_url(&url).map_err(LifecycleError::validation)?;
            if url.chars().count() > limits.max_url_length {
                submission.body = Some(url.clone());
                submission.url = Some(url.chars().take(limits.max_url_length).collect());
            } else {
                submission.url = Some(url);
            }
        }
    }

    if let Some(body) = submission.body.as_deref() {
        validate_long_text(body, limits.max_long_text_length).map_err(LifecycleError::validation)?;
    }

    if submission.submission_type.is_none() {
        submission.submission_type = if submission.url.is_some() {
            Some(SubmissionType::OnlineUrl)
        } else if submission.body.is_some() {
            Some(SubmissionType::OnlineTextEntry)
        } else if !submission.attachment_ids.is_empty() {
            Some(SubmissionType::OnlineUpload)
        } else {
            None
        };
    }
    Ok(())
}

/// 必填引用与选课校验
///
/// 选课只在提交动作（新建或提交时间变化）时检查，评分等操作不受影响。
pub fn validate_references(
    previous: Option<&Submission>,
    submission: &Submission,
    lookups: &ResolvedLookups,
) -> Result<()> {
    if submission.assignment_id <= 0 {
        return Err(LifecycleError::validation("assignment_id can't be blank"));
    }
    if submission.user_id <= 0 {
        return Err(LifecycleError::validation("user_id can't be blank"));
    }

    let submitting = match previous {
        None => submission.has_submission(),
        Some(prev) => prev.submitted_at != submission.submitted_at,
    };
    if submitting && !lookups.enrolled {
        return Err(LifecycleError::enrollment(
            "Cannot submit to an assignment when the student is not properly enrolled.",
        ));
    }
    Ok(())
}

/// 有提交类型时补齐提交时间
pub fn stamp_submitted_at(submission: &mut Submission, now: DateTime<Utc>) {
    if submission.has_submission() && submission.submitted_at.is_none() {
        submission.submitted_at = Some(now);
    }
}

/// 测验提交：分数与作答记录一致时，按作答是否完成决定 graded / pending_review
pub fn apply_pending_quiz_state(submission: &mut Submission, lookups: &ResolvedLookups) {
    if submission.submission_type != Some(SubmissionType::OnlineQuiz) {
        return;
    }
    let Some(attempt) = lookups.quiz_attempt.as_ref() else {
        return;
    };
    if submission.quiz_submission_id != Some(attempt.id) {
        return;
    }
    if submission.score.is_some() && submission.score == attempt.score {
        submission.workflow_state = if attempt.complete {
            WorkflowState::Graded
        } else {
            WorkflowState::PendingReview
        };
        debug!(
            "Quiz submission {} moved to {} from quiz attempt {}",
            submission.id, submission.workflow_state, attempt.id
        );
    }
}

/// 空白媒体评论 ID 视为清除；ID 变化或尚未解析时重新关联媒体对象
pub fn normalize_media_comment(
    previous: Option<&Submission>,
    submission: &mut Submission,
    lookups: &ResolvedLookups,
) {
    if submission
        .media_comment_id
        .as_deref()
        .is_some_and(|id| id.trim().is_empty())
    {
        submission.media_comment_id = None;
    }

    if let Some(media_id) = submission.media_comment_id.as_deref() {
        let changed = previous.is_none_or(|p| p.media_comment_id.as_deref() != Some(media_id));
        if changed || submission.media_object_id.is_none() {
            submission.media_object_id = lookups.media_object_id;
        }
    } else {
        submission.media_comment_type = None;
    }
}

/// 提交时间变化时尝试次数加一；有提交时间后至少为 1
pub fn bump_attempt(previous: Option<&Submission>, submission: &mut Submission) {
    if submission.submitted_at.is_none() {
        return;
    }
    let submitted_at_changed = previous.is_none_or(|p| p.submitted_at != submission.submitted_at);
    if submitted_at_changed {
        submission.attempt += 1;
    }
    if submission.attempt < 1 {
        submission.attempt = 1;
    }
}

/// 测验提交关联作答记录（只在尚未关联时）
pub fn link_quiz_attempt(submission: &mut Submission, lookups: &ResolvedLookups) {
    if submission.submission_type != Some(SubmissionType::OnlineQuiz) {
        return;
    }
    if submission.quiz_submission_id.is_none() {
        submission.quiz_submission_id = lookups.quiz_attempt.as_ref().map(|a| a.id);
    }
}
